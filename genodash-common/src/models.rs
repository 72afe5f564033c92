//! Data model for the consent/upload/analysis pipeline
//!
//! These mirror the backend's wire shapes. The client never mutates an
//! `AnalysisJob`; it only observes snapshots of it via polling.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// User roles, ordered by privilege (see [`crate::access`] for the hierarchy).
///
/// The backend enum spells the lowest role `"User"`; it is presented as
/// Patient throughout the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "User", alias = "Patient")]
    Patient,
    Clinician,
    Admin,
}

/// Authenticated dashboard user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    pub role: Role,
    /// Cached consent token, if this user has signed
    #[serde(default, alias = "consentId", skip_serializing_if = "Option::is_none")]
    pub consent_id: Option<String>,
}

/// A signed consent authorization
///
/// Created exactly once per user; required before any upload or analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsentRecord {
    #[serde(rename = "consentId")]
    pub consent_id: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(default)]
    pub signed: bool,
    #[serde(rename = "signedAt", default)]
    pub signed_at: Option<DateTime<Utc>>,
}

/// Genome file formats accepted by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenomeFormat {
    Fasta,
    Vcf,
    Gff,
    Bed,
}

impl GenomeFormat {
    /// Infer format from a filename extension, for display only.
    /// The backend inspects file content and is authoritative.
    pub fn from_filename(name: &str) -> Option<Self> {
        let ext = name.rsplit('.').next()?.to_ascii_lowercase();
        match ext.as_str() {
            "fa" | "fasta" | "fna" => Some(GenomeFormat::Fasta),
            "vcf" => Some(GenomeFormat::Vcf),
            "gff" | "gff3" => Some(GenomeFormat::Gff),
            "bed" => Some(GenomeFormat::Bed),
            _ => None,
        }
    }
}

/// Uploaded genome file descriptor, immutable once created
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenomeFile {
    #[serde(rename = "fileId")]
    pub file_id: String,
    #[serde(default)]
    pub filename: String,
    #[serde(rename = "fileType", default)]
    pub file_type: Option<GenomeFormat>,
    #[serde(default)]
    pub size: u64,
    #[serde(rename = "uploadedAt", default)]
    pub uploaded_at: Option<DateTime<Utc>>,
}

/// Kind of analysis job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalysisType {
    #[serde(rename = "GenomeSequence", alias = "sequence")]
    Sequence,
    #[serde(rename = "VariantDetection", alias = "variant")]
    Variant,
}

/// Analysis job status as reported by the backend
///
/// Queued and Running are both "in flight"; the poll loop treats them
/// identically apart from labeling. A job reaches Completed or Failed
/// exactly once and is immutable afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    /// True once no further status changes can occur and polling must stop
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// Computed analysis results, populated once a job completes
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisResults {
    /// Metric name -> value (e.g. gc_percent, at_gc_ratio, length, sequences)
    #[serde(default)]
    pub metrics: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub summary: String,
}

/// Downloadable artifact attached to a completed analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    pub id: String,
    pub name: String,
    pub url: String,
}

/// One snapshot of a server-tracked analysis job
///
/// Mutated only by the backend; the client observes it through
/// `GET /api/analysis/{analysisId}` during polling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisJob {
    #[serde(rename = "analysisId", alias = "_id")]
    pub analysis_id: String,
    #[serde(rename = "fileId", default)]
    pub file_id: Option<String>,
    #[serde(rename = "analysisType", default)]
    pub analysis_type: Option<AnalysisType>,
    pub status: JobStatus,
    #[serde(default)]
    progress: Option<f64>,
    #[serde(default)]
    pub results: Option<AnalysisResults>,
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
    /// Failure detail when status is Failed
    #[serde(default)]
    pub error: Option<String>,
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "updatedAt", default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl AnalysisJob {
    /// Progress in [0, 100]. Backends that omit the field report 100 for
    /// Completed jobs and 0 otherwise, matching the dashboard's fallback.
    pub fn progress(&self) -> f64 {
        match self.progress {
            Some(p) => p.clamp(0.0, 100.0),
            None if self.status == JobStatus::Completed => 100.0,
            None => 0.0,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
