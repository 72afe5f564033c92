//! Sequence analysis submission and status reads
//!
//! Submission is one-shot and never retried here; the returned id feeds
//! the poll loop, which is the only component that watches a job to its
//! terminal state. A submission response is never treated as carrying
//! final results.

use crate::http::Backend;
use genodash_common::models::{AnalysisJob, AnalysisResults};
use genodash_common::{Error, Result};
use serde::Deserialize;
use std::sync::Arc;

/// `POST /api/analysis/sequence/{fileId}` body: `{ analysisId }`, or the
/// whole created record under `analysis` on older backend builds.
#[derive(Debug, Deserialize)]
struct SubmitResponse {
    #[serde(rename = "analysisId", default)]
    analysis_id: Option<String>,
    #[serde(default)]
    analysis: Option<AnalysisJob>,
}

/// `{ analyses, pagination: { total, ... } }` from `GET /api/analysis/my`
#[derive(Debug, Deserialize)]
pub struct AnalysisPage {
    #[serde(default)]
    pub analyses: Vec<AnalysisJob>,
    #[serde(default)]
    pub pagination: Pagination,
}

#[derive(Debug, Default, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub limit: u32,
    #[serde(default)]
    pub total: u64,
}

/// Analysis job endpoints
pub struct AnalysisService {
    backend: Arc<Backend>,
}

impl AnalysisService {
    pub fn new(backend: Arc<Backend>) -> Self {
        Self { backend }
    }

    /// Start a sequence analysis for an uploaded file. Returns the job id;
    /// the caller must start polling for the outcome.
    pub async fn submit_sequence(&self, file_id: &str) -> Result<String> {
        if file_id.is_empty() {
            return Err(Error::Validation("No genome file selected".to_string()));
        }

        let response: SubmitResponse = self
            .backend
            .post_empty(&format!("/api/analysis/sequence/{file_id}"))
            .await?;

        let analysis_id = response
            .analysis_id
            .or(response.analysis.map(|a| a.analysis_id))
            .filter(|id| !id.is_empty())
            .ok_or_else(|| Error::Server {
                status: 200,
                message: "submission response carried no analysis id".to_string(),
            })?;

        tracing::info!(file_id = %file_id, analysis_id = %analysis_id, "Sequence analysis submitted");
        Ok(analysis_id)
    }

    /// One status snapshot. The backend wraps the record in an `analysis`
    /// envelope; some endpoints return it bare, so both are accepted.
    pub async fn get(&self, analysis_id: &str) -> Result<AnalysisJob> {
        let value: serde_json::Value = self
            .backend
            .get_json(&format!("/api/analysis/{analysis_id}"))
            .await?;
        let record = value.get("analysis").cloned().unwrap_or(value);
        serde_json::from_value(record)
            .map_err(|e| Error::Transient(format!("malformed analysis record: {e}")))
    }

    /// Page through the user's past analyses
    pub async fn my_analyses(&self, page: u32, limit: u32) -> Result<AnalysisPage> {
        self.backend
            .get_json_query(
                "/api/analysis/my",
                &[("page", page.to_string()), ("limit", limit.to_string())],
            )
            .await
    }

    /// Metrics + summary only, for completed jobs
    pub async fn metrics(&self, analysis_id: &str) -> Result<AnalysisResults> {
        self.backend
            .get_json(&format!("/api/analysis/{analysis_id}/metrics"))
            .await
    }

    /// Codon usage table for a completed sequence analysis
    pub async fn codon_frequencies(&self, analysis_id: &str) -> Result<serde_json::Value> {
        self.backend
            .get_json(&format!("/api/analysis/{analysis_id}/codon-frequencies"))
            .await
    }
}
