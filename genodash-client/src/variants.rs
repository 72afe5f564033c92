//! Variant analysis endpoints
//!
//! Variant detection also yields an `AnalysisJob` that the poll loop can
//! watch; the density/region reads are one-shot metric queries over the
//! latest completed detection.

use crate::http::Backend;
use genodash_common::models::AnalysisJob;
use genodash_common::{Error, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

/// `{ message, analysis }` from `GET /api/variants/detect/{fileId}`
#[derive(Debug, Deserialize)]
struct DetectResponse {
    #[serde(default)]
    #[allow(dead_code)]
    message: Option<String>,
    analysis: AnalysisJob,
}

/// Per-chromosome variant count
#[derive(Debug, Clone, Deserialize)]
pub struct DensityBin {
    pub chrom: String,
    pub count: u64,
}

/// `{ fileId, totalVariants, densities }`
#[derive(Debug, Deserialize)]
pub struct MutationDensity {
    #[serde(rename = "fileId", default)]
    pub file_id: Option<String>,
    #[serde(rename = "totalVariants", default)]
    pub total_variants: u64,
    #[serde(default)]
    pub densities: Vec<DensityBin>,
}

/// `{ fileId, metrics }` where metrics is a name -> value map
#[derive(Debug, Deserialize)]
pub struct RegionMetrics {
    #[serde(rename = "fileId", default)]
    pub file_id: Option<String>,
    #[serde(default)]
    pub metrics: HashMap<String, serde_json::Value>,
}

/// Variant detection and metric endpoints
pub struct VariantService {
    backend: Arc<Backend>,
}

impl VariantService {
    pub fn new(backend: Arc<Backend>) -> Self {
        Self { backend }
    }

    /// Start variant detection on an uploaded file; returns the created
    /// job record. Its id feeds the same poll loop as sequence jobs.
    pub async fn detect(&self, file_id: &str) -> Result<AnalysisJob> {
        if file_id.is_empty() {
            return Err(Error::Validation("No genome file selected".to_string()));
        }
        let response: DetectResponse = self
            .backend
            .get_json(&format!("/api/variants/detect/{file_id}"))
            .await?;
        tracing::info!(
            file_id = %file_id,
            analysis_id = %response.analysis.analysis_id,
            "Variant detection submitted"
        );
        Ok(response.analysis)
    }

    /// Variants-per-chromosome counts for the latest detection run
    pub async fn mutation_density(&self, file_id: &str) -> Result<MutationDensity> {
        self.backend
            .get_json(&format!("/api/variants/mutation-density/{file_id}"))
            .await
    }

    /// Aggregate region metrics for the latest detection run
    pub async fn region_metrics(&self, file_id: &str) -> Result<RegionMetrics> {
        self.backend
            .get_json(&format!("/api/variants/region-metrics/{file_id}"))
            .await
    }
}
