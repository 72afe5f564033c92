//! Genome file upload and listing
//!
//! Upload preconditions (non-empty consent id, non-zero file size) are
//! enforced locally and fail with `Validation` before any request is
//! built. After a successful upload or delete the cached listing is
//! invalidated outright; the next read refetches from the server rather
//! than patching the cache, so server-side derived metadata never drifts.

use crate::http::Backend;
use genodash_common::models::GenomeFile;
use genodash_common::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use std::sync::{Arc, RwLock};

/// One page of the user's files
#[derive(Debug, Clone, Deserialize)]
pub struct FilePage {
    #[serde(default)]
    pub files: Vec<GenomeFile>,
    #[serde(default)]
    pub total: u64,
}

/// `GET /api/genome/my-files` envelope
#[derive(Debug, Deserialize)]
struct MyFilesResponse {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<FilePage>,
}

/// Upload success body: `{ message, fileId, ... }` plus descriptor fields
#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(default)]
    #[allow(dead_code)]
    message: Option<String>,
    #[serde(flatten)]
    file: GenomeFile,
}

/// Cached last-fetched listing. Never patched in place; writers only
/// replace or clear it.
#[derive(Default)]
pub struct FileCatalog {
    page: RwLock<Option<FilePage>>,
}

impl FileCatalog {
    pub fn cached(&self) -> Option<FilePage> {
        self.page.read().expect("catalog lock poisoned").clone()
    }

    pub fn invalidate(&self) {
        *self.page.write().expect("catalog lock poisoned") = None;
    }

    fn store(&self, page: FilePage) {
        *self.page.write().expect("catalog lock poisoned") = Some(page);
    }
}

/// Upload, list, and delete genome files
pub struct GenomeService {
    backend: Arc<Backend>,
    catalog: FileCatalog,
}

impl GenomeService {
    pub fn new(backend: Arc<Backend>) -> Self {
        Self {
            backend,
            catalog: FileCatalog::default(),
        }
    }

    pub fn catalog(&self) -> &FileCatalog {
        &self.catalog
    }

    /// Upload file bytes under a signed consent.
    ///
    /// `consent_id` comes from the consent gate; an empty id means the
    /// gate was bypassed and the call refuses locally.
    pub async fn upload(
        &self,
        filename: &str,
        bytes: Vec<u8>,
        consent_id: &str,
        project_id: Option<&str>,
    ) -> Result<GenomeFile> {
        if consent_id.is_empty() {
            return Err(Error::Validation(
                "A signed consent is required before uploading genome data".to_string(),
            ));
        }
        if bytes.is_empty() {
            return Err(Error::Validation(format!("File '{filename}' is empty")));
        }

        let part = reqwest::multipart::Part::bytes(bytes).file_name(filename.to_string());
        let mut form = reqwest::multipart::Form::new()
            .part("genomeFile", part)
            .text("consentId", consent_id.to_string());
        if let Some(project) = project_id {
            form = form.text("projectId", project.to_string());
        }

        let response: UploadResponse = self
            .backend
            .post_multipart("/api/genome/upload", form)
            .await?;

        tracing::info!(
            file_id = %response.file.file_id,
            filename = %filename,
            "Genome file uploaded"
        );

        // Server-side upload produces derived metadata; drop the cache
        // and let the next listing refetch.
        self.catalog.invalidate();
        Ok(response.file)
    }

    /// Read a file from disk and upload it (CLI convenience)
    pub async fn upload_path(
        &self,
        path: &Path,
        consent_id: &str,
        project_id: Option<&str>,
    ) -> Result<GenomeFile> {
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::Validation(format!("Invalid file path: {}", path.display())))?
            .to_string();
        let bytes = std::fs::read(path)?;
        self.upload(&filename, bytes, consent_id, project_id).await
    }

    /// Fetch one page of the user's files and refresh the cache
    pub async fn my_files(&self, page: u32, limit: u32) -> Result<FilePage> {
        let response: MyFilesResponse = self
            .backend
            .get_json_query(
                "/api/genome/my-files",
                &[("page", page.to_string()), ("limit", limit.to_string())],
            )
            .await?;

        if !response.success {
            return Err(Error::Server {
                status: 500,
                message: response
                    .message
                    .unwrap_or_else(|| "file listing failed".to_string()),
            });
        }

        let listing = response.data.unwrap_or(FilePage {
            files: Vec::new(),
            total: 0,
        });
        self.catalog.store(listing.clone());
        Ok(listing)
    }

    /// Delete an uploaded file; the cached listing is invalidated
    pub async fn delete(&self, file_id: &str) -> Result<()> {
        let _: serde_json::Value = self
            .backend
            .delete_json(&format!("/api/genome/{file_id}"))
            .await?;
        self.catalog.invalidate();
        tracing::info!(file_id = %file_id, "Genome file deleted");
        Ok(())
    }
}
