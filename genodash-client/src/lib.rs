//! GenoDash client core
//!
//! Consent-gated genome upload, analysis job submission, and job status
//! polling against the dashboard backend, plus the session state that
//! gates all of it. Role and navigation logic lives in `genodash-common`.

pub mod analysis;
pub mod consent;
pub mod genome;
pub mod http;
pub mod poller;
pub mod session;
pub mod variants;

use crate::analysis::AnalysisService;
use crate::consent::ConsentGate;
use crate::genome::GenomeService;
use crate::http::Backend;
use crate::poller::{JobPoller, PollEvent, PollHandle, PollerConfig};
use crate::session::SessionStore;
use genodash_common::access::{self, MenuVisibilityPolicy};
use genodash_common::config::ClientConfig;
use genodash_common::models::{AnalysisJob, GenomeFile, Role, User};
use genodash_common::navigation::{NavigationItem, NAV_ITEMS};
use genodash_common::{Error, Result};
use std::path::Path;
use std::sync::Arc;

/// Facade over all dashboard services, sharing one session and one
/// HTTP client.
///
/// The pipeline ordering lives here: consent before upload, upload
/// before submission, submission before polling.
pub struct ApiClient {
    session: Arc<SessionStore>,
    backend: Arc<Backend>,
    pub consent: ConsentGate,
    pub genome: GenomeService,
    pub analyses: Arc<AnalysisService>,
    pub variants: variants::VariantService,
    pub poller: JobPoller,
}

impl ApiClient {
    pub fn new(config: &ClientConfig, session: Arc<SessionStore>) -> Result<Self> {
        let backend = Arc::new(Backend::new(config, session.clone())?);
        let analyses = Arc::new(AnalysisService::new(backend.clone()));
        Ok(Self {
            consent: ConsentGate::new(backend.clone(), session.clone()),
            genome: GenomeService::new(backend.clone()),
            variants: variants::VariantService::new(backend.clone()),
            poller: JobPoller::new(analyses.clone(), PollerConfig::from(config)),
            analyses,
            backend,
            session,
        })
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Fetch the authenticated user's profile. Wrapped in a `user`
    /// envelope on current backends, bare on older ones.
    pub async fn me(&self) -> Result<User> {
        let value: serde_json::Value = self.backend.get_json("/api/users/me").await?;
        let record = value.get("user").cloned().unwrap_or(value);
        serde_json::from_value(record)
            .map_err(|e| Error::Transient(format!("malformed user record: {e}")))
    }

    /// Consent-gated upload: sign (or reuse) consent, upload, and drop
    /// the cached file listing so the next read refetches.
    ///
    /// If the gate cannot produce a consent id the upload refuses locally
    /// with a `Validation` error and no upload request is issued.
    pub async fn upload_genome(
        &self,
        filename: &str,
        bytes: Vec<u8>,
        project_id: Option<&str>,
    ) -> Result<GenomeFile> {
        let consent_id = self.require_consent().await?;
        self.genome
            .upload(filename, bytes, &consent_id, project_id)
            .await
    }

    /// Consent-gated upload from a file path (CLI convenience)
    pub async fn upload_genome_path(
        &self,
        path: &Path,
        project_id: Option<&str>,
    ) -> Result<GenomeFile> {
        let consent_id = self.require_consent().await?;
        self.genome.upload_path(path, &consent_id, project_id).await
    }

    /// Consent-gated sequence analysis submission. Returns the job id;
    /// callers start a watch for the outcome.
    pub async fn run_sequence_analysis(&self, file_id: &str) -> Result<String> {
        self.require_consent().await?;
        self.analyses.submit_sequence(file_id).await
    }

    /// Consent-gated variant detection submission
    pub async fn run_variant_detection(&self, file_id: &str) -> Result<AnalysisJob> {
        self.require_consent().await?;
        self.variants.detect(file_id).await
    }

    /// Poll a submitted job until it reaches a terminal state
    pub fn watch_job<F>(&self, analysis_id: &str, on_update: F) -> PollHandle
    where
        F: Fn(PollEvent) + Send + Sync + 'static,
    {
        self.poller.watch(analysis_id, on_update)
    }

    /// Navigation entries visible to the logged-in user
    pub fn navigation(&self, policy: MenuVisibilityPolicy) -> Vec<NavigationItem> {
        let user = self.session.user();
        access::filter_navigation(NAV_ITEMS, user.as_ref(), policy)
    }

    /// Run the gate; a gate failure means the pipeline must not start,
    /// surfaced as the local validation error the precondition demands.
    async fn require_consent(&self) -> Result<String> {
        match self.consent.ensure_consent().await {
            Ok(id) => Ok(id),
            Err(e) => {
                tracing::warn!(error = %e, "Consent unavailable, refusing to proceed");
                Err(Error::Validation(format!(
                    "A signed consent is required before this action: {e}"
                )))
            }
        }
    }
}

/// Validate `token` against the backend, then store the session.
///
/// The token is probed through a throwaway in-memory store; `session` is
/// only written once the profile behind the token is known. A rejected
/// token (or an unreachable backend) leaves `session` untouched.
pub async fn login_with_token(
    config: &ClientConfig,
    session: &Arc<SessionStore>,
    token: String,
) -> Result<User> {
    let probe = Arc::new(SessionStore::in_memory());
    probe.login(
        token.clone(),
        User {
            id: String::new(),
            name: String::new(),
            role: Role::Patient,
            consent_id: None,
        },
    )?;
    let client = ApiClient::new(config, probe)?;
    let user = client.me().await?;
    session.login(token, user.clone())?;
    Ok(user)
}
