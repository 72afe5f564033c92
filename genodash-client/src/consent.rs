//! Consent gate
//!
//! Two states: Unsigned (no consent id cached) and Signed. `ensure_consent`
//! is idempotent (a cached id short-circuits with no network call) and
//! single-flight: concurrent callers serialize on one mutex, so a second
//! caller awaits the in-flight sign attempt and then hits the cache instead
//! of issuing a duplicate request.

use crate::http::Backend;
use crate::session::SessionStore;
use genodash_common::models::ConsentRecord;
use genodash_common::{Error, Result};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::Mutex;

/// `POST /api/consents/sign` success body. The id lives on the nested
/// consent record; older backend builds also put it at the top level.
#[derive(Debug, Deserialize)]
struct SignResponse {
    #[serde(default)]
    message: Option<String>,
    #[serde(rename = "consentId", default)]
    consent_id: Option<String>,
    #[serde(default)]
    consent: Option<ConsentRecord>,
}

impl SignResponse {
    fn into_consent_id(self) -> Option<String> {
        self.consent
            .map(|c| c.consent_id)
            .or(self.consent_id)
            .filter(|id| !id.is_empty())
    }
}

/// Gate every upload/analysis action behind a signed consent record
pub struct ConsentGate {
    backend: Arc<Backend>,
    session: Arc<SessionStore>,
    sign_lock: Mutex<()>,
}

impl ConsentGate {
    pub fn new(backend: Arc<Backend>, session: Arc<SessionStore>) -> Self {
        Self {
            backend,
            session,
            sign_lock: Mutex::new(()),
        }
    }

    /// Return the consent id for the current user, signing if necessary.
    ///
    /// Failure modes: no session is an `Auth` error (re-login), as is a
    /// 403 (user may not sign); 5xx surfaces as `Server` with the
    /// backend's message and the caller must resubmit; 409 means already
    /// signed, so the existing record is re-fetched and cached.
    pub async fn ensure_consent(&self) -> Result<String> {
        if let Some(id) = self.session.consent_id() {
            return Ok(id);
        }

        let _guard = self.sign_lock.lock().await;
        // A concurrent caller may have signed while this one waited
        if let Some(id) = self.session.consent_id() {
            return Ok(id);
        }

        let consent_id = match self.backend.post_empty::<SignResponse>("/api/consents/sign").await
        {
            Ok(response) => {
                let message = response.message.clone();
                response.into_consent_id().ok_or_else(|| Error::Server {
                    status: 200,
                    message: message
                        .unwrap_or_else(|| "sign response carried no consent id".to_string()),
                })?
            }
            Err(Error::Conflict(_)) => {
                tracing::info!("Consent already signed, re-fetching existing record");
                self.fetch_existing().await?
            }
            Err(e) => return Err(e),
        };

        self.session.set_consent_id(consent_id.clone())?;
        tracing::info!(consent_id = %consent_id, "Consent signed and cached");
        Ok(consent_id)
    }

    /// True when a consent id is already cached for this session
    pub fn is_signed(&self) -> bool {
        self.session.consent_id().is_some()
    }

    /// Recover the consent id after an already-signed conflict
    async fn fetch_existing(&self) -> Result<String> {
        let user = self.session.user().ok_or(Error::Auth {
            status: 401,
            message: "No active session".to_string(),
        })?;

        let consents: Vec<ConsentRecord> = self.backend.get_json("/api/consents").await?;
        consents
            .into_iter()
            .find(|c| c.user_id == user.id && c.signed)
            .map(|c| c.consent_id)
            .ok_or_else(|| Error::Server {
                status: 409,
                message: "Consent reported as signed but no record was found".to_string(),
            })
    }
}
