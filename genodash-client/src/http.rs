//! HTTP plumbing shared by every service
//!
//! One place builds authenticated requests and maps response status codes
//! onto the error taxonomy. Services never look at raw status codes.

use crate::session::SessionStore;
use genodash_common::config::ClientConfig;
use genodash_common::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;

const USER_AGENT: &str = concat!("GenoDash/", env!("CARGO_PKG_VERSION"));

/// Error body the backend sends alongside non-2xx statuses
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
}

/// Authenticated gateway to the dashboard backend
pub struct Backend {
    http: reqwest::Client,
    base_url: String,
    session: Arc<SessionStore>,
}

impl Backend {
    pub fn new(config: &ClientConfig, session: Arc<SessionStore>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| Error::Transient(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn bearer(&self) -> Result<String> {
        self.session.token()
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let token = self.bearer()?;
        let response = self
            .http
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .map_err(map_transport)?;
        decode(response).await
    }

    pub async fn get_json_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let token = self.bearer()?;
        let response = self
            .http
            .get(self.url(path))
            .query(query)
            .bearer_auth(token)
            .send()
            .await
            .map_err(map_transport)?;
        decode(response).await
    }

    /// POST with an empty JSON body (sign consent, submit analysis)
    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let token = self.bearer()?;
        let response = self
            .http
            .post(self.url(path))
            .bearer_auth(token)
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(map_transport)?;
        decode(response).await
    }

    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
    ) -> Result<T> {
        let token = self.bearer()?;
        let response = self
            .http
            .post(self.url(path))
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await
            .map_err(map_transport)?;
        decode(response).await
    }

    pub async fn delete_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let token = self.bearer()?;
        let response = self
            .http
            .delete(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .map_err(map_transport)?;
        decode(response).await
    }
}

fn map_transport(e: reqwest::Error) -> Error {
    Error::Transient(e.to_string())
}

/// Map response status onto the taxonomy, preserving the server's message.
///
/// 400 is a backend validation rejection (unsupported format, missing
/// field); 401/403 are fatal auth failures; 404 stops any polling; 409 is
/// the already-signed consent conflict; 5xx keeps the message for one-shot
/// surfacing while the poll loop treats it as retryable.
async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();

    if status.is_success() {
        return response
            .json::<T>()
            .await
            .map_err(|e| Error::Transient(format!("invalid response body: {e}")));
    }

    let code = status.as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(|b| b.message.or(b.error))
        .unwrap_or_else(|| {
            if body.is_empty() {
                status.to_string()
            } else {
                body.clone()
            }
        });

    tracing::debug!(status = code, message = %message, "Backend returned error status");

    Err(match code {
        400 => Error::Validation(message),
        401 | 403 => Error::Auth {
            status: code,
            message,
        },
        404 => Error::NotFound(message),
        409 => Error::Conflict(message),
        _ => Error::Server {
            status: code,
            message,
        },
    })
}
