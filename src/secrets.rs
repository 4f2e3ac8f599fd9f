//! Secret parameter client.
//!
//! Fetches a named parameter with decryption requested. The value lives for
//! the duration of one clone call and is never cached or persisted.

use reqwest::Client;
use serde::Deserialize;

use crate::error::{HandlerError, Result};

#[derive(Debug, Deserialize)]
struct Parameter {
    value: String,
}

/// HTTP client for the secret-retrieval service.
#[derive(Debug, Clone)]
pub struct SecretClient {
    base_url: String,
    client: Client,
}

impl SecretClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolve the decrypted value of a named parameter. A missing parameter
    /// and a caller without decryption rights both surface as
    /// `SecretUnavailable`; the invocation answers the caller either way.
    pub async fn resolve(&self, parameter_name: &str) -> Result<String> {
        let url = format!("{}/api/parameters/{}", self.base_url, parameter_name);
        let response = self
            .client
            .get(&url)
            .query(&[("with_decryption", "true")])
            .send()
            .await
            .map_err(|e| {
                HandlerError::SecretUnavailable(format!(
                    "request for parameter '{}' failed: {}",
                    parameter_name, e
                ))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(HandlerError::SecretUnavailable(format!(
                "service returned status {} for parameter '{}': {}",
                status.as_u16(),
                parameter_name,
                body
            )));
        }

        let parameter: Parameter = response.json().await.map_err(|e| {
            HandlerError::SecretUnavailable(format!(
                "could not decode parameter '{}': {}",
                parameter_name, e
            ))
        })?;
        Ok(parameter.value)
    }
}
