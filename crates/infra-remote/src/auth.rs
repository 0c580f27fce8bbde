// Bearer token acquisition via the client-credentials grant

use tokio::sync::Mutex;
use tracing::{debug, info};

use mailferry_core::port::{GatewayError, GatewayResult};

use crate::types::TokenResponse;

/// Owns the bearer token for the directory service.
///
/// The gateway's `reconnect` forces a fresh grant; individual calls reuse
/// the cached token. Expiry is handled upstream by the session manager's
/// lifetime accounting, so no clock lives here.
pub struct TokenManager {
    http: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    token: Mutex<Option<String>>,
}

impl TokenManager {
    pub fn new(
        http: reqwest::Client,
        token_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            http,
            token_url: token_url.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            token: Mutex::new(None),
        }
    }

    /// The current bearer token, acquiring one on first use
    pub async fn bearer(&self) -> GatewayResult<String> {
        let mut guard = self.token.lock().await;
        if let Some(token) = guard.as_ref() {
            return Ok(token.clone());
        }
        let fresh = self.acquire().await?;
        *guard = Some(fresh.clone());
        Ok(fresh)
    }

    /// Discard the cached token and acquire a new one
    pub async fn refresh(&self) -> GatewayResult<()> {
        let mut guard = self.token.lock().await;
        let fresh = self.acquire().await?;
        *guard = Some(fresh);
        info!("Bearer token refreshed");
        Ok(())
    }

    async fn acquire(&self) -> GatewayResult<String> {
        debug!(url = %self.token_url, "Requesting bearer token");
        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(|e| GatewayError::Transient(format!("token request failed: {}", e)))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED
            || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(GatewayError::Auth(format!(
                "token grant rejected with {}",
                status
            )));
        }
        if !status.is_success() {
            return Err(GatewayError::Transient(format!(
                "token endpoint returned {}",
                status
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Unknown(format!("malformed token response: {}", e)))?;
        Ok(token.access_token)
    }
}
