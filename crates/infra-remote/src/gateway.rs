// HTTP adapter for the DirectoryGateway port

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use mailferry_core::domain::MigrationBatchDescriptor;
use mailferry_core::port::{
    AcceptedDomain, BatchState, DirectoryGateway, GatewayError, GatewayResult,
    GroupMembershipInfo, LicenseDetails, MailboxInfo, MailboxPermission, MailboxStatistics,
    MigrationBatchInfo, MigrationEndpoint,
};

use crate::auth::TokenManager;
use crate::types::{
    AddMailboxRequest, BatchStatusResponse, CreateBatchRequest, CreateBatchResponse,
    ErrorEnvelope,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Remote directory service settings, read from the environment by the CLI
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    pub base_url: String,
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
}

/// Map an HTTP status to the gateway error taxonomy
fn map_status(status: StatusCode, detail: &str) -> GatewayError {
    match status {
        StatusCode::NOT_FOUND => GatewayError::NotFound(detail.to_string()),
        StatusCode::UNAUTHORIZED => GatewayError::Auth(detail.to_string()),
        StatusCode::FORBIDDEN => GatewayError::Permission(detail.to_string()),
        StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => {
            GatewayError::Transient(format!("{}: {}", status, detail))
        }
        s if s.is_server_error() => GatewayError::Transient(format!("{}: {}", s, detail)),
        s => GatewayError::Unknown(format!("{}: {}", s, detail)),
    }
}

fn transport_error(error: reqwest::Error) -> GatewayError {
    if error.is_timeout() || error.is_connect() {
        GatewayError::Transient(format!("transport failure: {}", error))
    } else {
        GatewayError::Unknown(format!("transport failure: {}", error))
    }
}

/// reqwest-backed DirectoryGateway.
///
/// Responses are dispatched purely on status code through `map_status`;
/// no transport exception type ever crosses the port boundary.
pub struct HttpDirectoryGateway {
    http: reqwest::Client,
    base_url: String,
    tokens: TokenManager,
}

impl HttpDirectoryGateway {
    pub fn new(config: RemoteConfig) -> GatewayResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| GatewayError::Unknown(format!("http client: {}", e)))?;

        let base_url = config.base_url.trim_end_matches('/').to_string();
        let token_url = format!("{}/oauth/{}/token", base_url, config.tenant_id);
        let tokens = TokenManager::new(
            http.clone(),
            token_url,
            config.client_id,
            config.client_secret,
        );

        Ok(Self {
            http,
            base_url,
            tokens,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn check<T: DeserializeOwned>(response: reqwest::Response) -> GatewayResult<T> {
        let status = response.status();
        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| GatewayError::Unknown(format!("malformed response: {}", e)));
        }
        let envelope: ErrorEnvelope = response.json().await.unwrap_or_default();
        let detail = envelope.detail().unwrap_or("no detail").to_string();
        Err(map_status(status, &detail))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> GatewayResult<T> {
        let token = self.tokens.bearer().await?;
        debug!(path = %path, "GET");
        let response = self
            .http
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .map_err(transport_error)?;
        Self::check(response).await
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> GatewayResult<T> {
        let token = self.tokens.bearer().await?;
        debug!(path = %path, "POST");
        let response = self
            .http
            .post(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;
        Self::check(response).await
    }

    fn encode(segment: &str) -> String {
        // Identities carry '@'; keep unreserved characters readable
        segment
            .bytes()
            .map(|b| match b {
                b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                    (b as char).to_string()
                }
                other => format!("%{:02X}", other),
            })
            .collect()
    }
}

#[async_trait]
impl DirectoryGateway for HttpDirectoryGateway {
    async fn reconnect(&self) -> GatewayResult<()> {
        self.tokens.refresh().await
    }

    async fn get_mailbox(&self, identity: &str) -> GatewayResult<MailboxInfo> {
        self.get_json(&format!("/mailboxes/{}", Self::encode(identity)))
            .await
    }

    async fn get_mailbox_statistics(&self, identity: &str) -> GatewayResult<MailboxStatistics> {
        self.get_json(&format!(
            "/mailboxes/{}/statistics",
            Self::encode(identity)
        ))
        .await
    }

    async fn get_permissions(&self, identity: &str) -> GatewayResult<Vec<MailboxPermission>> {
        self.get_json(&format!(
            "/mailboxes/{}/permissions",
            Self::encode(identity)
        ))
        .await
    }

    async fn get_license_details(&self, identity: &str) -> GatewayResult<LicenseDetails> {
        self.get_json(&format!("/mailboxes/{}/license", Self::encode(identity)))
            .await
    }

    async fn get_group_memberships(&self, identity: &str) -> GatewayResult<GroupMembershipInfo> {
        self.get_json(&format!("/mailboxes/{}/groups", Self::encode(identity)))
            .await
    }

    async fn get_accepted_domains(&self) -> GatewayResult<Vec<AcceptedDomain>> {
        self.get_json("/domains/accepted").await
    }

    async fn get_migration_endpoint(&self, name: &str) -> GatewayResult<MigrationEndpoint> {
        self.get_json(&format!("/migration/endpoints/{}", Self::encode(name)))
            .await
    }

    async fn set_migration_endpoint(&self, endpoint: &MigrationEndpoint) -> GatewayResult<()> {
        let _: serde_json::Value = self
            .post_json("/migration/endpoints", endpoint)
            .await?;
        Ok(())
    }

    async fn get_migration_batch(&self, name: &str) -> GatewayResult<MigrationBatchInfo> {
        self.get_json(&format!(
            "/migration/batches/by-name/{}",
            Self::encode(name)
        ))
        .await
    }

    async fn create_migration_batch(
        &self,
        descriptor: &MigrationBatchDescriptor,
    ) -> GatewayResult<String> {
        let request = CreateBatchRequest {
            name: descriptor.name.clone(),
            source_endpoint: descriptor.source_endpoint.clone(),
            target_delivery_domain: descriptor.target_domain.clone(),
            complete_after: descriptor.complete_after,
            start_after: descriptor.start_after,
            notification_emails: descriptor.notification_emails.clone(),
            mailboxes: descriptor.mailboxes.clone(),
            auto_start: descriptor.auto_start,
        };
        let response: CreateBatchResponse =
            self.post_json("/migration/batches", &request).await?;
        Ok(response.batch_id)
    }

    async fn start_migration_batch(&self, batch_id: &str) -> GatewayResult<()> {
        let _: serde_json::Value = self
            .post_json(
                &format!("/migration/batches/{}/start", Self::encode(batch_id)),
                &serde_json::json!({}),
            )
            .await?;
        Ok(())
    }

    async fn add_mailbox_to_batch(
        &self,
        batch_id: &str,
        identity: &str,
        bad_item_limit: u32,
    ) -> GatewayResult<()> {
        let request = AddMailboxRequest {
            identity: identity.to_string(),
            bad_item_limit,
        };
        let _: serde_json::Value = self
            .post_json(
                &format!(
                    "/migration/batches/{}/mailboxes",
                    Self::encode(batch_id)
                ),
                &request,
            )
            .await?;
        Ok(())
    }

    async fn get_batch_status(&self, batch_id: &str) -> GatewayResult<BatchState> {
        let response: BatchStatusResponse = self
            .get_json(&format!(
                "/migration/batches/{}/status",
                Self::encode(batch_id)
            ))
            .await?;
        Ok(response.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping_covers_the_taxonomy() {
        assert!(map_status(StatusCode::NOT_FOUND, "x").is_not_found());
        assert!(map_status(StatusCode::UNAUTHORIZED, "x").is_auth());
        assert!(matches!(
            map_status(StatusCode::FORBIDDEN, "x"),
            GatewayError::Permission(_)
        ));
        assert!(map_status(StatusCode::TOO_MANY_REQUESTS, "x").is_transient());
        assert!(map_status(StatusCode::SERVICE_UNAVAILABLE, "x").is_transient());
        assert!(map_status(StatusCode::BAD_GATEWAY, "x").is_transient());
        assert!(matches!(
            map_status(StatusCode::CONFLICT, "x"),
            GatewayError::Unknown(_)
        ));
    }

    #[test]
    fn test_identity_path_encoding() {
        assert_eq!(
            HttpDirectoryGateway::encode("alice@contoso.com"),
            "alice%40contoso.com"
        );
        assert_eq!(HttpDirectoryGateway::encode("batch-0001"), "batch-0001");
    }
}
