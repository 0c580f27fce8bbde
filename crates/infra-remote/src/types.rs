// Wire types for the remote directory service

use serde::{Deserialize, Serialize};

use mailferry_core::port::BatchState;

/// Client-credentials token grant response
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub token_type: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBatchRequest {
    pub name: String,
    pub source_endpoint: String,
    pub target_delivery_domain: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub complete_after: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_after: Option<i64>,
    pub notification_emails: Vec<String>,
    pub mailboxes: Vec<String>,
    pub auto_start: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBatchResponse {
    pub batch_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMailboxRequest {
    pub identity: String,
    pub bad_item_limit: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchStatusResponse {
    pub state: BatchState,
}

/// Error envelope some service responses carry
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ErrorEnvelope {
    pub error: Option<String>,
    pub message: Option<String>,
}

impl ErrorEnvelope {
    pub fn detail(&self) -> Option<&str> {
        self.message.as_deref().or(self.error.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_response_tolerates_missing_optionals() {
        let parsed: TokenResponse =
            serde_json::from_str(r#"{"access_token": "abc123"}"#).unwrap();
        assert_eq!(parsed.access_token, "abc123");
        assert!(parsed.expires_in.is_none());
    }

    #[test]
    fn test_batch_status_parses_screaming_snake_state() {
        let parsed: BatchStatusResponse =
            serde_json::from_str(r#"{"state": "SYNCING"}"#).unwrap();
        assert_eq!(parsed.state, BatchState::Syncing);
    }

    #[test]
    fn test_create_request_serializes_camel_case() {
        let request = CreateBatchRequest {
            name: "wave-1".into(),
            source_endpoint: "onprem".into(),
            target_delivery_domain: "contoso.mail.onmicrosoft.com".into(),
            complete_after: None,
            start_after: None,
            notification_emails: vec![],
            mailboxes: vec!["alice@contoso.com".into()],
            auto_start: true,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["sourceEndpoint"], "onprem");
        assert_eq!(json["autoStart"], true);
        assert!(json.get("completeAfter").is_none());
    }
}
