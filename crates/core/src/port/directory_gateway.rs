// Remote Directory Gateway Port
// Abstraction over reads/mutations of mailbox, license, permission, and
// batch state on the remote tenant. Every call may fail transiently or
// report a not-found outcome; callers dispatch on the error tag, never on
// concrete transport exception types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{Identity, MigrationBatchDescriptor};

/// Gateway failure, tagged by class.
///
/// NotFound is often an expected outcome (e.g. not yet provisioned) and is
/// non-retryable; Transient failures are the retry executor's concern; Auth
/// failures are the session manager's concern.
#[derive(Error, Debug, Clone)]
pub enum GatewayError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("transient failure: {0}")]
    Transient(String),

    #[error("authentication failure: {0}")]
    Auth(String),

    #[error("permission denied: {0}")]
    Permission(String),

    #[error("gateway error: {0}")]
    Unknown(String),
}

impl GatewayError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, GatewayError::NotFound(_))
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, GatewayError::Transient(_))
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, GatewayError::Auth(_))
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Directory view of one mailbox
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MailboxInfo {
    pub identity: Identity,
    pub display_name: String,
    pub user_principal_name: String,
    pub primary_smtp_address: String,
    pub alias: String,
    pub mailbox_guid: String,
    pub mailbox_type: String,
    pub recipient_type_details: String,
    pub organizational_unit: Option<String>,
    pub email_addresses: Vec<String>,
    pub move_request_status: Option<String>,
    pub litigation_hold_enabled: bool,
    pub retention_hold_enabled: bool,
    pub archive_enabled: bool,
    pub archive_size_mb: Option<f64>,
    pub forwarding_enabled: bool,
    pub forwarding_address: Option<String>,
    pub deliver_to_mailbox_and_forward: bool,
    pub inbox_rules_count: u64,
    pub active_sync_enabled: bool,
    pub imap_enabled: bool,
    pub pop_enabled: bool,
    pub audit_enabled: bool,
    pub audit_log_age_days: Option<u32>,
}

/// Mailbox content statistics
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MailboxStatistics {
    pub item_count: u64,
    pub total_size_mb: f64,
    pub deleted_item_count: u64,
    pub deleted_item_size_mb: f64,
    pub last_logon_time: Option<String>,
    pub largest_item_size_mb: f64,
    pub oversized_item_count: u64,
    pub folder_count: u64,
    pub max_folder_depth: u32,
    pub empty_folder_count: u64,
    pub folder_names: Vec<String>,
    pub calendar_item_count: u64,
    pub contact_item_count: u64,
    pub shared_calendar_count: u64,
}

/// One permission entry on a mailbox
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailboxPermission {
    pub holder: String,
    pub access_rights: String,
    pub orphaned: bool,
}

/// License assignment details for one identity
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LicenseDetails {
    pub sku: String,
    pub has_exchange_plan: bool,
    pub assignment_pending: bool,
}

/// Group membership view for one identity
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GroupMembershipInfo {
    pub groups: Vec<String>,
    pub max_nesting_depth: u32,
    pub distribution_group_member: bool,
}

/// Configured migration endpoint on the remote tenant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationEndpoint {
    pub name: String,
    pub remote_server: String,
    pub max_concurrent_migrations: u32,
}

/// Accepted domain on the remote tenant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcceptedDomain {
    pub name: String,
    pub is_default: bool,
}

/// Remote migration batch lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchState {
    Created,
    Syncing,
    Synced,
    Completing,
    Completed,
    Failed,
}

impl BatchState {
    /// The initial state a freshly submitted batch sits in until the remote
    /// service picks it up
    pub fn is_initial(&self) -> bool {
        matches!(self, BatchState::Created)
    }
}

/// Remote view of an existing migration batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationBatchInfo {
    pub batch_id: String,
    pub name: String,
    pub state: BatchState,
    pub mailbox_count: u64,
}

/// Remote Directory Gateway
///
/// Implementations: HTTP adapter in infra-remote; scriptable mock below.
#[async_trait]
pub trait DirectoryGateway: Send + Sync {
    /// (Re-)establish the authenticated session
    async fn reconnect(&self) -> GatewayResult<()>;

    async fn get_mailbox(&self, identity: &str) -> GatewayResult<MailboxInfo>;

    async fn get_mailbox_statistics(&self, identity: &str) -> GatewayResult<MailboxStatistics>;

    async fn get_permissions(&self, identity: &str) -> GatewayResult<Vec<MailboxPermission>>;

    async fn get_license_details(&self, identity: &str) -> GatewayResult<LicenseDetails>;

    async fn get_group_memberships(&self, identity: &str) -> GatewayResult<GroupMembershipInfo>;

    async fn get_accepted_domains(&self) -> GatewayResult<Vec<AcceptedDomain>>;

    async fn get_migration_endpoint(&self, name: &str) -> GatewayResult<MigrationEndpoint>;

    /// Create or update a migration endpoint definition (upsert by name)
    async fn set_migration_endpoint(&self, endpoint: &MigrationEndpoint) -> GatewayResult<()>;

    /// Look up an existing batch by name; NotFound when absent
    async fn get_migration_batch(&self, name: &str) -> GatewayResult<MigrationBatchInfo>;

    /// Submit a new batch; returns the remote batch id. A duplicate name is
    /// a conflict, not retryable.
    async fn create_migration_batch(
        &self,
        descriptor: &MigrationBatchDescriptor,
    ) -> GatewayResult<String>;

    async fn start_migration_batch(&self, batch_id: &str) -> GatewayResult<()>;

    /// Add one mailbox to a non-started batch with its bad-item tolerance
    async fn add_mailbox_to_batch(
        &self,
        batch_id: &str,
        identity: &str,
        bad_item_limit: u32,
    ) -> GatewayResult<()>;

    async fn get_batch_status(&self, batch_id: &str) -> GatewayResult<BatchState>;
}

// ============================================================================
// Mock Implementation for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::{HashMap, VecDeque};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Fixture for one provisioned mailbox
    #[derive(Debug, Clone)]
    pub struct MockMailbox {
        pub info: MailboxInfo,
        pub statistics: MailboxStatistics,
        pub permissions: Vec<MailboxPermission>,
        pub license: LicenseDetails,
        pub groups: GroupMembershipInfo,
    }

    impl MockMailbox {
        /// A mailbox that passes every check
        pub fn healthy(identity: &str) -> Self {
            let domain = identity.split('@').nth(1).unwrap_or("contoso.com");
            Self {
                info: MailboxInfo {
                    identity: identity.to_string(),
                    display_name: identity.to_string(),
                    user_principal_name: identity.to_string(),
                    primary_smtp_address: identity.to_string(),
                    alias: identity.split('@').next().unwrap_or(identity).to_string(),
                    mailbox_guid: format!("guid-{}", identity),
                    mailbox_type: "UserMailbox".to_string(),
                    recipient_type_details: "UserMailbox".to_string(),
                    email_addresses: vec![format!("SMTP:{}", identity)],
                    audit_enabled: true,
                    audit_log_age_days: Some(90),
                    ..Default::default()
                },
                statistics: MailboxStatistics {
                    item_count: 1_000,
                    total_size_mb: 512.0,
                    folder_count: 20,
                    max_folder_depth: 4,
                    folder_names: vec!["Inbox".into(), "Sent Items".into()],
                    calendar_item_count: 50,
                    contact_item_count: 30,
                    ..Default::default()
                },
                permissions: Vec::new(),
                license: LicenseDetails {
                    sku: "ENTERPRISEPACK".to_string(),
                    has_exchange_plan: true,
                    assignment_pending: false,
                },
                groups: GroupMembershipInfo {
                    groups: vec![format!("all-users@{}", domain)],
                    max_nesting_depth: 1,
                    distribution_group_member: false,
                },
            }
        }
    }

    #[derive(Default)]
    struct MockState {
        mailboxes: HashMap<Identity, MockMailbox>,
        accepted_domains: Vec<AcceptedDomain>,
        endpoints: HashMap<String, MigrationEndpoint>,
        batches: HashMap<String, MigrationBatchInfo>, // keyed by batch id
        batch_mailboxes: Vec<(String, Identity, u32)>,
        started_batches: Vec<String>,
        status_script: VecDeque<BatchState>,
        fail_scripts: HashMap<&'static str, VecDeque<GatewayError>>,
        calls: HashMap<&'static str, usize>,
        next_batch_seq: u64,
    }

    /// Scriptable in-memory gateway.
    ///
    /// Per-method failure scripts are consumed one entry per call, which
    /// lets tests model "transient once, then success". Call counters and a
    /// max-in-flight gauge support the concurrency assertions.
    pub struct MockDirectoryGateway {
        state: Mutex<MockState>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        reconnects: AtomicUsize,
        call_delay: Option<Duration>,
    }

    impl Default for MockDirectoryGateway {
        fn default() -> Self {
            Self::new()
        }
    }

    impl MockDirectoryGateway {
        pub fn new() -> Self {
            let state = MockState {
                accepted_domains: vec![AcceptedDomain {
                    name: "contoso.com".to_string(),
                    is_default: true,
                }],
                ..Default::default()
            };
            Self {
                state: Mutex::new(state),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
                reconnects: AtomicUsize::new(0),
                call_delay: None,
            }
        }

        /// Delay every remote call, forcing calls from concurrent workers to
        /// overlap so the in-flight gauge is meaningful
        pub fn with_call_delay(mut self, delay: Duration) -> Self {
            self.call_delay = Some(delay);
            self
        }

        pub fn add_mailbox(&self, mailbox: MockMailbox) {
            let mut state = self.state.lock().unwrap();
            state
                .mailboxes
                .insert(mailbox.info.identity.clone(), mailbox);
        }

        pub fn add_healthy_mailboxes(&self, identities: &[&str]) {
            for identity in identities {
                self.add_mailbox(MockMailbox::healthy(identity));
            }
        }

        pub fn add_endpoint(&self, endpoint: MigrationEndpoint) {
            let mut state = self.state.lock().unwrap();
            state.endpoints.insert(endpoint.name.clone(), endpoint);
        }

        /// Queue a failure for the next call of `method`
        pub fn push_failure(&self, method: &'static str, error: GatewayError) {
            let mut state = self.state.lock().unwrap();
            state.fail_scripts.entry(method).or_default().push_back(error);
        }

        /// Queue a sequence of batch states returned by successive
        /// `get_batch_status` calls
        pub fn script_batch_status(&self, states: &[BatchState]) {
            let mut state = self.state.lock().unwrap();
            state.status_script.extend(states.iter().copied());
        }

        pub fn calls_for(&self, method: &'static str) -> usize {
            let state = self.state.lock().unwrap();
            state.calls.get(method).copied().unwrap_or(0)
        }

        pub fn total_calls(&self) -> usize {
            let state = self.state.lock().unwrap();
            state.calls.values().sum()
        }

        pub fn reconnect_count(&self) -> usize {
            self.reconnects.load(Ordering::SeqCst)
        }

        pub fn max_in_flight(&self) -> usize {
            self.max_in_flight.load(Ordering::SeqCst)
        }

        pub fn started_batches(&self) -> Vec<String> {
            self.state.lock().unwrap().started_batches.clone()
        }

        pub fn batch_additions(&self) -> Vec<(String, Identity, u32)> {
            self.state.lock().unwrap().batch_mailboxes.clone()
        }

        pub fn created_batches(&self) -> Vec<MigrationBatchInfo> {
            self.state.lock().unwrap().batches.values().cloned().collect()
        }

        async fn enter(&self, method: &'static str) -> Result<(), GatewayError> {
            let scripted = {
                let mut state = self.state.lock().unwrap();
                *state.calls.entry(method).or_insert(0) += 1;
                state
                    .fail_scripts
                    .get_mut(method)
                    .and_then(|q| q.pop_front())
            };

            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(current, Ordering::SeqCst);

            if let Some(delay) = self.call_delay {
                tokio::time::sleep(delay).await;
            }

            if let Some(err) = scripted {
                self.in_flight.fetch_sub(1, Ordering::SeqCst);
                return Err(err);
            }
            Ok(())
        }

        fn exit(&self) {
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
        }

        fn lookup<T>(
            &self,
            identity: &str,
            f: impl FnOnce(&MockMailbox) -> T,
        ) -> GatewayResult<T> {
            let state = self.state.lock().unwrap();
            state
                .mailboxes
                .get(identity)
                .map(f)
                .ok_or_else(|| GatewayError::NotFound(format!("mailbox {} not found", identity)))
        }
    }

    #[async_trait]
    impl DirectoryGateway for MockDirectoryGateway {
        async fn reconnect(&self) -> GatewayResult<()> {
            let scripted = {
                let mut state = self.state.lock().unwrap();
                *state.calls.entry("reconnect").or_insert(0) += 1;
                state
                    .fail_scripts
                    .get_mut("reconnect")
                    .and_then(|q| q.pop_front())
            };
            if let Some(err) = scripted {
                return Err(err);
            }
            self.reconnects.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn get_mailbox(&self, identity: &str) -> GatewayResult<MailboxInfo> {
            self.enter("get_mailbox").await?;
            let result = self.lookup(identity, |m| m.info.clone());
            self.exit();
            result
        }

        async fn get_mailbox_statistics(&self, identity: &str) -> GatewayResult<MailboxStatistics> {
            self.enter("get_mailbox_statistics").await?;
            let result = self.lookup(identity, |m| m.statistics.clone());
            self.exit();
            result
        }

        async fn get_permissions(&self, identity: &str) -> GatewayResult<Vec<MailboxPermission>> {
            self.enter("get_permissions").await?;
            let result = self.lookup(identity, |m| m.permissions.clone());
            self.exit();
            result
        }

        async fn get_license_details(&self, identity: &str) -> GatewayResult<LicenseDetails> {
            self.enter("get_license_details").await?;
            let result = self.lookup(identity, |m| m.license.clone());
            self.exit();
            result
        }

        async fn get_group_memberships(&self, identity: &str) -> GatewayResult<GroupMembershipInfo> {
            self.enter("get_group_memberships").await?;
            let result = self.lookup(identity, |m| m.groups.clone());
            self.exit();
            result
        }

        async fn get_accepted_domains(&self) -> GatewayResult<Vec<AcceptedDomain>> {
            self.enter("get_accepted_domains").await?;
            let domains = self.state.lock().unwrap().accepted_domains.clone();
            self.exit();
            Ok(domains)
        }

        async fn get_migration_endpoint(&self, name: &str) -> GatewayResult<MigrationEndpoint> {
            self.enter("get_migration_endpoint").await?;
            let result = {
                let state = self.state.lock().unwrap();
                state.endpoints.get(name).cloned().ok_or_else(|| {
                    GatewayError::NotFound(format!("migration endpoint {} not found", name))
                })
            };
            self.exit();
            result
        }

        async fn set_migration_endpoint(&self, endpoint: &MigrationEndpoint) -> GatewayResult<()> {
            self.enter("set_migration_endpoint").await?;
            {
                let mut state = self.state.lock().unwrap();
                state
                    .endpoints
                    .insert(endpoint.name.clone(), endpoint.clone());
            }
            self.exit();
            Ok(())
        }

        async fn get_migration_batch(&self, name: &str) -> GatewayResult<MigrationBatchInfo> {
            self.enter("get_migration_batch").await?;
            let result = {
                let state = self.state.lock().unwrap();
                state
                    .batches
                    .values()
                    .find(|b| b.name == name)
                    .cloned()
                    .ok_or_else(|| {
                        GatewayError::NotFound(format!("migration batch {} not found", name))
                    })
            };
            self.exit();
            result
        }

        async fn create_migration_batch(
            &self,
            descriptor: &MigrationBatchDescriptor,
        ) -> GatewayResult<String> {
            self.enter("create_migration_batch").await?;
            let result = {
                let mut state = self.state.lock().unwrap();
                if state.batches.values().any(|b| b.name == descriptor.name) {
                    Err(GatewayError::Unknown(format!(
                        "migration batch {} already exists",
                        descriptor.name
                    )))
                } else {
                    state.next_batch_seq += 1;
                    let batch_id = format!("batch-{:04}", state.next_batch_seq);
                    state.batches.insert(
                        batch_id.clone(),
                        MigrationBatchInfo {
                            batch_id: batch_id.clone(),
                            name: descriptor.name.clone(),
                            state: BatchState::Created,
                            mailbox_count: descriptor.mailboxes.len() as u64,
                        },
                    );
                    if descriptor.auto_start {
                        state.started_batches.push(batch_id.clone());
                    }
                    Ok(batch_id)
                }
            };
            self.exit();
            result
        }

        async fn start_migration_batch(&self, batch_id: &str) -> GatewayResult<()> {
            self.enter("start_migration_batch").await?;
            let result = {
                let mut state = self.state.lock().unwrap();
                if state.batches.contains_key(batch_id) {
                    state.started_batches.push(batch_id.to_string());
                    Ok(())
                } else {
                    Err(GatewayError::NotFound(format!(
                        "migration batch {} not found",
                        batch_id
                    )))
                }
            };
            self.exit();
            result
        }

        async fn add_mailbox_to_batch(
            &self,
            batch_id: &str,
            identity: &str,
            bad_item_limit: u32,
        ) -> GatewayResult<()> {
            self.enter("add_mailbox_to_batch").await?;
            let result = {
                let mut state = self.state.lock().unwrap();
                if let Some(batch) = state.batches.get_mut(batch_id) {
                    batch.mailbox_count += 1;
                    state.batch_mailboxes.push((
                        batch_id.to_string(),
                        identity.to_string(),
                        bad_item_limit,
                    ));
                    Ok(())
                } else {
                    Err(GatewayError::NotFound(format!(
                        "migration batch {} not found",
                        batch_id
                    )))
                }
            };
            self.exit();
            result
        }

        async fn get_batch_status(&self, batch_id: &str) -> GatewayResult<BatchState> {
            self.enter("get_batch_status").await?;
            let result = {
                let mut state = self.state.lock().unwrap();
                if let Some(scripted) = state.status_script.pop_front() {
                    Ok(scripted)
                } else {
                    state
                        .batches
                        .get(batch_id)
                        .map(|b| b.state)
                        .ok_or_else(|| {
                            GatewayError::NotFound(format!(
                                "migration batch {} not found",
                                batch_id
                            ))
                        })
                }
            };
            self.exit();
            result
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mocks::MockDirectoryGateway;
    use super::*;

    #[tokio::test]
    async fn test_endpoint_upsert_round_trip() {
        let gateway = MockDirectoryGateway::new();
        let absent = gateway.get_migration_endpoint("onprem-endpoint").await;
        assert!(absent.unwrap_err().is_not_found());

        let endpoint = MigrationEndpoint {
            name: "onprem-endpoint".into(),
            remote_server: "mail.contoso.local".into(),
            max_concurrent_migrations: 20,
        };
        gateway.set_migration_endpoint(&endpoint).await.unwrap();
        let fetched = gateway
            .get_migration_endpoint("onprem-endpoint")
            .await
            .unwrap();
        assert_eq!(fetched.remote_server, "mail.contoso.local");

        // Re-pointing an existing endpoint overwrites it
        let moved = MigrationEndpoint {
            remote_server: "mail2.contoso.local".into(),
            ..endpoint
        };
        gateway.set_migration_endpoint(&moved).await.unwrap();
        let fetched = gateway
            .get_migration_endpoint("onprem-endpoint")
            .await
            .unwrap();
        assert_eq!(fetched.remote_server, "mail2.contoso.local");
    }
}
