// Port Layer - Interfaces for external dependencies

pub mod artifact_store;
pub mod directory_gateway;
pub mod identity_source;
pub mod prompt;
pub mod run_state_store;
pub mod time_provider;

// Re-exports
pub use artifact_store::{ArtifactStore, StatusCounts};
pub use directory_gateway::{
    AcceptedDomain, BatchState, DirectoryGateway, GatewayError, GatewayResult,
    GroupMembershipInfo, LicenseDetails, MailboxInfo, MailboxPermission, MailboxStatistics,
    MigrationBatchInfo, MigrationEndpoint,
};
pub use identity_source::IdentitySource;
pub use prompt::OperatorPrompt;
pub use run_state_store::RunStateStore;
pub use time_provider::TimeProvider;
