// Mailferry File Infrastructure - adapters over the local filesystem

pub mod artifact_store;
pub mod identity_source;
pub mod state_store;

pub use artifact_store::FileArtifactStore;
pub use identity_source::CsvIdentitySource;
pub use state_store::FileRunStateStore;
