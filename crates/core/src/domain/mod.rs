// Domain Layer - Pure business logic and entities

pub mod batch;
pub mod error;
pub mod run;
pub mod validation;

// Re-exports
pub use batch::{
    compute_tolerance, InclusionPolicy, MigrationBatchDescriptor, RiskLevel, ToleranceAssessment,
};
pub use error::DomainError;
pub use run::{MigrationRunState, RunId, RunStage, STATE_SCHEMA_VERSION};
pub use validation::{
    Identity, OverallStatus, ValidationDepth, ValidationIssue, ValidationResult,
};
