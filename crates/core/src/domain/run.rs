// Migration Run State Model (checkpointed, resumable)

use serde::{Deserialize, Serialize};

use crate::domain::error::{DomainError, Result};
use crate::domain::validation::Identity;

/// Run ID (UUID v4)
pub type RunId = String;

/// Current schema version for persisted run state
pub const STATE_SCHEMA_VERSION: u32 = 1;

/// Ordered run stages. `current_stage` advances only forward through this
/// total order; `Failed` is terminal and reachable from any stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStage {
    #[default]
    Initializing,
    CheckingDependencies,
    ConnectingServices,
    ValidatingMailboxes,
    GeneratingReport,
    PrepareForBatchCreation,
    CreatingBatch,
    Completed,
    Failed,
}

impl RunStage {
    /// Position in the forward total order. Terminal Failed sits outside it.
    fn order(&self) -> Option<u8> {
        match self {
            RunStage::Initializing => Some(0),
            RunStage::CheckingDependencies => Some(1),
            RunStage::ConnectingServices => Some(2),
            RunStage::ValidatingMailboxes => Some(3),
            RunStage::GeneratingReport => Some(4),
            RunStage::PrepareForBatchCreation => Some(5),
            RunStage::CreatingBatch => Some(6),
            RunStage::Completed => Some(7),
            RunStage::Failed => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStage::Completed | RunStage::Failed)
    }

    /// The next stage in the total order, if any
    pub fn next(&self) -> Option<RunStage> {
        match self {
            RunStage::Initializing => Some(RunStage::CheckingDependencies),
            RunStage::CheckingDependencies => Some(RunStage::ConnectingServices),
            RunStage::ConnectingServices => Some(RunStage::ValidatingMailboxes),
            RunStage::ValidatingMailboxes => Some(RunStage::GeneratingReport),
            RunStage::GeneratingReport => Some(RunStage::PrepareForBatchCreation),
            RunStage::PrepareForBatchCreation => Some(RunStage::CreatingBatch),
            RunStage::CreatingBatch => Some(RunStage::Completed),
            RunStage::Completed | RunStage::Failed => None,
        }
    }
}

impl std::fmt::Display for RunStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RunStage::Initializing => "INITIALIZING",
            RunStage::CheckingDependencies => "CHECKING_DEPENDENCIES",
            RunStage::ConnectingServices => "CONNECTING_SERVICES",
            RunStage::ValidatingMailboxes => "VALIDATING_MAILBOXES",
            RunStage::GeneratingReport => "GENERATING_REPORT",
            RunStage::PrepareForBatchCreation => "PREPARE_FOR_BATCH_CREATION",
            RunStage::CreatingBatch => "CREATING_BATCH",
            RunStage::Completed => "COMPLETED",
            RunStage::Failed => "FAILED",
        };
        write!(f, "{}", s)
    }
}

/// Persisted run state, rewritten after every stage transition.
///
/// Schema-versioned; every field defaults on load so resumed runs tolerate
/// unknown fields and missing ones (forward/backward compatibility).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MigrationRunState {
    pub schema_version: u32,
    pub run_id: RunId,
    pub batch_name: String,
    pub source_file_path: String,
    pub current_stage: RunStage,

    // Validation checkpoint
    pub validation_complete: bool,
    pub validation_results_location: Option<String>,

    // Classification (populated by GeneratingReport)
    pub ready_list: Vec<Identity>,
    pub warning_list: Vec<Identity>,
    pub failed_list: Vec<Identity>,

    // Batch creation
    pub batch_id: Option<String>,

    // Timestamps (epoch ms)
    pub created_at: i64,
    pub updated_at: i64,

    // Failure bookkeeping
    pub failed_at_stage: Option<RunStage>,
    pub last_error: Option<String>,
}

impl MigrationRunState {
    pub fn new(
        run_id: impl Into<RunId>,
        batch_name: impl Into<String>,
        source_file_path: impl Into<String>,
        now_millis: i64,
    ) -> Self {
        Self {
            schema_version: STATE_SCHEMA_VERSION,
            run_id: run_id.into(),
            batch_name: batch_name.into(),
            source_file_path: source_file_path.into(),
            current_stage: RunStage::Initializing,
            created_at: now_millis,
            updated_at: now_millis,
            ..Default::default()
        }
    }

    /// Advance to `next`. Only forward transitions through the total order
    /// are permitted.
    pub fn advance_to(&mut self, next: RunStage, now_millis: i64) -> Result<()> {
        let (Some(from), Some(to)) = (self.current_stage.order(), next.order()) else {
            return Err(DomainError::InvalidStageTransition {
                from: self.current_stage.to_string(),
                to: next.to_string(),
            });
        };
        if to <= from {
            return Err(DomainError::InvalidStageTransition {
                from: self.current_stage.to_string(),
                to: next.to_string(),
            });
        }
        self.current_stage = next;
        self.updated_at = now_millis;
        Ok(())
    }

    /// Halt the run: record the failing stage and error, enter terminal Failed
    pub fn mark_failed(&mut self, at: RunStage, error: impl Into<String>, now_millis: i64) {
        self.failed_at_stage = Some(at);
        self.last_error = Some(error.into());
        self.current_stage = RunStage::Failed;
        self.updated_at = now_millis;
    }

    /// Stage a resumed run re-enters: the last persisted non-terminal stage.
    /// A Failed run re-enters at the stage it failed in; a Completed run has
    /// nothing left to do.
    pub fn resume_stage(&self) -> Option<RunStage> {
        match self.current_stage {
            RunStage::Completed => None,
            RunStage::Failed => Some(self.failed_at_stage.unwrap_or(RunStage::Initializing)),
            stage => Some(stage),
        }
    }

    /// Clear failure bookkeeping when a Failed run is resumed
    pub fn clear_failure(&mut self, resume_at: RunStage, now_millis: i64) {
        self.current_stage = resume_at;
        self.failed_at_stage = None;
        self.last_error = None;
        self.updated_at = now_millis;
    }
}
