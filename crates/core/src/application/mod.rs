// Application Layer - orchestration over the domain model and ports

pub mod checks;
pub mod decision;
pub mod executor;
pub mod retry;
pub mod run;
pub mod runner;
pub mod session;
pub mod shutdown;

pub use decision::{
    select_identities, BatchDecisionEngine, BatchOutcome, Classification, SubmissionStrategy,
};
pub use executor::ValidationExecutor;
pub use retry::{backoff_delay, execute_with_retry, RetryOptions, RetryPredicate};
pub use run::{MigrationRun, RunConfig, RunOutcome, SourceFactory};
pub use runner::CheckRunner;
pub use session::SessionManager;
pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};
