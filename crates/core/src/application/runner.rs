// Check Runner - sequential execution of the selected check set for one
// identity, with per-check failure isolation

use std::sync::Arc;

use tracing::{debug, warn};

use crate::application::checks::{checks_for, CheckContext, ReadinessCheck};
use crate::application::retry::RetryOptions;
use crate::application::session::SessionManager;
use crate::domain::{ValidationDepth, ValidationResult};
use crate::port::{DirectoryGateway, TimeProvider};

/// Runs every check of the selected depth against one identity.
///
/// Checks are isolated failure domains: one exhausting its retries
/// contributes a warning and execution continues unconditionally; no single
/// check can abort its mailbox or skip subsequent checks.
pub struct CheckRunner {
    ctx: CheckContext,
    checks: Vec<Arc<dyn ReadinessCheck>>,
    time_provider: Arc<dyn TimeProvider>,
}

impl CheckRunner {
    pub fn new(
        gateway: Arc<dyn DirectoryGateway>,
        session: Arc<SessionManager>,
        time_provider: Arc<dyn TimeProvider>,
        depth: ValidationDepth,
        retry: RetryOptions,
    ) -> Self {
        Self {
            ctx: CheckContext {
                gateway,
                session,
                retry,
            },
            checks: checks_for(depth),
            time_provider,
        }
    }

    /// Number of checks the selected depth runs per identity
    pub fn check_count(&self) -> usize {
        self.checks.len()
    }

    /// Validate one identity. Never fails: every per-check failure lands in
    /// the result aggregate itself.
    pub async fn run_checks(&self, identity: &str) -> ValidationResult {
        let mut result = ValidationResult::new(identity);

        for check in &self.checks {
            debug!(identity = %identity, check = %check.name(), "Running check");
            if let Err(error) = check.run(&self.ctx, &mut result).await {
                warn!(
                    identity = %identity,
                    check = %check.name(),
                    error = %error,
                    "Check failed after retries, continuing"
                );
                result.add_warning(format!(
                    "failed to perform {}: {}",
                    check.name(),
                    error
                ));
            }
        }

        result.finalize(self.time_provider.now_millis());
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::OverallStatus;
    use crate::port::directory_gateway::mocks::MockDirectoryGateway;
    use crate::port::time_provider::mocks::MockTimeProvider;
    use crate::port::GatewayError;
    use std::time::Duration;

    fn runner_for(gateway: Arc<MockDirectoryGateway>, depth: ValidationDepth) -> CheckRunner {
        let time = Arc::new(MockTimeProvider::new(1_000_000));
        let session = Arc::new(SessionManager::new(gateway.clone(), time.clone()));
        CheckRunner::new(
            gateway,
            session,
            time,
            depth,
            RetryOptions::transient_only(2, Duration::from_millis(1)),
        )
    }

    #[tokio::test]
    async fn test_healthy_mailbox_is_ready() {
        let gateway = Arc::new(MockDirectoryGateway::new());
        gateway.add_healthy_mailboxes(&["alice@contoso.com"]);

        let runner = runner_for(gateway, ValidationDepth::Comprehensive);
        let result = runner.run_checks("alice@contoso.com").await;

        assert_eq!(result.overall_status, OverallStatus::Ready, "{:?}", result.warnings);
        assert!(result.mailbox_found);
        assert!(result.license_found);
        assert!(result.domain_accepted);
    }

    #[tokio::test]
    async fn test_missing_mailbox_is_failed() {
        let gateway = Arc::new(MockDirectoryGateway::new());
        let runner = runner_for(gateway, ValidationDepth::Basic);

        let result = runner.run_checks("ghost@contoso.com").await;

        assert_eq!(result.overall_status, OverallStatus::Failed);
        assert!(result.errors.iter().any(|e| e.code == "MBX_NOT_FOUND"));
    }

    #[tokio::test]
    async fn test_exhausted_check_becomes_warning_and_run_continues() {
        let gateway = Arc::new(MockDirectoryGateway::new());
        gateway.add_healthy_mailboxes(&["alice@contoso.com"]);
        // More transient failures than the retry budget for license lookups
        for _ in 0..4 {
            gateway.push_failure(
                "get_license_details",
                GatewayError::Transient("throttled".into()),
            );
        }

        let runner = runner_for(gateway.clone(), ValidationDepth::Basic);
        let result = runner.run_checks("alice@contoso.com").await;

        assert_eq!(result.overall_status, OverallStatus::Warning);
        assert!(result
            .warnings
            .iter()
            .any(|w| w.starts_with("failed to perform license:")));
        // The pending-move check still ran after the license check failed
        assert!(gateway.calls_for("get_mailbox") >= 2);
    }

    #[tokio::test]
    async fn test_transient_failure_recovered_within_budget_leaves_no_warning() {
        let gateway = Arc::new(MockDirectoryGateway::new());
        gateway.add_healthy_mailboxes(&["alice@contoso.com"]);
        // One transient failure, second attempt succeeds
        gateway.push_failure(
            "get_license_details",
            GatewayError::Transient("timeout".into()),
        );

        let runner = runner_for(gateway, ValidationDepth::Basic);
        let result = runner.run_checks("alice@contoso.com").await;

        assert_eq!(result.overall_status, OverallStatus::Ready);
        assert!(result.warnings.is_empty());
    }
}
