// Batch Decision & Creation Engine - classification, inclusion policy,
// and the two submission strategies

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::application::retry::{execute_with_retry, RetryOptions};
use crate::application::session::SessionManager;
use crate::domain::{
    compute_tolerance, Identity, InclusionPolicy, MigrationBatchDescriptor, OverallStatus,
    ValidationResult,
};
use crate::error::{AppError, Result};
use crate::port::{DirectoryGateway, GatewayError};

/// Default confirmation poll budget (10 minutes)
pub const BATCH_POLL_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Default confirmation poll interval (5 seconds)
pub const BATCH_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// How the selected identities are submitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionStrategy {
    /// One descriptor for all selected identities, auto-started
    Bulk,
    /// Empty batch first, one tolerant add per identity, started only when
    /// at least one addition succeeded
    PerMailboxTolerance,
}

/// Identities partitioned by their derived status, input order preserved
#[derive(Debug, Clone, Default)]
pub struct Classification {
    pub ready: Vec<Identity>,
    pub warning: Vec<Identity>,
    pub failed: Vec<Identity>,
}

impl Classification {
    pub fn from_results(results: &[ValidationResult]) -> Self {
        let mut classification = Self::default();
        for result in results {
            match result.overall_status {
                OverallStatus::Ready => classification.ready.push(result.identity.clone()),
                OverallStatus::Warning => classification.warning.push(result.identity.clone()),
                // Unknown means the aggregate was never finalized; treat it
                // as failed rather than migrating an unvalidated mailbox
                OverallStatus::Failed | OverallStatus::Unknown => {
                    classification.failed.push(result.identity.clone())
                }
            }
        }
        classification
    }
}

/// Apply the inclusion policy. Failed identities are always excluded,
/// regardless of force.
pub fn select_identities(
    classification: &Classification,
    policy: InclusionPolicy,
) -> Vec<Identity> {
    match policy {
        InclusionPolicy::ReadyOnly => classification.ready.clone(),
        InclusionPolicy::ReadyAndWarning => {
            let mut selected = classification.ready.clone();
            selected.extend(classification.warning.iter().cloned());
            selected
        }
        InclusionPolicy::Abort => Vec::new(),
    }
}

/// Outcome of the creation stage
#[derive(Debug, Clone)]
pub enum BatchOutcome {
    /// Nothing qualified; no remote mutation was performed
    NothingEligible,
    Submitted {
        batch_id: String,
        submitted: usize,
        failed_additions: usize,
        /// Non-fatal confirmation findings (e.g. poll timeout)
        warnings: Vec<String>,
    },
}

pub struct BatchDecisionEngine {
    gateway: Arc<dyn DirectoryGateway>,
    session: Arc<SessionManager>,
    retry: RetryOptions,
    poll_timeout: Duration,
    poll_interval: Duration,
}

impl BatchDecisionEngine {
    pub fn new(
        gateway: Arc<dyn DirectoryGateway>,
        session: Arc<SessionManager>,
        retry: RetryOptions,
    ) -> Self {
        Self {
            gateway,
            session,
            retry,
            poll_timeout: BATCH_POLL_TIMEOUT,
            poll_interval: BATCH_POLL_INTERVAL,
        }
    }

    /// Override the confirmation poll budget (tests use tight budgets)
    pub fn with_polling(mut self, timeout: Duration, interval: Duration) -> Self {
        self.poll_timeout = timeout;
        self.poll_interval = interval;
        self
    }

    /// Submit the selected identities. `results` supply the per-mailbox
    /// findings the tolerance heuristic reads.
    pub async fn create_batch(
        &self,
        descriptor: MigrationBatchDescriptor,
        strategy: SubmissionStrategy,
        results: &[ValidationResult],
    ) -> Result<BatchOutcome> {
        if descriptor.mailboxes.is_empty() {
            info!("No eligible mailboxes, skipping batch creation");
            return Ok(BatchOutcome::NothingEligible);
        }

        // Submission is not idempotent remotely: check for a duplicate name
        // both before and after the session is re-established
        self.ensure_batch_absent(&descriptor.name).await?;
        self.session
            .reconnect()
            .await
            .map_err(AppError::Gateway)?;
        self.ensure_batch_absent(&descriptor.name).await?;

        match strategy {
            SubmissionStrategy::Bulk => self.submit_bulk(descriptor).await,
            SubmissionStrategy::PerMailboxTolerance => {
                self.submit_with_tolerance(descriptor, results).await
            }
        }
    }

    async fn ensure_batch_absent(&self, name: &str) -> Result<()> {
        let lookup = execute_with_retry(
            || self.session.execute(|| self.gateway.get_migration_batch(name)),
            &self.retry,
        )
        .await;

        match lookup {
            Ok(existing) => Err(AppError::Conflict(format!(
                "migration batch {} already exists (id {})",
                name, existing.batch_id
            ))),
            Err(GatewayError::NotFound(_)) => Ok(()),
            Err(error) => Err(error.into()),
        }
    }

    async fn submit_bulk(&self, descriptor: MigrationBatchDescriptor) -> Result<BatchOutcome> {
        let submitted = descriptor.mailboxes.len();
        let descriptor = MigrationBatchDescriptor {
            auto_start: true,
            ..descriptor
        };

        let batch_id = execute_with_retry(
            || {
                self.session
                    .execute(|| self.gateway.create_migration_batch(&descriptor))
            },
            &self.retry,
        )
        .await?;

        info!(
            batch_id = %batch_id,
            mailboxes = %submitted,
            "Bulk migration batch submitted"
        );

        let warnings = self.confirm_batch_started(&batch_id).await;
        Ok(BatchOutcome::Submitted {
            batch_id,
            submitted,
            failed_additions: 0,
            warnings,
        })
    }

    async fn submit_with_tolerance(
        &self,
        descriptor: MigrationBatchDescriptor,
        results: &[ValidationResult],
    ) -> Result<BatchOutcome> {
        let identities = descriptor.mailboxes.clone();
        let empty_descriptor = MigrationBatchDescriptor {
            mailboxes: Vec::new(),
            auto_start: false,
            ..descriptor
        };

        let batch_id = execute_with_retry(
            || {
                self.session
                    .execute(|| self.gateway.create_migration_batch(&empty_descriptor))
            },
            &self.retry,
        )
        .await?;

        let by_identity: HashMap<&str, &ValidationResult> = results
            .iter()
            .map(|r| (r.identity.as_str(), r))
            .collect();

        let mut submitted = 0usize;
        let mut failed_additions = 0usize;
        let mut warnings = Vec::new();

        for identity in &identities {
            let assessment = by_identity
                .get(identity.as_str())
                .map(|r| compute_tolerance(r.item_count.unwrap_or(0), r.deep_folder_hierarchy))
                .unwrap_or_else(|| compute_tolerance(0, false));

            let added = execute_with_retry(
                || {
                    self.session.execute(|| {
                        self.gateway.add_mailbox_to_batch(
                            &batch_id,
                            identity,
                            assessment.bad_item_limit,
                        )
                    })
                },
                &self.retry,
            )
            .await;

            match added {
                Ok(()) => {
                    submitted += 1;
                    info!(
                        identity = %identity,
                        bad_item_limit = %assessment.bad_item_limit,
                        risk = ?assessment.risk,
                        "Mailbox added to batch"
                    );
                }
                Err(error) => {
                    failed_additions += 1;
                    warn!(identity = %identity, error = %error, "Failed to add mailbox to batch");
                    warnings.push(format!("could not add {}: {}", identity, error));
                }
            }
        }

        // Zero successes overall is fatal for batch creation
        if submitted == 0 {
            return Err(AppError::Internal(format!(
                "no mailboxes could be added to batch {}",
                batch_id
            )));
        }

        execute_with_retry(
            || {
                self.session
                    .execute(|| self.gateway.start_migration_batch(&batch_id))
            },
            &self.retry,
        )
        .await?;
        info!(batch_id = %batch_id, submitted = %submitted, "Migration batch started");

        warnings.extend(self.confirm_batch_started(&batch_id).await);
        Ok(BatchOutcome::Submitted {
            batch_id,
            submitted,
            failed_additions,
            warnings,
        })
    }

    /// Poll until the batch leaves its initial state. A timeout is
    /// non-fatal and reported as a confirmation warning.
    async fn confirm_batch_started(&self, batch_id: &str) -> Vec<String> {
        let started = tokio::time::Instant::now();
        loop {
            let status = execute_with_retry(
                || {
                    self.session
                        .execute(|| self.gateway.get_batch_status(batch_id))
                },
                &self.retry,
            )
            .await;

            match status {
                Ok(state) if !state.is_initial() => {
                    info!(batch_id = %batch_id, state = ?state, "Batch confirmed active");
                    return Vec::new();
                }
                Ok(_) => {}
                Err(error) => {
                    warn!(batch_id = %batch_id, error = %error, "Batch status poll failed");
                    return vec![format!(
                        "could not confirm batch {} started: {}",
                        batch_id, error
                    )];
                }
            }

            if started.elapsed() >= self.poll_timeout {
                warn!(batch_id = %batch_id, "Batch did not leave its initial state in time");
                return vec![format!(
                    "batch {} did not leave its initial state within {}s; check its status manually",
                    batch_id,
                    self.poll_timeout.as_secs()
                )];
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result_with_status(identity: &str, status: OverallStatus) -> ValidationResult {
        let mut r = ValidationResult::new(identity);
        match status {
            OverallStatus::Failed => r.add_error("X", "failed"),
            OverallStatus::Warning => r.add_warning("warned"),
            _ => {}
        }
        r.finalize(1);
        r
    }

    #[test]
    fn test_classification_partitions_by_status() {
        let results = vec![
            result_with_status("r1@c.com", OverallStatus::Ready),
            result_with_status("w1@c.com", OverallStatus::Warning),
            result_with_status("f1@c.com", OverallStatus::Failed),
            result_with_status("r2@c.com", OverallStatus::Ready),
        ];
        let classification = Classification::from_results(&results);
        assert_eq!(classification.ready, vec!["r1@c.com", "r2@c.com"]);
        assert_eq!(classification.warning, vec!["w1@c.com"]);
        assert_eq!(classification.failed, vec!["f1@c.com"]);
    }

    #[test]
    fn test_unfinalized_result_classified_as_failed() {
        let results = vec![ValidationResult::new("u1@c.com")];
        let classification = Classification::from_results(&results);
        assert_eq!(classification.failed, vec!["u1@c.com"]);
    }

    #[test]
    fn test_policy_selection() {
        let classification = Classification {
            ready: vec!["r1".into(), "r2".into(), "r3".into()],
            warning: vec!["w1".into(), "w2".into()],
            failed: vec!["f1".into()],
        };

        let ready_only = select_identities(&classification, InclusionPolicy::ReadyOnly);
        assert_eq!(ready_only.len(), 3);

        let both = select_identities(&classification, InclusionPolicy::ReadyAndWarning);
        assert_eq!(both.len(), 5);
        assert!(!both.contains(&"f1".to_string()));

        assert!(select_identities(&classification, InclusionPolicy::Abort).is_empty());
    }
}
