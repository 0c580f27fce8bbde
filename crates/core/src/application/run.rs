// Migration Run State Machine - forward-only staged execution with a
// persisted checkpoint after every transition

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::application::decision::{
    select_identities, BatchDecisionEngine, BatchOutcome, Classification, SubmissionStrategy,
};
use crate::application::executor::ValidationExecutor;
use crate::application::retry::{execute_with_retry, RetryOptions};
use crate::application::runner::CheckRunner;
use crate::application::session::SessionManager;
use crate::application::shutdown::ShutdownToken;
use crate::domain::{
    DomainError, InclusionPolicy, MigrationBatchDescriptor, MigrationRunState, RunId, RunStage,
    ValidationDepth, ValidationResult,
};
use crate::error::{AppError, Result};
use crate::port::{
    ArtifactStore, DirectoryGateway, GatewayError, IdentitySource, OperatorPrompt, RunStateStore,
    StatusCounts, TimeProvider,
};

use super::executor::{MAX_CONCURRENCY, MIN_CONCURRENCY};

/// Opens the identity source. Opening validates the input (header, data
/// rows), so it runs in CheckingDependencies before any remote call and
/// again on a resume that re-enters validation.
pub type SourceFactory = Box<dyn Fn() -> Result<Box<dyn IdentitySource>> + Send + Sync>;

/// Run configuration, assembled by the CLI
#[derive(Clone)]
pub struct RunConfig {
    pub batch_name: String,
    pub source_file_path: String,
    pub depth: ValidationDepth,
    pub window_size: usize,
    pub concurrency: usize,
    pub dry_run: bool,
    pub force: bool,
    pub strategy: SubmissionStrategy,
    pub source_endpoint: String,
    pub target_domain: String,
    pub notification_emails: Vec<String>,
    pub complete_after: Option<i64>,
    pub start_after: Option<i64>,
    pub retry: RetryOptions,
}

/// What a finished (or dry-run) execution produced
#[derive(Debug)]
pub struct RunOutcome {
    pub run_id: RunId,
    pub stage: RunStage,
    pub counts: StatusCounts,
    pub dry_run: bool,
    pub batch: Option<BatchOutcome>,
    pub report_location: Option<String>,
}

/// One end-to-end migration run.
///
/// Stages advance only forward; the checkpoint is rewritten after every
/// transition so a crashed or interrupted run resumes at the last persisted
/// non-terminal stage instead of repeating finished work.
pub struct MigrationRun {
    config: RunConfig,
    gateway: Arc<dyn DirectoryGateway>,
    session: Arc<SessionManager>,
    state_store: Arc<dyn RunStateStore>,
    artifacts: Arc<dyn ArtifactStore>,
    prompt: Arc<dyn OperatorPrompt>,
    time_provider: Arc<dyn TimeProvider>,
    shutdown: ShutdownToken,
    source_factory: SourceFactory,
    engine: BatchDecisionEngine,
}

impl MigrationRun {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: RunConfig,
        gateway: Arc<dyn DirectoryGateway>,
        session: Arc<SessionManager>,
        state_store: Arc<dyn RunStateStore>,
        artifacts: Arc<dyn ArtifactStore>,
        prompt: Arc<dyn OperatorPrompt>,
        time_provider: Arc<dyn TimeProvider>,
        shutdown: ShutdownToken,
        source_factory: SourceFactory,
    ) -> Self {
        let engine = BatchDecisionEngine::new(
            Arc::clone(&gateway),
            Arc::clone(&session),
            config.retry.clone(),
        );
        Self {
            config,
            gateway,
            session,
            state_store,
            artifacts,
            prompt,
            time_provider,
            shutdown,
            source_factory,
            engine,
        }
    }

    /// Override the batch confirmation poll budget (tests use tight budgets)
    pub fn with_batch_polling(mut self, timeout: Duration, interval: Duration) -> Self {
        self.engine = self.engine.with_polling(timeout, interval);
        self
    }

    /// Execute the run to completion, failure, or the dry-run stop point
    pub async fn execute(&self, resume: bool) -> Result<RunOutcome> {
        let now = self.time_provider.now_millis();

        let mut state = if resume {
            match self.state_store.load().await? {
                Some(saved) => match saved.resume_stage() {
                    None => {
                        info!(run_id = %saved.run_id, "Run already completed, nothing to resume");
                        return Ok(RunOutcome {
                            run_id: saved.run_id.clone(),
                            stage: RunStage::Completed,
                            counts: counts_from(&saved),
                            dry_run: false,
                            batch: None,
                            report_location: None,
                        });
                    }
                    Some(stage) => {
                        let mut saved = saved;
                        if saved.current_stage == RunStage::Failed {
                            info!(
                                run_id = %saved.run_id,
                                stage = %stage,
                                "Resuming failed run at the stage it failed in"
                            );
                            saved.clear_failure(stage, now);
                        } else {
                            info!(
                                run_id = %saved.run_id,
                                stage = %stage,
                                "Resuming run at last persisted stage"
                            );
                        }
                        saved
                    }
                },
                None => {
                    warn!("No resumable run state found, starting fresh");
                    self.fresh_state(now)
                }
            }
        } else {
            self.fresh_state(now)
        };

        self.state_store.save(&state).await?;

        match self.run_stages(&mut state).await {
            Ok(outcome) => Ok(outcome),
            Err(AppError::Interrupted(detail)) => {
                // Window-boundary stop: the state stays at the in-flight
                // stage so a resume re-enters it
                warn!(stage = %state.current_stage, "Run interrupted, checkpoint retained");
                let _ = self.state_store.save(&state).await;
                Err(AppError::Interrupted(detail))
            }
            Err(failure) => {
                let at = state.current_stage;
                error!(stage = %at, error = %failure, "Run failed");
                state.mark_failed(at, failure.to_string(), self.time_provider.now_millis());
                let _ = self.state_store.save(&state).await;
                Err(failure)
            }
        }
    }

    fn fresh_state(&self, now: i64) -> MigrationRunState {
        MigrationRunState::new(
            uuid::Uuid::new_v4().to_string(),
            &self.config.batch_name,
            &self.config.source_file_path,
            now,
        )
    }

    async fn run_stages(&self, state: &mut MigrationRunState) -> Result<RunOutcome> {
        let mut source: Option<Box<dyn IdentitySource>> = None;
        let mut results: Option<Vec<ValidationResult>> = None;
        let mut policy: Option<InclusionPolicy> = None;
        let mut report_location: Option<String> = None;
        let mut batch: Option<BatchOutcome> = None;

        loop {
            let stage = state.current_stage;
            match stage {
                RunStage::Completed => break,
                RunStage::Failed => {
                    return Err(AppError::InvalidState(
                        "cannot execute a failed run without resuming it".into(),
                    ))
                }
                _ => {}
            }
            info!(run_id = %state.run_id, stage = %stage, "Entering stage");

            match stage {
                RunStage::Initializing => {
                    self.validate_config()?;
                }

                RunStage::CheckingDependencies => {
                    // Input problems surface here, before any remote call
                    let opened = (self.source_factory)()?;
                    if opened.total() == 0 {
                        return Err(AppError::Input(format!(
                            "identity source {} contains no data rows",
                            state.source_file_path
                        )));
                    }
                    info!(identities = %opened.total(), "Identity source opened");
                    source = Some(opened);
                }

                RunStage::ConnectingServices => {
                    self.session.connect().await?;
                    // Verify the session with a cheap read
                    execute_with_retry(
                        || self.session.execute(|| self.gateway.get_accepted_domains()),
                        &self.config.retry,
                    )
                    .await?;

                    // The batch cannot be created without its source endpoint
                    let endpoint = execute_with_retry(
                        || {
                            self.session.execute(|| {
                                self.gateway
                                    .get_migration_endpoint(&self.config.source_endpoint)
                            })
                        },
                        &self.config.retry,
                    )
                    .await
                    .map_err(|error| match error {
                        GatewayError::NotFound(_) => AppError::Config(format!(
                            "migration endpoint {} is not configured on the tenant",
                            self.config.source_endpoint
                        )),
                        other => AppError::Gateway(other),
                    })?;
                    info!(
                        endpoint = %endpoint.name,
                        remote = %endpoint.remote_server,
                        "Migration endpoint verified"
                    );
                }

                RunStage::ValidatingMailboxes => {
                    let reusable = if state.validation_complete {
                        match &state.validation_results_location {
                            Some(location) => self.artifacts.combined_exists(location).await?,
                            None => false,
                        }
                    } else {
                        false
                    };

                    if reusable {
                        info!("Validation already complete and artifact present, skipping");
                    } else {
                        if state.validation_complete {
                            warn!("Combined artifact missing, re-running validation");
                            state.validation_complete = false;
                            state.validation_results_location = None;
                            self.state_store.save(state).await?;
                        }
                        let mut opened = match source.take() {
                            Some(opened) => opened,
                            None => (self.source_factory)()?,
                        };
                        let runner = Arc::new(CheckRunner::new(
                            Arc::clone(&self.gateway),
                            Arc::clone(&self.session),
                            Arc::clone(&self.time_provider),
                            self.config.depth,
                            self.config.retry.clone(),
                        ));
                        let executor = ValidationExecutor::new(
                            runner,
                            Arc::clone(&self.artifacts),
                            Arc::clone(&self.time_provider),
                            self.config.window_size,
                            self.config.concurrency,
                            self.shutdown.clone(),
                        )?;
                        let location = executor.validate_all(opened.as_mut()).await?;
                        state.validation_complete = true;
                        state.validation_results_location = Some(location);
                    }
                }

                RunStage::GeneratingReport => {
                    let location = state
                        .validation_results_location
                        .clone()
                        .ok_or_else(|| {
                            AppError::InvalidState("no validation results recorded".into())
                        })?;
                    let loaded = self.artifacts.load_combined(&location).await?;

                    let classification = Classification::from_results(&loaded);
                    state.ready_list = classification.ready;
                    state.warning_list = classification.warning;
                    state.failed_list = classification.failed;

                    let report = self.artifacts.write_report(&loaded).await?;
                    info!(
                        report = %report,
                        ready = %state.ready_list.len(),
                        warning = %state.warning_list.len(),
                        failed = %state.failed_list.len(),
                        "Validation report written"
                    );
                    report_location = Some(report);
                    results = Some(loaded);
                }

                RunStage::PrepareForBatchCreation => {
                    let counts = counts_from(state);
                    let chosen = self.resolve_policy(counts).await?;
                    if chosen == InclusionPolicy::Abort {
                        return Err(AppError::Aborted);
                    }
                    policy = Some(chosen);
                    info!(policy = %chosen, "Inclusion policy selected");

                    if self.config.dry_run {
                        info!("Dry run: stopping before batch creation");
                        self.state_store.save(state).await?;
                        return Ok(RunOutcome {
                            run_id: state.run_id.clone(),
                            stage: RunStage::PrepareForBatchCreation,
                            counts,
                            dry_run: true,
                            batch: None,
                            report_location,
                        });
                    }
                }

                RunStage::CreatingBatch => {
                    let loaded = match results.take() {
                        Some(loaded) => loaded,
                        None => {
                            let location = state
                                .validation_results_location
                                .clone()
                                .ok_or_else(|| {
                                    AppError::InvalidState(
                                        "no validation results recorded".into(),
                                    )
                                })?;
                            self.artifacts.load_combined(&location).await?
                        }
                    };

                    let chosen = match policy {
                        Some(chosen) => chosen,
                        // Resumed directly into this stage: the policy was
                        // never persisted, so resolve it again
                        None => self.resolve_policy(counts_from(state)).await?,
                    };
                    if chosen == InclusionPolicy::Abort {
                        return Err(AppError::Aborted);
                    }

                    let classification = Classification {
                        ready: state.ready_list.clone(),
                        warning: state.warning_list.clone(),
                        failed: state.failed_list.clone(),
                    };
                    let selected = select_identities(&classification, chosen);

                    let descriptor = MigrationBatchDescriptor {
                        name: state.batch_name.clone(),
                        source_endpoint: self.config.source_endpoint.clone(),
                        target_domain: self.config.target_domain.clone(),
                        complete_after: self.config.complete_after,
                        start_after: self.config.start_after,
                        notification_emails: self.config.notification_emails.clone(),
                        mailboxes: selected,
                        auto_start: self.config.strategy == SubmissionStrategy::Bulk,
                    };

                    let outcome = self
                        .engine
                        .create_batch(descriptor, self.config.strategy, &loaded)
                        .await?;
                    if let BatchOutcome::Submitted { batch_id, .. } = &outcome {
                        state.batch_id = Some(batch_id.clone());
                    }
                    batch = Some(outcome);
                }

                RunStage::Completed | RunStage::Failed => {}
            }

            let next = stage.next().ok_or_else(|| {
                AppError::InvalidState(format!("no stage after {}", stage))
            })?;
            state.advance_to(next, self.time_provider.now_millis())?;
            self.state_store.save(state).await?;
        }

        info!(run_id = %state.run_id, "Run completed");
        Ok(RunOutcome {
            run_id: state.run_id.clone(),
            stage: RunStage::Completed,
            counts: counts_from(state),
            dry_run: false,
            batch,
            report_location,
        })
    }

    fn validate_config(&self) -> Result<()> {
        if self.config.batch_name.trim().is_empty() {
            return Err(AppError::Config("batch name must not be empty".into()));
        }
        if !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&self.config.concurrency) {
            return Err(DomainError::InvalidConcurrency(self.config.concurrency).into());
        }
        if self.config.window_size == 0 {
            return Err(DomainError::InvalidWindowSize(self.config.window_size).into());
        }
        Ok(())
    }

    /// Under `--force` the prompt is never consulted and warnings ride along
    async fn resolve_policy(&self, counts: StatusCounts) -> Result<InclusionPolicy> {
        if self.config.force {
            info!("Force enabled, including ready and warning mailboxes");
            return Ok(InclusionPolicy::ReadyAndWarning);
        }
        self.prompt.choose_inclusion_policy(counts).await
    }
}

fn counts_from(state: &MigrationRunState) -> StatusCounts {
    StatusCounts {
        ready: state.ready_list.len(),
        warning: state.warning_list.len(),
        failed: state.failed_list.len(),
        unknown: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::artifact_store::mocks::MemoryArtifactStore;
    use crate::port::directory_gateway::mocks::MockDirectoryGateway;
    use crate::port::identity_source::mocks::VecIdentitySource;
    use crate::port::prompt::mocks::ScriptedPrompt;
    use crate::port::run_state_store::mocks::MemoryRunStateStore;
    use crate::port::time_provider::mocks::MockTimeProvider;
    use crate::port::{BatchState, MigrationEndpoint};

    struct Harness {
        gateway: Arc<MockDirectoryGateway>,
        state_store: Arc<MemoryRunStateStore>,
        artifacts: Arc<MemoryArtifactStore>,
        prompt: Arc<ScriptedPrompt>,
        time: Arc<MockTimeProvider>,
    }

    impl Harness {
        fn new() -> Self {
            Self::with_prompt(ScriptedPrompt::new(InclusionPolicy::ReadyAndWarning))
        }

        fn with_prompt(prompt: ScriptedPrompt) -> Self {
            let gateway = Arc::new(MockDirectoryGateway::new());
            gateway.add_endpoint(MigrationEndpoint {
                name: "onprem-endpoint".into(),
                remote_server: "mail.contoso.local".into(),
                max_concurrent_migrations: 20,
            });
            Self {
                gateway,
                state_store: Arc::new(MemoryRunStateStore::new()),
                artifacts: Arc::new(MemoryArtifactStore::new()),
                prompt: Arc::new(prompt),
                time: Arc::new(MockTimeProvider::new(1_000_000)),
            }
        }

        fn run(&self, config: RunConfig, identities: &[&str]) -> MigrationRun {
            let session = Arc::new(SessionManager::new(
                self.gateway.clone(),
                self.time.clone(),
            ));
            let ids: Vec<String> = identities.iter().map(|s| s.to_string()).collect();
            let factory: SourceFactory =
                Box::new(move || Ok(Box::new(VecIdentitySource::new(ids.clone()))));
            MigrationRun::new(
                config,
                self.gateway.clone(),
                session,
                self.state_store.clone(),
                self.artifacts.clone(),
                self.prompt.clone(),
                self.time.clone(),
                ShutdownToken::inert(),
                factory,
            )
            .with_batch_polling(Duration::from_millis(50), Duration::from_millis(5))
        }
    }

    fn config(dry_run: bool, force: bool) -> RunConfig {
        RunConfig {
            batch_name: "wave-1".into(),
            source_file_path: "mailboxes.csv".into(),
            depth: ValidationDepth::Basic,
            window_size: 2,
            concurrency: 2,
            dry_run,
            force,
            strategy: SubmissionStrategy::Bulk,
            source_endpoint: "onprem-endpoint".into(),
            target_domain: "contoso.mail.onmicrosoft.com".into(),
            notification_emails: vec!["admin@contoso.com".into()],
            complete_after: None,
            start_after: None,
            retry: RetryOptions::transient_only(1, Duration::from_millis(1)),
        }
    }

    #[tokio::test]
    async fn test_full_run_completes_and_submits_bulk_batch() {
        let h = Harness::new();
        h.gateway.add_healthy_mailboxes(&[
            "alice@contoso.com",
            "bob@contoso.com",
            "carol@contoso.com",
        ]);
        h.gateway.script_batch_status(&[BatchState::Syncing]);

        let run = h.run(config(false, true), &[
            "alice@contoso.com",
            "bob@contoso.com",
            "carol@contoso.com",
        ]);
        let outcome = run.execute(false).await.unwrap();

        assert_eq!(outcome.stage, RunStage::Completed);
        assert_eq!(outcome.counts.ready, 3);
        match outcome.batch.unwrap() {
            BatchOutcome::Submitted { submitted, .. } => assert_eq!(submitted, 3),
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(h.gateway.started_batches().len(), 1);

        let saved = h.state_store.current().unwrap();
        assert_eq!(saved.current_stage, RunStage::Completed);
        assert!(saved.batch_id.is_some());
    }

    #[tokio::test]
    async fn test_dry_run_stops_before_batch_creation() {
        let h = Harness::new();
        h.gateway.add_healthy_mailboxes(&["alice@contoso.com"]);

        let run = h.run(config(true, true), &["alice@contoso.com"]);
        let outcome = run.execute(false).await.unwrap();

        assert!(outcome.dry_run);
        assert!(outcome.batch.is_none());
        assert_eq!(h.gateway.calls_for("create_migration_batch"), 0);
        assert_eq!(
            h.state_store.current().unwrap().current_stage,
            RunStage::PrepareForBatchCreation
        );
    }

    #[tokio::test]
    async fn test_operator_abort_fails_run() {
        let h = Harness::with_prompt(ScriptedPrompt::new(InclusionPolicy::Abort));
        h.gateway.add_healthy_mailboxes(&["alice@contoso.com"]);

        let run = h.run(config(false, false), &["alice@contoso.com"]);
        let error = run.execute(false).await.unwrap_err();

        assert!(matches!(error, AppError::Aborted));
        assert_eq!(h.prompt.times_asked(), 1);

        let saved = h.state_store.current().unwrap();
        assert_eq!(saved.current_stage, RunStage::Failed);
        assert_eq!(
            saved.failed_at_stage,
            Some(RunStage::PrepareForBatchCreation)
        );
        assert!(saved.last_error.unwrap().contains("aborted"));
        assert_eq!(h.gateway.calls_for("create_migration_batch"), 0);
    }

    #[tokio::test]
    async fn test_resume_after_report_performs_no_validation_calls() {
        let h = Harness::new();
        h.gateway.script_batch_status(&[BatchState::Syncing]);

        let mut results = Vec::new();
        for identity in ["alice@contoso.com", "bob@contoso.com"] {
            let mut r = ValidationResult::new(identity);
            r.finalize(999);
            results.push(r);
        }
        h.artifacts.seed_combined("combined-results", results);

        let mut saved = MigrationRunState::new("run-7", "wave-1", "mailboxes.csv", 500);
        saved
            .advance_to(RunStage::PrepareForBatchCreation, 600)
            .unwrap();
        saved.validation_complete = true;
        saved.validation_results_location = Some("combined-results".into());
        saved.ready_list = vec!["alice@contoso.com".into(), "bob@contoso.com".into()];
        let h = Harness {
            state_store: Arc::new(MemoryRunStateStore::with_state(saved)),
            ..h
        };

        let run = h.run(config(false, true), &["alice@contoso.com", "bob@contoso.com"]);
        let outcome = run.execute(true).await.unwrap();

        assert_eq!(outcome.stage, RunStage::Completed);
        // No per-mailbox validation ran again
        assert_eq!(h.gateway.calls_for("get_mailbox"), 0);
        assert_eq!(h.gateway.calls_for("create_migration_batch"), 1);
    }

    #[tokio::test]
    async fn test_resume_with_missing_artifact_revalidates() {
        let h = Harness::new();
        h.gateway.add_healthy_mailboxes(&["alice@contoso.com"]);
        h.gateway.script_batch_status(&[BatchState::Syncing]);

        let mut saved = MigrationRunState::new("run-8", "wave-1", "mailboxes.csv", 500);
        saved.advance_to(RunStage::ValidatingMailboxes, 600).unwrap();
        saved.validation_complete = true;
        saved.validation_results_location = Some("combined-results".into());
        let h = Harness {
            state_store: Arc::new(MemoryRunStateStore::with_state(saved)),
            ..h
        };

        let run = h.run(config(false, true), &["alice@contoso.com"]);
        let outcome = run.execute(true).await.unwrap();

        assert_eq!(outcome.stage, RunStage::Completed);
        assert_eq!(outcome.counts.ready, 1);
        // The artifact was gone, so validation re-ran
        assert!(h.gateway.calls_for("get_mailbox") > 0);
    }

    #[tokio::test]
    async fn test_failed_run_resumes_at_failed_stage() {
        let h = Harness::new();
        h.gateway.script_batch_status(&[BatchState::Syncing]);

        let mut r = ValidationResult::new("alice@contoso.com");
        r.finalize(999);
        h.artifacts.seed_combined("combined-results", vec![r]);

        let mut saved = MigrationRunState::new("run-9", "wave-1", "mailboxes.csv", 500);
        saved.advance_to(RunStage::CreatingBatch, 600).unwrap();
        saved.validation_complete = true;
        saved.validation_results_location = Some("combined-results".into());
        saved.ready_list = vec!["alice@contoso.com".into()];
        saved.mark_failed(RunStage::CreatingBatch, "gateway unreachable", 700);
        let h = Harness {
            state_store: Arc::new(MemoryRunStateStore::with_state(saved)),
            ..h
        };

        let run = h.run(config(false, true), &["alice@contoso.com"]);
        let outcome = run.execute(true).await.unwrap();

        assert_eq!(outcome.stage, RunStage::Completed);
        let saved = h.state_store.current().unwrap();
        assert_eq!(saved.current_stage, RunStage::Completed);
        assert!(saved.last_error.is_none());
        assert_eq!(h.gateway.started_batches().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_source_fails_before_any_remote_call() {
        let h = Harness::new();
        let run = h.run(config(false, true), &[]);

        let error = run.execute(false).await.unwrap_err();
        assert!(matches!(error, AppError::Input(_)));
        assert_eq!(h.gateway.total_calls(), 0);

        let saved = h.state_store.current().unwrap();
        assert_eq!(saved.current_stage, RunStage::Failed);
        assert_eq!(
            saved.failed_at_stage,
            Some(RunStage::CheckingDependencies)
        );
    }

    #[tokio::test]
    async fn test_unconfigured_endpoint_fails_while_connecting() {
        let h = Harness::new();
        h.gateway.add_healthy_mailboxes(&["alice@contoso.com"]);

        let mut config = config(false, true);
        config.source_endpoint = "missing-endpoint".into();
        let run = h.run(config, &["alice@contoso.com"]);
        let error = run.execute(false).await.unwrap_err();

        assert!(matches!(error, AppError::Config(_)));
        assert!(error.to_string().contains("missing-endpoint"));
        // Connection failed before any per-mailbox work
        assert_eq!(h.gateway.calls_for("get_mailbox"), 0);
        assert_eq!(
            h.state_store.current().unwrap().failed_at_stage,
            Some(RunStage::ConnectingServices)
        );
    }

    #[tokio::test]
    async fn test_nothing_eligible_completes_without_submission() {
        let h = Harness::new();
        // No mailboxes provisioned: everything classifies as failed
        let run = h.run(config(false, true), &["ghost@contoso.com"]);
        let outcome = run.execute(false).await.unwrap();

        assert_eq!(outcome.stage, RunStage::Completed);
        assert_eq!(outcome.counts.failed, 1);
        assert!(matches!(
            outcome.batch,
            Some(BatchOutcome::NothingEligible)
        ));
        assert_eq!(h.gateway.calls_for("create_migration_batch"), 0);
    }
}
