// Batch Executor - windowed parallel validation with a strict barrier
// and per-window durable checkpoints

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::application::runner::CheckRunner;
use crate::application::shutdown::ShutdownToken;
use crate::domain::{DomainError, Identity, ValidationResult};
use crate::error::{AppError, Result};
use crate::port::{ArtifactStore, IdentitySource, TimeProvider};

/// Worker pool bounds
pub const MIN_CONCURRENCY: usize = 1;
pub const MAX_CONCURRENCY: usize = 20;

/// Windowed validation over a streamed identity source.
///
/// Windows, not individual mailboxes, are the unit of idempotent progress:
/// a persisted window is reused on restart, an interrupted in-flight window
/// re-runs from its start. Memory stays bounded by the window, not the
/// total count.
pub struct ValidationExecutor {
    runner: Arc<CheckRunner>,
    artifacts: Arc<dyn ArtifactStore>,
    time_provider: Arc<dyn TimeProvider>,
    window_size: usize,
    concurrency: usize,
    shutdown: ShutdownToken,
}

impl ValidationExecutor {
    pub fn new(
        runner: Arc<CheckRunner>,
        artifacts: Arc<dyn ArtifactStore>,
        time_provider: Arc<dyn TimeProvider>,
        window_size: usize,
        concurrency: usize,
        shutdown: ShutdownToken,
    ) -> Result<Self> {
        if !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&concurrency) {
            return Err(DomainError::InvalidConcurrency(concurrency).into());
        }
        if window_size == 0 {
            return Err(DomainError::InvalidWindowSize(window_size).into());
        }
        Ok(Self {
            runner,
            artifacts,
            time_provider,
            window_size,
            concurrency,
            shutdown,
        })
    }

    /// Validate every identity in the source. Returns the location of the
    /// combined result artifact.
    pub async fn validate_all(&self, source: &mut dyn IdentitySource) -> Result<String> {
        let total = source.total();
        let mut processed: usize = 0;
        let mut window_index: usize = 0;

        info!(
            total = %total,
            window_size = %self.window_size,
            concurrency = %self.concurrency,
            "Starting windowed validation"
        );

        loop {
            // Cancellation is honored at window boundaries only
            if self.shutdown.is_shutdown() {
                warn!(window = %window_index, "Shutdown requested, stopping before next window");
                return Err(AppError::Interrupted(format!("window {}", window_index)));
            }

            let window = source.next_window(self.window_size).await?;
            if window.is_empty() {
                break;
            }

            if self.artifacts.window_exists(window_index).await? {
                match self.artifacts.load_window(window_index).await {
                    Ok(existing) if existing.len() == window.len() => {
                        processed += existing.len();
                        info!(
                            window = %window_index,
                            processed = %processed,
                            total = %total,
                            "Reusing persisted window"
                        );
                        window_index += 1;
                        continue;
                    }
                    Ok(_) | Err(_) => {
                        warn!(
                            window = %window_index,
                            "Persisted window unreadable or mismatched, re-running"
                        );
                    }
                }
            }

            let results = self.run_window(window).await;
            processed += results.len();

            // The barrier: the window is durable before the next one loads
            self.artifacts.write_window(window_index, &results).await?;
            info!(
                window = %window_index,
                processed = %processed,
                total = %total,
                "Window persisted"
            );
            window_index += 1;
        }

        let location = self.artifacts.combine_windows(window_index).await?;
        info!(
            windows = %window_index,
            processed = %processed,
            location = %location,
            "Validation complete, windows combined"
        );
        Ok(location)
    }

    /// Run one window with up to `concurrency` identities in flight.
    /// Results keep the window's input order.
    async fn run_window(&self, identities: Vec<Identity>) -> Vec<ValidationResult> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();

        for (slot, identity) in identities.iter().cloned().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let runner = Arc::clone(&self.runner);
            let now = self.time_provider.now_millis();

            tasks.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .expect("validation semaphore closed");

                // Panic isolation: a panicking worker yields a synthetic
                // Failed result so the identity is never silently dropped
                let outcome = AssertUnwindSafe(runner.run_checks(&identity))
                    .catch_unwind()
                    .await;
                let result = match outcome {
                    Ok(result) => result,
                    Err(panic) => {
                        let message = panic_message(panic);
                        error!(identity = %identity, panic = %message, "Validation worker panicked");
                        ValidationResult::catastrophic(
                            &identity,
                            format!("validation worker panicked: {}", message),
                            now,
                        )
                    }
                };
                (slot, result)
            });
        }

        let mut slots: Vec<Option<ValidationResult>> = vec![None; identities.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((slot, result)) => slots[slot] = Some(result),
                Err(join_error) => {
                    // catch_unwind handles panics; this is task cancellation
                    error!(error = %join_error, "Validation task aborted");
                }
            }
        }

        slots
            .into_iter()
            .enumerate()
            .map(|(slot, entry)| {
                entry.unwrap_or_else(|| {
                    ValidationResult::catastrophic(
                        identities[slot].clone(),
                        "validation task aborted before completion",
                        self.time_provider.now_millis(),
                    )
                })
            })
            .collect()
    }
}

fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
