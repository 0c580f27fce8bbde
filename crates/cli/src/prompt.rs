// Terminal adapter for the operator prompt

use async_trait::async_trait;
use colored::Colorize;
use std::io::Write;

use mailferry_core::domain::InclusionPolicy;
use mailferry_core::port::{OperatorPrompt, StatusCounts};
use mailferry_core::{AppError, Result};

/// Interactive inclusion policy prompt on stdin/stdout.
/// Never consulted under `--force`.
pub struct TerminalPrompt;

#[async_trait]
impl OperatorPrompt for TerminalPrompt {
    async fn choose_inclusion_policy(&self, counts: StatusCounts) -> Result<InclusionPolicy> {
        println!();
        println!(
            "Validation finished: {} ready, {} warning, {} failed",
            counts.ready.to_string().green(),
            counts.warning.to_string().yellow(),
            counts.failed.to_string().red(),
        );
        println!("Failed mailboxes are always excluded from the batch.");

        loop {
            print!("Include [r]eady only, ready and [w]arning, or [a]bort? ");
            std::io::stdout().flush().map_err(AppError::Io)?;

            let (read, line) = tokio::task::spawn_blocking(|| {
                let mut buffer = String::new();
                std::io::stdin().read_line(&mut buffer).map(|n| (n, buffer))
            })
            .await
            .map_err(|e| AppError::Internal(format!("prompt task failed: {}", e)))?
            .map_err(AppError::Io)?;

            if read == 0 {
                return Err(AppError::Input("prompt input closed".into()));
            }
            match line.trim().to_ascii_lowercase().as_str() {
                "r" | "ready" => return Ok(InclusionPolicy::ReadyOnly),
                "w" | "warning" => return Ok(InclusionPolicy::ReadyAndWarning),
                "a" | "abort" | "q" => return Ok(InclusionPolicy::Abort),
                other => println!("Unrecognized choice: {}", other),
            }
        }
    }
}
