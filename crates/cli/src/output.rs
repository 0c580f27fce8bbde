// Human-readable run summary

use colored::Colorize;
use tabled::{Table, Tabled};

use mailferry_core::application::{BatchOutcome, RunOutcome};

#[derive(Tabled)]
struct SummaryRow {
    #[tabled(rename = "Metric")]
    metric: String,
    #[tabled(rename = "Value")]
    value: String,
}

fn row(metric: &str, value: impl Into<String>) -> SummaryRow {
    SummaryRow {
        metric: metric.to_string(),
        value: value.into(),
    }
}

pub fn print_summary(outcome: &RunOutcome) {
    let mut rows = vec![
        row("Run ID", outcome.run_id.clone()),
        row("Ready", outcome.counts.ready.to_string().green().to_string()),
        row(
            "Warning",
            outcome.counts.warning.to_string().yellow().to_string(),
        ),
        row("Failed", outcome.counts.failed.to_string().red().to_string()),
        row("Total validated", outcome.counts.total().to_string()),
    ];

    if let Some(report) = &outcome.report_location {
        rows.push(row("Report", report.clone()));
    }

    match &outcome.batch {
        _ if outcome.dry_run => {
            rows.push(row("Batch", "dry run, not submitted".to_string()));
        }
        Some(BatchOutcome::Submitted {
            batch_id,
            submitted,
            failed_additions,
            warnings,
        }) => {
            rows.push(row("Batch ID", batch_id.clone()));
            rows.push(row("Mailboxes submitted", submitted.to_string()));
            if *failed_additions > 0 {
                rows.push(row(
                    "Failed additions",
                    failed_additions.to_string().red().to_string(),
                ));
            }
            for warning in warnings {
                rows.push(row("Warning", warning.yellow().to_string()));
            }
        }
        Some(BatchOutcome::NothingEligible) => {
            rows.push(row(
                "Batch",
                "no eligible mailboxes, nothing submitted".yellow().to_string(),
            ));
        }
        None => {}
    }

    println!();
    println!("{}", Table::new(rows));
}
