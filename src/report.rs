//! Convergence report rendering

use anyhow::Result;
use colored::Colorize;
use reconcile::{ExecutionResult, RunReport};

/// Render a human-readable convergence report to stdout.
pub fn render(report: &RunReport) {
    for (id, result) in report.entries() {
        match result {
            ExecutionResult::Succeeded => {
                println!("  {} {id}", "✓".green());
            }
            ExecutionResult::Skipped { reason } => {
                println!("  {} {} ({})", "-".yellow(), id.dimmed(), reason.describe());
            }
            ExecutionResult::Failed { reason } => {
                println!("  {} {id}: {reason}", "✗".red());
            }
            ExecutionResult::TimedOut => {
                println!("  {} {id}: timed out", "✗".red());
            }
        }
    }

    let succeeded = report.count_where(|r| matches!(r, ExecutionResult::Succeeded));
    let skipped = report.count_where(|r| matches!(r, ExecutionResult::Skipped { .. }));
    let failed = report.count_where(ExecutionResult::is_fatal);

    let summary = format!("{succeeded} succeeded, {skipped} skipped, {failed} failed");
    if failed > 0 {
        println!("\n{}", summary.red().bold());
    } else {
        println!("\n{}", summary.green());
    }
}

/// Render the report as pretty-printed JSON.
pub fn render_json(report: &RunReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reconcile::SkipReason;

    #[test]
    fn test_json_report_round_trips() {
        let report = RunReport::new(vec![
            ("install".into(), ExecutionResult::Succeeded),
            (
                "db-sync".into(),
                ExecutionResult::Skipped {
                    reason: SkipReason::NotRefreshed,
                },
            ),
        ]);

        let json = render_json(&report).unwrap();
        let parsed: RunReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.entries(), report.entries());
    }
}
