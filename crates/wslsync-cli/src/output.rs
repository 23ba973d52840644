//! Output formatting for the CLI
//!
//! Human and JSON formatters plus the run-summary renderer and the
//! outcome → exit-code mapping.

use std::process::ExitCode;

use wslsync_recovery::{RunOutcome, RunSummary};
use wslsync_sync::RunReport;

/// Output format selector
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputFormat {
    Human,
    Json,
}

/// Trait for formatting CLI output
pub trait OutputFormatter: Send {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
    fn warn(&self, message: &str);
    fn info(&self, message: &str);
    fn print_json(&self, value: &serde_json::Value);
}

/// Human-readable output formatter with checkmarks and indentation
pub struct HumanFormatter;

impl OutputFormatter for HumanFormatter {
    fn success(&self, message: &str) {
        println!("\u{2713} {}", message);
    }
    fn error(&self, message: &str) {
        eprintln!("\u{2717} Error: {}", message);
    }
    fn warn(&self, message: &str) {
        eprintln!("\u{26a0} Warning: {}", message);
    }
    fn info(&self, message: &str) {
        println!("  {}", message);
    }
    fn print_json(&self, _value: &serde_json::Value) {
        // Human formatter doesn't print JSON
    }
}

/// JSON output formatter
pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn success(&self, message: &str) {
        println!(
            "{}",
            serde_json::json!({"success": true, "message": message})
        );
    }
    fn error(&self, message: &str) {
        eprintln!(
            "{}",
            serde_json::json!({"success": false, "error": message})
        );
    }
    fn warn(&self, message: &str) {
        eprintln!(
            "{}",
            serde_json::json!({"level": "warning", "message": message})
        );
    }
    fn info(&self, _message: &str) {}
    fn print_json(&self, value: &serde_json::Value) {
        println!(
            "{}",
            serde_json::to_string_pretty(value).unwrap_or_default()
        );
    }
}

pub fn get_formatter(json: bool) -> Box<dyn OutputFormatter> {
    if json {
        Box::new(JsonFormatter)
    } else {
        Box::new(HumanFormatter)
    }
}

/// Maps the run outcome to the process exit code
///
/// 0 clean, 2 completed with warnings, 1 failed.
pub fn exit_code_for(outcome: RunOutcome) -> ExitCode {
    match outcome {
        RunOutcome::Clean => ExitCode::SUCCESS,
        RunOutcome::CompletedWithWarnings => ExitCode::from(2),
        RunOutcome::Failed => ExitCode::FAILURE,
    }
}

/// Renders the end-of-run report
pub fn render_report(report: &RunReport, format: OutputFormat) {
    let formatter = get_formatter(matches!(format, OutputFormat::Json));

    if matches!(format, OutputFormat::Json) {
        let json = serde_json::json!({
            "outcome": report.summary.outcome,
            "files_copied": report.files_copied,
            "files_up_to_date": report.files_up_to_date,
            "dirs_created": report.dirs_created,
            "files_deleted": report.files_deleted,
            "recovered": report.summary.recovered,
            "duration_ms": report.duration_ms,
            "errors": report.summary.unresolved,
            "category_counts": report.summary.category_counts,
            "severity_counts": report.summary.severity_counts,
        });
        formatter.print_json(&json);
        return;
    }

    let duration_display = if report.duration_ms >= 1000 {
        format!("{:.1}s", report.duration_ms as f64 / 1000.0)
    } else {
        format!("{}ms", report.duration_ms)
    };

    match report.summary.outcome {
        RunOutcome::Clean => {
            formatter.success(&format!("Sync completed cleanly in {}", duration_display));
        }
        RunOutcome::CompletedWithWarnings => {
            formatter.warn(&format!(
                "Sync completed with {} unresolved error(s) in {}",
                report.summary.error_count(),
                duration_display
            ));
        }
        RunOutcome::Failed => {
            formatter.error(&format!("Sync failed after {}", duration_display));
        }
    }

    formatter.info(&format!(
        "Copied: {}   Up to date: {}   Dirs: {}   Deleted: {}",
        report.files_copied, report.files_up_to_date, report.dirs_created, report.files_deleted
    ));
    if report.summary.recovered > 0 {
        formatter.info(&format!(
            "Recovered after retry: {}",
            report.summary.recovered
        ));
    }

    render_summary_errors(&report.summary, formatter.as_ref());
}

/// Renders the per-category breakdown and unresolved error list
fn render_summary_errors(summary: &RunSummary, formatter: &dyn OutputFormatter) {
    use wslsync_core::domain::ErrorCategory;

    if !summary.has_errors() {
        return;
    }

    let breakdown: Vec<String> = ErrorCategory::ALL
        .iter()
        .filter_map(|cat| {
            summary
                .category_counts
                .get(cat)
                .map(|count| format!("{cat}: {count}"))
        })
        .collect();
    formatter.info(&format!("Errors by category: {}", breakdown.join(", ")));

    for error in &summary.unresolved {
        formatter.info(&format!(
            "  - {} {} [{}] {} (attempt {})",
            error.context().action(),
            error.context().path().display(),
            error.code(),
            error.message(),
            error.context().attempt(),
        ));
    }
}
