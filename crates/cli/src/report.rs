//! Console rendering of results and progress

use appverify_core::domain::{ResultSet, RunOutcome, VerificationResult};
use appverify_core::port::ProgressObserver;
use colored::Colorize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

/// Successful rows show at most this many characters of the message
const SUCCESS_MESSAGE_WIDTH: usize = 60;

#[derive(Tabled)]
struct ResultRow {
    #[tabled(rename = "File")]
    file: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Duration")]
    duration: String,
    #[tabled(rename = "Message")]
    message: String,
}

fn truncate(message: &str, width: usize) -> String {
    if message.chars().count() <= width {
        return message.to_string();
    }
    let kept: String = message.chars().take(width.saturating_sub(3)).collect();
    format!("{}...", kept)
}

/// Failed rows carry the full captured output so nobody has to re-run
fn row_message(result: &VerificationResult) -> String {
    if result.success {
        let mut message = truncate(&result.message, SUCCESS_MESSAGE_WIDTH);
        if result.stderr_on_success {
            message.push_str(&format!(" {}", "(wrote to stderr)".yellow()));
        }
        return message;
    }

    let detail = if !result.stderr.is_empty() {
        &result.stderr
    } else {
        &result.stdout
    };

    if detail.is_empty() || detail == &result.message {
        result.message.clone()
    } else {
        format!("{}\n{}", result.message, detail)
    }
}

fn row(result: &VerificationResult) -> ResultRow {
    let status = if result.success {
        "✓ Pass".green().to_string()
    } else {
        let code = result
            .exit_code
            .map(|c| c.to_string())
            .unwrap_or_else(|| "-".to_string());
        format!("✗ Fail ({})", code).red().to_string()
    };

    ResultRow {
        file: result.name.clone(),
        status,
        duration: format!("{:.2}s", result.duration.as_secs_f64()),
        message: row_message(result),
    }
}

/// Results table, sorted by file name
pub fn render_table(results: &ResultSet) -> String {
    let rows: Vec<ResultRow> = results.sorted_by_name().into_iter().map(row).collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    table.to_string()
}

/// Total / passed / failed lines
pub fn render_summary(outcome: &RunOutcome) -> String {
    let mut lines = vec![
        format!("{} {}", "Total:".bold(), outcome.total),
        format!("{} {}", "Passed:".green(), outcome.passed),
    ];
    if outcome.failed > 0 {
        lines.push(format!("{} {}", "Failed:".red(), outcome.failed));
    }
    if outcome.all_passed() {
        lines.push(String::new());
        lines.push("All tests passed! ✓".green().bold().to_string());
    }
    lines.join("\n")
}

/// Print the full report to stdout
pub fn print_report(results: &ResultSet) {
    println!("{}", render_table(results));
    println!();
    println!("{}", render_summary(&results.outcome()));
}

/// Prints one line per completed target
pub struct ConsoleProgress;

impl ProgressObserver for ConsoleProgress {
    fn on_start(&self, total: usize) {
        println!("{}", format!("Verifying {} program(s)...", total).cyan());
    }

    fn on_result(&self, completed: usize, total: usize, latest: &VerificationResult) {
        let width = total.to_string().len();
        let mark = if latest.success {
            "✓".green()
        } else {
            "✗".red()
        };
        println!(
            "[{:>width$}/{}] {} {} ({:.2}s)",
            completed,
            total,
            mark,
            latest.name,
            latest.duration.as_secs_f64(),
            width = width
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use appverify_core::domain::{CapturedOutput, VerificationTarget};
    use std::time::Duration;

    fn target(name: &str) -> VerificationTarget {
        VerificationTarget::for_file(format!("/apps/{name}"), "dotnet", false)
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 60), "short");
        let long = "x".repeat(80);
        let cut = truncate(&long, 60);
        assert_eq!(cut.chars().count(), 60);
        assert!(cut.ends_with("..."));
    }

    #[test]
    fn test_failed_row_shows_full_stderr() {
        colored::control::set_override(false);
        let output = CapturedOutput::new(
            vec!["stdout line".to_string()],
            vec!["error one".to_string(), "error two".to_string(), "error three".to_string()],
        );
        let result = VerificationResult::exited(&target("bad.cs"), Some(1), output);

        let message = row_message(&result);

        assert!(message.contains("error three"));
        assert!(!message.contains("stdout line"));
        assert_eq!(row(&result).status, "✗ Fail (1)");
    }

    #[test]
    fn test_failed_row_falls_back_to_stdout() {
        let output = CapturedOutput::new(vec!["only stdout".to_string()], vec![]);
        let result = VerificationResult::timed_out(&target("slow.cs"), Duration::from_secs(10), output);

        let message = row_message(&result);

        assert!(message.starts_with("Timeout (10s)"));
        assert!(message.contains("only stdout"));
    }

    #[test]
    fn test_table_sorted_and_summary() {
        colored::control::set_override(false);
        let results = ResultSet::from(vec![
            VerificationResult::exited(&target("zeta.cs"), Some(0), CapturedOutput::default()),
            VerificationResult::exited(&target("alpha.cs"), Some(2), CapturedOutput::default()),
        ]);

        let table = render_table(&results);
        let alpha = table.find("alpha.cs").unwrap();
        let zeta = table.find("zeta.cs").unwrap();
        assert!(alpha < zeta);
        assert!(table.contains("Exit code: 2"));

        let summary = render_summary(&RunOutcome {
            total: 2,
            passed: 1,
            failed: 1,
        });
        assert!(summary.contains("Failed: 1"));
        assert!(!summary.contains("All tests passed"));
    }
}
