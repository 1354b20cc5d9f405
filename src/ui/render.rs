//! Plain-text rendering of session state for the terminal.
//!
//! Everything returns a `String` so the session loop decides where it goes.

use console::style;

use crate::artifacts::VerificationReport;
use crate::metrics::MetricsAggregator;
use crate::phase::Phase;
use crate::report::HealthStatus;
use crate::session::{LogEntry, Sender, SessionState};

use super::icons;

pub fn format_entry(entry: &LogEntry) -> String {
    let time = style(entry.timestamp.format("%H:%M:%S")).dim();
    let icon = icons::for_sender(entry.sender);
    let text = match entry.sender {
        Sender::User => style(&entry.text).cyan(),
        Sender::Agent => style(&entry.text),
        Sender::System => style(&entry.text).dim(),
        Sender::Error => style(&entry.text).red(),
        Sender::Success => style(&entry.text).green().bold(),
    };
    format!("{} {}{}", time, icon, text)
}

pub fn format_status(state: &SessionState) -> String {
    let session = &state.session;
    let mut lines = Vec::new();

    let connection = if session.connected {
        style("connected").green()
    } else {
        style("disconnected").red()
    };
    lines.push(format!("Session {} ({})", style(session.id).dim(), connection));

    for phase in Phase::ALL {
        let (icon, label) = if session.active_phase == Some(phase) {
            (&icons::RUNNING, style(phase.as_str()).yellow())
        } else if session.is_completed(phase) {
            (&icons::DONE, style(phase.as_str()).green())
        } else {
            (&icons::PENDING, style(phase.as_str()).dim())
        };
        lines.push(format!("  {}{}", icon, label));
    }

    let artifacts = &state.artifacts;
    if let Some(page) = &artifacts.page_knowledge {
        lines.push(format!(
            "  page: {} ({} elements)",
            page.url.as_deref().unwrap_or("?"),
            page.elements.len()
        ));
    }
    if let Some(cases) = &artifacts.test_cases {
        lines.push(format!("  test cases: {}", cases.cases.len()));
    }
    if let Some(code) = &artifacts.generated_code {
        lines.push(format!("  generated code: {} lines", code.source.lines().count()));
    }
    if let Some(result) = &artifacts.verification {
        lines.push(format!(
            "  verification: {} passed, {} failed",
            result.passed, result.failed
        ));
    }
    lines.join("\n")
}

pub fn format_metrics(metrics: &MetricsAggregator) -> String {
    let Some(total) = metrics.aggregate() else {
        return "No metrics recorded yet.".to_string();
    };

    let mut lines = vec![format!("{}Metrics", icons::PROGRESS)];
    for (phase, m) in metrics.iter() {
        lines.push(format!(
            "  {:<16} {:>8} tokens  {:>4} iterations  {:>7.2}s{}",
            phase.as_str(),
            m.total_tokens,
            m.iterations,
            m.total_time_seconds,
            m.avg_response_time_seconds
                .map(|avg| format!("  avg {:.2}s", avg))
                .unwrap_or_default()
        ));
    }
    lines.push(format!(
        "  {:<16} {:>8} tokens  {:>4} iterations  {:>7.2}s{}",
        style("total").bold(),
        total.total_tokens,
        total.iterations,
        total.total_time_seconds,
        total
            .avg_response_time_seconds
            .map(|avg| format!("  avg {:.2}s", avg))
            .unwrap_or_default()
    ));
    lines.join("\n")
}

pub fn format_report(report: &VerificationReport) -> String {
    let mut lines = vec![format!(
        "{}Verification report ({} screenshots, fetched {})",
        icons::CAMERA,
        report.screenshots.len(),
        report.fetched_at.format("%H:%M:%S")
    )];
    if let (Some(passed), Some(failed)) = (report.passed, report.failed) {
        lines.push(format!(
            "  {} passed, {} failed",
            style(passed).green(),
            style(failed).red()
        ));
    }
    for (i, shot) in report.screenshots.iter().enumerate() {
        let size = shot
            .image()
            .map(|data| format!("{} bytes base64", data.len()))
            .unwrap_or_else(|| "no image".to_string());
        lines.push(format!(
            "  {:>2}. {} ({})",
            i + 1,
            shot.url.as_deref().unwrap_or("(no url)"),
            size
        ));
    }
    lines.join("\n")
}

pub fn format_health(health: &HealthStatus) -> String {
    let status = if health.status == "healthy" {
        style(health.status.as_str()).green()
    } else {
        style(health.status.as_str()).yellow()
    };
    match &health.phase {
        Some(phase) => format!("Agent {} (phase: {})", status, phase),
        None => format!("Agent {}", status),
    }
}
