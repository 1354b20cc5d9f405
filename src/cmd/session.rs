//! Interactive session: `testpilot session`.
//!
//! Reads one command per line from stdin while applying agent events as
//! they arrive, and prints every new log entry and every newly loaded report.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use console::style;
use tokio::io::{AsyncBufReadExt, BufReader};

use testpilot::config::Config;
use testpilot::dispatcher::Intent;
use testpilot::artifacts::VerificationReport;
use testpilot::report::ReportClient;
use testpilot::runtime::SessionRuntime;
use testpilot::session::{LogEntry, SessionLog, SessionState};
use testpilot::ui::{format_entry, format_metrics, format_report, format_status};

const HELP: &str = "\
Commands:
  explore <url>         explore a page
  design                design test cases from the exploration
  generate              generate test code from the test cases
  verify                run the generated tests
  refine <feedback>     revise the current test cases
  refine-code <issue>   fix the generated code
  chat <text>           send a free-form message
  reset                 clear the workflow
  status                show phases and artifacts
  metrics               show per-phase metrics
  report                fetch the verification report
  connect               reconnect to the agent
  help                  show this help
  quit                  leave the session";

/// One line of user input.
#[derive(Debug, PartialEq, Eq)]
enum Input {
    Intent(Intent),
    Status,
    Metrics,
    Report,
    Connect,
    Help,
    Quit,
    Empty,
}

fn parse_input(line: &str) -> Result<Input, String> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let required = |usage: &str| -> Result<String, String> {
        if rest.is_empty() {
            Err(format!("usage: {usage}"))
        } else {
            Ok(rest.to_string())
        }
    };

    let input = match word {
        "" => Input::Empty,
        "explore" => Input::Intent(Intent::Explore {
            url: required("explore <url>")?,
        }),
        "design" => Input::Intent(Intent::Design),
        "generate" => Input::Intent(Intent::Generate),
        "verify" => Input::Intent(Intent::Verify),
        "refine" => Input::Intent(Intent::Refine {
            feedback: required("refine <feedback>")?,
        }),
        "refine-code" => Input::Intent(Intent::RefineCode {
            issue: required("refine-code <issue>")?,
        }),
        "chat" => Input::Intent(Intent::Chat {
            message: required("chat <text>")?,
        }),
        "reset" => Input::Intent(Intent::Reset),
        "status" => Input::Status,
        "metrics" => Input::Metrics,
        "report" => Input::Report,
        "connect" => Input::Connect,
        "help" | "?" => Input::Help,
        "quit" | "exit" => Input::Quit,
        other => return Err(format!("unknown command '{other}' (try 'help')")),
    };
    Ok(input)
}

/// Tracks what has been printed so a reset, which clears the log, starts
/// the transcript over instead of skipping entries.
#[derive(Default)]
struct Transcript {
    printed: usize,
    last: Option<LogEntry>,
}

impl Transcript {
    fn pending<'a>(&mut self, log: &'a SessionLog) -> &'a [LogEntry] {
        let continuous =
            self.printed == 0 || log.entries().get(self.printed - 1) == self.last.as_ref();
        let start = if continuous { self.printed } else { 0 };
        self.printed = log.len();
        self.last = log.last().cloned();
        log.since(start)
    }

    fn flush(&mut self, log: &SessionLog) {
        for entry in self.pending(log) {
            println!("{}", format_entry(entry));
        }
    }
}

/// Remembers which report was last printed. Reports arrive asynchronously
/// after `report`, so each one is printed once when it lands.
#[derive(Default)]
struct ReportView {
    shown: Option<DateTime<Utc>>,
}

impl ReportView {
    fn fresh<'a>(&mut self, state: &'a SessionState) -> Option<&'a VerificationReport> {
        let report = state.artifacts.report.as_ref()?;
        if self.shown == Some(report.fetched_at) {
            return None;
        }
        self.shown = Some(report.fetched_at);
        Some(report)
    }

    fn flush(&mut self, state: &SessionState) {
        if let Some(report) = self.fresh(state) {
            println!("{}", format_report(report));
        }
    }
}

pub async fn cmd_session(config: &Config) -> Result<()> {
    let reports = ReportClient::new(config.report_url(), config.health_url());
    let mut runtime = SessionRuntime::new(config.ws_url(), reports);
    let mut transcript = Transcript::default();
    let mut report_view = ReportView::default();

    println!(
        "{} connecting to {}",
        style("testpilot").bold(),
        style(runtime.endpoint()).cyan()
    );
    println!("{}", style("Type 'help' for commands.").dim());
    runtime.connect().await;
    runtime.drain();
    transcript.flush(&runtime.state().log);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read input")? else {
                    break;
                };
                match parse_input(&line) {
                    Ok(Input::Intent(intent)) => {
                        runtime.dispatch(intent);
                    }
                    Ok(Input::Status) => println!("{}", format_status(runtime.state())),
                    Ok(Input::Metrics) => println!("{}", format_metrics(&runtime.state().metrics)),
                    Ok(Input::Report) => runtime.fetch_report(),
                    Ok(Input::Connect) => {
                        runtime.connect().await;
                    }
                    Ok(Input::Help) => println!("{HELP}"),
                    Ok(Input::Quit) => break,
                    Ok(Input::Empty) => {}
                    Err(usage) => println!("{}", style(usage).yellow()),
                }
            }
            _ = runtime.next_event() => {}
        }
        runtime.drain();
        transcript.flush(&runtime.state().log);
        report_view.flush(runtime.state());
    }

    runtime.close();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use testpilot::session::Sender;

    fn report_at(fetched_at: DateTime<Utc>) -> VerificationReport {
        VerificationReport {
            screenshots: vec![],
            passed: Some(3),
            failed: Some(0),
            fetched_at,
        }
    }

    #[test]
    fn test_parse_commands_with_arguments() {
        assert_eq!(
            parse_input("explore https://example.com/login").unwrap(),
            Input::Intent(Intent::Explore {
                url: "https://example.com/login".into()
            })
        );
        assert_eq!(
            parse_input("  refine   add a negative login case ").unwrap(),
            Input::Intent(Intent::Refine {
                feedback: "add a negative login case".into()
            })
        );
        assert_eq!(
            parse_input("refine-code selector is stale").unwrap(),
            Input::Intent(Intent::RefineCode {
                issue: "selector is stale".into()
            })
        );
    }

    #[test]
    fn test_parse_missing_argument_shows_usage() {
        assert_eq!(parse_input("explore").unwrap_err(), "usage: explore <url>");
        assert_eq!(parse_input("chat   ").unwrap_err(), "usage: chat <text>");
    }

    #[test]
    fn test_parse_bare_words() {
        assert_eq!(parse_input("").unwrap(), Input::Empty);
        assert_eq!(parse_input("reset").unwrap(), Input::Intent(Intent::Reset));
        assert_eq!(parse_input("exit").unwrap(), Input::Quit);
        assert!(parse_input("deploy").is_err());
    }

    #[test]
    fn test_transcript_prints_only_new_entries() {
        let mut log = SessionLog::new();
        let mut transcript = Transcript::default();
        log.push(Sender::System, "Connected to testing agent");
        assert_eq!(transcript.pending(&log).len(), 1);
        log.push(Sender::User, "Design test cases");
        let pending = transcript.pending(&log);
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].text, "Design test cases");
        assert!(transcript.pending(&log).is_empty());
    }

    #[test]
    fn test_transcript_restarts_after_log_clear() {
        let mut log = SessionLog::new();
        let mut transcript = Transcript::default();
        log.push(Sender::User, "Explore https://example.com");
        transcript.pending(&log);

        log.clear();
        log.push(Sender::System, "Session reset. Ready for a new workflow.");
        let pending = transcript.pending(&log);
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].sender, Sender::System);
    }

    #[test]
    fn test_report_view_shows_each_fetched_report_once() {
        let mut state = SessionState::new();
        let mut view = ReportView::default();
        assert!(view.fresh(&state).is_none());

        let first = Utc::now();
        state.artifacts.report = Some(report_at(first));
        assert_eq!(view.fresh(&state).unwrap().passed, Some(3));
        assert!(view.fresh(&state).is_none());

        state.artifacts.report = Some(report_at(first + Duration::seconds(5)));
        assert!(view.fresh(&state).is_some());
        assert!(view.fresh(&state).is_none());
    }
}
