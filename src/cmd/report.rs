//! One-shot HTTP commands: `testpilot report` and `testpilot health`.

use anyhow::{Context, Result};

use testpilot::config::Config;
use testpilot::report::ReportClient;
use testpilot::ui::{format_health, format_report};

fn client(config: &Config) -> ReportClient {
    ReportClient::new(config.report_url(), config.health_url())
}

pub async fn cmd_report(config: &Config, json: bool) -> Result<()> {
    let report = client(config)
        .fetch_report()
        .await
        .with_context(|| format!("Report request to {} failed", config.report_url()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", format_report(&report));
    }
    Ok(())
}

pub async fn cmd_health(config: &Config) -> Result<()> {
    let health = client(config)
        .health()
        .await
        .with_context(|| format!("Health check against {} failed", config.health_url()))?;
    println!("{}", format_health(&health));
    Ok(())
}
