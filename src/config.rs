//! Configuration for testpilot.
//!
//! Settings are layered file → environment → CLI. The file lives at
//! `.testpilot/testpilot.toml` in the project directory:
//!
//! ```toml
//! [agent]
//! ws_url = "ws://localhost:8000/ws"
//! report_url = "http://localhost:8000/verification_with_screenshots.json"
//! health_url = "http://localhost:8000/health"
//!
//! [logging]
//! json = false
//! file = false
//! filter = "testpilot=warn"
//! ```
//!
//! Environment overrides: `TESTPILOT_WS_URL`, `TESTPILOT_REPORT_URL`,
//! `TESTPILOT_HEALTH_URL`, `TESTPILOT_LOG_JSON`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::errors::ConfigError;

pub const CONFIG_DIR: &str = ".testpilot";
pub const CONFIG_FILE: &str = "testpilot.toml";

/// Where the agent lives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSection {
    /// Event-stream endpoint
    #[serde(default = "default_ws_url")]
    pub ws_url: String,
    /// Verification report endpoint (HTTP GET)
    #[serde(default = "default_report_url")]
    pub report_url: String,
    /// Agent health endpoint (HTTP GET)
    #[serde(default = "default_health_url")]
    pub health_url: String,
}

fn default_ws_url() -> String {
    "ws://localhost:8000/ws".to_string()
}

fn default_report_url() -> String {
    "http://localhost:8000/verification_with_screenshots.json".to_string()
}

fn default_health_url() -> String {
    "http://localhost:8000/health".to_string()
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            ws_url: default_ws_url(),
            report_url: default_report_url(),
            health_url: default_health_url(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSection {
    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
    /// Also write a daily-rolling log under `.testpilot/logs/`
    #[serde(default)]
    pub file: bool,
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    #[serde(default = "default_filter")]
    pub filter: String,
}

fn default_filter() -> String {
    "testpilot=warn".to_string()
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            json: false,
            file: false,
            filter: default_filter(),
        }
    }
}

/// Parsed `testpilot.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestpilotToml {
    #[serde(default)]
    pub agent: AgentSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

impl TestpilotToml {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load_or_default(config_dir: &Path) -> Result<Self, ConfigError> {
        let path = config_dir.join(CONFIG_FILE);
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn to_toml_string(&self) -> String {
        // Plain structs of strings and bools always serialize.
        toml::to_string_pretty(self).unwrap_or_default()
    }

    /// Apply environment overrides read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("TESTPILOT_WS_URL") {
            self.agent.ws_url = url;
        }
        if let Some(url) = lookup("TESTPILOT_REPORT_URL") {
            self.agent.report_url = url;
        }
        if let Some(url) = lookup("TESTPILOT_HEALTH_URL") {
            self.agent.health_url = url;
        }
        if let Some(json) = lookup("TESTPILOT_LOG_JSON") {
            self.logging.json = json != "0" && json != "false";
        }
    }

    /// Check URL schemes. Returns every problem found.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut problems = Vec::new();
        let checks = [
            ("agent.ws_url", &self.agent.ws_url, &["ws://", "wss://"][..]),
            (
                "agent.report_url",
                &self.agent.report_url,
                &["http://", "https://"][..],
            ),
            (
                "agent.health_url",
                &self.agent.health_url,
                &["http://", "https://"][..],
            ),
        ];
        for (key, value, schemes) in checks {
            if !schemes.iter().any(|scheme| value.starts_with(scheme)) {
                problems.push(ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: format!("'{}' must start with {}", value, schemes.join(" or ")),
                });
            }
        }
        problems
    }
}

/// CLI-level overrides, applied last.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub ws_url: Option<String>,
    pub report_url: Option<String>,
    pub verbose: bool,
}

/// Resolved configuration for a run.
#[derive(Debug, Clone)]
pub struct Config {
    pub project_dir: PathBuf,
    pub config_dir: PathBuf,
    pub toml: TestpilotToml,
    pub verbose: bool,
}

impl Config {
    /// Load file → environment → CLI for `project_dir`.
    pub fn load(project_dir: &Path, cli: CliOverrides) -> Result<Self, ConfigError> {
        let config_dir = project_dir.join(CONFIG_DIR);
        let mut toml = TestpilotToml::load_or_default(&config_dir)?;
        toml.apply_env(|key| std::env::var(key).ok());
        if let Some(url) = cli.ws_url {
            toml.agent.ws_url = url;
        }
        if let Some(url) = cli.report_url {
            toml.agent.report_url = url;
        }
        Ok(Self {
            project_dir: project_dir.to_path_buf(),
            config_dir,
            toml,
            verbose: cli.verbose,
        })
    }

    pub fn config_path(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.config_dir.join("logs")
    }

    pub fn ws_url(&self) -> &str {
        &self.toml.agent.ws_url
    }

    pub fn report_url(&self) -> &str {
        &self.toml.agent.report_url
    }

    pub fn health_url(&self) -> &str {
        &self.toml.agent.health_url
    }

    /// Write the default config file if none exists. Returns true if written.
    pub fn init(project_dir: &Path) -> std::io::Result<bool> {
        let config_dir = project_dir.join(CONFIG_DIR);
        let path = config_dir.join(CONFIG_FILE);
        if path.exists() {
            return Ok(false);
        }
        std::fs::create_dir_all(&config_dir)?;
        std::fs::write(&path, TestpilotToml::default().to_toml_string())?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_without_file() {
        let dir = tempdir().unwrap();
        let toml = TestpilotToml::load_or_default(&dir.path().join(CONFIG_DIR)).unwrap();
        assert_eq!(toml.agent.ws_url, "ws://localhost:8000/ws");
        assert!(toml.agent.report_url.ends_with("/verification_with_screenshots.json"));
        assert!(!toml.logging.json);
        assert!(toml.validate().is_empty());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempdir().unwrap();
        let config_dir = dir.path().join(CONFIG_DIR);
        fs::create_dir_all(&config_dir).unwrap();
        fs::write(
            config_dir.join(CONFIG_FILE),
            "[agent]\nws_url = \"wss://agent.internal/ws\"\n",
        )
        .unwrap();
        let toml = TestpilotToml::load_or_default(&config_dir).unwrap();
        assert_eq!(toml.agent.ws_url, "wss://agent.internal/ws");
        assert_eq!(toml.agent.health_url, "http://localhost:8000/health");
    }

    #[test]
    fn test_invalid_toml_is_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "[agent\nws_url = 3").unwrap();
        let err = TestpilotToml::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_env_overrides_file() {
        let env: HashMap<&str, &str> = [
            ("TESTPILOT_WS_URL", "ws://10.0.0.5:9000/ws"),
            ("TESTPILOT_LOG_JSON", "true"),
        ]
        .into_iter()
        .collect();
        let mut toml = TestpilotToml::default();
        toml.apply_env(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(toml.agent.ws_url, "ws://10.0.0.5:9000/ws");
        assert!(toml.logging.json);
        assert_eq!(toml.agent.report_url, default_report_url());
    }

    #[test]
    fn test_cli_overrides_win() {
        let dir = tempdir().unwrap();
        let config = Config::load(
            dir.path(),
            CliOverrides {
                ws_url: Some("ws://127.0.0.1:1/ws".into()),
                report_url: None,
                verbose: true,
            },
        )
        .unwrap();
        assert_eq!(config.ws_url(), "ws://127.0.0.1:1/ws");
        assert!(config.verbose);
        assert_eq!(config.log_dir(), dir.path().join(".testpilot/logs"));
    }

    #[test]
    fn test_validate_flags_wrong_schemes() {
        let mut toml = TestpilotToml::default();
        toml.agent.ws_url = "http://localhost:8000/ws".into();
        toml.agent.report_url = "ftp://x".into();
        let problems = toml.validate();
        assert_eq!(problems.len(), 2);
        assert!(problems[0].to_string().contains("agent.ws_url"));
    }

    #[test]
    fn test_init_writes_once() {
        let dir = tempdir().unwrap();
        assert!(Config::init(dir.path()).unwrap());
        assert!(!Config::init(dir.path()).unwrap());
        let written = TestpilotToml::load(&dir.path().join(".testpilot/testpilot.toml")).unwrap();
        assert_eq!(written, TestpilotToml::default());
    }
}
