//! Configuration view and validation commands: `testpilot config`.

use anyhow::{Context, Result, bail};
use console::style;
use std::path::Path;

use testpilot::config::{CONFIG_DIR, CONFIG_FILE, Config, TestpilotToml};

use super::super::{Cli, ConfigCommands, overrides};

pub fn cmd_config(project_dir: &Path, cli: &Cli, command: Option<ConfigCommands>) -> Result<()> {
    let config_path = project_dir.join(CONFIG_DIR).join(CONFIG_FILE);

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("Testpilot Configuration");
            println!("=======================");
            println!();

            if config_path.exists() {
                println!("Config file: {}", config_path.display());
                println!();
                let toml = TestpilotToml::load(&config_path)?;
                println!("{}", toml.to_toml_string().trim_end());
            } else {
                println!("No testpilot.toml found at {}", config_path.display());
                println!();
                println!("Using default configuration:");
                println!("{}", TestpilotToml::default().to_toml_string().trim_end());
                println!();
                println!("Run 'testpilot config init' to create a testpilot.toml file.");
            }

            println!();
            println!("Effective values (with env/CLI overrides):");
            let config = Config::load(project_dir, overrides(cli))?;
            println!("  ws_url = \"{}\"", config.ws_url());
            println!("  report_url = \"{}\"", config.report_url());
            println!("  health_url = \"{}\"", config.health_url());
            println!();
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            let config = Config::load(project_dir, overrides(cli))?;
            let problems = config.toml.validate();
            if problems.is_empty() {
                println!("{}", style("Configuration is valid.").green());
                println!();
                return Ok(());
            }
            println!("Configuration problems:");
            for problem in &problems {
                println!("  - {}", problem);
            }
            println!();
            bail!("{} configuration problem(s) found", problems.len());
        }
        Some(ConfigCommands::Init) => {
            let created = Config::init(project_dir)
                .with_context(|| format!("Failed to write {}", config_path.display()))?;
            if !created {
                println!("testpilot.toml already exists at {}", config_path.display());
                println!("Delete it first if you want to recreate it.");
                return Ok(());
            }
            println!("Created testpilot.toml at {}", config_path.display());
            println!();
            println!("You can now customize:");
            println!("  - [agent] ws_url, report_url, health_url");
            println!("  - [logging] json, file, filter");
            println!();
        }
    }

    Ok(())
}
