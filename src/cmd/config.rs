//! Configuration view and validation commands: `dashsync config`.

use anyhow::Result;
use std::path::Path;

use dashsync::config::{CONFIG_DIR, CliOverrides, DashConfig, local_config_path};

use super::super::ConfigCommands;

pub fn cmd_config(
    project_dir: &Path,
    explicit: Option<&Path>,
    overrides: &CliOverrides,
    command: Option<ConfigCommands>,
) -> Result<()> {
    let config_path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => DashConfig::discover(project_dir),
    };

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("dashsync configuration");
            println!("======================");
            println!();
            match &config_path {
                Some(path) => println!("Config file: {}", path.display()),
                None => println!("No dashsync.toml found, using defaults."),
            }
            println!();

            let config = DashConfig::resolve(project_dir, explicit, overrides)?;
            println!("Effective values (with env/CLI overrides):");
            println!("[server]");
            println!("  url = \"{}\"", config.server.url);
            println!("  request_timeout_secs = {}", config.server.request_timeout_secs);
            println!("[stream]");
            println!("  path = \"{}\"", config.stream.path);
            println!("  idle_timeout_secs = {}", config.stream.idle_timeout_secs);
            println!("  reconnect_delay_ms = {}", config.stream.reconnect_delay_ms);
            println!("  max_reconnect_delay_ms = {}", config.stream.max_reconnect_delay_ms);
            println!("[logging]");
            println!("  level = \"{}\"", config.logging.level);
            println!("  format = \"{}\"", config.logging.format);
            if let Some(file) = &config.logging.file {
                println!("  file = \"{}\"", file.display());
            }
            println!("[session]");
            match &config.session.project {
                Some(project) => println!("  project = \"{}\"", project),
                None => println!("  project = (none)"),
            }
            println!();
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            let config = DashConfig::resolve(project_dir, explicit, overrides)?;
            let problems = config.validate();
            if problems.is_empty() {
                println!("Configuration is valid.");
                println!();
            } else {
                println!("Configuration problems:");
                for problem in &problems {
                    println!("  - {}", problem);
                }
                println!();
                anyhow::bail!("{} configuration problem(s)", problems.len());
            }
        }
        Some(ConfigCommands::Init) => {
            let path = local_config_path(project_dir);
            if path.exists() {
                println!("dashsync.toml already exists at {}", path.display());
                println!("Delete it first if you want to recreate it.");
                return Ok(());
            }

            std::fs::create_dir_all(project_dir.join(CONFIG_DIR))?;
            DashConfig::default().save(&path)?;

            println!("Created dashsync.toml at {}", path.display());
            println!();
            println!("You can now customize:");
            println!("  - [server] url, request_timeout_secs");
            println!("  - [stream] path, idle_timeout_secs, reconnect delays");
            println!("  - [session] project");
            println!();
        }
    }

    Ok(())
}
