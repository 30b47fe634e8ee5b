//! Configuration resolution and the `taskboard config` command.

use anyhow::Result;
use std::path::Path;

use taskboard::config::BoardConfig;

use super::super::Cli;

/// File and environment first, then command-line flags on top.
pub fn resolve_config(cli: &Cli) -> Result<BoardConfig> {
    let mut config = BoardConfig::resolve(cli.config.as_deref())?;
    if let Some(url) = &cli.base_url {
        config.remote.base_url = url.clone();
    }
    if let Some(user) = cli.user.as_deref().filter(|u| !u.trim().is_empty()) {
        config.user.name = user.to_string();
    }
    Ok(config)
}

pub fn cmd_config(config: &BoardConfig, explicit: Option<&Path>) -> Result<()> {
    println!();
    println!("Taskboard Configuration");
    println!("=======================");
    println!();

    match explicit.map(Path::to_path_buf).or_else(BoardConfig::default_path) {
        Some(path) if path.exists() => println!("Config file: {}", path.display()),
        Some(path) => println!("No config file at {} (using defaults)", path.display()),
        None => println!("No config directory on this platform (using defaults)"),
    }
    println!();
    println!("Effective values (with env/CLI overrides):");
    print!("{}", config.to_display_toml()?);
    Ok(())
}
