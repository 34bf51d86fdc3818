//! Config command - show the configuration a resolve run would use.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use modsolve::{ConfigLoader, ResolverConfig};

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Configuration file (JSON)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// Defaults, then the config file, then `MODSOLVE_*` variables.
pub fn load(path: Option<&std::path::Path>) -> Result<ResolverConfig> {
    let loader = ConfigLoader::new(true);
    match path {
        Some(path) => loader
            .load(Some(path))
            .with_context(|| format!("Failed to load configuration from {}", path.display())),
        None => loader.load(None).context("Failed to read configuration"),
    }
}

pub fn execute(args: ConfigArgs) -> Result<i32> {
    let config = load(args.config.as_deref())?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(0)
}
