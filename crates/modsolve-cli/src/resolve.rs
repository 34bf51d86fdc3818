//! Resolve command - scan mod locations and pick what to load.

use anyhow::{anyhow, bail, Context as _, Result};
use clap::Args;
use std::path::PathBuf;

use modsolve::{
    resolve, Context, DescriptorSource, Discovery, Environment, ModCandidate, ResolverConfig, ScanRequest,
    SharedContext,
};

use crate::output;

#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Mod folders, mod directories or descriptor files to scan
    #[arg(required = true, value_name = "LOCATION")]
    pub locations: Vec<PathBuf>,

    /// Environment to resolve for (client or server)
    #[arg(short, long)]
    pub environment: Option<String>,

    /// Dependency override file
    #[arg(long)]
    pub overrides: Option<PathBuf>,

    /// Configuration file (JSON)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Always-present mod, as id@version (can be used multiple times)
    #[arg(short, long, value_name = "ID@VERSION", action = clap::ArgAction::Append)]
    pub builtin: Vec<String>,

    /// Scan threads per discovery pass
    #[arg(long)]
    pub threads: Option<usize>,

    /// Log the override path of every candidate
    #[arg(long)]
    pub dump_override_paths: bool,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

impl ResolveArgs {
    /// Apply command line flags on top of the loaded configuration.
    fn apply(&self, config: &mut ResolverConfig) -> Result<()> {
        if let Some(environment) = &self.environment {
            config.environment = environment.parse::<Environment>().map_err(|e| anyhow!(e))?;
        }
        if let Some(path) = &self.overrides {
            config.overrides = Some(path.clone());
        }
        if let Some(threads) = self.threads {
            config.scan_threads = threads.max(1);
        }
        if self.dump_override_paths {
            config.dump_override_paths = true;
        }
        Ok(())
    }
}

fn parse_builtin(entry: &str) -> Result<ModCandidate> {
    match entry.split_once('@') {
        Some((id, version)) if !id.is_empty() && !version.is_empty() => Ok(ModCandidate::new(id, version)),
        _ => bail!("Invalid builtin '{}', expected id@version", entry),
    }
}

pub fn execute(args: ResolveArgs) -> Result<i32> {
    let mut config = crate::config::load(args.config.as_deref())?;
    args.apply(&mut config)?;

    let context = Context::from_config(&config).context("Failed to load dependency overrides")?;
    let shared = SharedContext::new(context);

    for entry in &args.builtin {
        let candidate = parse_builtin(entry)?;
        shared
            .lock()
            .add_builtin(candidate)
            .with_context(|| format!("Failed to register builtin '{}'", entry))?;
    }

    let roots: Vec<ScanRequest> = args.locations.iter().map(ScanRequest::root).collect();
    let report = Discovery::new(vec![Box::new(DescriptorSource::new())])
        .with_threads(config.scan_threads)
        .run(&shared, roots);

    let graph = shared.seal().context("Failed to finish discovery")?;
    let result = resolve(&graph, &config).context("Resolution failed")?;

    if args.json {
        output::print_json(&graph, &result)?;
    } else {
        output::print_report(&graph, &report, &result);
    }

    Ok(if result.is_selected() { 0 } else { 1 })
}
