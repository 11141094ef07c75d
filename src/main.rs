//! registry-pruner CLI - stale endpoint pruning for a chain registry

mod cli;

use clap::Parser;
use cli::{
    check::CheckArgs, config::ConfigCommands, prune::PruneArgs, Cli, Commands, RegistryArgs,
};
use indicatif::{ProgressBar, ProgressStyle};
use registry_pruner::{
    default_workers, ChainFilter, Config, ConfigFile, HealthChecker, PassProgress, Prober,
    Reconciler, RegistryStore, RetryPolicy,
};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(EnvFilter::new(filter))
        .init();

    match &cli.command {
        Commands::Prune(args) => run_prune(args, &cli).await,
        Commands::Check(args) => run_check(args, &cli).await,
        Commands::Config { action } => handle_config(action, &cli),
    }
}

fn load_config_file(cli: &Cli) -> anyhow::Result<ConfigFile> {
    let file = match &cli.config {
        Some(path) => Some(ConfigFile::load(path)?),
        None => ConfigFile::load_default()?,
    };
    Ok(file.unwrap_or_default())
}

fn registry_root(args: &RegistryArgs, file: &ConfigFile) -> PathBuf {
    args.root
        .clone()
        .or_else(|| file.registry_root.clone())
        .unwrap_or_else(|| PathBuf::from("."))
}

fn workers(args: &RegistryArgs, file: &ConfigFile) -> usize {
    match args.workers {
        Some(n) => n,
        None if file.settings.workers > 0 => file.settings.workers,
        None => default_workers(),
    }
}

fn build_filter(args: &RegistryArgs, file: &ConfigFile) -> ChainFilter {
    let mut settings = file.filter.clone();
    settings.ignore_chains.extend(args.skip_chains.iter().cloned());

    // CLI selection replaces the file's allow-lists
    if !args.chains.is_empty() {
        settings.chains = args.chains.clone();
    }
    if !args.providers.is_empty() {
        settings.providers = args.providers.clone();
    }
    settings.to_filter()
}

fn build_config(args: &PruneArgs, file: &ConfigFile) -> anyhow::Result<Config> {
    let settings = &file.settings;
    let max_attempts = args.max_attempts.unwrap_or(settings.max_attempts);
    let defaults = RetryPolicy::default();

    let mut builder = Config::builder()
        .registry_root(registry_root(&args.registry, file))
        .status_url(
            args.status_url
                .clone()
                .unwrap_or_else(|| settings.status_url.clone()),
        )
        .freshness_days(args.freshness_days.unwrap_or(settings.freshness_days))
        .timeout(Duration::from_secs(
            args.registry.timeout.unwrap_or(settings.timeout_seconds),
        ))
        .workers(workers(&args.registry, file))
        .retry(RetryPolicy::new(
            max_attempts,
            defaults.min_backoff,
            defaults.max_backoff,
        ))
        .filter(build_filter(&args.registry, file))
        .dry_run(args.dry_run);

    if let Some(secs) = args.deadline_secs {
        builder = builder.deadline(Duration::from_secs(secs));
    }

    Ok(builder.build()?)
}

fn spinner(quiet: bool) -> anyhow::Result<Option<ProgressBar>> {
    if quiet {
        return Ok(None);
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?,
    );
    pb.enable_steady_tick(Duration::from_millis(120));
    Ok(Some(pb))
}

async fn run_prune(args: &PruneArgs, cli: &Cli) -> anyhow::Result<()> {
    let file = load_config_file(cli)?;
    let config = build_config(args, &file)?;

    if !cli.quiet {
        eprintln!(
            "Pruning {} (window {} days{})",
            config.registry_root.display(),
            config.freshness_window.as_secs() / 86_400,
            if config.dry_run { ", dry run" } else { "" }
        );
    }

    let pb = spinner(cli.quiet)?;
    let pb_clone = pb.clone();
    let reconciler = Reconciler::new(config)?.with_progress(move |progress: PassProgress| {
        if let Some(ref pb) = pb_clone {
            pb.set_message(format!(
                "{} {}/{}",
                progress.phase, progress.completed, progress.total
            ));
        }
    });

    let start = Instant::now();
    let result = reconciler.run().await;

    if let Some(ref pb) = pb {
        pb.finish_and_clear();
    }
    let report = result?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report);
    }

    if !cli.quiet {
        eprintln!("Pass finished in {:.2}s", start.elapsed().as_secs_f64());
    }

    Ok(())
}

async fn run_check(args: &CheckArgs, cli: &Cli) -> anyhow::Result<()> {
    let file = load_config_file(cli)?;
    let registry = &args.registry;

    let store = RegistryStore::open(registry_root(registry, &file))?;
    let timeout = Duration::from_secs(
        registry
            .timeout
            .unwrap_or(file.settings.timeout_seconds),
    );
    let checker = HealthChecker::new(Prober::new(timeout)?, workers(registry, &file));
    let filter = build_filter(registry, &file);

    let pb = spinner(cli.quiet)?;
    if let Some(ref pb) = pb {
        pb.set_message(format!("checking {}", store.root().display()));
    }

    let result = checker.check_registry(&store, &filter).await;

    if let Some(ref pb) = pb {
        pb.finish_and_clear();
    }
    let report = result?;

    report.write_json(args.output.as_deref())?;

    if !cli.quiet {
        let summary = &report.summary;
        eprintln!(
            "{} endpoints: {} healthy, {} unhealthy, {} failed ({}%)",
            summary.total_endpoints,
            summary.healthy_endpoints,
            summary.unhealthy_endpoints,
            summary.failed_endpoints,
            summary.health_rate
        );
    }

    Ok(())
}

fn handle_config(action: &ConfigCommands, cli: &Cli) -> anyhow::Result<()> {
    let path = cli.config.clone().unwrap_or_else(ConfigFile::default_path);

    match action {
        ConfigCommands::Path => {
            println!("{}", path.display());
        }

        ConfigCommands::Show => {
            if path.exists() {
                let content = std::fs::read_to_string(&path)?;
                println!("# {}\n", path.display());
                println!("{}", content);
            } else {
                println!("No config file found at: {}", path.display());
                println!("\nCreate one with:");
                println!("  registry-pruner config init");
            }
        }

        ConfigCommands::Init { force } => {
            if path.exists() && !force {
                anyhow::bail!(
                    "Config file already exists at {} (use --force to overwrite)",
                    path.display()
                );
            }
            ConfigFile::default().save(&path)?;
            println!("Config written to {}", path.display());
        }
    }

    Ok(())
}
