use anyhow::{Context as _, Result};
use clap::Parser;
use std::time::Duration;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use entwine_cli::{
    cli::{Cli, Commands},
    commands, config,
    output::{print_statements, print_steps},
    schema,
};
use entwine_core::Context;
use entwine_sqlite::Client;

const LOG_TARGETS: [&str; 4] = ["entwine_cli", "entwine_core", "entwine_query", "entwine_sqlite"];

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration with CLI overrides
    let config = config::CliConfig::load(cli.config.clone(), cli.dsn.clone())?;

    // Initialize logging; RUST_LOG wins over --verbose and the config level
    let log_level = if cli.verbose { "debug" } else { config.logging.level.as_str() };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let directives: Vec<String> = LOG_TARGETS
            .iter()
            .map(|target| format!("{}={}", target, log_level))
            .collect();
        EnvFilter::new(directives.join(","))
    });
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(path = %config.storage.path, "Using store");

    let ctx = match cli.timeout {
        Some(secs) => Context::new().with_timeout(Duration::from_secs(secs)),
        None => Context::new(),
    };
    let interrupt = ctx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling");
            interrupt.cancel();
        }
    });

    let registry = schema::registry()?;

    if let Commands::Schema { apply: false } = cli.command {
        return print_statements(&commands::schema::statements(&registry)?, cli.json);
    }

    let client = Client::open(config.storage.clone(), registry)
        .with_context(|| format!("Failed to open store: {}", config.storage.path))?;
    let report = commands::schema::apply(&client, &ctx).await?;

    let steps = match cli.command {
        Commands::Schema { .. } => {
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("created: {}", report.created.join(", "));
                println!("present: {}", report.present.join(", "));
            }
            return Ok(());
        }
        Commands::Basics => commands::basics::run(&client, &ctx).await?,
        Commands::Graph => commands::graph::run(&client, &ctx).await?,
        Commands::All => commands::all(&client, &ctx).await?,
    };

    print_steps(&steps, cli.json)
}
