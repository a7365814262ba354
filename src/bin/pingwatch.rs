use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use pingwatch::{
    MonitorError,
    config::read_config_file,
    monitors::CycleRunner,
    registry::{FileRegistry, RegistrySource},
};
use tracing::{info, level_filters::LevelFilter, trace};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
#[command(version, about = "Periodic host availability monitor with a daily digest")]
struct Args {
    /// Monitor settings file
    #[arg(short, long, default_value = "settings.json")]
    config: PathBuf,

    /// Host registry file
    #[arg(short, long, default_value = "hosts.json")]
    registry: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: LevelFilter,

    /// Run a single cycle and exit
    #[arg(long)]
    once: bool,
}

fn init(level: LevelFilter) {
    let filter = filter::Targets::new().with_targets(vec![("pingwatch", level)]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init(args.log_level);
    trace!("started with args: {args:?}");

    let config = read_config_file(&args.config)?;
    config.validate()?;

    if !args.registry.is_file() {
        return Err(MonitorError::MissingConfig(args.registry.clone()).into());
    }
    let registry = FileRegistry::new(&args.registry);
    let hosts = registry
        .load()
        .with_context(|| format!("invalid host registry {}", args.registry.display()))?;
    info!("{} hosts registered", hosts.len());

    let mut runner = CycleRunner::from_config(&config, registry).await?;

    if args.once {
        runner.tick().await?;
        return Ok(());
    }

    runner.run().await?;

    Ok(())
}
