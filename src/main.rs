//! # Lagline
//!
//! Runs the staged propagation pipeline behind a pass-through HTTP viewer,
//! or soaks a compressed pipeline and prints delivery statistics.

use clap::{Args, Parser, Subcommand, ValueEnum};
use lagline_pipeline::{LagStrategy, Pipeline, PipelineConfig, PipelineConfigBuilder};
use std::net::SocketAddr;
use std::time::Duration;
use stress_test::soak;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use viewer::ViewerState;

mod viewer;

// ─── CLI ───────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "lagline")]
#[command(about = "Eventually-consistent pipeline with randomized replication lag")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline and serve the HTTP viewer
    Serve {
        #[command(flatten)]
        timing: TimingArgs,

        /// Port for the HTTP viewer
        #[arg(long, env = "LAGLINE_PORT", default_value_t = 3000)]
        port: u16,
    },
    /// Run a compressed pipeline for a fixed time and print statistics
    Soak(SoakArgs),
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StrategyArg {
    /// Fresh lag for every delivery
    PerDelivery,
    /// One lag drawn at startup for all deliveries
    Fixed,
}

impl From<StrategyArg> for LagStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::PerDelivery => LagStrategy::PerDelivery,
            StrategyArg::Fixed => LagStrategy::FixedAtStartup,
        }
    }
}

#[derive(Args, Clone, Debug)]
struct TimingArgs {
    /// Source tick period in milliseconds
    #[arg(long, env = "LAGLINE_FEED_INTERVAL_MS", default_value_t = 30_000)]
    feed_interval_ms: u64,

    /// Upper bound of the replication lag in milliseconds
    #[arg(long, env = "LAGLINE_MAX_LAG_MS", default_value_t = 300_000)]
    max_lag_ms: u64,

    /// Poller tick period in milliseconds
    #[arg(long, env = "LAGLINE_POLL_INTERVAL_MS", default_value_t = 30_000)]
    poll_interval_ms: u64,

    /// How lag is drawn
    #[arg(long, value_enum, env = "LAGLINE_LAG_STRATEGY", default_value_t = StrategyArg::PerDelivery)]
    lag_strategy: StrategyArg,

    /// Seed for reproducible lag draws
    #[arg(long, env = "LAGLINE_LAG_SEED")]
    lag_seed: Option<u64>,

    /// Capacity of the event channels handed to observers
    #[arg(long, env = "LAGLINE_EVENT_CAPACITY", default_value_t = 100)]
    event_capacity: usize,
}

impl TimingArgs {
    fn to_config(&self) -> PipelineConfig {
        let mut builder = PipelineConfigBuilder::new()
            .feed_interval(self.feed_interval_ms)
            .max_lag(self.max_lag_ms)
            .poll_interval(self.poll_interval_ms)
            .lag_strategy(self.lag_strategy.into())
            .event_capacity(self.event_capacity);
        if let Some(seed) = self.lag_seed {
            builder = builder.lag_seed(seed);
        }
        builder.build()
    }
}

#[derive(Args, Clone, Debug)]
struct SoakArgs {
    /// How long to run, in milliseconds
    #[arg(long, default_value_t = 10_000)]
    duration_ms: u64,

    /// Source tick period in milliseconds
    #[arg(long, default_value_t = 50)]
    feed_interval_ms: u64,

    /// Upper bound of the replication lag in milliseconds
    #[arg(long, default_value_t = 1_000)]
    max_lag_ms: u64,

    /// Poller tick period in milliseconds
    #[arg(long, default_value_t = 100)]
    poll_interval_ms: u64,

    /// How lag is drawn
    #[arg(long, value_enum, default_value_t = StrategyArg::PerDelivery)]
    lag_strategy: StrategyArg,

    /// Seed for reproducible lag draws
    #[arg(long)]
    seed: Option<u64>,
}

impl SoakArgs {
    fn to_config(&self) -> PipelineConfig {
        let mut builder = PipelineConfigBuilder::new()
            .feed_interval(self.feed_interval_ms)
            .max_lag(self.max_lag_ms)
            .poll_interval(self.poll_interval_ms)
            .lag_strategy(self.lag_strategy.into());
        if let Some(seed) = self.seed {
            builder = builder.lag_seed(seed);
        }
        builder.build()
    }
}

// ─── Entry point ───────────────────────────────────────────────────────────

fn init_tracing(default_filter: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { timing, port } => {
            init_tracing("lagline=info,lagline_pipeline=info");
            serve(timing.to_config(), port).await
        }
        Commands::Soak(args) => {
            init_tracing("lagline=warn,lagline_pipeline=warn");
            let stats = soak(args.to_config(), Duration::from_millis(args.duration_ms)).await;
            stats.print();
            Ok(())
        }
    }
}

async fn serve(config: PipelineConfig, port: u16) -> anyhow::Result<()> {
    info!(port, "starting; waiting for first data to load");

    let pipeline = Pipeline::start(config);
    let state = ViewerState::new();
    let _listener = state.spawn_listener(pipeline.subscribe_data_fetched());

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    viewer::serve(addr, state).await?;

    info!(mode = %pipeline.mode(), "stopped");
    Ok(())
}
