//! # Courier Runtime
//!
//! Runs one subscriber against an in-memory topic fed by a demo publisher.
//!
//! ## Startup Sequence
//!
//! 1. Initialise logging from the environment
//! 2. Load configuration (file, `COURIER_CONFIG`, or the scenario preset)
//! 3. Wire transport, pipeline and handlers
//! 4. Start the publisher and the subscriber
//! 5. On Ctrl-C (or `--run-for-secs`), stop intake and drain

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use courier_runtime::config::{load_config, resolve_path};
use courier_runtime::handlers::FooHandler;
use courier_runtime::{DemoPublisher, Scenario, SubscriberHost};
use courier_subscriber::HandlerRegistry;
use courier_telemetry::{init_logging, PipelineMetrics, TelemetryConfig};
use shared_bus::{InMemoryTopic, TopicPublisher};

/// Courier: subscriber pipeline demo host
#[derive(Parser, Debug)]
#[command(name = "courier-runtime")]
#[command(about = "Run a Courier subscriber against an in-memory topic")]
struct Args {
    /// Demo scenario
    #[arg(short, long, value_enum, default_value_t = Scenario::Hello)]
    scenario: Scenario,

    /// Subscriber configuration file (TOML); overrides the scenario preset
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Delay between published events, in milliseconds
    #[arg(long, default_value = "200")]
    publish_interval_ms: u64,

    /// Stop on its own after this many seconds
    #[arg(long)]
    run_for_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&TelemetryConfig::from_env()).context("Failed to initialise logging")?;

    let config = match resolve_path(args.config) {
        Some(path) => load_config(&path)?,
        None => args.scenario.config(),
    };

    info!("===========================================");
    info!("  Courier Runtime v{}", env!("CARGO_PKG_VERSION"));
    info!("  Scenario: {}", args.scenario.name());
    info!("===========================================");

    let metrics = PipelineMetrics::new().context("Failed to register metrics")?;
    let topic = InMemoryTopic::new(config.topic.as_str());
    let handler = Arc::new(FooHandler::new(args.scenario.failure_plan()));
    let handlers = HandlerRegistry::builder()
        .register_shared(Arc::clone(&handler))
        .build()
        .context("Failed to register handlers")?;
    let host = SubscriberHost::build(&config, handlers, &topic, metrics.clone())
        .context("Failed to wire subscriber")?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let publisher = DemoPublisher::new(
        TopicPublisher::new(topic.clone()),
        Duration::from_millis(args.publish_interval_ms),
    )
    .with_malformed_every(args.scenario.malformed_every());
    let publishing = {
        let shutdown = shutdown_rx.clone();
        tokio::spawn(async move { publisher.run(shutdown).await })
    };

    let signal = tokio::spawn(async move {
        match args.run_for_secs {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!(error = %e, "Failed to listen for Ctrl-C");
                    std::future::pending::<()>().await;
                }
            }
        }
        info!("Subscriber shutdown requested");
        let _ = shutdown_tx.send(true);
    });

    info!("Subscriber is running. Press Ctrl+C to stop.");
    let summary = host.run(shutdown_rx).await;
    signal.abort();

    let published = publishing
        .await
        .context("Publisher task failed")?
        .context("Publishing failed")?;

    info!(
        published,
        handled = handler.handled(),
        batches = summary.batches,
        completed = summary.completed,
        dead_lettered = summary.dead_lettered,
        left_for_redelivery = summary.left_for_redelivery,
        dead_letter_store = host.subscription().dead_letters().len(),
        "Shutdown complete"
    );
    debug!("Metrics:\n{}", metrics.render()?);

    Ok(())
}
