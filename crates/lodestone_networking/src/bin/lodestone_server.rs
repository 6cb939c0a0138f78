//! # Lodestone Server
//!
//! Hosts the session table and the scheduler thread. The transport plugs
//! into [`SyncServer`]; this binary runs liveness and tick-rate sampling and
//! logs forwarded peer input.
//!
//! ## Usage
//!
//! ```bash
//! RUST_LOG=debug lodestone_server --config lodestone.toml --duration-secs 60
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use lodestone_networking::{
    NetworkConfig, Scheduler, SessionLivenessTask, SyncServer, TickRateMonitor,
};
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Lodestone entity sync server")]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured port
    #[arg(short, long)]
    port: Option<u16>,

    /// Exit after this many seconds
    #[arg(short, long)]
    duration_secs: Option<u64>,

    /// Seconds between tick-rate reports
    #[arg(long, default_value_t = 30)]
    report_secs: u64,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => NetworkConfig::load(path)?,
        None => NetworkConfig::default(),
    };
    if let Some(port) = args.port {
        config.port = port;
    }
    config.validate()?;

    let period = config.tick_period();
    let start = Instant::now();
    let server = Arc::new(SyncServer::with_standard_protocol(config.clone())?);

    let tick_rate = TickRateMonitor::new(&config.tick_rate, start);
    let metrics = tick_rate.metrics();

    let mut scheduler = Scheduler::new(period, start);
    scheduler
        .add_task(tick_rate)
        .add_task(SessionLivenessTask::new(Arc::clone(&server), start));

    info!(
        "Lodestone ready on port {} ({:?} tick, {} channels)",
        config.port,
        period,
        server.registry().dynamic_channels().count()
    );

    let events = server.events();
    let deadline = args.duration_secs.map(|s| start + Duration::from_secs(s));
    let report_every = Duration::from_secs(args.report_secs.max(1));
    let mut last_report = start;

    let mut interval = time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = &mut shutdown => {
                info!("Interrupted");
                break;
            }
        }

        let now = Instant::now();
        scheduler.run_due(now);

        for event in events.try_iter() {
            debug!("Session {} sent {:?}", event.session, event.message.kind());
        }

        if now.duration_since(last_report) >= report_every {
            last_report = now;
            for line in metrics.report().lines() {
                info!("{}", line);
            }
        }

        if deadline.is_some_and(|d| now >= d) {
            break;
        }
    }

    let stats = scheduler.stats();
    info!(
        "Shutting down: {} task runs, {} failures, {} sessions open",
        stats.runs,
        stats.failures,
        server.session_count()
    );
    Ok(())
}
