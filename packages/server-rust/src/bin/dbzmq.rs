//! `dbzmq`: serve a key-value plugin's operations on ZeroMQ sockets.
//!
//! ```text
//! dbzmq <PLUGIN> [NAME=SCHEME@ADDRESS]...
//! dbzmq builtin:memory put=pull@tcp://127.0.0.1:17701 get=rep@tcp://127.0.0.1:17700
//! ```

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use clap::{Parser, ValueEnum};
use dbzmq_server::lifecycle::spawn_signal_watcher;
use dbzmq_server::{Gateway, GatewayConfig, Plugin, PluginSource};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "dbzmq", version)]
#[command(about = "Serve a key-value backend's operations on per-operation ZeroMQ sockets")]
struct Cli {
    /// Shared library exporting `i_speak_db`, or `builtin:<null|memory|redb>`.
    plugin: String,

    /// Operations to serve, as `name=pull@address` or `name=rep@address`.
    bindings: Vec<String>,

    /// Longest time one poll waits; also bounds shutdown latency.
    #[arg(long, env = "DBZMQ_POLL_INTERVAL_MS", default_value_t = 500)]
    poll_interval_ms: u64,

    /// Socket linger on close; 0 drops unsent replies.
    #[arg(long, env = "DBZMQ_LINGER_MS", default_value_t = 0)]
    linger_ms: u64,

    /// Log every reply at trace level.
    #[arg(long)]
    trace_replies: bool,

    /// Log line format.
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

impl Cli {
    fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            linger: Duration::from_millis(self.linger_ms),
            trace_replies: self.trace_replies,
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let source = PluginSource::parse(&cli.plugin);
    let plugin = Plugin::open(source).context("cannot open plugin")?;
    let mut gateway = Gateway::new(plugin, cli.gateway_config());

    if let Err(err) = gateway.bind_all(&cli.bindings) {
        if gateway.bound_count() == 0 {
            eprint!("{}", gateway.plugin().describe());
            eprintln!("\nUsage: dbzmq <PLUGIN> <NAME=pull@ADDRESS|NAME=rep@ADDRESS>...");
        }
        gateway.close();
        return Err(err.into());
    }

    let shutdown = gateway.shutdown_controller();
    let watcher = spawn_signal_watcher(Arc::clone(&shutdown));

    let (gateway, outcome) = tokio::task::spawn_blocking(move || {
        let outcome = gateway.run();
        (gateway, outcome)
    })
    .await
    .context("gateway loop panicked")?;

    let stats = gateway.close();
    info!(
        bindings = stats.len(),
        state = ?shutdown.health_state(),
        "gateway stopped"
    );
    watcher.abort();

    outcome?;
    Ok(())
}
