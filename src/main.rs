use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use rmp_battmon::data::duration::parse_duration;
use rmp_battmon::settings::SinkKind;
use rmp_battmon::{
    BatteryMonitor, CooldownMode, FileSource, MonitorStats, ReadingSource, Settings, StatusOutput,
    StreamSource,
};

#[derive(Parser, Debug)]
#[command(name = "rmp-battmon")]
#[command(about = "Monitor battery state of charge and warn when batteries run low")]
struct Args {
    /// Settings file (TOML); BATTMON_* environment variables override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Watch a JSON file holding the latest feedback message
    #[arg(short, long, conflicts_with = "connect")]
    file: Option<PathBuf>,

    /// Read newline-delimited feedback JSON from a TCP endpoint (host:port).
    /// Without --file or --connect, readings are read from stdin.
    #[arg(short, long, conflicts_with = "file")]
    connect: Option<String>,

    /// How often to check the watched file (e.g., "1s", "250ms")
    #[arg(short, long, default_value = "1s")]
    refresh: String,

    /// Write the latest battery status to this JSON file
    #[arg(long)]
    publish_file: Option<PathBuf>,

    /// Send battery status as JSON lines to a TCP endpoint (host:port)
    #[arg(long)]
    publish_tcp: Option<String>,

    /// Print battery status as JSON lines on stdout
    #[arg(long)]
    stdout: bool,

    /// How warnings are rendered (overrides the settings file)
    #[arg(long, value_enum)]
    sink: Option<SinkKind>,

    /// Track a separate cooldown for each battery instead of one shared deadline
    #[arg(long)]
    per_channel_cooldown: bool,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    let mut settings = Settings::load(args.config.as_deref()).context("loading settings")?;
    if let Some(sink) = args.sink {
        settings.notify.sink = sink;
    }
    if args.per_channel_cooldown {
        settings.alerts.mode = CooldownMode::PerChannel;
    }

    let monitor = build_monitor(&args, &settings);

    info!("RMP battery monitor started");
    let enabled: Vec<_> = settings
        .batteries
        .enabled_channels()
        .map(|c| c.label())
        .collect();
    if enabled.is_empty() {
        warn!("no batteries enabled; status records will be empty");
    } else {
        info!("monitoring: {}", enabled.join(", "));
    }
    info!("cooldown mode: {:?}", settings.alerts.mode);

    let stats = if let Some(path) = &args.file {
        let refresh = parse_duration(&args.refresh)
            .with_context(|| format!("invalid --refresh value {:?}", args.refresh))?;
        run_with_file(monitor, path, refresh).await
    } else if let Some(addr) = &args.connect {
        run_with_tcp(monitor, addr).await?
    } else {
        run_with_stdin(monitor).await
    };

    info!(
        "processed {} readings, {} warnings ({} undelivered)",
        stats.readings, stats.warnings, stats.notify_failures
    );
    Ok(())
}

fn init_logging(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_monitor(args: &Args, settings: &Settings) -> BatteryMonitor {
    let mut builder = BatteryMonitor::builder(settings.batteries)
        .cooldowns(settings.alerts.cooldowns)
        .mode(settings.alerts.mode)
        .boxed_sink(settings.notify.build_sink());

    if let Some(path) = &args.publish_file {
        builder = builder.output(StatusOutput::file(path));
    }
    if let Some(addr) = &args.publish_tcp {
        builder = builder.output(StatusOutput::tcp(addr));
    }
    if args.stdout {
        builder = builder.output(StatusOutput::Stdout);
    }

    builder.build()
}

/// Run with a watched file
async fn run_with_file(monitor: BatteryMonitor, path: &Path, refresh: Duration) -> MonitorStats {
    let source = FileSource::new(path).with_interval(refresh);
    run_until_shutdown(monitor, source).await
}

/// Run with a TCP stream of readings
async fn run_with_tcp(monitor: BatteryMonitor, addr: &str) -> Result<MonitorStats> {
    use tokio::net::TcpStream;

    info!("connecting to {}...", addr);
    let stream = TcpStream::connect(addr)
        .await
        .with_context(|| format!("failed to connect to {}", addr))?;
    info!("connected");

    let source = StreamSource::spawn(stream, addr);
    Ok(run_until_shutdown(monitor, source).await)
}

/// Run with readings piped in on stdin
async fn run_with_stdin(monitor: BatteryMonitor) -> MonitorStats {
    let source = StreamSource::spawn(tokio::io::stdin(), "stdin");
    run_until_shutdown(monitor, source).await
}

async fn run_until_shutdown<S: ReadingSource>(
    mut monitor: BatteryMonitor,
    mut source: S,
) -> MonitorStats {
    let finished = tokio::select! {
        stats = monitor.run(&mut source) => Some(stats),
        _ = tokio::signal::ctrl_c() => None,
    };

    finished.unwrap_or_else(|| {
        info!("interrupted, shutting down");
        monitor.stats()
    })
}
