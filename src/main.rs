//! Chunked Delta Video CLI
//!
//! Encodes video files (decoded through ffmpeg) or raw RGB24 streams
//! into the chunked delta container, and decodes containers back into
//! raw RGB24 frames.

use akc_video::{
    container::ContainerReader,
    keyframe::{JpegCodec, KeyImageCodec, RawCodec},
    metrics::{MetricsRegistry, MetricsSnapshot},
    pipeline::{DecodeSession, EncodeSession},
    source::{EncoderConfig, FfmpegSource, FileConfig, FrameSource, RawFrameReader},
    SessionStats,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info, warn};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Debug, Parser)]
#[command(name = "akc", version, about = "Chunked delta video encoder and decoder")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Encode a video (or raw RGB24 stream) into a container.
    Encode(EncodeArgs),
    /// Decode a container into raw RGB24 frames.
    Decode(DecodeArgs),
    /// Print header and chunk statistics of a container.
    Info {
        /// Container file.
        input: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum KeyCodec {
    Jpeg,
    Raw,
}

impl KeyCodec {
    fn build(self) -> Box<dyn KeyImageCodec> {
        match self {
            KeyCodec::Jpeg => Box::new(JpegCodec),
            KeyCodec::Raw => Box::new(RawCodec),
        }
    }
}

#[derive(Debug, Args)]
struct EncodeArgs {
    /// Source video, or "-" for raw RGB24 on stdin.
    input: PathBuf,
    /// Output container file.
    #[arg(short, long)]
    output: PathBuf,
    /// TOML configuration file; flags override its values.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    width: Option<u32>,
    #[arg(long)]
    height: Option<u32>,
    #[arg(long)]
    fps: Option<u16>,
    /// Key image quality (1-100).
    #[arg(long)]
    quality: Option<u8>,
    #[arg(long)]
    block_size: Option<u32>,
    /// Treat the input as raw RGB24 frames instead of running ffmpeg.
    #[arg(long)]
    raw: bool,
    /// Stop after this many frames.
    #[arg(long)]
    max_frames: Option<u64>,
    #[arg(long, value_enum, default_value_t = KeyCodec::Jpeg)]
    codec: KeyCodec,
    /// Write a TOML session summary here.
    #[arg(long)]
    summary: Option<PathBuf>,
    /// Write final Prometheus metrics here.
    #[arg(long)]
    metrics_out: Option<PathBuf>,
    /// Serve live metrics on this port (requires the `metrics` feature).
    #[arg(long)]
    metrics_port: Option<u16>,
}

#[derive(Debug, Args)]
struct DecodeArgs {
    /// Container file.
    input: PathBuf,
    /// Output raw RGB24 file, or "-" for stdout.
    #[arg(short, long)]
    output: PathBuf,
    #[arg(long, value_enum, default_value_t = KeyCodec::Jpeg)]
    codec: KeyCodec,
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("akc v{}", akc_video::VERSION);

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Encode(args) => encode(args),
        Command::Decode(args) => decode(args),
        Command::Info { input } => print_info(&input),
    };

    if let Err(e) = result {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn is_stdio(path: &Path) -> bool {
    path.as_os_str() == "-"
}

fn resolve_config(args: &EncodeArgs) -> CliResult<(EncoderConfig, FileConfig)> {
    let file = match &args.config {
        Some(path) => FileConfig::from_file(path)?,
        None => FileConfig::default(),
    };

    let mut config = file.encoder.clone();
    if let Some(width) = args.width {
        config.width = width;
    }
    if let Some(height) = args.height {
        config.height = height;
    }
    if let Some(fps) = args.fps {
        config.fps = fps;
    }
    if let Some(quality) = args.quality {
        config.quality = quality;
    }
    if let Some(block_size) = args.block_size {
        config.block_size = block_size;
    }

    config.validate()?;
    Ok((config, file))
}

fn open_source(args: &EncodeArgs, config: &EncoderConfig) -> CliResult<Box<dyn FrameSource>> {
    let (w, h) = (config.width, config.height);
    if is_stdio(&args.input) {
        return Ok(Box::new(RawFrameReader::new(io::stdin().lock(), w, h)));
    }
    if args.raw {
        let file = BufReader::new(File::open(&args.input)?);
        return Ok(Box::new(RawFrameReader::new(file, w, h)));
    }
    Ok(Box::new(FfmpegSource::spawn(&args.input, w, h)?))
}

fn encode(args: EncodeArgs) -> CliResult<()> {
    // Configuration errors surface before any file is opened
    let (config, file_config) = resolve_config(&args)?;
    let max_frames = args.max_frames.unwrap_or(file_config.output.max_frames);
    let metrics_port = args.metrics_port.unwrap_or(file_config.output.metrics_port);

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = Arc::clone(&stop);
        ctrlc::set_handler(move || {
            stop.store(true, Ordering::Relaxed);
        })?;
    }

    let registry = MetricsRegistry::new()?;
    let live = live_metrics(metrics_port);

    let mut source = open_source(&args, &config)?;
    let output = BufWriter::new(File::create(&args.output)?);
    let mut session = EncodeSession::new(config, args.codec.build(), output)?;

    let result = session.run(&mut *source, &stop, max_frames, |frame, totals| {
        let snapshot = MetricsSnapshot::from_stats(totals, Some(frame));
        registry.update(&snapshot);
        live.publish(&snapshot);
    });

    let (stats, outcome) = match result {
        Ok(frames) => {
            if stop.load(Ordering::Relaxed) {
                warn!(frames, "Interrupted; finalizing container");
            }
            let (_, stats) = session.finish()?;
            (stats, Ok(()))
        }
        Err(e) => {
            let (_, stats) = session.abort();
            (stats, Err(e.into()))
        }
    };

    let snapshot = MetricsSnapshot::from_stats(&stats, None);
    registry.update(&snapshot);
    live.publish(&snapshot);
    live.shutdown();
    write_reports(&args, &stats, &registry)?;

    outcome
}

fn write_reports(args: &EncodeArgs, stats: &SessionStats, registry: &MetricsRegistry) -> CliResult<()> {
    if let Some(path) = &args.summary {
        std::fs::write(path, stats.to_toml()?)?;
        info!(path = %path.display(), "Wrote session summary");
    }
    if let Some(path) = &args.metrics_out {
        std::fs::write(path, registry.encode()?)?;
        info!(path = %path.display(), "Wrote metrics");
    }
    Ok(())
}

fn decode(args: DecodeArgs) -> CliResult<()> {
    let input = BufReader::new(File::open(&args.input)?);
    let session = DecodeSession::open(args.codec.build(), input)?;

    let header = *session.header();
    info!(
        width = header.width,
        height = header.height,
        fps = header.fps,
        "Decoding to raw RGB24"
    );

    let mut output: Box<dyn Write> = if is_stdio(&args.output) {
        Box::new(BufWriter::new(io::stdout().lock()))
    } else {
        Box::new(BufWriter::new(File::create(&args.output)?))
    };

    for frame in session {
        output.write_all(frame?.pixels())?;
    }
    output.flush()?;
    Ok(())
}

fn print_info(path: &Path) -> CliResult<()> {
    let input: Box<dyn Read> = Box::new(BufReader::new(File::open(path)?));
    let mut reader = ContainerReader::open(input)?;
    let header = *reader.header();

    println!("size:   {}x{}", header.width, header.height);
    println!("fps:    {}", header.fps);

    let (mut key_bytes, mut rle_bytes) = (0u64, 0u64);
    let status = loop {
        match reader.next_chunk() {
            Ok(Some(chunk)) => {
                key_bytes += chunk.key_image.len() as u64;
                rle_bytes += chunk.rle.len() as u64;
            }
            Ok(None) => break "complete".to_string(),
            Err(e) => break format!("damaged ({})", e),
        }
    };

    let frames = reader.chunks_read();
    println!("frames: {}", frames);
    println!("key:    {} bytes", key_bytes);
    println!("rle:    {} bytes", rle_bytes);
    if frames > 0 {
        println!(
            "mean:   {:.1} bytes/frame",
            (key_bytes + rle_bytes) as f64 / frames as f64
        );
    }
    println!("status: {}", status);
    Ok(())
}

/// Handle for pushing snapshots to the live metrics server, if any.
struct LiveMetrics {
    #[cfg(feature = "metrics")]
    server: Option<LiveServer>,
}

#[cfg(feature = "metrics")]
struct LiveServer {
    state: Arc<tokio::sync::RwLock<akc_video::metrics::MetricsState>>,
    shutdown: tokio::sync::oneshot::Sender<()>,
    thread: std::thread::JoinHandle<()>,
}

#[cfg(feature = "metrics")]
impl LiveMetrics {
    fn publish(&self, snapshot: &MetricsSnapshot) {
        if let Some(server) = &self.server {
            server.state.blocking_write().update(snapshot);
        }
    }

    fn shutdown(self) {
        if let Some(server) = self.server {
            let _ = server.shutdown.send(());
            if server.thread.join().is_err() {
                warn!("Metrics thread panicked");
            }
        }
    }
}

#[cfg(not(feature = "metrics"))]
impl LiveMetrics {
    fn publish(&self, _snapshot: &MetricsSnapshot) {}

    fn shutdown(self) {}
}

#[cfg(feature = "metrics")]
fn live_metrics(port: u16) -> LiveMetrics {
    use akc_video::metrics::{MetricsServer, MetricsServerConfig};

    if port == 0 {
        return LiveMetrics { server: None };
    }
    let registry = match MetricsRegistry::new() {
        Ok(registry) => registry,
        Err(e) => {
            warn!("Live metrics disabled: {}", e);
            return LiveMetrics { server: None };
        }
    };

    let server = MetricsServer::new(MetricsServerConfig::with_port(port), registry);
    let state = server.state();
    let (shutdown, stopped) = tokio::sync::oneshot::channel::<()>();

    let thread = std::thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(e) => {
                warn!("Metrics runtime failed: {}", e);
                return;
            }
        };
        let stopped = async {
            let _ = stopped.await;
        };
        if let Err(e) = runtime.block_on(server.run(stopped)) {
            warn!("Live metrics stopped: {}", e);
        }
    });

    LiveMetrics {
        server: Some(LiveServer {
            state,
            shutdown,
            thread,
        }),
    }
}

#[cfg(not(feature = "metrics"))]
fn live_metrics(port: u16) -> LiveMetrics {
    if port != 0 {
        warn!(port, "Built without the `metrics` feature; live metrics disabled");
    }
    LiveMetrics {}
}
