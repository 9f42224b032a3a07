use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use dvaccum::pipeline::StatsSnapshot;
use dvaccum::source::EventReader;
use dvaccum::{AccumulationParams, Frame, Geometry, OverflowPolicy, Pipeline, QueueConfig};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

/// Replays an event file through the accumulation pipeline and writes
/// every rendered frame as a PNG.
#[derive(Parser, Debug)]
#[command(name = "dvaccum")]
#[command(about = "Accumulate event-camera data into image frames")]
struct Args {
    /// JSON file with the eleven accumulation parameters.
    #[arg(long)]
    params: PathBuf,

    /// Event file, one `timestamp_us x y polarity` record per line.
    #[arg(long)]
    events: PathBuf,

    #[arg(long)]
    width: u16,

    #[arg(long)]
    height: u16,

    /// Events per ingested batch.
    #[arg(long, default_value = "4096")]
    batch_size: usize,

    #[arg(long, default_value = "frames")]
    output_dir: PathBuf,

    /// Slice queue capacity.
    #[arg(long, default_value = "1024")]
    queue_capacity: usize,

    /// Wait this many milliseconds for queue room before dropping a slice.
    /// Zero drops immediately.
    #[arg(long, default_value = "100")]
    block_ms: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    tracing::info!("Accumulation node booting...");

    let params = AccumulationParams::from_json_file(&args.params)
        .with_context(|| format!("Failed to read parameters from {}", args.params.display()))?;
    params.log_summary();

    std::fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("Failed to create {}", args.output_dir.display()))?;

    let (frame_tx, frame_rx) = mpsc::channel::<Frame>(64);
    let writer = tokio::spawn(write_frames(frame_rx, args.output_dir.clone()));

    let overflow = if args.block_ms == 0 {
        OverflowPolicy::DropNewest
    } else {
        OverflowPolicy::BlockWithTimeout(Duration::from_millis(args.block_ms))
    };
    let queue = QueueConfig {
        capacity: args.queue_capacity,
        overflow,
    };
    let geometry = Geometry::new(args.width, args.height);
    let events_path = args.events.clone();
    let batch_size = args.batch_size;

    // Ingestion blocks, keep it off the runtime workers.
    let ingest = tokio::task::spawn_blocking(move || -> anyhow::Result<StatsSnapshot> {
        let mut pipeline = Pipeline::with_queue(params, frame_tx, queue)?;
        pipeline.start()?;

        let reader = EventReader::open(&events_path, geometry, batch_size)?;
        for batch in reader {
            pipeline.ingest(batch?)?;
        }

        let stats = pipeline.stats();
        // Dropping the sender closes the channel and ends the writer.
        let sink = pipeline.finish()?;
        drop(sink);
        Ok(stats)
    });

    let stats = ingest.await.context("Ingestion task failed")??;
    let written = writer.await.context("Frame writer task failed")??;

    tracing::info!(
        "Done: {} events ingested, {} rejected, {} slices dropped, {} frames written",
        stats.events_ingested,
        stats.events_rejected,
        stats.slices_dropped,
        written
    );
    tracing::debug!("Pipeline stats: {}", serde_json::to_string(&stats)?);
    Ok(())
}

async fn write_frames(mut rx: mpsc::Receiver<Frame>, dir: PathBuf) -> anyhow::Result<usize> {
    let mut written = 0usize;
    while let Some(frame) = rx.recv().await {
        let path = dir.join(format!("frame_{:06}_{}.png", written, frame.timestamp));
        tokio::task::spawn_blocking(move || {
            frame
                .image
                .save(&path)
                .with_context(|| format!("Failed to write {}", path.display()))
        })
        .await??;
        written += 1;
    }
    Ok(written)
}
