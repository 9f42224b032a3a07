use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info, warn};

use super::sink::FrameSink;
use super::stats::{IngestReport, PipelineStats, StatsSnapshot};
use crate::accumulation::Accumulator;
use crate::error::PipelineError;
use crate::event::{EventBatch, Geometry};
use crate::params::{AccumulationParams, SliceMethod};
use crate::slicing::{slice_queue, QueueConfig, SliceConsumer, Slicer};

/// How long the processing thread sleeps when the queue was empty. Also
/// bounds the latency of `stop()`.
pub const IDLE_SLEEP: Duration = Duration::from_micros(100);

const THREAD_NAME: &str = "dvaccum-accumulate";

/// Accumulator lifecycle on the processing thread. The surface cannot be
/// sized until the first batch declares the sensor geometry.
#[derive(Debug)]
pub enum AccumulatorState {
    Uninitialized,
    Configured(Accumulator),
}

impl AccumulatorState {
    pub fn accumulator(&self) -> Option<&Accumulator> {
        match self {
            AccumulatorState::Uninitialized => None,
            AccumulatorState::Configured(accumulator) => Some(accumulator),
        }
    }
}

/// Everything the processing thread owns. Moved into the thread on
/// `start()` and handed back by `stop()`.
struct Worker<S> {
    consumer: SliceConsumer,
    sink: S,
    state: AccumulatorState,
    params: Arc<AccumulationParams>,
    geometry: Arc<OnceLock<Geometry>>,
    running: Arc<AtomicBool>,
    stats: Arc<PipelineStats>,
}

impl<S: FrameSink> Worker<S> {
    fn run(mut self) -> Self {
        info!("Starting accumulation.");
        while self.running.load(Ordering::Acquire) {
            if self.step() == 0 {
                thread::sleep(IDLE_SLEEP);
            }
        }
        info!("Accumulation loop exited.");
        self
    }

    /// One drain of the queue. Returns the number of slices processed.
    fn step(&mut self) -> usize {
        // 1. Size the accumulator once ingestion has seen the geometry
        if let AccumulatorState::Uninitialized = self.state {
            let Some(geometry) = self.geometry.get() else {
                return 0;
            };
            info!("Accumulator sized to {}", geometry);
            let accumulator = Accumulator::new(*geometry, Arc::clone(&self.params));
            self.state = AccumulatorState::Configured(accumulator);
        }
        let AccumulatorState::Configured(accumulator) = &mut self.state else {
            return 0;
        };

        let sink = &mut self.sink;
        let stats = &self.stats;
        // 2. Drain: integrate, render, publish, in queue order
        self.consumer.drain_all(|slice| {
            accumulator.accept(&slice);
            let frame = accumulator.render_frame();
            debug!("Slice of {} events -> frame at {}us", slice.len(), frame.timestamp);
            sink.publish(frame);
            stats.record_frame();
        })
    }
}

/// Wires ingestion, slicing, the slice queue and the processing thread.
///
/// `ingest` runs on the caller's thread; integration and frame emission
/// happen on a dedicated thread between `start()` and `stop()`.
pub struct Pipeline<S: FrameSink> {
    params: Arc<AccumulationParams>,
    slicer: Slicer,
    geometry: Arc<OnceLock<Geometry>>,
    running: Arc<AtomicBool>,
    stats: Arc<PipelineStats>,
    dropped: Arc<AtomicU64>,
    parked: Option<Worker<S>>,
    handle: Option<JoinHandle<Worker<S>>>,
}

impl<S: FrameSink> fmt::Debug for Pipeline<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("params", &self.params)
            .field("slicer", &self.slicer)
            .field("geometry", &self.geometry.get())
            .field("running", &self.is_running())
            .finish()
    }
}

impl<S: FrameSink> Pipeline<S> {
    pub fn new(params: AccumulationParams, sink: S) -> Result<Self, PipelineError> {
        Self::with_queue(params, sink, QueueConfig::default())
    }

    pub fn with_queue(
        params: AccumulationParams,
        sink: S,
        queue: QueueConfig,
    ) -> Result<Self, PipelineError> {
        params.validate()?;
        let params = Arc::new(params);
        let (producer, consumer) = slice_queue(queue);
        let dropped = producer.dropped_counter();

        let mut slicer = Slicer::new();
        match params.slice_method {
            SliceMethod::Time => {
                let window = Duration::from_micros(params.accumulation_time.unsigned_abs());
                slicer.do_every_time_interval(window, producer)?;
            }
            SliceMethod::Number => {
                slicer.do_every_number_of_events(params.accumulation_number, producer)?;
            }
        }

        let geometry = Arc::new(OnceLock::new());
        let running = Arc::new(AtomicBool::new(false));
        let stats = Arc::new(PipelineStats::default());
        let worker = Worker {
            consumer,
            sink,
            state: AccumulatorState::Uninitialized,
            params: Arc::clone(&params),
            geometry: Arc::clone(&geometry),
            running: Arc::clone(&running),
            stats: Arc::clone(&stats),
        };

        Ok(Self {
            params,
            slicer,
            geometry,
            running,
            stats,
            dropped,
            parked: Some(worker),
            handle: None,
        })
    }

    pub fn params(&self) -> &AccumulationParams {
        &self.params
    }

    /// Stream geometry, known after the first `ingest`.
    pub fn geometry(&self) -> Option<Geometry> {
        self.geometry.get().copied()
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some() && self.running.load(Ordering::Relaxed)
    }

    /// Events buffered in the slicer, not yet part of a slice.
    pub fn pending_events(&self) -> usize {
        self.slicer.pending()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot(self.dropped.load(Ordering::Relaxed))
    }

    /// Accumulator state while the processing thread is stopped.
    pub fn accumulator(&self) -> Option<&Accumulator> {
        self.parked.as_ref().and_then(|worker| worker.state.accumulator())
    }

    pub fn start(&mut self) -> Result<(), PipelineError> {
        if self.handle.is_some() {
            return Err(PipelineError::AlreadyRunning);
        }
        let worker = self.parked.take().ok_or(PipelineError::WorkerLost)?;

        self.running.store(true, Ordering::Release);
        let spawned = thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || worker.run());
        match spawned {
            Ok(handle) => {
                self.handle = Some(handle);
                info!("Accumulation started");
                Ok(())
            }
            Err(err) => {
                self.running.store(false, Ordering::Release);
                Err(PipelineError::Spawn(err))
            }
        }
    }

    /// Signal the processing thread and wait for it. A drain in progress
    /// completes first; no frame is published after this returns.
    pub fn stop(&mut self) -> Result<(), PipelineError> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        info!("Stopping the accumulation pipeline...");
        self.running.store(false, Ordering::Release);
        let worker = handle.join().map_err(|_| PipelineError::WorkerPanicked)?;
        self.parked = Some(worker);
        Ok(())
    }

    /// Feed one batch from the event source. Slicing happens here, on the
    /// caller's thread.
    pub fn ingest(&mut self, batch: EventBatch) -> Result<IngestReport, PipelineError> {
        let declared = batch.geometry;
        if declared.is_empty() {
            return Err(PipelineError::EmptyGeometry(declared));
        }
        let geometry = *self.geometry.get_or_init(|| {
            info!("First event batch received, stream geometry {}", declared);
            declared
        });
        if geometry != declared {
            return Err(PipelineError::GeometryMismatch {
                expected: geometry,
                got: declared,
            });
        }

        let mut report = IngestReport::default();
        for event in batch.events {
            if !geometry.contains(event.x, event.y) {
                report.out_of_bounds += 1;
                continue;
            }
            match self.slicer.accept(event) {
                Ok(()) => report.accepted += 1,
                Err(err) => {
                    debug!("Rejected event: {}", err);
                    report.rejected += 1;
                }
            }
        }

        if report.rejected > 0 {
            warn!("Event out of order: rejected {} events in batch", report.rejected);
        }
        if report.out_of_bounds > 0 {
            warn!("Dropped {} events outside {}", report.out_of_bounds, geometry);
        }
        self.stats.record_ingest(&report);
        debug!(
            "Ingested {} events, {} slices emitted so far",
            report.accepted,
            self.slicer.slices_emitted()
        );
        Ok(report)
    }

    /// Stop the processing thread, integrate whatever is still queued on
    /// the calling thread, and hand the sink back.
    pub fn finish(mut self) -> Result<S, PipelineError> {
        self.stop()?;
        let mut worker = self.parked.take().ok_or(PipelineError::WorkerLost)?;
        while worker.step() > 0 {}
        Ok(worker.sink)
    }
}

impl<S: FrameSink> Drop for Pipeline<S> {
    fn drop(&mut self) {
        if let Err(err) = self.stop() {
            warn!("Accumulation thread did not stop cleanly: {}", err);
        }
    }
}
