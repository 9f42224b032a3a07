//! Pipeline controller and frame sinks.
//!
//! # THREADING INVARIANT
//! Exactly two threads touch a pipeline: the caller of `ingest` and the
//! processing thread. They share only the slice ring, the geometry cell
//! (written once), the running flag and the stats counters.

pub mod controller;
pub mod sink;
pub mod stats;

pub use controller::{AccumulatorState, Pipeline, IDLE_SLEEP};
pub use sink::{FnSink, FrameSink};
pub use stats::{IngestReport, PipelineStats, StatsSnapshot};
