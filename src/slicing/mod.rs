//! Event slicing and the cross-thread slice queue.
//!
//! The slicer runs inline on the ingestion thread and hands finished slices
//! to a `SliceSink`. In the pipeline that sink is the producer half of a
//! lock-free SPSC ring; the consumer half lives on the processing thread.

pub mod queue;
pub mod slicer;

pub use queue::{slice_queue, OverflowPolicy, QueueConfig, SliceConsumer, SliceProducer};
pub use slicer::{SlicePolicy, SliceSink, Slicer};
