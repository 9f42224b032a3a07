pub mod accumulation;
pub mod error;
pub mod event;
pub mod params;
pub mod pipeline;
pub mod slicing;
pub mod source;

// Re-export the types most callers need
pub use accumulation::{Accumulator, Frame, PotentialSurface};
pub use error::{ConfigError, PipelineError, SliceError, SourceError};
pub use event::{Event, EventBatch, EventSlice, Geometry};
pub use params::{AccumulationParams, DecayFunction, SliceMethod};
pub use pipeline::{FnSink, FrameSink, Pipeline};
pub use slicing::{OverflowPolicy, QueueConfig, Slicer};
