use tokio::sync::mpsc;
use tracing::warn;

use crate::accumulation::Frame;
use crate::event::EventSlice;
use crate::slicing::SliceSink;

/// Downstream consumer of rendered frames. Called from the processing
/// thread, once per processed slice.
pub trait FrameSink: Send + 'static {
    fn publish(&mut self, frame: Frame);
}

/// Wraps a closure as a frame or slice sink.
pub struct FnSink<F>(pub F);

impl<F> std::fmt::Debug for FnSink<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FnSink")
    }
}

impl<F> FrameSink for FnSink<F>
where
    F: FnMut(Frame) + Send + 'static,
{
    fn publish(&mut self, frame: Frame) {
        (self.0)(frame)
    }
}

impl<F> SliceSink for FnSink<F>
where
    F: FnMut(EventSlice) + Send,
{
    fn deliver(&mut self, slice: EventSlice) {
        (self.0)(slice)
    }
}

/// Forwards frames into an async runtime. Blocks the processing thread
/// while the channel is full.
impl FrameSink for mpsc::Sender<Frame> {
    fn publish(&mut self, frame: Frame) {
        let timestamp = frame.timestamp;
        if self.blocking_send(frame).is_err() {
            warn!("Frame receiver closed, dropped frame at {}us", timestamp);
        }
    }
}
