use std::fmt;
use std::time::Duration;

use tracing::debug;

use crate::error::SliceError;
use crate::event::{Event, EventSlice};

/// Receiver of completed slices.
pub trait SliceSink: Send {
    fn deliver(&mut self, slice: EventSlice);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlicePolicy {
    /// Fixed window, in microseconds.
    TimeInterval(i64),
    /// Fixed number of events per slice.
    EventCount(usize),
}

/// Cuts an incrementally arriving event stream into slices.
///
/// One policy is active at a time. Every accepted event ends up in exactly
/// one slice, in arrival order; the only events that never reach a slice
/// are rejected out-of-order events and the unflushed remainder.
pub struct Slicer {
    policy: Option<SlicePolicy>,
    sink: Option<Box<dyn SliceSink>>,
    buffer: Vec<Event>,
    /// Exclusive end of the current time window.
    boundary: Option<i64>,
    newest: Option<i64>,
    emitted: u64,
}

impl fmt::Debug for Slicer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slicer")
            .field("policy", &self.policy)
            .field("pending", &self.buffer.len())
            .field("boundary", &self.boundary)
            .field("newest", &self.newest)
            .field("emitted", &self.emitted)
            .finish()
    }
}

impl Default for Slicer {
    fn default() -> Self {
        Self::new()
    }
}

impl Slicer {
    pub fn new() -> Self {
        Self {
            policy: None,
            sink: None,
            buffer: Vec::new(),
            boundary: None,
            newest: None,
            emitted: 0,
        }
    }

    pub fn policy(&self) -> Option<SlicePolicy> {
        self.policy
    }

    /// Events buffered but not yet flushed.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    pub fn slices_emitted(&self) -> u64 {
        self.emitted
    }

    /// Emit a slice every `window` of event time. Replaces any previous
    /// policy and sink.
    pub fn do_every_time_interval<S>(
        &mut self,
        window: Duration,
        sink: S,
    ) -> Result<(), SliceError>
    where
        S: SliceSink + 'static,
    {
        let micros = i64::try_from(window.as_micros()).unwrap_or(i64::MAX);
        if micros == 0 {
            return Err(SliceError::EmptyWindow);
        }
        self.configure(SlicePolicy::TimeInterval(micros), Box::new(sink));
        Ok(())
    }

    /// Emit a slice every `count` events. Replaces any previous policy and
    /// sink.
    pub fn do_every_number_of_events<S>(&mut self, count: usize, sink: S) -> Result<(), SliceError>
    where
        S: SliceSink + 'static,
    {
        if count == 0 {
            return Err(SliceError::EmptyCount);
        }
        self.configure(SlicePolicy::EventCount(count), Box::new(sink));
        Ok(())
    }

    /// Pending events are replayed through the new policy so nothing
    /// buffered under the old one is lost.
    fn configure(&mut self, policy: SlicePolicy, sink: Box<dyn SliceSink>) {
        debug!("Slicer policy set to {:?}", policy);
        self.policy = Some(policy);
        self.sink = Some(sink);
        self.boundary = None;
        let pending = std::mem::take(&mut self.buffer);
        for event in pending {
            self.route(event);
        }
    }

    pub fn accept(&mut self, event: Event) -> Result<(), SliceError> {
        if let Some(last) = self.newest {
            if event.timestamp < last {
                return Err(SliceError::OutOfOrder {
                    timestamp: event.timestamp,
                    last,
                });
            }
        }
        self.newest = Some(event.timestamp);
        self.route(event);
        Ok(())
    }

    /// Accept a run of events, returning how many were rejected.
    pub fn accept_all<I>(&mut self, events: I) -> usize
    where
        I: IntoIterator<Item = Event>,
    {
        events
            .into_iter()
            .filter(|event| self.accept(*event).is_err())
            .count()
    }

    fn route(&mut self, event: Event) {
        match self.policy {
            None => self.buffer.push(event),
            Some(SlicePolicy::TimeInterval(window)) => {
                // 1. First event under this policy opens the window
                let boundary = *self
                    .boundary
                    .get_or_insert(event.timestamp.saturating_add(window));

                // 2. Crossing the boundary closes the window and skips any
                // empty windows in between
                if event.timestamp >= boundary {
                    self.flush(boundary);
                    self.boundary = Some(next_boundary(boundary, event.timestamp, window));
                }

                // 3. Buffer into the current window
                self.buffer.push(event);
            }
            Some(SlicePolicy::EventCount(count)) => {
                self.buffer.push(event);
                if self.buffer.len() >= count {
                    self.flush(event.timestamp);
                }
            }
        }
    }

    fn flush(&mut self, end_timestamp: i64) {
        if self.buffer.is_empty() {
            return;
        }
        let Some(sink) = self.sink.as_mut() else {
            return;
        };
        let events = std::mem::take(&mut self.buffer);
        sink.deliver(EventSlice::new(events, end_timestamp));
        self.emitted += 1;
    }
}

/// First window boundary strictly after `timestamp`, on the grid that
/// starts at `boundary`. Computed wide so gaps spanning the whole i64
/// range cannot overflow; saturates at `i64::MAX`.
fn next_boundary(boundary: i64, timestamp: i64, window: i64) -> i64 {
    let (boundary, window) = (i128::from(boundary), i128::from(window));
    let skipped = (i128::from(timestamp) - boundary) / window + 1;
    i64::try_from(boundary + skipped * window).unwrap_or(i64::MAX)
}
