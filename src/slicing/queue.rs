use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use tracing::warn;

use super::slicer::SliceSink;
use crate::event::EventSlice;

pub const DEFAULT_CAPACITY: usize = 1024;

const BLOCK_POLL: Duration = Duration::from_micros(50);

/// What the producer does when the ring is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// Drop the incoming slice. Never blocks.
    #[default]
    DropNewest,
    /// Wait for room up to the timeout, then drop the incoming slice.
    BlockWithTimeout(Duration),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueConfig {
    pub capacity: usize,
    pub overflow: OverflowPolicy,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            overflow: OverflowPolicy::DropNewest,
        }
    }
}

/// Build a bounded single-producer/single-consumer slice queue.
pub fn slice_queue(config: QueueConfig) -> (SliceProducer, SliceConsumer) {
    let (inner_prod, inner_cons) = HeapRb::<EventSlice>::new(config.capacity.max(1)).split();
    let producer = SliceProducer {
        inner: inner_prod,
        overflow: config.overflow,
        dropped: Arc::new(AtomicU64::new(0)),
    };
    (producer, SliceConsumer { inner: inner_cons })
}

/// Ingestion-side half of the queue.
pub struct SliceProducer {
    inner: HeapProd<EventSlice>,
    overflow: OverflowPolicy,
    dropped: Arc<AtomicU64>,
}

impl fmt::Debug for SliceProducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SliceProducer")
            .field("queued", &self.inner.occupied_len())
            .field("overflow", &self.overflow)
            .field("dropped", &self.dropped())
            .finish()
    }
}

impl SliceProducer {
    /// Returns `false` when the slice was dropped on overflow.
    pub fn push(&mut self, slice: EventSlice) -> bool {
        let mut slice = match self.inner.try_push(slice) {
            Ok(()) => return true,
            Err(slice) => slice,
        };

        if let OverflowPolicy::BlockWithTimeout(timeout) = self.overflow {
            let started = Instant::now();
            while started.elapsed() < timeout {
                thread::sleep(BLOCK_POLL);
                slice = match self.inner.try_push(slice) {
                    Ok(()) => return true,
                    Err(slice) => slice,
                };
            }
        }

        let total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
        warn!(
            "Slice queue full ({} slices), dropped slice ending at {}us ({} dropped so far)",
            self.inner.capacity(),
            slice.end_timestamp(),
            total
        );
        false
    }

    pub fn len(&self) -> usize {
        self.inner.occupied_len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Shared handle on the drop counter, readable after the producer has
    /// been handed to the slicer.
    pub fn dropped_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.dropped)
    }
}

impl SliceSink for SliceProducer {
    fn deliver(&mut self, slice: EventSlice) {
        self.push(slice);
    }
}

/// Processing-side half of the queue.
pub struct SliceConsumer {
    inner: HeapCons<EventSlice>,
}

impl fmt::Debug for SliceConsumer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SliceConsumer")
            .field("queued", &self.inner.occupied_len())
            .finish()
    }
}

impl SliceConsumer {
    /// Hand every queued slice to `visitor` in FIFO order, removing each.
    /// Returns immediately when the queue is empty.
    pub fn drain_all<F>(&mut self, mut visitor: F) -> usize
    where
        F: FnMut(EventSlice),
    {
        let mut drained = 0;
        while let Some(slice) = self.inner.try_pop() {
            visitor(slice);
            drained += 1;
        }
        drained
    }

    pub fn len(&self) -> usize {
        self.inner.occupied_len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
