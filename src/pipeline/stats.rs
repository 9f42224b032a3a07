use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Counters shared between the ingestion and processing threads.
#[derive(Debug, Default)]
pub struct PipelineStats {
    events_ingested: AtomicU64,
    events_rejected: AtomicU64,
    events_out_of_bounds: AtomicU64,
    slices_processed: AtomicU64,
    frames_emitted: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub events_ingested: u64,
    pub events_rejected: u64,
    pub events_out_of_bounds: u64,
    pub slices_processed: u64,
    pub slices_dropped: u64,
    pub frames_emitted: u64,
}

impl PipelineStats {
    pub(crate) fn record_ingest(&self, report: &IngestReport) {
        self.events_ingested.fetch_add(report.accepted as u64, Ordering::Relaxed);
        self.events_rejected.fetch_add(report.rejected as u64, Ordering::Relaxed);
        self.events_out_of_bounds
            .fetch_add(report.out_of_bounds as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_frame(&self) {
        self.slices_processed.fetch_add(1, Ordering::Relaxed);
        self.frames_emitted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, slices_dropped: u64) -> StatsSnapshot {
        StatsSnapshot {
            events_ingested: self.events_ingested.load(Ordering::Relaxed),
            events_rejected: self.events_rejected.load(Ordering::Relaxed),
            events_out_of_bounds: self.events_out_of_bounds.load(Ordering::Relaxed),
            slices_processed: self.slices_processed.load(Ordering::Relaxed),
            slices_dropped,
            frames_emitted: self.frames_emitted.load(Ordering::Relaxed),
        }
    }
}

/// Outcome of one `ingest` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub accepted: usize,
    /// Out-of-order events.
    pub rejected: usize,
    pub out_of_bounds: usize,
}
