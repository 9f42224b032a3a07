use std::fmt;

/// A single brightness change reported by the sensor.
///
/// Timestamps are monotonic microseconds. `polarity` is `true` for an
/// increase in brightness (ON) and `false` for a decrease (OFF).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Event {
    pub x: u16,
    pub y: u16,
    pub timestamp: i64,
    pub polarity: bool,
}

impl Event {
    pub fn new(x: u16, y: u16, timestamp: i64, polarity: bool) -> Self {
        Self { x, y, timestamp, polarity }
    }
}

/// Sensor resolution, fixed once from the first batch of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Geometry {
    pub width: u16,
    pub height: u16,
}

impl Geometry {
    pub fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn contains(&self, x: u16, y: u16) -> bool {
        x < self.width && y < self.height
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A batch of events as handed over by the event source.
#[derive(Debug, Clone, PartialEq)]
pub struct EventBatch {
    pub geometry: Geometry,
    pub events: Vec<Event>,
}

impl EventBatch {
    pub fn new(geometry: Geometry, events: Vec<Event>) -> Self {
        Self { geometry, events }
    }
}

/// An ordered, finite run of events closed by the slicer.
///
/// Slices are immutable once built. They move from the ingestion thread
/// into the slice queue and are consumed by the processing thread.
#[derive(Debug, Clone, PartialEq)]
pub struct EventSlice {
    events: Vec<Event>,
    end_timestamp: i64,
}

impl EventSlice {
    pub fn new(events: Vec<Event>, end_timestamp: i64) -> Self {
        Self { events, end_timestamp }
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Event> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Time at which the slice closed. For time windows this is the
    /// (exclusive) window boundary, for counted slices the last event.
    pub fn end_timestamp(&self) -> i64 {
        self.end_timestamp
    }

    pub fn first_timestamp(&self) -> Option<i64> {
        self.events.first().map(|e| e.timestamp)
    }

    pub fn last_timestamp(&self) -> Option<i64> {
        self.events.last().map(|e| e.timestamp)
    }
}

impl<'a> IntoIterator for &'a EventSlice {
    type Item = &'a Event;
    type IntoIter = std::slice::Iter<'a, Event>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}
