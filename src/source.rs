//! Text event files: one `timestamp_us x y polarity` record per line.
//!
//! Blank lines and lines starting with `#` are skipped. Polarity accepts
//! `1`/`0`, `1`/`-1` or `true`/`false`.

use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};

use crate::error::SourceError;
use crate::event::{Event, EventBatch, Geometry};

/// Reads an event file as a sequence of fixed-size batches.
#[derive(Debug)]
pub struct EventReader<R> {
    lines: Lines<R>,
    path: PathBuf,
    geometry: Geometry,
    batch_size: usize,
    line_no: usize,
    done: bool,
}

impl EventReader<BufReader<File>> {
    pub fn open(
        path: impl AsRef<Path>,
        geometry: Geometry,
        batch_size: usize,
    ) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| SourceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut reader = Self::new(BufReader::new(file), geometry, batch_size);
        reader.path = path.to_path_buf();
        Ok(reader)
    }
}

impl<R: BufRead> EventReader<R> {
    pub fn new(reader: R, geometry: Geometry, batch_size: usize) -> Self {
        Self {
            lines: reader.lines(),
            path: PathBuf::from("<stream>"),
            geometry,
            batch_size: batch_size.max(1),
            line_no: 0,
            done: false,
        }
    }
}

impl<R: BufRead> Iterator for EventReader<R> {
    type Item = Result<EventBatch, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let mut events = Vec::with_capacity(self.batch_size);
        while events.len() < self.batch_size {
            let line = match self.lines.next() {
                None => {
                    self.done = true;
                    break;
                }
                Some(Err(source)) => {
                    self.done = true;
                    return Some(Err(SourceError::Io {
                        path: self.path.clone(),
                        source,
                    }));
                }
                Some(Ok(line)) => line,
            };
            self.line_no += 1;
            match parse_line(&line) {
                Ok(Some(event)) => events.push(event),
                Ok(None) => {}
                Err(reason) => {
                    self.done = true;
                    return Some(Err(SourceError::Parse {
                        line: self.line_no,
                        reason,
                    }));
                }
            }
        }

        if events.is_empty() {
            None
        } else {
            Some(Ok(EventBatch::new(self.geometry, events)))
        }
    }
}

/// Parse one record. `Ok(None)` for blank and comment lines.
pub fn parse_line(line: &str) -> Result<Option<Event>, String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let fields: Vec<&str> = line.split_whitespace().collect();
    let &[timestamp, x, y, polarity] = fields.as_slice() else {
        return Err(format!("expected 4 fields, found {}", fields.len()));
    };

    let timestamp = timestamp
        .parse::<i64>()
        .map_err(|e| format!("bad timestamp `{timestamp}`: {e}"))?;
    let x = x.parse::<u16>().map_err(|e| format!("bad x `{x}`: {e}"))?;
    let y = y.parse::<u16>().map_err(|e| format!("bad y `{y}`: {e}"))?;
    let polarity = match polarity {
        "1" | "true" => true,
        "0" | "-1" | "false" => false,
        other => return Err(format!("bad polarity `{other}`")),
    };

    Ok(Some(Event::new(x, y, timestamp, polarity)))
}
