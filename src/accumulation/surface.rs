use super::decay::{apply, decay};
use crate::event::Geometry;
use crate::params::{AccumulationParams, DecayFunction};

/// Per-pixel potentials plus per-pixel decay bookkeeping.
///
/// Row-major, `width * height` entries. Values start at the neutral
/// potential and last-update times at zero. For continuous decay the
/// timestamp is the last decay evaluation; for STEP it is the last event,
/// so the hold time is measured from the event and not from the last check.
#[derive(Debug, Clone)]
pub struct PotentialSurface {
    geometry: Geometry,
    potentials: Vec<f32>,
    last_update: Vec<i64>,
}

impl PotentialSurface {
    pub fn new(geometry: Geometry, neutral: f32) -> Self {
        let n = geometry.pixel_count();
        Self {
            geometry,
            potentials: vec![neutral; n],
            last_update: vec![0; n],
        }
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    pub fn index(&self, x: u16, y: u16) -> Option<usize> {
        self.geometry
            .contains(x, y)
            .then(|| y as usize * self.geometry.width as usize + x as usize)
    }

    pub fn get(&self, x: u16, y: u16) -> Option<f32> {
        self.index(x, y).map(|idx| self.potentials[idx])
    }

    pub fn potentials(&self) -> &[f32] {
        &self.potentials
    }

    pub fn last_update(&self, x: u16, y: u16) -> Option<i64> {
        self.index(x, y).map(|idx| self.last_update[idx])
    }

    /// Decay one pixel up to `timestamp`. Earlier timestamps leave the
    /// pixel and its bookkeeping unchanged.
    pub(crate) fn decay_pixel_to(
        &mut self,
        idx: usize,
        timestamp: i64,
        params: &AccumulationParams,
    ) {
        let elapsed = timestamp.saturating_sub(self.last_update[idx]);
        if elapsed > 0 {
            let decayed = decay(self.potentials[idx], elapsed, params);
            self.potentials[idx] = decayed.clamp(params.min_potential, params.max_potential);
            if params.decay_function != DecayFunction::Step {
                self.last_update[idx] = timestamp;
            }
        }
    }

    pub(crate) fn decay_all_to(&mut self, timestamp: i64, params: &AccumulationParams) {
        for idx in 0..self.potentials.len() {
            self.decay_pixel_to(idx, timestamp, params);
        }
    }

    pub(crate) fn apply_at(
        &mut self,
        idx: usize,
        polarity: bool,
        timestamp: i64,
        params: &AccumulationParams,
    ) {
        self.potentials[idx] = apply(self.potentials[idx], polarity, params);
        self.last_update[idx] = match params.decay_function {
            DecayFunction::Step => timestamp,
            _ => self.last_update[idx].max(timestamp),
        };
    }

    /// Pull every potential into `[min, max]`, keeping the rest as is.
    pub(crate) fn clamp_to(&mut self, min: f32, max: f32) {
        for potential in &mut self.potentials {
            *potential = potential.clamp(min, max);
        }
    }

    pub(crate) fn fill(&mut self, neutral: f32) {
        self.potentials.fill(neutral);
        self.last_update.fill(0);
    }
}
