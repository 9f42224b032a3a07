use std::sync::Arc;

use image::{GrayImage, Luma};
use tracing::debug;

use super::surface::PotentialSurface;
use crate::event::{EventSlice, Geometry};
use crate::params::AccumulationParams;

/// A rendered view of the potential surface.
#[derive(Debug, Clone)]
pub struct Frame {
    pub image: GrayImage,
    pub timestamp: i64,
}

/// Integrates event slices into a persistent potential surface.
///
/// The surface is never reset implicitly: every slice builds on the state
/// left by the previous one, and rendering is a read-only view.
#[derive(Debug)]
pub struct Accumulator {
    surface: PotentialSurface,
    params: Arc<AccumulationParams>,
    timestamp: i64,
}

impl Accumulator {
    pub fn new(geometry: Geometry, params: Arc<AccumulationParams>) -> Self {
        Self {
            surface: PotentialSurface::new(geometry, params.neutral_potential),
            params,
            timestamp: 0,
        }
    }

    pub fn geometry(&self) -> Geometry {
        self.surface.geometry()
    }

    pub fn params(&self) -> &AccumulationParams {
        &self.params
    }

    /// Swap in new parameters. The surface keeps its contents, clamped
    /// into the new potential range.
    pub fn set_params(&mut self, params: Arc<AccumulationParams>) {
        self.surface
            .clamp_to(params.min_potential, params.max_potential);
        self.params = params;
    }

    pub fn surface(&self) -> &PotentialSurface {
        &self.surface
    }

    pub fn potential(&self, x: u16, y: u16) -> Option<f32> {
        self.surface.get(x, y)
    }

    /// Timestamp of the most recently accepted slice.
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn accept(&mut self, slice: &EventSlice) {
        let params = Arc::clone(&self.params);
        if params.synchronous_decay {
            self.surface.decay_all_to(slice.end_timestamp(), &params);
        }

        let mut skipped = 0usize;
        for event in slice {
            let Some(idx) = self.surface.index(event.x, event.y) else {
                skipped += 1;
                continue;
            };
            if !params.synchronous_decay {
                self.surface.decay_pixel_to(idx, event.timestamp, &params);
            }
            self.surface.apply_at(idx, event.polarity, event.timestamp, &params);
        }

        if skipped > 0 {
            debug!("Skipped {} events outside {}", skipped, self.geometry());
        }
        self.timestamp = self.timestamp.max(slice.end_timestamp());
    }

    /// Map `[min_potential, max_potential]` linearly onto `[0, 255]`.
    pub fn render_frame(&self) -> Frame {
        let geometry = self.geometry();
        let min = self.params.min_potential;
        let range = self.params.max_potential - min;
        let width = geometry.width as usize;
        let potentials = self.surface.potentials();

        let image = GrayImage::from_fn(geometry.width as u32, geometry.height as u32, |x, y| {
            let value = potentials[y as usize * width + x as usize];
            let normalized = if range > 0.0 { (value - min) / range } else { 0.0 };
            Luma([(normalized * 255.0).round().clamp(0.0, 255.0) as u8])
        });

        Frame {
            image,
            timestamp: self.timestamp,
        }
    }

    /// Return every pixel to neutral. Only called explicitly.
    pub fn reset(&mut self) {
        self.surface.fill(self.params.neutral_potential);
    }
}
