use nalgebra::{vector, Vector3};
use serde::{Deserialize, Serialize};

use crate::{
    color::{self, RGBA},
    common::ValueRange,
    error::{Result, VolrenError},
};

/// Fixed color scales used for PET data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PetPreset {
    Grayscale,
    HotIron,
    Rainbow,
}

impl PetPreset {
    fn stops(&self) -> &'static [(f32, [f32; 3])] {
        match self {
            PetPreset::Grayscale => &[(0.0, [0.0, 0.0, 0.0]), (1.0, [1.0, 1.0, 1.0])],
            PetPreset::HotIron => &[
                (0.0, [0.0, 0.0, 0.0]),
                (0.35, [1.0, 0.0, 0.0]),
                (0.7, [1.0, 1.0, 0.0]),
                (1.0, [1.0, 1.0, 1.0]),
            ],
            PetPreset::Rainbow => &[
                (0.0, [0.0, 0.0, 1.0]),
                (0.25, [0.0, 1.0, 1.0]),
                (0.5, [0.0, 1.0, 0.0]),
                (0.75, [1.0, 1.0, 0.0]),
                (1.0, [1.0, 0.0, 0.0]),
            ],
        }
    }

    /// Color at `t` in <0;1>
    pub fn color_at(&self, t: f32) -> Vector3<f32> {
        let stops = self.stops();
        let t = t.clamp(0.0, 1.0);
        let right = stops
            .iter()
            .position(|(pos, _)| *pos >= t)
            .unwrap_or(stops.len() - 1)
            .max(1);
        let (p0, c0) = stops[right - 1];
        let (p1, c1) = stops[right];
        let f = (t - p0) / (p1 - p0);
        let c0 = vector![c0[0], c0[1], c0[2]];
        let c1 = vector![c1[0], c1[1], c1[2]];
        c0 * (1.0 - f) + c1 * f
    }
}

/// Opaque color scale inside a threshold window, transparent outside
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pet {
    pub preset: PetPreset,
    pub window: ValueRange,
}

impl Pet {
    pub fn new(preset: PetPreset) -> Pet {
        Pet {
            preset,
            window: ValueRange::unit(),
        }
    }

    pub fn with_window(mut self, window: ValueRange) -> Pet {
        self.window = window;
        self
    }

    pub fn classify(&self, intensity: f32) -> RGBA {
        if !self.window.contains(intensity) {
            return color::zero();
        }
        let t = self.window.normalize(intensity);
        color::from_rgb(self.preset.color_at(t), 1.0)
    }

    pub fn validate(&self) -> Result<()> {
        if self.window.is_empty() || !(self.window.len() >= 0.0) || !self.window.len().is_finite() {
            return Err(VolrenError::BakeFailed(format!(
                "invalid PET window {:?}",
                self.window
            )));
        }
        Ok(())
    }
}
