use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::{
    color::{self, RGBA},
    error::{Result, VolrenError},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Polarity {
    /// Transparent below the ramp, opaque above
    Rising,
    /// Opaque below the ramp, transparent above
    Falling,
}

/// Opacity ramp of a single color
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ramp {
    pub center: f32,
    pub width: f32,
    pub polarity: Polarity,
    pub color: Vector3<f32>,
}

impl Ramp {
    pub fn new(center: f32, width: f32, polarity: Polarity) -> Ramp {
        Ramp {
            center,
            width,
            polarity,
            color: Vector3::new(1.0, 1.0, 1.0),
        }
    }

    pub fn with_color(mut self, color: Vector3<f32>) -> Ramp {
        self.color = color;
        self
    }

    /// Opacity of the rising ramp
    fn rising(&self, intensity: f32) -> f32 {
        let low = self.center - self.width / 2.0;
        let high = self.center + self.width / 2.0;
        if intensity < low {
            0.0
        } else if intensity >= high {
            1.0
        } else {
            (intensity - low) / self.width
        }
    }

    pub fn classify(&self, intensity: f32) -> RGBA {
        let opacity = match self.polarity {
            Polarity::Rising => self.rising(intensity),
            Polarity::Falling => 1.0 - self.rising(intensity),
        };
        color::from_rgb(self.color, opacity)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.center.is_finite() || !self.width.is_finite() || self.width < 0.0 {
            return Err(VolrenError::BakeFailed(format!(
                "ramp center {} width {} is invalid",
                self.center, self.width
            )));
        }
        if !self.color.iter().all(|c| (0.0..=1.0).contains(c)) {
            return Err(VolrenError::BakeFailed(format!(
                "ramp color {:?} is outside <0;1>",
                self.color.as_slice()
            )));
        }
        Ok(())
    }
}
