use nalgebra::Vector3;

use crate::config::Config;

use super::SampleGenerator;

/// Sphere in the middle of the volume, densest in its center
pub struct SphereGenerator {
    center: Vector3<f32>,
    radius: f32,
}

impl SphereGenerator {
    pub fn new(dims: Vector3<u32>) -> SphereGenerator {
        let extent = dims.map(|d| d.saturating_sub(1) as f32);
        SphereGenerator {
            center: extent / 2.0,
            radius: extent.min() / 2.0,
        }
    }

    pub fn from_config(config: &Config) -> SphereGenerator {
        SphereGenerator::new(config.dims)
    }
}

impl SampleGenerator for SphereGenerator {
    fn sample_at(&self, coords: Vector3<u32>) -> u8 {
        if self.radius <= 0.0 {
            return 255;
        }
        let distance = (coords.cast::<f32>() - self.center).magnitude();
        let falloff = (1.0 - distance / self.radius).clamp(0.0, 1.0);
        (falloff * 255.0).round() as u8
    }
}
