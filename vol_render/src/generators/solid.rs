use nalgebra::{vector, Vector3};

use crate::config::{Config, GeneratorConfig};

use super::SampleGenerator;

/// Generate solid volume
/// All sample values are the same, except for an empty border
pub struct SolidGenerator {
    /// The sample value
    sample: u8,
    pad: u32,
    dims: Vector3<u32>,
}

impl SolidGenerator {
    pub fn new(dims: Vector3<u32>, sample: u8, pad: u32) -> SolidGenerator {
        SolidGenerator { sample, pad, dims }
    }

    pub fn from_config(config: &Config) -> SolidGenerator {
        let sample = match config.generator {
            GeneratorConfig::Solid { sample } => sample,
            _ => 255,
        };
        // border only on volumes big enough to keep a core
        let pad = if config.dims.min() > 20 { 5 } else { 0 };
        SolidGenerator::new(config.dims, sample, pad)
    }
}

impl SampleGenerator for SolidGenerator {
    fn sample_at(&self, coords: Vector3<u32>) -> u8 {
        let pad_end = self.dims - vector![self.pad, self.pad, self.pad];
        if coords.x < self.pad
            || coords.y < self.pad
            || coords.z < self.pad
            || coords.x >= pad_end.x
            || coords.y >= pad_end.y
            || coords.z >= pad_end.z
        {
            0
        } else {
            self.sample
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn border_is_empty() {
        let gen = SolidGenerator::new(vector![10, 10, 10], 77, 2);
        assert_eq!(gen.sample_at(vector![1, 5, 5]), 0);
        assert_eq!(gen.sample_at(vector![2, 2, 2]), 77);
        assert_eq!(gen.sample_at(vector![7, 7, 7]), 77);
        assert_eq!(gen.sample_at(vector![8, 5, 5]), 0);
    }
}
