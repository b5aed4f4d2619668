use indicatif::{ProgressBar, ProgressStyle};
use nalgebra::{vector, Vector3};
use rayon::prelude::*;

use crate::config::{Config, GeneratorConfig};

mod shapes;
mod solid;
mod sphere;

pub use shapes::ShapesGenerator;
pub use solid::SolidGenerator;
pub use sphere::SphereGenerator;

// Generates one sample at a time, at any location
pub trait SampleGenerator: Sync {
    fn sample_at(&self, coords: Vector3<u32>) -> u8;
}

pub fn get_sample_generator(config: &Config) -> Box<dyn SampleGenerator> {
    match config.generator {
        GeneratorConfig::Shapes { .. } => Box::new(ShapesGenerator::from_config(config)),
        GeneratorConfig::Solid { .. } => Box::new(SolidGenerator::from_config(config)),
        GeneratorConfig::Sphere => Box::new(SphereGenerator::from_config(config)),
    }
}

/// Fill a volume in the library's sample order, `z` changing fastest.
/// Each `x` slab is generated on its own rayon task.
pub fn generate_samples(generator: &dyn SampleGenerator, dims: Vector3<u32>, progress: bool) -> Vec<u8> {
    let slab = (dims.y * dims.z) as usize;
    let mut data = vec![0; slab * dims.x as usize];

    let bar = if progress {
        let bar = ProgressBar::new(dims.x as u64);
        bar.set_style(ProgressStyle::default_bar().template("{bar:40} {pos}/{len} slabs"));
        bar
    } else {
        ProgressBar::hidden()
    };

    data.par_chunks_mut(slab).enumerate().for_each(|(x, chunk)| {
        let mut i = 0;
        for y in 0..dims.y {
            for z in 0..dims.z {
                chunk[i] = generator.sample_at(vector![x as u32, y, z]);
                i += 1;
            }
        }
        bar.inc(1);
    });

    bar.finish_and_clear();
    data
}

#[cfg(test)]
mod test {
    use super::*;

    struct CoordSum;

    impl SampleGenerator for CoordSum {
        fn sample_at(&self, coords: Vector3<u32>) -> u8 {
            (coords.x * 100 + coords.y * 10 + coords.z) as u8
        }
    }

    #[test]
    fn z_changes_fastest() {
        let data = generate_samples(&CoordSum, vector![2, 2, 3], false);
        assert_eq!(data, vec![0, 1, 2, 10, 11, 12, 100, 101, 102, 110, 111, 112]);
    }
}
