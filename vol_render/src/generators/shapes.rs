use std::ops::RangeBounds;

use nalgebra::{vector, Vector3};

use crate::config::{Config, GeneratorConfig};

use super::SampleGenerator;

/// Generate volume with a number of randomly placed shapes
pub struct ShapesGenerator {
    shapes: Vec<ShapeInfo>,
}

impl ShapesGenerator {
    pub fn from_config(config: &Config) -> ShapesGenerator {
        let (n_of_shapes, sample, obj_size) = match config.generator {
            GeneratorConfig::Shapes {
                n_of_shapes,
                sample,
                obj_size,
            } => (n_of_shapes, sample, obj_size),
            _ => (1, 255, config.dims.min() / 2),
        };

        let size = vector![obj_size, obj_size, obj_size];
        let variance = size / 10;
        let random_shape_gen =
            ShapeInfoGenerator::new(config.dims, size, variance, sample, 10, config.seed);
        let shapes = random_shape_gen.get_shapes(n_of_shapes);
        ShapesGenerator { shapes }
    }
}

impl SampleGenerator for ShapesGenerator {
    fn sample_at(&self, coords: Vector3<u32>) -> u8 {
        // first shape containing the sample wins
        self.shapes
            .iter()
            .find(|shape| shape.contains(coords))
            .map_or(0, |shape| shape.render_at(coords - shape.position_low))
    }
}

// # of enum ShapeType variants
const N_OF_SHAPE_KINDS: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeType {
    Cuboid,
    Sphere,
}

/// One shape in volume
#[derive(Debug)]
pub struct ShapeInfo {
    pub position_low: Vector3<u32>,
    pub position_high: Vector3<u32>,
    pub shape_type: ShapeType,
    pub sample: u8,
}

impl ShapeInfo {
    fn contains(&self, coords: Vector3<u32>) -> bool {
        (0..3).all(|i| coords[i] >= self.position_low[i] && coords[i] <= self.position_high[i])
    }

    fn render_at(&self, offset: Vector3<u32>) -> u8 {
        match self.shape_type {
            ShapeType::Cuboid => self.sample,
            ShapeType::Sphere => self.render_sphere(offset),
        }
    }

    fn render_sphere(&self, offset: Vector3<u32>) -> u8 {
        let size = (self.position_high - self.position_low).cast::<f32>();
        let center = size / 2.0;
        let r = size.min() / 2.0;
        if (offset.cast::<f32>() - center).magnitude() <= r {
            self.sample
        } else {
            0
        }
    }
}

/// Generate shapes
/// Helper type
pub struct ShapeInfoGenerator {
    rng: fastrand::Rng,
    vol_dims: Vector3<u32>,
    size: Vector3<u32>,
    size_variance: Vector3<u32>,
    sample: u8,
    sample_variance: u8,
}

impl ShapeInfoGenerator {
    #[must_use]
    pub fn new(
        vol_dims: Vector3<u32>,
        size: Vector3<u32>,
        size_variance: Vector3<u32>,
        sample: u8,
        sample_variance: u8,
        seed: Option<u64>,
    ) -> Self {
        let rng = fastrand::Rng::new();
        if let Some(seed) = seed {
            rng.seed(seed);
        }

        Self {
            rng,
            vol_dims,
            size,
            size_variance,
            sample,
            sample_variance,
        }
    }

    fn random_shape(&self) -> ShapeType {
        match self.rng.u8(0..N_OF_SHAPE_KINDS) {
            0 => ShapeType::Cuboid,
            _ => ShapeType::Sphere,
        }
    }

    fn random_vector<R>(&self, ranges: Vector3<R>) -> Vector3<u32>
    where
        R: RangeBounds<u32> + Clone,
    {
        let rand_x = self.rng.u32(ranges[0].clone()); // Using index, .x access not working
        let rand_y = self.rng.u32(ranges[1].clone());
        let rand_z = self.rng.u32(ranges[2].clone());
        vector![rand_x, rand_y, rand_z]
    }

    pub fn get_shapes(&self, n: usize) -> Vec<ShapeInfo> {
        (0..n).map(|_| self.get_shape()).collect()
    }

    pub fn get_shape(&self) -> ShapeInfo {
        let shape_type = self.random_shape();

        let max = self.vol_dims.map(|d| d.saturating_sub(1).max(1));
        let size_min = (self.size - self.size_variance.inf(&self.size)).inf(&max);
        let size_max = (self.size + self.size_variance).inf(&max).sup(&size_min);

        let size_ranges = vector![
            size_min.x..=size_max.x,
            size_min.y..=size_max.y,
            size_min.z..=size_max.z
        ];
        let size = self.random_vector(size_ranges);

        // Spawn shape in positions it fits
        let room = self
            .vol_dims
            .zip_map(&size, |d, s| d.saturating_sub(1).saturating_sub(s));
        let pos_ranges = vector![0..=room.x, 0..=room.y, 0..=room.z];
        let position_low = self.random_vector(pos_ranges);

        let position_high = position_low + size;

        ShapeInfo {
            position_low,
            position_high,
            shape_type,
            sample: self.random_sample(),
        }
    }

    fn random_sample(&self) -> u8 {
        // Uses saturating intrinsics, so there is no overflow
        let low = self.sample.saturating_sub(self.sample_variance).max(1);
        let high = self.sample.saturating_add(self.sample_variance).max(low);
        self.rng.u8(low..=high)
    }
}
