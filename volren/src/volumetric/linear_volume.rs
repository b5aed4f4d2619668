use log::debug;
use nalgebra::{point, vector, Vector3};

use crate::{
    common::{BoundBox, ValueRange},
    error::{Result, VolrenError},
};

use super::{
    vol_builder::{BuildVolume, Precision, VolumeMetadata},
    Volume,
};

/// Volume stored in one continuous buffer of normalized samples.
pub struct LinearVolume {
    bound_box: BoundBox, // lower and upper point in world coordinates; lower == position; upper - lower = size
    size: Vector3<usize>,
    scale: Vector3<f32>,
    data: Vec<f32>,
    labels: Option<Vec<u16>>,
    precision: Precision,
    raw_range: ValueRange,
    max_gradient: f32,
    modality: String,
    timestep: u32,
}

impl std::fmt::Debug for LinearVolume {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Volume")
            .field("box", &self.bound_box)
            .field("size", &self.size)
            .field("data len ", &self.data.len())
            .field("labels", &self.labels.is_some())
            .field("modality", &self.modality)
            .field("timestep", &self.timestep)
            .finish()
    }
}

impl LinearVolume {
    fn get_3d_index(&self, x: usize, y: usize, z: usize) -> usize {
        z + y * self.size.z + x * self.size.y * self.size.z
    }

    fn in_grid(&self, x: usize, y: usize, z: usize) -> bool {
        x < self.size.x && y < self.size.y && z < self.size.z
    }

    /// Modality tag, `"unknown"` when the importer did not set one
    pub fn modality(&self) -> &str {
        &self.modality
    }

    pub fn timestep(&self) -> u32 {
        self.timestep
    }

    /// Range of the samples before normalization
    pub fn raw_range(&self) -> ValueRange {
        self.raw_range
    }

    pub fn voxel_count(&self) -> usize {
        self.data.len()
    }

    fn compute_max_gradient(&self) -> f32 {
        let mut max: f32 = 0.0;
        let val = |x: usize, y: usize, z: usize| self.data[self.get_3d_index(x, y, z)];
        for x in 0..self.size.x {
            let (x0, x1) = (x.saturating_sub(1), (x + 1).min(self.size.x - 1));
            for y in 0..self.size.y {
                let (y0, y1) = (y.saturating_sub(1), (y + 1).min(self.size.y - 1));
                for z in 0..self.size.z {
                    let (z0, z1) = (z.saturating_sub(1), (z + 1).min(self.size.z - 1));
                    let g = vector![
                        (val(x1, y, z) - val(x0, y, z)) / (2.0 * self.scale.x),
                        (val(x, y1, z) - val(x, y0, z)) / (2.0 * self.scale.y),
                        (val(x, y, z1) - val(x, y, z0)) / (2.0 * self.scale.z)
                    ];
                    max = max.max(g.magnitude());
                }
            }
        }
        max
    }
}

impl Volume for LinearVolume {
    fn get_size(&self) -> Vector3<usize> {
        self.size
    }

    fn get_scale(&self) -> Vector3<f32> {
        self.scale
    }

    fn get_bound_box(&self) -> BoundBox {
        self.bound_box
    }

    fn get_precision(&self) -> Precision {
        self.precision
    }

    fn get_data(&self, x: usize, y: usize, z: usize) -> Option<f32> {
        if !self.in_grid(x, y, z) {
            return None;
        }
        self.data.get(self.get_3d_index(x, y, z)).copied()
    }

    fn get_label(&self, x: usize, y: usize, z: usize) -> Option<u16> {
        if !self.in_grid(x, y, z) {
            return None;
        }
        let index = self.get_3d_index(x, y, z);
        self.labels.as_ref().and_then(|l| l.get(index).copied())
    }

    fn has_labels(&self) -> bool {
        self.labels.is_some()
    }

    fn max_gradient(&self) -> f32 {
        self.max_gradient
    }
}

impl BuildVolume for LinearVolume {
    fn build(metadata: VolumeMetadata) -> Result<LinearVolume> {
        let source = metadata
            .data
            .ok_or_else(|| VolrenError::InvalidVolume("no volumetric data passed".into()))?;
        let size = metadata
            .size
            .ok_or_else(|| VolrenError::InvalidVolume("no size".into()))?;

        if size.iter().any(|&s| s == 0) {
            return Err(VolrenError::InvalidVolume(format!("zero sized volume {size:?}")));
        }

        let expected = size.x * size.y * size.z;
        if source.len() != expected {
            return Err(VolrenError::InvalidVolume(format!(
                "expected {expected} samples, got {}",
                source.len()
            )));
        }

        if let Some(labels) = &metadata.labels {
            if labels.len() != expected {
                return Err(VolrenError::InvalidVolume(format!(
                    "expected {expected} labels, got {}",
                    labels.len()
                )));
            }
        }

        let scale = metadata.scale.unwrap_or_else(|| vector![1.0, 1.0, 1.0]);
        if scale.iter().any(|&s| !(s > 0.0)) {
            return Err(VolrenError::InvalidVolume(format!("bad voxel shape {scale:?}")));
        }

        let precision = metadata
            .precision
            .unwrap_or_else(|| source.natural_precision());

        let raw = source.to_f32();
        let raw_range = ValueRange::from_samples(raw.iter());

        let normalization = match precision.max_value() {
            Some(max) => ValueRange::new(0.0, max),
            None => raw_range,
        };

        let data: Vec<f32> = raw
            .iter()
            .map(|&v| normalization.normalize(v).clamp(0.0, 1.0))
            .collect();

        let vol_dims = size.map(|v| (v - 1) as f32).component_mul(&scale);
        let position = metadata.position.unwrap_or_else(|| point![0.0, 0.0, 0.0]);
        let bound_box = BoundBox::from_position_dims(position, vol_dims);

        let mut volume = LinearVolume {
            bound_box,
            size,
            scale,
            data,
            labels: metadata.labels,
            precision,
            raw_range,
            max_gradient: 0.0,
            modality: metadata.modality.unwrap_or_else(|| "unknown".into()),
            timestep: metadata.timestep.unwrap_or(0),
        };
        volume.max_gradient = volume.compute_max_gradient();

        debug!("New linear volume, size {size:?} scale {scale:?} bound_box {bound_box:?}");

        Ok(volume)
    }
}

#[cfg(test)]
mod test {
    use nalgebra::{point, vector};

    use super::*;
    use crate::{common::Ray, test_helpers::*, volumetric::DataSource};

    #[test]
    fn samples_are_normalized() {
        let vol: LinearVolume = white_volume();
        assert_eq!(vol.get_data(0, 0, 0), Some(0.0));
        assert_eq!(vol.get_data(1, 1, 1), Some(1.0));
        assert_eq!(vol.get_data(2, 0, 0), None);
    }

    #[test]
    fn trilinear_center() {
        let vol: LinearVolume = white_volume();
        // average of all 8 corners
        let expected = [0u8, 32, 64, 96, 128, 160, 192, 255]
            .iter()
            .map(|&v| v as f32 / 255.0)
            .sum::<f32>()
            / 8.0;
        let sample = vol.sample_at(point![0.5, 0.5, 0.5]);
        assert!((sample - expected).abs() < 1e-6);
    }

    #[test]
    fn sample_is_clamped_outside() {
        let vol: LinearVolume = white_volume();
        assert_eq!(vol.sample_at(point![-4.0, -4.0, -4.0]), 0.0);
        assert_eq!(vol.sample_at(point![7.0, 7.0, 7.0]), 1.0);
    }

    #[test]
    fn intersect_works() {
        let vol: LinearVolume = white_volume();
        let ray = Ray::new(point![-1.0, -1.0, 0.0], vector![1.0, 1.0, 1.0]);
        assert!(vol.intersect(&ray).is_some());
    }

    #[test]
    fn not_intersecting() {
        let vol: LinearVolume = white_volume();
        let ray = Ray::new(point![200.0, 200.0, 200.0], vector![1.0, 0.0, 0.0]);
        assert!(vol.intersect(&ray).is_none());
    }

    #[test]
    fn gradient_of_ramp() {
        // intensity grows along x
        let size = vector![4, 3, 3];
        let data: Vec<u8> = (0..4u8)
            .flat_map(|x| std::iter::repeat(x * 50).take(9))
            .collect();
        let meta = VolumeMetadata::new(size, DataSource::U8(data));
        let vol = LinearVolume::build(meta).unwrap();
        let (_, grad) = vol.sample_at_gradient(point![1.5, 1.0, 1.0]);
        assert!(grad.x > 0.0);
        assert!(grad.y.abs() < 1e-6 && grad.z.abs() < 1e-6);
        assert!((vol.max_gradient() - 50.0 / 255.0).abs() < 1e-5);
    }

    #[test]
    fn twelve_bit_precision() {
        let meta = VolumeMetadata::new(vector![1, 1, 2], DataSource::U16(vec![0, 4095]))
            .with_precision(Precision::U12);
        let vol = LinearVolume::build(meta).unwrap();
        assert_eq!(vol.get_data(0, 0, 1), Some(1.0));
    }

    #[test]
    fn wrong_sample_count_is_rejected() {
        let meta = VolumeMetadata::new(vector![2, 2, 2], DataSource::U8(vec![0; 7]));
        assert!(matches!(
            LinearVolume::build(meta),
            Err(VolrenError::InvalidVolume(_))
        ));
    }

    #[test]
    fn labels() {
        let vol: LinearVolume = labeled_volume(4);
        assert!(vol.has_labels());
        assert_eq!(vol.get_label(0, 0, 0), Some(1));
        assert_eq!(vol.get_label(3, 0, 0), Some(2));
        assert_eq!(vol.label_at(point![2.6, 0.2, 0.0]), Some(2));
    }
}
