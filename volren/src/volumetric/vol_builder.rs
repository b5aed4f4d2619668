use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Bit depth of the imported samples.
/// Samples are normalized by the maximum of the precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Precision {
    U8,
    /// 12 bits stored in 16 bit words
    U12,
    U16,
    /// Floating point data, normalized by its own value range
    F32,
}

impl Precision {
    /// Largest representable sample, `None` for floating point
    pub fn max_value(&self) -> Option<f32> {
        match self {
            Precision::U8 => Some(255.0),
            Precision::U12 => Some(4095.0),
            Precision::U16 => Some(65535.0),
            Precision::F32 => None,
        }
    }
}

/// Decoded samples handed over by an importer
pub enum DataSource {
    U8(Vec<u8>),
    U16(Vec<u16>),
    F32(Vec<f32>),
}

impl DataSource {
    pub fn len(&self) -> usize {
        match self {
            DataSource::U8(v) => v.len(),
            DataSource::U16(v) => v.len(),
            DataSource::F32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Precision implied by the storage type
    pub fn natural_precision(&self) -> Precision {
        match self {
            DataSource::U8(_) => Precision::U8,
            DataSource::U16(_) => Precision::U16,
            DataSource::F32(_) => Precision::F32,
        }
    }

    pub fn to_f32(&self) -> Vec<f32> {
        match self {
            DataSource::U8(v) => v.iter().map(|&s| s.into()).collect(),
            DataSource::U16(v) => v.iter().map(|&s| s.into()).collect(),
            DataSource::F32(v) => v.clone(),
        }
    }
}

/// Everything an importer knows about a volume.
/// Unset optional fields fall back to defaults while building.
///
/// Samples are ordered with `z` changing fastest, then `y`, then `x`.
#[derive(Default)]
pub struct VolumeMetadata {
    pub size: Option<Vector3<usize>>,
    pub scale: Option<Vector3<f32>>, // shape of voxels
    pub position: Option<Point3<f32>>,
    pub data: Option<DataSource>,
    pub precision: Option<Precision>,
    pub labels: Option<Vec<u16>>,
    pub modality: Option<String>,
    pub timestep: Option<u32>,
}

impl VolumeMetadata {
    pub fn new(size: Vector3<usize>, data: DataSource) -> VolumeMetadata {
        VolumeMetadata {
            size: Some(size),
            data: Some(data),
            ..Default::default()
        }
    }

    pub fn with_scale(mut self, scale: Vector3<f32>) -> Self {
        self.scale = Some(scale);
        self
    }

    pub fn with_position(mut self, position: Point3<f32>) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_precision(mut self, precision: Precision) -> Self {
        self.precision = Some(precision);
        self
    }

    pub fn with_labels(mut self, labels: Vec<u16>) -> Self {
        self.labels = Some(labels);
        self
    }

    pub fn with_mapping(mut self, modality: impl Into<String>, timestep: u32) -> Self {
        self.modality = Some(modality.into());
        self.timestep = Some(timestep);
        self
    }
}

pub trait BuildVolume
where
    Self: Sized,
{
    fn build(metadata: VolumeMetadata) -> Result<Self>;
}
