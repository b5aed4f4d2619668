//! Module with helper functions
//! Saves repetition in unit tests, integration tests and benchmarks

use std::sync::Arc;

use nalgebra::vector;

use crate::{
    camera::PerspectiveCamera,
    color::RGBA,
    transfer_function::{KeyedIntensity, MappingKey, TfSnapshot, TransferFunction},
    volumetric::{BuildVolume, DataSource, LinearVolume, Volume, VolumeMetadata},
};

pub fn white_vol_meta() -> VolumeMetadata {
    let data = vec![0, 32, 64, 64 + 32, 128, 128 + 32, 128 + 64, 255];
    VolumeMetadata::new(vector![2, 2, 2], DataSource::U8(data))
}

/// 2x2x2 volume with samples spread over the whole intensity range
pub fn white_volume<V>() -> V
where
    V: Volume + BuildVolume,
{
    BuildVolume::build(white_vol_meta()).unwrap()
}

/// Cube of `side` voxels, all of them `value`
pub fn uniform_volume(side: usize, value: u8) -> LinearVolume {
    let data = vec![value; side * side * side];
    let meta = VolumeMetadata::new(vector![side, side, side], DataSource::U8(data));
    LinearVolume::build(meta).unwrap()
}

/// Cube where the raw value equals the `x` coordinate.
/// Normalized by its range, intensity grows from 0 to 1 along `x`.
pub fn ramp_volume(side: usize) -> LinearVolume {
    let data: Vec<f32> = (0..side)
        .flat_map(|x| std::iter::repeat(x as f32).take(side * side))
        .collect();
    let meta = VolumeMetadata::new(vector![side, side, side], DataSource::F32(data));
    LinearVolume::build(meta).unwrap()
}

/// Cube split into two segments, label 1 for `x < side / 2` and label 2 for the rest
pub fn labeled_volume(side: usize) -> LinearVolume {
    let per_slice = side * side;
    let data = vec![200u8; side * per_slice];
    let labels: Vec<u16> = (0..side)
        .flat_map(|x| std::iter::repeat(if x < side / 2 { 1 } else { 2 }).take(per_slice))
        .collect();
    let meta = VolumeMetadata::new(vector![side, side, side], DataSource::U8(data))
        .with_labels(labels);
    LinearVolume::build(meta).unwrap()
}

/// Same color for every intensity
pub fn constant_tf(color: RGBA) -> TransferFunction {
    KeyedIntensity::from_keys([MappingKey::new(0.0, color), MappingKey::new(1.0, color)])
        .unwrap()
        .into()
}

pub fn tf_snapshot(function: TransferFunction) -> TfSnapshot {
    let lookup = function.bake().unwrap();
    TfSnapshot {
        generation: 0,
        function: Arc::new(function),
        lookup: Arc::new(lookup),
    }
}

/// Camera on the `+z` side of the volume, one diagonal away from its center
pub fn camera_facing(volume: &impl Volume) -> PerspectiveCamera {
    let bound_box = volume.get_bound_box();
    let center = bound_box.center();
    PerspectiveCamera::look_at(center + vector![0.0, 0.0, bound_box.diagonal()], center)
}
