pub use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use nalgebra::{vector, Vector3};
pub use volren::{
    render::{Quality, Raycaster, RaycasterKind, RenderSettings, RenderTargets},
    texture::{TextureData, TextureSpec},
    transfer_function::{KeyedIntensity, TfSnapshot, TransferFunction},
    volumetric::LinearVolume,
    PerspectiveCamera,
};
use volren::{
    test_helpers::{camera_facing, tf_snapshot},
    volumetric::{BuildVolume, DataSource, VolumeMetadata},
};

pub const WIDTH: usize = 256;
pub const HEIGHT: usize = 256;

pub const VOLUME_SIDE: usize = 96;

/// Sphere of dense material with a soft shell, the rest is empty
pub fn sphere_volume(side: usize) -> LinearVolume {
    let center = (side as f32 - 1.0) / 2.0;
    let radius = side as f32 * 0.4;
    let mut data = Vec::with_capacity(side * side * side);
    for x in 0..side {
        for y in 0..side {
            for z in 0..side {
                let d = Vector3::new(x as f32, y as f32, z as f32)
                    - Vector3::new(center, center, center);
                let falloff = (1.0 - d.magnitude() / radius).clamp(0.0, 1.0);
                data.push((falloff * 255.0) as u8);
            }
        }
    }
    let size = vector![side, side, side];
    LinearVolume::build(VolumeMetadata::new(size, DataSource::U8(data))).unwrap()
}

/// Settings shared by all benchmarks, single threaded for stable numbers
pub fn bench_settings(quality: Quality, ray_termination: bool) -> RenderSettings {
    RenderSettings::builder()
        .resolution((WIDTH, HEIGHT))
        .quality(quality)
        .early_ray_termination(ray_termination)
        .multi_thread(false)
        .build_unchecked()
}

pub struct BenchScene {
    pub volume: LinearVolume,
    pub tf: TfSnapshot,
    pub camera: PerspectiveCamera,
}

impl BenchScene {
    pub fn new() -> BenchScene {
        let volume = sphere_volume(VOLUME_SIDE);
        let tf = tf_snapshot(TransferFunction::from(KeyedIntensity::standard()));
        let camera = camera_facing(&volume);
        BenchScene { volume, tf, camera }
    }

    pub fn render(&self, kind: RaycasterKind, settings: &RenderSettings, color: &mut TextureData) {
        let image = Raycaster::new(kind)
            .render(
                &self.volume,
                &self.tf,
                &self.camera,
                settings,
                RenderTargets::color_only(color),
            )
            .unwrap();
        black_box(image);
    }
}
