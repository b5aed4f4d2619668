use nalgebra::{vector, Point3, Vector3};

use crate::{
    transfer_function::{BakedLookup, Sample},
    volumetric::Volume,
};

use super::ShadingMode;

/// Light direction (normalized).
/// Single static light.
pub const LIGHT_DIR: Vector3<f32> = vector![-0.74278, -0.55708, -0.37139];

const AMBIENT: f32 = 0.16;
const DIFFUSE: f32 = 0.84;
const SPECULAR: f32 = 0.4;
const SHININESS: f32 = 32.0;
const TOON_LEVELS: f32 = 4.0;

/// Gradients weaker than this leave the sample unshaded
pub const GRADIENT_THRESHOLD: f32 = 1e-4;

/// Surface normal from an intensity gradient.
/// Normals point out of dense regions.
pub fn normal_from_gradient(gradient: &Vector3<f32>) -> Option<Vector3<f32>> {
    let magnitude = gradient.magnitude();
    if magnitude < GRADIENT_THRESHOLD {
        return None;
    }
    Some(-gradient / magnitude)
}

/// Lit color of a sample. `view_dir_neg` points from the sample to the eye.
pub fn shade(
    mode: ShadingMode,
    rgb: Vector3<f32>,
    normal: Option<Vector3<f32>>,
    view_dir_neg: &Vector3<f32>,
) -> Vector3<f32> {
    let normal = match (mode, normal) {
        (ShadingMode::None, _) | (_, None) => return rgb,
        (_, Some(n)) => n,
    };

    let diffuse = f32::max(normal.dot(&-LIGHT_DIR), 0.0);

    match mode {
        ShadingMode::Phong => {
            let reflect = LIGHT_DIR - 2.0 * normal.dot(&LIGHT_DIR) * normal;
            let r_dot_view = reflect.dot(view_dir_neg);
            let specular = f32::max(0.0, r_dot_view).powf(SHININESS) * SPECULAR;
            (rgb * (AMBIENT + DIFFUSE * diffuse) + vector![specular, specular, specular])
                .map(|c| c.clamp(0.0, 1.0))
        }
        ShadingMode::Toon => {
            let level = (diffuse * TOON_LEVELS).ceil() / TOON_LEVELS;
            rgb * (AMBIENT + DIFFUSE * level)
        }
        ShadingMode::None => rgb,
    }
}

/// Fraction of light reaching `pos` (volume coordinates), estimated from
/// the opacity of neighbouring samples along the six axis directions.
pub fn ambient_occlusion<V: Volume + ?Sized>(volume: &V, lookup: &BakedLookup, pos: Point3<f32>) -> f32 {
    const DIRECTIONS: [Vector3<f32>; 6] = [
        vector![1.0, 0.0, 0.0],
        vector![-1.0, 0.0, 0.0],
        vector![0.0, 1.0, 0.0],
        vector![0.0, -1.0, 0.0],
        vector![0.0, 0.0, 1.0],
        vector![0.0, 0.0, -1.0],
    ];
    const RADII: [f32; 2] = [1.0, 2.0];

    let mut occlusion = 0.0;
    for dir in DIRECTIONS.iter() {
        let mut transmission = 1.0;
        for radius in RADII {
            let p = pos + dir * radius;
            let alpha = lookup.classify(Sample::Intensity(volume.sample_at(p))).w;
            transmission *= 1.0 - alpha;
        }
        occlusion += 1.0 - transmission;
    }
    1.0 - occlusion / DIRECTIONS.len() as f32
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn unshaded_without_normal() {
        let rgb = vector![0.3, 0.4, 0.5];
        assert_eq!(shade(ShadingMode::Phong, rgb, None, &vector![0.0, 0.0, 1.0]), rgb);
        assert_eq!(
            shade(ShadingMode::None, rgb, Some(vector![0.0, 1.0, 0.0]), &vector![0.0, 0.0, 1.0]),
            rgb
        );
    }

    #[test]
    fn facing_light_is_brighter() {
        let rgb = vector![0.5, 0.5, 0.5];
        let eye = vector![0.0, 0.0, 1.0];
        let lit = shade(ShadingMode::Phong, rgb, Some(-LIGHT_DIR), &eye);
        let dark = shade(ShadingMode::Phong, rgb, Some(LIGHT_DIR), &eye);
        assert!(lit.x > dark.x);
        assert!((dark.x - rgb.x * AMBIENT).abs() < 1e-6);
    }

    #[test]
    fn toon_is_quantized() {
        let rgb = vector![1.0, 1.0, 1.0];
        let eye = vector![0.0, 0.0, 1.0];
        let a = shade(ShadingMode::Toon, rgb, Some(vector![0.0, 0.0, 1.0]), &eye);
        let b = shade(ShadingMode::Toon, rgb, Some(vector![0.05, 0.0, 0.998]), &eye);
        assert_eq!(a, b);
    }

    #[test]
    fn normal_points_away_from_density() {
        let n = normal_from_gradient(&vector![2.0, 0.0, 0.0]).unwrap();
        assert_eq!(n, vector![-1.0, 0.0, 0.0]);
        assert!(normal_from_gradient(&vector![0.0, 0.0, 0.0]).is_none());
    }
}
