use nalgebra::{point, vector, Point3, Vector3};

use crate::common::{BoundBox, Ray};

use super::Precision;

// Volume is axis aligned
// Samples are intensities normalized to <0;1>
// Volume coordinates: voxel (0,0,0) sits at the lower corner of the bound box,
// one unit is one voxel
pub trait Volume {
    /// Data dimensions, number of voxels on each axis
    fn get_size(&self) -> Vector3<usize>;

    /// Shape of one voxel in world units
    fn get_scale(&self) -> Vector3<f32>;

    fn get_bound_box(&self) -> BoundBox;

    fn get_precision(&self) -> Precision;

    /// Voxel value, `None` outside of the grid
    fn get_data(&self, x: usize, y: usize, z: usize) -> Option<f32>;

    /// Segmentation label of a voxel, `None` outside of the grid or without labels
    fn get_label(&self, x: usize, y: usize, z: usize) -> Option<u16>;

    fn has_labels(&self) -> bool;

    /// Largest gradient magnitude found in the data, in world units
    fn max_gradient(&self) -> f32;

    // get volume position
    // axis aligned, lowest corner
    fn get_pos(&self) -> Point3<f32> {
        self.get_bound_box().lower
    }

    // get scaled size
    fn get_dims(&self) -> Vector3<f32> {
        self.get_bound_box().dims()
    }

    /// World position to volume coordinates
    fn world_to_volume(&self, pos: &Point3<f32>) -> Point3<f32> {
        let rel = (*pos - self.get_pos()).component_div(&self.get_scale());
        Point3::from(rel)
    }

    /// Volume coordinates to world position
    fn volume_to_world(&self, pos: &Point3<f32>) -> Point3<f32> {
        self.get_pos() + pos.coords.component_mul(&self.get_scale())
    }

    /// Trilinear interpolation sample, `pos` in volume coordinates.
    /// Positions outside of the grid are clamped to the border.
    fn sample_at(&self, pos: Point3<f32>) -> f32 {
        let size = self.get_size();
        let max = size.map(|v| (v.max(1) - 1) as f32);
        let p = point![
            pos.x.clamp(0.0, max.x),
            pos.y.clamp(0.0, max.y),
            pos.z.clamp(0.0, max.z)
        ];

        let base = p.map(|v| v.floor() as usize);
        let t = p - base.map(|v| v as f32);
        let next = vector![
            (base.x + 1).min(size.x - 1),
            (base.y + 1).min(size.y - 1),
            (base.z + 1).min(size.z - 1)
        ];

        let get = |x, y, z| self.get_data(x, y, z).unwrap_or(0.0);

        let c00 = get(base.x, base.y, base.z) * (1.0 - t.x) + get(next.x, base.y, base.z) * t.x;
        let c01 = get(base.x, base.y, next.z) * (1.0 - t.x) + get(next.x, base.y, next.z) * t.x;
        let c10 = get(base.x, next.y, base.z) * (1.0 - t.x) + get(next.x, next.y, base.z) * t.x;
        let c11 = get(base.x, next.y, next.z) * (1.0 - t.x) + get(next.x, next.y, next.z) * t.x;

        let c0 = c00 * (1.0 - t.y) + c10 * t.y;
        let c1 = c01 * (1.0 - t.y) + c11 * t.y;

        c0 * (1.0 - t.z) + c1 * t.z
    }

    /// Sample and central difference gradient in world units.
    /// Gradient points towards higher intensities.
    fn sample_at_gradient(&self, pos: Point3<f32>) -> (f32, Vector3<f32>) {
        let sample = self.sample_at(pos);
        let scale = self.get_scale();

        let dx = self.sample_at(pos + vector![1.0, 0.0, 0.0])
            - self.sample_at(pos - vector![1.0, 0.0, 0.0]);
        let dy = self.sample_at(pos + vector![0.0, 1.0, 0.0])
            - self.sample_at(pos - vector![0.0, 1.0, 0.0]);
        let dz = self.sample_at(pos + vector![0.0, 0.0, 1.0])
            - self.sample_at(pos - vector![0.0, 0.0, 1.0]);

        let gradient = vector![dx, dy, dz].component_div(&(2.0 * scale));
        (sample, gradient)
    }

    /// Gradient magnitude mapped to `<0;1>` by the largest gradient of the volume
    fn normalized_gradient_magnitude(&self, gradient: &Vector3<f32>) -> f32 {
        let max = self.max_gradient();
        if max > 0.0 {
            (gradient.magnitude() / max).min(1.0)
        } else {
            0.0
        }
    }

    /// Nearest neighbour label lookup, `pos` in volume coordinates
    fn label_at(&self, pos: Point3<f32>) -> Option<u16> {
        if pos.iter().any(|&v| v < -0.5) {
            return None;
        }
        let p = pos.map(|v| v.round() as usize);
        self.get_label(p.x, p.y, p.z)
    }

    // position is inside volume
    fn is_in(&self, pos: &Point3<f32>) -> bool {
        self.get_bound_box().contains(pos)
    }

    fn intersect(&self, ray: &Ray) -> Option<(f32, f32)> {
        self.get_bound_box().intersect(ray)
    }
}
