use nalgebra::{vector, Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::common::Ray;

use super::Camera;

/// Which eye a stereo camera belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Eye {
    Left,
    Right,
}

/// Pinhole camera, world up is `+y`
#[derive(Debug, Clone, PartialEq)]
pub struct PerspectiveCamera {
    position: Point3<f32>,
    direction: Vector3<f32>,
    aspect: f32,
    fov_y: f32, // Vertical field of view, in degrees
    // ray
    dir_00: Vector3<f32>, // Vector from camera point to pixel [0,0]
    du: Vector3<f32>,     // Image plane width in world units, left to right
    dv: Vector3<f32>,     // Image plane height in world units, top to bottom
    right: Vector3<f32>,
    up: Vector3<f32>,
}

impl PerspectiveCamera {
    pub fn new(position: Point3<f32>, direction: Vector3<f32>) -> PerspectiveCamera {
        let mut cam = PerspectiveCamera {
            position,
            direction: direction.normalize(),
            aspect: 1.0,
            fov_y: 60.0,
            dir_00: Vector3::zeros(),
            du: Vector3::zeros(),
            dv: Vector3::zeros(),
            right: Vector3::zeros(),
            up: Vector3::zeros(),
        };
        cam.recalc_plane();
        cam
    }

    /// Camera at `position` looking at `target`
    pub fn look_at(position: Point3<f32>, target: Point3<f32>) -> PerspectiveCamera {
        PerspectiveCamera::new(position, target - position)
    }

    fn recalc_plane(&mut self) {
        let mut world_up = vector![0.0, 1.0, 0.0];
        if self.direction.cross(&world_up).magnitude() < 1e-6 {
            world_up = vector![0.0, 0.0, 1.0];
        }
        self.right = self.direction.cross(&world_up).normalize();
        self.up = self.right.cross(&self.direction);

        let plane_h = 2.0 * f32::tan(f32::to_radians(0.5 * self.fov_y));
        let plane_w = plane_h * self.aspect;

        self.du = self.right * plane_w;
        self.dv = -self.up * plane_h;
        self.dir_00 = self.direction - 0.5 * self.du - 0.5 * self.dv;
    }

    pub fn change_pos(&mut self, delta: Vector3<f32>) {
        self.position += delta;
    }

    pub fn set_pos(&mut self, pos: Point3<f32>) {
        self.position = pos;
    }

    pub fn set_direction(&mut self, direction: Vector3<f32>) {
        self.direction = direction.normalize();
        self.recalc_plane();
    }

    pub fn get_direction(&self) -> Vector3<f32> {
        self.direction
    }

    /// Width divided by height of the image
    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = aspect;
        self.recalc_plane();
    }

    pub fn set_fov_y(&mut self, fov_y: f32) {
        self.fov_y = fov_y;
        self.recalc_plane();
    }

    pub fn right(&self) -> Vector3<f32> {
        self.right
    }

    /// Camera of one eye for stereo rendering.
    /// Eyes are `eye_distance` apart and converge on the point `focal_distance` ahead.
    pub fn eye_camera(&self, eye: Eye, eye_distance: f32, focal_distance: f32) -> PerspectiveCamera {
        let sign = match eye {
            Eye::Left => -1.0,
            Eye::Right => 1.0,
        };
        let focal_point = self.position + self.direction * focal_distance;
        let eye_pos = self.position + self.right * (sign * 0.5 * eye_distance);

        let mut cam = self.clone();
        cam.position = eye_pos;
        cam.set_direction(focal_point - eye_pos);
        cam
    }
}

impl Camera for PerspectiveCamera {
    fn get_position(&self) -> Point3<f32> {
        self.position
    }

    fn get_ray(&self, pixel_coord: (f32, f32)) -> Ray {
        let dir = self.dir_00 + self.du * pixel_coord.0 + self.dv * pixel_coord.1;
        Ray::new(self.position, dir)
    }

    fn project_point(&self, point: &Point3<f32>) -> Option<(f32, f32)> {
        let d = *point - self.position;
        let z = d.dot(&self.direction);
        if z <= 1e-6 {
            return None;
        }
        let x = d.dot(&self.right) / z;
        let y = d.dot(&self.up) / z;
        let plane_w = self.du.magnitude();
        let plane_h = self.dv.magnitude();
        Some((x / plane_w + 0.5, 0.5 - y / plane_h))
    }
}

#[cfg(test)]
mod test {
    use nalgebra::point;

    use super::*;
    use crate::common::BoundBox;

    #[test]
    fn center_ray_follows_direction() {
        let cam = PerspectiveCamera::new(point![0.0, 0.0, 10.0], vector![0.0, 0.0, -1.0]);
        let ray = cam.get_ray((0.5, 0.5));
        assert!((ray.direction - vector![0.0, 0.0, -1.0]).magnitude() < 1e-6);
    }

    #[test]
    fn upper_left_pixel_looks_up_left() {
        let cam = PerspectiveCamera::new(point![0.0, 0.0, 10.0], vector![0.0, 0.0, -1.0]);
        let ray = cam.get_ray((0.0, 0.0));
        assert!(ray.direction.x < 0.0);
        assert!(ray.direction.y > 0.0);
    }

    #[test]
    fn projection_inverts_ray() {
        let cam = PerspectiveCamera::new(point![3.0, 4.0, 10.0], vector![-0.3, -0.2, -1.0]);
        for coord in [(0.1, 0.2), (0.5, 0.5), (0.9, 0.7)] {
            let ray = cam.get_ray(coord);
            let p = ray.point_from_t(7.5);
            let (u, v) = cam.project_point(&p).unwrap();
            assert!((u - coord.0).abs() < 1e-4);
            assert!((v - coord.1).abs() < 1e-4);
        }
    }

    #[test]
    fn point_behind_camera() {
        let cam = PerspectiveCamera::new(point![0.0, 0.0, 0.0], vector![0.0, 0.0, -1.0]);
        assert!(cam.project_point(&point![0.0, 0.0, 5.0]).is_none());
    }

    #[test]
    fn box_projection_is_centered() {
        let cam = PerspectiveCamera::new(point![0.5, 0.5, 5.0], vector![0.0, 0.0, -1.0]);
        let bbox = BoundBox::new(point![0.0, 0.0, 0.0], point![1.0, 1.0, 1.0]);
        let vp = cam.project_box(bbox);
        assert!((vp.lower.x + vp.upper.x - 1.0).abs() < 1e-5);
        assert!((vp.lower.y + vp.upper.y - 1.0).abs() < 1e-5);
        assert!(vp.lower.x > 0.0 && vp.upper.x < 1.0);
    }

    #[test]
    fn eyes_are_separated_and_converge() {
        let cam = PerspectiveCamera::new(point![0.0, 0.0, 10.0], vector![0.0, 0.0, -1.0]);
        let left = cam.eye_camera(Eye::Left, 1.0, 10.0);
        let right = cam.eye_camera(Eye::Right, 1.0, 10.0);
        assert!((left.get_position().x + 0.5).abs() < 1e-6);
        assert!((right.get_position().x - 0.5).abs() < 1e-6);
        // both look at the focal point
        let focal = point![0.0, 0.0, 0.0];
        let (u, _) = left.project_point(&focal).unwrap();
        assert!((u - 0.5).abs() < 1e-5);
        let (u, _) = right.project_point(&focal).unwrap();
        assert!((u - 0.5).abs() < 1e-5);
    }
}
