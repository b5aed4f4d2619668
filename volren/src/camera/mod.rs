use nalgebra::Point3;

use crate::common::{BoundBox, Ray, ViewportBox};

mod perspective_camera;

pub use perspective_camera::{Eye, PerspectiveCamera};

/// Camera interface used by raycasters.
///
/// Pixel coordinates are normalized, `(0,0)` is the upper left corner of the image.
pub trait Camera {
    fn get_position(&self) -> Point3<f32>;

    /// Primary ray through normalized pixel coordinate
    fn get_ray(&self, pixel_coord: (f32, f32)) -> Ray;

    /// Normalized screen position of a world point, `None` if behind the camera
    fn project_point(&self, point: &Point3<f32>) -> Option<(f32, f32)>;

    /// Screen rectangle covered by a box.
    /// Conservative: whole screen if part of the box is behind the camera.
    fn project_box(&self, bound_box: BoundBox) -> ViewportBox {
        let mut vp = ViewportBox::new();
        for corner in bound_box {
            match self.project_point(&corner) {
                Some((x, y)) => vp.add_point(x, y),
                None => return ViewportBox::full(),
            }
        }
        vp
    }
}
