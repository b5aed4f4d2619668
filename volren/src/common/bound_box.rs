use nalgebra::{point, Point3, Vector3};

use super::Ray;

/// Axis aligned box in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundBox {
    pub lower: Point3<f32>,
    pub upper: Point3<f32>,
}

impl BoundBox {
    pub fn new(lower: Point3<f32>, upper: Point3<f32>) -> BoundBox {
        BoundBox { lower, upper }
    }

    /// Zero sized boundbox
    ///
    /// For testing purposes, where bound box is irrelevant
    pub fn empty() -> BoundBox {
        BoundBox {
            lower: point![0.0, 0.0, 0.0],
            upper: point![0.0, 0.0, 0.0],
        }
    }

    pub fn from_position_dims(position: Point3<f32>, dimensions: Vector3<f32>) -> BoundBox {
        BoundBox {
            lower: position,
            upper: position + dimensions,
        }
    }

    pub fn position(&self) -> Point3<f32> {
        self.lower
    }

    pub fn dims(&self) -> Vector3<f32> {
        self.upper - self.lower
    }

    pub fn center(&self) -> Point3<f32> {
        nalgebra::center(&self.lower, &self.upper)
    }

    /// Length of the diagonal
    pub fn diagonal(&self) -> f32 {
        self.dims().magnitude()
    }

    /// Inclusive containment test
    pub fn contains(&self, pos: &Point3<f32>) -> bool {
        (0..3).all(|i| self.lower[i] <= pos[i] && pos[i] <= self.upper[i])
    }

    /// Returns `(t_enter, t_exit)` of the ray segment inside the box.
    /// `t_enter` is clamped to zero when the ray starts inside.
    pub fn intersect(&self, ray: &Ray) -> Option<(f32, f32)> {
        // Source: An Efficient and Robust Ray–Box Intersection Algorithm. Amy Williams et al. 2004.
        let t0 = (self.lower - ray.origin).component_div(&ray.direction);
        let t1 = (self.upper - ray.origin).component_div(&ray.direction);

        let t_minmax = t0.zip_map(&t1, |t0, t1| if t0 < t1 { (t0, t1) } else { (t1, t0) });

        let tmin = f32::max(f32::max(t_minmax.x.0, t_minmax.y.0), t_minmax.z.0);
        let tmax = f32::min(f32::min(t_minmax.x.1, t_minmax.y.1), t_minmax.z.1);

        // whole box behind the origin
        if tmax.is_sign_negative() || tmax.is_nan() {
            return None;
        }

        if tmin > tmax {
            return None;
        }

        Some((f32::max(tmin, 0.0), tmax))
    }
}

/// Iterates the 8 corners of a box
pub struct BoundBoxIterator {
    pub lower: Point3<f32>,
    pub upper: Point3<f32>,
    state: u8,
}

impl Iterator for BoundBoxIterator {
    type Item = Point3<f32>;

    fn next(&mut self) -> Option<Self::Item> {
        let p = match self.state {
            0 => self.lower,
            1 => point![self.upper.x, self.lower.y, self.lower.z],
            2 => point![self.upper.x, self.upper.y, self.lower.z],
            3 => point![self.lower.x, self.upper.y, self.lower.z],
            4 => point![self.lower.x, self.lower.y, self.upper.z],
            5 => point![self.upper.x, self.lower.y, self.upper.z],
            6 => self.upper,
            7 => point![self.lower.x, self.upper.y, self.upper.z],
            _ => return None,
        };
        self.state += 1;
        Some(p)
    }
}

impl IntoIterator for BoundBox {
    type Item = Point3<f32>;

    type IntoIter = BoundBoxIterator;

    fn into_iter(self) -> Self::IntoIter {
        BoundBoxIterator {
            lower: self.lower,
            upper: self.upper,
            state: 0,
        }
    }
}

/// Corner index pairs forming the 12 box edges, indices follow [`BoundBoxIterator`]
pub const BOX_EDGES: [(usize, usize); 12] = [
    (0, 1),
    (1, 2),
    (2, 3),
    (3, 0),
    (4, 5),
    (5, 6),
    (6, 7),
    (7, 4),
    (0, 4),
    (1, 5),
    (2, 6),
    (3, 7),
];

#[cfg(test)]
mod test {
    use nalgebra::vector;

    use super::*;

    fn unit_box() -> BoundBox {
        BoundBox::new(point![0.0, 0.0, 0.0], point![1.0, 1.0, 1.0])
    }

    #[test]
    fn ray_through_box() {
        let ray = Ray::new(point![-1.0, 0.5, 0.5], vector![1.0, 0.0, 0.0]);
        let (t0, t1) = unit_box().intersect(&ray).unwrap();
        assert!((t0 - 1.0).abs() < 1e-6);
        assert!((t1 - 2.0).abs() < 1e-6);
    }

    #[test]
    fn ray_starting_inside() {
        let ray = Ray::new(point![0.5, 0.5, 0.5], vector![0.0, 1.0, 0.0]);
        let (t0, t1) = unit_box().intersect(&ray).unwrap();
        assert_eq!(t0, 0.0);
        assert!((t1 - 0.5).abs() < 1e-6);
    }

    #[test]
    fn box_behind_ray() {
        let ray = Ray::new(point![2.0, 0.5, 0.5], vector![1.0, 0.0, 0.0]);
        assert!(unit_box().intersect(&ray).is_none());
    }

    #[test]
    fn ray_missing_box() {
        let ray = Ray::new(point![-1.0, 2.0, 0.5], vector![1.0, 0.0, 0.0]);
        assert!(unit_box().intersect(&ray).is_none());
    }

    #[test]
    fn corners() {
        let corners: Vec<_> = unit_box().into_iter().collect();
        assert_eq!(corners.len(), 8);
        for (a, b) in BOX_EDGES {
            // every edge changes exactly one coordinate
            let diff = corners[a] - corners[b];
            assert_eq!(diff.iter().filter(|v| v.abs() > 0.0).count(), 1);
        }
        assert_eq!(unit_box().center(), point![0.5, 0.5, 0.5]);
    }
}
