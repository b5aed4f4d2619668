use std::{cmp::min, ops::Range};

use nalgebra::{point, Point2, Vector2};

/// A 2D range in normalized screen space (`<0;1>` on both axes),
/// typically the projection of a bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportBox {
    pub lower: Point2<f32>,
    pub upper: Point2<f32>,
}

impl ViewportBox {
    /// Flipped box, any added point becomes the box
    pub fn new() -> Self {
        Self {
            lower: point![f32::INFINITY, f32::INFINITY],
            upper: point![f32::NEG_INFINITY, f32::NEG_INFINITY],
        }
    }

    /// Whole screen
    pub fn full() -> Self {
        Self {
            lower: point![0.0, 0.0],
            upper: point![1.0, 1.0],
        }
    }

    pub fn add_point(&mut self, x: f32, y: f32) {
        self.upper.x = f32::max(self.upper.x, x);
        self.upper.y = f32::max(self.upper.y, y);
        self.lower.x = f32::min(self.lower.x, x);
        self.lower.y = f32::min(self.lower.y, y);
    }

    pub fn size(&self) -> Vector2<f32> {
        self.upper - self.lower
    }

    /// Pixels covered by the box on a `resolution` sized image.
    /// Parts outside of the screen are cut off.
    pub fn get_pixel_range(&self, resolution: (usize, usize)) -> (Range<usize>, Range<usize>) {
        let (width, height) = resolution;
        let width_f = width as f32;
        let height_f = height as f32;

        let lower_x = f32::floor(self.lower.x.max(0.0) * width_f);
        let lower_y = f32::floor(self.lower.y.max(0.0) * height_f);
        let upper_x = f32::ceil(self.upper.x.min(1.0) * width_f);
        let upper_y = f32::ceil(self.upper.y.min(1.0) * height_f);

        if !(upper_x > lower_x && upper_y > lower_y) {
            return (0..0, 0..0);
        }

        let start_x = lower_x as usize;
        let start_y = lower_y as usize;
        let end_x = min(upper_x as usize, width);
        let end_y = min(upper_y as usize, height);

        (start_x..end_x, start_y..end_y)
    }
}

impl Default for ViewportBox {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {

    use super::*;

    #[test]
    fn viewport() {
        let mut vp = ViewportBox::new();

        vp.add_point(0.5, 0.5);

        assert_eq!(vp.lower, point![0.5, 0.5]);
        assert_eq!(vp.upper, point![0.5, 0.5]);

        vp.add_point(0.6, 0.6);
        vp.add_point(0.5, 0.7);
        vp.add_point(0.3, 0.2);

        assert_eq!(vp.lower, point![0.3, 0.2]);
        assert_eq!(vp.upper, point![0.6, 0.7]);
    }

    #[test]
    fn pixel_range_is_clipped() {
        let mut vp = ViewportBox::new();
        vp.add_point(-0.5, 0.25);
        vp.add_point(0.5, 2.0);

        let (xs, ys) = vp.get_pixel_range((100, 40));
        assert_eq!(xs, 0..50);
        assert_eq!(ys, 10..40);
    }

    #[test]
    fn offscreen_box_has_no_pixels() {
        let mut vp = ViewportBox::new();
        vp.add_point(1.5, 1.5);
        vp.add_point(2.0, 2.0);
        let (xs, ys) = vp.get_pixel_range((10, 10));
        assert!(xs.is_empty() && ys.is_empty());
    }
}
