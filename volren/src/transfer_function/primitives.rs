//! Two dimensional transfer function over (intensity, gradient magnitude).
//!
//! The function is a stack of colored primitives. Every primitive covers
//! part of the unit square, primitives added later are drawn on top.

use nalgebra::{Point2, Vector2};

use crate::{
    color::{self, RGBA},
    error::{Result, VolrenError},
};

/// Number of segments a banana curve is split into
const BANANA_STEPS: usize = 20;

/// Ray crossing test, `polygon` is closed implicitly
fn point_in_polygon(p: Point2<f32>, polygon: &[Point2<f32>]) -> bool {
    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let (a, b) = (polygon[i], polygon[j]);
        if (a.y > p.y) != (b.y > p.y) {
            let x = (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x;
            if p.x < x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

fn segment_distance(p: Point2<f32>, a: Point2<f32>, b: Point2<f32>) -> f32 {
    let ab = b - a;
    let len2 = ab.norm_squared();
    if len2 == 0.0 {
        return (p - a).norm();
    }
    let t = ((p - a).dot(&ab) / len2).clamp(0.0, 1.0);
    (p - (a + ab * t)).norm()
}

/// Weight of a sample at relative distance `s` from the primitive center.
/// Full weight up to `fuzziness`, linear falloff to 0 at the border.
fn falloff(s: f32, fuzziness: f32) -> f32 {
    if s <= fuzziness {
        1.0
    } else if s >= 1.0 {
        0.0
    } else {
        (1.0 - s) / (1.0 - fuzziness)
    }
}

fn check_common(tint: &RGBA, fuzziness: f32, points: &[Point2<f32>]) -> Result<()> {
    if !(fuzziness > 0.0 && fuzziness <= 1.0) {
        return Err(VolrenError::BakeFailed(format!(
            "fuzziness {fuzziness} out of (0, 1]"
        )));
    }
    if points.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
        return Err(VolrenError::BakeFailed("primitive is not finite".into()));
    }
    if !color::is_normalized(tint) {
        return Err(VolrenError::BakeFailed(format!(
            "primitive color {:?} is outside <0;1>",
            tint.as_slice()
        )));
    }
    Ok(())
}

/// Convex quadrilateral
#[derive(Debug, Clone, PartialEq)]
pub struct Quad {
    pub corners: [Point2<f32>; 4],
    pub color: RGBA,
    pub fuzziness: f32,
}

impl Quad {
    pub fn new(corners: [Point2<f32>; 4], color: RGBA) -> Quad {
        Quad {
            corners,
            color,
            fuzziness: 1.0,
        }
    }

    /// Axis aligned rectangle
    pub fn rect(low: Point2<f32>, high: Point2<f32>, color: RGBA) -> Quad {
        Quad::new(
            [
                low,
                Point2::new(high.x, low.y),
                high,
                Point2::new(low.x, high.y),
            ],
            color,
        )
    }

    pub fn with_fuzziness(mut self, fuzziness: f32) -> Quad {
        self.fuzziness = fuzziness;
        self
    }

    fn center(&self) -> Point2<f32> {
        let sum = self
            .corners
            .iter()
            .fold(Vector2::zeros(), |acc, c| acc + c.coords);
        Point2::from(sum / 4.0)
    }

    fn signed_area(&self) -> f32 {
        (0..4)
            .map(|i| {
                let (a, b) = (self.corners[i], self.corners[(i + 1) % 4]);
                a.x * b.y - b.x * a.y
            })
            .sum::<f32>()
            / 2.0
    }

    /// 0 at the center, 1 on the border, above 1 outside
    fn scaled_distance(&self, p: Point2<f32>) -> f32 {
        let center = self.center();
        let orientation = self.signed_area().signum();
        (0..4)
            .map(|i| {
                let (a, b) = (self.corners[i], self.corners[(i + 1) % 4]);
                let edge = b - a;
                let normal = Vector2::new(edge.y, -edge.x) * orientation;
                normal.dot(&(p - center)) / normal.dot(&(a - center))
            })
            .fold(f32::MIN, f32::max)
    }

    pub fn coverage(&self, p: Point2<f32>) -> f32 {
        falloff(self.scaled_distance(p), self.fuzziness)
    }

    pub fn validate(&self) -> Result<()> {
        check_common(&self.color, self.fuzziness, &self.corners)?;
        let area = self.signed_area();
        if area.abs() < 1e-8 {
            return Err(VolrenError::BakeFailed("quad has no area".into()));
        }
        let convex = (0..4).all(|i| {
            let a = self.corners[i];
            let b = self.corners[(i + 1) % 4];
            let c = self.corners[(i + 2) % 4];
            let cross = (b - a).perp(&(c - b));
            cross * area.signum() > 0.0
        });
        if !convex {
            return Err(VolrenError::BakeFailed("quad is not convex".into()));
        }
        Ok(())
    }
}

/// Region between two quadratic Bezier curves sharing their end points.
///
/// `b1` and `b2` are the points the curves pass through at their midpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct Banana {
    pub a: Point2<f32>,
    pub b1: Point2<f32>,
    pub b2: Point2<f32>,
    pub c: Point2<f32>,
    pub color: RGBA,
    pub fuzziness: f32,
}

impl Banana {
    pub fn new(
        a: Point2<f32>,
        b1: Point2<f32>,
        b2: Point2<f32>,
        c: Point2<f32>,
        color: RGBA,
    ) -> Banana {
        Banana {
            a,
            b1,
            b2,
            c,
            color,
            fuzziness: 1.0,
        }
    }

    pub fn with_fuzziness(mut self, fuzziness: f32) -> Banana {
        self.fuzziness = fuzziness;
        self
    }

    /// Bezier control point of the curve through `b`
    fn control(&self, b: Point2<f32>) -> Point2<f32> {
        Point2::from(b.coords * 2.0 - self.a.coords * 0.5 - self.c.coords * 0.5)
    }

    fn curve(&self, control: Point2<f32>, t: f32) -> Point2<f32> {
        let s = 1.0 - t;
        Point2::from(self.a.coords * (s * s) + control.coords * (2.0 * s * t) + self.c.coords * (t * t))
    }

    fn curves(&self) -> (Vec<Point2<f32>>, Vec<Point2<f32>>) {
        let (t1, t2) = (self.control(self.b1), self.control(self.b2));
        let steps = 0..=BANANA_STEPS;
        let param = |k: usize| k as f32 / BANANA_STEPS as f32;
        (
            steps.clone().map(|k| self.curve(t1, param(k))).collect(),
            steps.map(|k| self.curve(t2, param(k))).collect(),
        )
    }

    /// Relative distance from the middle curve, `None` outside
    fn scaled_distance(&self, p: Point2<f32>) -> Option<f32> {
        let (lower, upper) = self.curves();
        for k in 0..BANANA_STEPS {
            let strip = [lower[k], lower[k + 1], upper[k + 1], upper[k]];
            if point_in_polygon(p, &strip) {
                let d1 = segment_distance(p, lower[k], lower[k + 1]);
                let d2 = segment_distance(p, upper[k], upper[k + 1]);
                let total = d1 + d2;
                if total <= 0.0 {
                    return Some(0.0);
                }
                let u = d1 / total;
                return Some((2.0 * u - 1.0).abs());
            }
        }
        None
    }

    pub fn coverage(&self, p: Point2<f32>) -> f32 {
        self.scaled_distance(p)
            .map_or(0.0, |s| falloff(s, self.fuzziness))
    }

    pub fn validate(&self) -> Result<()> {
        check_common(&self.color, self.fuzziness, &[self.a, self.b1, self.b2, self.c])?;
        if (self.c - self.a).norm() < 1e-6 {
            return Err(VolrenError::BakeFailed("banana end points coincide".into()));
        }
        if (self.b2 - self.b1).norm() < 1e-6 {
            return Err(VolrenError::BakeFailed("banana has no width".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Quad(Quad),
    Banana(Banana),
}

impl Primitive {
    pub fn color(&self) -> RGBA {
        match self {
            Primitive::Quad(q) => q.color,
            Primitive::Banana(b) => b.color,
        }
    }

    pub fn set_color(&mut self, color: RGBA) {
        match self {
            Primitive::Quad(q) => q.color = color,
            Primitive::Banana(b) => b.color = color,
        }
    }

    pub fn coverage(&self, p: Point2<f32>) -> f32 {
        match self {
            Primitive::Quad(q) => q.coverage(p),
            Primitive::Banana(b) => b.coverage(p),
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Primitive::Quad(q) => q.validate(),
            Primitive::Banana(b) => b.validate(),
        }
    }
}

impl From<Quad> for Primitive {
    fn from(q: Quad) -> Self {
        Primitive::Quad(q)
    }
}

impl From<Banana> for Primitive {
    fn from(b: Banana) -> Self {
        Primitive::Banana(b)
    }
}

/// Stack of primitives, index 0 is the bottom
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IntensityGradient {
    primitives: Vec<Primitive>,
}

impl IntensityGradient {
    pub fn new() -> IntensityGradient {
        IntensityGradient::default()
    }

    pub fn from_primitives(primitives: Vec<Primitive>) -> IntensityGradient {
        IntensityGradient { primitives }
    }

    pub fn primitives(&self) -> &[Primitive] {
        &self.primitives
    }

    /// Put a primitive on top, returns its index
    pub fn add_primitive(&mut self, primitive: impl Into<Primitive>) -> usize {
        self.primitives.push(primitive.into());
        self.primitives.len() - 1
    }

    pub fn remove_primitive(&mut self, index: usize) -> Result<Primitive> {
        if index >= self.primitives.len() {
            return Err(VolrenError::NoSuchElement(index));
        }
        Ok(self.primitives.remove(index))
    }

    pub fn raise_to_top(&mut self, index: usize) -> Result<()> {
        let primitive = self.remove_primitive(index)?;
        self.primitives.push(primitive);
        Ok(())
    }

    pub fn lower_to_bottom(&mut self, index: usize) -> Result<()> {
        let primitive = self.remove_primitive(index)?;
        self.primitives.insert(0, primitive);
        Ok(())
    }

    pub fn get_mut(&mut self, index: usize) -> Result<&mut Primitive> {
        self.primitives
            .get_mut(index)
            .ok_or(VolrenError::NoSuchElement(index))
    }

    /// Index of the top-most primitive covering the point
    pub fn top_at(&self, intensity: f32, gradient: f32) -> Option<usize> {
        let p = Point2::new(intensity, gradient);
        self.primitives
            .iter()
            .rposition(|prim| prim.coverage(p) > 0.0)
    }

    pub fn clear(&mut self) {
        self.primitives.clear();
    }

    pub fn classify(&self, intensity: f32, gradient: f32) -> RGBA {
        let p = Point2::new(intensity, gradient);
        self.primitives.iter().fold(color::zero(), |dst, prim| {
            let coverage = prim.coverage(p);
            if coverage <= 0.0 {
                return dst;
            }
            let mut src = prim.color();
            src.w *= coverage;
            color::over(src, dst)
        })
    }

    pub fn validate(&self) -> Result<()> {
        self.primitives.iter().try_for_each(|p| p.validate())
    }
}
