//! Baked lookup tables sampled by the raycasters.
//!
//! Texel `k` of a table of width `w` holds the color of intensity
//! `k / (w - 1)`, values in between are interpolated linearly.

use crate::{
    color::{self, RGBA},
    common::ValueRange,
};

use super::{keys::lerp, Sample};

pub const LOOKUP_WIDTH: usize = 256;
pub const LOOKUP_HEIGHT: usize = 128;

/// Continuous texel coordinate of `t` in <0;1>
fn texel_coord(t: f32, size: usize) -> (usize, usize, f32) {
    let max = (size - 1) as f32;
    let x = t.clamp(0.0, 1.0) * max;
    let low = (x.floor() as usize).min(size - 1);
    let high = (low + 1).min(size - 1);
    (low, high, x - low as f32)
}

#[derive(Debug, Clone, PartialEq)]
pub struct LookupTable1D {
    texels: Vec<RGBA>,
}

impl LookupTable1D {
    pub fn bake(width: usize, f: impl Fn(f32) -> RGBA) -> LookupTable1D {
        let width = width.max(2);
        let max = (width - 1) as f32;
        let texels = (0..width).map(|k| color::clamp(f(k as f32 / max))).collect();
        LookupTable1D { texels }
    }

    pub fn width(&self) -> usize {
        self.texels.len()
    }

    pub fn texels(&self) -> &[RGBA] {
        &self.texels
    }

    pub fn sample(&self, intensity: f32) -> RGBA {
        let (low, high, frac) = texel_coord(intensity, self.texels.len());
        lerp(self.texels[low], self.texels[high], frac)
    }

    /// Average color of the texels inside `segment`
    pub fn mean(&self, segment: ValueRange) -> RGBA {
        if segment.is_empty() {
            return color::zero();
        }
        let max = (self.texels.len() - 1) as f32;
        let from = (segment.low.clamp(0.0, 1.0) * max).round() as usize;
        let to = (segment.high.clamp(0.0, 1.0) * max).round() as usize;
        if from > to {
            return color::zero();
        }
        let texels = &self.texels[from..=to];
        texels.iter().sum::<RGBA>() / texels.len() as f32
    }

    /// Smallest intensity range holding all non transparent texels
    pub fn visible_range(&self) -> ValueRange {
        let max = (self.texels.len() - 1) as f32;
        let mut range = ValueRange::empty();
        for (k, texel) in self.texels.iter().enumerate() {
            if texel.w > 0.0 {
                range.extend(k as f32 / max);
            }
        }
        range
    }
}

/// Table over intensity (x) and normalized gradient magnitude (y)
#[derive(Debug, Clone, PartialEq)]
pub struct LookupTable2D {
    width: usize,
    height: usize,
    texels: Vec<RGBA>,
}

impl LookupTable2D {
    pub fn bake(width: usize, height: usize, f: impl Fn(f32, f32) -> RGBA) -> LookupTable2D {
        let (width, height) = (width.max(2), height.max(2));
        let (max_x, max_y) = ((width - 1) as f32, (height - 1) as f32);
        let mut texels = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                texels.push(color::clamp(f(x as f32 / max_x, y as f32 / max_y)));
            }
        }
        LookupTable2D {
            width,
            height,
            texels,
        }
    }

    pub fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    fn texel(&self, x: usize, y: usize) -> RGBA {
        self.texels[x + y * self.width]
    }

    pub fn sample(&self, intensity: f32, gradient: f32) -> RGBA {
        let (x0, x1, fx) = texel_coord(intensity, self.width);
        let (y0, y1, fy) = texel_coord(gradient, self.height);
        let bottom = lerp(self.texel(x0, y0), self.texel(x1, y0), fx);
        let top = lerp(self.texel(x0, y1), self.texel(x1, y1), fx);
        lerp(bottom, top, fy)
    }
}

/// Transfer function baked for sampling
#[derive(Debug, Clone, PartialEq)]
pub enum BakedLookup {
    Intensity(LookupTable1D),
    IntensityGradient(LookupTable2D),
}

impl BakedLookup {
    pub fn is_2d(&self) -> bool {
        matches!(self, BakedLookup::IntensityGradient(_))
    }

    /// 1-D tables ignore the gradient, 2-D tables read a missing gradient as 0
    pub fn classify(&self, sample: Sample) -> RGBA {
        match (self, sample) {
            (BakedLookup::Intensity(t), s) => t.sample(s.intensity()),
            (BakedLookup::IntensityGradient(t), Sample::Intensity(i)) => t.sample(i, 0.0),
            (BakedLookup::IntensityGradient(t), Sample::IntensityGradient(i, g)) => t.sample(i, g),
        }
    }
}
