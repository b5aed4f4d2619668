use nalgebra::{vector, Vector3};

use crate::color::{self, RGBA};

/// Front to back accumulation of classified samples along one ray.
///
/// Color is kept premultiplied, opacity never decreases.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayAccumulator {
    color: Vector3<f32>,
    opacity: f32,
}

impl Default for RayAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl RayAccumulator {
    pub fn new() -> RayAccumulator {
        RayAccumulator {
            color: vector![0.0, 0.0, 0.0],
            opacity: 0.0,
        }
    }

    /// Add a straight alpha sample taken with `step_ratio` times the reference step
    pub fn accumulate(&mut self, sample: RGBA, step_ratio: f32) {
        let alpha = opacity_correction(sample.w.clamp(0.0, 1.0), step_ratio);
        if alpha <= 0.0 {
            return;
        }
        let weight = (1.0 - self.opacity) * alpha;
        self.color += weight * sample.xyz();
        self.opacity += weight;
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    pub fn color(&self) -> Vector3<f32> {
        self.color
    }

    /// Early ray termination test
    pub fn is_saturated(&self, threshold: f32) -> bool {
        self.opacity >= threshold
    }

    /// Result over the background, alpha is the accumulated opacity
    pub fn finish(&self, background: Vector3<f32>) -> RGBA {
        color::from_rgb(self.color + (1.0 - self.opacity) * background, self.opacity)
    }
}

/// Opacity of a sample taken with a step `step_ratio` times the reference step
pub fn opacity_correction(alpha: f32, step_ratio: f32) -> f32 {
    if alpha >= 1.0 || step_ratio == 1.0 {
        return alpha;
    }
    1.0 - (1.0 - alpha).powf(step_ratio)
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn opaque_sample_saturates() {
        let mut acc = RayAccumulator::new();
        acc.accumulate(color::new(1.0, 0.0, 0.0, 1.0), 0.1);
        assert_eq!(acc.opacity(), 1.0);
        assert_eq!(acc.finish(vector![0.0, 0.0, 1.0]), color::new(1.0, 0.0, 0.0, 1.0));
    }

    #[test]
    fn empty_ray_is_background() {
        let acc = RayAccumulator::new();
        assert_eq!(acc.finish(vector![0.2, 0.3, 0.4]), color::new(0.2, 0.3, 0.4, 0.0));
    }

    #[test]
    fn correction_matches_two_half_steps() {
        let alpha = 0.4;
        let mut full = RayAccumulator::new();
        full.accumulate(color::mono(1.0, alpha), 1.0);
        let mut halves = RayAccumulator::new();
        halves.accumulate(color::mono(1.0, alpha), 0.5);
        halves.accumulate(color::mono(1.0, alpha), 0.5);
        assert!((full.opacity() - halves.opacity()).abs() < 1e-6);
    }

    #[test]
    fn early_termination_matches_full_traversal() {
        let samples = [0.5, 0.7, 0.9, 0.0, 0.0, 0.0];
        let threshold = 0.95;
        let mut stopped = RayAccumulator::new();
        for &a in samples.iter() {
            stopped.accumulate(color::new(0.2, 0.6, 1.0, a), 1.0);
            if stopped.is_saturated(threshold) {
                break;
            }
        }
        assert!(stopped.is_saturated(threshold));
        let mut full = RayAccumulator::new();
        for &a in samples.iter() {
            full.accumulate(color::new(0.2, 0.6, 1.0, a), 1.0);
        }
        let bg = vector![0.0, 0.0, 0.0];
        assert!((stopped.finish(bg) - full.finish(bg)).amax() < 1e-6);
    }

    proptest! {
        #[test]
        fn opacity_never_decreases(alphas in proptest::collection::vec(0.0f32..=1.0, 1..64), ratio in 0.05f32..4.0) {
            let mut acc = RayAccumulator::new();
            let mut last = 0.0;
            for a in alphas {
                acc.accumulate(color::mono(0.5, a), ratio);
                prop_assert!(acc.opacity() >= last);
                prop_assert!(acc.opacity() <= 1.0 + 1e-6);
                last = acc.opacity();
            }
        }
    }
}
