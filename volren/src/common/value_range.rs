use std::ops::{Deref, Range};

use serde::{Deserialize, Serialize};

/// Represents a range of floating-point values.
/// Used for intensity windows, thresholds and transfer function domains.
#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize)]
pub struct ValueRange {
    /// Lower bound
    pub low: f32,
    /// Upper bound
    pub high: f32,
}

impl ValueRange {
    pub fn new(low: f32, high: f32) -> ValueRange {
        ValueRange { low, high }
    }

    /// The normalized range `<0;1>`
    pub fn unit() -> ValueRange {
        ValueRange::new(0.0, 1.0)
    }

    /// Constructs new, empty range.
    pub fn empty() -> ValueRange {
        ValueRange {
            low: f32::NAN,
            high: f32::NAN,
        }
    }

    /// Constructs new range with one element, `val`.
    pub fn seed(val: f32) -> ValueRange {
        ValueRange {
            low: val,
            high: val,
        }
    }

    /// Constructs minimal range, where all samples from an iterator
    /// are inside the range.
    pub fn from_samples<T, I>(iter: impl IntoIterator<Item = T>) -> ValueRange
    where
        T: Deref<Target = I>,
        I: Into<f32> + Copy,
    {
        let mut range = ValueRange::empty();
        for val in iter {
            range.extend((*val).into());
        }
        range
    }

    pub fn is_empty(&self) -> bool {
        self.low.is_nan() || self.high.is_nan()
    }

    /// Extend the range with new value.
    pub fn extend(&mut self, val: f32) {
        if self.is_empty() {
            self.low = val;
            self.high = val;
        }

        if val > self.high {
            self.high = val;
        }

        if val < self.low {
            self.low = val;
        }
    }

    pub fn len(&self) -> f32 {
        self.high - self.low
    }

    /// Check if value is inside the range.
    pub fn contains(&self, val: f32) -> bool {
        self.low <= val && val <= self.high
    }

    /// Maps `val` to `<0;1>` relative to the range, not clamped.
    /// Degenerate ranges map everything to zero.
    pub fn normalize(&self, val: f32) -> f32 {
        let len = self.len();
        if len > 0.0 {
            (val - self.low) / len
        } else {
            0.0
        }
    }

    /// Inverse of [`ValueRange::normalize`]
    pub fn denormalize(&self, t: f32) -> f32 {
        self.low + t * self.len()
    }

    pub fn clamp(&self, val: f32) -> f32 {
        val.clamp(self.low, self.high)
    }

    /// Check if two `ValueRange`s have common items.
    /// Touching intervals intersect.
    pub fn intersects(&self, other: &ValueRange) -> bool {
        !self.is_empty() && !other.is_empty() && self.low <= other.high && other.low <= self.high
    }
}

impl Default for ValueRange {
    fn default() -> Self {
        Self::empty()
    }
}

/// Conversion from standard library type.
/// Unlocks simple syntax:
/// ```
/// # use volren::common::ValueRange;
/// let range: ValueRange = (0.0..45.5).into();
/// ```
impl From<Range<f32>> for ValueRange {
    fn from(range: Range<f32>) -> Self {
        ValueRange {
            low: range.start,
            high: range.end,
        }
    }
}

#[cfg(test)]
mod test {

    use super::*;

    #[test]
    fn value_range() {
        let values = [0.0, 5.0, 3.0, -2.5];

        let mut range = ValueRange::seed(1.0);

        assert!(range.contains(1.0));
        assert!(!range.contains(1.2));

        for val in values {
            range.extend(val);
        }

        assert_eq!(range.low, -2.5);
        assert_eq!(range.high, 5.0);
        assert!(range.contains(4.2));
        assert!(!range.contains(-12.5));
    }

    #[test]
    fn empty_value_range() {
        let mut range = ValueRange::empty();

        assert!(!range.contains(2.0));
        assert!(range.is_empty());

        range.extend(2.0);

        assert!(range.contains(2.0));
        assert_eq!(range.low, 2.0);
        assert_eq!(range.high, 2.0);
    }

    #[test]
    fn ranges_intersect() {
        let empty = ValueRange::empty();
        let r_low = ValueRange::from_samples(&[1u8, 6]);
        let r_mid = ValueRange::from_samples(&[3u8, 8]);
        let r_hi = ValueRange::from_samples(&[10u8, 30]);
        let single = ValueRange::from_samples(&[6u8]);

        assert!(!empty.intersects(&r_low));
        assert!(r_low.intersects(&r_mid));
        assert!(!r_low.intersects(&r_hi));
        assert!(r_low.intersects(&single));
        assert!(r_mid.intersects(&single));
    }

    #[test]
    fn normalize_roundtrip() {
        let range = ValueRange::new(100.0, 300.0);
        assert_eq!(range.normalize(200.0), 0.5);
        assert_eq!(range.denormalize(0.25), 150.0);
        assert_eq!(ValueRange::seed(3.0).normalize(7.0), 0.0);
    }
}
