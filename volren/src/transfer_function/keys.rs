use crate::{
    color::{self, RGBA},
    common::ValueRange,
    error::{Result, VolrenError},
};

/// Control point of a keyed transfer function.
///
/// A split key has different colors on its left and right side,
/// which makes the function discontinuous at the key.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MappingKey {
    pub intensity: f32,
    pub color_l: RGBA,
    pub color_r: RGBA,
    pub split: bool,
}

impl MappingKey {
    pub fn new(intensity: f32, color: RGBA) -> MappingKey {
        MappingKey {
            intensity,
            color_l: color,
            color_r: color,
            split: false,
        }
    }

    pub fn split(intensity: f32, color_l: RGBA, color_r: RGBA) -> MappingKey {
        MappingKey {
            intensity,
            color_l,
            color_r,
            split: true,
        }
    }
}

fn check_color(tint: &RGBA) -> Result<()> {
    if color::is_normalized(tint) {
        Ok(())
    } else {
        Err(VolrenError::BakeFailed(format!(
            "color {:?} is outside <0;1>",
            tint.as_slice()
        )))
    }
}

/// Exact at both ends and on flat segments
pub(crate) fn lerp(a: RGBA, b: RGBA, t: f32) -> RGBA {
    if a == b {
        return a;
    }
    a * (1.0 - t) + b * t
}

/// Piecewise linear mapping of intensity to color.
/// Keys are kept sorted by intensity, no two keys share an intensity.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct KeyedIntensity {
    keys: Vec<MappingKey>,
}

impl KeyedIntensity {
    /// Function without keys, transparent everywhere
    pub fn new() -> KeyedIntensity {
        KeyedIntensity { keys: Vec::new() }
    }

    /// Transparent black at 0 to opaque white at 1
    pub fn standard() -> KeyedIntensity {
        KeyedIntensity {
            keys: vec![
                MappingKey::new(0.0, color::zero()),
                MappingKey::new(1.0, color::mono(1.0, 1.0)),
            ],
        }
    }

    /// Grayscale ramp with the same opacity everywhere
    pub fn constant_alpha(alpha: f32) -> KeyedIntensity {
        let alpha = alpha.clamp(0.0, 1.0);
        KeyedIntensity {
            keys: vec![
                MappingKey::new(0.0, color::mono(0.0, alpha)),
                MappingKey::new(1.0, color::mono(1.0, alpha)),
            ],
        }
    }

    /// Build from keys in any order, fails on duplicates
    pub fn from_keys(keys: impl IntoIterator<Item = MappingKey>) -> Result<KeyedIntensity> {
        let mut tf = KeyedIntensity::new();
        for key in keys {
            tf.add_key(key)?;
        }
        Ok(tf)
    }

    pub fn keys(&self) -> &[MappingKey] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Intensities covered by the keys
    pub fn domain(&self) -> Option<ValueRange> {
        let first = self.keys.first()?;
        let last = self.keys.last()?;
        Some(ValueRange::new(first.intensity, last.intensity))
    }

    fn position_of(&self, intensity: f32) -> std::result::Result<usize, usize> {
        self.keys
            .binary_search_by(|k| k.intensity.total_cmp(&intensity))
    }

    /// Insert key at its sorted position, returns the index
    pub fn add_key(&mut self, key: MappingKey) -> Result<usize> {
        if !key.intensity.is_finite() {
            return Err(VolrenError::BakeFailed(format!(
                "key intensity {} is not finite",
                key.intensity
            )));
        }
        check_color(&key.color_l)?;
        check_color(&key.color_r)?;
        match self.position_of(key.intensity) {
            Ok(_) => Err(VolrenError::DuplicateKey(key.intensity)),
            Err(index) => {
                self.keys.insert(index, key);
                Ok(index)
            }
        }
    }

    pub fn remove_key(&mut self, index: usize) -> Result<MappingKey> {
        if index >= self.keys.len() {
            return Err(VolrenError::NoSuchElement(index));
        }
        Ok(self.keys.remove(index))
    }

    /// Change intensity of a key, the key may change its index.
    /// Fails without change when another key sits at `intensity`.
    pub fn move_key(&mut self, index: usize, intensity: f32) -> Result<usize> {
        let mut key = *self.keys.get(index).ok_or(VolrenError::NoSuchElement(index))?;
        if self
            .keys
            .iter()
            .enumerate()
            .any(|(i, k)| i != index && k.intensity == intensity)
        {
            return Err(VolrenError::DuplicateKey(intensity));
        }
        self.keys.remove(index);
        key.intensity = intensity;
        self.add_key(key)
    }

    /// Recolor a key, both sides unless split
    pub fn set_key_color(&mut self, index: usize, color: RGBA) -> Result<()> {
        check_color(&color)?;
        let key = self
            .keys
            .get_mut(index)
            .ok_or(VolrenError::NoSuchElement(index))?;
        key.color_l = color;
        if !key.split {
            key.color_r = color;
        }
        Ok(())
    }

    /// Make a key discontinuous with `right` color on its right side
    pub fn split_key(&mut self, index: usize, right: RGBA) -> Result<()> {
        check_color(&right)?;
        let key = self
            .keys
            .get_mut(index)
            .ok_or(VolrenError::NoSuchElement(index))?;
        key.split = true;
        key.color_r = right;
        Ok(())
    }

    /// Join both sides of a key using its left color
    pub fn unsplit_key(&mut self, index: usize) -> Result<()> {
        let key = self
            .keys
            .get_mut(index)
            .ok_or(VolrenError::NoSuchElement(index))?;
        key.split = false;
        key.color_r = key.color_l;
        Ok(())
    }

    pub fn clear(&mut self) {
        self.keys.clear();
    }

    pub fn classify(&self, intensity: f32) -> RGBA {
        if self.keys.is_empty() {
            return color::zero();
        }

        // first key at or right of the intensity
        let right = self.keys.partition_point(|k| k.intensity < intensity);

        if right == 0 {
            return self.keys[0].color_l;
        }
        if right == self.keys.len() {
            return self.keys[right - 1].color_r;
        }

        let left_key = &self.keys[right - 1];
        let right_key = &self.keys[right];
        let fraction =
            (intensity - left_key.intensity) / (right_key.intensity - left_key.intensity);
        lerp(left_key.color_r, right_key.color_l, fraction)
    }

    /// Whether opacity changes anywhere, a function with constant
    /// opacity needs no classification pass
    pub fn is_significant(&self) -> bool {
        let first = match self.keys.first() {
            Some(k) => k.color_l.w,
            None => return false,
        };
        let epsilon = 1.0 / 255.0;
        self.keys
            .iter()
            .any(|k| (k.color_l.w - first).abs() > epsilon || (k.color_r.w - first).abs() > epsilon)
    }

    pub fn validate(&self) -> Result<()> {
        for pair in self.keys.windows(2) {
            if !(pair[0].intensity < pair[1].intensity) {
                return Err(VolrenError::BakeFailed(format!(
                    "keys at {} and {} are not ordered",
                    pair[0].intensity, pair[1].intensity
                )));
            }
        }
        for key in &self.keys {
            if !key.intensity.is_finite() {
                return Err(VolrenError::BakeFailed("key is not finite".into()));
            }
            check_color(&key.color_l)?;
            check_color(&key.color_r)?;
        }
        Ok(())
    }
}
