use log::debug;
use nom::{
    character::complete::{digit1, multispace0, space0, space1},
    combinator::{all_consuming, map, map_res},
    multi::many1,
    sequence::{preceded, terminated, tuple},
    IResult,
};

use crate::{
    color::{self, RGBA},
    error::{Result, VolrenError},
};

use super::keys::{KeyedIntensity, MappingKey};

/// Slope change below this is not worth a key
const SLOPE_EPSILON: f32 = 1.0 / 512.0;

/// Color per intensity bucket, read from a lookup image
#[derive(Debug, Clone, PartialEq)]
pub struct ImageBased {
    table: Vec<RGBA>,
}

fn channel(input: &str) -> IResult<&str, u8> {
    map_res(digit1, str::parse)(input)
}

// "r g b a" on one line
fn texel(input: &str) -> IResult<&str, RGBA> {
    map(
        tuple((
            preceded(space0, channel),
            preceded(space1, channel),
            preceded(space1, channel),
            preceded(space1, channel),
        )),
        |(r, g, b, a)| color::from_bytes(r, g, b, a),
    )(input)
}

fn table(input: &str) -> IResult<&str, Vec<RGBA>> {
    preceded(multispace0, many1(terminated(texel, multispace0)))(input)
}

impl ImageBased {
    pub fn from_table(table: Vec<RGBA>) -> Result<ImageBased> {
        let tf = ImageBased { table };
        tf.validate()?;
        Ok(tf)
    }

    pub fn validate(&self) -> Result<()> {
        if self.table.is_empty() {
            return Err(VolrenError::Parse("empty lookup table".into()));
        }
        match self.table.iter().position(|c| !color::is_normalized(c)) {
            Some(bucket) => Err(VolrenError::BakeFailed(format!(
                "lookup bucket {bucket} is outside <0;1>"
            ))),
            None => Ok(()),
        }
    }

    /// Parse the plain text `.table` format,
    /// one `r g b a` line of integers in 0..=255 per bucket
    pub fn parse(input: &str) -> Result<ImageBased> {
        let (_, table) = all_consuming(table)(input)
            .map_err(|e| VolrenError::Parse(format!("lookup table: {e}")))?;
        debug!("Parsed lookup table with {} buckets", table.len());
        ImageBased::from_table(table)
    }

    pub fn table(&self) -> &[RGBA] {
        &self.table
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn classify(&self, intensity: f32) -> RGBA {
        let buckets = self.table.len();
        let index = (intensity.clamp(0.0, 1.0) * buckets as f32) as usize;
        self.table[index.min(buckets - 1)]
    }

    /// Keyed function with a key wherever the slope of the table changes
    pub fn to_keyed(&self) -> Result<KeyedIntensity> {
        let n = self.table.len();
        if n == 1 {
            return Ok(KeyedIntensity::from_keys([
                MappingKey::new(0.0, self.table[0]),
                MappingKey::new(1.0, self.table[0]),
            ])?);
        }
        let position = |k: usize| k as f32 / (n - 1) as f32;

        let mut keys = vec![MappingKey::new(0.0, self.table[0])];
        for k in 1..n - 1 {
            let before = self.table[k] - self.table[k - 1];
            let after = self.table[k + 1] - self.table[k];
            if (after - before).amax() > SLOPE_EPSILON {
                keys.push(MappingKey::new(position(k), self.table[k]));
            }
        }
        keys.push(MappingKey::new(1.0, self.table[n - 1]));

        KeyedIntensity::from_keys(keys)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn ramp_table() -> String {
        (0..256).map(|v| format!("{v} {v} {v} {v}\n")).collect()
    }

    #[test]
    fn parse_full_table() {
        let tf = ImageBased::parse(&ramp_table()).unwrap();
        assert_eq!(tf.len(), 256);
        assert_eq!(tf.classify(0.0), color::zero());
        assert_eq!(tf.classify(1.0), color::mono(1.0, 1.0));
    }

    #[test]
    fn parse_tolerates_spacing() {
        let tf = ImageBased::parse("  255 0 0 255\r\n\n0   255 0 128\n").unwrap();
        assert_eq!(tf.len(), 2);
        assert_eq!(tf.classify(0.2), color::new(1.0, 0.0, 0.0, 1.0));
        assert_eq!(tf.classify(0.7).y, 1.0);
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(matches!(
            ImageBased::parse("255 0 0\n"),
            Err(VolrenError::Parse(_))
        ));
        assert!(ImageBased::parse("256 0 0 0").is_err());
        assert!(ImageBased::parse("").is_err());
    }

    #[test]
    fn table_outside_unit_range_is_rejected() {
        let table = vec![color::zero(), color::new(1.0, 1.2, 0.0, 1.0)];
        assert!(matches!(
            ImageBased::from_table(table),
            Err(VolrenError::BakeFailed(_))
        ));
        assert!(ImageBased::from_table(Vec::new()).is_err());
    }

    #[test]
    fn linear_table_needs_two_keys() {
        let tf = ImageBased::parse(&ramp_table()).unwrap();
        let keyed = tf.to_keyed().unwrap();
        assert_eq!(keyed.len(), 2);
        assert!((keyed.classify(0.5).w - 0.5).abs() < 1e-5);
    }

    #[test]
    fn step_table_keeps_corners() {
        let text: String = (0..256)
            .map(|v| if v < 128 { "0 0 0 0\n" } else { "255 255 255 255\n" })
            .collect();
        let keyed = ImageBased::parse(&text).unwrap().to_keyed().unwrap();
        assert_eq!(keyed.len(), 4);
        assert_eq!(keyed.classify(0.2), color::zero());
        assert_eq!(keyed.classify(0.8), color::mono(1.0, 1.0));
    }
}
