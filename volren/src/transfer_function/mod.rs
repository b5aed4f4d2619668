//! Mapping of samples to color and opacity.
//!
//! [`TransferFunction`] is an immutable description edited by the user.
//! Raycasters never evaluate it directly, they sample the lookup
//! baked from it by the [`TransferFunctionEngine`].

mod engine;
mod image_based;
mod keys;
mod lookup;
mod pet;
mod primitives;
mod ramp;
mod record;

pub use engine::{TfSnapshot, TransferFunctionEngine};
pub use image_based::ImageBased;
pub use keys::{KeyedIntensity, MappingKey};
pub use lookup::{BakedLookup, LookupTable1D, LookupTable2D, LOOKUP_HEIGHT, LOOKUP_WIDTH};
pub use pet::{Pet, PetPreset};
pub use primitives::{Banana, IntensityGradient, Primitive, Quad};
pub use ramp::{Polarity, Ramp};
pub use record::{TransferFunctionRecord, RECORD_VERSION};

use crate::{color::RGBA, common::ValueRange, error::Result};

/// Input of a classification
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sample {
    Intensity(f32),
    /// Intensity and normalized gradient magnitude
    IntensityGradient(f32, f32),
}

impl Sample {
    pub fn intensity(&self) -> f32 {
        match *self {
            Sample::Intensity(i) => i,
            Sample::IntensityGradient(i, _) => i,
        }
    }

    pub fn gradient(&self) -> f32 {
        match *self {
            Sample::Intensity(_) => 0.0,
            Sample::IntensityGradient(_, g) => g,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransferFunction {
    KeyedIntensity(KeyedIntensity),
    Ramp(Ramp),
    IntensityGradient(IntensityGradient),
    ImageBased(ImageBased),
    Pet(Pet),
}

impl TransferFunction {
    pub fn classify(&self, sample: Sample) -> RGBA {
        let i = sample.intensity();
        match self {
            TransferFunction::KeyedIntensity(tf) => tf.classify(i),
            TransferFunction::Ramp(tf) => tf.classify(i),
            TransferFunction::IntensityGradient(tf) => tf.classify(i, sample.gradient()),
            TransferFunction::ImageBased(tf) => tf.classify(i),
            TransferFunction::Pet(tf) => tf.classify(i),
        }
    }

    /// Needs gradient magnitude of the samples
    pub fn is_2d(&self) -> bool {
        matches!(self, TransferFunction::IntensityGradient(_))
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            TransferFunction::KeyedIntensity(_) => "KeyedIntensity",
            TransferFunction::Ramp(_) => "Ramp",
            TransferFunction::IntensityGradient(_) => "IntensityGradient",
            TransferFunction::ImageBased(_) => "ImageBased",
            TransferFunction::Pet(_) => "Pet",
        }
    }

    /// Intensities the function is defined on
    pub fn domain(&self) -> ValueRange {
        match self {
            TransferFunction::KeyedIntensity(tf) => tf.domain().unwrap_or_else(ValueRange::unit),
            TransferFunction::Pet(tf) => tf.window,
            _ => ValueRange::unit(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            TransferFunction::KeyedIntensity(tf) => tf.validate(),
            TransferFunction::Ramp(tf) => tf.validate(),
            TransferFunction::IntensityGradient(tf) => tf.validate(),
            TransferFunction::ImageBased(tf) => tf.validate(),
            TransferFunction::Pet(tf) => tf.validate(),
        }
    }

    /// Evaluate into a lookup table, fails on invalid geometry
    pub fn bake(&self) -> Result<BakedLookup> {
        self.validate()?;
        let baked = if self.is_2d() {
            BakedLookup::IntensityGradient(LookupTable2D::bake(LOOKUP_WIDTH, LOOKUP_HEIGHT, |i, g| {
                self.classify(Sample::IntensityGradient(i, g))
            }))
        } else {
            BakedLookup::Intensity(LookupTable1D::bake(LOOKUP_WIDTH, |i| {
                self.classify(Sample::Intensity(i))
            }))
        };
        Ok(baked)
    }
}

impl Default for TransferFunction {
    fn default() -> Self {
        TransferFunction::KeyedIntensity(KeyedIntensity::standard())
    }
}

impl From<KeyedIntensity> for TransferFunction {
    fn from(tf: KeyedIntensity) -> Self {
        TransferFunction::KeyedIntensity(tf)
    }
}

impl From<Ramp> for TransferFunction {
    fn from(tf: Ramp) -> Self {
        TransferFunction::Ramp(tf)
    }
}

impl From<IntensityGradient> for TransferFunction {
    fn from(tf: IntensityGradient) -> Self {
        TransferFunction::IntensityGradient(tf)
    }
}

impl From<ImageBased> for TransferFunction {
    fn from(tf: ImageBased) -> Self {
        TransferFunction::ImageBased(tf)
    }
}

impl From<Pet> for TransferFunction {
    fn from(tf: Pet) -> Self {
        TransferFunction::Pet(tf)
    }
}
