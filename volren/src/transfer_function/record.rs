//! Self describing JSON form of transfer functions.

use std::{fs, path::Path};

use log::info;
use nalgebra::{Point2, Vector3};
use serde::{Deserialize, Serialize};

use crate::{
    color::RGBA,
    common::ValueRange,
    error::{Result, VolrenError},
};

use super::{
    Banana, ImageBased, IntensityGradient, KeyedIntensity, MappingKey, Pet, PetPreset, Polarity,
    Primitive, Quad, Ramp, TransferFunction,
};

pub const RECORD_VERSION: u32 = 1;

type Color = [f32; 4];
type Coord = [f32; 2];

fn color_of(c: &RGBA) -> Color {
    [c.x, c.y, c.z, c.w]
}

fn rgba(c: Color) -> RGBA {
    RGBA::new(c[0], c[1], c[2], c[3])
}

fn coord_of(p: &Point2<f32>) -> Coord {
    [p.x, p.y]
}

fn point(c: Coord) -> Point2<f32> {
    Point2::new(c[0], c[1])
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyRecord {
    pub intensity: f32,
    pub color_l: Color,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_r: Option<Color>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape")]
pub enum PrimitiveRecord {
    Quad {
        corners: [Coord; 4],
        color: Color,
        fuzziness: f32,
    },
    Banana {
        a: Coord,
        b1: Coord,
        b2: Coord,
        c: Coord,
        color: Color,
        fuzziness: f32,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum FunctionRecord {
    KeyedIntensity {
        keys: Vec<KeyRecord>,
    },
    Ramp {
        center: f32,
        width: f32,
        polarity: Polarity,
        color: [f32; 3],
    },
    IntensityGradient {
        /// Bottom first
        primitives: Vec<PrimitiveRecord>,
    },
    ImageBased {
        table: Vec<Color>,
    },
    Pet {
        preset: PetPreset,
    },
}

/// Serialized transfer function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferFunctionRecord {
    pub version: u32,
    pub domain: ValueRange,
    #[serde(flatten)]
    pub function: FunctionRecord,
}

impl From<&TransferFunction> for TransferFunctionRecord {
    fn from(tf: &TransferFunction) -> Self {
        let function = match tf {
            TransferFunction::KeyedIntensity(tf) => FunctionRecord::KeyedIntensity {
                keys: tf
                    .keys()
                    .iter()
                    .map(|k| KeyRecord {
                        intensity: k.intensity,
                        color_l: color_of(&k.color_l),
                        color_r: k.split.then(|| color_of(&k.color_r)),
                    })
                    .collect(),
            },
            TransferFunction::Ramp(r) => FunctionRecord::Ramp {
                center: r.center,
                width: r.width,
                polarity: r.polarity,
                color: [r.color.x, r.color.y, r.color.z],
            },
            TransferFunction::IntensityGradient(ig) => FunctionRecord::IntensityGradient {
                primitives: ig
                    .primitives()
                    .iter()
                    .map(|p| match p {
                        Primitive::Quad(q) => PrimitiveRecord::Quad {
                            corners: q.corners.map(|c| coord_of(&c)),
                            color: color_of(&q.color),
                            fuzziness: q.fuzziness,
                        },
                        Primitive::Banana(b) => PrimitiveRecord::Banana {
                            a: coord_of(&b.a),
                            b1: coord_of(&b.b1),
                            b2: coord_of(&b.b2),
                            c: coord_of(&b.c),
                            color: color_of(&b.color),
                            fuzziness: b.fuzziness,
                        },
                    })
                    .collect(),
            },
            TransferFunction::ImageBased(ib) => FunctionRecord::ImageBased {
                table: ib.table().iter().map(color_of).collect(),
            },
            TransferFunction::Pet(p) => FunctionRecord::Pet { preset: p.preset },
        };
        TransferFunctionRecord {
            version: RECORD_VERSION,
            domain: tf.domain(),
            function,
        }
    }
}

impl TryFrom<TransferFunctionRecord> for TransferFunction {
    type Error = VolrenError;

    fn try_from(record: TransferFunctionRecord) -> Result<Self> {
        if record.version > RECORD_VERSION {
            return Err(VolrenError::Parse(format!(
                "record version {} is newer than supported {RECORD_VERSION}",
                record.version
            )));
        }
        let tf = match record.function {
            FunctionRecord::KeyedIntensity { keys } => {
                let keys = keys.into_iter().map(|k| match k.color_r {
                    Some(right) => MappingKey::split(k.intensity, rgba(k.color_l), rgba(right)),
                    None => MappingKey::new(k.intensity, rgba(k.color_l)),
                });
                TransferFunction::KeyedIntensity(KeyedIntensity::from_keys(keys)?)
            }
            FunctionRecord::Ramp {
                center,
                width,
                polarity,
                color,
            } => TransferFunction::Ramp(
                Ramp::new(center, width, polarity).with_color(Vector3::from(color)),
            ),
            FunctionRecord::IntensityGradient { primitives } => {
                let primitives = primitives
                    .into_iter()
                    .map(|p| match p {
                        PrimitiveRecord::Quad {
                            corners,
                            color,
                            fuzziness,
                        } => Quad::new(corners.map(point), rgba(color))
                            .with_fuzziness(fuzziness)
                            .into(),
                        PrimitiveRecord::Banana {
                            a,
                            b1,
                            b2,
                            c,
                            color,
                            fuzziness,
                        } => Banana::new(point(a), point(b1), point(b2), point(c), rgba(color))
                            .with_fuzziness(fuzziness)
                            .into(),
                    })
                    .collect();
                TransferFunction::IntensityGradient(IntensityGradient::from_primitives(primitives))
            }
            FunctionRecord::ImageBased { table } => {
                TransferFunction::ImageBased(ImageBased::from_table(table.into_iter().map(rgba).collect())?)
            }
            FunctionRecord::Pet { preset } => {
                TransferFunction::Pet(Pet::new(preset).with_window(record.domain))
            }
        };
        tf.validate()?;
        Ok(tf)
    }
}

impl TransferFunction {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&TransferFunctionRecord::from(self))?)
    }

    pub fn from_json(json: &str) -> Result<TransferFunction> {
        let record: TransferFunctionRecord = serde_json::from_str(json)?;
        TransferFunction::try_from(record)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path.as_ref(), self.to_json()?)?;
        info!("Saved {} transfer function to {:?}", self.kind_name(), path.as_ref());
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<TransferFunction> {
        let json = fs::read_to_string(path.as_ref())?;
        let tf = TransferFunction::from_json(&json)?;
        info!("Loaded {} transfer function from {:?}", tf.kind_name(), path.as_ref());
        Ok(tf)
    }
}

#[cfg(test)]
mod test {
    use nalgebra::point;

    use super::*;
    use crate::{color, transfer_function::Sample};

    fn round_trip(tf: &TransferFunction) -> TransferFunction {
        TransferFunction::from_json(&tf.to_json().unwrap()).unwrap()
    }

    #[test]
    fn keyed_is_exact_at_keys() {
        let mut keyed = KeyedIntensity::from_keys([
            MappingKey::new(0.1, color::new(0.3, 0.1, 0.7, 0.0)),
            MappingKey::new(0.35, color::new(0.9, 0.2, 0.1, 0.33)),
            MappingKey::new(0.8, color::new(1.0, 1.0, 1.0, 0.9)),
        ])
        .unwrap();
        keyed.split_key(1, color::new(0.0, 0.5, 0.5, 0.6)).unwrap();
        let tf = TransferFunction::from(keyed.clone());
        let loaded = round_trip(&tf);
        assert_eq!(loaded, tf);
        for key in keyed.keys() {
            let s = Sample::Intensity(key.intensity);
            assert_eq!(loaded.classify(s), tf.classify(s));
        }
    }

    #[test]
    fn primitives_keep_order() {
        let mut ig = IntensityGradient::new();
        ig.add_primitive(Quad::rect(point![0.1, 0.1], point![0.6, 0.5], color::new(1.0, 0.0, 0.0, 0.7)));
        ig.add_primitive(
            Banana::new(point![0.2, 0.0], point![0.5, 0.2], point![0.5, 0.6], point![0.9, 0.0], color::new(0.0, 1.0, 0.0, 0.4))
                .with_fuzziness(0.3),
        );
        let tf = TransferFunction::from(ig);
        let loaded = round_trip(&tf);
        assert_eq!(loaded, tf);
        let s = Sample::IntensityGradient(0.45, 0.3);
        assert!((loaded.classify(s) - tf.classify(s)).amax() < 1e-5);
    }

    #[test]
    fn record_names_its_kind() {
        let json = TransferFunction::default().to_json().unwrap();
        assert!(json.contains("\"kind\": \"KeyedIntensity\""));
        assert!(json.contains("\"version\": 1"));
        assert!(json.contains("\"domain\""));
    }

    #[test]
    fn pet_window_is_domain() {
        let tf = TransferFunction::from(Pet::new(PetPreset::Rainbow).with_window(ValueRange::new(0.25, 0.5)));
        assert_eq!(round_trip(&tf), tf);
    }

    #[test]
    fn duplicate_keys_fail_to_load() {
        let json = r#"{"version":1,"domain":{"low":0.0,"high":1.0},"kind":"KeyedIntensity",
            "keys":[{"intensity":0.5,"color_l":[1,0,0,1]},{"intensity":0.5,"color_l":[0,1,0,1]}]}"#;
        assert!(matches!(
            TransferFunction::from_json(json),
            Err(VolrenError::DuplicateKey(_))
        ));
    }

    #[test]
    fn future_version_is_rejected() {
        let json = r#"{"version":7,"domain":{"low":0.0,"high":1.0},"kind":"Pet","preset":"HotIron"}"#;
        assert!(matches!(TransferFunction::from_json(json), Err(VolrenError::Parse(_))));
    }
}
