//! Merging of several volumes into one time-varying, multi-modal set.
//!
//! Every volume is addressed by its (modality, timestep) pair.
//! The mapping is validated before anything is stored.

use std::{collections::BTreeMap, sync::Arc};

use log::info;

use crate::error::MappingError;

use super::LinearVolume;

/// Checks a list of (modality, timestep) pairs.
///
/// A pair may appear only once, and the timesteps of every modality
/// must start at zero and be contiguous.
pub fn validate_mapping<'a>(
    entries: impl IntoIterator<Item = (&'a str, u32)>,
) -> Result<(), MappingError> {
    let mut per_modality: BTreeMap<&str, Vec<u32>> = BTreeMap::new();

    for (modality, timestep) in entries {
        let steps = per_modality.entry(modality).or_default();
        if steps.contains(&timestep) {
            return Err(MappingError::Duplicate {
                modality: modality.to_string(),
                timestep,
            });
        }
        steps.push(timestep);
    }

    for (modality, steps) in per_modality.iter_mut() {
        steps.sort_unstable();
        if let Some(&first) = steps.first() {
            if first != 0 {
                return Err(MappingError::NotStartingAtZero {
                    modality: modality.to_string(),
                    first,
                });
            }
        }
        for (expected, &step) in steps.iter().enumerate() {
            let expected = expected as u32;
            if step != expected {
                return Err(MappingError::Gap {
                    modality: modality.to_string(),
                    missing: expected,
                });
            }
        }
    }

    Ok(())
}

/// Validated set of volumes, ordered by modality and timestep
#[derive(Debug, Default, Clone)]
pub struct MultiVolume {
    modalities: BTreeMap<String, Vec<Arc<LinearVolume>>>,
}

impl MultiVolume {
    /// Merge volumes, failing with [`MappingError`] without building anything
    pub fn merge(volumes: Vec<Arc<LinearVolume>>) -> Result<MultiVolume, MappingError> {
        validate_mapping(volumes.iter().map(|v| (v.modality(), v.timestep())))?;

        let mut modalities: BTreeMap<String, Vec<Arc<LinearVolume>>> = BTreeMap::new();
        for volume in volumes {
            modalities
                .entry(volume.modality().to_string())
                .or_default()
                .push(volume);
        }
        for steps in modalities.values_mut() {
            steps.sort_by_key(|v| v.timestep());
        }

        info!(
            "Merged {} modalities: {:?}",
            modalities.len(),
            modalities.keys().collect::<Vec<_>>()
        );

        Ok(MultiVolume { modalities })
    }

    pub fn modalities(&self) -> impl Iterator<Item = &str> {
        self.modalities.keys().map(|k| k.as_str())
    }

    pub fn timesteps(&self, modality: &str) -> usize {
        self.modalities.get(modality).map_or(0, |v| v.len())
    }

    pub fn get(&self, modality: &str, timestep: u32) -> Option<Arc<LinearVolume>> {
        self.modalities
            .get(modality)
            .and_then(|steps| steps.get(timestep as usize))
            .cloned()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn duplicate_pair_is_rejected() {
        let res = validate_mapping([("CT", 0), ("CT", 0)]);
        assert_eq!(
            res,
            Err(MappingError::Duplicate {
                modality: "CT".into(),
                timestep: 0
            })
        );
    }

    #[test]
    fn timesteps_must_start_at_zero() {
        let res = validate_mapping([("CT", 1), ("CT", 2)]);
        assert_eq!(
            res,
            Err(MappingError::NotStartingAtZero {
                modality: "CT".into(),
                first: 1
            })
        );
    }

    #[test]
    fn timesteps_must_be_contiguous() {
        let res = validate_mapping([("PET", 0), ("PET", 2), ("PET", 3)]);
        assert_eq!(
            res,
            Err(MappingError::Gap {
                modality: "PET".into(),
                missing: 1
            })
        );
    }

    #[test]
    fn separate_modalities_are_independent() {
        assert!(validate_mapping([("CT", 0), ("PET", 0), ("CT", 1), ("PET", 1)]).is_ok());
        assert!(validate_mapping(std::iter::empty()).is_ok());
    }

    #[test]
    fn error_message_names_the_mapping() {
        let err = validate_mapping([("CT", 0), ("CT", 0)]).unwrap_err();
        assert!(err.to_string().contains("incorrect mapping"));
    }
}
