use std::{collections::HashMap, sync::Arc};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::{Result, VolrenError};

use super::{BuildVolume, LinearVolume, MultiVolume, VolumeMetadata};

/// Key of a volume inside [`VolumeStore`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VolumeId(pub u32);

/// Owner of all decoded volumes.
///
/// Volumes are immutable and handed out as `Arc`s, so any number of
/// raycasters may read them concurrently. A released volume lives on
/// until the last view drops its reference.
#[derive(Debug, Default)]
pub struct VolumeStore {
    volumes: HashMap<VolumeId, Arc<LinearVolume>>,
    next_id: u32,
}

impl VolumeStore {
    pub fn new() -> VolumeStore {
        VolumeStore::default()
    }

    /// Build and store a volume from importer output
    pub fn import(&mut self, metadata: VolumeMetadata) -> Result<VolumeId> {
        let volume = LinearVolume::build(metadata)?;
        Ok(self.insert(volume))
    }

    pub fn insert(&mut self, volume: LinearVolume) -> VolumeId {
        let id = VolumeId(self.next_id);
        self.next_id += 1;
        info!("Stored volume {id:?}: {volume:?}");
        self.volumes.insert(id, Arc::new(volume));
        id
    }

    pub fn get(&self, id: VolumeId) -> Result<Arc<LinearVolume>> {
        self.volumes
            .get(&id)
            .cloned()
            .ok_or(VolrenError::UnknownVolume(id.0))
    }

    /// Drop the store's reference
    pub fn release(&mut self, id: VolumeId) -> Result<()> {
        let volume = self
            .volumes
            .remove(&id)
            .ok_or(VolrenError::UnknownVolume(id.0))?;
        debug!(
            "Released volume {id:?}, {} other references remain",
            Arc::strong_count(&volume) - 1
        );
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.volumes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.volumes.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = VolumeId> + '_ {
        self.volumes.keys().copied()
    }

    /// Validate and merge stored volumes by their modality and timestep
    pub fn merge(&self, ids: &[VolumeId]) -> Result<MultiVolume> {
        let volumes = ids
            .iter()
            .map(|&id| self.get(id))
            .collect::<Result<Vec<_>>>()?;
        Ok(MultiVolume::merge(volumes)?)
    }
}

#[cfg(test)]
mod test {
    use nalgebra::vector;

    use super::*;
    use crate::{
        error::MappingError,
        volumetric::{DataSource, Volume},
    };

    fn meta(modality: &str, timestep: u32) -> VolumeMetadata {
        VolumeMetadata::new(vector![2, 2, 2], DataSource::U8(vec![10; 8]))
            .with_mapping(modality, timestep)
    }

    #[test]
    fn released_volume_outlives_store_entry() {
        let mut store = VolumeStore::new();
        let id = store.import(meta("CT", 0)).unwrap();
        let held_by_view = store.get(id).unwrap();
        store.release(id).unwrap();

        assert!(store.get(id).is_err());
        assert_eq!(held_by_view.get_size(), vector![2, 2, 2]);
        assert_eq!(Arc::strong_count(&held_by_view), 1);
    }

    #[test]
    fn merge_conflict() {
        let mut store = VolumeStore::new();
        let a = store.import(meta("CT", 0)).unwrap();
        let b = store.import(meta("CT", 0)).unwrap();
        let err = store.merge(&[a, b]).unwrap_err();
        assert!(matches!(
            err,
            VolrenError::IncorrectMapping(MappingError::Duplicate { .. })
        ));
    }

    #[test]
    fn merge_orders_timesteps() {
        let mut store = VolumeStore::new();
        let t1 = store.import(meta("CT", 1)).unwrap();
        let t0 = store.import(meta("CT", 0)).unwrap();
        let pet = store.import(meta("PET", 0)).unwrap();

        let multi = store.merge(&[t1, t0, pet]).unwrap();
        assert_eq!(multi.modalities().collect::<Vec<_>>(), vec!["CT", "PET"]);
        assert_eq!(multi.timesteps("CT"), 2);
        assert_eq!(multi.get("CT", 1).unwrap().timestep(), 1);
    }
}
