mod linear_volume;
mod multi_volume;
mod vol_builder;
mod volume;
mod volume_store;

pub use linear_volume::LinearVolume;
pub use multi_volume::{validate_mapping, MultiVolume};
pub use vol_builder::{BuildVolume, DataSource, Precision, VolumeMetadata};
pub use volume::Volume;
pub use volume_store::{VolumeId, VolumeStore};
