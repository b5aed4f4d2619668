//! Render target arena.
//!
//! Views do not own textures, they lease them from a [`TextureContainer`]
//! owned by the pipeline and hold [`TextureHandle`]s.

mod container;
mod spec;

pub use container::{
    ContainerConfig, EvictionPolicy, TextureContainer, TextureHandle, TextureReadGuard,
    TextureWriteGuard,
};
pub use spec::{Access, AuxiliaryKind, TextureData, TextureFormat, TextureSpec, TextureUsage};
