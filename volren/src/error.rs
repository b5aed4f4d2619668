//! Error types of the rendering pipeline.

use thiserror::Error;

use crate::texture::TextureHandle;

/// Problems found while merging several volumes into one multi-volume set.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MappingError {
    /// Two volumes claim the same modality and timestep.
    #[error("incorrect mapping: modality '{modality}' has timestep {timestep} more than once")]
    Duplicate { modality: String, timestep: u32 },

    /// First timestep of a modality is not zero.
    #[error("incorrect mapping: timesteps of modality '{modality}' must start at zero, first is {first}")]
    NotStartingAtZero { modality: String, first: u32 },

    /// Timesteps of a modality are not contiguous.
    #[error("incorrect mapping: modality '{modality}' is missing timestep {missing}")]
    Gap { modality: String, missing: u32 },
}

/// Texture arena failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TextureError {
    /// No room left and nothing could be evicted.
    #[error("texture container exhausted ({in_use} of {capacity} targets in use)")]
    Exhausted { in_use: usize, capacity: usize },

    /// Handle was released or evicted.
    #[error("stale texture handle {0:?}")]
    StaleHandle(TextureHandle),

    /// Target is borrowed by another pass.
    #[error("texture {0:?} is borrowed by another pass")]
    Busy(TextureHandle),

    /// Requested target can never fit.
    #[error("texture of {width}x{height} exceeds limit {limit}")]
    TooLarge { width: usize, height: usize, limit: usize },
}

impl TextureError {
    /// Resource pressure which the caller may answer with a smaller request.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, TextureError::Exhausted { .. })
    }

    /// A smaller request may succeed
    pub fn is_recoverable(&self) -> bool {
        matches!(self, TextureError::Exhausted { .. } | TextureError::TooLarge { .. })
    }
}

/// The main error type of volren.
#[derive(Error, Debug)]
pub enum VolrenError {
    #[error(transparent)]
    IncorrectMapping(#[from] MappingError),

    #[error(transparent)]
    Texture(#[from] TextureError),

    /// Transfer function could not be baked; the previous bake stays in use.
    #[error("transfer function bake failed: {0}")]
    BakeFailed(String),

    /// Two keys at the same intensity.
    #[error("key at intensity {0} already exists")]
    DuplicateKey(f32),

    /// Index of key or primitive out of range.
    #[error("no element at index {0}")]
    NoSuchElement(usize),

    /// None of the raycaster variants can run with the given capabilities.
    #[error("no raycaster variant is supported by the graphics capabilities")]
    NoRendererSupported,

    #[error("invalid volume: {0}")]
    InvalidVolume(String),

    #[error("invalid render settings: {0}")]
    InvalidSettings(String),

    #[error("unknown view {0}")]
    UnknownView(u32),

    #[error("unknown volume {0}")]
    UnknownVolume(u32),

    /// Renderer thread is gone.
    #[error("renderer thread disconnected")]
    Disconnected,

    #[error("parse error: {0}")]
    Parse(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl VolrenError {
    pub fn is_exhausted(&self) -> bool {
        matches!(self, VolrenError::Texture(e) if e.is_exhausted())
    }

    /// Recoverable by rendering at a lower quality or resolution.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, VolrenError::Texture(e) if e.is_recoverable())
    }
}

pub type Result<T> = std::result::Result<T, VolrenError>;
