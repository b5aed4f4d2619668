//! Volume rendering pipeline.
//!
//! Volumes are classified by transfer functions and rendered by a family of
//! raycasters into textures leased from a shared container. Views composite
//! one or more raycaster passes into the final image.

pub mod camera;
pub mod color;
pub mod common;
pub mod error;
pub mod render;
pub mod test_helpers;
pub mod texture;
pub mod transfer_function;
pub mod volumetric;

pub use camera::{Camera, PerspectiveCamera};
pub use error::{Result, VolrenError};
pub use render::{Pipeline, PipelineConfig};
