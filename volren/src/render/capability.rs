use std::collections::HashSet;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::{Result, VolrenError};

use super::RaycasterKind;

/// What the graphics backend can run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphicsCapabilities {
    pub variants: HashSet<RaycasterKind>,
    /// Float render targets, needed by first-hit outputs
    pub float_targets: bool,
    pub max_texture_size: usize,
}

impl Default for GraphicsCapabilities {
    fn default() -> Self {
        GraphicsCapabilities {
            variants: RaycasterKind::ALL.into_iter().collect(),
            float_targets: true,
            max_texture_size: 8192,
        }
    }
}

impl GraphicsCapabilities {
    /// Software floor, only the slice renderer
    pub fn limited() -> GraphicsCapabilities {
        GraphicsCapabilities {
            variants: [RaycasterKind::Slice].into_iter().collect(),
            float_targets: false,
            max_texture_size: 2048,
        }
    }

    pub fn none() -> GraphicsCapabilities {
        GraphicsCapabilities {
            variants: HashSet::new(),
            float_targets: false,
            max_texture_size: 0,
        }
    }

    pub fn supports(&self, kind: RaycasterKind) -> bool {
        self.variants.contains(&kind)
    }

    /// Fails when nothing at all can be rendered
    pub fn validate(&self) -> Result<()> {
        if self.variants.is_empty() || self.max_texture_size == 0 {
            return Err(VolrenError::NoRendererSupported);
        }
        Ok(())
    }

    /// `kind` if supported, otherwise the most degraded supported variant
    pub fn fallback(&self, kind: RaycasterKind) -> Result<RaycasterKind> {
        if self.supports(kind) {
            return Ok(kind);
        }
        let fallback = if self.supports(RaycasterKind::Slice) {
            RaycasterKind::Slice
        } else {
            RaycasterKind::ALL
                .into_iter()
                .find(|k| self.supports(*k))
                .ok_or(VolrenError::NoRendererSupported)?
        };
        warn!("Raycaster {kind:?} not supported, falling back to {fallback:?}");
        Ok(fallback)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_supports_everything() {
        let caps = GraphicsCapabilities::default();
        assert!(caps.validate().is_ok());
        for kind in RaycasterKind::ALL {
            assert_eq!(caps.fallback(kind).unwrap(), kind);
        }
    }

    #[test]
    fn limited_falls_back_to_slice() {
        let caps = GraphicsCapabilities::limited();
        assert_eq!(caps.fallback(RaycasterKind::FancyDvr).unwrap(), RaycasterKind::Slice);
        assert_eq!(caps.fallback(RaycasterKind::Slice).unwrap(), RaycasterKind::Slice);
    }

    #[test]
    fn nothing_supported() {
        let caps = GraphicsCapabilities::none();
        assert!(matches!(caps.validate(), Err(VolrenError::NoRendererSupported)));
        assert!(matches!(
            caps.fallback(RaycasterKind::Mip),
            Err(VolrenError::NoRendererSupported)
        ));
    }

    #[test]
    fn fallback_without_slice() {
        let caps = GraphicsCapabilities {
            variants: [RaycasterKind::Mip].into_iter().collect(),
            ..Default::default()
        };
        assert_eq!(caps.fallback(RaycasterKind::FancyDvr).unwrap(), RaycasterKind::Mip);
    }
}
