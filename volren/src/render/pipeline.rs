use std::{collections::HashSet, path::Path, sync::Arc};

use log::{debug, info, warn};
use nalgebra::vector;
use serde::{Deserialize, Serialize};

use crate::{
    camera::PerspectiveCamera,
    error::{Result, VolrenError},
    texture::{ContainerConfig, TextureContainer},
    transfer_function::{TfSnapshot, TransferFunction, TransferFunctionEngine},
    volumetric::{LinearVolume, Volume, VolumeId, VolumeMetadata, VolumeStore},
};

use super::{
    FrameOutcome, GraphicsCapabilities, RaycasterKind, RenderSettings, ViewCompositor, ViewId,
    ViewKind,
};

/// Session wide configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub container: ContainerConfig,
    /// Settings of newly added views
    pub default_settings: RenderSettings,
    /// Bake transfer functions on a background thread
    pub async_bake: bool,
}

impl PipelineConfig {
    pub fn from_json(json: &str) -> Result<PipelineConfig> {
        let config: PipelineConfig = serde_json::from_str(json)?;
        config.default_settings.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Camera looking at the volume center along `-z`
pub fn default_camera(volume: &impl Volume) -> PerspectiveCamera {
    let bound_box = volume.get_bound_box();
    let center = bound_box.center();
    let distance = 1.5 * bound_box.diagonal().max(1.0);
    PerspectiveCamera::look_at(center + vector![0.0, 0.0, distance], center)
}

/// A rendering session: volumes, the transfer function, render targets and views.
pub struct Pipeline {
    config: PipelineConfig,
    volumes: VolumeStore,
    transfer_function: TransferFunctionEngine,
    container: TextureContainer,
    compositor: ViewCompositor,
    capabilities: GraphicsCapabilities,
    limited: bool,
    /// Released volumes still shown by a view
    pending_release: HashSet<VolumeId>,
}

impl Pipeline {
    /// Fails with `NoRendererSupported` when `capabilities` can not render anything
    pub fn new(config: PipelineConfig, capabilities: GraphicsCapabilities) -> Result<Pipeline> {
        capabilities.validate()?;
        config.default_settings.validate()?;

        let mut container_config = config.container;
        container_config.max_texture_size = container_config
            .max_texture_size
            .min(capabilities.max_texture_size);

        let mut compositor = ViewCompositor::new();
        compositor.set_float_targets(capabilities.float_targets);

        info!(
            "Pipeline started, {} raycaster variants, container {:?}",
            capabilities.variants.len(),
            container_config
        );

        Ok(Pipeline {
            config,
            volumes: VolumeStore::new(),
            transfer_function: TransferFunctionEngine::new(TransferFunction::default())?,
            container: TextureContainer::new(container_config),
            compositor,
            capabilities,
            limited: false,
            pending_release: HashSet::new(),
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn volumes(&self) -> &VolumeStore {
        &self.volumes
    }

    pub fn container(&self) -> &TextureContainer {
        &self.container
    }

    pub fn compositor(&self) -> &ViewCompositor {
        &self.compositor
    }

    pub fn capabilities(&self) -> &GraphicsCapabilities {
        &self.capabilities
    }

    /// Running on the most degraded renderer after losing capabilities
    pub fn is_limited(&self) -> bool {
        self.limited
    }

    pub fn import_volume(&mut self, metadata: VolumeMetadata) -> Result<VolumeId> {
        self.volumes.import(metadata)
    }

    pub fn insert_volume(&mut self, volume: LinearVolume) -> VolumeId {
        self.volumes.insert(volume)
    }

    /// Release a volume. Volumes shown by a view are dropped with the last such view.
    pub fn release_volume(&mut self, id: VolumeId) -> Result<()> {
        self.volumes.get(id)?;
        if self.compositor.views().any(|v| v.volume == id) {
            info!("Volume {id:?} still in use, released with its last view");
            self.pending_release.insert(id);
            return Ok(());
        }
        self.volumes.release(id)
    }

    pub fn transfer_function(&self) -> Arc<TransferFunction> {
        self.transfer_function.function()
    }

    /// Snapshot raycasters read, the last complete bake
    pub fn transfer_function_snapshot(&self) -> Arc<TfSnapshot> {
        self.transfer_function.snapshot()
    }

    /// Replace the transfer function, every view gets redrawn.
    ///
    /// With asynchronous baking the call returns right away and bake errors are
    /// reported by [`Pipeline::take_bake_error`].
    pub fn set_transfer_function(&mut self, function: TransferFunction) -> Result<u64> {
        let generation = if self.config.async_bake {
            self.transfer_function.submit_async(function)
        } else {
            self.transfer_function.submit(function)?
        };
        self.compositor.invalidate_all();
        Ok(generation)
    }

    /// Edit a copy of the current transfer function and submit it.
    /// A failed edit leaves the current function in place.
    pub fn edit_transfer_function(
        &mut self,
        edit: impl FnOnce(&mut TransferFunction) -> Result<()>,
    ) -> Result<u64> {
        let mut function = TransferFunction::clone(&self.transfer_function.function());
        edit(&mut function)?;
        self.set_transfer_function(function)
    }

    pub fn load_transfer_function(&mut self, path: impl AsRef<Path>) -> Result<u64> {
        let function = TransferFunction::load(path)?;
        self.set_transfer_function(function)
    }

    pub fn save_transfer_function(&self, path: impl AsRef<Path>) -> Result<()> {
        self.transfer_function.function().save(path)
    }

    /// Wait for the pending bake
    pub fn sync_transfer_function(&self) -> Arc<TfSnapshot> {
        self.transfer_function.sync()
    }

    pub fn take_bake_error(&self) -> Option<VolrenError> {
        self.transfer_function.take_error()
    }

    /// New view with the default settings, looking at the volume along `-z`
    pub fn add_view(
        &mut self,
        kind: ViewKind,
        volume: VolumeId,
        raycaster: RaycasterKind,
    ) -> Result<ViewId> {
        let camera = default_camera(&*self.volumes.get(volume)?);
        let settings = self.config.default_settings.clone();
        self.add_view_with(kind, volume, raycaster, settings, camera)
    }

    pub fn add_view_with(
        &mut self,
        kind: ViewKind,
        volume: VolumeId,
        raycaster: RaycasterKind,
        settings: RenderSettings,
        camera: PerspectiveCamera,
    ) -> Result<ViewId> {
        self.volumes.get(volume)?;
        let raycaster = self.capabilities.fallback(raycaster)?;
        self.compositor
            .add_view(kind, volume, raycaster, settings, camera)
    }

    /// Drop a view, its textures and volumes released meanwhile
    pub fn remove_view(&mut self, id: ViewId) -> Result<usize> {
        let volume = self.compositor.view(id)?.volume;
        let released = self.compositor.remove_view(id, &self.container)?;
        if self.pending_release.contains(&volume)
            && !self.compositor.views().any(|v| v.volume == volume)
        {
            self.pending_release.remove(&volume);
            self.volumes.release(volume)?;
        }
        Ok(released)
    }

    pub fn update_settings(
        &mut self,
        id: ViewId,
        update: impl FnOnce(&mut RenderSettings),
    ) -> Result<()> {
        self.compositor.update_settings(id, update)
    }

    pub fn set_camera(&mut self, id: ViewId, camera: PerspectiveCamera) -> Result<()> {
        self.compositor.set_camera(id, camera)
    }

    /// Returns the variant actually used, unsupported ones fall back
    pub fn set_raycaster(&mut self, id: ViewId, raycaster: RaycasterKind) -> Result<RaycasterKind> {
        let raycaster = self.capabilities.fallback(raycaster)?;
        self.compositor.set_raycaster(id, raycaster)?;
        Ok(raycaster)
    }

    /// Camera manipulation started, following frames use the coarse step
    pub fn begin_interaction(&mut self, id: ViewId) -> Result<()> {
        self.compositor
            .update_settings(id, RenderSettings::begin_interaction)
    }

    pub fn end_interaction(&mut self, id: ViewId) -> Result<()> {
        self.compositor
            .update_settings(id, RenderSettings::end_interaction)
    }

    /// Capabilities changed during the session.
    ///
    /// Views whose variant is gone switch to the most degraded one and the
    /// pipeline enters limited mode.
    pub fn set_capabilities(&mut self, capabilities: GraphicsCapabilities) -> Result<()> {
        let capabilities = match capabilities.validate() {
            Ok(()) => capabilities,
            Err(e) => {
                warn!("{e}, continuing with the slice renderer");
                self.limited = true;
                GraphicsCapabilities::limited()
            }
        };

        let changes: Vec<(ViewId, RaycasterKind)> = self
            .compositor
            .views()
            .filter(|v| !capabilities.supports(v.raycaster))
            .map(|v| capabilities.fallback(v.raycaster).map(|k| (v.id, k)))
            .collect::<Result<_>>()?;

        if !changes.is_empty() {
            warn!("{} views lost their raycaster, limited mode", changes.len());
            self.limited = true;
        }
        for (id, raycaster) in changes {
            self.compositor.set_raycaster(id, raycaster)?;
        }

        let max_texture_size = self
            .config
            .container
            .max_texture_size
            .min(capabilities.max_texture_size);
        if max_texture_size != self.container.config().max_texture_size {
            let released = self.container.set_max_texture_size(max_texture_size);
            info!("Texture size limit now {max_texture_size}, {released} targets released");
        }

        self.compositor.set_float_targets(capabilities.float_targets);
        self.capabilities = capabilities;
        Ok(())
    }

    /// Render and composite a view with the last complete transfer function bake
    pub fn render(&mut self, id: ViewId) -> Result<FrameOutcome> {
        if let Some(e) = self.transfer_function.last_error() {
            debug!("{e}, rendering with the previous transfer function");
        }
        let volume = self.volumes.get(self.compositor.view(id)?.volume)?;
        let snapshot = self.transfer_function.snapshot();
        self.compositor
            .render_view(id, &*volume, &snapshot, &self.container)
    }

    /// Composited frame was shown
    pub fn present(&mut self, id: ViewId) -> Result<()> {
        self.compositor.present(id)
    }
}
