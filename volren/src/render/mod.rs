mod capability;
mod compositing;
mod compositor;
mod pipeline;
mod raycaster;
mod render_front;
mod render_options;
pub mod shading;
mod view;

pub use capability::GraphicsCapabilities;
pub use compositing::{opacity_correction, RayAccumulator};
pub use compositor::{Frame, FrameOutcome, ViewCompositor};
pub use pipeline::{default_camera, Pipeline, PipelineConfig};
pub use raycaster::{Raycaster, RaycasterKind, RenderTargets, RenderedImage};
pub use render_front::{PipelineRenderer, RenderThread, RendererFront, RendererMessage};
pub use render_options::{
    Axis, FirstHitOutputs, Quality, RenderSettings, RenderSettingsBuilder, ShadingMode,
    SlicePlane, StereoMode, StereoSettings,
};
pub use view::{orbit, SubView, ViewDescriptor, ViewId, ViewKind, ViewState, Viewport};
