use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use log::{debug, trace, warn};
use nalgebra::Point3;

use crate::{
    camera::{Camera, Eye, PerspectiveCamera},
    color,
    common::{BoundBox, BOX_EDGES},
    error::{Result, TextureError, VolrenError},
    texture::{
        Access, AuxiliaryKind, TextureContainer, TextureData, TextureHandle, TextureReadGuard,
        TextureSpec, TextureUsage, TextureWriteGuard,
    },
    transfer_function::TfSnapshot,
    volumetric::{Volume, VolumeId},
};

use super::{
    Quality, Raycaster, RaycasterKind, RenderSettings, RenderTargets, RenderedImage, StereoMode,
    ViewDescriptor, ViewId, ViewKind, ViewState,
};

const OVERLAY_COLOR: [u8; 3] = [255, 255, 255];
const MAX_LINE_STEPS: usize = 16384;

/// Composited image of a view, RGB8, row `0` on top
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub view: ViewId,
    pub epoch: u64,
    pub width: usize,
    pub height: usize,
    /// Quality the frame was rendered at
    pub quality: Quality,
    /// Rendered below the requested quality, resolution or without requested auxiliary targets
    pub degraded: bool,
    /// Passes were rendered at `1 / downscale` of their resolution and stretched
    pub downscale: usize,
    pub passes: Vec<RenderedImage>,
    pixels: Vec<u8>,
}

impl Frame {
    fn new(view: ViewId, epoch: u64, settings: &RenderSettings) -> Frame {
        let (width, height) = settings.resolution;
        let bg = settings.background.map(color::to_byte);
        Frame {
            view,
            epoch,
            width,
            height,
            quality: settings.quality,
            degraded: false,
            downscale: 1,
            passes: Vec::new(),
            pixels: bg.repeat(width * height),
        }
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }

    pub fn pixel(&self, x: usize, y: usize) -> [u8; 3] {
        let i = (x + y * self.width) * 3;
        [self.pixels[i], self.pixels[i + 1], self.pixels[i + 2]]
    }

    fn set_pixel(&mut self, x: usize, y: usize, rgb: [u8; 3]) {
        if x < self.width && y < self.height {
            let i = (x + y * self.width) * 3;
            self.pixels[i..i + 3].copy_from_slice(&rgb);
        }
    }

    fn set_channel(&mut self, x: usize, y: usize, channel: usize, value: u8) {
        if x < self.width && y < self.height {
            self.pixels[(x + y * self.width) * 3 + channel] = value;
        }
    }
}

/// Result of a frame request
#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    Composited(Frame),
    /// Settings changed while rendering, the frame was thrown away
    Cancelled,
}

/// How a pass lands in the frame
#[derive(Debug, Clone, Copy, PartialEq)]
enum Blend {
    Copy,
    /// Left eye gives red, right eye green and blue
    Anaglyph(Eye),
    /// Left eye on even columns
    Interleave(Eye),
}

/// One raycaster invocation of a frame
struct Pass {
    index: usize,
    camera: PerspectiveCamera,
    origin: (usize, usize),
    resolution: (usize, usize),
    blend: Blend,
    /// Camera the bounding box is drawn with, if any
    overlay: Option<PerspectiveCamera>,
}

fn plan_passes(
    descriptor: &ViewDescriptor,
    settings: &RenderSettings,
    pivot: Point3<f32>,
) -> Vec<Pass> {
    let stereo = settings.stereo;
    let mut passes = Vec::new();
    for sub in descriptor.sub_views(pivot) {
        let (x, y, w, h) = sub.rect;
        let eye_camera = |eye| {
            sub.camera
                .eye_camera(eye, stereo.eye_distance, stereo.focal_distance)
        };
        match stereo.mode {
            StereoMode::Monoscopic => passes.push(Pass {
                index: passes.len(),
                camera: sub.camera.clone(),
                origin: (x, y),
                resolution: (w, h),
                blend: Blend::Copy,
                overlay: Some(sub.camera.clone()),
            }),
            StereoMode::SideBySide => {
                let left = (w / 2).max(1);
                let right = w.saturating_sub(left).max(1);
                for (eye, offset, width) in [(Eye::Left, 0, left), (Eye::Right, left, right)] {
                    let mut camera = eye_camera(eye);
                    camera.set_aspect(width as f32 / h as f32);
                    passes.push(Pass {
                        index: passes.len(),
                        camera: camera.clone(),
                        origin: (x + offset, y),
                        resolution: (width, h),
                        blend: Blend::Copy,
                        overlay: Some(camera),
                    });
                }
            }
            StereoMode::Anaglyph | StereoMode::Autostereoscopic => {
                for eye in [Eye::Left, Eye::Right] {
                    let blend = match stereo.mode {
                        StereoMode::Anaglyph => Blend::Anaglyph(eye),
                        _ => Blend::Interleave(eye),
                    };
                    passes.push(Pass {
                        index: passes.len(),
                        camera: eye_camera(eye),
                        origin: (x, y),
                        resolution: (w, h),
                        blend,
                        overlay: (eye == Eye::Left).then(|| sub.camera.clone()),
                    });
                }
            }
        }
    }
    passes
}

/// Resolution of a pass rendered at `1 / downscale`, at least one pixel
fn downscaled((w, h): (usize, usize), downscale: usize) -> (usize, usize) {
    ((w / downscale).max(1), (h / downscale).max(1))
}

/// Copy `texture` into the `size` region at `origin`, stretched by nearest texel
fn blit(
    frame: &mut Frame,
    texture: &TextureData,
    origin: (usize, usize),
    size: (usize, usize),
    blend: Blend,
) {
    let (tw, th) = (texture.width(), texture.height());
    for y in 0..size.1 {
        for x in 0..size.0 {
            let texel = texture.texel((x * tw / size.0).min(tw - 1), (y * th / size.1).min(th - 1));
            let rgb = [
                color::to_byte(texel[0]),
                color::to_byte(texel[1]),
                color::to_byte(texel[2]),
            ];
            let (fx, fy) = (origin.0 + x, origin.1 + y);
            match blend {
                Blend::Copy => frame.set_pixel(fx, fy, rgb),
                Blend::Anaglyph(Eye::Left) => frame.set_channel(fx, fy, 0, rgb[0]),
                Blend::Anaglyph(Eye::Right) => {
                    frame.set_channel(fx, fy, 1, rgb[1]);
                    frame.set_channel(fx, fy, 2, rgb[2]);
                }
                Blend::Interleave(eye) => {
                    if (fx % 2 == 0) == (eye == Eye::Left) {
                        frame.set_pixel(fx, fy, rgb);
                    }
                }
            }
        }
    }
}

/// Draw the projected edges of `bound_box` into the region `origin`, `size` of the frame
fn draw_bound_box(
    frame: &mut Frame,
    camera: &PerspectiveCamera,
    bound_box: BoundBox,
    origin: (usize, usize),
    size: (usize, usize),
) {
    let corners: Vec<_> = bound_box
        .into_iter()
        .map(|corner| camera.project_point(&corner))
        .collect();
    let to_pixel = |(u, v): (f32, f32)| {
        (
            origin.0 as f32 + u * size.0 as f32,
            origin.1 as f32 + v * size.1 as f32,
        )
    };

    for (a, b) in BOX_EDGES {
        let (from, to) = match (corners[a], corners[b]) {
            (Some(a), Some(b)) => (to_pixel(a), to_pixel(b)),
            _ => continue,
        };
        let steps = f32::max((to.0 - from.0).abs(), (to.1 - from.1).abs()).ceil() as usize;
        let steps = steps.clamp(1, MAX_LINE_STEPS);
        for k in 0..=steps {
            let t = k as f32 / steps as f32;
            let x = from.0 + (to.0 - from.0) * t;
            let y = from.1 + (to.1 - from.1) * t;
            let inside = x >= origin.0 as f32
                && y >= origin.1 as f32
                && x < (origin.0 + size.0) as f32
                && y < (origin.1 + size.1) as f32;
            if inside {
                frame.set_pixel(x as usize, y as usize, OVERLAY_COLOR);
            }
        }
    }
}

type LeaseKey = (usize, TextureUsage);

struct ViewEntry {
    descriptor: ViewDescriptor,
    state: ViewState,
    epoch: Arc<AtomicU64>,
    /// Targets leased by earlier frames, by pass and usage
    leases: HashMap<LeaseKey, TextureHandle>,
}

impl ViewEntry {
    fn is_stale(&self, epoch: u64) -> bool {
        self.epoch.load(Ordering::SeqCst) != epoch
    }

    fn invalidate(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
    }

    fn set_state(&mut self, state: ViewState) {
        trace!("View {:?} {:?} -> {:?}", self.descriptor.id, self.state, state);
        self.state = state;
    }

    /// Cached lease of `key` matching `spec`, borrowed for writing
    fn borrow_target<'c>(
        &mut self,
        container: &'c TextureContainer,
        key: LeaseKey,
        spec: TextureSpec,
    ) -> Result<TextureWriteGuard<'c>> {
        let owner = self.descriptor.id;
        let handle = match self.leases.remove(&key) {
            Some(handle) => match container.spec(handle) {
                Ok(current) if current == spec => handle,
                Ok(_) => container.resize(handle, spec)?,
                Err(_) => container.lease(owner, spec, Access::Exclusive)?,
            },
            None => container.lease(owner, spec, Access::Exclusive)?,
        };
        self.leases.insert(key, handle);
        Ok(container.write(handle)?)
    }

    fn borrow_auxiliary<'c>(
        &mut self,
        container: &'c TextureContainer,
        enabled: bool,
        key: LeaseKey,
        spec: TextureSpec,
    ) -> Result<Option<TextureWriteGuard<'c>>> {
        if !enabled {
            return Ok(None);
        }
        self.borrow_target(container, key, spec).map(Some)
    }

    fn release_leases(&mut self, container: &TextureContainer) {
        for (_, handle) in self.leases.drain() {
            match container.release(handle) {
                Ok(()) | Err(TextureError::StaleHandle(_)) => (),
                Err(e) => warn!("Could not release {handle:?}: {e}"),
            }
        }
    }

    /// Render every pass of the view. `None` when the epoch moved on.
    fn render_frame<V>(
        &mut self,
        volume: &V,
        tf: &TfSnapshot,
        container: &TextureContainer,
        settings: &RenderSettings,
        auxiliaries: bool,
        downscale: usize,
        epoch: u64,
    ) -> Result<Option<Frame>>
    where
        V: Volume + Sync + ?Sized,
    {
        let bound_box = volume.get_bound_box();
        let passes = plan_passes(&self.descriptor, settings, bound_box.center());
        let raycaster = Raycaster::new(self.descriptor.raycaster);
        let mut frame = Frame::new(self.descriptor.id, epoch, settings);
        frame.downscale = downscale;

        let first_hit = settings.first_hit;
        let with_depth = auxiliaries && (first_hit.any() || settings.ambient_occlusion);
        let with_occlusion = auxiliaries && settings.ambient_occlusion;

        for pass in &passes {
            if self.is_stale(epoch) {
                return Ok(None);
            }

            let (w, h) = downscaled(pass.resolution, downscale);
            let key = |usage| (pass.index, usage);
            let aux = |kind| TextureSpec::auxiliary(kind, w, h);

            let mut color =
                self.borrow_target(container, key(TextureUsage::Color), TextureSpec::color(w, h))?;
            let mut depth = self.borrow_auxiliary(
                container,
                with_depth,
                key(TextureUsage::Depth),
                TextureSpec::depth(w, h),
            )?;
            let mut position = self.borrow_auxiliary(
                container,
                auxiliaries && first_hit.position,
                key(TextureUsage::Auxiliary(AuxiliaryKind::FirstHitPosition)),
                aux(AuxiliaryKind::FirstHitPosition),
            )?;
            let mut normal = self.borrow_auxiliary(
                container,
                auxiliaries && first_hit.normal,
                key(TextureUsage::Auxiliary(AuxiliaryKind::FirstHitNormal)),
                aux(AuxiliaryKind::FirstHitNormal),
            )?;
            let mut shade = self.borrow_auxiliary(
                container,
                auxiliaries && first_hit.shade,
                key(TextureUsage::Auxiliary(AuxiliaryKind::FirstHitShade)),
                aux(AuxiliaryKind::FirstHitShade),
            )?;
            let mut occlusion = self.borrow_auxiliary(
                container,
                with_occlusion,
                key(TextureUsage::Auxiliary(AuxiliaryKind::AmbientOcclusion)),
                aux(AuxiliaryKind::AmbientOcclusion),
            )?;

            let mut pass_settings = settings.clone();
            pass_settings.resolution = (w, h);

            let targets = RenderTargets {
                color: &mut *color,
                depth: depth.as_deref_mut(),
                first_hit_position: position.as_deref_mut(),
                first_hit_normal: normal.as_deref_mut(),
                first_hit_shade: shade.as_deref_mut(),
                ambient_occlusion: occlusion.as_deref_mut(),
            };
            let image = raycaster.render(volume, tf, &pass.camera, &pass_settings, targets)?;

            blit(&mut frame, &color, pass.origin, pass.resolution, pass.blend);
            if settings.bounding_box {
                if let Some(camera) = &pass.overlay {
                    draw_bound_box(&mut frame, camera, bound_box, pass.origin, pass.resolution);
                }
            }
            frame.passes.push(image);
        }

        if self.is_stale(epoch) {
            return Ok(None);
        }
        Ok(Some(frame))
    }
}

/// Owner of the logical views of a pipeline.
///
/// Every view carries an epoch. Changing a view bumps its epoch and a frame
/// started under an older epoch is discarded instead of being presented.
pub struct ViewCompositor {
    views: HashMap<ViewId, ViewEntry>,
    next_id: u32,
    float_targets: bool,
}

impl Default for ViewCompositor {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewCompositor {
    pub fn new() -> ViewCompositor {
        ViewCompositor {
            views: HashMap::new(),
            next_id: 0,
            float_targets: true,
        }
    }

    fn entry(&self, id: ViewId) -> Result<&ViewEntry> {
        self.views.get(&id).ok_or(VolrenError::UnknownView(id.0))
    }

    fn entry_mut(&mut self, id: ViewId) -> Result<&mut ViewEntry> {
        self.views.get_mut(&id).ok_or(VolrenError::UnknownView(id.0))
    }

    pub fn add_view(
        &mut self,
        kind: ViewKind,
        volume: VolumeId,
        raycaster: RaycasterKind,
        settings: RenderSettings,
        camera: PerspectiveCamera,
    ) -> Result<ViewId> {
        settings.validate()?;
        let id = ViewId(self.next_id);
        self.next_id += 1;
        let descriptor = ViewDescriptor::new(id, kind, volume, raycaster, settings, camera);
        debug!("New view {id:?} {kind:?} of volume {volume:?} using {raycaster:?}");
        self.views.insert(
            id,
            ViewEntry {
                descriptor,
                state: ViewState::Idle,
                epoch: Arc::new(AtomicU64::new(0)),
                leases: HashMap::new(),
            },
        );
        Ok(id)
    }

    /// Drop a view and every texture it leased.
    /// Returns the number of released textures.
    pub fn remove_view(&mut self, id: ViewId, container: &TextureContainer) -> Result<usize> {
        let entry = self
            .views
            .remove(&id)
            .ok_or(VolrenError::UnknownView(id.0))?;
        entry.invalidate();
        let released = container.release_owner(id);
        debug!("Removed view {id:?}, released {released} textures");
        Ok(released)
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    pub fn view(&self, id: ViewId) -> Result<&ViewDescriptor> {
        Ok(&self.entry(id)?.descriptor)
    }

    pub fn views(&self) -> impl Iterator<Item = &ViewDescriptor> {
        self.views.values().map(|e| &e.descriptor)
    }

    pub fn state(&self, id: ViewId) -> Result<ViewState> {
        Ok(self.entry(id)?.state)
    }

    /// Shared epoch counter. Bumping it from any thread cancels the frame in flight.
    pub fn epoch_handle(&self, id: ViewId) -> Result<Arc<AtomicU64>> {
        Ok(self.entry(id)?.epoch.clone())
    }

    pub fn invalidate(&self, id: ViewId) -> Result<()> {
        self.entry(id)?.invalidate();
        Ok(())
    }

    pub fn invalidate_all(&self) {
        self.views.values().for_each(ViewEntry::invalidate);
    }

    /// Change the settings of a view, rejected changes leave the view untouched
    pub fn update_settings(
        &mut self,
        id: ViewId,
        update: impl FnOnce(&mut RenderSettings),
    ) -> Result<()> {
        let entry = self.entry_mut(id)?;
        let mut settings = entry.descriptor.settings.clone();
        update(&mut settings);
        settings.validate()?;
        entry.descriptor.settings = settings;
        entry.invalidate();
        Ok(())
    }

    pub fn set_camera(&mut self, id: ViewId, camera: PerspectiveCamera) -> Result<()> {
        let entry = self.entry_mut(id)?;
        entry.descriptor.camera = camera;
        entry.invalidate();
        Ok(())
    }

    pub fn set_raycaster(&mut self, id: ViewId, raycaster: RaycasterKind) -> Result<()> {
        let entry = self.entry_mut(id)?;
        entry.descriptor.raycaster = raycaster;
        entry.invalidate();
        Ok(())
    }

    pub fn set_kind(&mut self, id: ViewId, kind: ViewKind) -> Result<()> {
        let entry = self.entry_mut(id)?;
        entry.descriptor.kind = kind;
        entry.invalidate();
        Ok(())
    }

    /// Without float targets no auxiliary outputs are produced
    pub fn set_float_targets(&mut self, float_targets: bool) {
        self.float_targets = float_targets;
    }

    /// Frame was shown, view goes back to idle
    pub fn present(&mut self, id: ViewId) -> Result<()> {
        let entry = self.entry_mut(id)?;
        if entry.state == ViewState::Composited {
            entry.set_state(ViewState::Idle);
        }
        Ok(())
    }

    /// Auxiliary output of the first pass of the last frame
    pub fn auxiliary<'c>(
        &self,
        id: ViewId,
        usage: TextureUsage,
        container: &'c TextureContainer,
    ) -> Result<Option<TextureReadGuard<'c>>> {
        match self.entry(id)?.leases.get(&(0, usage)) {
            Some(&handle) => Ok(Some(container.read(handle)?)),
            None => Ok(None),
        }
    }

    /// Render and composite a view.
    ///
    /// When the container runs out of targets the frame is retried at the next
    /// lower quality. The first retry drops auxiliary targets, later ones halve
    /// the pass resolution down to a single pixel.
    pub fn render_view<V>(
        &mut self,
        id: ViewId,
        volume: &V,
        tf: &TfSnapshot,
        container: &TextureContainer,
    ) -> Result<FrameOutcome>
    where
        V: Volume + Sync + ?Sized,
    {
        let float_targets = self.float_targets;
        let entry = self.entry_mut(id)?;
        let epoch = entry.epoch.load(Ordering::SeqCst);
        entry.set_state(ViewState::Rendering);

        let requested = entry.descriptor.settings.clone();
        let wants_auxiliaries = requested.first_hit.any() || requested.ambient_occlusion;
        let mut settings = requested.clone();
        let mut auxiliaries = float_targets;
        let mut downscale = 1;
        let max_downscale = requested.resolution.0.max(requested.resolution.1);

        let outcome = loop {
            let attempt =
                entry.render_frame(volume, tf, container, &settings, auxiliaries, downscale, epoch);
            match attempt {
                Err(e) if e.is_recoverable() => {
                    if auxiliaries && wants_auxiliaries {
                        auxiliaries = false;
                    } else if downscale < max_downscale {
                        downscale *= 2;
                    } else {
                        break Err(e);
                    }
                    if let Some(lower) = settings.quality.lower() {
                        settings.quality = lower;
                    }
                    warn!(
                        "View {id:?}: {e}, retrying at {:?} quality, 1/{downscale} resolution, auxiliary targets {}",
                        settings.quality,
                        if auxiliaries { "on" } else { "off" }
                    );
                    entry.release_leases(container);
                }
                other => break other,
            }
        };

        match outcome {
            Ok(Some(mut frame)) if !entry.is_stale(epoch) => {
                frame.degraded = settings.quality != requested.quality
                    || (wants_auxiliaries && !auxiliaries)
                    || downscale > 1;
                entry.set_state(ViewState::Composited);
                Ok(FrameOutcome::Composited(frame))
            }
            Ok(_) => {
                debug!("View {id:?} discarded frame of epoch {epoch}");
                entry.set_state(ViewState::Idle);
                Ok(FrameOutcome::Cancelled)
            }
            Err(e) => {
                entry.set_state(ViewState::Idle);
                Err(e)
            }
        }
    }
}
