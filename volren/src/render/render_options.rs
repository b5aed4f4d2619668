use serde::{Deserialize, Serialize};

use crate::{
    common::ValueRange,
    error::{Result, VolrenError},
};

/// Sampling quality, mapped to a sampling rate factor.
/// The ray step is the base step divided by the factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Quality {
    VeryLow,
    Low,
    Normal,
    High,
    Higher,
    Highest,
}

impl Quality {
    pub const ALL: [Quality; 6] = [
        Quality::VeryLow,
        Quality::Low,
        Quality::Normal,
        Quality::High,
        Quality::Higher,
        Quality::Highest,
    ];

    pub fn sampling_factor(&self) -> f32 {
        match self {
            Quality::VeryLow => 0.2,
            Quality::Low => 0.5,
            Quality::Normal => 1.0,
            Quality::High => 2.0,
            Quality::Higher => 5.0,
            Quality::Highest => 10.0,
        }
    }

    /// Next tier down, `None` for the lowest
    pub fn lower(&self) -> Option<Quality> {
        let index = Quality::ALL.iter().position(|q| q == self)?;
        index.checked_sub(1).map(|i| Quality::ALL[i])
    }
}

impl Default for Quality {
    fn default() -> Self {
        Quality::Normal
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShadingMode {
    None,
    Phong,
    Toon,
}

/// Auxiliary first-hit buffers a downstream pass asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FirstHitOutputs {
    pub position: bool,
    pub normal: bool,
    pub shade: bool,
}

impl FirstHitOutputs {
    pub fn any(&self) -> bool {
        self.position || self.normal || self.shade
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StereoMode {
    Monoscopic,
    /// Left eye on the left half, right eye on the right half
    SideBySide,
    /// Red channel from the left eye, green and blue from the right
    Anaglyph,
    /// Even columns from the left eye, odd from the right
    Autostereoscopic,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StereoSettings {
    pub mode: StereoMode,
    /// World units between the eyes
    pub eye_distance: f32,
    /// Distance of the point both eyes look at
    pub focal_distance: f32,
}

impl Default for StereoSettings {
    fn default() -> Self {
        StereoSettings {
            mode: StereoMode::Monoscopic,
            eye_distance: 6.0,
            focal_distance: 200.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub fn index(&self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

/// Plane resampled by the slice renderer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlicePlane {
    pub axis: Axis,
    /// Position along the axis, `<0;1>` of the volume extent
    pub position: f32,
}

impl Default for SlicePlane {
    fn default() -> Self {
        SlicePlane {
            axis: Axis::Z,
            position: 0.5,
        }
    }
}

/// Per view render configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderSettings {
    pub resolution: (usize, usize),
    pub quality: Quality,
    /// Step multiplier while the camera is manipulated
    pub coarseness: f32,
    #[serde(skip)]
    interacting: bool,
    pub shading: ShadingMode,
    pub first_hit: FirstHitOutputs,
    pub stereo: StereoSettings,
    pub bounding_box: bool,
    pub ray_termination: bool,
    pub termination_threshold: f32,
    pub isovalue: f32,
    pub active_segment: Option<u16>,
    /// Samples outside of the range are skipped
    pub mask: Option<ValueRange>,
    pub ambient_occlusion: bool,
    pub slice: SlicePlane,
    pub background: [f32; 3],
    /// Split rows among threads
    pub multi_thread: bool,
}

impl Default for RenderSettings {
    fn default() -> Self {
        RenderSettings {
            resolution: (512, 512),
            quality: Quality::Normal,
            coarseness: 2.0,
            interacting: false,
            shading: ShadingMode::Phong,
            first_hit: FirstHitOutputs::default(),
            stereo: StereoSettings::default(),
            bounding_box: false,
            ray_termination: true,
            termination_threshold: 0.95,
            isovalue: 0.5,
            active_segment: None,
            mask: None,
            ambient_occlusion: false,
            slice: SlicePlane::default(),
            background: [0.0, 0.0, 0.0],
            multi_thread: true,
        }
    }
}

impl RenderSettings {
    pub fn builder() -> RenderSettingsBuilder {
        RenderSettingsBuilder {
            settings: RenderSettings::default(),
        }
    }

    /// Ray step in world units for a volume with voxel spacing `base_step`
    pub fn step_size(&self, base_step: f32) -> f32 {
        let step = base_step / self.quality.sampling_factor();
        if self.interacting {
            step * self.coarseness
        } else {
            step
        }
    }

    /// Camera manipulation started, coarser frames follow
    pub fn begin_interaction(&mut self) {
        self.interacting = true;
    }

    pub fn end_interaction(&mut self) {
        self.interacting = false;
    }

    pub fn is_interacting(&self) -> bool {
        self.interacting
    }

    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| Err(VolrenError::InvalidSettings(msg));
        if self.resolution.0 == 0 || self.resolution.1 == 0 {
            return fail(format!("resolution {:?}", self.resolution));
        }
        if !(self.coarseness >= 1.0) || !self.coarseness.is_finite() {
            return fail(format!("coarseness {} must be at least 1", self.coarseness));
        }
        if !(self.termination_threshold > 0.0 && self.termination_threshold <= 1.0) {
            return fail(format!(
                "termination threshold {} out of (0, 1]",
                self.termination_threshold
            ));
        }
        if !(self.stereo.eye_distance >= 0.0) || !(self.stereo.focal_distance > 0.0) {
            return fail(format!("stereo {:?}", self.stereo));
        }
        if !(0.0..=1.0).contains(&self.slice.position) {
            return fail(format!("slice position {}", self.slice.position));
        }
        Ok(())
    }
}

pub struct RenderSettingsBuilder {
    settings: RenderSettings,
}

impl RenderSettingsBuilder {
    pub fn resolution(mut self, resolution: (usize, usize)) -> Self {
        self.settings.resolution = resolution;
        self
    }

    pub fn quality(mut self, quality: Quality) -> Self {
        self.settings.quality = quality;
        self
    }

    pub fn coarseness(mut self, coarseness: f32) -> Self {
        self.settings.coarseness = coarseness;
        self
    }

    pub fn shading(mut self, shading: ShadingMode) -> Self {
        self.settings.shading = shading;
        self
    }

    pub fn first_hit(mut self, first_hit: FirstHitOutputs) -> Self {
        self.settings.first_hit = first_hit;
        self
    }

    pub fn stereo(mut self, stereo: StereoSettings) -> Self {
        self.settings.stereo = stereo;
        self
    }

    pub fn bounding_box(mut self, bounding_box: bool) -> Self {
        self.settings.bounding_box = bounding_box;
        self
    }

    pub fn early_ray_termination(mut self, ray_termination: bool) -> Self {
        self.settings.ray_termination = ray_termination;
        self
    }

    pub fn termination_threshold(mut self, threshold: f32) -> Self {
        self.settings.termination_threshold = threshold;
        self
    }

    pub fn isovalue(mut self, isovalue: f32) -> Self {
        self.settings.isovalue = isovalue;
        self
    }

    pub fn active_segment(mut self, segment: Option<u16>) -> Self {
        self.settings.active_segment = segment;
        self
    }

    pub fn mask(mut self, mask: Option<ValueRange>) -> Self {
        self.settings.mask = mask;
        self
    }

    pub fn ambient_occlusion(mut self, ambient_occlusion: bool) -> Self {
        self.settings.ambient_occlusion = ambient_occlusion;
        self
    }

    pub fn slice(mut self, slice: SlicePlane) -> Self {
        self.settings.slice = slice;
        self
    }

    pub fn background(mut self, background: [f32; 3]) -> Self {
        self.settings.background = background;
        self
    }

    pub fn multi_thread(mut self, multi_thread: bool) -> Self {
        self.settings.multi_thread = multi_thread;
        self
    }

    pub fn build(self) -> Result<RenderSettings> {
        self.settings.validate()?;
        Ok(self.settings)
    }

    /// Skip validation
    pub fn build_unchecked(self) -> RenderSettings {
        self.settings
    }
}
