use std::ops::Range;

use log::debug;
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::{
    camera::Camera,
    color::{self, RGBA},
    common::Ray,
    error::{Result, VolrenError},
    texture::TextureData,
    transfer_function::{BakedLookup, Sample, TfSnapshot},
    volumetric::Volume,
};

use super::{
    compositing::RayAccumulator,
    shading::{self, normal_from_gradient},
    RenderSettings, ShadingMode,
};

/// Bisection steps refining an isosurface crossing
const ISO_REFINEMENT: usize = 8;

/// Raycasting algorithm of a view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RaycasterKind {
    /// Axis aligned plane resample, no marching
    Slice,
    SimpleDvr,
    /// Shaded, gradient aware DVR
    FancyDvr,
    /// Maximum intensity projection
    Mip,
    XRay,
    Isosurface,
    /// DVR of a single segment
    LabelAware,
}

impl RaycasterKind {
    pub const ALL: [RaycasterKind; 7] = [
        RaycasterKind::Slice,
        RaycasterKind::SimpleDvr,
        RaycasterKind::FancyDvr,
        RaycasterKind::Mip,
        RaycasterKind::XRay,
        RaycasterKind::Isosurface,
        RaycasterKind::LabelAware,
    ];
}

impl Default for RaycasterKind {
    fn default() -> Self {
        RaycasterKind::SimpleDvr
    }
}

/// Textures a render pass writes.
/// All targets must have the size of `color`.
pub struct RenderTargets<'t> {
    pub color: &'t mut TextureData,
    pub depth: Option<&'t mut TextureData>,
    pub first_hit_position: Option<&'t mut TextureData>,
    pub first_hit_normal: Option<&'t mut TextureData>,
    pub first_hit_shade: Option<&'t mut TextureData>,
    pub ambient_occlusion: Option<&'t mut TextureData>,
}

impl<'t> RenderTargets<'t> {
    pub fn color_only(color: &'t mut TextureData) -> RenderTargets<'t> {
        RenderTargets {
            color,
            depth: None,
            first_hit_position: None,
            first_hit_normal: None,
            first_hit_shade: None,
            ambient_occlusion: None,
        }
    }

    pub fn resolution(&self) -> (usize, usize) {
        (self.color.width(), self.color.height())
    }

    fn auxiliaries(&self) -> impl Iterator<Item = &TextureData> {
        [
            self.depth.as_deref(),
            self.first_hit_position.as_deref(),
            self.first_hit_normal.as_deref(),
            self.first_hit_shade.as_deref(),
            self.ambient_occlusion.as_deref(),
        ]
        .into_iter()
        .flatten()
    }

    fn wants_first_hit(&self) -> bool {
        self.first_hit_position.is_some()
            || self.first_hit_normal.is_some()
            || self.first_hit_shade.is_some()
            || self.ambient_occlusion.is_some()
    }
}

/// Summary of a finished pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderedImage {
    pub kind: RaycasterKind,
    pub width: usize,
    pub height: usize,
    /// World units between samples
    pub step_size: f32,
    pub rays_hit: usize,
    pub samples: usize,
    pub early_terminations: usize,
}

#[derive(Debug, Clone, Copy)]
struct FirstHit {
    position: Point3<f32>,
    normal: Vector3<f32>,
    shade: Vector3<f32>,
    occlusion: f32,
}

#[derive(Debug, Clone, Copy)]
struct RayResult {
    color: RGBA,
    depth: f32,
    first_hit: Option<FirstHit>,
    hit: bool,
    samples: usize,
    terminated: bool,
}

impl RayResult {
    fn miss(background: Vector3<f32>) -> RayResult {
        RayResult {
            color: color::from_rgb(background, 0.0),
            depth: f32::INFINITY,
            first_hit: None,
            hit: false,
            samples: 0,
            terminated: false,
        }
    }
}

/// Stateless raycaster of one kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Raycaster {
    kind: RaycasterKind,
}

impl Raycaster {
    pub fn new(kind: RaycasterKind) -> Raycaster {
        Raycaster { kind }
    }

    pub fn kind(&self) -> RaycasterKind {
        self.kind
    }

    /// Render `volume` into `targets`.
    ///
    /// Image size is given by the color target, pixel `(0,0)` is the upper left corner.
    /// Pixels the volume does not cover get the background with zero alpha.
    pub fn render<V, C>(
        &self,
        volume: &V,
        tf: &TfSnapshot,
        camera: &C,
        settings: &RenderSettings,
        mut targets: RenderTargets,
    ) -> Result<RenderedImage>
    where
        V: Volume + Sync + ?Sized,
        C: Camera + Sync,
    {
        let (width, height) = targets.resolution();
        if width == 0 || height == 0 {
            return Err(VolrenError::InvalidSettings(format!(
                "empty render target {width}x{height}"
            )));
        }
        if let Some(aux) = targets
            .auxiliaries()
            .find(|t| t.width() != width || t.height() != height)
        {
            return Err(VolrenError::InvalidSettings(format!(
                "auxiliary target {}x{} does not match color target {width}x{height}",
                aux.width(),
                aux.height()
            )));
        }

        let base_step = volume.get_scale().min();
        let step = settings.step_size(base_step);
        if !(step > 0.0) || !step.is_finite() {
            return Err(VolrenError::InvalidSettings(format!("step size {step}")));
        }

        let tracer = Tracer {
            kind: self.kind,
            volume,
            lookup: &tf.lookup,
            settings,
            step,
            step_ratio: step / base_step,
            background: Vector3::from(settings.background),
            first_hit: targets.wants_first_hit(),
            occlusion: settings.ambient_occlusion && targets.ambient_occlusion.is_some(),
        };

        let tile = camera.project_box(volume.get_bound_box());
        let (xs, ys) = tile.get_pixel_range((width, height));

        let rows = trace_rows(
            &tracer,
            camera,
            (width, height),
            xs.clone(),
            ys.clone(),
            settings.multi_thread,
        );

        let mut image = RenderedImage {
            kind: self.kind,
            width,
            height,
            step_size: step,
            rays_hit: 0,
            samples: 0,
            early_terminations: 0,
        };

        let miss = RayResult::miss(tracer.background);
        for y in 0..height {
            let row = if ys.contains(&y) {
                rows.get(y - ys.start)
            } else {
                None
            };
            for x in 0..width {
                let result = match row {
                    Some(row) if xs.contains(&x) => &row[x - xs.start],
                    _ => &miss,
                };
                image.rays_hit += result.hit as usize;
                image.samples += result.samples;
                image.early_terminations += result.terminated as usize;
                write_pixel(&mut targets, x, y, result);
            }
        }

        debug!(
            "{:?} pass {}x{} step {} hit {} samples {} terminated {}",
            self.kind,
            width,
            height,
            step,
            image.rays_hit,
            image.samples,
            image.early_terminations
        );

        Ok(image)
    }
}

fn write_pixel(targets: &mut RenderTargets, x: usize, y: usize, result: &RayResult) {
    targets.color.set_texel(x, y, result.color.as_slice());
    if let Some(depth) = targets.depth.as_deref_mut() {
        depth.set_texel(x, y, &[result.depth]);
    }

    let hit = result.first_hit.as_ref();
    if let Some(t) = targets.first_hit_position.as_deref_mut() {
        let v = hit.map_or([0.0; 4], |h| [h.position.x, h.position.y, h.position.z, 1.0]);
        t.set_texel(x, y, &v);
    }
    if let Some(t) = targets.first_hit_normal.as_deref_mut() {
        let v = hit.map_or([0.0; 4], |h| [h.normal.x, h.normal.y, h.normal.z, 1.0]);
        t.set_texel(x, y, &v);
    }
    if let Some(t) = targets.first_hit_shade.as_deref_mut() {
        let v = hit.map_or([0.0; 4], |h| [h.shade.x, h.shade.y, h.shade.z, 1.0]);
        t.set_texel(x, y, &v);
    }
    if let Some(t) = targets.ambient_occlusion.as_deref_mut() {
        let v = hit.map_or([1.0; 4], |h| [h.occlusion, h.occlusion, h.occlusion, 1.0]);
        t.set_texel(x, y, &v);
    }
}

/// Trace the rows `ys` of the tile, rows are split among scoped threads
fn trace_rows<V, C>(
    tracer: &Tracer<V>,
    camera: &C,
    resolution: (usize, usize),
    xs: Range<usize>,
    ys: Range<usize>,
    multi_thread: bool,
) -> Vec<Vec<RayResult>>
where
    V: Volume + Sync + ?Sized,
    C: Camera + Sync,
{
    let trace_row = |y: usize| -> Vec<RayResult> {
        let y_norm = (y as f32 + 0.5) / resolution.1 as f32;
        xs.clone()
            .map(|x| {
                let x_norm = (x as f32 + 0.5) / resolution.0 as f32;
                tracer.trace(&camera.get_ray((x_norm, y_norm)))
            })
            .collect()
    };

    let threads = if multi_thread {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
            .min(ys.len())
    } else {
        1
    };

    if threads <= 1 {
        return ys.map(trace_row).collect();
    }

    let chunk = (ys.len() + threads - 1) / threads;
    let trace_row = &trace_row;
    std::thread::scope(|s| {
        let handles: Vec<_> = ys
            .clone()
            .step_by(chunk)
            .map(|start| {
                let end = (start + chunk).min(ys.end);
                s.spawn(move || (start..end).map(trace_row).collect::<Vec<_>>())
            })
            .collect();

        handles
            .into_iter()
            .flat_map(|h| h.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
            .collect()
    })
}

/// Per frame state shared by all rays
struct Tracer<'a, V: ?Sized> {
    kind: RaycasterKind,
    volume: &'a V,
    lookup: &'a BakedLookup,
    settings: &'a RenderSettings,
    step: f32,
    /// Step relative to the voxel spacing, used for opacity correction
    step_ratio: f32,
    background: Vector3<f32>,
    first_hit: bool,
    occlusion: bool,
}

impl<'a, V> Tracer<'a, V>
where
    V: Volume + ?Sized,
{
    fn trace(&self, ray: &Ray) -> RayResult {
        match self.kind {
            RaycasterKind::Slice => self.slice(ray),
            RaycasterKind::SimpleDvr | RaycasterKind::FancyDvr | RaycasterKind::LabelAware => {
                self.composite(ray)
            }
            RaycasterKind::Mip => self.max_intensity(ray),
            RaycasterKind::XRay => self.xray(ray),
            RaycasterKind::Isosurface => self.isosurface(ray),
        }
    }

    fn masked(&self, intensity: f32) -> bool {
        matches!(self.settings.mask, Some(mask) if !mask.contains(intensity))
    }

    /// Sample positions of the ray inside the volume, `t0` is always sampled
    fn marching(&self, ray: &Ray) -> Option<impl Iterator<Item = (f32, Point3<f32>)> + '_> {
        let (t0, t1) = self.volume.intersect(ray)?;
        let steps = ((t1 - t0) / self.step).floor().max(0.0) as usize + 1;
        let origin = ray.point_from_t(t0);
        let step = ray.get_direction() * self.step;
        Some((0..steps).map(move |k| {
            let world = origin + step * k as f32;
            (t0 + k as f32 * self.step, self.volume.world_to_volume(&world))
        }))
    }

    fn make_first_hit(&self, ray: &Ray, vol_pos: Point3<f32>, rgb: Vector3<f32>) -> FirstHit {
        let (_, gradient) = self.volume.sample_at_gradient(vol_pos);
        let normal = normal_from_gradient(&gradient);
        let shade = shading::shade(self.settings.shading, rgb, normal, &-ray.get_direction());
        let occlusion = if self.occlusion {
            shading::ambient_occlusion(self.volume, self.lookup, vol_pos)
        } else {
            1.0
        };
        FirstHit {
            position: self.volume.volume_to_world(&vol_pos),
            normal: normal.unwrap_or_else(Vector3::zeros),
            shade,
            occlusion,
        }
    }

    fn finish(
        &self,
        acc: &RayAccumulator,
        samples: usize,
        terminated: bool,
        depth: f32,
        first_hit: Option<FirstHit>,
    ) -> RayResult {
        RayResult {
            color: acc.finish(self.background),
            depth,
            first_hit,
            hit: true,
            samples,
            terminated,
        }
    }

    fn slice(&self, ray: &Ray) -> RayResult {
        let miss = RayResult::miss(self.background);
        let axis = self.settings.slice.axis.index();
        let bbox = self.volume.get_bound_box();
        let plane = bbox.lower[axis] + self.settings.slice.position * bbox.dims()[axis];

        let dir = ray.get_direction()[axis];
        if dir.abs() < f32::EPSILON {
            return miss;
        }
        let t = (plane - ray.origin[axis]) / dir;
        if t < 0.0 {
            return miss;
        }
        let mut world = ray.point_from_t(t);
        world[axis] = plane;
        if !bbox.contains(&world) {
            return miss;
        }

        let vol_pos = self.volume.world_to_volume(&world);
        let intensity = self.volume.sample_at(vol_pos);
        let mut acc = RayAccumulator::new();
        if !self.masked(intensity) {
            acc.accumulate(self.lookup.classify(Sample::Intensity(intensity)), 1.0);
        }
        let first_hit = (self.first_hit && acc.opacity() > 0.0)
            .then(|| self.make_first_hit(ray, vol_pos, acc.color() / acc.opacity()));
        self.finish(&acc, 1, false, t, first_hit)
    }

    /// Front to back compositing shared by the DVR variants
    fn composite(&self, ray: &Ray) -> RayResult {
        let samples_iter = match self.marching(ray) {
            Some(it) => it,
            None => return RayResult::miss(self.background),
        };

        let fancy = self.kind == RaycasterKind::FancyDvr;
        let segment = match self.kind {
            RaycasterKind::LabelAware => self.settings.active_segment,
            _ => None,
        };
        let view_dir_neg = -ray.get_direction();
        let terminate = self.settings.ray_termination;
        let threshold = self.settings.termination_threshold;

        let mut acc = RayAccumulator::new();
        let mut samples = 0;
        let mut terminated = false;
        let mut depth = f32::INFINITY;
        let mut first_hit = None;

        for (t, pos) in samples_iter {
            samples += 1;
            if let Some(segment) = segment {
                if self.volume.label_at(pos) != Some(segment) {
                    continue;
                }
            }

            let (intensity, gradient) = if fancy {
                let (i, g) = self.volume.sample_at_gradient(pos);
                (i, Some(g))
            } else {
                (self.volume.sample_at(pos), None)
            };
            if self.masked(intensity) {
                continue;
            }

            let sample = match (&gradient, self.lookup.is_2d()) {
                (Some(g), true) => {
                    Sample::IntensityGradient(intensity, self.volume.normalized_gradient_magnitude(g))
                }
                _ => Sample::Intensity(intensity),
            };
            let mut rgba = self.lookup.classify(sample);
            if rgba.w <= 0.0 {
                continue;
            }

            if let Some(g) = &gradient {
                if self.settings.shading != ShadingMode::None {
                    let lit = shading::shade(
                        self.settings.shading,
                        rgba.xyz(),
                        normal_from_gradient(g),
                        &view_dir_neg,
                    );
                    rgba = color::from_rgb(lit, rgba.w);
                }
            }

            if depth.is_infinite() {
                depth = t;
                if self.first_hit {
                    first_hit = Some(self.make_first_hit(ray, pos, rgba.xyz()));
                }
            }

            acc.accumulate(rgba, self.step_ratio);

            if terminate && acc.is_saturated(threshold) {
                terminated = true;
                break;
            }
        }

        self.finish(&acc, samples, terminated, depth, first_hit)
    }

    fn max_intensity(&self, ray: &Ray) -> RayResult {
        let samples_iter = match self.marching(ray) {
            Some(it) => it,
            None => return RayResult::miss(self.background),
        };

        let mut max: Option<(f32, f32, Point3<f32>)> = None;
        let mut samples = 0;
        for (t, pos) in samples_iter {
            samples += 1;
            let intensity = self.volume.sample_at(pos);
            if self.masked(intensity) {
                continue;
            }
            if max.map_or(true, |(m, _, _)| intensity > m) {
                max = Some((intensity, t, pos));
            }
        }

        let mut acc = RayAccumulator::new();
        let (depth, first_hit) = match max {
            Some((intensity, t, pos)) => {
                let rgba = self.lookup.classify(Sample::Intensity(intensity));
                acc.accumulate(rgba, 1.0);
                let hit = self.first_hit.then(|| self.make_first_hit(ray, pos, rgba.xyz()));
                (t, hit)
            }
            None => (f32::INFINITY, None),
        };
        self.finish(&acc, samples, false, depth, first_hit)
    }

    fn xray(&self, ray: &Ray) -> RayResult {
        let samples_iter = match self.marching(ray) {
            Some(it) => it,
            None => return RayResult::miss(self.background),
        };

        let mut sum = 0.0;
        let mut samples = 0;
        for (_, pos) in samples_iter {
            samples += 1;
            let intensity = self.volume.sample_at(pos);
            if !self.masked(intensity) {
                sum += intensity * self.step;
            }
        }

        let diagonal = self.volume.get_bound_box().diagonal();
        let value = if diagonal > 0.0 {
            (sum / diagonal).min(1.0)
        } else {
            0.0
        };
        let mut acc = RayAccumulator::new();
        acc.accumulate(color::mono(1.0, value), 1.0);
        self.finish(&acc, samples, false, f32::INFINITY, None)
    }

    fn isosurface(&self, ray: &Ray) -> RayResult {
        let samples_iter = match self.marching(ray) {
            Some(it) => it,
            None => return RayResult::miss(self.background),
        };

        let iso = self.settings.isovalue;
        let mut samples = 0;
        let mut prev: Option<f32> = None;
        let mut crossing = None;

        for (t, pos) in samples_iter {
            samples += 1;
            let intensity = self.volume.sample_at(pos);
            if self.masked(intensity) {
                prev = None;
                continue;
            }
            if intensity >= iso {
                crossing = Some(match prev {
                    Some(t_prev) => self.refine_crossing(ray, t_prev, t),
                    None => t,
                });
                break;
            }
            prev = Some(t);
        }

        let t = match crossing {
            Some(t) => t,
            None => {
                let mut miss = RayResult::miss(self.background);
                miss.samples = samples;
                miss.hit = true;
                return miss;
            }
        };

        let vol_pos = self.volume.world_to_volume(&ray.point_from_t(t));
        let (_, gradient) = self.volume.sample_at_gradient(vol_pos);
        let base = self.lookup.classify(Sample::Intensity(iso)).xyz();
        let lit = shading::shade(
            self.settings.shading,
            base,
            normal_from_gradient(&gradient),
            &-ray.get_direction(),
        );

        let mut acc = RayAccumulator::new();
        acc.accumulate(color::from_rgb(lit, 1.0), 1.0);
        let first_hit = self.first_hit.then(|| self.make_first_hit(ray, vol_pos, base));
        self.finish(&acc, samples, false, t, first_hit)
    }

    /// Bisection between a sample below and a sample at or above the isovalue
    fn refine_crossing(&self, ray: &Ray, mut below: f32, mut above: f32) -> f32 {
        let iso = self.settings.isovalue;
        for _ in 0..ISO_REFINEMENT {
            let mid = 0.5 * (below + above);
            let pos = self.volume.world_to_volume(&ray.point_from_t(mid));
            if self.volume.sample_at(pos) >= iso {
                above = mid;
            } else {
                below = mid;
            }
        }
        above
    }
}

#[cfg(test)]
mod test {
    use nalgebra::{point, vector};

    use super::*;
    use crate::{
        camera::PerspectiveCamera,
        render::{Axis, FirstHitOutputs, SlicePlane},
        test_helpers::{
            camera_facing, constant_tf, labeled_volume, ramp_volume, tf_snapshot, uniform_volume,
        },
        texture::{AuxiliaryKind, TextureSpec},
        transfer_function::TransferFunction,
        volumetric::LinearVolume,
    };

    fn constant(r: f32, g: f32, b: f32, a: f32) -> TfSnapshot {
        tf_snapshot(constant_tf(color::new(r, g, b, a)))
    }

    fn settings(res: usize) -> RenderSettings {
        RenderSettings::builder()
            .resolution((res, res))
            .shading(ShadingMode::None)
            .build()
            .unwrap()
    }

    fn render(
        kind: RaycasterKind,
        volume: &LinearVolume,
        tf: &TfSnapshot,
        settings: &RenderSettings,
    ) -> (TextureData, RenderedImage) {
        let (w, h) = settings.resolution;
        let mut color = TextureData::new(&TextureSpec::color(w, h));
        let camera = camera_facing(volume);
        let image = Raycaster::new(kind)
            .render(volume, tf, &camera, settings, RenderTargets::color_only(&mut color))
            .unwrap();
        (color, image)
    }

    #[test]
    fn center_pixel_hits_and_corner_misses() {
        let volume = uniform_volume(16, 128);
        let tf = constant(1.0, 0.0, 0.0, 1.0);
        let (color, image) = render(RaycasterKind::SimpleDvr, &volume, &tf, &settings(16));
        assert_eq!(color.texel(8, 8), &[1.0, 0.0, 0.0, 1.0]);
        assert_eq!(color.texel(0, 0), &[0.0, 0.0, 0.0, 0.0]);
        assert!(image.rays_hit > 0 && image.rays_hit < 256);
    }

    #[test]
    fn opaque_function_terminates_early() {
        let volume = uniform_volume(16, 128);
        let tf = constant(0.0, 1.0, 0.0, 1.0);
        let (_, image) = render(RaycasterKind::SimpleDvr, &volume, &tf, &settings(8));
        assert_eq!(image.early_terminations, image.rays_hit);
        assert_eq!(image.samples, image.rays_hit);

        let no_termination = RenderSettings::builder()
            .resolution((8, 8))
            .early_ray_termination(false)
            .build()
            .unwrap();
        let (_, full) = render(RaycasterKind::SimpleDvr, &volume, &tf, &no_termination);
        assert_eq!(full.early_terminations, 0);
        assert!(full.samples > image.samples);
    }

    #[test]
    fn mask_hides_everything_outside() {
        let volume = uniform_volume(8, 128);
        let tf = constant(1.0, 1.0, 1.0, 1.0);
        let masked = RenderSettings::builder()
            .resolution((8, 8))
            .mask(Some(crate::common::ValueRange::new(0.9, 1.0)))
            .build()
            .unwrap();
        for kind in [RaycasterKind::SimpleDvr, RaycasterKind::Mip, RaycasterKind::Slice] {
            let (color, _) = render(kind, &volume, &tf, &masked);
            assert_eq!(color.texel(4, 4)[3], 0.0, "{kind:?}");
        }
    }

    #[test]
    fn mip_takes_maximum() {
        let volume = ramp_volume(16);
        let tf = tf_snapshot(TransferFunction::default());
        let (color, _) = render(RaycasterKind::Mip, &volume, &tf, &settings(8));
        // standard function, white at the maximum of the ramp
        let texel = color.texel(6, 4);
        assert!(texel[3] > 0.8, "{texel:?}");
    }

    #[test]
    fn xray_grows_with_density() {
        let tf = tf_snapshot(TransferFunction::default());
        let (faint, _) = render(RaycasterKind::XRay, &uniform_volume(8, 40), &tf, &settings(8));
        let (dense, _) = render(RaycasterKind::XRay, &uniform_volume(8, 200), &tf, &settings(8));
        assert!(dense.texel(4, 4)[0] > faint.texel(4, 4)[0]);
    }

    #[test]
    fn isosurface_misses_below_isovalue() {
        let tf = constant(1.0, 1.0, 0.0, 1.0);
        let settings = RenderSettings::builder()
            .resolution((8, 8))
            .isovalue(0.9)
            .shading(ShadingMode::None)
            .build()
            .unwrap();
        let (color, _) = render(RaycasterKind::Isosurface, &uniform_volume(8, 100), &tf, &settings);
        assert_eq!(color.texel(4, 4)[3], 0.0);
        let (color, _) = render(RaycasterKind::Isosurface, &uniform_volume(8, 250), &tf, &settings);
        assert_eq!(color.texel(4, 4), &[1.0, 1.0, 0.0, 1.0]);
    }

    #[test]
    fn isosurface_crossing_is_refined() {
        let volume = ramp_volume(16);
        let ray = Ray::new(point![-5.0, 7.5, 7.5], vector![1.0, 0.0, 0.0]);
        let tf = constant(1.0, 1.0, 1.0, 1.0);
        let settings = RenderSettings::builder().isovalue(0.5).build().unwrap();
        let tracer = Tracer {
            kind: RaycasterKind::Isosurface,
            volume: &volume,
            lookup: &tf.lookup,
            settings: &settings,
            step: 1.0,
            step_ratio: 1.0,
            background: Vector3::zeros(),
            first_hit: true,
            occlusion: false,
        };
        let result = tracer.trace(&ray);
        // ramp along x reaches 0.5 in the middle of the volume
        let hit = result.first_hit.unwrap();
        assert!((hit.position.x - 7.5).abs() < 0.1, "{:?}", hit.position);
    }

    #[test]
    fn label_aware_shows_only_active_segment() {
        let volume = labeled_volume(8);
        let tf = constant(1.0, 1.0, 1.0, 1.0);
        let camera = PerspectiveCamera::look_at(point![3.5, 3.5, 14.0], point![3.5, 3.5, 3.5]);
        let settings = RenderSettings::builder()
            .resolution((16, 16))
            .active_segment(Some(1))
            .build()
            .unwrap();
        let mut color = TextureData::new(&TextureSpec::color(16, 16));
        Raycaster::new(RaycasterKind::LabelAware)
            .render(&volume, &tf, &camera, &settings, RenderTargets::color_only(&mut color))
            .unwrap();
        // segment 1 holds the lower x half
        assert!(color.texel(4, 8)[3] > 0.0);
        assert_eq!(color.texel(12, 8)[3], 0.0);
    }

    #[test]
    fn slice_samples_plane() {
        let volume = ramp_volume(16);
        let tf = tf_snapshot(TransferFunction::default());
        let settings = RenderSettings::builder()
            .resolution((8, 8))
            .slice(SlicePlane {
                axis: Axis::Z,
                position: 0.5,
            })
            .build()
            .unwrap();
        let (color, image) = render(RaycasterKind::Slice, &volume, &tf, &settings);
        assert_eq!(image.samples, image.rays_hit);
        // ramp rises along x
        assert!(color.texel(5, 4)[3] > color.texel(2, 4)[3]);
    }

    #[test]
    fn first_hit_targets_are_written() {
        let volume = uniform_volume(8, 128);
        let tf = constant(1.0, 0.0, 0.0, 1.0);
        let settings = RenderSettings::builder()
            .resolution((8, 8))
            .first_hit(FirstHitOutputs {
                position: true,
                normal: true,
                shade: true,
            })
            .build()
            .unwrap();
        let mut color = TextureData::new(&TextureSpec::color(8, 8));
        let mut position = TextureData::new(&TextureSpec::auxiliary(AuxiliaryKind::FirstHitPosition, 8, 8));
        let mut depth = TextureData::new(&TextureSpec::depth(8, 8));
        let targets = RenderTargets {
            color: &mut color,
            depth: Some(&mut depth),
            first_hit_position: Some(&mut position),
            first_hit_normal: None,
            first_hit_shade: None,
            ambient_occlusion: None,
        };
        let camera = camera_facing(&volume);
        Raycaster::new(RaycasterKind::SimpleDvr)
            .render(&volume, &tf, &camera, &settings, targets)
            .unwrap();

        let hit = position.texel(4, 4);
        assert_eq!(hit[3], 1.0);
        // first hit lies on the front face
        assert!((hit[2] - 7.0).abs() < 1e-3, "{hit:?}");
        assert!(depth.texel(4, 4)[0].is_finite());
        assert_eq!(position.texel(0, 0), &[0.0; 4]);
        assert!(depth.texel(0, 0)[0].is_infinite());
    }

    #[test]
    fn mismatched_targets_are_rejected() {
        let volume = uniform_volume(4, 128);
        let tf = constant(1.0, 0.0, 0.0, 1.0);
        let mut color = TextureData::new(&TextureSpec::color(8, 8));
        let mut depth = TextureData::new(&TextureSpec::depth(4, 4));
        let mut targets = RenderTargets::color_only(&mut color);
        targets.depth = Some(&mut depth);
        let res = Raycaster::new(RaycasterKind::SimpleDvr).render(
            &volume,
            &tf,
            &camera_facing(&volume),
            &settings(8),
            targets,
        );
        assert!(matches!(res, Err(VolrenError::InvalidSettings(_))));
    }

    #[test]
    fn single_and_multi_thread_agree() {
        let volume = ramp_volume(16);
        let tf = tf_snapshot(TransferFunction::default());
        let mut single = settings(12);
        single.multi_thread = false;
        let (a, _) = render(RaycasterKind::FancyDvr, &volume, &tf, &single);
        let (b, _) = render(RaycasterKind::FancyDvr, &volume, &tf, &settings(12));
        assert_eq!(a.as_slice(), b.as_slice());
    }
}
