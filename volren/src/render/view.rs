use std::f32::consts::{FRAC_PI_2, TAU};

use nalgebra::{Point3, Rotation3, Vector3};
use serde::{Deserialize, Serialize};

use crate::{
    camera::{Camera, PerspectiveCamera},
    volumetric::VolumeId,
};

use super::{RaycasterKind, RenderSettings};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ViewId(pub u32);

/// Layout of a logical view
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ViewKind {
    /// Single image
    Main,
    /// Grid of images, each orbited around the volume
    Multi { columns: usize, rows: usize },
    /// Main image with a side view inset in the upper right corner.
    /// `inset` is the inset size relative to the view.
    Over { inset: f32 },
    /// Images next to each other
    Split(usize),
    /// Images above each other
    Stack(usize),
}

impl Default for ViewKind {
    fn default() -> Self {
        ViewKind::Main
    }
}

impl ViewKind {
    /// Sub-view rectangles, later ones are drawn over earlier ones
    pub fn sub_viewports(&self) -> Vec<Viewport> {
        match *self {
            ViewKind::Main => vec![Viewport::full()],
            ViewKind::Multi { columns, rows } => {
                let (columns, rows) = (columns.max(1), rows.max(1));
                let w = 1.0 / columns as f32;
                let h = 1.0 / rows as f32;
                (0..rows)
                    .flat_map(|r| {
                        (0..columns).map(move |c| Viewport::new(c as f32 * w, r as f32 * h, w, h))
                    })
                    .collect()
            }
            ViewKind::Over { inset } => {
                let inset = inset.clamp(0.05, 1.0);
                vec![Viewport::full(), Viewport::new(1.0 - inset, 0.0, inset, inset)]
            }
            ViewKind::Split(n) => {
                let w = 1.0 / n.max(1) as f32;
                (0..n.max(1))
                    .map(|i| Viewport::new(i as f32 * w, 0.0, w, 1.0))
                    .collect()
            }
            ViewKind::Stack(n) => {
                let h = 1.0 / n.max(1) as f32;
                (0..n.max(1))
                    .map(|i| Viewport::new(0.0, i as f32 * h, 1.0, h))
                    .collect()
            }
        }
    }

    /// Rotation around the vertical axis of sub-view `index`
    fn orbit_angle(&self, index: usize, count: usize) -> f32 {
        match self {
            ViewKind::Main => 0.0,
            ViewKind::Over { .. } => index as f32 * FRAC_PI_2,
            _ => index as f32 * TAU / count.max(1) as f32,
        }
    }
}

/// Rectangle in normalized view coordinates, `(0,0)` is the upper left corner
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Viewport {
        Viewport {
            x,
            y,
            width,
            height,
        }
    }

    pub fn full() -> Viewport {
        Viewport::new(0.0, 0.0, 1.0, 1.0)
    }

    /// Pixel rectangle `(x, y, width, height)` on a `resolution` sized image.
    /// Neighbouring viewports share edges without gaps.
    pub fn pixel_rect(&self, resolution: (usize, usize)) -> (usize, usize, usize, usize) {
        let (w, h) = (resolution.0 as f32, resolution.1 as f32);
        let x0 = ((self.x * w).round() as usize).min(resolution.0.saturating_sub(1));
        let y0 = ((self.y * h).round() as usize).min(resolution.1.saturating_sub(1));
        let x1 = (((self.x + self.width) * w).round() as usize).min(resolution.0);
        let y1 = (((self.y + self.height) * h).round() as usize).min(resolution.1);
        (x0, y0, (x1.saturating_sub(x0)).max(1), (y1.saturating_sub(y0)).max(1))
    }
}

/// Compositor state of a view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViewState {
    Idle,
    Rendering,
    Composited,
}

impl Default for ViewState {
    fn default() -> Self {
        ViewState::Idle
    }
}

/// One part of a view rendered by its own raycaster pass
#[derive(Debug, Clone)]
pub struct SubView {
    pub index: usize,
    pub viewport: Viewport,
    /// Pixel rectangle inside the view framebuffer
    pub rect: (usize, usize, usize, usize),
    pub camera: PerspectiveCamera,
}

/// Everything needed to render a view.
/// Views do not own textures, they only lease them.
#[derive(Debug, Clone)]
pub struct ViewDescriptor {
    pub id: ViewId,
    pub kind: ViewKind,
    pub volume: VolumeId,
    pub raycaster: RaycasterKind,
    pub settings: RenderSettings,
    pub camera: PerspectiveCamera,
}

impl ViewDescriptor {
    pub fn new(
        id: ViewId,
        kind: ViewKind,
        volume: VolumeId,
        raycaster: RaycasterKind,
        settings: RenderSettings,
        camera: PerspectiveCamera,
    ) -> ViewDescriptor {
        ViewDescriptor {
            id,
            kind,
            volume,
            raycaster,
            settings,
            camera,
        }
    }

    /// Sub-views with cameras orbited around `pivot`
    pub fn sub_views(&self, pivot: Point3<f32>) -> Vec<SubView> {
        let viewports = self.kind.sub_viewports();
        let count = viewports.len();
        viewports
            .into_iter()
            .enumerate()
            .map(|(index, viewport)| {
                let rect = viewport.pixel_rect(self.settings.resolution);
                let angle = self.kind.orbit_angle(index, count);
                let mut camera = orbit(&self.camera, pivot, angle);
                camera.set_aspect(rect.2 as f32 / rect.3 as f32);
                SubView {
                    index,
                    viewport,
                    rect,
                    camera,
                }
            })
            .collect()
    }
}

/// Camera rotated by `angle` around the vertical axis through `pivot`
pub fn orbit(camera: &PerspectiveCamera, pivot: Point3<f32>, angle: f32) -> PerspectiveCamera {
    if angle == 0.0 {
        return camera.clone();
    }
    let rotation = Rotation3::from_axis_angle(&Vector3::y_axis(), angle);
    let position = pivot + rotation * (camera.get_position() - pivot);
    let mut rotated = camera.clone();
    rotated.set_pos(position);
    rotated.set_direction(rotation * camera.get_direction());
    rotated
}

#[cfg(test)]
mod test {
    use nalgebra::{point, vector};

    use super::*;

    #[test]
    fn sub_viewport_counts() {
        assert_eq!(ViewKind::Main.sub_viewports().len(), 1);
        assert_eq!(ViewKind::Multi { columns: 3, rows: 2 }.sub_viewports().len(), 6);
        assert_eq!(ViewKind::Over { inset: 0.25 }.sub_viewports().len(), 2);
        assert_eq!(ViewKind::Split(4).sub_viewports().len(), 4);
        assert_eq!(ViewKind::Stack(3).sub_viewports().len(), 3);
    }

    #[test]
    fn split_tiles_without_gaps() {
        let rects: Vec<_> = ViewKind::Split(3)
            .sub_viewports()
            .iter()
            .map(|v| v.pixel_rect((100, 50)))
            .collect();
        assert_eq!(rects[0].0, 0);
        for pair in rects.windows(2) {
            assert_eq!(pair[0].0 + pair[0].2, pair[1].0);
        }
        let last = rects[2];
        assert_eq!(last.0 + last.2, 100);
        assert!(rects.iter().all(|r| r.1 == 0 && r.3 == 50));
    }

    #[test]
    fn inset_sits_in_upper_right() {
        let viewports = ViewKind::Over { inset: 0.25 }.sub_viewports();
        assert_eq!(viewports[1].pixel_rect((200, 100)), (150, 0, 50, 25));
    }

    #[test]
    fn orbit_keeps_distance_and_target() {
        let pivot = point![0.0, 0.0, 0.0];
        let camera = PerspectiveCamera::look_at(point![0.0, 0.0, 10.0], pivot);
        let side = orbit(&camera, pivot, FRAC_PI_2);
        assert!((side.get_position() - point![10.0, 0.0, 0.0]).magnitude() < 1e-4);
        assert!((side.get_direction() - vector![-1.0, 0.0, 0.0]).magnitude() < 1e-4);
    }

    #[test]
    fn multi_view_cameras_differ() {
        let camera = PerspectiveCamera::look_at(point![0.0, 0.0, 10.0], point![0.0, 0.0, 0.0]);
        let view = ViewDescriptor::new(
            ViewId(0),
            ViewKind::Multi { columns: 2, rows: 2 },
            VolumeId(0),
            RaycasterKind::SimpleDvr,
            RenderSettings::default(),
            camera,
        );
        let subs = view.sub_views(point![0.0, 0.0, 0.0]);
        assert_eq!(subs.len(), 4);
        assert_ne!(subs[0].camera.get_position(), subs[1].camera.get_position());
        assert_eq!(subs[3].rect, (256, 256, 256, 256));
    }
}
