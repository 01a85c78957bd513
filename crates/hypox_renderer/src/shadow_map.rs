//! Depth maps rendered from a light's point of view.
//!
//! A `ShadowMap` goes through three states: created (no camera), initialized
//! (light camera placed) and generated (depth buffer filled). Only a generated
//! map has occluder information; every query against an incomplete map
//! reports the point as lit.
//!
//! Besides depth, each texel keeps the screen-space depth gradient of the
//! triangle that won it. Queries evaluate the occluder's plane at the exact
//! projected position instead of at the texel center, so a surface never
//! shadows itself however steeply it faces the light.

use hypox_core::Object;
use hypox_math::{Interval, Mat4Ext, Vec2, Vec3};
use thiserror::Error;

use crate::camera::{Camera, CameraError};
use crate::raster::{self, ClipVertex, Fragment, ScreenTriangle};

/// Near-plane distance of light cameras.
pub const SHADOW_FOCAL_LENGTH: f32 = 0.05;

/// Depth slack allowed before a point counts as occluded.
pub const SHADOW_BIAS: f32 = 5e-5;

/// NDC depths recorded by light passes.
const LIGHT_DEPTH_RANGE: Interval = Interval { min: -1.0, max: 0.0 };

/// Errors raised while building light visibility data.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ShadowMapError {
    #[error("Shadow map must be initialized before rendering")]
    NotInitialized,

    #[error("Shadow map resolution must be non-zero, got {0}x{1}")]
    ZeroResolution(u32, u32),

    #[error(transparent)]
    Camera(#[from] CameraError),
}

/// Result of a visibility query against one map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// At or in front of the nearest recorded surface
    Lit,
    /// Behind the nearest recorded surface
    Shadowed,
    /// Outside the map's frustum or the map has no data
    OutOfView,
}

impl Visibility {
    /// Out-of-view points count as lit.
    pub fn is_lit(self) -> bool {
        !matches!(self, Visibility::Shadowed)
    }
}

/// A single-view depth buffer.
#[derive(Clone, Debug)]
pub struct ShadowMap {
    width: u32,
    height: u32,
    camera: Option<Camera>,
    depth: Vec<f32>,
    /// NDC depth change per NDC x and y of the nearest triangle
    slopes: Vec<Vec2>,
    generated: bool,
}

impl ShadowMap {
    /// Create an uninitialized map.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            camera: None,
            depth: vec![1.0; width as usize * height as usize],
            slopes: vec![Vec2::ZERO; width as usize * height as usize],
            generated: false,
        }
    }

    /// Place the light camera at `position`, looking along `direction`.
    pub fn initialize(&mut self, position: Vec3, direction: Vec3, fov: f32) -> Result<(), ShadowMapError> {
        if self.width == 0 || self.height == 0 {
            return Err(ShadowMapError::ZeroResolution(self.width, self.height));
        }

        let mut camera = Camera::new(self.width, self.height).with_lens(SHADOW_FOCAL_LENGTH, fov);
        camera.move_to(position);
        camera.look_at(position + direction)?;

        self.camera = Some(camera);
        self.generated = false;
        self.depth.fill(1.0);
        self.slopes.fill(Vec2::ZERO);
        Ok(())
    }

    /// Fill the depth buffer with the nearest surface of `objects`.
    pub fn generate_depth_buffer(&mut self, objects: &[Object]) -> Result<(), ShadowMapError> {
        self.render(objects, |_, _| {})
    }

    /// Rasterize `objects` from the light and keep the nearest depth per texel.
    ///
    /// `on_pass` runs for every fragment that wins the depth test, with the
    /// texel index and the fragment (whose varying is the world normal).
    pub(crate) fn render(
        &mut self,
        objects: &[Object],
        mut on_pass: impl FnMut(usize, &Fragment<Vec3>),
    ) -> Result<(), ShadowMapError> {
        let camera = self.camera.as_ref().ok_or(ShadowMapError::NotInitialized)?;
        let view_proj = camera.view_projection(true);
        let (width, height) = (self.width, self.height);

        self.depth.fill(1.0);
        self.slopes.fill(Vec2::ZERO);
        let depth = &mut self.depth;
        let slopes = &mut self.slopes;
        let mut triangles = 0usize;

        for object in objects {
            for tri in object.triangles() {
                let vertices = tri
                    .vertices()
                    .map(|v| ClipVertex::new(view_proj.transform_homogeneous(v.position), v.normal));

                for clipped in raster::clip_near(vertices) {
                    let screen = ScreenTriangle::from_clip(clipped);
                    let Some(bounds) = screen.pixel_bounds(width, height) else {
                        continue;
                    };
                    triangles += 1;
                    let gradient = screen.depth_gradient();

                    screen.rasterize(bounds, width, height, |frag| {
                        if !LIGHT_DEPTH_RANGE.contains(frag.ndc.z) {
                            return;
                        }
                        let index = (frag.y * width + frag.x) as usize;
                        let d = raster::normalized_depth(frag.ndc.z);
                        if d < depth[index] {
                            depth[index] = d;
                            slopes[index] = gradient;
                            on_pass(index, &frag);
                        }
                    });
                }
            }
        }

        self.generated = true;
        log::debug!(
            "Shadow map {}x{}: rasterized {} triangles",
            width,
            height,
            triangles
        );
        Ok(())
    }

    /// Classify `position` against the recorded depths.
    pub fn visibility(&self, position: Vec3) -> Visibility {
        let Some(camera) = self.camera.as_ref().filter(|_| self.generated) else {
            return Visibility::OutOfView;
        };

        let clip = camera.view_projection(true).transform_homogeneous(position);
        if !(clip.w > 0.0) {
            return Visibility::OutOfView;
        }

        let ndc = clip.truncate() / clip.w;
        let depth = raster::normalized_depth(ndc.z);
        if !(0.0..=1.0).contains(&depth) {
            return Visibility::OutOfView;
        }

        match raster::ndc_to_texel(ndc.truncate(), self.width, self.height) {
            Some((x, y)) => {
                if depth <= self.occluder_depth(x, y, ndc.truncate()) + SHADOW_BIAS {
                    Visibility::Lit
                } else {
                    Visibility::Shadowed
                }
            }
            None => Visibility::OutOfView,
        }
    }

    /// Normalized depth of the surface recorded at texel (`x`, `y`), taken on
    /// its plane at `ndc` rather than at the texel center. 1.0 when empty.
    fn occluder_depth(&self, x: u32, y: u32, ndc: Vec2) -> f32 {
        let index = (y * self.width + x) as usize;
        let stored = self.depth[index];
        if stored >= 1.0 {
            return stored;
        }

        let center = Vec2::new(
            raster::pixel_center_ndc(x, self.width),
            raster::pixel_center_ndc(y, self.height),
        );
        let stored_ndc = 1.0 - 2.0 * stored;
        let surface = raster::normalized_depth(stored_ndc + self.slopes[index].dot(ndc - center));
        if surface.is_finite() {
            surface
        } else {
            stored
        }
    }

    /// True unless a recorded surface is closer to the light than `position`.
    pub fn is_lighted(&self, position: Vec3) -> bool {
        self.visibility(position).is_lit()
    }

    pub fn is_initialized(&self) -> bool {
        self.camera.is_some()
    }

    pub fn is_generated(&self) -> bool {
        self.generated
    }

    pub fn camera(&self) -> Option<&Camera> {
        self.camera.as_ref()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Normalized depth per texel, 1.0 where nothing was recorded.
    pub fn depth_buffer(&self) -> &[f32] {
        &self.depth
    }

    /// Depth buffer stretched to [0, 1] over recorded texels, for inspection.
    pub fn depth_image(&self) -> Vec<f32> {
        let mut range = Interval::EMPTY;
        for &d in self.depth.iter().filter(|&&d| d < 1.0) {
            range.include(d);
        }

        self.depth
            .iter()
            .map(|&d| if d < 1.0 { range.normalize(d) } else { 1.0 })
            .collect()
    }
}
