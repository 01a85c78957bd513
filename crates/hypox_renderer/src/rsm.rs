//! Reflective shadow maps and virtual point light sampling.
//!
//! An `Rsm` is a shadow map whose depth pass also records, per texel, the
//! world position and normal of the nearest surface and the flux it reflects
//! back into the scene. Sampling those texels gives the indirect VPLs used for
//! one-bounce lighting.

use std::collections::HashSet;
use std::f32::consts::{FRAC_PI_2, TAU};

use hypox_core::Object;
use hypox_math::{Interval, Vec3};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::light::Vpl;
use crate::shadow_map::{ShadowMap, ShadowMapError, Visibility};

/// Texels at or below this flux are never sampled.
pub const FLUX_THRESHOLD: f32 = 0.001;

/// Distance VPLs are pushed off their surface along its normal.
pub const VPL_NORMAL_OFFSET: f32 = 0.01;

/// Largest sampling radius in texels.
const MAX_SAMPLE_RADIUS: u32 = 64;

/// Angular subdivisions of the sampling pattern.
const ANGLE_BINS: u32 = 64;

/// Pattern draws allowed per requested VPL before falling back to shuffling.
const ATTEMPTS_PER_VPL: usize = 32;

/// A shadow map with position, normal and flux attachments.
#[derive(Clone, Debug)]
pub struct Rsm {
    shadow_map: ShadowMap,
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
    flux: Vec<f32>,
}

/// RSM attachments mapped to displayable ranges.
#[derive(Clone, Debug)]
pub struct RsmImages {
    /// World positions as (p + 1) / 2
    pub position: Vec<Vec3>,
    /// World normals as (n + 1) / 2
    pub normal: Vec<Vec3>,
    /// Flux divided by its maximum
    pub flux: Vec<f32>,
}

impl Rsm {
    pub fn new(width: u32, height: u32) -> Self {
        let len = width as usize * height as usize;
        Self {
            shadow_map: ShadowMap::new(width, height),
            positions: vec![Vec3::ZERO; len],
            normals: vec![Vec3::ZERO; len],
            flux: vec![0.0; len],
        }
    }

    /// Place the light camera. See [`ShadowMap::initialize`].
    pub fn initialize(&mut self, position: Vec3, direction: Vec3, fov: f32) -> Result<(), ShadowMapError> {
        self.shadow_map.initialize(position, direction, fov)
    }

    /// Render depth and the RSM attachments in one pass.
    ///
    /// `light_intensity` is the scalar power of the light; each texel reflects
    /// `light_intensity * max(0, n . l)`.
    pub fn generate_rsm_buffer(&mut self, objects: &[Object], light_intensity: f32) -> Result<(), ShadowMapError> {
        let camera = self.shadow_map.camera().ok_or(ShadowMapError::NotInitialized)?;
        let light_position = camera.position();
        let ndc_to_world = camera.view_projection(true).inverse();

        self.positions.fill(Vec3::ZERO);
        self.normals.fill(Vec3::ZERO);
        self.flux.fill(0.0);

        let positions = &mut self.positions;
        let normals = &mut self.normals;
        let flux = &mut self.flux;

        self.shadow_map.render(objects, |index, frag| {
            let world = ndc_to_world.project_point3(frag.ndc);
            let normal = frag.varying.normalize_or_zero();
            let to_light = (light_position - world).normalize_or_zero();

            positions[index] = world;
            normals[index] = normal;
            flux[index] = light_intensity * normal.dot(to_light).max(0.0);
        })?;

        log::debug!(
            "RSM {}x{}: {} texels with flux",
            self.width(),
            self.height(),
            self.flux.iter().filter(|&&f| f > FLUX_THRESHOLD).count()
        );
        Ok(())
    }

    /// Turn up to `target_count` texels into indirect VPLs.
    ///
    /// The returned fluxes are normalized so the selected set sums to one in
    /// every channel, whatever the number of samples.
    pub fn generate_vpls<R: Rng>(&self, target_count: usize, rng: &mut R) -> Vec<Vpl> {
        if target_count == 0 || self.flux.is_empty() {
            return Vec::new();
        }

        let indices = self.importance_sample(target_count, rng);
        let total: f32 = indices.iter().map(|&i| self.flux[i]).sum();
        if !(total > 0.0) {
            return Vec::new();
        }

        indices
            .into_iter()
            .map(|i| Vpl {
                position: self.positions[i] + self.normals[i] * VPL_NORMAL_OFFSET,
                flux: Vec3::ONE * (self.flux[i] / total),
                normal: self.normals[i],
            })
            .collect()
    }

    /// Pick distinct texels with flux, favouring a rotating ring pattern
    /// around the map center.
    fn importance_sample<R: Rng>(&self, target_count: usize, rng: &mut R) -> Vec<usize> {
        let (width, height) = (self.width() as i64, self.height() as i64);
        let (cx, cy) = (width / 2, height / 2);
        let max_radius = MAX_SAMPLE_RADIUS.min(self.width().min(self.height()) / 2).max(1);

        let mut chosen = Vec::with_capacity(target_count);
        let mut seen = HashSet::new();

        for _ in 0..target_count * ATTEMPTS_PER_VPL {
            if chosen.len() >= target_count {
                break;
            }

            let radius = rng.gen_range(1..=max_radius) as f32;
            let angle = rng.gen_range(0..ANGLE_BINS) as f32 * (TAU / ANGLE_BINS as f32);

            for quadrant in 0..4 {
                if chosen.len() >= target_count {
                    break;
                }
                let a = angle + quadrant as f32 * FRAC_PI_2;
                let x = cx + (radius * a.cos()) as i64;
                let y = cy + (radius * a.sin()) as i64;
                if !(0..width).contains(&x) || !(0..height).contains(&y) {
                    continue;
                }

                let index = (y * width + x) as usize;
                if self.flux[index] > FLUX_THRESHOLD && seen.insert(index) {
                    chosen.push(index);
                }
            }
        }

        if chosen.len() < target_count {
            let mut remaining: Vec<usize> = (0..self.flux.len())
                .filter(|i| self.flux[*i] > FLUX_THRESHOLD && !seen.contains(i))
                .collect();
            log::debug!(
                "RSM pattern found {} of {} VPLs, drawing from {} remaining texels",
                chosen.len(),
                target_count,
                remaining.len()
            );

            remaining.shuffle(rng);
            while chosen.len() < target_count {
                match remaining.pop() {
                    Some(index) => chosen.push(index),
                    None => break,
                }
            }
        }

        chosen
    }

    /// Attachments mapped for display.
    pub fn debug_images(&self) -> RsmImages {
        let mut range = Interval::new(0.0, 0.0);
        for &f in &self.flux {
            range.include(f);
        }

        RsmImages {
            position: self.positions.iter().map(|p| (*p + Vec3::ONE) * 0.5).collect(),
            normal: self.normals.iter().map(|n| (*n + Vec3::ONE) * 0.5).collect(),
            flux: self.flux.iter().map(|&f| range.normalize(f)).collect(),
        }
    }

    pub fn visibility(&self, position: Vec3) -> Visibility {
        self.shadow_map.visibility(position)
    }

    pub fn is_lighted(&self, position: Vec3) -> bool {
        self.shadow_map.is_lighted(position)
    }

    pub fn shadow_map(&self) -> &ShadowMap {
        &self.shadow_map
    }

    pub fn width(&self) -> u32 {
        self.shadow_map.width()
    }

    pub fn height(&self) -> u32 {
        self.shadow_map.height()
    }

    pub fn position_buffer(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn normal_buffer(&self) -> &[Vec3] {
        &self.normals
    }

    pub fn flux_buffer(&self) -> &[f32] {
        &self.flux
    }
}
