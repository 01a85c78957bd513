//! Light sources.
//!
//! Each light carries its direct samples (point emitters approximating the
//! light), its indirect samples (VPLs taken from an RSM, possibly none) and
//! the visibility data used for shadow queries.

use hypox_core::{LightConfig, Object, RenderSettings};
use hypox_math::{Vec2, Vec3};
use rand::Rng;
use rayon::prelude::*;
use thiserror::Error;

use crate::camera::look_basis;
use crate::rsm::Rsm;
use crate::shadow_map::{ShadowMap, ShadowMapError, Visibility};

/// Field of view of each point-light cube face.
pub const POINT_LIGHT_FOV: f32 = 90.0;

/// Field of view of an area light's RSM.
pub const AREA_LIGHT_FOV: f32 = 120.0;

/// Distance area-light samples sit behind the emitting surface.
pub const AREA_SAMPLE_OFFSET: f32 = 1e-3;

/// Directions of the six point-light shadow maps.
pub const CUBE_FACE_DIRECTIONS: [Vec3; 6] = [
    Vec3::X,
    Vec3::NEG_X,
    Vec3::Y,
    Vec3::NEG_Y,
    Vec3::Z,
    Vec3::NEG_Z,
];

/// Errors raised while building lights.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LightError {
    #[error("Area light normal {0:?} has zero length")]
    DegenerateNormal(Vec3),

    #[error("Area light needs at least one sample per side")]
    NoSamples,

    #[error(transparent)]
    ShadowMap(#[from] ShadowMapError),
}

/// A point emitter used for direct lighting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectVpl {
    pub position: Vec3,
    pub intensity: Vec3,
}

/// A virtual point light reflecting light off a surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vpl {
    pub position: Vec3,
    pub flux: Vec3,
    /// Normal of the surface the VPL sits on
    pub normal: Vec3,
}

/// An omnidirectional light with cube-map shadows.
#[derive(Debug, Clone)]
pub struct PointLight {
    direct: Vec<DirectVpl>,
    faces: Vec<ShadowMap>,
}

impl PointLight {
    pub fn new(position: Vec3, intensity: Vec3) -> Self {
        Self {
            direct: vec![DirectVpl {
                position,
                intensity,
            }],
            faces: Vec::new(),
        }
    }

    pub fn position(&self) -> Vec3 {
        self.direct[0].position
    }

    /// Render one shadow map per cube face.
    pub fn build_visibility(&mut self, objects: &[Object], resolution: u32) -> Result<(), LightError> {
        let position = self.position();
        self.faces = CUBE_FACE_DIRECTIONS
            .par_iter()
            .map(|&direction| {
                let mut face = ShadowMap::new(resolution, resolution);
                face.initialize(position, direction, POINT_LIGHT_FOV)?;
                face.generate_depth_buffer(objects)?;
                Ok(face)
            })
            .collect::<Result<Vec<_>, ShadowMapError>>()?;
        Ok(())
    }

    /// Lit if any face that sees the point reports it lit, or if no face sees it.
    pub fn is_visible(&self, point: Vec3) -> bool {
        let mut covered = false;
        for face in &self.faces {
            match face.visibility(point) {
                Visibility::Lit => return true,
                Visibility::Shadowed => covered = true,
                Visibility::OutOfView => {}
            }
        }
        !covered
    }

    pub fn faces(&self) -> &[ShadowMap] {
        &self.faces
    }
}

/// A rectangular emitter sampled on a regular grid.
#[derive(Debug, Clone)]
pub struct AreaLight {
    position: Vec3,
    normal: Vec3,
    size: Vec2,
    intensity: Vec3,
    direct: Vec<DirectVpl>,
    indirect: Vec<Vpl>,
    rsm: Option<Rsm>,
}

impl AreaLight {
    /// Create an area light centered at `position` facing `normal`.
    ///
    /// The quad is split into `samples x samples` cells with one emitter at
    /// each cell center carrying `intensity / samples^2`.
    pub fn new(position: Vec3, normal: Vec3, size: Vec2, intensity: Vec3, samples: u32) -> Result<Self, LightError> {
        if samples == 0 {
            return Err(LightError::NoSamples);
        }
        let normal = normal.try_normalize().ok_or(LightError::DegenerateNormal(normal))?;

        let (_, right, up) = look_basis(normal);
        let n = samples as f32;
        let sample_intensity = intensity / (n * n);

        let mut direct = Vec::with_capacity((samples * samples) as usize);
        for j in 0..samples {
            for i in 0..samples {
                let u = ((i as f32 + 0.5) / n - 0.5) * size.x;
                let v = ((j as f32 + 0.5) / n - 0.5) * size.y;
                direct.push(DirectVpl {
                    position: position + right * u + up * v - normal * AREA_SAMPLE_OFFSET,
                    intensity: sample_intensity,
                });
            }
        }

        Ok(Self {
            position,
            normal,
            size,
            intensity,
            direct,
            indirect: Vec::new(),
            rsm: None,
        })
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn normal(&self) -> Vec3 {
        self.normal
    }

    pub fn size(&self) -> Vec2 {
        self.size
    }

    /// Render the RSM aimed along the light normal.
    pub fn build_visibility(&mut self, objects: &[Object], resolution: u32) -> Result<(), LightError> {
        let mut rsm = Rsm::new(resolution, resolution);
        rsm.initialize(self.position, self.normal, AREA_LIGHT_FOV)?;
        rsm.generate_rsm_buffer(objects, self.intensity.element_sum() / 3.0)?;
        self.rsm = Some(rsm);
        Ok(())
    }

    pub fn is_visible(&self, point: Vec3) -> bool {
        self.rsm.as_ref().map_or(true, |rsm| rsm.is_lighted(point))
    }

    pub fn rsm(&self) -> Option<&Rsm> {
        self.rsm.as_ref()
    }

    /// Replace the indirect VPLs, e.g. with a set sampled elsewhere.
    pub fn set_indirect(&mut self, vpls: Vec<Vpl>) {
        self.indirect = vpls;
    }
}

/// A light in the scene.
#[derive(Debug, Clone)]
pub enum Light {
    Point(PointLight),
    Area(AreaLight),
}

impl Light {
    /// Build a light from its configuration entry.
    pub fn from_config(config: &LightConfig) -> Result<Self, LightError> {
        match *config {
            LightConfig::PointLight {
                position,
                intensity,
            } => Ok(Light::Point(PointLight::new(position, intensity))),
            LightConfig::AreaLight {
                position,
                intensity,
                normal,
                size,
                samples,
            } => AreaLight::new(position, normal, size, intensity, samples).map(Light::Area),
        }
    }

    /// Point emitters for direct lighting.
    pub fn direct_samples(&self) -> &[DirectVpl] {
        match self {
            Light::Point(light) => &light.direct,
            Light::Area(light) => &light.direct,
        }
    }

    /// Indirect VPLs; empty until [`Light::setup_indirect`] has run.
    pub fn indirect_samples(&self) -> &[Vpl] {
        match self {
            Light::Point(_) => &[],
            Light::Area(light) => &light.indirect,
        }
    }

    /// Whether `point` receives direct light. Lights without visibility data
    /// see everything.
    pub fn is_visible(&self, point: Vec3) -> bool {
        match self {
            Light::Point(light) => light.is_visible(point),
            Light::Area(light) => light.is_visible(point),
        }
    }

    /// Render shadow maps (and the RSM for area lights) against `objects`.
    pub fn build_visibility(&mut self, objects: &[Object], settings: &RenderSettings) -> Result<(), LightError> {
        match self {
            Light::Point(light) => light.build_visibility(objects, settings.shadow_resolution),
            Light::Area(light) => light.build_visibility(objects, settings.rsm_resolution),
        }
    }

    /// Sample indirect VPLs from the RSM, if the light has one.
    pub fn setup_indirect<R: Rng>(&mut self, count: usize, rng: &mut R) {
        if let Light::Area(light) = self {
            light.indirect = match &light.rsm {
                Some(rsm) => rsm.generate_vpls(count, rng),
                None => Vec::new(),
            };
        }
    }

    /// Short name for logs and debug file names.
    pub fn kind(&self) -> &'static str {
        match self {
            Light::Point(_) => "point",
            Light::Area(_) => "area",
        }
    }
}
