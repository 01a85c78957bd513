//! JSON scene configuration.
//!
//! The file layout uses PascalCase keys and `Type` tags, e.g.
//!
//! ```json
//! {
//!   "Camera": { "Resolution": [512, 512], "Position": [0, -6, 3],
//!               "Target": [0, 0, 0], "FocalLength": 0.1, "Fov": 45 },
//!   "Lights": [ { "Type": "PointLight", "Position": [0, 0, 4], "Intensity": [1, 1, 1] } ],
//!   "Materials": [ { "Name": "floor", "Type": "ColorMat", "BaseColor": [0.8, 0.8, 0.8],
//!                    "Shininess": 16 } ],
//!   "Objects": [ { "SourceFile": "floor.obj", "Translation": [0, 0, 0],
//!                  "Rotation": [0, 0, 0], "Scale": [1, 1, 1], "Material": "floor" } ]
//! }
//! ```
//!
//! An optional `Render` section overrides [`RenderSettings`].

use std::path::{Path, PathBuf};

use hypox_math::{UVec2, Vec2, Vec3};
use serde::Deserialize;
use thiserror::Error;

use crate::material::DEFAULT_SHININESS;
use crate::object::Transform;

/// Errors that can occur while reading a scene configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Camera placement and lens.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CameraConfig {
    pub resolution: UVec2,
    pub position: Vec3,
    pub target: Vec3,
    pub focal_length: f32,
    /// Vertical field of view in degrees
    pub fov: f32,
}

/// A light source entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "Type")]
pub enum LightConfig {
    #[serde(rename_all = "PascalCase")]
    PointLight { position: Vec3, intensity: Vec3 },

    #[serde(rename_all = "PascalCase")]
    AreaLight {
        position: Vec3,
        intensity: Vec3,
        normal: Vec3,
        size: Vec2,
        /// Samples per side of the emitter grid
        #[serde(default = "default_area_samples")]
        samples: u32,
    },
}

/// Base color source of a material entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "Type")]
pub enum MaterialSource {
    #[serde(rename = "ColorMat", rename_all = "PascalCase")]
    Color { base_color: Vec3 },

    #[serde(rename = "TextureMat", rename_all = "PascalCase")]
    Texture { texture_file_path: String },
}

/// A named material entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MaterialConfig {
    pub name: String,

    #[serde(flatten)]
    pub source: MaterialSource,

    #[serde(default = "default_shininess")]
    pub shininess: f32,
}

/// A mesh file placed in the scene.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ObjectConfig {
    pub source_file: String,

    #[serde(default)]
    pub translation: Vec3,

    /// Euler angles in degrees
    #[serde(default)]
    pub rotation: Vec3,

    #[serde(default = "default_scale")]
    pub scale: Vec3,

    pub material: String,
}

impl ObjectConfig {
    pub fn transform(&self) -> Transform {
        Transform {
            translation: self.translation,
            rotation_degrees: self.rotation,
            scale: self.scale,
        }
    }
}

/// Pipeline tuning knobs.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct RenderSettings {
    /// Ambient light multiplied by the base color of every covered pixel
    pub ambient: Vec3,

    /// Side length of each point-light cube face
    pub shadow_resolution: u32,

    /// Side length of area-light reflective shadow maps
    pub rsm_resolution: u32,

    /// Indirect VPLs sampled per light (0 disables indirect lighting)
    pub vpl_count: usize,

    /// Base seed for VPL sampling; light `i` uses `seed + i`
    pub seed: u64,

    /// Tile size for the fragment stage
    pub bucket_size: u32,

    /// Write shadow map and RSM buffers next to the output images
    pub debug_dumps: bool,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            ambient: Vec3::splat(0.1),
            shadow_resolution: 1024,
            rsm_resolution: 512,
            vpl_count: 64,
            seed: 0,
            bucket_size: 32,
            debug_dumps: false,
        }
    }
}

/// A complete scene description.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SceneConfig {
    pub camera: CameraConfig,

    #[serde(default)]
    pub lights: Vec<LightConfig>,

    #[serde(default)]
    pub materials: Vec<MaterialConfig>,

    #[serde(default)]
    pub objects: Vec<ObjectConfig>,

    #[serde(default)]
    pub render: RenderSettings,
}

impl SceneConfig {
    /// Read and validate a configuration file.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let config = Self::from_json(&text)?;
        log::info!(
            "Loaded config {}: {} lights, {} materials, {} objects",
            path.display(),
            config.lights.len(),
            config.materials.len(),
            config.objects.len()
        );
        Ok(config)
    }

    /// Parse and validate a configuration from a JSON string.
    pub fn from_json(text: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> ConfigResult<()> {
        let camera = &self.camera;
        if camera.resolution.x == 0 || camera.resolution.y == 0 {
            return Err(ConfigError::Invalid(format!(
                "camera resolution must be non-zero, got {}x{}",
                camera.resolution.x, camera.resolution.y
            )));
        }
        if camera.focal_length <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "camera focal length must be positive, got {}",
                camera.focal_length
            )));
        }
        if !(camera.fov > 0.0 && camera.fov < 180.0) {
            return Err(ConfigError::Invalid(format!(
                "camera fov must be in (0, 180) degrees, got {}",
                camera.fov
            )));
        }

        for light in &self.lights {
            if let LightConfig::AreaLight { samples: 0, .. } = light {
                return Err(ConfigError::Invalid(
                    "area light needs at least one sample per side".to_string(),
                ));
            }
        }

        let render = &self.render;
        if render.shadow_resolution == 0 || render.rsm_resolution == 0 || render.bucket_size == 0 {
            return Err(ConfigError::Invalid(
                "shadow, RSM and bucket sizes must be non-zero".to_string(),
            ));
        }

        Ok(())
    }
}

fn default_area_samples() -> u32 {
    4
}

fn default_shininess() -> f32 {
    DEFAULT_SHININESS
}

fn default_scale() -> Vec3 {
    Vec3::ONE
}
