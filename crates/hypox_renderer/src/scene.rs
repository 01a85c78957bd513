//! Scene assembly from a loaded configuration.
//!
//! A `Scene` owns the world-space objects, the lights and the material arena.
//! Light visibility data is derived from the objects by
//! [`Scene::prepare_lighting`] and has to be rebuilt if they change.

use std::path::{Path, PathBuf};

use hypox_core::{
    load_obj, ConfigError, Material, MaterialLibrary, MaterialSource, MeshError,
    Object, RenderSettings, SceneConfig, TextureCache, TextureError,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use thiserror::Error;

use crate::light::{Light, LightError};

/// Errors raised while assembling a scene.
#[derive(Error, Debug)]
pub enum SceneError {
    #[error("Object '{object}' references unknown material '{material}'")]
    UnknownMaterial { object: String, material: String },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Mesh(#[from] MeshError),

    #[error(transparent)]
    Texture(#[from] TextureError),

    #[error("Light {index}: {source}")]
    Light {
        index: usize,
        #[source]
        source: LightError,
    },
}

pub type SceneResult<T> = Result<T, SceneError>;

/// Everything the rasterizer draws and lights.
#[derive(Debug, Default)]
pub struct Scene {
    pub objects: Vec<Object>,
    pub lights: Vec<Light>,
    pub materials: MaterialLibrary,
}

impl Scene {
    pub fn new(objects: Vec<Object>, lights: Vec<Light>, materials: MaterialLibrary) -> Self {
        Self {
            objects,
            lights,
            materials,
        }
    }

    /// Build a scene from `config`, resolving relative file paths against `base_dir`.
    ///
    /// Materials are created first so objects can refer to them by name.
    /// Nothing is returned unless every mesh, texture and light loads.
    pub fn load(config: &SceneConfig, base_dir: impl AsRef<Path>) -> SceneResult<Self> {
        let base_dir = base_dir.as_ref();

        let mut textures = TextureCache::with_base_dir(base_dir);
        let mut materials = MaterialLibrary::new();
        for entry in &config.materials {
            let material = match &entry.source {
                MaterialSource::Color { base_color } => {
                    Material::color(&entry.name, *base_color, entry.shininess)
                }
                MaterialSource::Texture { texture_file_path } => {
                    let texture = textures.load(texture_file_path)?;
                    Material::texture(&entry.name, texture, entry.shininess)
                }
            };
            materials.add(material);
        }

        let mut objects = Vec::with_capacity(config.objects.len());
        for entry in &config.objects {
            let material = materials
                .find(&entry.material)
                .ok_or_else(|| SceneError::UnknownMaterial {
                    object: entry.source_file.clone(),
                    material: entry.material.clone(),
                })?;

            let mesh = load_obj(resolve(base_dir, &entry.source_file))?;
            let mut object = Object::from_mesh(&entry.source_file, &mesh);
            object.set_material(Some(material));
            object.local_to_world(entry.transform().to_matrix());

            log::debug!(
                "Object '{}': {} triangles, material '{}'",
                object.name,
                object.triangle_count(),
                entry.material
            );
            objects.push(object);
        }

        let lights = config
            .lights
            .iter()
            .enumerate()
            .map(|(index, light)| {
                Light::from_config(light).map_err(|source| SceneError::Light { index, source })
            })
            .collect::<SceneResult<Vec<_>>>()?;

        log::info!(
            "Scene loaded: {} objects, {} lights, {} materials, {} textures",
            objects.len(),
            lights.len(),
            materials.len(),
            textures.len()
        );

        Ok(Self::new(objects, lights, materials))
    }

    /// Build every light's visibility data, then sample its indirect VPLs.
    ///
    /// Lights are processed in parallel. Each light draws from its own RNG
    /// seeded with `settings.seed + index`, so results do not depend on
    /// scheduling.
    pub fn prepare_lighting(&mut self, settings: &RenderSettings) -> SceneResult<()> {
        let objects = &self.objects;

        self.lights
            .par_iter_mut()
            .enumerate()
            .try_for_each(|(index, light)| -> SceneResult<()> {
                light
                    .build_visibility(objects, settings)
                    .map_err(|source| SceneError::Light { index, source })?;

                let mut rng = StdRng::seed_from_u64(settings.seed.wrapping_add(index as u64));
                light.setup_indirect(settings.vpl_count, &mut rng);

                log::debug!(
                    "Light {} ({}): {} direct samples, {} indirect VPLs",
                    index,
                    light.kind(),
                    light.direct_samples().len(),
                    light.indirect_samples().len()
                );
                Ok(())
            })?;

        log::info!("Prepared lighting for {} lights", self.lights.len());
        Ok(())
    }

    /// Total world-space triangles across all objects.
    pub fn triangle_count(&self) -> usize {
        self.objects.iter().map(Object::triangle_count).sum()
    }
}

fn resolve(base_dir: &Path, path: &str) -> PathBuf {
    let path = Path::new(path);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}
