//! Hypox Core - Scene data for the Hypox rasterizer.
//!
//! This crate provides:
//!
//! - **Geometry**: `Vertex`, `Triangle` and the containment/weight tests
//! - **Scene objects**: `Object`, `Transform`, OBJ loading via `Mesh`
//! - **Materials**: `MaterialLibrary` arena, `Texture` cache
//! - **Configuration**: JSON `SceneConfig` and `RenderSettings`
//!
//! # Example
//!
//! ```ignore
//! use hypox_core::{load_obj, Object, SceneConfig};
//!
//! let config = SceneConfig::load("scene.json")?;
//! let mesh = load_obj(&config.objects[0].source_file)?;
//! let mut object = Object::from_mesh("floor", &mesh);
//! object.local_to_world(config.objects[0].transform().to_matrix());
//! ```

pub mod config;
pub mod geometry;
pub mod material;
pub mod mesh;
pub mod object;
pub mod texture;

// Re-export commonly used types
pub use config::{
    CameraConfig, ConfigError, LightConfig, MaterialConfig, MaterialSource, ObjectConfig,
    RenderSettings, SceneConfig,
};
pub use geometry::{is_valid_weight, GeometryError, Triangle, Vertex};
pub use material::{Material, MaterialId, MaterialKind, MaterialLibrary};
pub use mesh::{load_obj, Mesh, MeshError};
pub use object::{Object, Transform};
pub use texture::{Texture, TextureCache, TextureError};
