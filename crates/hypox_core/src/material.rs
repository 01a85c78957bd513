//! Surface materials and the arena that owns them.
//!
//! Triangles refer to materials through a lightweight [`MaterialId`]
//! handle; the [`MaterialLibrary`] owns the actual data and resolves names
//! from the scene configuration to handles.

use std::collections::HashMap;
use std::sync::Arc;

use hypox_math::{Vec2, Vec3};

use crate::texture::Texture;

/// Shininess used when a material does not specify one.
pub const DEFAULT_SHININESS: f32 = 15.0;

/// Handle to a material stored in a [`MaterialLibrary`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaterialId(pub usize);

/// Where a material gets its base color from.
#[derive(Clone, Debug)]
pub enum MaterialKind {
    /// A constant base color.
    Color(Vec3),
    /// A texture looked up with nearest sampling.
    Texture(Arc<Texture>),
}

/// A Blinn-Phong surface description.
#[derive(Clone, Debug)]
pub struct Material {
    /// Material name (from the scene configuration)
    pub name: String,

    /// Base color source
    pub kind: MaterialKind,

    /// Specular exponent
    pub shininess: f32,
}

impl Material {
    /// Create a constant-color material.
    pub fn color(name: impl Into<String>, base_color: Vec3, shininess: f32) -> Self {
        Self {
            name: name.into(),
            kind: MaterialKind::Color(base_color),
            shininess,
        }
    }

    /// Create a textured material.
    pub fn texture(name: impl Into<String>, texture: Arc<Texture>, shininess: f32) -> Self {
        Self {
            name: name.into(),
            kind: MaterialKind::Texture(texture),
            shininess,
        }
    }

    /// Evaluate the base color at a surface coordinate.
    pub fn eval_color(&self, uv: Vec2) -> Vec3 {
        match &self.kind {
            MaterialKind::Color(color) => *color,
            MaterialKind::Texture(texture) => texture.sample_nearest(uv),
        }
    }

    /// Specular exponent for the Blinn-Phong highlight.
    pub fn eval_shininess(&self) -> f32 {
        self.shininess
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::color("default", Vec3::splat(0.5), DEFAULT_SHININESS)
    }
}

/// Arena of materials keyed by name.
#[derive(Clone, Debug, Default)]
pub struct MaterialLibrary {
    materials: Vec<Material>,
    by_name: HashMap<String, MaterialId>,
}

impl MaterialLibrary {
    /// Create an empty library.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a material and return its handle.
    ///
    /// A material with an existing name replaces the name lookup but keeps the
    /// earlier handle valid.
    pub fn add(&mut self, material: Material) -> MaterialId {
        let id = MaterialId(self.materials.len());
        if self.by_name.insert(material.name.clone(), id).is_some() {
            log::warn!("Material '{}' defined twice, later definition wins", material.name);
        }
        self.materials.push(material);
        id
    }

    /// Get a material by handle.
    pub fn get(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id.0)
    }

    /// Resolve a material name to its handle.
    pub fn find(&self, name: &str) -> Option<MaterialId> {
        self.by_name.get(name).copied()
    }

    /// Get material count.
    pub fn len(&self) -> usize {
        self.materials.len()
    }

    /// Check if the library is empty.
    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    /// Iterate over all materials with their handles.
    pub fn iter(&self) -> impl Iterator<Item = (MaterialId, &Material)> {
        self.materials
            .iter()
            .enumerate()
            .map(|(i, material)| (MaterialId(i), material))
    }
}
