//! Indexed triangle meshes and the OBJ loader.
//!
//! A `Mesh` is the raw result of loading a file. It is flattened into
//! `Triangle`s once, when an `Object` is built from it.

use std::path::{Path, PathBuf};

use hypox_math::{Aabb, Vec2, Vec3};
use thiserror::Error;

use crate::geometry::{Triangle, Vertex};

/// Errors that can occur while loading a mesh file.
#[derive(Error, Debug)]
pub enum MeshError {
    #[error("Failed to load OBJ {path}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: tobj::LoadError,
    },

    #[error("{path}: face {face} has {arity} vertices, only triangles are supported")]
    NonTriangularFace {
        path: PathBuf,
        face: usize,
        arity: u32,
    },

    #[error("{path}: index {index} out of range for {count} vertices")]
    IndexOutOfRange {
        path: PathBuf,
        index: u32,
        count: usize,
    },
}

pub type MeshResult<T> = Result<T, MeshError>;

/// A mesh consisting of vertex positions, optional normals and uvs, and triangle indices.
#[derive(Clone, Debug)]
pub struct Mesh {
    /// Vertex positions (one Vec3 per vertex)
    pub positions: Vec<Vec3>,

    /// Vertex normals (optional - face normals are used if missing)
    pub normals: Option<Vec<Vec3>>,

    /// UV coordinates (optional - zero if missing)
    pub uvs: Option<Vec<Vec2>>,

    /// Triangle indices (every 3 indices form a triangle)
    pub indices: Vec<u32>,

    /// Axis-aligned bounding box
    pub bounds: Aabb,
}

impl Mesh {
    /// Create a new mesh from positions and indices, optionally with normals and uvs.
    pub fn new(
        positions: Vec<Vec3>,
        indices: Vec<u32>,
        normals: Option<Vec<Vec3>>,
        uvs: Option<Vec<Vec2>>,
    ) -> Self {
        let bounds = Aabb::from_iter_points(positions.iter().copied());
        Self {
            positions,
            normals,
            uvs,
            indices,
            bounds,
        }
    }

    /// Check if the mesh has normals.
    pub fn has_normals(&self) -> bool {
        self.normals.is_some()
    }

    /// Check if the mesh has UV coordinates.
    pub fn has_uvs(&self) -> bool {
        self.uvs.is_some()
    }

    /// Get the number of triangles in the mesh.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Get the number of vertices in the mesh.
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Flatten the indexed mesh into standalone triangles.
    ///
    /// Triangles without vertex normals get their counter-clockwise face normal
    /// on all three vertices. Triangles with an out-of-range index are skipped.
    pub fn to_triangles(&self) -> Vec<Triangle> {
        let mut triangles = Vec::with_capacity(self.triangle_count());

        for chunk in self.indices.chunks_exact(3) {
            let idx = [chunk[0] as usize, chunk[1] as usize, chunk[2] as usize];

            if idx.iter().any(|&i| i >= self.positions.len()) {
                log::warn!(
                    "Invalid triangle indices: {:?}, vertex count: {}",
                    idx,
                    self.positions.len()
                );
                continue;
            }

            let positions = idx.map(|i| self.positions[i]);
            let face_normal = (positions[1] - positions[0])
                .cross(positions[2] - positions[0])
                .normalize_or_zero();

            let vertices = idx.map(|i| {
                let normal = self
                    .normals
                    .as_ref()
                    .and_then(|normals| normals.get(i).copied())
                    .unwrap_or(face_normal);
                let uv = self
                    .uvs
                    .as_ref()
                    .and_then(|uvs| uvs.get(i).copied())
                    .unwrap_or(Vec2::ZERO);
                Vertex::new(self.positions[i], normal, uv)
            });

            triangles.push(Triangle::new(vertices[0], vertices[1], vertices[2]));
        }

        triangles
    }
}

/// Load a Wavefront OBJ file into a single mesh.
///
/// All models in the file are merged. Faces must be triangles; the loader does
/// not triangulate polygons.
pub fn load_obj(path: impl AsRef<Path>) -> MeshResult<Mesh> {
    let path = path.as_ref();
    let options = tobj::LoadOptions {
        single_index: true,
        triangulate: false,
        ..Default::default()
    };

    let (models, _materials) = tobj::load_obj(path, &options).map_err(|source| MeshError::Load {
        path: path.to_path_buf(),
        source,
    })?;

    let mut positions = Vec::new();
    let mut normals = Vec::new();
    let mut uvs = Vec::new();
    let mut indices = Vec::new();
    let mut all_normals = true;
    let mut any_uvs = false;

    for model in &models {
        let mesh = &model.mesh;

        if let Some((face, &arity)) = mesh.face_arities.iter().enumerate().find(|(_, &a)| a != 3) {
            return Err(MeshError::NonTriangularFace {
                path: path.to_path_buf(),
                face,
                arity,
            });
        }

        let base = positions.len() as u32;
        let count = mesh.positions.len() / 3;

        if let Some(&index) = mesh.indices.iter().find(|&&i| i as usize >= count) {
            return Err(MeshError::IndexOutOfRange {
                path: path.to_path_buf(),
                index,
                count,
            });
        }

        positions.extend(
            mesh.positions
                .chunks_exact(3)
                .map(|p| Vec3::new(p[0], p[1], p[2])),
        );

        if mesh.normals.len() == mesh.positions.len() {
            normals.extend(
                mesh.normals
                    .chunks_exact(3)
                    .map(|n| Vec3::new(n[0], n[1], n[2])),
            );
        } else {
            all_normals = false;
        }

        if mesh.texcoords.len() / 2 == count {
            any_uvs = true;
            uvs.extend(mesh.texcoords.chunks_exact(2).map(|t| Vec2::new(t[0], t[1])));
        } else {
            uvs.extend(std::iter::repeat(Vec2::ZERO).take(count));
        }

        indices.extend(mesh.indices.iter().map(|&i| base + i));

        log::debug!(
            "OBJ model '{}': {} vertices, {} triangles",
            model.name,
            count,
            mesh.indices.len() / 3
        );
    }

    let mesh = Mesh::new(
        positions,
        indices,
        all_normals.then_some(normals),
        any_uvs.then_some(uvs),
    );

    log::info!(
        "Loaded {}: {} vertices, {} triangles (normals: {}, uvs: {})",
        path.display(),
        mesh.vertex_count(),
        mesh.triangle_count(),
        mesh.has_normals(),
        mesh.has_uvs()
    );

    Ok(mesh)
}
