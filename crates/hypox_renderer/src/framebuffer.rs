//! Per-frame G-buffer.
//!
//! Row 0 of every attachment is the bottom of the image (NDC y = -1); the
//! output writers flip it when encoding.

use hypox_core::MaterialId;
use hypox_math::{Interval, Vec2, Vec3};

use crate::raster::PixelRect;

/// Attributes of the nearest surface at a pixel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Surface {
    /// Pixel center and depth in NDC
    pub ndc: Vec3,
    pub view_normal: Vec3,
    pub world_position: Vec3,
    pub world_normal: Vec3,
    pub uv: Vec2,
    pub material: Option<MaterialId>,
}

/// Nearest-surface data for one bucket, filled independently of other tiles.
#[derive(Clone, Debug)]
pub struct Tile {
    rect: PixelRect,
    depth: Vec<f32>,
    surfaces: Vec<Option<Surface>>,
}

impl Tile {
    pub fn new(rect: PixelRect) -> Self {
        let len = rect.width() as usize * rect.height() as usize;
        Self {
            rect,
            depth: vec![1.0; len],
            surfaces: vec![None; len],
        }
    }

    pub fn rect(&self) -> PixelRect {
        self.rect
    }

    fn index(&self, x: u32, y: u32) -> usize {
        ((y - self.rect.y0) * self.rect.width() + (x - self.rect.x0)) as usize
    }

    /// Store `surface` if `depth` is strictly nearer than what the pixel holds.
    ///
    /// Returns whether the write happened. Pixels outside the tile are ignored.
    pub fn write(&mut self, x: u32, y: u32, depth: f32, surface: Surface) -> bool {
        if !self.rect.contains(x, y) {
            return false;
        }
        let index = self.index(x, y);
        if depth < self.depth[index] {
            self.depth[index] = depth;
            self.surfaces[index] = Some(surface);
            true
        } else {
            false
        }
    }

    pub fn surface(&self, x: u32, y: u32) -> Option<&Surface> {
        if !self.rect.contains(x, y) {
            return None;
        }
        self.surfaces[self.index(x, y)].as_ref()
    }
}

/// Full-resolution attachments written by the fragment stage and read by shading.
#[derive(Clone, Debug)]
pub struct FrameBuffer {
    width: u32,
    height: u32,
    pub color: Vec<Vec3>,
    /// Normalized depth, 1.0 where nothing was drawn
    pub depth: Vec<f32>,
    pub ndc: Vec<Vec3>,
    pub view_normal: Vec<Vec3>,
    pub world_position: Vec<Vec3>,
    pub world_normal: Vec<Vec3>,
    pub uv: Vec<Vec2>,
    pub material: Vec<Option<MaterialId>>,
}

impl FrameBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        let len = width as usize * height as usize;
        Self {
            width,
            height,
            color: vec![Vec3::ZERO; len],
            depth: vec![1.0; len],
            ndc: vec![Vec3::ZERO; len],
            view_normal: vec![Vec3::ZERO; len],
            world_position: vec![Vec3::ZERO; len],
            world_normal: vec![Vec3::ZERO; len],
            uv: vec![Vec2::ZERO; len],
            material: vec![None; len],
        }
    }

    /// Clear every attachment.
    pub fn reset(&mut self) {
        self.color.fill(Vec3::ZERO);
        self.depth.fill(1.0);
        self.ndc.fill(Vec3::ZERO);
        self.view_normal.fill(Vec3::ZERO);
        self.world_position.fill(Vec3::ZERO);
        self.world_normal.fill(Vec3::ZERO);
        self.uv.fill(Vec2::ZERO);
        self.material.fill(None);
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel_count(&self) -> usize {
        self.color.len()
    }

    pub fn index(&self, x: u32, y: u32) -> usize {
        (y * self.width + x) as usize
    }

    /// Whether any surface was drawn at pixel `index`.
    pub fn is_covered(&self, index: usize) -> bool {
        self.depth[index] < 1.0
    }

    /// Copy the surfaces a tile recorded into the attachments.
    pub fn merge_tile(&mut self, tile: &Tile) {
        let rect = tile.rect();
        for y in rect.y0..rect.y1 {
            for x in rect.x0..rect.x1 {
                let local = tile.index(x, y);
                let Some(surface) = tile.surfaces[local] else {
                    continue;
                };
                let index = self.index(x, y);
                self.depth[index] = tile.depth[local];
                self.ndc[index] = surface.ndc;
                self.view_normal[index] = surface.view_normal;
                self.world_position[index] = surface.world_position;
                self.world_normal[index] = surface.world_normal;
                self.uv[index] = surface.uv;
                self.material[index] = surface.material;
            }
        }
    }

    /// Depth stretched to [0, 1] over covered pixels; uncovered pixels are 1.
    pub fn depth_image(&self) -> Vec<f32> {
        let mut range = Interval::EMPTY;
        for (index, &d) in self.depth.iter().enumerate() {
            if self.is_covered(index) {
                range.include(d);
            }
        }

        self.depth
            .iter()
            .enumerate()
            .map(|(index, &d)| {
                if self.is_covered(index) {
                    range.normalize(d)
                } else {
                    1.0
                }
            })
            .collect()
    }

    /// View-space normals mapped to (n + 1) / 2; uncovered pixels are black.
    pub fn normal_image(&self) -> Vec<Vec3> {
        self.view_normal
            .iter()
            .enumerate()
            .map(|(index, &n)| {
                if self.is_covered(index) {
                    (n + Vec3::ONE) * 0.5
                } else {
                    Vec3::ZERO
                }
            })
            .collect()
    }
}
