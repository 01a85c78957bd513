//! The per-frame rendering pipeline.
//!
//! A frame runs in three stages, each parallelized with rayon:
//!
//! 1. **Vertex**: every world-space triangle is projected, clipped against the
//!    near plane and bounded in pixels. Results keep submission order.
//! 2. **Fragment**: each bucket rasterizes every overlapping triangle into its
//!    own tile with a strict nearest-depth test, then the tiles are merged.
//!    Because a tile sees triangles in submission order, ties resolve exactly
//!    as a single-threaded pass would.
//! 3. **Shading**: each covered pixel is lit with ambient, Blinn-Phong direct
//!    lighting from every visible light, and one-bounce indirect lighting from
//!    the lights' VPLs.

use std::ops::{Add, Mul};

use hypox_core::{Material, MaterialId, RenderSettings};
use hypox_math::{Interval, Mat4Ext, Vec2, Vec3};
use rayon::prelude::*;

use crate::bucket::generate_buckets;
use crate::camera::{Camera, LENGTH_EPS};
use crate::framebuffer::{FrameBuffer, Surface, Tile};
use crate::light::Light;
use crate::raster::{self, ClipVertex, PixelRect, ScreenTriangle};
use crate::scene::Scene;

/// Per-vertex attributes interpolated across camera-pass triangles.
#[derive(Clone, Copy, Debug, PartialEq)]
struct SurfaceVarying {
    view_normal: Vec3,
    world_position: Vec3,
    world_normal: Vec3,
    uv: Vec2,
}

impl Add for SurfaceVarying {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            view_normal: self.view_normal + other.view_normal,
            world_position: self.world_position + other.world_position,
            world_normal: self.world_normal + other.world_normal,
            uv: self.uv + other.uv,
        }
    }
}

impl Mul<f32> for SurfaceVarying {
    type Output = Self;

    fn mul(self, t: f32) -> Self {
        Self {
            view_normal: self.view_normal * t,
            world_position: self.world_position * t,
            world_normal: self.world_normal * t,
            uv: self.uv * t,
        }
    }
}

/// Output of the vertex stage.
#[derive(Clone, Copy, Debug)]
struct ProjectedTriangle {
    screen: ScreenTriangle<SurfaceVarying>,
    bounds: PixelRect,
    material: Option<MaterialId>,
}

/// Renders scenes from one camera into an owned [`FrameBuffer`].
#[derive(Debug)]
pub struct Rasterizer {
    camera: Camera,
    settings: RenderSettings,
    frame: FrameBuffer,
}

impl Rasterizer {
    pub fn new(camera: Camera, settings: RenderSettings) -> Self {
        let frame = FrameBuffer::new(camera.width(), camera.height());
        Self {
            camera,
            settings,
            frame,
        }
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// Attachments of the last rendered frame.
    pub fn frame(&self) -> &FrameBuffer {
        &self.frame
    }

    /// Render `scene` and return the filled frame buffer.
    ///
    /// Light visibility must already be prepared; lights without it treat
    /// every point as visible.
    pub fn render(&mut self, scene: &Scene) -> &FrameBuffer {
        let start = std::time::Instant::now();
        self.frame.reset();

        let triangles = self.vertex_stage(scene);
        log::info!(
            "Vertex stage: {} of {} triangles on screen",
            triangles.len(),
            scene.triangle_count()
        );

        self.fragment_stage(&triangles);
        let covered = (0..self.frame.pixel_count())
            .filter(|&i| self.frame.is_covered(i))
            .count();
        log::info!(
            "Fragment stage: {} of {} pixels covered",
            covered,
            self.frame.pixel_count()
        );

        self.shading_stage(scene);
        log::info!("Frame rendered in {:.2?}", start.elapsed());

        &self.frame
    }

    fn vertex_stage(&self, scene: &Scene) -> Vec<ProjectedTriangle> {
        let view = self.camera.view_matrix();
        let view_proj = self.camera.view_projection(false);
        let (width, height) = (self.camera.width(), self.camera.height());

        let triangles: Vec<_> = scene
            .objects
            .iter()
            .flat_map(|object| object.triangles())
            .collect();

        let projected: Vec<Vec<ProjectedTriangle>> = triangles
            .par_iter()
            .map(|tri| {
                let vertices = tri.vertices().map(|v| {
                    ClipVertex::new(
                        view_proj.transform_homogeneous(v.position),
                        SurfaceVarying {
                            view_normal: view.transform_direction(v.normal),
                            world_position: v.position,
                            world_normal: v.normal,
                            uv: v.uv,
                        },
                    )
                });

                raster::clip_near(vertices)
                    .into_iter()
                    .filter_map(|clipped| {
                        let screen = ScreenTriangle::from_clip(clipped);
                        let bounds = screen.pixel_bounds(width, height)?;
                        Some(ProjectedTriangle {
                            screen,
                            bounds,
                            material: tri.material(),
                        })
                    })
                    .collect()
            })
            .collect();

        projected.into_iter().flatten().collect()
    }

    fn fragment_stage(&mut self, triangles: &[ProjectedTriangle]) {
        let (width, height) = (self.frame.width(), self.frame.height());
        let buckets = generate_buckets(width, height, self.settings.bucket_size);

        let tiles: Vec<Tile> = buckets
            .par_iter()
            .map(|bucket| {
                let rect = bucket.rect();
                let mut tile = Tile::new(rect);

                for tri in triangles {
                    let Some(area) = tri.bounds.intersect(&rect) else {
                        continue;
                    };
                    tri.screen.rasterize(area, width, height, |frag| {
                        if !Interval::NDC.contains(frag.ndc.z) {
                            return;
                        }
                        let v = frag.varying;
                        tile.write(
                            frag.x,
                            frag.y,
                            raster::normalized_depth(frag.ndc.z),
                            Surface {
                                ndc: frag.ndc,
                                view_normal: v.view_normal.normalize_or_zero(),
                                world_position: v.world_position,
                                world_normal: v.world_normal.normalize_or_zero(),
                                uv: v.uv,
                                material: tri.material,
                            },
                        );
                    });
                }
                tile
            })
            .collect();

        for tile in &tiles {
            self.frame.merge_tile(tile);
        }
    }

    fn shading_stage(&mut self, scene: &Scene) {
        let eye = self.camera.position();
        let ambient = self.settings.ambient;
        let FrameBuffer {
            color,
            world_position,
            world_normal,
            uv,
            material,
            ..
        } = &mut self.frame;
        let (world_position, world_normal, uv, material) =
            (&*world_position, &*world_normal, &*uv, &*material);

        color.par_iter_mut().enumerate().for_each(|(i, color)| {
            let Some(material) = material[i].and_then(|id| scene.materials.get(id)) else {
                return;
            };
            *color = shade(
                material,
                world_position[i],
                world_normal[i],
                uv[i],
                eye,
                ambient,
                &scene.lights,
            );
        });
    }
}

/// Light one surface point.
///
/// Lights that cannot see `position` contribute nothing, direct or indirect.
pub fn shade(
    material: &Material,
    position: Vec3,
    normal: Vec3,
    uv: Vec2,
    eye: Vec3,
    ambient: Vec3,
    lights: &[Light],
) -> Vec3 {
    let base = material.eval_color(uv);
    let shininess = material.eval_shininess();
    let n = normal.normalize_or_zero();
    let v = (eye - position).normalize_or_zero();

    let mut color = ambient * base;

    for light in lights {
        if !light.is_visible(position) {
            continue;
        }

        for sample in light.direct_samples() {
            let l = (sample.position - position).normalize_or_zero();
            let n_dot_l = n.dot(l);
            if n_dot_l <= 0.0 {
                continue;
            }
            let h = (l + v).normalize_or_zero();
            let specular = n.dot(h).max(0.0).powf(shininess);
            color += sample.intensity * base * (n_dot_l + specular);
        }

        for vpl in light.indirect_samples() {
            let offset = vpl.position - position;
            let distance = offset.length();
            if distance < LENGTH_EPS {
                continue;
            }
            let l = offset / distance;
            let receiver = n.dot(l).max(0.0);
            let emitter = vpl.normal.dot(-l).max(0.0);
            color += vpl.flux * base * receiver * emitter;
        }
    }

    color
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::light::{AreaLight, PointLight, Vpl};
    use hypox_core::{MaterialLibrary, Object, Triangle, Vertex};

    const BASE: f32 = 0.8;
    const SHININESS: f32 = 16.0;
    const AMBIENT: f32 = 0.1;

    fn floor() -> Vec<Triangle> {
        let v = |x: f32, y: f32| Vertex::new(Vec3::new(x, y, 0.0), Vec3::Z, Vec2::ZERO);
        vec![
            Triangle::new(v(-4.0, -4.0), v(4.0, -4.0), v(4.0, 4.0)),
            Triangle::new(v(-4.0, -4.0), v(4.0, 4.0), v(-4.0, 4.0)),
        ]
    }

    fn occluder() -> Vec<Triangle> {
        vec![Triangle::new(
            Vertex::new(Vec3::new(-0.5, -0.5, 1.0), Vec3::Z, Vec2::ZERO),
            Vertex::new(Vec3::new(0.5, -0.5, 1.0), Vec3::Z, Vec2::ZERO),
            Vertex::new(Vec3::new(0.0, 0.6, 1.0), Vec3::Z, Vec2::ZERO),
        )]
    }

    fn camera() -> Camera {
        let mut camera = Camera::new(64, 64).with_lens(1.0, 60.0);
        camera.move_to(Vec3::new(0.0, -6.0, 3.0));
        camera.look_at(Vec3::ZERO).unwrap();
        camera
    }

    fn settings(bucket_size: u32) -> RenderSettings {
        RenderSettings {
            ambient: Vec3::splat(AMBIENT),
            shadow_resolution: 256,
            bucket_size,
            ..Default::default()
        }
    }

    fn scene(with_occluder: bool) -> Scene {
        let mut materials = MaterialLibrary::new();
        let grey = materials.add(Material::color("grey", Vec3::splat(BASE), SHININESS));

        let mut objects = vec![Object::from_triangles("floor", floor())];
        if with_occluder {
            objects.push(Object::from_triangles("occluder", occluder()));
        }
        for object in &mut objects {
            object.set_material(Some(grey));
        }

        let lights = vec![Light::Point(PointLight::new(Vec3::new(0.0, 0.0, 2.0), Vec3::ONE))];
        let mut scene = Scene::new(objects, lights, materials);
        scene.prepare_lighting(&settings(32)).unwrap();
        scene
    }

    /// Frame-buffer index of the pixel the world origin lands in.
    fn origin_pixel(camera: &Camera, frame: &FrameBuffer) -> usize {
        let clip = camera.view_projection(false).transform_homogeneous(Vec3::ZERO);
        let ndc = clip.truncate() / clip.w;
        let (x, y) = raster::ndc_to_texel(ndc.truncate(), frame.width(), frame.height()).unwrap();
        frame.index(x, y)
    }

    #[test]
    fn test_lit_floor() {
        let scene = scene(false);
        let mut rasterizer = Rasterizer::new(camera(), settings(32));
        let frame = rasterizer.render(&scene);
        let i = origin_pixel(&camera(), frame);

        assert!(frame.is_covered(i));
        let p = frame.world_position[i];
        assert!(p.z.abs() < 1e-4);
        assert!(p.length() < 0.2);
        assert!((frame.world_normal[i] - Vec3::Z).length() < 1e-5);
        assert!(scene.lights[0].is_visible(p));

        let l = (Vec3::new(0.0, 0.0, 2.0) - p).normalize();
        let v = (Vec3::new(0.0, -6.0, 3.0) - p).normalize();
        let h = (l + v).normalize();
        let expected = AMBIENT * BASE + BASE * l.z + BASE * h.z.max(0.0).powf(SHININESS);

        let color = frame.color[i];
        assert!((color.x - expected).abs() < 1e-4, "{color} vs {expected}");
        assert_eq!(color.x, color.y);
        assert_eq!(color.y, color.z);
    }

    #[test]
    fn test_shadowed_floor_is_ambient_only() {
        let scene = scene(true);
        let mut rasterizer = Rasterizer::new(camera(), settings(32));
        let frame = rasterizer.render(&scene);
        let i = origin_pixel(&camera(), frame);

        // The camera sees past the occluder to the floor
        assert!(frame.world_position[i].z.abs() < 1e-4);
        assert!(!scene.lights[0].is_visible(frame.world_position[i]));

        let color = frame.color[i];
        assert!((color - Vec3::splat(AMBIENT * BASE)).length() < 1e-6);
    }

    #[test]
    fn test_unoccluded_floor_is_never_shadowed() {
        let settings = RenderSettings::default();
        let mut materials = MaterialLibrary::new();
        let grey = materials.add(Material::color("grey", Vec3::splat(BASE), SHININESS));
        let mut floor = Object::from_triangles("floor", floor());
        floor.set_material(Some(grey));

        let lights = vec![
            Light::Point(PointLight::new(Vec3::new(0.0, 0.0, 2.0), Vec3::ONE)),
            Light::Point(PointLight::new(Vec3::new(3.0, 2.0, 1.0), Vec3::ONE)),
            Light::Area(
                AreaLight::new(
                    Vec3::new(2.0, -2.0, 3.0),
                    Vec3::new(-0.4, 0.4, -1.0),
                    Vec2::ONE,
                    Vec3::ONE,
                    2,
                )
                .unwrap(),
            ),
        ];
        let mut scene = Scene::new(vec![floor], lights, materials);
        scene.prepare_lighting(&settings).unwrap();

        let mut camera = Camera::new(128, 128).with_lens(1.0, 60.0);
        camera.move_to(Vec3::new(0.0, -10.0, 6.0));
        camera.look_at(Vec3::ZERO).unwrap();
        let mut rasterizer = Rasterizer::new(camera, settings);
        let frame = rasterizer.render(&scene);

        let covered: Vec<usize> = (0..frame.pixel_count()).filter(|&i| frame.is_covered(i)).collect();
        assert!(covered.len() > 1000);

        for (index, light) in scene.lights.iter().enumerate() {
            let shadowed = covered
                .iter()
                .filter(|&&i| !light.is_visible(frame.world_position[i]))
                .count();
            assert_eq!(shadowed, 0, "light {index}");
        }
    }

    #[test]
    fn test_bucket_size_does_not_change_image() {
        let scene = scene(true);
        let mut small = Rasterizer::new(camera(), settings(7));
        let mut large = Rasterizer::new(camera(), settings(64));

        let a = small.render(&scene).clone();
        let b = large.render(&scene);

        assert_eq!(a.depth, b.depth);
        assert_eq!(a.color, b.color);
        assert_eq!(a.material, b.material);
    }

    #[test]
    fn test_nearest_surface_wins() {
        let scene = scene(true);
        let mut rasterizer = Rasterizer::new(camera(), settings(32));
        let frame = rasterizer.render(&scene);

        // Ray from the camera through the occluder's centroid
        let target = Vec3::new(0.0, -0.4 / 3.0, 1.0);
        let clip = camera().view_projection(false).transform_homogeneous(target);
        let ndc = clip.truncate() / clip.w;
        let (x, y) = raster::ndc_to_texel(ndc.truncate(), 64, 64).unwrap();
        let i = frame.index(x, y);

        assert!((frame.world_position[i].z - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_uncovered_pixels() {
        let mut camera = Camera::new(16, 16);
        camera.move_to(Vec3::new(0.0, 0.0, 5.0));
        camera.look_at(Vec3::new(0.0, 0.0, 10.0)).unwrap();

        let scene = scene(false);
        let mut rasterizer = Rasterizer::new(camera, settings(32));
        let frame = rasterizer.render(&scene);

        assert!(frame.color.iter().all(|&c| c == Vec3::ZERO));
        assert!(frame.depth_image().iter().all(|&d| d == 1.0));
        assert!(frame.normal_image().iter().all(|&n| n == Vec3::ZERO));
    }

    #[test]
    fn test_camera_inside_geometry_clips_near_plane() {
        // A floor that extends behind the camera
        let mut camera = Camera::new(32, 32).with_lens(0.1, 90.0);
        camera.move_to(Vec3::new(0.0, 0.0, 0.5));
        camera.look_at(Vec3::new(0.0, 4.0, 0.0)).unwrap();

        let scene = scene(false);
        let mut rasterizer = Rasterizer::new(camera, settings(32));
        let frame = rasterizer.render(&scene);

        let covered = (0..frame.pixel_count()).filter(|&i| frame.is_covered(i)).count();
        assert!(covered > 0);
        for i in (0..frame.pixel_count()).filter(|&i| frame.is_covered(i)) {
            assert!(frame.world_position[i].z.abs() < 1e-3);
            assert!(frame.color[i].is_finite());
        }
    }

    #[test]
    fn test_shade_indirect_term() {
        let material = Material::color("white", Vec3::ONE, SHININESS);
        let mut light = Light::Area(
            AreaLight::new(Vec3::new(0.0, 0.0, 5.0), Vec3::NEG_Z, Vec2::ONE, Vec3::ZERO, 1).unwrap(),
        );
        if let Light::Area(area) = &mut light {
            area.set_indirect(vec![Vpl {
                position: Vec3::new(1.0, 0.0, 1.0),
                flux: Vec3::splat(2.0),
                normal: Vec3::NEG_X,
            }]);
        }

        let color = shade(
            &material,
            Vec3::ZERO,
            Vec3::Z,
            Vec2::ZERO,
            Vec3::new(0.0, 0.0, 3.0),
            Vec3::ZERO,
            std::slice::from_ref(&light),
        );

        // L = (1, 0, 1) / sqrt(2): receiver and emitter cosines are both 1/sqrt(2)
        assert!((color - Vec3::ONE).length() < 1e-5);
    }
}
