//! Hypox Renderer - CPU Rasterization with RSM Global Illumination
//!
//! A multi-threaded software rasterizer. Each frame projects the scene
//! through a pinhole camera into a G-buffer and shades it with Blinn-Phong
//! direct lighting, cube-map and reflective shadow maps, and one-bounce
//! indirect lighting from virtual point lights.

mod bucket;
mod camera;
mod framebuffer;
mod light;
mod output;
mod raster;
mod rasterizer;
mod rsm;
mod scene;
mod shadow_map;

pub use bucket::{generate_buckets, Bucket, DEFAULT_BUCKET_SIZE};
pub use camera::{look_basis, Camera, CameraError, DEFAULT_FAR, DEFAULT_FOCAL_LENGTH, DEFAULT_FOV};
pub use framebuffer::{FrameBuffer, Surface, Tile};
pub use light::{
    AreaLight, DirectVpl, Light, LightError, PointLight, Vpl, AREA_LIGHT_FOV, POINT_LIGHT_FOV,
};
pub use output::{
    encode_channel, write_color_image, write_frame, write_light_debug, write_scalar_image,
    ImageError,
};
pub use raster::{clip_near, normalized_depth, ClipVertex, Fragment, PixelRect, ScreenTriangle, Varying};
pub use rasterizer::{shade, Rasterizer};
pub use rsm::{Rsm, RsmImages, FLUX_THRESHOLD, VPL_NORMAL_OFFSET};
pub use scene::{Scene, SceneError};
pub use shadow_map::{ShadowMap, ShadowMapError, Visibility, SHADOW_BIAS, SHADOW_FOCAL_LENGTH};

/// Re-export Vec3 and common math types from hypox_math
pub use hypox_math::{Aabb, Interval, Vec2, Vec3};
