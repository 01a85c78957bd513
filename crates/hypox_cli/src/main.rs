//! `hypox <config.json> [output_dir]`
//!
//! Loads a scene description, builds light visibility, renders one frame and
//! writes `color.png`, `depth.png` and `normal.png` to the output directory
//! (default: the current directory).

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use hypox_core::SceneConfig;
use hypox_renderer::{write_frame, write_light_debug, Camera, Rasterizer, Scene};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let Some(config_path) = args.next().map(PathBuf::from) else {
        bail!("usage: hypox <config.json> [output_dir]");
    };
    let output_dir = args.next().map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));

    log::info!("Hypox v{}", env!("CARGO_PKG_VERSION"));
    let start = Instant::now();

    let config = SceneConfig::load(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    let base_dir = config_path.parent().unwrap_or(Path::new("."));

    let mut scene = Scene::load(&config, base_dir).context("building scene")?;
    let camera = Camera::from_config(&config.camera).context("placing camera")?;

    scene
        .prepare_lighting(&config.render)
        .context("building light visibility")?;

    let mut rasterizer = Rasterizer::new(camera, config.render.clone());
    let frame = rasterizer.render(&scene);

    write_frame(&output_dir, frame).context("writing images")?;

    if config.render.debug_dumps {
        for (index, light) in scene.lights.iter().enumerate() {
            write_light_debug(&output_dir, index, light)
                .with_context(|| format!("writing debug buffers for light {index}"))?;
        }
        log::info!("Wrote debug buffers for {} lights", scene.lights.len());
    }

    log::info!("Done in {:.2?}", start.elapsed());
    Ok(())
}
