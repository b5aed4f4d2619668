use std::error::Error;

use log::{info, warn};
use volren::{
    render::{
        FirstHitOutputs, FrameOutcome, GraphicsCapabilities, Pipeline, PipelineConfig,
        RenderSettings, ViewKind,
    },
    texture::{AuxiliaryKind, TextureUsage},
    volumetric::{DataSource, VolumeMetadata},
};

use crate::{
    config::Config,
    generators::{generate_samples, get_sample_generator},
    output,
};

pub fn settings_from_config(cfg: &Config) -> Result<RenderSettings, Box<dyn Error>> {
    let mut settings = RenderSettings::builder()
        .resolution(cfg.resolution)
        .quality(cfg.quality)
        .build()?;
    settings.stereo.mode = cfg.stereo;
    if cfg.first_hit_file.is_some() {
        settings.first_hit = FirstHitOutputs {
            position: true,
            ..Default::default()
        };
    }
    Ok(settings)
}

/// Generate the volume, render it and write all requested files
pub fn run(cfg: &Config) -> Result<(), Box<dyn Error>> {
    info!("Generating volume {:?}", cfg.dims);
    let generator = get_sample_generator(cfg);
    let samples = generate_samples(generator.as_ref(), cfg.dims, true);

    if let Some(path) = &cfg.volume_file {
        output::write_volume(output::create(path)?, cfg, &samples)?;
        info!("Volume saved to {:?}", path);
    }

    let pipeline_config = PipelineConfig {
        default_settings: settings_from_config(cfg)?,
        ..Default::default()
    };
    let mut pipeline = Pipeline::new(pipeline_config, GraphicsCapabilities::default())?;

    if let Some(path) = &cfg.transfer_function {
        pipeline.load_transfer_function(path)?;
    }

    let size = cfg.dims.map(|d| d as usize);
    let metadata =
        VolumeMetadata::new(size, DataSource::U8(samples)).with_scale(cfg.cell_shape);
    let volume = pipeline.import_volume(metadata)?;
    let view = pipeline.add_view(ViewKind::Main, volume, cfg.variant)?;

    let frame = match pipeline.render(view)? {
        FrameOutcome::Composited(frame) => frame,
        FrameOutcome::Cancelled => return Err("frame was cancelled".into()),
    };
    if frame.degraded {
        warn!("Rendered at reduced quality {:?}", frame.quality);
    }
    for pass in &frame.passes {
        info!(
            "{:?} pass: {} rays hit, {} samples, {} terminated early",
            pass.kind, pass.rays_hit, pass.samples, pass.early_terminations
        );
    }

    output::write_ppm(
        output::create(&cfg.file_name)?,
        frame.width,
        frame.height,
        frame.pixels(),
    )?;
    info!("Image saved to {:?}", cfg.file_name);

    if let Some(path) = &cfg.first_hit_file {
        let usage = TextureUsage::Auxiliary(AuxiliaryKind::FirstHitPosition);
        match pipeline
            .compositor()
            .auxiliary(view, usage, pipeline.container())?
        {
            Some(texture) => {
                output::write_texels(output::create(path)?, texture.as_slice())?;
                info!("First hit positions saved to {:?}", path);
            }
            None => warn!("No first hit output, variant {:?} does not produce it", cfg.variant),
        }
    }

    pipeline.present(view)?;
    Ok(())
}

#[cfg(test)]
mod test {
    use nalgebra::vector;
    use volren::render::{Quality, RaycasterKind, StereoMode};

    use super::*;
    use crate::config::GeneratorConfig;

    fn config(dir: &std::path::Path) -> Config {
        Config {
            dims: vector![16, 16, 16],
            cell_shape: vector![1.0, 1.0, 1.0],
            generator: GeneratorConfig::Solid { sample: 200 },
            seed: None,
            variant: RaycasterKind::SimpleDvr,
            quality: Quality::Low,
            resolution: (24, 16),
            stereo: StereoMode::Monoscopic,
            transfer_function: None,
            file_name: dir.join("image.ppm").into(),
            first_hit_file: Some(dir.join("first_hit.raw").into()),
            volume_file: Some(dir.join("volume.vol").into()),
        }
    }

    #[test]
    fn writes_all_outputs() {
        let dir = std::env::temp_dir().join(format!("vol_render_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let cfg = config(&dir);
        run(&cfg).unwrap();

        let image = std::fs::read(dir.join("image.ppm")).unwrap();
        assert!(image.starts_with(b"P6\n24 16\n255\n"));
        assert_eq!(image.len(), 13 + 24 * 16 * 3);

        let first_hit = std::fs::read(dir.join("first_hit.raw")).unwrap();
        assert_eq!(first_hit.len(), 24 * 16 * 4 * 4);

        let volume = std::fs::read(dir.join("volume.vol")).unwrap();
        assert_eq!(volume.len(), crate::header::HEADER_LEN + 16 * 16 * 16);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
