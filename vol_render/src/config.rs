use std::{ffi::OsString, str::FromStr};

use clap::ArgMatches;
use nalgebra::{vector, Scalar, Vector3};
use volren::render::{Quality, RaycasterKind, StereoMode};

/// Transform `Values` into `Vector`
fn values_to_vector3<T>(args: &ArgMatches, key: &str) -> Result<Vector3<T>, String>
where
    T: FromStr + Scalar + Copy,
{
    let vals = values_of::<T>(args, key)?;
    match vals[..] {
        [x, y, z] => Ok(vector![x, y, z]),
        _ => Err(format!("{key} needs 3 values")),
    }
}

fn values_of<T: FromStr>(args: &ArgMatches, key: &str) -> Result<Vec<T>, String> {
    args.values_of(key)
        .ok_or_else(|| format!("missing {key}"))?
        .map(|v| v.parse::<T>().map_err(|_| format!("bad value '{v}' of {key}")))
        .collect()
}

fn value_of<T: FromStr>(args: &ArgMatches, key: &str) -> Result<T, String> {
    let v = args.value_of(key).ok_or_else(|| format!("missing {key}"))?;
    v.parse().map_err(|_| format!("bad value '{v}' of {key}"))
}

/// App configuration
/// Config is built from args parsed by `clap`
#[derive(Debug)]
pub struct Config {
    /// Dimensions of volume
    pub dims: Vector3<u32>,
    /// Shape of cells
    pub cell_shape: Vector3<f32>,
    /// Type of generator to be used
    pub generator: GeneratorConfig,
    /// Optional seed for RNG, to replicate results
    pub seed: Option<u64>,
    pub variant: RaycasterKind,
    pub quality: Quality,
    pub resolution: (usize, usize),
    pub stereo: StereoMode,
    /// Transfer function record, standard function if not set
    pub transfer_function: Option<OsString>,
    // Output file name
    pub file_name: OsString,
    pub first_hit_file: Option<OsString>,
    pub volume_file: Option<OsString>,
}

impl Config {
    pub fn from_args(args: ArgMatches) -> Result<Config, String> {
        let dims = values_to_vector3(&args, "dims")?;
        let cell_shape = values_to_vector3(&args, "shape")?;
        let generator = GeneratorConfig::from_args(&args)?;
        let seed = args
            .value_of("seed")
            .map(|s| s.parse())
            .transpose()
            .map_err(|_| "bad seed")?;

        let variant = match args.value_of("variant") {
            Some("slice") => RaycasterKind::Slice,
            Some("fancy") => RaycasterKind::FancyDvr,
            Some("mip") => RaycasterKind::Mip,
            Some("xray") => RaycasterKind::XRay,
            Some("iso") => RaycasterKind::Isosurface,
            Some("label") => RaycasterKind::LabelAware,
            _ => RaycasterKind::SimpleDvr,
        };

        let quality = match args.value_of("quality") {
            Some("very-low") => Quality::VeryLow,
            Some("low") => Quality::Low,
            Some("high") => Quality::High,
            Some("higher") => Quality::Higher,
            Some("highest") => Quality::Highest,
            _ => Quality::Normal,
        };

        let resolution = match values_of::<usize>(&args, "resolution")?[..] {
            [w, h] => (w, h),
            _ => return Err("resolution needs 2 values".into()),
        };

        let stereo = match args.value_of("stereo") {
            Some("side-by-side") => StereoMode::SideBySide,
            Some("anaglyph") => StereoMode::Anaglyph,
            Some("autostereo") => StereoMode::Autostereoscopic,
            _ => StereoMode::Monoscopic,
        };

        let file_name = args
            .value_of_os("output-file")
            .ok_or("missing output file")?
            .into();

        Ok(Config {
            dims,
            cell_shape,
            generator,
            seed,
            variant,
            quality,
            resolution,
            stereo,
            transfer_function: args.value_of_os("transfer-function").map(Into::into),
            file_name,
            first_hit_file: args.value_of_os("first-hit").map(Into::into),
            volume_file: args.value_of_os("volume-file").map(Into::into),
        })
    }
}

/// Settings specific to generator variant
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GeneratorConfig {
    /// Generate randomly placed shapes
    Shapes {
        n_of_shapes: usize,
        sample: u8,
        obj_size: u32,
    },
    /// Generate solid volume
    Solid { sample: u8 },
    /// Sphere with intensity falling off from the center
    Sphere,
}

impl GeneratorConfig {
    pub fn from_args(args: &ArgMatches) -> Result<GeneratorConfig, String> {
        match args.value_of("generator") {
            Some("shapes") => Ok(GeneratorConfig::Shapes {
                n_of_shapes: value_of(args, "n-of-shapes")?,
                sample: value_of(args, "sample")?,
                obj_size: value_of(args, "object-size")?,
            }),
            Some("solid") => Ok(GeneratorConfig::Solid {
                sample: value_of(args, "sample")?,
            }),
            Some("sphere") => Ok(GeneratorConfig::Sphere),
            other => Err(format!("unknown generator {other:?}")),
        }
    }
}
