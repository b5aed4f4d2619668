//! Argument parsing and validation
//! Uses library `clap`

use std::ffi::OsStr;

use clap::{Arg, Command, ValueHint};

// up to 32bit value
pub fn is_positive_number(num: &str) -> Result<(), String> {
    let n = num.parse::<u32>();
    match n {
        Ok(n) => {
            if n > 0 {
                Ok(())
            } else {
                Err("Number must be greater than 0".into())
            }
        }
        Err(_) => Err("Number required".into()),
    }
}

pub fn can_fit_u8(num: &str) -> Result<(), String> {
    let n = num.parse::<u8>();
    match n {
        Ok(_) => Ok(()),
        Err(_) => Err("Number does not fit in range <0;255>".into()),
    }
}

pub fn is_float_number(num: &str) -> Result<(), String> {
    let n = num.parse::<f32>();
    match n {
        Ok(n) => {
            if n > 0.0 {
                Ok(())
            } else {
                Err("Number must be greater than 0.0".into())
            }
        }
        Err(_) => Err("Number required".into()),
    }
}

pub const GENERATOR_NAMES: &[&str] = &["shapes", "solid", "sphere"];
pub const VARIANT_NAMES: &[&str] = &[
    "slice",
    "simple",
    "fancy",
    "mip",
    "xray",
    "iso",
    "label",
];
pub const QUALITY_NAMES: &[&str] = &["very-low", "low", "normal", "high", "higher", "highest"];
pub const STEREO_NAMES: &[&str] = &["mono", "side-by-side", "anaglyph", "autostereo"];

pub fn get_command<'a>() -> Command<'a> {
    Command::new("Vol-render")
        .version("0.2.0")
        .about("Synthetic volume generator and headless renderer")
        .arg(
            Arg::new("dims")
                .help("Dimensions of volume")
                .long("dims")
                .short('d')
                .required(true)
                .number_of_values(3)
                .value_names(&["X", "Y", "Z"])
                .use_value_delimiter(true)
                .require_value_delimiter(true)
                .require_equals(true)
                .validator(is_positive_number),
        )
        .arg(
            Arg::new("shape")
                .help("Shape of cell")
                .long("shape")
                .short('s')
                .number_of_values(3)
                .value_names(&["X", "Y", "Z"])
                .use_value_delimiter(true)
                .require_value_delimiter(true)
                .require_equals(true)
                .default_values(&["1", "1", "1"])
                .validator(is_float_number),
        )
        .arg(
            Arg::new("generator")
                .help("Type of generator")
                .long("generator")
                .short('g')
                .required(true)
                .requires_ifs(&[
                    ("solid", "sample"), // if solid is set, require option sample
                    ("shapes", "n-of-shapes"),
                    ("shapes", "sample"),
                    ("shapes", "object-size"),
                ])
                .takes_value(true)
                .value_name("NAME")
                .possible_values(GENERATOR_NAMES),
        )
        .arg(
            Arg::new("seed")
                .help("Seed for RNG, leave out for random seed")
                .long("seed")
                .value_name("SEED")
                .validator(is_positive_number),
        )
        .arg(
            Arg::new("sample")
                .help("Values of generated object")
                .long("sample")
                .value_name("BYTE")
                .validator(|s| is_positive_number(s).and(can_fit_u8(s))),
        )
        .arg(
            Arg::new("object-size")
                .help("Size of individual generated objects")
                .long("object-size")
                .value_name("SIDE")
                .validator(is_positive_number),
        )
        .arg(
            Arg::new("n-of-shapes")
                .help("Number of shapes generated in volume")
                .long("n-of-shapes")
                .value_name("N")
                .validator(is_positive_number),
        )
        .arg(
            Arg::new("variant")
                .help("Raycaster variant")
                .long("variant")
                .short('v')
                .default_value("simple")
                .value_name("NAME")
                .possible_values(VARIANT_NAMES),
        )
        .arg(
            Arg::new("quality")
                .help("Sampling quality")
                .long("quality")
                .short('q')
                .default_value("normal")
                .value_name("TIER")
                .possible_values(QUALITY_NAMES),
        )
        .arg(
            Arg::new("resolution")
                .help("Resolution of the image")
                .long("resolution")
                .short('r')
                .number_of_values(2)
                .value_names(&["W", "H"])
                .use_value_delimiter(true)
                .require_value_delimiter(true)
                .require_equals(true)
                .default_values(&["512", "512"])
                .validator(is_positive_number),
        )
        .arg(
            Arg::new("stereo")
                .help("Stereo mode")
                .long("stereo")
                .default_value("mono")
                .value_name("MODE")
                .possible_values(STEREO_NAMES),
        )
        .arg(
            Arg::new("transfer-function")
                .help("Transfer function record (JSON)")
                .long("tf")
                .value_name("FILE")
                .allow_invalid_utf8(true)
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("output-file")
                .help("Rendered image (binary PPM)")
                .long("output-file")
                .short('o')
                .value_name("FILE")
                .allow_invalid_utf8(true)
                .value_hint(ValueHint::FilePath)
                .default_value_os(OsStr::new("render.ppm")),
        )
        .arg(
            Arg::new("first-hit")
                .help("Dump first hit positions as little-endian f32 RGBA")
                .long("first-hit")
                .value_name("FILE")
                .allow_invalid_utf8(true)
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("volume-file")
                .help("Save the generated volume")
                .long("volume-file")
                .value_name("FILE")
                .allow_invalid_utf8(true)
                .value_hint(ValueHint::FilePath),
        )
}
