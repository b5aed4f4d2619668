//! Files written by the renderer

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use byteorder::{LittleEndian, WriteBytesExt};

use crate::{config::Config, header::generate_header};

/// Binary PPM (P6) of an RGB8 image
pub fn write_ppm(
    mut out: impl Write,
    width: usize,
    height: usize,
    pixels: &[u8],
) -> std::io::Result<()> {
    write!(out, "P6\n{width} {height}\n255\n")?;
    out.write_all(pixels)?;
    out.flush()
}

/// Raw `f32` texels, little-endian
pub fn write_texels(mut out: impl Write, texels: &[f32]) -> std::io::Result<()> {
    for &t in texels {
        out.write_f32::<LittleEndian>(t)?;
    }
    out.flush()
}

/// Volume with a header, readable by the volume file tools
pub fn write_volume(mut out: impl Write, cfg: &Config, samples: &[u8]) -> std::io::Result<()> {
    out.write_all(&generate_header(cfg))?;
    out.write_all(samples)?;
    out.flush()
}

pub fn create(path: impl AsRef<Path>) -> std::io::Result<BufWriter<File>> {
    Ok(BufWriter::new(File::create(path)?))
}
