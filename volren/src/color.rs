/*
    volren
    Colors are RGBA in <0;1>, not premultiplied unless stated
*/

use nalgebra::{vector, Vector3, Vector4};

pub type RGBA = Vector4<f32>;

pub fn new(r: f32, g: f32, b: f32, a: f32) -> RGBA {
    vector![r, g, b, a]
}

pub fn zero() -> RGBA {
    vector![0.0, 0.0, 0.0, 0.0]
}

pub fn mono(v: f32, opacity: f32) -> RGBA {
    vector![v, v, v, opacity]
}

pub fn from_rgb(rgb: Vector3<f32>, opacity: f32) -> RGBA {
    vector![rgb.x, rgb.y, rgb.z, opacity]
}

/// Color from 8-bit channels
pub fn from_bytes(r: u8, g: u8, b: u8, a: u8) -> RGBA {
    vector![r, g, b, a].map(|c| c as f32 / 255.0)
}

/// Every channel in <0;1>
pub fn is_normalized(color: &RGBA) -> bool {
    color.iter().all(|c| (0.0..=1.0).contains(c))
}

pub fn clamp(color: RGBA) -> RGBA {
    color.map(|c| c.clamp(0.0, 1.0))
}

/// `src` over `dst`, both straight alpha
pub fn over(src: RGBA, dst: RGBA) -> RGBA {
    let out_a = src.w + dst.w * (1.0 - src.w);
    if out_a <= 0.0 {
        return zero();
    }
    let rgb = (src.xyz() * src.w + dst.xyz() * dst.w * (1.0 - src.w)) / out_a;
    from_rgb(rgb, out_a)
}

/// Quantize channel in <0;1> to byte
pub fn to_byte(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}
