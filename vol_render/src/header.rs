use byteorder::{ByteOrder, LittleEndian};

use crate::config::Config;

pub const HEADER_LEN: usize = 3 * 4 + 1 + 3 * 4 + 2;
const SAMPLE_ORDER_LINEAR: u8 = 1;

/// Header of a saved volume
/// little-endian, total length 27B
/// 1. resolution -- 3x 32bit ints (x,y,z)
/// 2. 1 byte padding
/// 3. cell shape -- 3x 32bit floats
/// 4. sample_order -- 2x 8bit -- linear order, `z` changing fastest
/// 5. data -- x*y*z 8bit values
pub fn generate_header(cfg: &Config) -> Vec<u8> {
    let mut vec = vec![0; HEADER_LEN];
    let slice = &mut vec[..];

    LittleEndian::write_u32(&mut slice[0..4], cfg.dims.x);
    LittleEndian::write_u32(&mut slice[4..8], cfg.dims.y);
    LittleEndian::write_u32(&mut slice[8..12], cfg.dims.z);
    // 1 byte gap
    LittleEndian::write_f32(&mut slice[13..17], cfg.cell_shape.x);
    LittleEndian::write_f32(&mut slice[17..21], cfg.cell_shape.y);
    LittleEndian::write_f32(&mut slice[21..25], cfg.cell_shape.z);

    slice[25] = SAMPLE_ORDER_LINEAR;
    slice[26] = 0;

    vec
}
