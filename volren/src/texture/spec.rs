use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextureFormat {
    Rgba8,
    Rgba16F,
    Rgba32F,
    Depth32,
}

impl TextureFormat {
    pub fn bytes_per_texel(&self) -> usize {
        match self {
            TextureFormat::Rgba8 => 4,
            TextureFormat::Rgba16F => 8,
            TextureFormat::Rgba32F => 16,
            TextureFormat::Depth32 => 4,
        }
    }

    pub fn channels(&self) -> usize {
        match self {
            TextureFormat::Depth32 => 1,
            _ => 4,
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(self, TextureFormat::Rgba16F | TextureFormat::Rgba32F)
    }
}

/// Buffers written by a pass next to its color output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuxiliaryKind {
    FirstHitPosition,
    FirstHitNormal,
    FirstHitShade,
    AmbientOcclusion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextureUsage {
    Color,
    Depth,
    Auxiliary(AuxiliaryKind),
}

/// How passes may borrow a lease
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Access {
    /// One pass at a time, reading or writing
    Exclusive,
    /// Any number of readers, a writer only when nobody reads
    Shared,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextureSpec {
    pub width: usize,
    pub height: usize,
    pub format: TextureFormat,
    pub usage: TextureUsage,
}

impl TextureSpec {
    pub fn color(width: usize, height: usize) -> TextureSpec {
        TextureSpec {
            width,
            height,
            format: TextureFormat::Rgba8,
            usage: TextureUsage::Color,
        }
    }

    pub fn depth(width: usize, height: usize) -> TextureSpec {
        TextureSpec {
            width,
            height,
            format: TextureFormat::Depth32,
            usage: TextureUsage::Depth,
        }
    }

    pub fn auxiliary(kind: AuxiliaryKind, width: usize, height: usize) -> TextureSpec {
        TextureSpec {
            width,
            height,
            format: TextureFormat::Rgba32F,
            usage: TextureUsage::Auxiliary(kind),
        }
    }

    pub fn with_format(mut self, format: TextureFormat) -> TextureSpec {
        self.format = format;
        self
    }

    pub fn texel_count(&self) -> usize {
        self.width * self.height
    }

    pub fn bytes(&self) -> usize {
        self.texel_count() * self.format.bytes_per_texel()
    }
}

/// Texels of a render target, stored as `f32` channels row by row
#[derive(Debug, Clone, PartialEq)]
pub struct TextureData {
    width: usize,
    height: usize,
    channels: usize,
    texels: Vec<f32>,
}

impl TextureData {
    pub fn new(spec: &TextureSpec) -> TextureData {
        let channels = spec.format.channels();
        TextureData {
            width: spec.width,
            height: spec.height,
            channels,
            texels: vec![0.0; spec.texel_count() * channels],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    fn offset(&self, x: usize, y: usize) -> usize {
        (x + y * self.width) * self.channels
    }

    pub fn texel(&self, x: usize, y: usize) -> &[f32] {
        let offset = self.offset(x, y);
        &self.texels[offset..offset + self.channels]
    }

    pub fn set_texel(&mut self, x: usize, y: usize, value: &[f32]) {
        let offset = self.offset(x, y);
        let n = self.channels.min(value.len());
        self.texels[offset..offset + n].copy_from_slice(&value[..n]);
    }

    /// One row of texels, `channels` values per texel
    pub fn row_mut(&mut self, y: usize) -> &mut [f32] {
        let start = self.offset(0, y);
        let len = self.width * self.channels;
        &mut self.texels[start..start + len]
    }

    /// Rows split for parallel writers
    pub fn rows_mut(&mut self) -> std::slice::ChunksExactMut<'_, f32> {
        let len = (self.width * self.channels).max(1);
        self.texels.chunks_exact_mut(len)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.texels
    }

    pub fn fill(&mut self, value: &[f32]) {
        for texel in self.texels.chunks_exact_mut(self.channels) {
            let n = self.channels.min(value.len());
            texel[..n].copy_from_slice(&value[..n]);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn sizes() {
        let spec = TextureSpec::auxiliary(AuxiliaryKind::FirstHitNormal, 10, 5);
        assert_eq!(spec.texel_count(), 50);
        assert_eq!(spec.bytes(), 800);
        assert_eq!(TextureSpec::depth(2, 2).bytes(), 16);
    }

    #[test]
    fn texel_access() {
        let mut data = TextureData::new(&TextureSpec::color(3, 2));
        data.set_texel(2, 1, &[1.0, 0.5, 0.25, 1.0]);
        assert_eq!(data.texel(2, 1), &[1.0, 0.5, 0.25, 1.0]);
        assert_eq!(data.texel(1, 1), &[0.0; 4]);
        assert_eq!(data.rows_mut().count(), 2);
        data.fill(&[0.1]);
        assert_eq!(data.texel(0, 0), &[0.1, 0.0, 0.0, 0.0]);
    }
}
