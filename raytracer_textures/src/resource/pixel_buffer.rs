/// CPU-side pixel storage for textures.
///
/// Decoders (PNG, EXR, ...) live outside this crate and hand over raw
/// interleaved samples. A `PixelBuffer` validates that the sample count
/// matches `width * height * channels` once, at construction, so the packer
/// and upload pipeline can index without re-checking.

use glam::UVec2;
use crate::error::{Error, Result};

/// Sample storage, interleaved row-major
#[derive(Debug, Clone, PartialEq)]
pub enum PixelData {
    /// 8-bit normalized samples (0 = 0.0, 255 = 1.0)
    U8(Vec<u8>),
    /// 32-bit float samples, stored linear
    F32(Vec<f32>),
}

/// Sample type of a pixel buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleType {
    U8,
    F32,
}

impl SampleType {
    pub fn size_in_bytes(self) -> usize {
        match self {
            SampleType::U8 => 1,
            SampleType::F32 => 4,
        }
    }
}

impl PixelData {
    pub fn sample_type(&self) -> SampleType {
        match self {
            PixelData::U8(_) => SampleType::U8,
            PixelData::F32(_) => SampleType::F32,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            PixelData::U8(samples) => samples.len(),
            PixelData::F32(samples) => samples.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Interleaved image with 1 to 4 channels
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    size: UVec2,
    channels: u32,
    data: PixelData,
}

impl PixelBuffer {
    /// Maximum channel count (RGBA)
    pub const MAX_CHANNELS: u32 = 4;

    /// Wrap decoded samples, validating dimensions and sample count
    pub fn new(width: u32, height: u32, channels: u32, data: PixelData) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidResource(format!(
                "pixel buffer has zero extent ({}x{})",
                width, height
            )));
        }
        if channels == 0 || channels > Self::MAX_CHANNELS {
            return Err(Error::InvalidResource(format!(
                "pixel buffer has {} channels (expected 1..={})",
                channels,
                Self::MAX_CHANNELS
            )));
        }
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|pixels| pixels.checked_mul(channels as usize))
            .ok_or_else(|| Error::InvalidResource(format!(
                "pixel buffer {}x{}x{} overflows",
                width, height, channels
            )))?;
        if data.len() != expected {
            return Err(Error::InvalidResource(format!(
                "pixel buffer {}x{}x{} needs {} samples, got {}",
                width,
                height,
                channels,
                expected,
                data.len()
            )));
        }
        Ok(Self {
            size: UVec2::new(width, height),
            channels,
            data,
        })
    }

    pub fn from_u8(width: u32, height: u32, channels: u32, samples: Vec<u8>) -> Result<Self> {
        Self::new(width, height, channels, PixelData::U8(samples))
    }

    pub fn from_f32(width: u32, height: u32, channels: u32, samples: Vec<f32>) -> Result<Self> {
        Self::new(width, height, channels, PixelData::F32(samples))
    }

    /// Image where every pixel equals `pixel` (channel count = `pixel.len()`)
    pub fn filled_u8(width: u32, height: u32, pixel: &[u8]) -> Result<Self> {
        let count = (width as usize) * (height as usize);
        Self::from_u8(width, height, pixel.len() as u32, pixel.repeat(count))
    }

    /// Image where every pixel equals `pixel` (channel count = `pixel.len()`)
    pub fn filled_f32(width: u32, height: u32, pixel: &[f32]) -> Result<Self> {
        let count = (width as usize) * (height as usize);
        Self::from_f32(width, height, pixel.len() as u32, pixel.repeat(count))
    }

    pub fn width(&self) -> u32 {
        self.size.x
    }

    pub fn height(&self) -> u32 {
        self.size.y
    }

    pub fn size(&self) -> UVec2 {
        self.size
    }

    pub fn channels(&self) -> u32 {
        self.channels
    }

    pub fn sample_type(&self) -> SampleType {
        self.data.sample_type()
    }

    pub fn data(&self) -> &PixelData {
        &self.data
    }

    pub fn into_data(self) -> PixelData {
        self.data
    }

    pub fn pixel_count(&self) -> usize {
        (self.size.x as usize) * (self.size.y as usize)
    }

    pub fn byte_len(&self) -> usize {
        self.data.len() * self.sample_type().size_in_bytes()
    }

    /// Raw upload payload (native-endian for float data)
    pub fn as_bytes(&self) -> &[u8] {
        match &self.data {
            PixelData::U8(samples) => samples.as_slice(),
            PixelData::F32(samples) => bytemuck::cast_slice(samples.as_slice()),
        }
    }

    /// Normalized sample value of `channel` at linear pixel `index`
    ///
    /// Out-of-range positions are a caller bug; the packer validates channels
    /// and sizes before it starts reading.
    pub fn sample(&self, index: usize, channel: u32) -> f32 {
        let offset = index * self.channels as usize + channel as usize;
        match &self.data {
            PixelData::U8(samples) => samples[offset] as f32 / 255.0,
            PixelData::F32(samples) => samples[offset],
        }
    }

    /// Expand 3-channel data to RGBA with an opaque alpha
    ///
    /// Other channel counts are returned unchanged.
    pub fn to_rgba(&self) -> PixelBuffer {
        if self.channels != 3 {
            return self.clone();
        }
        let data = match &self.data {
            PixelData::U8(samples) => PixelData::U8(
                samples
                    .chunks_exact(3)
                    .flat_map(|rgb| [rgb[0], rgb[1], rgb[2], u8::MAX])
                    .collect(),
            ),
            PixelData::F32(samples) => PixelData::F32(
                samples
                    .chunks_exact(3)
                    .flat_map(|rgb| [rgb[0], rgb[1], rgb[2], 1.0])
                    .collect(),
            ),
        };
        PixelBuffer {
            size: self.size,
            channels: 4,
            data,
        }
    }
}

#[cfg(test)]
#[path = "pixel_buffer_tests.rs"]
mod tests;
