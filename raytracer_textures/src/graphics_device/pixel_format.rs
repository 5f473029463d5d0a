/// GPU pixel formats and per-role format selection.

use crate::error::{Error, Result};
use crate::resource::pixel_buffer::SampleType;
use crate::resource::role::{ColorSpace, TextureRole};

/// Sampled texture formats the upload pipeline can produce
///
/// There are no 3-channel formats; RGB data is expanded to RGBA first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum PixelFormat {
    R8_UNORM,
    R8_SRGB,
    R8G8_UNORM,
    R8G8_SRGB,
    R8G8B8A8_UNORM,
    R8G8B8A8_SRGB,
    R32_SFLOAT,
    R32G32_SFLOAT,
    R32G32B32A32_SFLOAT,
}

impl PixelFormat {
    /// Every format `select` can return
    pub const ALL: [PixelFormat; 9] = [
        PixelFormat::R8_UNORM,
        PixelFormat::R8_SRGB,
        PixelFormat::R8G8_UNORM,
        PixelFormat::R8G8_SRGB,
        PixelFormat::R8G8B8A8_UNORM,
        PixelFormat::R8G8B8A8_SRGB,
        PixelFormat::R32_SFLOAT,
        PixelFormat::R32G32_SFLOAT,
        PixelFormat::R32G32B32A32_SFLOAT,
    ];

    /// Choose the format for `channels` samples of `sample_type` in `role`
    ///
    /// Color roles get sRGB formats when stored as 8-bit data; float data is
    /// always linear. 3 channels map to the 4-channel format.
    pub fn select(role: TextureRole, channels: u32, sample_type: SampleType) -> Result<Self> {
        let srgb = role.color_space() == ColorSpace::Srgb;
        let format = match (sample_type, channels, srgb) {
            (SampleType::U8, 1, false) => PixelFormat::R8_UNORM,
            (SampleType::U8, 1, true) => PixelFormat::R8_SRGB,
            (SampleType::U8, 2, false) => PixelFormat::R8G8_UNORM,
            (SampleType::U8, 2, true) => PixelFormat::R8G8_SRGB,
            (SampleType::U8, 3 | 4, false) => PixelFormat::R8G8B8A8_UNORM,
            (SampleType::U8, 3 | 4, true) => PixelFormat::R8G8B8A8_SRGB,
            (SampleType::F32, 1, _) => PixelFormat::R32_SFLOAT,
            (SampleType::F32, 2, _) => PixelFormat::R32G32_SFLOAT,
            (SampleType::F32, 3 | 4, _) => PixelFormat::R32G32B32A32_SFLOAT,
            _ => {
                return Err(Error::AllocationFailure(format!(
                    "no {} format with {} channels of {:?}",
                    role, channels, sample_type
                )))
            }
        };
        Ok(format)
    }

    pub fn channel_count(self) -> u32 {
        match self {
            PixelFormat::R8_UNORM | PixelFormat::R8_SRGB | PixelFormat::R32_SFLOAT => 1,
            PixelFormat::R8G8_UNORM | PixelFormat::R8G8_SRGB | PixelFormat::R32G32_SFLOAT => 2,
            PixelFormat::R8G8B8A8_UNORM
            | PixelFormat::R8G8B8A8_SRGB
            | PixelFormat::R32G32B32A32_SFLOAT => 4,
        }
    }

    pub fn sample_type(self) -> SampleType {
        match self {
            PixelFormat::R32_SFLOAT
            | PixelFormat::R32G32_SFLOAT
            | PixelFormat::R32G32B32A32_SFLOAT => SampleType::F32,
            _ => SampleType::U8,
        }
    }

    pub fn bytes_per_pixel(self) -> usize {
        self.channel_count() as usize * self.sample_type().size_in_bytes()
    }

    pub fn is_srgb(self) -> bool {
        matches!(
            self,
            PixelFormat::R8_SRGB | PixelFormat::R8G8_SRGB | PixelFormat::R8G8B8A8_SRGB
        )
    }
}

#[cfg(test)]
#[path = "pixel_format_tests.rs"]
mod tests;
