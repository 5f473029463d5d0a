/// Conversion between core pixel formats and Vulkan formats

use ash::vk;
use raytracer_textures::raytracer::device::PixelFormat;

/// Convert PixelFormat to Vulkan format
pub(crate) fn format_to_vk(format: PixelFormat) -> vk::Format {
    match format {
        PixelFormat::R8_UNORM => vk::Format::R8_UNORM,
        PixelFormat::R8_SRGB => vk::Format::R8_SRGB,
        PixelFormat::R8G8_UNORM => vk::Format::R8G8_UNORM,
        PixelFormat::R8G8_SRGB => vk::Format::R8G8_SRGB,
        PixelFormat::R8G8B8A8_UNORM => vk::Format::R8G8B8A8_UNORM,
        PixelFormat::R8G8B8A8_SRGB => vk::Format::R8G8B8A8_SRGB,
        PixelFormat::R32_SFLOAT => vk::Format::R32_SFLOAT,
        PixelFormat::R32G32_SFLOAT => vk::Format::R32G32_SFLOAT,
        PixelFormat::R32G32B32A32_SFLOAT => vk::Format::R32G32B32A32_SFLOAT,
    }
}

/// Optimal-tiling features a bindless texture format needs
pub(crate) fn required_format_features() -> vk::FormatFeatureFlags {
    vk::FormatFeatureFlags::SAMPLED_IMAGE | vk::FormatFeatureFlags::TRANSFER_DST
}

#[cfg(test)]
#[path = "vulkan_format_tests.rs"]
mod tests;
