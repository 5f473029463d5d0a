/// Shared sampler bound alongside every bindless texture

use crate::vulkan_context::GpuContext;
use ash::vk;
use raytracer_textures::raytracer::Result;
use raytracer_textures::tex_err;

/// Create the linear/repeat sampler used by every bindless descriptor
///
/// `anisotropy` of `None` disables anisotropic filtering; otherwise the value
/// is clamped to the device limit.
pub(crate) fn create_bindless_sampler(ctx: &GpuContext, anisotropy: Option<f32>) -> Result<vk::Sampler> {
    let limit = unsafe {
        ctx.instance
            .get_physical_device_properties(ctx.physical_device)
            .limits
            .max_sampler_anisotropy
    };
    let anisotropy = anisotropy.map(|a| a.clamp(1.0, limit.max(1.0)));

    let info = vk::SamplerCreateInfo::default()
        .mag_filter(vk::Filter::LINEAR)
        .min_filter(vk::Filter::LINEAR)
        .mipmap_mode(vk::SamplerMipmapMode::LINEAR)
        .address_mode_u(vk::SamplerAddressMode::REPEAT)
        .address_mode_v(vk::SamplerAddressMode::REPEAT)
        .address_mode_w(vk::SamplerAddressMode::REPEAT)
        .mip_lod_bias(0.0)
        .anisotropy_enable(anisotropy.is_some())
        .max_anisotropy(anisotropy.unwrap_or(1.0))
        .compare_enable(false)
        .compare_op(vk::CompareOp::ALWAYS)
        .min_lod(0.0)
        .max_lod(vk::LOD_CLAMP_NONE)
        .border_color(vk::BorderColor::FLOAT_OPAQUE_BLACK)
        .unnormalized_coordinates(false);

    unsafe {
        ctx.device
            .create_sampler(&info, None)
            .map_err(|e| tex_err!("raytracer::vulkan", "Failed to create bindless sampler: {:?}", e))
    }
}
