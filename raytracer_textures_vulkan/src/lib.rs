/*!
# Raytracer Textures - Vulkan Backend

Vulkan implementation of the `TextureDevice` collaborator.

Textures are uploaded through a staging buffer into device-local images and
published in one update-after-bind descriptor array, so shaders address them
with `BindlessHandle::shader_index()`. Uses Ash for Vulkan bindings and
gpu-allocator for memory management.

```no_run
use std::sync::Arc;
use raytracer_textures::raytracer::resource::MemoryLoader;
use raytracer_textures::raytracer::{RegistryConfig, TextureRegistry};
use raytracer_textures_vulkan::raytracer::{HeadlessVulkan, VulkanDeviceConfig};

let vulkan = HeadlessVulkan::new()?;
let device = Arc::new(vulkan.create_texture_device(VulkanDeviceConfig::default())?);
let registry = TextureRegistry::new(Arc::new(MemoryLoader::new()), device, RegistryConfig::default());
# Ok::<(), raytracer_textures::raytracer::Error>(())
```
*/

mod vulkan_context;
mod vulkan_format;
mod vulkan_sampler;
mod vulkan_bindless;
mod vulkan_texture;
mod vulkan_device;
mod headless;
#[cfg(feature = "vulkan-validation")]
mod debug;

/// Public API namespace
pub mod raytracer {
    pub use crate::headless::HeadlessVulkan;
    pub use crate::vulkan_bindless::BINDLESS_TEXTURE_BINDING;
    pub use crate::vulkan_device::{VulkanDeviceConfig, VulkanTextureDevice};

    #[cfg(feature = "vulkan-validation")]
    pub use crate::debug::{reset_validation_stats, validation_stats, ValidationStats};
}
