/// HeadlessVulkan - a window-less instance + device for offline tracing and tests
///
/// Picks the first physical device with a graphics or compute queue and
/// descriptor indexing support, and enables exactly the features the bindless
/// texture array needs.

use crate::vulkan_device::{VulkanDeviceConfig, VulkanTextureDevice};
use ash::vk;
use raytracer_textures::raytracer::{Error, Result};
use raytracer_textures::{tex_error, tex_info};
#[cfg(feature = "vulkan-validation")]
use std::ffi::CStr;

const SOURCE: &str = "raytracer::vulkan";

#[cfg(feature = "vulkan-validation")]
const VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";

/// Owned Vulkan instance, logical device and queue
pub struct HeadlessVulkan {
    /// Kept alive for the lifetime of the instance
    _entry: ash::Entry,
    instance: ash::Instance,
    physical_device: vk::PhysicalDevice,
    device: ash::Device,
    queue: vk::Queue,
    queue_family: u32,
    anisotropy_enabled: bool,
    #[cfg(feature = "vulkan-validation")]
    debug_utils: Option<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)>,
}

impl HeadlessVulkan {
    /// Load Vulkan and create the instance and device
    pub fn new() -> Result<Self> {
        unsafe {
            // Create Vulkan Entry
            let entry = ash::Entry::load().map_err(|e| {
                tex_error!(SOURCE, "Failed to load Vulkan: {:?}", e);
                Error::BackendError(format!("Failed to load Vulkan: {:?}", e))
            })?;

            let app_info = vk::ApplicationInfo::default()
                .application_name(c"raytracer_textures")
                .application_version(vk::make_api_version(0, 0, 1, 0))
                .engine_name(c"raytracer")
                .engine_version(vk::make_api_version(0, 0, 1, 0))
                .api_version(vk::API_VERSION_1_2);

            #[allow(unused_mut)]
            let mut extension_names: Vec<*const std::os::raw::c_char> = Vec::new();
            #[allow(unused_mut)]
            let mut layer_names: Vec<*const std::os::raw::c_char> = Vec::new();
            #[cfg(feature = "vulkan-validation")]
            {
                extension_names.push(ash::ext::debug_utils::NAME.as_ptr());
                layer_names.push(VALIDATION_LAYER.as_ptr());
            }

            let create_info = vk::InstanceCreateInfo::default()
                .application_info(&app_info)
                .enabled_extension_names(&extension_names)
                .enabled_layer_names(&layer_names);

            let instance = entry.create_instance(&create_info, None).map_err(|e| {
                tex_error!(SOURCE, "Failed to create Vulkan instance: {:?}", e);
                Error::BackendError(format!("Failed to create instance: {:?}", e))
            })?;

            #[cfg(feature = "vulkan-validation")]
            let debug_utils = {
                let loader = ash::ext::debug_utils::Instance::new(&entry, &instance);
                match loader.create_debug_utils_messenger(&crate::debug::messenger_create_info(), None) {
                    Ok(messenger) => Some((loader, messenger)),
                    Err(e) => {
                        tex_error!(SOURCE, "Failed to create debug messenger: {:?}", e);
                        None
                    }
                }
            };

            let (physical_device, queue_family) = match Self::pick_physical_device(&instance) {
                Ok(picked) => picked,
                Err(e) => {
                    #[cfg(feature = "vulkan-validation")]
                    if let Some((loader, messenger)) = &debug_utils {
                        loader.destroy_debug_utils_messenger(*messenger, None);
                    }
                    instance.destroy_instance(None);
                    return Err(e);
                }
            };

            let queue_priorities = [1.0];
            let queue_create_infos = [vk::DeviceQueueCreateInfo::default()
                .queue_family_index(queue_family)
                .queue_priorities(&queue_priorities)];

            let supported = instance.get_physical_device_features(physical_device);
            let anisotropy_enabled = supported.sampler_anisotropy == vk::TRUE;
            let device_features = vk::PhysicalDeviceFeatures::default().sampler_anisotropy(anisotropy_enabled);
            let mut indexing_features = vk::PhysicalDeviceVulkan12Features::default()
                .descriptor_indexing(true)
                .descriptor_binding_partially_bound(true)
                .descriptor_binding_sampled_image_update_after_bind(true)
                .runtime_descriptor_array(true)
                .shader_sampled_image_array_non_uniform_indexing(true);

            let device_create_info = vk::DeviceCreateInfo::default()
                .queue_create_infos(&queue_create_infos)
                .enabled_features(&device_features)
                .push_next(&mut indexing_features);

            let device = match instance.create_device(physical_device, &device_create_info, None) {
                Ok(device) => device,
                Err(e) => {
                    tex_error!(SOURCE, "Failed to create logical device: {:?}", e);
                    #[cfg(feature = "vulkan-validation")]
                    if let Some((loader, messenger)) = &debug_utils {
                        loader.destroy_debug_utils_messenger(*messenger, None);
                    }
                    instance.destroy_instance(None);
                    return Err(Error::BackendError(format!("Failed to create device: {:?}", e)));
                }
            };
            let queue = device.get_device_queue(queue_family, 0);

            let properties = instance.get_physical_device_properties(physical_device);
            let name = properties
                .device_name_as_c_str()
                .ok()
                .and_then(|name| name.to_str().ok())
                .unwrap_or("unknown");
            tex_info!(SOURCE, "Headless Vulkan device: {} (queue family {})", name, queue_family);

            Ok(Self {
                _entry: entry,
                instance,
                physical_device,
                device,
                queue,
                queue_family,
                anisotropy_enabled,
                #[cfg(feature = "vulkan-validation")]
                debug_utils,
            })
        }
    }

    /// Create a texture device on this instance
    ///
    /// The returned device borrows this object's Vulkan handles, so it must be
    /// dropped first. Anisotropic filtering is turned off when the device
    /// lacks it.
    pub fn create_texture_device(&self, mut config: VulkanDeviceConfig) -> Result<VulkanTextureDevice> {
        if !self.anisotropy_enabled {
            config.sampler_anisotropy = None;
        }
        unsafe {
            VulkanTextureDevice::new(
                &self.instance,
                self.physical_device,
                &self.device,
                self.queue,
                self.queue_family,
                config,
            )
        }
    }

    pub fn instance(&self) -> &ash::Instance {
        &self.instance
    }

    pub fn device(&self) -> &ash::Device {
        &self.device
    }

    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    pub fn queue(&self) -> vk::Queue {
        self.queue
    }

    pub fn queue_family(&self) -> u32 {
        self.queue_family
    }

    /// First device exposing a graphics or compute queue and descriptor indexing
    unsafe fn pick_physical_device(instance: &ash::Instance) -> Result<(vk::PhysicalDevice, u32)> {
        let physical_devices = instance.enumerate_physical_devices().map_err(|e| {
            tex_error!(SOURCE, "Failed to enumerate physical devices: {:?}", e);
            Error::BackendError(format!("Failed to enumerate physical devices: {:?}", e))
        })?;

        for physical_device in physical_devices {
            let properties = instance.get_physical_device_properties(physical_device);
            if properties.api_version < vk::API_VERSION_1_2 {
                continue;
            }

            let mut indexing = vk::PhysicalDeviceVulkan12Features::default();
            let mut features = vk::PhysicalDeviceFeatures2::default().push_next(&mut indexing);
            instance.get_physical_device_features2(physical_device, &mut features);
            let bindless_ready = indexing.descriptor_indexing == vk::TRUE
                && indexing.descriptor_binding_partially_bound == vk::TRUE
                && indexing.descriptor_binding_sampled_image_update_after_bind == vk::TRUE
                && indexing.runtime_descriptor_array == vk::TRUE
                && indexing.shader_sampled_image_array_non_uniform_indexing == vk::TRUE;
            if !bindless_ready {
                continue;
            }

            let queue_family = instance
                .get_physical_device_queue_family_properties(physical_device)
                .iter()
                .position(|family| {
                    family
                        .queue_flags
                        .intersects(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE)
                });
            if let Some(index) = queue_family {
                return Ok((physical_device, index as u32));
            }
        }

        tex_error!(SOURCE, "No physical device supports bindless sampled images");
        Err(Error::BackendError(
            "No physical device supports bindless sampled images".to_string(),
        ))
    }
}

impl Drop for HeadlessVulkan {
    fn drop(&mut self) {
        unsafe {
            self.device.device_wait_idle().ok();
            self.device.destroy_device(None);

            #[cfg(feature = "vulkan-validation")]
            if let Some((loader, messenger)) = self.debug_utils.take() {
                loader.destroy_debug_utils_messenger(messenger, None);
            }

            self.instance.destroy_instance(None);
        }
    }
}
