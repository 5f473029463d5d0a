/// GpuContext - Shared GPU state for the texture device
///
/// Contains everything needed for upload operations:
/// - Device and instance handles for Vulkan API calls
/// - Allocator for memory management
/// - Queue and a reusable command pool + fence for one-shot uploads

use ash::vk;
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};
use raytracer_textures::raytracer::{Error, Result};
use raytracer_textures::tex_error;
use std::mem::ManuallyDrop;
use std::sync::{Mutex, MutexGuard, PoisonError};

const SOURCE: &str = "raytracer::vulkan";

/// One-shot upload resources, used under a single lock
///
/// The lock also serializes access to the queue, which Vulkan requires to be
/// externally synchronized.
pub(crate) struct UploadResources {
    pub(crate) command_pool: vk::CommandPool,
    pub(crate) fence: vk::Fence,
}

/// Shared GPU context
///
/// The instance and device are borrowed from the caller: they are cloned
/// handle tables, and destroying them stays the caller's job. Everything
/// created here is destroyed in `destroy()`, which must run while the device
/// is still alive.
pub(crate) struct GpuContext {
    /// Vulkan instance (format queries)
    pub(crate) instance: ash::Instance,
    pub(crate) physical_device: vk::PhysicalDevice,
    /// Vulkan logical device
    pub(crate) device: ash::Device,
    /// GPU memory allocator
    /// Wrapped in ManuallyDrop so it is dropped BEFORE the caller destroys the device
    pub(crate) allocator: ManuallyDrop<Mutex<Allocator>>,
    pub(crate) queue: vk::Queue,
    pub(crate) upload: Mutex<UploadResources>,
}

impl GpuContext {
    /// Create the allocator, upload command pool and upload fence
    ///
    /// # Safety
    ///
    /// `device` must have been created from `physical_device` on `instance`,
    /// and `queue` must belong to `queue_family` on that device.
    pub(crate) unsafe fn new(
        instance: &ash::Instance,
        physical_device: vk::PhysicalDevice,
        device: &ash::Device,
        queue: vk::Queue,
        queue_family: u32,
    ) -> Result<Self> {
        let allocator = Allocator::new(&AllocatorCreateDesc {
            instance: instance.clone(),
            device: device.clone(),
            physical_device,
            debug_settings: Default::default(),
            buffer_device_address: false,
            allocation_sizes: Default::default(),
        })
        .map_err(|e| {
            tex_error!(SOURCE, "Failed to create GPU allocator: {:?}", e);
            Error::BackendError(format!("Failed to create allocator: {:?}", e))
        })?;

        // TRANSIENT + RESET for reusable one-shot uploads
        let pool_info = vk::CommandPoolCreateInfo::default()
            .queue_family_index(queue_family)
            .flags(vk::CommandPoolCreateFlags::TRANSIENT | vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);
        let command_pool = device.create_command_pool(&pool_info, None).map_err(|e| {
            tex_error!(SOURCE, "Failed to create upload command pool: {:?}", e);
            Error::BackendError(format!("Failed to create upload command pool: {:?}", e))
        })?;

        let fence = match device.create_fence(&vk::FenceCreateInfo::default(), None) {
            Ok(fence) => fence,
            Err(e) => {
                device.destroy_command_pool(command_pool, None);
                tex_error!(SOURCE, "Failed to create upload fence: {:?}", e);
                return Err(Error::BackendError(format!("Failed to create upload fence: {:?}", e)));
            }
        };

        Ok(Self {
            instance: instance.clone(),
            physical_device,
            device: device.clone(),
            allocator: ManuallyDrop::new(Mutex::new(allocator)),
            queue,
            upload: Mutex::new(UploadResources { command_pool, fence }),
        })
    }

    pub(crate) fn allocator(&self) -> MutexGuard<'_, Allocator> {
        self.allocator.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn upload(&self) -> MutexGuard<'_, UploadResources> {
        self.upload.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Destroy the upload pool and fence, then drop the allocator
    ///
    /// # Safety
    ///
    /// Must be called exactly once, after every allocation has been freed and
    /// before the device is destroyed.
    pub(crate) unsafe fn destroy(&mut self) {
        {
            let upload = self.upload.get_mut().unwrap_or_else(PoisonError::into_inner);
            self.device.destroy_fence(upload.fence, None);
            self.device.destroy_command_pool(upload.command_pool, None);
        }
        ManuallyDrop::drop(&mut self.allocator);
    }
}
