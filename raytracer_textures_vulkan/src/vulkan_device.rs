/// VulkanTextureDevice - TextureDevice implementation over ash + gpu-allocator
///
/// Every upload creates a device-local image, copies the pixels through a
/// host-visible staging buffer with a one-shot command buffer, waits for the
/// copy, then writes the image into the bindless descriptor array.
///
/// Lock order: `resources` before the allocator, `upload` before the
/// allocator. The allocator lock is never held while taking another lock.

use crate::vulkan_bindless::{clamp_capacity, device_capacity_limit, BindlessTable};
use crate::vulkan_context::GpuContext;
use crate::vulkan_format::{format_to_vk, required_format_features};
use crate::vulkan_sampler::create_bindless_sampler;
use crate::vulkan_texture::VulkanTexture;
use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use gpu_allocator::MemoryLocation;
use raytracer_textures::raytracer::device::{
    BindlessHandle, DeviceAllocation, GpuResourceId, PixelFormat, TextureDevice, UploadDesc,
};
use raytracer_textures::raytracer::{Error, Result};
use raytracer_textures::{tex_debug, tex_err, tex_info};
use rustc_hash::FxHashSet;
use slotmap::{new_key_type, Key, KeyData, SlotMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

const SOURCE: &str = "raytracer::vulkan";

new_key_type! {
    /// Key of a live texture in the device's resource map
    struct TextureResourceKey;
}

// ===== CONFIG =====

/// Backend configuration
#[derive(Debug, Clone, PartialEq)]
pub struct VulkanDeviceConfig {
    /// Size of the bindless descriptor array (maximum resident textures)
    pub bindless_capacity: u32,
    /// Anisotropic filtering level of the shared sampler, `None` to disable
    pub sampler_anisotropy: Option<f32>,
    /// How long an upload may wait for its copy to finish, in nanoseconds
    pub upload_timeout_ns: u64,
}

impl Default for VulkanDeviceConfig {
    fn default() -> Self {
        Self {
            bindless_capacity: 4096,
            sampler_anisotropy: Some(16.0),
            upload_timeout_ns: 5_000_000_000,
        }
    }
}

// ===== DEVICE =====

struct Resources {
    textures: SlotMap<TextureResourceKey, VulkanTexture>,
    bindless: BindlessTable,
}

/// Vulkan texture device with a bindless descriptor array
///
/// The instance and logical device stay owned by the caller and must outlive
/// this object. Releasing a texture destroys it immediately: the caller must
/// make sure no in-flight GPU work still samples it.
pub struct VulkanTextureDevice {
    ctx: GpuContext,
    sampler: vk::Sampler,
    resources: Mutex<Resources>,
    supported: FxHashSet<PixelFormat>,
    config: VulkanDeviceConfig,
}

impl VulkanTextureDevice {
    /// Create a texture device on an existing Vulkan device
    ///
    /// The device must have been created with descriptor indexing enabled
    /// (partially bound, update-after-bind sampled images and runtime
    /// descriptor arrays), and with sampler anisotropy when
    /// `config.sampler_anisotropy` is set. A `bindless_capacity` above the
    /// device's update-after-bind descriptor limits is clamped to them;
    /// `config()` reports the capacity actually used.
    ///
    /// # Safety
    ///
    /// `device` must have been created from `physical_device` on `instance`,
    /// `queue` must belong to `queue_family`, and all three must outlive the
    /// returned object.
    pub unsafe fn new(
        instance: &ash::Instance,
        physical_device: vk::PhysicalDevice,
        device: &ash::Device,
        queue: vk::Queue,
        queue_family: u32,
        mut config: VulkanDeviceConfig,
    ) -> Result<Self> {
        config.bindless_capacity = clamp_capacity(
            config.bindless_capacity,
            device_capacity_limit(instance, physical_device),
        );

        let mut ctx = GpuContext::new(instance, physical_device, device, queue, queue_family)?;

        let supported: FxHashSet<PixelFormat> = PixelFormat::ALL
            .into_iter()
            .filter(|format| {
                let props =
                    instance.get_physical_device_format_properties(physical_device, format_to_vk(*format));
                props.optimal_tiling_features.contains(required_format_features())
            })
            .collect();

        let sampler = match create_bindless_sampler(&ctx, config.sampler_anisotropy) {
            Ok(sampler) => sampler,
            Err(e) => {
                ctx.destroy();
                return Err(e);
            }
        };

        let bindless = match BindlessTable::new(&ctx, config.bindless_capacity) {
            Ok(bindless) => bindless,
            Err(e) => {
                ctx.device.destroy_sampler(sampler, None);
                ctx.destroy();
                return Err(e);
            }
        };

        tex_info!(
            SOURCE,
            "Vulkan texture device ready: {} bindless slots, {} of {} formats sampleable",
            config.bindless_capacity,
            supported.len(),
            PixelFormat::ALL.len()
        );

        Ok(Self {
            ctx,
            sampler,
            resources: Mutex::new(Resources {
                textures: SlotMap::with_key(),
                bindless,
            }),
            supported,
            config,
        })
    }

    pub fn config(&self) -> &VulkanDeviceConfig {
        &self.config
    }

    /// Descriptor set layout of the bindless texture array, for pipeline layouts
    pub fn bindless_layout(&self) -> vk::DescriptorSetLayout {
        self.resources().bindless.layout
    }

    /// The bindless descriptor set, to bind when tracing
    pub fn bindless_set(&self) -> vk::DescriptorSet {
        self.resources().bindless.set
    }

    /// Number of live textures
    pub fn texture_count(&self) -> usize {
        self.resources().textures.len()
    }

    /// Number of occupied bindless descriptor slots
    pub fn bindless_slots_in_use(&self) -> u32 {
        self.resources().bindless.in_use()
    }

    /// Image view of a live texture
    pub fn image_view(&self, id: GpuResourceId) -> Option<vk::ImageView> {
        self.resources().textures.get(key_from_id(id)).map(|texture| texture.view)
    }

    fn resources(&self) -> MutexGuard<'_, Resources> {
        self.resources.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create the image and fill it with `desc.data`
    ///
    /// Returns the image, its view and its memory. On failure everything
    /// created so far is destroyed.
    unsafe fn upload_image(&self, desc: &UploadDesc<'_>) -> Result<(vk::Image, vk::ImageView, Allocation)> {
        let format = format_to_vk(desc.format);
        let extent = vk::Extent3D {
            width: desc.width,
            height: desc.height,
            depth: 1,
        };
        let subresource_range = vk::ImageSubresourceRange {
            aspect_mask: vk::ImageAspectFlags::COLOR,
            base_mip_level: 0,
            level_count: 1,
            base_array_layer: 0,
            layer_count: 1,
        };

        // Serializes the queue and the upload command pool
        let upload = self.ctx.upload();
        let mut partial = PartialUpload::new(&self.ctx, upload.command_pool);

        // Create image
        let image_create_info = vk::ImageCreateInfo::default()
            .image_type(vk::ImageType::TYPE_2D)
            .format(format)
            .extent(extent)
            .mip_levels(1)
            .array_layers(1)
            .samples(vk::SampleCountFlags::TYPE_1)
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(vk::ImageUsageFlags::SAMPLED | vk::ImageUsageFlags::TRANSFER_DST)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);
        partial.image = self
            .ctx
            .device
            .create_image(&image_create_info, None)
            .map_err(|e| vk_failure(desc.label, "create texture image", e))?;

        // Allocate and bind memory
        let requirements = self.ctx.device.get_image_memory_requirements(partial.image);
        let allocation = self
            .ctx
            .allocator()
            .allocate(&AllocationCreateDesc {
                name: desc.label,
                requirements,
                location: MemoryLocation::GpuOnly,
                linear: false,
                allocation_scheme: AllocationScheme::GpuAllocatorManaged,
            })
            .map_err(|e| {
                let size_mb = requirements.size as f64 / (1024.0 * 1024.0);
                Error::AllocationFailure(format!(
                    "out of GPU memory for '{}' ({}x{}, {:.2} MB): {}",
                    desc.label, desc.width, desc.height, size_mb, e
                ))
                .logged(SOURCE)
            })?;
        let (memory, offset) = (allocation.memory(), allocation.offset());
        partial.image_allocation = Some(allocation);
        self.ctx
            .device
            .bind_image_memory(partial.image, memory, offset)
            .map_err(|e| vk_failure(desc.label, "bind texture image memory", e))?;

        // Create image view
        let view_create_info = vk::ImageViewCreateInfo::default()
            .image(partial.image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(format)
            .components(vk::ComponentMapping {
                r: vk::ComponentSwizzle::IDENTITY,
                g: vk::ComponentSwizzle::IDENTITY,
                b: vk::ComponentSwizzle::IDENTITY,
                a: vk::ComponentSwizzle::IDENTITY,
            })
            .subresource_range(subresource_range);
        partial.view = self
            .ctx
            .device
            .create_image_view(&view_create_info, None)
            .map_err(|e| vk_failure(desc.label, "create texture image view", e))?;

        // Create staging buffer
        let staging_create_info = vk::BufferCreateInfo::default()
            .size(desc.data.len() as u64)
            .usage(vk::BufferUsageFlags::TRANSFER_SRC)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);
        partial.staging = self
            .ctx
            .device
            .create_buffer(&staging_create_info, None)
            .map_err(|e| vk_failure(desc.label, "create staging buffer", e))?;

        let staging_requirements = self.ctx.device.get_buffer_memory_requirements(partial.staging);
        let staging_allocation = self
            .ctx
            .allocator()
            .allocate(&AllocationCreateDesc {
                name: "texture_staging_buffer",
                requirements: staging_requirements,
                location: MemoryLocation::CpuToGpu,
                linear: true,
                allocation_scheme: AllocationScheme::GpuAllocatorManaged,
            })
            .map_err(|e| {
                Error::AllocationFailure(format!(
                    "out of host-visible memory staging '{}': {}",
                    desc.label, e
                ))
                .logged(SOURCE)
            })?;
        let (memory, offset) = (staging_allocation.memory(), staging_allocation.offset());
        let mapped_ptr = staging_allocation.mapped_ptr();
        partial.staging_allocation = Some(staging_allocation);
        self.ctx
            .device
            .bind_buffer_memory(partial.staging, memory, offset)
            .map_err(|e| vk_failure(desc.label, "bind staging buffer memory", e))?;

        // Copy data to staging buffer
        let mapped_ptr = mapped_ptr
            .ok_or_else(|| tex_err!(SOURCE, "Staging buffer for '{}' is not mapped", desc.label))?
            .as_ptr() as *mut u8;
        std::ptr::copy_nonoverlapping(desc.data.as_ptr(), mapped_ptr, desc.data.len());

        // Record the copy
        let command_buffer_allocate_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(upload.command_pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);
        let command_buffers = self
            .ctx
            .device
            .allocate_command_buffers(&command_buffer_allocate_info)
            .map_err(|e| vk_failure(desc.label, "allocate upload command buffer", e))?;
        partial.command_buffer = command_buffers[0];
        let command_buffer = partial.command_buffer;

        let begin_info =
            vk::CommandBufferBeginInfo::default().flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        self.ctx
            .device
            .begin_command_buffer(command_buffer, &begin_info)
            .map_err(|e| vk_failure(desc.label, "begin upload command buffer", e))?;

        // UNDEFINED -> TRANSFER_DST_OPTIMAL
        let barrier_to_transfer = vk::ImageMemoryBarrier::default()
            .old_layout(vk::ImageLayout::UNDEFINED)
            .new_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .image(partial.image)
            .subresource_range(subresource_range)
            .src_access_mask(vk::AccessFlags::empty())
            .dst_access_mask(vk::AccessFlags::TRANSFER_WRITE);
        self.ctx.device.cmd_pipeline_barrier(
            command_buffer,
            vk::PipelineStageFlags::TOP_OF_PIPE,
            vk::PipelineStageFlags::TRANSFER,
            vk::DependencyFlags::empty(),
            &[],
            &[],
            &[barrier_to_transfer],
        );

        let region = vk::BufferImageCopy::default()
            .buffer_offset(0)
            .buffer_row_length(0)
            .buffer_image_height(0)
            .image_subresource(vk::ImageSubresourceLayers {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                mip_level: 0,
                base_array_layer: 0,
                layer_count: 1,
            })
            .image_offset(vk::Offset3D { x: 0, y: 0, z: 0 })
            .image_extent(extent);
        self.ctx.device.cmd_copy_buffer_to_image(
            command_buffer,
            partial.staging,
            partial.image,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            &[region],
        );

        // TRANSFER_DST_OPTIMAL -> SHADER_READ_ONLY_OPTIMAL
        let barrier_to_shader = vk::ImageMemoryBarrier::default()
            .old_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
            .new_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .image(partial.image)
            .subresource_range(subresource_range)
            .src_access_mask(vk::AccessFlags::TRANSFER_WRITE)
            .dst_access_mask(vk::AccessFlags::SHADER_READ);
        self.ctx.device.cmd_pipeline_barrier(
            command_buffer,
            vk::PipelineStageFlags::TRANSFER,
            vk::PipelineStageFlags::ALL_COMMANDS,
            vk::DependencyFlags::empty(),
            &[],
            &[],
            &[barrier_to_shader],
        );

        self.ctx
            .device
            .end_command_buffer(command_buffer)
            .map_err(|e| vk_failure(desc.label, "end upload command buffer", e))?;

        // Submit and wait
        self.ctx
            .device
            .reset_fences(&[upload.fence])
            .map_err(|e| vk_failure(desc.label, "reset upload fence", e))?;
        let command_buffers = [command_buffer];
        let submit_info = vk::SubmitInfo::default().command_buffers(&command_buffers);
        self.ctx
            .device
            .queue_submit(self.ctx.queue, &[submit_info], upload.fence)
            .map_err(|e| vk_failure(desc.label, "submit texture upload", e))?;
        partial.submitted = true;
        self.ctx
            .device
            .wait_for_fences(&[upload.fence], true, self.config.upload_timeout_ns)
            .map_err(|e| vk_failure(desc.label, "wait for texture upload", e))?;
        partial.submitted = false;

        tex_debug!(
            SOURCE,
            "Uploaded '{}' ({}x{} {:?}, {} bytes)",
            desc.label,
            desc.width,
            desc.height,
            desc.format,
            desc.data.len()
        );

        partial.finish()
    }
}

impl TextureDevice for VulkanTextureDevice {
    fn allocate_and_upload(&self, desc: &UploadDesc<'_>) -> Result<DeviceAllocation> {
        if !self.supports_format(desc.format) {
            return Err(Error::AllocationFailure(format!(
                "format {:?} is not sampleable on this device",
                desc.format
            ))
            .logged(SOURCE));
        }
        if desc.width == 0 || desc.height == 0 || desc.data.len() != desc.expected_len() {
            return Err(Error::InvalidResource(format!(
                "upload '{}' has {} bytes for {}x{} {:?}",
                desc.label,
                desc.data.len(),
                desc.width,
                desc.height,
                desc.format
            ))
            .logged(SOURCE));
        }

        let slot = self.resources().bindless.reserve()?;

        let (image, view, allocation) = match unsafe { self.upload_image(desc) } {
            Ok(parts) => parts,
            Err(e) => {
                self.resources().bindless.free(slot);
                return Err(e);
            }
        };

        let mut resources = self.resources();
        resources.bindless.write(&self.ctx, slot, view, self.sampler);
        let key = resources.textures.insert(VulkanTexture {
            image,
            view,
            allocation: Some(allocation),
            slot,
            format: format_to_vk(desc.format),
            extent: vk::Extent2D {
                width: desc.width,
                height: desc.height,
            },
        });

        // Occupied slotmap keys always carry an odd version, so the id is non-zero
        let gpu_id = match GpuResourceId::new(key.data().as_ffi()) {
            Some(id) => id,
            None => {
                if let Some(texture) = resources.textures.remove(key) {
                    resources.bindless.free(texture.slot);
                    unsafe { texture.destroy(&self.ctx) };
                }
                return Err(tex_err!(SOURCE, "Texture key for '{}' encodes to zero", desc.label));
            }
        };

        Ok(DeviceAllocation {
            gpu_id,
            handle: BindlessHandle::from_descriptor_index(slot),
        })
    }

    fn release(&self, id: GpuResourceId) -> Result<()> {
        let mut resources = self.resources();
        let texture = resources
            .textures
            .remove(key_from_id(id))
            .ok_or_else(|| Error::InvalidResource(format!("{} is not a live texture", id)).logged(SOURCE))?;
        resources.bindless.free(texture.slot);
        unsafe { texture.destroy(&self.ctx) };

        tex_debug!(SOURCE, "Released {}", id);
        Ok(())
    }

    fn supports_format(&self, format: PixelFormat) -> bool {
        self.supported.contains(&format)
    }
}

impl Drop for VulkanTextureDevice {
    fn drop(&mut self) {
        unsafe {
            {
                let _queue = self.ctx.upload();
                self.ctx.device.queue_wait_idle(self.ctx.queue).ok();
            }

            let resources = self.resources.get_mut().unwrap_or_else(PoisonError::into_inner);
            let live = resources.textures.len();
            for (_, texture) in resources.textures.drain() {
                texture.destroy(&self.ctx);
            }
            resources.bindless.destroy(&self.ctx);
            self.ctx.device.destroy_sampler(self.sampler, None);
            self.ctx.destroy();

            if live > 0 {
                tex_debug!(SOURCE, "Destroyed {} live textures on shutdown", live);
            }
        }
    }
}

fn key_from_id(id: GpuResourceId) -> TextureResourceKey {
    KeyData::from_ffi(id.get()).into()
}

/// Map a Vulkan failure to `AllocationFailure` when it is out-of-memory
#[track_caller]
fn vk_failure(label: &str, action: &str, result: vk::Result) -> Error {
    match result {
        vk::Result::ERROR_OUT_OF_DEVICE_MEMORY | vk::Result::ERROR_OUT_OF_HOST_MEMORY => {
            Error::AllocationFailure(format!("failed to {} for '{}': {:?}", action, label, result))
                .logged(SOURCE)
        }
        _ => tex_err!(SOURCE, "Failed to {} for '{}': {:?}", action, label, result),
    }
}

// ===== PARTIAL UPLOAD =====

/// Objects created by an upload in progress
///
/// Dropping it destroys whatever is still owned. `finish` moves the image,
/// view and image memory out, leaving only the staging objects to clean up.
/// Must be dropped while the upload lock is held (it frees a command buffer
/// from the shared pool).
struct PartialUpload<'a> {
    ctx: &'a GpuContext,
    command_pool: vk::CommandPool,
    image: vk::Image,
    image_allocation: Option<Allocation>,
    view: vk::ImageView,
    staging: vk::Buffer,
    staging_allocation: Option<Allocation>,
    command_buffer: vk::CommandBuffer,
    submitted: bool,
}

impl<'a> PartialUpload<'a> {
    fn new(ctx: &'a GpuContext, command_pool: vk::CommandPool) -> Self {
        Self {
            ctx,
            command_pool,
            image: vk::Image::null(),
            image_allocation: None,
            view: vk::ImageView::null(),
            staging: vk::Buffer::null(),
            staging_allocation: None,
            command_buffer: vk::CommandBuffer::null(),
            submitted: false,
        }
    }

    fn finish(mut self) -> Result<(vk::Image, vk::ImageView, Allocation)> {
        let allocation = self
            .image_allocation
            .take()
            .ok_or_else(|| tex_err!(SOURCE, "Texture upload finished without image memory"))?;
        let image = std::mem::replace(&mut self.image, vk::Image::null());
        let view = std::mem::replace(&mut self.view, vk::ImageView::null());
        Ok((image, view, allocation))
    }
}

impl Drop for PartialUpload<'_> {
    fn drop(&mut self) {
        let device = &self.ctx.device;
        unsafe {
            if self.submitted {
                // The copy may still be reading the staging buffer
                device.queue_wait_idle(self.ctx.queue).ok();
            }
            if self.command_buffer != vk::CommandBuffer::null() {
                device.free_command_buffers(self.command_pool, &[self.command_buffer]);
            }
            if self.staging != vk::Buffer::null() {
                device.destroy_buffer(self.staging, None);
            }
            if self.view != vk::ImageView::null() {
                device.destroy_image_view(self.view, None);
            }
            if self.image != vk::Image::null() {
                device.destroy_image(self.image, None);
            }
        }

        let mut allocator = self.ctx.allocator();
        if let Some(allocation) = self.staging_allocation.take() {
            allocator.free(allocation).ok();
        }
        if let Some(allocation) = self.image_allocation.take() {
            allocator.free(allocation).ok();
        }
    }
}
