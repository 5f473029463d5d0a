/// BindlessTable - one descriptor set holding every resident texture
///
/// Binding 0 is a partially bound, update-after-bind array of combined image
/// samplers. Shaders index it with `BindlessHandle::shader_index()`.

use crate::vulkan_context::GpuContext;
use ash::vk;
use raytracer_textures::raytracer::utils::SlotAllocator;
use raytracer_textures::raytracer::{Error, Result};
use raytracer_textures::{tex_err, tex_warn};

const SOURCE: &str = "raytracer::vulkan";

/// Binding index of the texture array inside the bindless set
pub const BINDLESS_TEXTURE_BINDING: u32 = 0;

/// Largest texture array the device accepts in one update-after-bind binding
///
/// A combined image sampler counts against both the sampled image and the
/// sampler limits, per set and per stage.
pub(crate) unsafe fn device_capacity_limit(instance: &ash::Instance, physical_device: vk::PhysicalDevice) -> u32 {
    let mut indexing = vk::PhysicalDeviceDescriptorIndexingProperties::default();
    let mut properties = vk::PhysicalDeviceProperties2::default().push_next(&mut indexing);
    instance.get_physical_device_properties2(physical_device, &mut properties);

    [
        indexing.max_descriptor_set_update_after_bind_sampled_images,
        indexing.max_descriptor_set_update_after_bind_samplers,
        indexing.max_per_stage_descriptor_update_after_bind_sampled_images,
        indexing.max_per_stage_descriptor_update_after_bind_samplers,
        indexing.max_per_stage_update_after_bind_resources,
    ]
    .into_iter()
    .min()
    .unwrap_or(0)
}

/// Requested capacity, clamped to `limit` with a warning
pub(crate) fn clamp_capacity(requested: u32, limit: u32) -> u32 {
    if requested > limit {
        tex_warn!(
            SOURCE,
            "Bindless capacity {} exceeds the device limit of {}, clamping",
            requested,
            limit
        );
        limit
    } else {
        requested
    }
}

pub(crate) struct BindlessTable {
    pub(crate) layout: vk::DescriptorSetLayout,
    pool: vk::DescriptorPool,
    pub(crate) set: vk::DescriptorSet,
    slots: SlotAllocator,
}

impl BindlessTable {
    pub(crate) fn new(ctx: &GpuContext, capacity: u32) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::AllocationFailure("bindless table capacity is zero".to_string())
                .logged(SOURCE));
        }

        unsafe {
            let bindings = [vk::DescriptorSetLayoutBinding::default()
                .binding(BINDLESS_TEXTURE_BINDING)
                .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                .descriptor_count(capacity)
                .stage_flags(vk::ShaderStageFlags::ALL)];
            let binding_flags = [vk::DescriptorBindingFlags::PARTIALLY_BOUND
                | vk::DescriptorBindingFlags::UPDATE_AFTER_BIND];
            let mut flags_info =
                vk::DescriptorSetLayoutBindingFlagsCreateInfo::default().binding_flags(&binding_flags);

            let layout_info = vk::DescriptorSetLayoutCreateInfo::default()
                .flags(vk::DescriptorSetLayoutCreateFlags::UPDATE_AFTER_BIND_POOL)
                .bindings(&bindings)
                .push_next(&mut flags_info);
            let layout = ctx
                .device
                .create_descriptor_set_layout(&layout_info, None)
                .map_err(|e| tex_err!(SOURCE, "Failed to create bindless set layout: {:?}", e))?;

            let pool_sizes = [vk::DescriptorPoolSize {
                ty: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
                descriptor_count: capacity,
            }];
            let pool_info = vk::DescriptorPoolCreateInfo::default()
                .flags(vk::DescriptorPoolCreateFlags::UPDATE_AFTER_BIND)
                .max_sets(1)
                .pool_sizes(&pool_sizes);
            let pool = match ctx.device.create_descriptor_pool(&pool_info, None) {
                Ok(pool) => pool,
                Err(e) => {
                    ctx.device.destroy_descriptor_set_layout(layout, None);
                    return Err(tex_err!(SOURCE, "Failed to create bindless descriptor pool: {:?}", e));
                }
            };

            let layouts = [layout];
            let alloc_info = vk::DescriptorSetAllocateInfo::default()
                .descriptor_pool(pool)
                .set_layouts(&layouts);
            let set = match ctx.device.allocate_descriptor_sets(&alloc_info) {
                Ok(sets) => sets[0],
                Err(e) => {
                    ctx.device.destroy_descriptor_pool(pool, None);
                    ctx.device.destroy_descriptor_set_layout(layout, None);
                    return Err(tex_err!(SOURCE, "Failed to allocate bindless descriptor set: {:?}", e));
                }
            };

            Ok(Self {
                layout,
                pool,
                set,
                slots: SlotAllocator::with_capacity(capacity),
            })
        }
    }

    /// Reserve a descriptor slot, or fail when the table is full
    pub(crate) fn reserve(&mut self) -> Result<u32> {
        self.slots.alloc().ok_or_else(|| {
            Error::AllocationFailure(format!(
                "bindless table full ({} descriptors)",
                self.slots.capacity()
            ))
            .logged(SOURCE)
        })
    }

    pub(crate) fn free(&mut self, slot: u32) {
        self.slots.free(slot);
    }

    /// Point descriptor `slot` at `view`, sampled with `sampler`
    ///
    /// The set is update-after-bind, so this is valid while earlier
    /// submissions that use other slots are still executing.
    pub(crate) fn write(&self, ctx: &GpuContext, slot: u32, view: vk::ImageView, sampler: vk::Sampler) {
        let image_info = [vk::DescriptorImageInfo::default()
            .sampler(sampler)
            .image_view(view)
            .image_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)];
        let write = vk::WriteDescriptorSet::default()
            .dst_set(self.set)
            .dst_binding(BINDLESS_TEXTURE_BINDING)
            .dst_array_element(slot)
            .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
            .image_info(&image_info);
        unsafe {
            ctx.device.update_descriptor_sets(&[write], &[]);
        }
    }

    pub(crate) fn in_use(&self) -> u32 {
        self.slots.len()
    }

    /// # Safety
    ///
    /// The GPU must no longer be using the set.
    pub(crate) unsafe fn destroy(&mut self, ctx: &GpuContext) {
        // Destroying the pool frees the set
        ctx.device.destroy_descriptor_pool(self.pool, None);
        ctx.device.destroy_descriptor_set_layout(self.layout, None);
    }
}

#[cfg(test)]
#[path = "vulkan_bindless_tests.rs"]
mod tests;
