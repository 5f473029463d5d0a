/// VulkanTexture - image, view and memory behind one resident texture

use crate::vulkan_context::GpuContext;
use ash::vk;
use gpu_allocator::vulkan::Allocation;

/// GPU objects of one uploaded texture
///
/// Owned by the device's resource map; destroyed explicitly through
/// `destroy()` because destruction needs the shared context.
pub(crate) struct VulkanTexture {
    /// Vulkan image
    pub(crate) image: vk::Image,
    /// Vulkan image view
    pub(crate) view: vk::ImageView,
    /// GPU memory allocation
    pub(crate) allocation: Option<Allocation>,
    /// Bindless descriptor slot
    pub(crate) slot: u32,
    pub(crate) format: vk::Format,
    pub(crate) extent: vk::Extent2D,
}

impl VulkanTexture {
    /// Destroy the view, free memory, destroy the image
    ///
    /// # Safety
    ///
    /// The GPU must have finished every submission that samples the texture.
    pub(crate) unsafe fn destroy(mut self, ctx: &GpuContext) {
        ctx.device.destroy_image_view(self.view, None);

        if let Some(allocation) = self.allocation.take() {
            ctx.allocator().free(allocation).ok();
        }

        ctx.device.destroy_image(self.image, None);
    }
}

impl std::fmt::Debug for VulkanTexture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VulkanTexture")
            .field("slot", &self.slot)
            .field("format", &self.format)
            .field("extent", &self.extent)
            .finish()
    }
}
