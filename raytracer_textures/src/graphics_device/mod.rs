/// Graphics device module - the device collaborator and the upload step

pub mod texture_device;
pub mod pixel_format;
pub mod upload_pipeline;

pub use texture_device::*;
pub use pixel_format::PixelFormat;
pub use upload_pipeline::UploadPipeline;

// Mock texture device for tests (no GPU required)
#[cfg(test)]
pub mod mock_graphics_device;
