//! Texture resources
//!
//! Role classification, CPU pixel storage, channel packing and the registry
//! that owns every resident texture.

pub mod role;
pub mod pixel_buffer;
pub mod packer;
pub mod texture;
pub mod loader;
mod texture_registry;

pub use role::{classify, Classification, ColorSpace, CompositeKind, PrimitiveRole, RoleMask, TextureRole};
pub use pixel_buffer::{PixelBuffer, PixelData, SampleType};
pub use packer::{
    pack, PackSource,
    CHANNEL_ALPHA, CHANNEL_METALNESS, CHANNEL_OCCLUSION, CHANNEL_ROUGHNESS, PACKED_CHANNELS,
};
pub use texture::{StagedTexture, Texture, TextureKey};
pub use loader::{MemoryLoader, TextureLoader};
pub use texture_registry::{RegistryConfig, RegistryStats, TextureRegistry, TextureState};
