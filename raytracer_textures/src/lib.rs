/*!
# Raytracer Textures

Texture residency for a bindless raytracer.

This crate owns the CPU side of material textures: it classifies each texture
by semantic role, packs roughness/metalness/occlusion into one RGBA image,
uploads through a device collaborator and hands back a stable bindless handle
that shading code indexes directly. Device backends (Vulkan, ...) implement
the `TextureDevice` trait in their own crates.

## Architecture

- **TextureRole / classify**: closed role vocabulary and mask validation
- **pack**: fixed R=roughness, G=metalness, B=occlusion, A=1 layout
- **UploadPipeline**: format selection and device upload
- **TextureRegistry**: `(name, role)` table with request coalescing
- **TextureLoader / TextureDevice**: collaborator traits
*/

// Internal modules
mod error;
pub mod log;
pub mod graphics_device;
pub mod resource;
pub mod utils;

// Main raytracer namespace module
pub mod raytracer {
    // Error types
    pub use crate::error::{Error, Result};

    // Registry entry points
    pub use crate::resource::{RegistryConfig, TextureRegistry, TextureState, TextureLoader};
    pub use crate::graphics_device::TextureDevice;

    // Logging sub-module (types and logger control, macros live at the crate root)
    pub mod log {
        pub use crate::log::{
            reset_logger, set_logger, DefaultLogger, LogEntry, LogSeverity, Logger,
        };
    }

    // Device sub-module
    pub mod device {
        pub use crate::graphics_device::*;
    }

    // Resource sub-module
    pub mod resource {
        pub use crate::resource::*;
    }

    // Utility sub-module
    pub mod utils {
        pub use crate::utils::*;
    }
}

// Re-export math library at crate root
pub use glam;
