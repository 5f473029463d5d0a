/// Channel packing for composite roles.
///
/// Roughness, metalness and ambient occlusion are usually authored as separate
/// grayscale images but sampled as one RGBA texture. The packed layout is a
/// contract with the shading code (glTF metallic-roughness convention):
///
/// | channel | content                                  |
/// |---------|------------------------------------------|
/// | R       | Roughness                                |
/// | G       | Metalness                                |
/// | B       | AmbientOcclusion (1.0 under RM)          |
/// | A       | unused, opaque (1.0)                     |

use crate::error::{Error, Result};
use crate::resource::pixel_buffer::{PixelBuffer, PixelData, SampleType};
use crate::resource::role::{CompositeKind, PrimitiveRole};

const SOURCE: &str = "raytracer::ChannelPacker";

/// Packed channel holding roughness
pub const CHANNEL_ROUGHNESS: usize = 0;
/// Packed channel holding metalness
pub const CHANNEL_METALNESS: usize = 1;
/// Packed channel holding ambient occlusion
pub const CHANNEL_OCCLUSION: usize = 2;
/// Packed channel left opaque
pub const CHANNEL_ALPHA: usize = 3;

/// Channel count of every packed buffer
pub const PACKED_CHANNELS: u32 = 4;

/// One input image for the packer
#[derive(Debug, Clone, Copy)]
pub struct PackSource<'a> {
    /// Role the image provides
    pub role: PrimitiveRole,
    /// Source pixels
    pub image: &'a PixelBuffer,
    /// Channel of `image` to read (0 for grayscale sources)
    pub channel: u32,
}

impl<'a> PackSource<'a> {
    pub fn new(role: PrimitiveRole, image: &'a PixelBuffer) -> Self {
        Self { role, image, channel: 0 }
    }

    /// Read a specific channel of a multi-channel source
    pub fn with_channel(mut self, channel: u32) -> Self {
        self.channel = channel;
        self
    }
}

/// Destination channel for a constituent role
fn packed_channel(role: PrimitiveRole) -> Option<usize> {
    match role {
        PrimitiveRole::Roughness => Some(CHANNEL_ROUGHNESS),
        PrimitiveRole::Metalness => Some(CHANNEL_METALNESS),
        PrimitiveRole::AmbientOcclusion => Some(CHANNEL_OCCLUSION),
        _ => None,
    }
}

/// Build the packed RGBA buffer for `kind`
///
/// Every constituent of `kind` must be supplied exactly once, and all sources
/// must share one size. The only default is ambient occlusion under RM, which
/// is fixed at 1.0. The output is U8 when every source is U8, F32 otherwise.
pub fn pack(kind: CompositeKind, sources: &[PackSource<'_>]) -> Result<PixelBuffer> {
    let mut slots: [Option<&PackSource<'_>>; 3] = [None; 3];

    for source in sources {
        if !kind.constituents().contains(&source.role) {
            return Err(Error::SourceMismatch(format!(
                "{} is not a channel of {}",
                source.role.name(),
                kind.name()
            ))
            .logged(SOURCE));
        }
        if source.channel >= source.image.channels() {
            return Err(Error::SourceMismatch(format!(
                "{} source has {} channels, channel {} requested",
                source.role.name(),
                source.image.channels(),
                source.channel
            ))
            .logged(SOURCE));
        }
        // constituents are always roughness/metalness/occlusion
        let Some(slot) = packed_channel(source.role) else {
            continue;
        };
        if slots[slot].is_some() {
            return Err(Error::SourceMismatch(format!(
                "{} supplied more than once",
                source.role.name()
            ))
            .logged(SOURCE));
        }
        slots[slot] = Some(source);
    }

    for role in kind.constituents() {
        let supplied = packed_channel(*role).and_then(|slot| slots[slot]).is_some();
        if !supplied {
            return Err(Error::SourceMismatch(format!(
                "{} requires a {} source",
                kind.name(),
                role.name()
            ))
            .logged(SOURCE));
        }
    }

    let Some(reference) = slots.iter().flatten().next() else {
        return Err(Error::SourceMismatch(format!("{} has no sources", kind.name())).logged(SOURCE));
    };
    let size = reference.image.size();
    for source in slots.iter().flatten() {
        if source.image.size() != size {
            return Err(Error::SourceMismatch(format!(
                "{} is {}x{}, {} is {}x{}",
                source.role.name(),
                source.image.width(),
                source.image.height(),
                reference.role.name(),
                size.x,
                size.y
            ))
            .logged(SOURCE));
        }
    }

    let all_u8 = slots
        .iter()
        .flatten()
        .all(|source| source.image.sample_type() == SampleType::U8);
    let pixel_count = reference.image.pixel_count();
    let channels = PACKED_CHANNELS as usize;

    let data = if all_u8 {
        let mut packed = vec![u8::MAX; pixel_count * channels];
        for (slot, source) in slots.iter().enumerate() {
            let Some(source) = source else { continue };
            let PixelData::U8(samples) = source.image.data() else { continue };
            let stride = source.image.channels() as usize;
            let offset = source.channel as usize;
            for (pixel, out) in packed.chunks_exact_mut(channels).enumerate() {
                out[slot] = samples[pixel * stride + offset];
            }
        }
        PixelData::U8(packed)
    } else {
        let mut packed = vec![1.0f32; pixel_count * channels];
        for (slot, source) in slots.iter().enumerate() {
            let Some(source) = source else { continue };
            for (pixel, out) in packed.chunks_exact_mut(channels).enumerate() {
                out[slot] = source.image.sample(pixel, source.channel);
            }
        }
        PixelData::F32(packed)
    };

    PixelBuffer::new(size.x, size.y, PACKED_CHANNELS, data)
}

#[cfg(test)]
#[path = "packer_tests.rs"]
mod tests;
