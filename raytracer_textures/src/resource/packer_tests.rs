/// Unit tests for packer.rs
///
/// The channel layout checked here is what the shading code samples; a change
/// to any assertion below is a change to the material data contract.

use super::*;

fn gray_f32(size: u32, value: f32) -> PixelBuffer {
    PixelBuffer::filled_f32(size, size, &[value]).unwrap()
}

fn gray_u8(size: u32, value: u8) -> PixelBuffer {
    PixelBuffer::filled_u8(size, size, &[value]).unwrap()
}

fn pixels(buffer: &PixelBuffer) -> Vec<[f32; 4]> {
    (0..buffer.pixel_count())
        .map(|i| {
            [
                buffer.sample(i, 0),
                buffer.sample(i, 1),
                buffer.sample(i, 2),
                buffer.sample(i, 3),
            ]
        })
        .collect()
}

// ============================================================================
// LAYOUT TESTS
// ============================================================================

#[test]
fn test_pack_rm_defaults_occlusion_and_alpha() {
    let roughness = gray_f32(4, 0.5);
    let metalness = gray_f32(4, 0.8);

    let packed = pack(
        CompositeKind::Rm,
        &[
            PackSource::new(PrimitiveRole::Roughness, &roughness),
            PackSource::new(PrimitiveRole::Metalness, &metalness),
        ],
    )
    .unwrap();

    assert_eq!(packed.width(), 4);
    assert_eq!(packed.height(), 4);
    assert_eq!(packed.channels(), 4);
    assert_eq!(packed.sample_type(), SampleType::F32);
    for pixel in pixels(&packed) {
        assert_eq!(pixel, [0.5, 0.8, 1.0, 1.0]);
    }
}

#[test]
fn test_pack_rmao_places_each_channel() {
    let roughness = gray_f32(2, 0.25);
    let metalness = gray_f32(2, 0.75);
    let occlusion = gray_f32(2, 0.1);

    // Source order must not matter
    let packed = pack(
        CompositeKind::Rmao,
        &[
            PackSource::new(PrimitiveRole::AmbientOcclusion, &occlusion),
            PackSource::new(PrimitiveRole::Roughness, &roughness),
            PackSource::new(PrimitiveRole::Metalness, &metalness),
        ],
    )
    .unwrap();

    for pixel in pixels(&packed) {
        assert_eq!(pixel[CHANNEL_ROUGHNESS], 0.25);
        assert_eq!(pixel[CHANNEL_METALNESS], 0.75);
        assert_eq!(pixel[CHANNEL_OCCLUSION], 0.1);
        assert_eq!(pixel[CHANNEL_ALPHA], 1.0);
    }
}

#[test]
fn test_pack_u8_sources_stay_u8() {
    let roughness = gray_u8(2, 128);
    let metalness = gray_u8(2, 200);

    let packed = pack(
        CompositeKind::Rm,
        &[
            PackSource::new(PrimitiveRole::Roughness, &roughness),
            PackSource::new(PrimitiveRole::Metalness, &metalness),
        ],
    )
    .unwrap();

    assert_eq!(packed.sample_type(), SampleType::U8);
    assert_eq!(&packed.as_bytes()[..4], &[128, 200, 255, 255]);
}

#[test]
fn test_pack_mixed_sources_promote_to_f32() {
    let roughness = gray_u8(2, 255);
    let metalness = gray_f32(2, 0.5);

    let packed = pack(
        CompositeKind::Rm,
        &[
            PackSource::new(PrimitiveRole::Roughness, &roughness),
            PackSource::new(PrimitiveRole::Metalness, &metalness),
        ],
    )
    .unwrap();

    assert_eq!(packed.sample_type(), SampleType::F32);
    assert_eq!(pixels(&packed)[0], [1.0, 0.5, 1.0, 1.0]);
}

#[test]
fn test_pack_reads_selected_channel() {
    // ORM texture authored as one image: R=occlusion, G=roughness, B=metalness
    let orm = PixelBuffer::filled_u8(2, 2, &[10, 20, 30]).unwrap();

    let packed = pack(
        CompositeKind::Rmao,
        &[
            PackSource::new(PrimitiveRole::AmbientOcclusion, &orm).with_channel(0),
            PackSource::new(PrimitiveRole::Roughness, &orm).with_channel(1),
            PackSource::new(PrimitiveRole::Metalness, &orm).with_channel(2),
        ],
    )
    .unwrap();

    assert_eq!(&packed.as_bytes()[..4], &[20, 30, 10, 255]);
}

#[test]
fn test_pack_varies_per_pixel() {
    let roughness = PixelBuffer::from_u8(2, 1, 1, vec![1, 2]).unwrap();
    let metalness = PixelBuffer::from_u8(2, 1, 1, vec![3, 4]).unwrap();

    let packed = pack(
        CompositeKind::Rm,
        &[
            PackSource::new(PrimitiveRole::Roughness, &roughness),
            PackSource::new(PrimitiveRole::Metalness, &metalness),
        ],
    )
    .unwrap();

    assert_eq!(packed.as_bytes(), &[1, 3, 255, 255, 2, 4, 255, 255]);
}

// ============================================================================
// ERROR TESTS
// ============================================================================

#[test]
fn test_pack_rmao_dimension_mismatch() {
    let roughness = gray_f32(4, 0.5);
    let metalness = gray_f32(2, 0.5);
    let occlusion = gray_f32(4, 0.5);

    let result = pack(
        CompositeKind::Rmao,
        &[
            PackSource::new(PrimitiveRole::Roughness, &roughness),
            PackSource::new(PrimitiveRole::Metalness, &metalness),
            PackSource::new(PrimitiveRole::AmbientOcclusion, &occlusion),
        ],
    );

    assert!(matches!(result, Err(Error::SourceMismatch(_))));
}

#[test]
fn test_pack_missing_required_source() {
    let roughness = gray_f32(4, 0.5);
    let metalness = gray_f32(4, 0.5);

    // AO is only optional under RM
    let result = pack(
        CompositeKind::Rmao,
        &[
            PackSource::new(PrimitiveRole::Roughness, &roughness),
            PackSource::new(PrimitiveRole::Metalness, &metalness),
        ],
    );
    assert!(matches!(result, Err(Error::SourceMismatch(_))));

    let result = pack(CompositeKind::Rm, &[PackSource::new(PrimitiveRole::Roughness, &roughness)]);
    assert!(matches!(result, Err(Error::SourceMismatch(_))));

    assert!(matches!(pack(CompositeKind::Rm, &[]), Err(Error::SourceMismatch(_))));
}

#[test]
fn test_pack_rejects_foreign_role() {
    let image = gray_f32(4, 0.5);

    let result = pack(
        CompositeKind::Rm,
        &[
            PackSource::new(PrimitiveRole::Roughness, &image),
            PackSource::new(PrimitiveRole::Metalness, &image),
            PackSource::new(PrimitiveRole::Albedo, &image),
        ],
    );
    assert!(matches!(result, Err(Error::SourceMismatch(_))));

    // AO is not part of RM either
    let result = pack(
        CompositeKind::Rm,
        &[
            PackSource::new(PrimitiveRole::Roughness, &image),
            PackSource::new(PrimitiveRole::Metalness, &image),
            PackSource::new(PrimitiveRole::AmbientOcclusion, &image),
        ],
    );
    assert!(matches!(result, Err(Error::SourceMismatch(_))));
}

#[test]
fn test_pack_rejects_duplicate_role() {
    let image = gray_f32(4, 0.5);

    let result = pack(
        CompositeKind::Rm,
        &[
            PackSource::new(PrimitiveRole::Roughness, &image),
            PackSource::new(PrimitiveRole::Roughness, &image),
            PackSource::new(PrimitiveRole::Metalness, &image),
        ],
    );
    assert!(matches!(result, Err(Error::SourceMismatch(_))));
}

#[test]
fn test_pack_rejects_out_of_range_channel() {
    let image = gray_f32(4, 0.5);

    let result = pack(
        CompositeKind::Rm,
        &[
            PackSource::new(PrimitiveRole::Roughness, &image).with_channel(1),
            PackSource::new(PrimitiveRole::Metalness, &image),
        ],
    );
    assert!(matches!(result, Err(Error::SourceMismatch(_))));
}
