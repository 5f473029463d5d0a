use super::*;

#[test]
fn test_color_roles_use_srgb_for_u8() {
    assert_eq!(
        PixelFormat::select(TextureRole::ALBEDO, 4, SampleType::U8).unwrap(),
        PixelFormat::R8G8B8A8_SRGB
    );
    assert_eq!(
        PixelFormat::select(TextureRole::EMISSION, 3, SampleType::U8).unwrap(),
        PixelFormat::R8G8B8A8_SRGB
    );
}

#[test]
fn test_data_roles_use_unorm() {
    assert_eq!(
        PixelFormat::select(TextureRole::NORMAL, 4, SampleType::U8).unwrap(),
        PixelFormat::R8G8B8A8_UNORM
    );
    assert_eq!(
        PixelFormat::select(TextureRole::ROUGHNESS, 1, SampleType::U8).unwrap(),
        PixelFormat::R8_UNORM
    );
    assert_eq!(
        PixelFormat::select(TextureRole::RMAO, 4, SampleType::U8).unwrap(),
        PixelFormat::R8G8B8A8_UNORM
    );
}

#[test]
fn test_float_data_is_always_linear() {
    assert_eq!(
        PixelFormat::select(TextureRole::EMISSION, 4, SampleType::F32).unwrap(),
        PixelFormat::R32G32B32A32_SFLOAT
    );
    assert_eq!(
        PixelFormat::select(TextureRole::HEIGHT, 1, SampleType::F32).unwrap(),
        PixelFormat::R32_SFLOAT
    );
    assert_eq!(
        PixelFormat::select(TextureRole::NORMAL, 2, SampleType::F32).unwrap(),
        PixelFormat::R32G32_SFLOAT
    );
}

#[test]
fn test_unsupported_channel_count() {
    assert!(matches!(
        PixelFormat::select(TextureRole::ALBEDO, 0, SampleType::U8),
        Err(Error::AllocationFailure(_))
    ));
    assert!(matches!(
        PixelFormat::select(TextureRole::ALBEDO, 5, SampleType::F32),
        Err(Error::AllocationFailure(_))
    ));
}

#[test]
fn test_format_properties() {
    assert_eq!(PixelFormat::R8_UNORM.bytes_per_pixel(), 1);
    assert_eq!(PixelFormat::R8G8_SRGB.bytes_per_pixel(), 2);
    assert_eq!(PixelFormat::R8G8B8A8_SRGB.bytes_per_pixel(), 4);
    assert_eq!(PixelFormat::R32G32_SFLOAT.bytes_per_pixel(), 8);
    assert_eq!(PixelFormat::R32G32B32A32_SFLOAT.bytes_per_pixel(), 16);

    assert!(PixelFormat::R8G8B8A8_SRGB.is_srgb());
    assert!(!PixelFormat::R32G32B32A32_SFLOAT.is_srgb());
    assert_eq!(PixelFormat::R32_SFLOAT.sample_type(), SampleType::F32);
}
