/// Unit tests for pixel_buffer.rs

use super::*;

// ============================================================================
// CONSTRUCTION TESTS
// ============================================================================

#[test]
fn test_new_accepts_matching_sample_count() {
    let buffer = PixelBuffer::from_u8(4, 2, 3, vec![0; 24]).unwrap();
    assert_eq!(buffer.width(), 4);
    assert_eq!(buffer.height(), 2);
    assert_eq!(buffer.size(), UVec2::new(4, 2));
    assert_eq!(buffer.channels(), 3);
    assert_eq!(buffer.pixel_count(), 8);
    assert_eq!(buffer.sample_type(), SampleType::U8);
}

#[test]
fn test_new_rejects_wrong_sample_count() {
    let result = PixelBuffer::from_u8(4, 4, 1, vec![0; 15]);
    assert!(matches!(result, Err(Error::InvalidResource(_))));
}

#[test]
fn test_new_rejects_zero_extent() {
    assert!(PixelBuffer::from_u8(0, 4, 1, vec![]).is_err());
    assert!(PixelBuffer::from_f32(4, 0, 1, vec![]).is_err());
}

#[test]
fn test_new_rejects_bad_channel_count() {
    assert!(PixelBuffer::from_u8(1, 1, 0, vec![]).is_err());
    assert!(PixelBuffer::from_u8(1, 1, 5, vec![0; 5]).is_err());
}

#[test]
fn test_filled_constructors() {
    let buffer = PixelBuffer::filled_f32(4, 4, &[0.5]).unwrap();
    assert_eq!(buffer.channels(), 1);
    assert_eq!(buffer.data().len(), 16);
    assert!((0..16).all(|i| buffer.sample(i, 0) == 0.5));

    let buffer = PixelBuffer::filled_u8(2, 2, &[10, 20]).unwrap();
    assert_eq!(buffer.channels(), 2);
    assert_eq!(buffer.as_bytes(), &[10, 20, 10, 20, 10, 20, 10, 20]);
}

// ============================================================================
// ACCESS TESTS
// ============================================================================

#[test]
fn test_sample_normalizes_u8() {
    let buffer = PixelBuffer::from_u8(2, 1, 1, vec![0, 255]).unwrap();
    assert_eq!(buffer.sample(0, 0), 0.0);
    assert_eq!(buffer.sample(1, 0), 1.0);
}

#[test]
fn test_sample_reads_selected_channel() {
    let buffer = PixelBuffer::from_f32(2, 1, 2, vec![0.1, 0.2, 0.3, 0.4]).unwrap();
    assert_eq!(buffer.sample(0, 1), 0.2);
    assert_eq!(buffer.sample(1, 0), 0.3);
}

#[test]
fn test_as_bytes_for_float_data() {
    let buffer = PixelBuffer::from_f32(1, 1, 1, vec![1.0]).unwrap();
    assert_eq!(buffer.as_bytes(), &1.0f32.to_ne_bytes());
    assert_eq!(buffer.byte_len(), 4);
}

#[test]
fn test_to_rgba_expands_three_channels() {
    let buffer = PixelBuffer::from_u8(2, 1, 3, vec![1, 2, 3, 4, 5, 6]).unwrap();
    let rgba = buffer.to_rgba();
    assert_eq!(rgba.channels(), 4);
    assert_eq!(rgba.size(), buffer.size());
    assert_eq!(rgba.as_bytes(), &[1, 2, 3, 255, 4, 5, 6, 255]);

    let buffer = PixelBuffer::from_f32(1, 1, 3, vec![0.1, 0.2, 0.3]).unwrap();
    assert_eq!(buffer.to_rgba().data(), &PixelData::F32(vec![0.1, 0.2, 0.3, 1.0]));
}

#[test]
fn test_to_rgba_leaves_other_layouts_alone() {
    let buffer = PixelBuffer::from_u8(1, 1, 2, vec![7, 8]).unwrap();
    assert_eq!(buffer.to_rgba(), buffer);
}
