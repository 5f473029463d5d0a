/// Unit tests for MockTextureDevice

use super::*;

fn desc<'a>(label: &'a str, data: &'a [u8]) -> UploadDesc<'a> {
    UploadDesc {
        label,
        width: 2,
        height: 1,
        format: PixelFormat::R8_UNORM,
        data,
    }
}

// ============================================================================
// Allocation
// ============================================================================

#[test]
fn test_ids_and_handles_are_non_zero_and_distinct() {
    let device = MockTextureDevice::new();
    let a = device.allocate_and_upload(&desc("a", &[0, 1])).unwrap();
    let b = device.allocate_and_upload(&desc("b", &[2, 3])).unwrap();

    assert_ne!(a.gpu_id, b.gpu_id);
    assert_ne!(a.handle, b.handle);
    assert_eq!(a.handle.shader_index(), 0);
    assert_eq!(device.upload_count(), 2);
    assert_eq!(device.uploads()[1].data, vec![2, 3]);
}

#[test]
fn test_rejects_wrong_payload_length() {
    let device = MockTextureDevice::new();
    let result = device.allocate_and_upload(&desc("short", &[0]));
    assert!(matches!(result, Err(Error::InvalidResource(_))));
    assert_eq!(device.upload_count(), 0);
}

#[test]
fn test_injected_failures() {
    let device = MockTextureDevice::new();
    device.fail_next_uploads(1);

    let first = device.allocate_and_upload(&desc("a", &[0, 0]));
    assert!(matches!(first, Err(Error::AllocationFailure(_))));
    assert!(device.allocate_and_upload(&desc("a", &[0, 0])).is_ok());
    assert_eq!(device.attempt_count(), 2);
    assert_eq!(device.upload_count(), 1);
}

#[test]
fn test_full_table_then_recycle() {
    let device = MockTextureDevice::with_capacity(1);
    let a = device.allocate_and_upload(&desc("a", &[0, 0])).unwrap();

    let full = device.allocate_and_upload(&desc("b", &[0, 0]));
    assert!(matches!(full, Err(Error::AllocationFailure(_))));

    device.release(a.gpu_id).unwrap();
    let b = device.allocate_and_upload(&desc("b", &[0, 0])).unwrap();
    assert_eq!(b.handle, a.handle);
    assert_ne!(b.gpu_id, a.gpu_id);
}

#[test]
fn test_unsupported_format() {
    let device = MockTextureDevice::new();
    device.mark_unsupported(PixelFormat::R8_UNORM);

    assert!(!device.supports_format(PixelFormat::R8_UNORM));
    assert!(device.supports_format(PixelFormat::R8_SRGB));
    assert!(device.allocate_and_upload(&desc("a", &[0, 0])).is_err());
}

// ============================================================================
// Release
// ============================================================================

#[test]
fn test_release_tracks_live_set() {
    let device = MockTextureDevice::new();
    let a = device.allocate_and_upload(&desc("a", &[0, 0])).unwrap();
    assert!(device.is_live(a.gpu_id));

    device.release(a.gpu_id).unwrap();
    assert!(!device.is_live(a.gpu_id));
    assert_eq!(device.live_count(), 0);
    assert_eq!(device.releases(), vec![a.gpu_id]);

    // Double release
    assert!(matches!(device.release(a.gpu_id), Err(Error::InvalidResource(_))));
    assert_eq!(device.release_count(), 1);
}
