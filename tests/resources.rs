//! Every bridge operation must leave the engine holding nothing, whether it
//! succeeds or fails.

use zendib::*;

fn bridge() -> Bridge<DibEngine> {
    Bridge::new(DibEngine::new())
}

fn rgb() -> OwnedArray {
    OwnedArray::from_vec(4, 3, Some(3), (0..36).map(|i| i as u8).collect()).unwrap()
}

#[test]
fn successful_calls_release_everything() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ok.ppm");
    let bridge = bridge();

    bridge.write(&rgb(), &path, IoFlags::DEFAULT).unwrap();
    assert!(bridge.engine().stats().is_idle());
    bridge.read(&path, IoFlags::DEFAULT).unwrap();
    assert!(bridge.engine().stats().is_idle());
    bridge.read_metadata(&path).unwrap();
    assert!(bridge.engine().stats().is_idle());
}

#[test]
fn unknown_file_type() {
    let dir = tempfile::tempdir().unwrap();
    let bridge = bridge();

    let junk = dir.path().join("junk.bin");
    std::fs::write(&junk, b"definitely not an image").unwrap();
    let err = bridge.read(&junk, IoFlags::DEFAULT).unwrap_err();
    assert!(matches!(err, BitmapError::UnknownFileType { .. }), "{err}");

    let err = bridge.write(&rgb(), dir.path().join("out.xyz"), IoFlags::DEFAULT).unwrap_err();
    assert!(matches!(err, BitmapError::UnknownFileType { .. }), "{err}");

    let err = bridge.read(dir.path().join("missing.ppm"), IoFlags::DEFAULT).unwrap_err();
    assert!(matches!(err, BitmapError::UnknownFileType { .. }), "{err}");
    assert!(bridge.engine().stats().is_idle());
}

#[test]
fn corrupt_file_reports_the_decoder_fault() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("truncated.ppm");
    std::fs::write(&path, b"P6\n4 4\n255\n\x01\x02\x03").unwrap();
    let bridge = bridge();

    let err = bridge.read(&path, IoFlags::DEFAULT).unwrap_err();
    match err {
        BitmapError::DecoderFault { path: at, format, message } => {
            assert_eq!(at.as_deref(), Some(path.as_path()));
            assert_eq!(format, Some(FileType::Ppm));
            assert!(!message.is_empty());
        }
        other => panic!("expected a decoder fault, got {other}"),
    }
    assert!(bridge.engine().stats().is_idle());
}

#[test]
fn rejected_shapes_and_types() {
    let dir = tempfile::tempdir().unwrap();
    let bridge = bridge();

    assert!(matches!(
        OwnedArray::from_shape(&[2, 2, 3, 1], vec![0u8; 12]),
        Err(BitmapError::InvalidShape { ndim: 4 })
    ));
    assert!(matches!(
        OwnedArray::from_shape(&[12], vec![0u8; 12]),
        Err(BitmapError::InvalidShape { ndim: 1 })
    ));

    let two_channel = OwnedArray::from_vec(2, 2, Some(2), vec![0u8; 8]).unwrap();
    let err = bridge.write(&two_channel, dir.path().join("a.pam"), IoFlags::DEFAULT).unwrap_err();
    assert!(matches!(err, BitmapError::UnsupportedFormat(_)), "{err}");

    let rgb_f64 = OwnedArray::from_vec(1, 1, Some(3), vec![0.0f64; 3]).unwrap();
    let err = bridge.write(&rgb_f64, dir.path().join("b.tif"), IoFlags::DEFAULT).unwrap_err();
    assert!(matches!(err, BitmapError::UnsupportedFormat(_)), "{err}");
    assert!(bridge.engine().stats().is_idle());
}

#[test]
fn incompatible_format_is_caught_before_saving() {
    let dir = tempfile::tempdir().unwrap();
    let bridge = bridge();

    let complex = OwnedArray::zeros(ElementType::Complex64, 2, 2, None).unwrap();
    let path = dir.path().join("complex.pgm");
    let err = bridge.write(&complex, &path, IoFlags::DEFAULT).unwrap_err();
    assert!(
        matches!(err, BitmapError::IncompatibleFormat { pixel_type: PixelType::Complex, .. }),
        "{err}"
    );
    assert!(!path.exists());

    let floats = OwnedArray::from_vec(2, 1, None, vec![0.5f32, 1.5]).unwrap();
    let path = dir.path().join("floats.ppm");
    let err = bridge.write(&floats, &path, IoFlags::DEFAULT).unwrap_err();
    assert!(matches!(err, BitmapError::IncompatibleFormat { format: FileType::Ppm, .. }), "{err}");
    assert!(!path.exists());
    assert!(bridge.engine().stats().is_idle());
}

#[test]
fn limits_surface_as_decoder_faults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wide.ppm");
    write(&rgb(), &path, IoFlags::DEFAULT).unwrap();

    let bridge = Bridge::new(DibEngine::with_limits(Limits {
        max_width: Some(2),
        ..Limits::default()
    }));
    let err = bridge.read(&path, IoFlags::DEFAULT).unwrap_err();
    assert!(err.to_string().contains(&path.display().to_string()), "{err}");
    match err {
        BitmapError::DecoderFault { path: at, format, .. } => {
            assert_eq!(at.as_deref(), Some(path.as_path()));
            assert_eq!(format, Some(FileType::Ppm));
        }
        other => panic!("expected a decoder fault, got {other}"),
    }
    let err = bridge.write(&rgb(), dir.path().join("again.ppm"), IoFlags::DEFAULT).unwrap_err();
    assert!(matches!(err, BitmapError::DecoderFault { .. } | BitmapError::AllocationError(_)), "{err}");
    assert!(bridge.engine().stats().is_idle());
}

#[cfg(feature = "tiff")]
#[test]
fn failed_multipage_read_releases_the_container() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pages.tif");

    // Page two is wider than the limit; nothing is returned and nothing leaks.
    let pages = vec![
        OwnedArray::from_vec(1, 1, None, vec![0u8]).unwrap(),
        OwnedArray::from_vec(8, 1, None, vec![0u8; 8]).unwrap(),
    ];
    write_multipage(&pages, &path, IoFlags::DEFAULT).unwrap();
    let bridge = Bridge::new(DibEngine::with_limits(Limits {
        max_width: Some(4),
        ..Limits::default()
    }));
    assert!(bridge.read_multipage(&path, IoFlags::DEFAULT).is_err());
    assert!(bridge.engine().stats().is_idle());

    let bridge = Bridge::default();
    assert_eq!(bridge.read_multipage(&path, IoFlags::DEFAULT).unwrap(), pages);
    assert!(bridge.engine().stats().is_idle());
}
