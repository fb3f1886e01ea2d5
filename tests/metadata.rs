use zendib::*;

#[test]
fn pnm_comments_land_in_the_comments_model() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("commented.pgm");
    std::fs::write(&path, b"P5\n# made by hand\n# second line\n2 1\n255\n\x01\x02").unwrap();

    let tags = read_metadata(&path).unwrap();
    assert_eq!(tags.len(), 1);
    let comment = tags.get(MetadataModel::Comments, "Comment").unwrap();
    assert_eq!(comment.as_text(), Some("made by hand\nsecond line"));
    assert!(!tags.contains_model(MetadataModel::ExifMain));
}

#[test]
fn file_without_tags_has_an_empty_map() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("plain.ppm");
    let image = OwnedArray::from_vec(1, 1, Some(3), vec![1u8, 2, 3]).unwrap();
    write(&image, &path, IoFlags::DEFAULT).unwrap();

    let tags = read_metadata(&path).unwrap();
    assert!(tags.is_empty());
    for model in MetadataModel::ALL {
        assert!(!tags.contains_model(model), "{model}");
    }
}

#[cfg(feature = "tiff")]
#[test]
fn tiff_baseline_tags_read_as_exif_main() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tagged.tif");
    let engine = DibEngine::new();
    let mut bitmap = engine.allocate(PixelType::Bitmap, 2, 2, 24).unwrap();
    bitmap.set_text(MetadataModel::ExifMain, "Make", "Acme");
    bitmap.set_text(MetadataModel::ExifMain, "Software", "zendib tests");
    bitmap.set_metadata(MetadataModel::ExifMain, "Orientation", TagType::Short, 3u16.to_ne_bytes().to_vec());
    assert!(engine.save(FileType::Tiff, &bitmap, &path, IoFlags::DEFAULT));
    engine.unload(bitmap);

    let tags = read_metadata(&path).unwrap();
    let exif: Vec<&str> = tags.model(MetadataModel::ExifMain).map(|(k, _)| k).collect();
    for key in ["Make", "Software", "Orientation", "XResolution", "YResolution", "ResolutionUnit"] {
        assert!(exif.contains(&key), "missing {key} in {exif:?}");
    }
    assert_eq!(tags.get(MetadataModel::ExifMain, "Make").and_then(TagValue::as_text), Some("Acme"));
    assert_eq!(
        tags.get(MetadataModel::ExifMain, "Orientation").and_then(TagValue::as_scalar),
        Some(&Scalar::U16(3))
    );
    assert_eq!(
        tags.get(MetadataModel::ExifMain, "XResolution").and_then(TagValue::as_scalar),
        Some(&Scalar::Rational(72, 1))
    );
    assert!(engine.stats().is_idle());
}

#[cfg(feature = "tiff")]
#[test]
fn header_only_handles_have_no_pixels() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("big.tif");
    let image = OwnedArray::zeros(ElementType::U16, 64, 64, None).unwrap();
    write(&image, &path, IoFlags::DEFAULT).unwrap();

    let bridge = Bridge::new(DibEngine::new());
    let handle = bridge.open(&path, IoFlags::LOAD_NOPIXELS).unwrap();
    assert_eq!((handle.width(), handle.height()), (64, 64));
    assert_eq!(handle.pixel_type(), PixelType::Uint16);
    let err = handle.with_view(|_| ()).unwrap_err();
    assert!(matches!(err, BitmapError::LoadFailed { .. }), "{err}");
    drop(handle);
    assert!(bridge.engine().stats().is_idle());
}
