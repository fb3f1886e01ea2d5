use zendib::*;

fn page(seed: u8) -> OwnedArray {
    let pixels = (0..3 * 2 * 3).map(|i| seed.wrapping_add(i as u8)).collect();
    OwnedArray::from_vec(3, 2, Some(3), pixels).unwrap()
}

#[cfg(feature = "tiff")]
#[test]
fn pages_come_back_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pages.tif");
    let pages = vec![page(0), page(100), page(200)];

    write_multipage(&pages, &path, IoFlags::DEFAULT).unwrap();
    let back = read_multipage(&path, IoFlags::DEFAULT).unwrap();
    assert_eq!(back, pages);
}

#[cfg(feature = "tiff")]
#[test]
fn pages_may_differ_in_type_and_size() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mixed.tiff");
    let pages = vec![
        page(7),
        OwnedArray::from_vec(2, 5, None, (0..10).map(|i| i as f32 * 0.5).collect()).unwrap(),
        OwnedArray::from_vec(1, 1, Some(4), vec![1u16, 2, 3, 4]).unwrap(),
    ];
    write_multipage(&pages, &path, IoFlags::TIFF_NONE).unwrap();
    let back = read_multipage(&path, IoFlags::DEFAULT).unwrap();
    assert_eq!(back, pages);

    // The single-image reader sees the first page.
    assert_eq!(read(&path, IoFlags::DEFAULT).unwrap(), pages[0]);
}

#[cfg(feature = "tiff")]
#[test]
fn one_metadata_map_per_page() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tags.tif");
    write_multipage(&[page(1), page(2)], &path, IoFlags::DEFAULT).unwrap();
    let maps = read_multipage_metadata(&path).unwrap();
    assert_eq!(maps.len(), 2);
    for map in &maps {
        assert!(map.get(MetadataModel::ExifMain, "XResolution").is_some());
    }
}

#[cfg(feature = "tiff")]
#[test]
fn session_locks_pages_individually() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.tif");
    write_multipage(&[page(10), page(20)], &path, IoFlags::DEFAULT).unwrap();

    let bridge = Bridge::new(DibEngine::new());
    let mut session = bridge.open_multipage(&path, IoFlags::DEFAULT).unwrap();
    assert_eq!(session.page_count(), 2);
    {
        let second = session.lock(1).unwrap();
        assert_eq!(second.to_array().unwrap(), page(20));
        assert_eq!(bridge.engine().stats().locked_pages, 1);
    }
    assert_eq!(bridge.engine().stats().locked_pages, 0);
    assert!(session.lock(2).is_err());
    session.close().unwrap();
    assert!(bridge.engine().stats().is_idle());
}

#[test]
fn only_tiff_holds_pages() {
    let dir = tempfile::tempdir().unwrap();
    for name in ["pages.ppm", "pages.bmp", "pages.ff"] {
        let path = dir.path().join(name);
        let err = write_multipage(&[page(0), page(1)], &path, IoFlags::DEFAULT).unwrap_err();
        assert!(
            matches!(err, BitmapError::DecoderFault { .. } | BitmapError::SaveFailed { .. }),
            "{name}: {err}"
        );
        assert!(!path.exists(), "{name}");
    }
}

#[cfg(feature = "tiff")]
#[test]
fn empty_page_list_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.tif");
    assert!(write_multipage(&[], &path, IoFlags::DEFAULT).is_err());
    assert!(!path.exists());
}

#[cfg(feature = "tiff")]
#[test]
fn rejected_page_aborts_the_write_without_a_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.tif");
    let rgb_f64 = OwnedArray::from_vec(2, 2, Some(3), vec![0.0f64; 12]).unwrap();
    let bridge = Bridge::default();
    let err = bridge
        .write_multipage(&[page(0), page(1), rgb_f64], &path, IoFlags::DEFAULT)
        .unwrap_err();
    assert!(matches!(err, BitmapError::UnsupportedFormat(_)), "{err}");
    assert!(!path.exists());
    assert!(bridge.engine().stats().is_idle());
}

#[cfg(feature = "tiff")]
#[test]
fn rejected_page_leaves_an_existing_file_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("keep.tif");
    write_multipage(&[page(9)], &path, IoFlags::DEFAULT).unwrap();
    let before = std::fs::read(&path).unwrap();

    let two_channel = OwnedArray::from_vec(1, 1, Some(2), vec![0u8; 2]).unwrap();
    let err = write_multipage(&[page(0), two_channel], &path, IoFlags::DEFAULT).unwrap_err();
    assert!(matches!(err, BitmapError::UnsupportedFormat(_)), "{err}");
    assert_eq!(std::fs::read(&path).unwrap(), before);
}
