use zendib::*;

fn tmp() -> tempfile::TempDir {
    tempfile::tempdir().unwrap()
}

/// 4x3 RGB checkerboard, stored as RGB.
fn checker_rgb8() -> OwnedArray {
    let (w, h) = (4, 3);
    let mut pixels = vec![0u8; w * h * 3];
    for y in 0..h {
        for x in 0..w {
            let off = (y * w + x) * 3;
            let px = if (x + y) % 2 == 0 { [255, 0, 128] } else { [0, 200, 50] };
            pixels[off..off + 3].copy_from_slice(&px);
        }
    }
    OwnedArray::from_vec(w, h, Some(3), pixels).unwrap()
}

fn ramp<T>(n: usize, f: impl Fn(usize) -> T) -> Vec<T> {
    (0..n).map(f).collect()
}

#[cfg(feature = "tiff")]
#[test]
fn tiff_rgb8_round_trip_keeps_channel_order() {
    let dir = tmp();
    let path = dir.path().join("image.tif");
    let pixels = ramp(4 * 3 * 3, |i| i as u8);
    let image = OwnedArray::from_vec(4, 3, Some(3), pixels).unwrap();

    write(&image, &path, IoFlags::DEFAULT).unwrap();
    let back = read(&path, IoFlags::DEFAULT).unwrap();
    assert_eq!(back.shape(), vec![4, 3, 3]);
    assert_eq!(back, image);
    // First pixel is (0, 1, 2), not swapped into BGR.
    assert_eq!(back.get::<u8>(0, 0, 0), Some(0));
    assert_eq!(back.get::<u8>(0, 0, 2), Some(2));
}

#[cfg(feature = "bmp")]
#[test]
fn bmp_rgb8_and_rgba8_round_trip() {
    let dir = tmp();
    let rgb = checker_rgb8();
    let path = dir.path().join("rgb.bmp");
    write(&rgb, &path, IoFlags::DEFAULT).unwrap();
    assert_eq!(read(&path, IoFlags::DEFAULT).unwrap(), rgb);

    let rgba = OwnedArray::from_vec(3, 2, Some(4), ramp(3 * 2 * 4, |i| (i * 9) as u8)).unwrap();
    let path = dir.path().join("rgba.bmp");
    write(&rgba, &path, IoFlags::DEFAULT).unwrap();
    assert_eq!(read(&path, IoFlags::DEFAULT).unwrap(), rgba);
}

#[cfg(feature = "bmp")]
#[test]
fn bmp_grey8_comes_back_two_dimensional() {
    let dir = tmp();
    let path = dir.path().join("grey.bmp");
    let grey = OwnedArray::from_vec(5, 3, None, ramp(15, |i| (i * 17) as u8)).unwrap();
    write(&grey, &path, IoFlags::DEFAULT).unwrap();
    let back = read(&path, IoFlags::DEFAULT).unwrap();
    assert_eq!(back.shape(), vec![5, 3]);
    assert_eq!(back, grey);
}

#[test]
fn pnm_eight_bit_round_trips() {
    let dir = tmp();
    let rgb = checker_rgb8();
    let grey = OwnedArray::from_vec(4, 2, None, ramp(8, |i| (i * 30) as u8)).unwrap();
    let rgba = OwnedArray::from_vec(2, 2, Some(4), vec![
        255u8, 0, 0, 255, //
        0, 255, 0, 128, //
        0, 0, 255, 0, //
        128, 128, 128, 255,
    ])
    .unwrap();

    for (name, image) in [("a.ppm", &rgb), ("b.pgm", &grey), ("c.pam", &rgba), ("d.pam", &rgb)] {
        let path = dir.path().join(name);
        write(image, &path, IoFlags::DEFAULT).unwrap();
        assert_eq!(&read(&path, IoFlags::DEFAULT).unwrap(), image, "{name}");
    }
}

#[test]
fn handwritten_pnm_files_decode_to_their_pixels() {
    let dir = tmp();
    let ppm = dir.path().join("hand.ppm");
    std::fs::write(&ppm, b"P6\n2 2\n255\n\x0a\x14\x1e\x28\x32\x3c\x46\x50\x5a\x64\x6e\x78").unwrap();
    let back = read(&ppm, IoFlags::DEFAULT).unwrap();
    assert_eq!(back.shape(), vec![2, 2, 3]);
    assert_eq!(back.as_slice::<u8>().unwrap(), &[10, 20, 30, 40, 50, 60, 70, 80, 90, 100, 110, 120]);
    assert_eq!(back.get::<u8>(1, 1, 0), Some(100));

    let pgm = dir.path().join("hand.pgm");
    std::fs::write(&pgm, b"P5 3 1 65535\n\x01\x02\x03\x04\xff\xfe").unwrap();
    let back = read(&pgm, IoFlags::DEFAULT).unwrap();
    assert_eq!(back.shape(), vec![3, 1]);
    assert_eq!(back.as_slice::<u16>().unwrap(), &[0x0102, 0x0304, 0xfffe]);
}

#[test]
fn pnm_sixteen_bit_round_trips() {
    let dir = tmp();
    let grey = OwnedArray::from_vec(3, 2, None, ramp(6, |i| (i as u16) * 10_000)).unwrap();
    let rgb = OwnedArray::from_vec(2, 2, Some(3), ramp(12, |i| 65_535 - i as u16 * 300)).unwrap();
    let rgba = OwnedArray::from_vec(2, 1, Some(4), vec![1u16, 2, 3, 4, 60_000, 50_000, 40_000, 0]).unwrap();

    for (name, image) in [("a.pgm", &grey), ("b.ppm", &rgb), ("c.pam", &rgba), ("d.pam", &grey)] {
        let path = dir.path().join(name);
        write(image, &path, IoFlags::DEFAULT).unwrap();
        let back = read(&path, IoFlags::DEFAULT).unwrap();
        assert_eq!(back.element_type(), ElementType::U16, "{name}");
        assert_eq!(&back, image, "{name}");
    }
}

#[test]
fn pfm_round_trips() {
    let dir = tmp();
    let grey = OwnedArray::from_vec(3, 2, None, vec![0.0f32, 0.25, 0.5, 1.0, -2.0, 1e6]).unwrap();
    let rgb = OwnedArray::from_vec(1, 2, Some(3), vec![0.1f32, 0.2, 0.3, 4.0, 5.0, 6.0]).unwrap();
    for (name, image) in [("g.pfm", &grey), ("c.pfm", &rgb)] {
        let path = dir.path().join(name);
        write(image, &path, IoFlags::DEFAULT).unwrap();
        assert_eq!(&read(&path, IoFlags::DEFAULT).unwrap(), image, "{name}");
    }
}

#[test]
fn farbfeld_round_trip() {
    let dir = tmp();
    let path = dir.path().join("image.ff");
    let image = OwnedArray::from_vec(2, 2, Some(4), ramp(16, |i| (i as u16) << 12)).unwrap();
    write(&image, &path, IoFlags::DEFAULT).unwrap();
    assert_eq!(read(&path, IoFlags::DEFAULT).unwrap(), image);
}

#[cfg(feature = "tiff")]
#[test]
fn tiff_stores_every_sample_type() {
    let dir = tmp();
    let images = [
        OwnedArray::from_vec(3, 2, None, ramp(6, |i| i as u16 * 1000)).unwrap(),
        OwnedArray::from_vec(3, 2, None, ramp(6, |i| i as i16 - 3)).unwrap(),
        OwnedArray::from_vec(3, 2, None, ramp(6, |i| i as u32 * 100_000)).unwrap(),
        OwnedArray::from_vec(3, 2, None, ramp(6, |i| i as i32 - 100_000)).unwrap(),
        OwnedArray::from_vec(3, 2, None, ramp(6, |i| i as f32 / 4.0)).unwrap(),
        OwnedArray::from_vec(3, 2, None, ramp(6, |i| i as f64 * -1.5)).unwrap(),
        OwnedArray::from_vec(3, 2, Some(3), ramp(18, |i| i as u16 * 3000)).unwrap(),
        OwnedArray::from_vec(3, 2, Some(4), ramp(24, |i| i as u16 * 2000)).unwrap(),
        OwnedArray::from_vec(3, 2, Some(3), ramp(18, |i| i as f32 * 0.5)).unwrap(),
        OwnedArray::from_vec(3, 2, Some(4), ramp(24, |i| i as f32 * -0.5)).unwrap(),
    ];
    for (i, image) in images.iter().enumerate() {
        let path = dir.path().join(format!("{i}.tiff"));
        write(image, &path, IoFlags::DEFAULT).unwrap();
        let back = read(&path, IoFlags::DEFAULT).unwrap();
        assert_eq!(&back, image, "{:?}", image.element_type());
    }
}

#[cfg(feature = "tiff")]
#[test]
fn tiff_complex_round_trip() {
    use num_complex::Complex;

    let dir = tmp();
    let values = ramp(4 * 3, |i| Complex::new(i as f64 * 0.25, -(i as f64) - 1.0));
    let image = OwnedArray::from_vec(4, 3, None, values).unwrap();
    for (name, flags) in [("plain.tif", IoFlags::TIFF_NONE), ("lzw.tif", IoFlags::DEFAULT)] {
        let path = dir.path().join(name);
        write(&image, &path, flags).unwrap();
        let back = read(&path, IoFlags::DEFAULT).unwrap();
        assert_eq!(back.element_type(), ElementType::Complex64, "{name}");
        assert_eq!(back, image, "{name}");
        assert_eq!(back.get::<Complex<f64>>(1, 2, 0), Some(Complex::new(2.25, -10.0)));
    }

    let path = dir.path().join("pages.tif");
    let pages = vec![checker_rgb8(), image];
    write_multipage(&pages, &path, IoFlags::DEFAULT).unwrap();
    assert_eq!(read_multipage(&path, IoFlags::DEFAULT).unwrap(), pages);
}

#[cfg(feature = "tiff")]
#[test]
fn tiff_compression_flags_all_decode() {
    let dir = tmp();
    let image = checker_rgb8();
    for (name, flags) in [
        ("none.tif", IoFlags::TIFF_NONE),
        ("lzw.tif", IoFlags::TIFF_LZW),
        ("packbits.tif", IoFlags::TIFF_PACKBITS),
    ] {
        let path = dir.path().join(name);
        write(&image, &path, flags).unwrap();
        assert_eq!(read(&path, IoFlags::DEFAULT).unwrap(), image, "{name}");
    }
}

#[cfg(feature = "qoi")]
#[test]
fn qoi_round_trip() {
    let dir = tmp();
    let path = dir.path().join("image.qoi");
    let image = checker_rgb8();
    write(&image, &path, IoFlags::DEFAULT).unwrap();
    assert_eq!(read(&path, IoFlags::DEFAULT).unwrap(), image);
}

#[test]
fn reading_sniffs_content_not_extension() {
    let dir = tmp();
    let written = dir.path().join("image.ppm");
    let image = checker_rgb8();
    write(&image, &written, IoFlags::DEFAULT).unwrap();

    let misnamed = dir.path().join("image.dat");
    std::fs::rename(&written, &misnamed).unwrap();
    assert_eq!(read(&misnamed, IoFlags::DEFAULT).unwrap(), image);
}

#[cfg(feature = "tiff")]
#[test]
fn write_into_bridge_with_own_engine() {
    let dir = tmp();
    let path = dir.path().join("own.tif");
    let bridge = Bridge::new(DibEngine::new());
    let image = OwnedArray::from_shape(&[2, 2, 4], ramp(16, |i| i as u8)).unwrap();
    bridge.write(&image, &path, IoFlags::DEFAULT).unwrap();
    assert_eq!(bridge.read(&path, IoFlags::DEFAULT).unwrap(), image);
    assert!(bridge.engine().stats().is_idle());
}
