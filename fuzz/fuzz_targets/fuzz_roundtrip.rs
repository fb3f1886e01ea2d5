#![no_main]
use libfuzzer_sys::fuzz_target;
use zendib::{DibEngine, Engine, FileType, IoFlags, Limits};

fuzz_target!(|data: &[u8]| {
    // If we can decode it, re-encoding and decoding again must produce identical pixels
    let engine = DibEngine::with_limits(Limits {
        max_pixels: Some(1 << 22),
        ..Limits::default()
    });
    let Some(ft) = DibEngine::sniff_bytes(data) else {
        return;
    };
    let Some(decoded) = engine.load_from_memory(ft, data, IoFlags::DEFAULT) else {
        return;
    };

    // TIFF saves 8 bpp pages as grey, so colour-mapped pages change on re-encode
    let comparable = ft != FileType::Tiff || decoded.bpp() > 8;

    if let Some(reencoded) = engine.save_to_memory(ft, &decoded, IoFlags::DEFAULT) {
        let Some(decoded2) = engine.load_from_memory(ft, &reencoded, IoFlags::DEFAULT) else {
            panic!("re-encoded data failed to decode");
        };
        assert_eq!(decoded.width(), decoded2.width());
        assert_eq!(decoded.height(), decoded2.height());
        assert_eq!(decoded.pixel_type(), decoded2.pixel_type());
        if comparable {
            assert_eq!(decoded.bits(), decoded2.bits(), "roundtrip pixel mismatch");
        }
        engine.unload(decoded2);
    }
    engine.unload(decoded);
});
