#![no_main]
use libfuzzer_sys::fuzz_target;
use zendib::{DibEngine, Engine, FileType, IoFlags, Limits};

fuzz_target!(|data: &[u8]| {
    let engine = DibEngine::with_limits(Limits {
        max_pixels: Some(1 << 24),
        ..Limits::default()
    });

    // Sniffed format, full and header-only: must never panic
    if let Some(ft) = DibEngine::sniff_bytes(data) {
        for flags in [IoFlags::DEFAULT, IoFlags::LOAD_NOPIXELS] {
            if let Some(bitmap) = engine.load_from_memory(ft, data, flags) {
                engine.unload(bitmap);
            }
        }
    }

    // Every decoder on foreign input: must never panic
    for ft in FileType::ALL {
        if let Some(bitmap) = engine.load_from_memory(ft, data, IoFlags::DEFAULT) {
            engine.unload(bitmap);
        }
    }
    assert!(engine.stats().is_idle());
});
