#![no_main]

use std::path::Path;

use firmcheck::manifest::parse_manifest;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Convert bytes to UTF-8 string (ignore invalid UTF-8)
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(parsed) = parse_manifest(s) {
            // Resolving paths must not panic either
            let _ = parsed.into_manifest(Path::new("/project"));
        }
    }
});
