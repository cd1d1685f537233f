//! Fuzz target: `duration::parse`
//!
//! Feeds arbitrary text to the duration parser and asserts that it never
//! panics and that accepted unit strings stay consistent with their
//! floating-point spelling.
//!
//! cargo fuzz run fuzz_duration_parser

#![no_main]

use libfuzzer_sys::fuzz_target;
use relaynode::duration::parse;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = core::str::from_utf8(data) else {
        return;
    };

    let Ok(duration) = parse(text) else {
        return;
    };

    // Whole seconds written as units must match the bare spelling.
    if text.ends_with('s') && !text.contains(['h', 'm']) {
        let bare = &text[..text.len() - 1];
        if let Ok(plain) = parse(bare) {
            assert_eq!(plain, duration, "{:?} vs {:?}", text, bare);
        }
    }
});
