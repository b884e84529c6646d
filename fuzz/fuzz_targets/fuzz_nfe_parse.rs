#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Errors are fine, panics are bugs.
    let _ = nfe_rtc::nfe::from_nfe_xml(data);
});
