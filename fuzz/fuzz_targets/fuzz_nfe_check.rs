#![no_main]

use libfuzzer_sys::fuzz_target;
use nfe_rtc::core::ValidationConfig;

fuzz_target!(|data: &[u8]| {
    let config = ValidationConfig::pilot_2026();
    if let Ok(report) = nfe_rtc::nfe::check_nfe_xml(data, &config) {
        let mut sink = nfe_rtc::export::CsvSheets::new();
        let _ = nfe_rtc::export::export_bundle(&report, &mut sink);
    }
});
