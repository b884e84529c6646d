//! Check one NF-e XML file and write the two report sheets next to it.
//!
//! `cargo run --example check_file -- nota.xml`

use std::path::PathBuf;

use nfe_rtc::core::ValidationConfig;
use nfe_rtc::export::{CsvSheets, export_bundle};
use nfe_rtc::nfe;

fn main() {
    let Some(path) = std::env::args().nth(1).map(PathBuf::from) else {
        eprintln!("usage: check_file <nfe.xml>");
        std::process::exit(2);
    };

    let xml = std::fs::read(&path).expect("readable input file");
    let report = match nfe::check_nfe_xml(&xml, &ValidationConfig::pilot_2026()) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("{}: {e}", path.display());
            std::process::exit(1);
        }
    };

    for result in &report.checklist {
        println!("{} {result}", result.status.symbol());
    }

    let counts = report.status_counts();
    println!(
        "\n{} pass, {} warning, {} fail",
        counts.pass, counts.warning, counts.fail
    );

    let mut sink = CsvSheets::new();
    export_bundle(&report, &mut sink).expect("sheets render");
    let dir = path.with_extension("report");
    for written in sink.write_to_dir(&dir).expect("writable output directory") {
        println!("wrote {}", written.display());
    }
}
