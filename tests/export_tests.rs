//! Export tests: summary and checklist sheets, JSON bundle.
//!
//! Run with: `cargo test --test export_tests`

#![cfg(feature = "export")]

mod common;

use common::*;
use nfe_rtc::core::report::{CHECKLIST_COLUMNS, CHECKLIST_SHEET, SUMMARY_COLUMNS, SUMMARY_SHEET};
use nfe_rtc::core::*;
use nfe_rtc::export::{CsvSheets, SheetSink, export_bundle, to_json};
use rust_decimal_macros::dec;

fn bundle() -> ReportBundle {
    check_invoice(&pilot_invoice(), &ValidationConfig::default())
}

/// Sink that only records what it was given.
#[derive(Default)]
struct Recorder {
    sheets: Vec<(String, Vec<String>, usize)>,
}

impl SheetSink for Recorder {
    fn write_sheet(
        &mut self,
        name: &str,
        columns: &[&str],
        rows: &[Vec<Cell>],
    ) -> Result<(), RtcError> {
        for row in rows {
            assert_eq!(row.len(), columns.len(), "ragged row in {name}");
        }
        self.sheets.push((
            name.to_string(),
            columns.iter().map(|c| c.to_string()).collect(),
            rows.len(),
        ));
        Ok(())
    }
}

#[test]
fn bundle_exports_summary_then_checklist() {
    let b = bundle();
    let mut sink = Recorder::default();
    export_bundle(&b, &mut sink).unwrap();

    assert_eq!(sink.sheets.len(), 2);
    let (name, columns, rows) = &sink.sheets[0];
    assert_eq!(name, SUMMARY_SHEET);
    assert_eq!(columns.len(), SUMMARY_COLUMNS.len());
    // one row per item plus TOTAL
    assert_eq!(*rows, 3);

    let (name, columns, rows) = &sink.sheets[1];
    assert_eq!(name, CHECKLIST_SHEET);
    assert_eq!(columns.len(), CHECKLIST_COLUMNS.len());
    assert_eq!(*rows, b.checklist.len());
}

#[test]
fn csv_sheets_use_pt_br_conventions() {
    let mut sink = CsvSheets::new();
    export_bundle(&bundle(), &mut sink).unwrap();

    let summary = sink.sheet(SUMMARY_SHEET).unwrap();
    let mut lines = summary.lines();
    let header = lines.next().unwrap();
    assert_eq!(header.split(';').count(), SUMMARY_COLUMNS.len());
    assert!(summary.contains("1000,00"), "{summary}");
    let last = summary.lines().last().unwrap();
    assert!(last.contains("TOTAL"), "{last}");
    assert!(last.contains("1250,00"), "{last}");

    let checklist = sink.sheet(CHECKLIST_SHEET).unwrap();
    assert!(checklist.starts_with("Grupo;"));
    assert!(checklist.contains("Item 1"));
    assert!(checklist.contains("Totais"));
    assert!(checklist.contains("✅"));
}

#[test]
fn csv_sheets_written_to_directory() {
    let dir = std::env::temp_dir().join(format!("nfe-rtc-export-{}", std::process::id()));
    let mut sink = CsvSheets::new();
    export_bundle(&bundle(), &mut sink).unwrap();
    let paths = sink.write_to_dir(&dir).unwrap();

    assert_eq!(paths.len(), 2);
    assert!(paths[0].ends_with("QuadroResumo.csv"));
    assert!(paths[1].ends_with("Checklist.csv"));
    let on_disk = std::fs::read_to_string(&paths[1]).unwrap();
    assert_eq!(on_disk, sink.sheet(CHECKLIST_SHEET).unwrap());

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn failed_check_shows_expected_and_found_in_checklist() {
    let mut inv = pilot_invoice();
    inv.totals.ibs = Some(dec!(2.00));
    let b = check_invoice(&inv, &ValidationConfig::default());
    let mut sink = CsvSheets::new();
    export_bundle(&b, &mut sink).unwrap();

    let row = sink
        .sheet(CHECKLIST_SHEET)
        .unwrap()
        .lines()
        .find(|l| l.contains("ibs-total"))
        .unwrap()
        .to_string();
    let cells: Vec<&str> = row.split(';').collect();
    assert_eq!(cells[4], "❌");
    assert_eq!(cells[5], "2,00");
    assert_eq!(cells[6], "1,25");
}

#[test]
fn plain_sheets_keep_decimal_point_in_checklist() {
    let mut inv = pilot_invoice();
    inv.totals.ibs = Some(dec!(2));
    let b = check_invoice(&inv, &ValidationConfig::default());
    let mut sink = CsvSheets::plain();
    export_bundle(&b, &mut sink).unwrap();

    let checklist = sink.sheet(CHECKLIST_SHEET).unwrap();
    let row = checklist.lines().find(|l| l.starts_with("Totais,ibs-total")).unwrap();
    assert!(row.contains(",2.00,1.25,"), "{row}");
}

#[test]
fn json_bundle_round_trips() {
    let b = bundle();
    let json = to_json(&b).unwrap();
    assert!(json.contains("\"checklist\""));
    assert!(json.contains("\"check\": \"ibs-total\""), "{json}");
    assert!(!json.contains("IbsTotal"));

    let back: ReportBundle = serde_json::from_str(&json).unwrap();
    assert_eq!(back, b);
}
