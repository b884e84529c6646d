//! Spreadsheet and JSON export of a [`ReportBundle`].
//!
//! Tables are handed to a [`SheetSink`] one sheet at a time. [`CsvSheets`]
//! renders each sheet as a semicolon-separated CSV with decimal commas, the
//! format spreadsheet tools open directly under a pt-BR locale.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::core::{Cell, ReportBundle, RtcError};

/// Destination for named tables.
pub trait SheetSink {
    fn write_sheet(&mut self, name: &str, columns: &[&str], rows: &[Vec<Cell>])
    -> Result<(), RtcError>;
}

/// Write the summary sheet (with its TOTAL line) and the checklist sheet.
pub fn export_bundle<S: SheetSink + ?Sized>(
    bundle: &ReportBundle,
    sink: &mut S,
) -> Result<(), RtcError> {
    for table in [bundle.summary_table(), bundle.checklist_table()] {
        sink.write_sheet(table.name, table.columns, &table.rows)?;
        debug!(sheet = table.name, rows = table.rows.len(), "sheet exported");
    }
    Ok(())
}

/// Serialize the whole bundle as pretty-printed JSON.
pub fn to_json(bundle: &ReportBundle) -> Result<String, RtcError> {
    serde_json::to_string_pretty(bundle).map_err(|e| RtcError::Export(e.to_string()))
}

/// One rendered CSV sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvSheet {
    pub name: String,
    pub content: String,
}

/// In-memory CSV sink: one document per sheet.
#[derive(Debug, Clone)]
pub struct CsvSheets {
    delimiter: u8,
    decimal_comma: bool,
    sheets: Vec<CsvSheet>,
}

impl Default for CsvSheets {
    fn default() -> Self {
        Self::new()
    }
}

impl CsvSheets {
    /// Semicolon separator, decimal comma.
    pub fn new() -> Self {
        Self {
            delimiter: b';',
            decimal_comma: true,
            sheets: Vec::new(),
        }
    }

    /// Comma separator, decimal point.
    pub fn plain() -> Self {
        Self {
            delimiter: b',',
            decimal_comma: false,
            sheets: Vec::new(),
        }
    }

    pub fn sheets(&self) -> &[CsvSheet] {
        &self.sheets
    }

    pub fn sheet(&self, name: &str) -> Option<&str> {
        self.sheets
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.content.as_str())
    }

    /// Write every sheet to `<dir>/<name>.csv`, creating `dir` if needed.
    pub fn write_to_dir(&self, dir: &Path) -> Result<Vec<PathBuf>, RtcError> {
        std::fs::create_dir_all(dir)
            .map_err(|e| RtcError::Export(format!("{}: {e}", dir.display())))?;
        let mut written = Vec::with_capacity(self.sheets.len());
        for sheet in &self.sheets {
            let path = dir.join(format!("{}.csv", sheet.name));
            std::fs::write(&path, &sheet.content)
                .map_err(|e| RtcError::Export(format!("{}: {e}", path.display())))?;
            written.push(path);
        }
        Ok(written)
    }

    fn render(&self, cell: &Cell) -> String {
        match cell {
            Cell::Amount(d) if self.decimal_comma => d.to_string().replace('.', ","),
            other => other.to_string(),
        }
    }
}

impl SheetSink for CsvSheets {
    fn write_sheet(
        &mut self,
        name: &str,
        columns: &[&str],
        rows: &[Vec<Cell>],
    ) -> Result<(), RtcError> {
        let mut wtr = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .from_writer(vec![]);

        wtr.write_record(columns).map_err(csv_error)?;
        for row in rows {
            let record: Vec<String> = row.iter().map(|c| self.render(c)).collect();
            wtr.write_record(&record).map_err(csv_error)?;
        }

        let bytes = wtr
            .into_inner()
            .map_err(|e| RtcError::Export(e.to_string()))?;
        let content = String::from_utf8(bytes).map_err(|e| RtcError::Export(e.to_string()))?;

        self.sheets.retain(|s| s.name != name);
        self.sheets.push(CsvSheet {
            name: name.to_string(),
            content,
        });
        Ok(())
    }
}

fn csv_error(e: csv::Error) -> RtcError {
    RtcError::Export(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn csv_uses_semicolon_and_decimal_comma() {
        let mut sink = CsvSheets::new();
        sink.write_sheet(
            "S",
            &["Item", "Valor", "Texto"],
            &[vec![
                Cell::Integer(1),
                Cell::Amount(dec!(1234.50)),
                Cell::Text("a;b".into()),
            ]],
        )
        .unwrap();
        assert_eq!(
            sink.sheet("S").unwrap(),
            "Item;Valor;Texto\n1;1234,50;\"a;b\"\n"
        );
    }

    #[test]
    fn plain_csv_keeps_decimal_point() {
        let mut sink = CsvSheets::plain();
        sink.write_sheet("S", &["V", "W"], &[vec![Cell::Amount(dec!(0.10)), Cell::Empty]])
            .unwrap();
        assert_eq!(sink.sheet("S").unwrap(), "V,W\n0.10,\n");
    }

    #[test]
    fn rewriting_a_sheet_replaces_it() {
        let mut sink = CsvSheets::new();
        sink.write_sheet("S", &["A"], &[]).unwrap();
        sink.write_sheet("S", &["B"], &[]).unwrap();
        assert_eq!(sink.sheets().len(), 1);
        assert_eq!(sink.sheet("S").unwrap(), "B\n");
    }
}
