//! xlsx encoding of rendered tables.

use rust_xlsxwriter::{Format, Workbook};

use super::SheetTable;
use crate::error::{Error, Result};

/// Name of the single worksheet in every artifact.
pub const SHEET_NAME: &str = "Issues";

/// Encodes a table as a single-sheet workbook.
///
/// Layout: bold header row, one row per record, a blank row, then the
/// footer as bold label / value pairs in the first two columns.
///
/// # Errors
///
/// Returns [`Error::Workbook`] if the table exceeds worksheet limits or the
/// workbook cannot be written.
pub fn encode_sheet(table: &SheetTable) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    for (col, name) in table.header.iter().enumerate() {
        sheet.write_string_with_format(0, col_num(col)?, name, &bold)?;
    }
    sheet.set_freeze_panes(1, 0)?;

    for (i, row) in table.rows.iter().enumerate() {
        let r = row_num(i + 1)?;
        for (col, value) in row.iter().enumerate() {
            if !value.is_empty() {
                sheet.write_string(r, col_num(col)?, value)?;
            }
        }
    }

    let footer_start = table.rows.len() + 2;
    for (i, (label, value)) in table.footer.iter().enumerate() {
        let r = row_num(footer_start + i)?;
        sheet.write_string_with_format(r, 0, label, &bold)?;
        sheet.write_string(r, 1, value)?;
    }

    Ok(workbook.save_to_buffer()?)
}

fn row_num(row: usize) -> Result<u32> {
    u32::try_from(row).map_err(|_| Error::Workbook(format!("row {row} exceeds sheet limits")))
}

fn col_num(col: usize) -> Result<u16> {
    u16::try_from(col).map_err(|_| Error::Workbook(format!("column {col} exceeds sheet limits")))
}

#[cfg(test)]
mod tests {
    use calamine::{Data, Reader, Xlsx};

    use super::*;

    fn table() -> SheetTable {
        SheetTable {
            header: vec!["ProgramLaunchName".into(), "School UDISE".into(), "Issues".into()],
            rows: vec![
                vec!["A".into(), String::new(), "MISSING_UDISE".into()],
                vec!["B".into(), String::new(), "MISSING_UDISE".into()],
            ],
            footer: vec![
                ("Generated at".into(), "2024-05-01 09:30:00".into()),
                ("Version".into(), "cprf-audit 0.3.1 (run #2)".into()),
            ],
        }
    }

    #[test]
    fn test_encode_reads_back() {
        let bytes = encode_sheet(&table()).unwrap();
        let mut workbook = Xlsx::new(std::io::Cursor::new(bytes)).unwrap();
        let range = workbook.worksheet_range(SHEET_NAME).unwrap();

        assert_eq!(range.get_value((0, 0)), Some(&Data::String("ProgramLaunchName".into())));
        assert_eq!(range.get_value((1, 0)), Some(&Data::String("A".into())));
        assert_eq!(range.get_value((2, 2)), Some(&Data::String("MISSING_UDISE".into())));
        assert_eq!(range.get_value((4, 0)), Some(&Data::String("Generated at".into())));
        assert_eq!(
            range.get_value((5, 1)),
            Some(&Data::String("cprf-audit 0.3.1 (run #2)".into()))
        );
    }

    #[test]
    fn test_row_and_column_limits() {
        assert!(row_num(usize::MAX).is_err());
        assert!(col_num(70_000).is_err());
        assert_eq!(col_num(3).unwrap(), 3);
    }
}
