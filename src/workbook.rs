//! Workbook parsing: decode uploaded spreadsheet bytes into worksheet
//! summaries and cell ranges via calamine.
//!
//! Parsing is all-or-nothing per workbook: if any sheet fails to
//! extract, the whole parse fails with `MalformedWorkbook` and nothing
//! is reported.

use crate::error::PipelineError;
use crate::schema::{SpreadsheetKind, WorksheetSummary};
use calamine::{open_workbook_from_rs, Data, Range, Reader, Xls, Xlsx};
use std::io::{Cursor, Read, Seek};
use tracing::debug;

/// Parse raw bytes into summaries for every sheet, in file order.
pub fn parse_workbook(
    data: &[u8],
    kind: SpreadsheetKind,
) -> Result<Vec<WorksheetSummary>, PipelineError> {
    let ranges = workbook_ranges(data, kind)?;
    if ranges.is_empty() {
        return Err(PipelineError::MalformedWorkbook(
            "workbook contains no worksheets".to_string(),
        ));
    }

    let summaries = ranges
        .iter()
        .map(|(name, range)| range_summary(name, range))
        .collect::<Vec<_>>();

    debug!(
        "Parsed workbook: {} sheet(s), {} total rows",
        summaries.len(),
        summaries.iter().map(|s| s.row_count).sum::<usize>()
    );
    Ok(summaries)
}

/// Extract the occupied cell range of a single named sheet.
pub fn sheet_range(
    data: &[u8],
    kind: SpreadsheetKind,
    worksheet: &str,
) -> Result<Range<Data>, PipelineError> {
    let cursor = Cursor::new(data);
    match kind {
        SpreadsheetKind::Xlsx => {
            let workbook: Xlsx<Cursor<&[u8]>> = open_workbook_from_rs(cursor)
                .map_err(|e: calamine::XlsxError| PipelineError::MalformedWorkbook(e.to_string()))?;
            single_range(workbook, worksheet)
        }
        SpreadsheetKind::Xls => {
            let workbook: Xls<Cursor<&[u8]>> = open_workbook_from_rs(cursor)
                .map_err(|e: calamine::XlsError| PipelineError::MalformedWorkbook(e.to_string()))?;
            single_range(workbook, worksheet)
        }
    }
}

/// Extract every sheet's range, in file order.
fn workbook_ranges(
    data: &[u8],
    kind: SpreadsheetKind,
) -> Result<Vec<(String, Range<Data>)>, PipelineError> {
    let cursor = Cursor::new(data);
    match kind {
        SpreadsheetKind::Xlsx => {
            let workbook: Xlsx<Cursor<&[u8]>> = open_workbook_from_rs(cursor)
                .map_err(|e: calamine::XlsxError| PipelineError::MalformedWorkbook(e.to_string()))?;
            all_ranges(workbook)
        }
        SpreadsheetKind::Xls => {
            let workbook: Xls<Cursor<&[u8]>> = open_workbook_from_rs(cursor)
                .map_err(|e: calamine::XlsError| PipelineError::MalformedWorkbook(e.to_string()))?;
            all_ranges(workbook)
        }
    }
}

fn all_ranges<RS, R>(mut workbook: R) -> Result<Vec<(String, Range<Data>)>, PipelineError>
where
    RS: Read + Seek,
    R: Reader<RS>,
    R::Error: std::fmt::Display,
{
    let names = workbook.sheet_names().to_vec();
    let mut ranges = Vec::with_capacity(names.len());
    for name in names {
        let range = workbook.worksheet_range(&name).map_err(|e| {
            PipelineError::MalformedWorkbook(format!("sheet '{}': {}", name, e))
        })?;
        ranges.push((name, range));
    }
    Ok(ranges)
}

fn single_range<RS, R>(mut workbook: R, worksheet: &str) -> Result<Range<Data>, PipelineError>
where
    RS: Read + Seek,
    R: Reader<RS>,
    R::Error: std::fmt::Display,
{
    if !workbook.sheet_names().iter().any(|n| n == worksheet) {
        return Err(PipelineError::WorksheetNotFound(worksheet.to_string()));
    }
    workbook
        .worksheet_range(worksheet)
        .map_err(|e| PipelineError::MalformedWorkbook(format!("sheet '{}': {}", worksheet, e)))
}

/// Summarize a sheet from its occupied range bounds. An empty sheet is
/// treated as a single cell; counts never depend on which cells within
/// the bounding rectangle hold values.
fn range_summary(name: &str, range: &Range<Data>) -> WorksheetSummary {
    if range.is_empty() {
        return WorksheetSummary {
            name: name.to_string(),
            row_count: 1,
            column_count: 1,
            columns: vec!["Column 1".to_string()],
        };
    }

    let (row_count, column_count) = range.get_size();
    WorksheetSummary {
        name: name.to_string(),
        row_count,
        column_count,
        columns: header_columns(range),
    }
}

/// Header list from the first row of an occupied range: cell value when
/// present, `Column N` placeholder (1-based position) otherwise.
pub(crate) fn header_columns(range: &Range<Data>) -> Vec<String> {
    let (_, column_count) = range.get_size();
    let header_row = range.rows().next();

    (0..column_count)
        .map(|idx| {
            let header = header_row
                .and_then(|row| row.get(idx))
                .map(cell_to_string)
                .unwrap_or_default();
            if header.is_empty() {
                format!("Column {}", idx + 1)
            } else {
                header
            }
        })
        .collect()
}

/// Lossless-ish JSON view of a cell: numbers stay numbers, text stays
/// text, dates render as ISO strings, error cells read as null.
pub(crate) fn cell_to_value(cell: &Data) -> serde_json::Value {
    use serde_json::Value;
    match cell {
        Data::Empty | Data::Error(_) => Value::Null,
        Data::String(s) => Value::String(s.clone()),
        Data::Int(i) => Value::from(*i),
        Data::Float(f) => serde_json::Number::from_f64(*f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Data::Bool(b) => Value::Bool(*b),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(naive) => Value::String(naive.to_string()),
            None => serde_json::Number::from_f64(dt.as_f64())
                .map(Value::Number)
                .unwrap_or(Value::Null),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => Value::String(s.clone()),
    }
}

/// Display rendering of a cell, used for header names.
pub(crate) fn cell_to_string(cell: &Data) -> String {
    match cell_to_value(cell) {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => fmt_f64(n.as_f64().unwrap_or(0.0)),
        serde_json::Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

/// Format a float without a trailing `.0` when it holds a whole number.
pub(crate) fn fmt_f64(f: f64) -> String {
    if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
        format!("{}", f as i64)
    } else {
        f.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{build_xlsx, Cell};

    #[test]
    fn summaries_cover_every_sheet() {
        let bytes = build_xlsx(&[
            (
                "Sales",
                vec![
                    vec![Cell::str("Region"), Cell::str("Revenue")],
                    vec![Cell::str("East"), Cell::num(100.0)],
                    vec![Cell::str("West"), Cell::num(200.0)],
                ],
            ),
            ("Notes", vec![vec![Cell::str("Comment")]]),
        ]);

        let sheets = parse_workbook(&bytes, SpreadsheetKind::Xlsx).unwrap();
        assert_eq!(sheets.len(), 2);
        assert_eq!(sheets[0].name, "Sales");
        assert_eq!(sheets[0].row_count, 3);
        assert_eq!(sheets[0].column_count, 2);
        assert_eq!(sheets[0].columns, vec!["Region", "Revenue"]);
        assert_eq!(sheets[0].columns.len(), sheets[0].column_count);
        assert_eq!(sheets[1].columns.len(), sheets[1].column_count);
    }

    #[test]
    fn empty_sheet_reports_single_synthesized_column() {
        let bytes = build_xlsx(&[("Blank", vec![])]);
        let sheets = parse_workbook(&bytes, SpreadsheetKind::Xlsx).unwrap();
        assert_eq!(sheets[0].row_count, 1);
        assert_eq!(sheets[0].column_count, 1);
        assert_eq!(sheets[0].columns, vec!["Column 1"]);
    }

    #[test]
    fn blank_header_cells_get_placeholders() {
        let bytes = build_xlsx(&[(
            "Data",
            vec![
                vec![Cell::str("Name"), Cell::Empty, Cell::str("Score")],
                vec![Cell::str("a"), Cell::num(1.0), Cell::num(2.0)],
            ],
        )]);

        let sheets = parse_workbook(&bytes, SpreadsheetKind::Xlsx).unwrap();
        assert_eq!(sheets[0].columns, vec!["Name", "Column 2", "Score"]);
    }

    #[test]
    fn counts_come_from_bounding_rectangle() {
        // Scattered data: only two cells occupied, far apart.
        let bytes = build_xlsx(&[(
            "Sparse",
            vec![
                vec![Cell::str("a")],
                vec![],
                vec![
                    Cell::Empty,
                    Cell::Empty,
                    Cell::Empty,
                    Cell::num(9.0),
                ],
            ],
        )]);

        let sheets = parse_workbook(&bytes, SpreadsheetKind::Xlsx).unwrap();
        assert_eq!(sheets[0].row_count, 3);
        assert_eq!(sheets[0].column_count, 4);
    }

    #[test]
    fn garbage_bytes_are_malformed() {
        let err = parse_workbook(b"definitely not a workbook", SpreadsheetKind::Xlsx)
            .unwrap_err();
        assert!(matches!(err, PipelineError::MalformedWorkbook(_)));
    }

    #[test]
    fn missing_sheet_is_not_found() {
        let bytes = build_xlsx(&[("Sales", vec![vec![Cell::str("x")]])]);
        let err = sheet_range(&bytes, SpreadsheetKind::Xlsx, "Nope").unwrap_err();
        assert!(matches!(err, PipelineError::WorksheetNotFound(name) if name == "Nope"));
    }

    #[test]
    fn float_formatting_trims_whole_numbers() {
        assert_eq!(fmt_f64(100.0), "100");
        assert_eq!(fmt_f64(2.5), "2.5");
        assert_eq!(fmt_f64(-3.0), "-3");
    }
}
