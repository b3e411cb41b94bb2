//! Worksheet row materialization: turn a cell range into field-keyed
//! records for on-demand slicing and chart derivation.
//!
//! Column names come from the same range-based header derivation the
//! parser uses, so the summary view and the read view always agree.
//! The one deliberate difference: an empty sheet summarizes as a 1x1
//! placeholder but reads back as zero records and zero columns.

use crate::schema::Record;
use crate::workbook::{cell_to_value, header_columns};
use calamine::{Data, Range};

/// Materialize the data rows of a range as records, plus the column
/// list. Rows that are entirely empty are skipped.
pub fn worksheet_records(range: &Range<Data>) -> (Vec<Record>, Vec<String>) {
    if range.is_empty() {
        return (Vec::new(), Vec::new());
    }

    let columns = header_columns(range);
    let mut records = Vec::new();

    for row in range.rows().skip(1) {
        if row.iter().all(|c| matches!(c, Data::Empty)) {
            continue;
        }
        let mut record = Record::new();
        for (idx, column) in columns.iter().enumerate() {
            let value = row
                .get(idx)
                .map(cell_to_value)
                .unwrap_or(serde_json::Value::Null);
            record.insert(column.clone(), value);
        }
        records.push(record);
    }

    (records, columns)
}
