//! Descriptive statistics over a chart's chosen numeric column:
//! a summary sentence, a coarse trend classification, and outlier flags.

use crate::chart::{coerce_number, value_label};
use crate::schema::{AxisSelection, Insights, Record};
use crate::workbook::fmt_f64;

/// Generate insights for a non-empty record set. Callers validate
/// non-emptiness (`EmptyDataset`) before invoking.
pub fn generate_insights(records: &[Record], x_axis: &AxisSelection, y_axis: &AxisSelection) -> Insights {
    let values: Vec<f64> = records
        .iter()
        .map(|r| coerce_number(r.get(&y_axis.column)))
        .collect();

    let count = values.len();
    let mean = values.iter().sum::<f64>() / count as f64;
    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

    let summary = format!(
        "{} records analyzed. {} ranges from {:.2} to {:.2} with an average of {:.2}.",
        count, y_axis.label, min, max, mean
    );

    Insights {
        summary,
        trends: classify_trend(&values, y_axis),
        outliers: flag_outliers(records, &values, mean, x_axis),
        correlations: Vec::new(),
        ai_generated: false,
    }
}

/// Compare the mean of the second half against the first (floor-midpoint
/// split). More than 10% above reads upward, more than 10% below reads
/// downward, anything else stable. Fewer than 2 records yields nothing.
fn classify_trend(values: &[f64], y_axis: &AxisSelection) -> Vec<String> {
    if values.len() < 2 {
        return Vec::new();
    }

    let mid = values.len() / 2;
    let first_mean = values[..mid].iter().sum::<f64>() / mid as f64;
    let second_mean = values[mid..].iter().sum::<f64>() / (values.len() - mid) as f64;

    let direction = if second_mean > first_mean * 1.1 {
        "upward"
    } else if second_mean < first_mean * 0.9 {
        "downward"
    } else {
        "stable"
    };

    vec![format!("{} shows a {} trend", y_axis.label, direction)]
}

/// Flag records deviating from the mean by at least two population
/// standard deviations, rendered `"<X>: <Y>"` in record order. A zero
/// deviation (constant or single-value data) flags nothing.
fn flag_outliers(
    records: &[Record],
    values: &[f64],
    mean: f64,
    x_axis: &AxisSelection,
) -> Vec<String> {
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    let std_dev = variance.sqrt();
    if std_dev <= 0.0 {
        return Vec::new();
    }

    records
        .iter()
        .zip(values)
        .filter(|(_, v)| (*v - mean).abs() >= 2.0 * std_dev)
        .map(|(record, v)| {
            format!(
                "{}: {}",
                value_label(record.get(&x_axis.column)),
                fmt_f64(*v)
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn axis(name: &str) -> AxisSelection {
        AxisSelection {
            column: name.to_string(),
            label: name.to_string(),
        }
    }

    fn records_from(values: &[f64]) -> Vec<Record> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let mut r = Record::new();
                r.insert("Label".to_string(), json!(format!("row{}", i + 1)));
                r.insert("Value".to_string(), json!(v));
                r
            })
            .collect()
    }

    fn insights_for(values: &[f64]) -> Insights {
        generate_insights(&records_from(values), &axis("Label"), &axis("Value"))
    }

    #[test]
    fn summary_reports_rounded_statistics() {
        let insights = insights_for(&[1.0, 2.0, 3.0]);
        assert_eq!(
            insights.summary,
            "3 records analyzed. Value ranges from 1.00 to 3.00 with an average of 2.00."
        );
        assert!(!insights.ai_generated);
        assert!(insights.correlations.is_empty());
    }

    #[test]
    fn trend_classification() {
        assert!(insights_for(&[10.0, 10.0, 10.0, 10.0]).trends[0].contains("stable"));
        assert!(insights_for(&[1.0, 1.0, 9.0, 9.0]).trends[0].contains("upward"));
        assert!(insights_for(&[9.0, 9.0, 1.0, 1.0]).trends[0].contains("downward"));
    }

    #[test]
    fn single_record_has_no_trend_or_outliers() {
        let insights = insights_for(&[42.0]);
        assert!(insights.trends.is_empty());
        assert!(insights.outliers.is_empty());
        assert!(insights.summary.starts_with("1 records analyzed."));
    }

    #[test]
    fn extreme_value_is_flagged() {
        let insights = insights_for(&[1.0, 1.0, 1.0, 1.0, 100.0]);
        assert_eq!(insights.outliers, vec!["row5: 100"]);
    }

    #[test]
    fn gradual_series_has_no_outliers() {
        let insights = insights_for(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert!(insights.outliers.is_empty());
    }

    #[test]
    fn constant_series_flags_nothing() {
        let insights = insights_for(&[5.0, 5.0, 5.0]);
        assert!(insights.outliers.is_empty());
    }

    #[test]
    fn non_numeric_values_coerce_to_zero_in_summary() {
        let mut records = records_from(&[10.0]);
        records[0].insert("Value".to_string(), json!("not a number"));
        let insights = generate_insights(&records, &axis("Label"), &axis("Value"));
        assert!(insights.summary.contains("0.00"));
    }
}
