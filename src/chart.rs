//! Chart data transformation: map worksheet records plus an axis
//! selection into a chart-library-agnostic label/series structure.

use crate::schema::{ChartData, ChartSpec, ChartType, DataSet, PointXYZ, Record, SeriesData};
use crate::workbook::fmt_f64;
use serde_json::Value;

/// Fallback palette for proportional charts created without colors.
const DEFAULT_PALETTE: [&str; 10] = [
    "#FF6384", "#36A2EB", "#FFCE56", "#4BC0C0", "#9966FF", "#FF9F40", "#C9CBCF", "#7ACB77",
    "#E7609E", "#5C6BC0",
];

/// How a chart request is transformed. Decided once per request; the
/// mapping from chart type to strategy stays exhaustive here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TransformStrategy {
    /// One scalar series over the X labels (bar, line, scatter, area, radar).
    Cartesian,
    /// Per-record {x, y, z} points; selected whenever a Z axis is present.
    ThreeDimensional,
    /// Group-by-X aggregation (pie, doughnut).
    Proportional,
}

impl TransformStrategy {
    fn select(chart_type: ChartType, has_z: bool) -> Self {
        if has_z {
            return Self::ThreeDimensional;
        }
        match chart_type {
            ChartType::Pie | ChartType::Doughnut => Self::Proportional,
            ChartType::Bar
            | ChartType::Line
            | ChartType::Area
            | ChartType::Scatter
            | ChartType::Radar => Self::Cartesian,
        }
    }
}

/// Transform records into chart data per the spec's chart type and axes.
pub fn build_chart_data(records: &[Record], spec: &ChartSpec) -> ChartData {
    match TransformStrategy::select(spec.chart_type, spec.z_axis.is_some()) {
        TransformStrategy::Cartesian => cartesian(records, spec),
        TransformStrategy::ThreeDimensional => three_dimensional(records, spec),
        TransformStrategy::Proportional => proportional(records, spec),
    }
}

fn cartesian(records: &[Record], spec: &ChartSpec) -> ChartData {
    let labels = records
        .iter()
        .map(|r| value_label(r.get(&spec.x_axis.column)))
        .collect();
    let values = records
        .iter()
        .map(|r| coerce_number(r.get(&spec.y_axis.column)))
        .collect();

    ChartData {
        labels,
        datasets: vec![DataSet {
            label: spec.y_axis.label.clone(),
            data: SeriesData::Values(values),
            background_color: spec.colors.clone(),
        }],
    }
}

fn three_dimensional(records: &[Record], spec: &ChartSpec) -> ChartData {
    // z_axis presence is what selected this strategy.
    let z_column = spec
        .z_axis
        .as_ref()
        .map(|z| z.column.as_str())
        .unwrap_or_default();

    let labels = records
        .iter()
        .map(|r| value_label(r.get(&spec.x_axis.column)))
        .collect();
    let points = records
        .iter()
        .enumerate()
        .map(|(idx, r)| PointXYZ {
            // Non-numeric X falls back to the record's position.
            x: numeric_value(r.get(&spec.x_axis.column)).unwrap_or(idx as f64),
            y: coerce_number(r.get(&spec.y_axis.column)),
            z: coerce_number(r.get(z_column)),
        })
        .collect();

    ChartData {
        labels,
        datasets: vec![DataSet {
            label: spec.y_axis.label.clone(),
            data: SeriesData::Points(points),
            background_color: spec.colors.clone(),
        }],
    }
}

fn proportional(records: &[Record], spec: &ChartSpec) -> ChartData {
    // Key -> running sum, in first-seen key order.
    let mut groups: Vec<(String, f64)> = Vec::new();
    for record in records {
        let key = value_label(record.get(&spec.x_axis.column));
        let y = coerce_number(record.get(&spec.y_axis.column));
        match groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, sum)) => *sum += y,
            None => groups.push((key, y)),
        }
    }

    let colors = if spec.colors.is_empty() {
        DEFAULT_PALETTE.iter().map(|c| c.to_string()).collect()
    } else {
        spec.colors.clone()
    };

    let (labels, sums): (Vec<String>, Vec<f64>) = groups.into_iter().unzip();
    ChartData {
        labels,
        datasets: vec![DataSet {
            label: spec.y_axis.label.clone(),
            data: SeriesData::Values(sums),
            background_color: colors,
        }],
    }
}

/// Coerce a field to f64. Non-numeric, missing, and null all read as
/// 0.0; NaN never escapes.
pub(crate) fn coerce_number(value: Option<&Value>) -> f64 {
    numeric_value(value).unwrap_or(0.0)
}

fn numeric_value(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

/// Render a field for use as a chart label or group key.
pub(crate) fn value_label(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => fmt_f64(n.as_f64().unwrap_or(0.0)),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}
