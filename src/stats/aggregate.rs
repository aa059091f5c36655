//! Group-by aggregation over loaded tables.

use crate::data::loader::is_numeric_dtype;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const VALUE_COL: &str = "__value";

#[derive(Error, Debug)]
pub enum AggregateError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("Unknown column '{0}'")]
    UnknownColumn(String),
    #[error("At least one grouping column is required")]
    NoGroupColumns,
    #[error("Grouping column '{0}' is listed more than once")]
    DuplicateGroupColumn(String),
    #[error("Column '{column}' is not numeric and cannot be aggregated with {op}")]
    NonNumericMetric { column: String, op: AggregateOp },
    #[error("Unknown aggregation '{0}', expected sum, mean or count")]
    UnknownOp(String),
}

/// How values within a group are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AggregateOp {
    #[default]
    Sum,
    #[serde(alias = "avg", alias = "average")]
    Mean,
    Count,
}

impl AggregateOp {
    pub const ALL: [AggregateOp; 3] = [AggregateOp::Sum, AggregateOp::Mean, AggregateOp::Count];

    pub fn as_str(&self) -> &'static str {
        match self {
            AggregateOp::Sum => "sum",
            AggregateOp::Mean => "mean",
            AggregateOp::Count => "count",
        }
    }
}

impl fmt::Display for AggregateOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AggregateOp {
    type Err = AggregateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sum" => Ok(AggregateOp::Sum),
            "mean" | "avg" | "average" => Ok(AggregateOp::Mean),
            "count" => Ok(AggregateOp::Count),
            other => Err(AggregateError::UnknownOp(other.to_string())),
        }
    }
}

/// One group of a summary: its key (one value per grouping column) and metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub key: Vec<String>,
    pub value: f64,
}

impl SummaryRow {
    pub fn label(&self) -> String {
        self.key.join(" / ")
    }
}

/// Result of an aggregation, rows ordered by key in the key columns' own types.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub group_by: Vec<String>,
    pub metric: String,
    pub op: AggregateOp,
    pub rows: Vec<SummaryRow>,
}

impl Summary {
    /// Metric for a single-column key.
    pub fn get(&self, key: &str) -> Option<f64> {
        self.rows
            .iter()
            .find(|row| row.key.len() == 1 && row.key[0] == key)
            .map(|row| row.value)
    }

    pub fn total(&self) -> f64 {
        self.rows
            .iter()
            .map(|row| row.value)
            .filter(|v| !v.is_nan())
            .sum()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows by descending value; ties keep key order.
    pub fn sorted_by_value_desc(&self) -> Vec<SummaryRow> {
        let mut rows = self.rows.clone();
        rows.sort_by(|a, b| b.value.total_cmp(&a.value));
        rows
    }

    /// The `n` rows with the largest values.
    pub fn top_n(&self, n: usize) -> Vec<SummaryRow> {
        let mut rows = self.sorted_by_value_desc();
        rows.truncate(n);
        rows
    }

    /// Each row's value as a percentage of the total, by descending value.
    pub fn shares(&self) -> Vec<(SummaryRow, f64)> {
        let total = self.total();
        self.sorted_by_value_desc()
            .into_iter()
            .map(|row| {
                let pct = if total > 0.0 {
                    row.value / total * 100.0
                } else {
                    0.0
                };
                (row, pct)
            })
            .collect()
    }
}

/// Group `df` by `group_by` and combine `metric` within each group with `op`.
///
/// Rows with a null key are skipped. Null metric values are ignored by sum and
/// mean and not counted by count; a group with no metric values has a mean of NaN.
pub fn aggregate(
    df: &DataFrame,
    group_by: &[&str],
    metric: &str,
    op: AggregateOp,
) -> Result<Summary, AggregateError> {
    if group_by.is_empty() {
        return Err(AggregateError::NoGroupColumns);
    }
    for (i, name) in group_by.iter().enumerate() {
        if group_by[..i].contains(name) {
            return Err(AggregateError::DuplicateGroupColumn(name.to_string()));
        }
    }
    for name in group_by.iter().chain(std::iter::once(&metric)) {
        if df.column(name).is_err() {
            return Err(AggregateError::UnknownColumn(name.to_string()));
        }
    }

    let metric_col = df.column(metric)?;
    if op != AggregateOp::Count && !is_numeric_dtype(metric_col.dtype()) {
        // An entirely empty column carries no values, so let it through.
        if metric_col.null_count() != metric_col.len() {
            return Err(AggregateError::NonNumericMetric {
                column: metric.to_string(),
                op,
            });
        }
    }

    let keys_present = group_by
        .iter()
        .map(|c| col(*c).is_not_null())
        .reduce(|a, b| a.and(b))
        .unwrap_or_else(|| lit(true));
    let keys: Vec<Expr> = group_by.iter().map(|c| col(*c)).collect();
    let keys_as_text: Vec<Expr> = group_by
        .iter()
        .map(|c| col(*c).cast(DataType::String))
        .collect();

    let value = col(metric);
    let agg = match op {
        AggregateOp::Sum => value.cast(DataType::Float64).sum(),
        AggregateOp::Mean => value.cast(DataType::Float64).mean(),
        AggregateOp::Count => value.count().cast(DataType::Float64),
    }
    .alias(VALUE_COL);

    let grouped = df
        .clone()
        .lazy()
        .filter(keys_present)
        .group_by(keys.clone())
        .agg([agg])
        .sort_by_exprs(keys, SortMultipleOptions::default().with_maintain_order(true))
        .with_columns(keys_as_text)
        .collect()?;

    let key_columns: Vec<&StringChunked> = group_by
        .iter()
        .map(|c| grouped.column(c).and_then(|s| s.str()))
        .collect::<PolarsResult<_>>()?;
    let value_column = grouped.column(VALUE_COL)?.cast(&DataType::Float64)?;
    let values = value_column.f64()?;

    let rows: Vec<SummaryRow> = (0..grouped.height())
        .map(|i| SummaryRow {
            key: key_columns
                .iter()
                .map(|ca| ca.get(i).unwrap_or_default().to_string())
                .collect(),
            value: values.get(i).unwrap_or(f64::NAN),
        })
        .collect();

    Ok(Summary {
        group_by: group_by.iter().map(|s| s.to_string()).collect(),
        metric: metric.to_string(),
        op,
        rows,
    })
}

/// The `n` rows of `df` with the largest `column` values, largest first.
pub fn top_n_rows(df: &DataFrame, column: &str, n: usize) -> Result<DataFrame, AggregateError> {
    if df.column(column).is_err() {
        return Err(AggregateError::UnknownColumn(column.to_string()));
    }
    let top = df
        .clone()
        .lazy()
        .sort_by_exprs(
            [col(column)],
            SortMultipleOptions::default()
                .with_order_descending(true)
                .with_nulls_last(true)
                .with_maintain_order(true),
        )
        .limit(n as IdxSize)
        .collect()?;
    Ok(top)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{f64_values, text_values};

    fn durations() -> DataFrame {
        df!(
            "Location" => ["Nairobi", "Lagos", "Accra"],
            "Duration" => [10.0f64, 20.0, 30.0]
        )
        .unwrap()
    }

    #[test]
    fn test_three_equal_groups() {
        let df = durations();

        let mean = aggregate(&df, &["Location"], "Duration", AggregateOp::Mean).unwrap();
        assert_eq!(mean.get("Nairobi"), Some(10.0));
        assert_eq!(mean.get("Lagos"), Some(20.0));
        assert_eq!(mean.get("Accra"), Some(30.0));

        let sum = aggregate(&df, &["Location"], "Duration", AggregateOp::Sum).unwrap();
        assert_eq!(sum.get("Nairobi"), Some(10.0));
        assert_eq!(sum.get("Lagos"), Some(20.0));
        assert_eq!(sum.get("Accra"), Some(30.0));

        let count = aggregate(&df, &["Location"], "Duration", AggregateOp::Count).unwrap();
        assert!(count.rows.iter().all(|row| row.value == 1.0));
        assert_eq!(count.len(), 3);
    }

    #[test]
    fn test_rows_are_ordered_by_key() {
        let summary = aggregate(&durations(), &["Location"], "Duration", AggregateOp::Sum).unwrap();
        let labels: Vec<String> = summary.rows.iter().map(|r| r.label()).collect();
        assert_eq!(labels, vec!["Accra", "Lagos", "Nairobi"]);
    }

    #[test]
    fn test_numeric_keys_are_ordered_numerically() {
        let df = df!(
            "Active users" => [300i64, 50, 150, 100, 50],
            "Sessions" => [3i64, 1, 2, 4, 5]
        )
        .unwrap();

        let summary = aggregate(&df, &["Active users"], "Sessions", AggregateOp::Sum).unwrap();
        let labels: Vec<String> = summary.rows.iter().map(|r| r.label()).collect();
        assert_eq!(labels, vec!["50", "100", "150", "300"]);
        assert_eq!(summary.get("50"), Some(6.0));
    }

    #[test]
    fn test_aggregation_is_deterministic() {
        let df = df!(
            "Event name" => ["a", "b", "a", "c", "b", "a"],
            "Platform" => ["ios", "android", "android", "ios", "android", "ios"],
            "Event count" => [1i64, 2, 3, 4, 5, 6]
        )
        .unwrap();

        for op in AggregateOp::ALL {
            let first = aggregate(&df, &["Event name", "Platform"], "Event count", op).unwrap();
            let second = aggregate(&df, &["Event name", "Platform"], "Event count", op).unwrap();
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_multi_column_grouping() {
        let df = df!(
            "Region" => ["East", "East", "West", "East"],
            "Country" => ["KE", "UG", "NG", "KE"],
            "Active users" => [10i64, 5, 7, 3]
        )
        .unwrap();

        let summary = aggregate(&df, &["Region", "Country"], "Active users", AggregateOp::Sum).unwrap();
        assert_eq!(
            summary.rows,
            vec![
                SummaryRow { key: vec!["East".into(), "KE".into()], value: 13.0 },
                SummaryRow { key: vec!["East".into(), "UG".into()], value: 5.0 },
                SummaryRow { key: vec!["West".into(), "NG".into()], value: 7.0 },
            ]
        );
        assert_eq!(summary.total(), 25.0);
    }

    #[test]
    fn test_missing_values() {
        let df = df!(
            "Region" => [Some("East"), None, Some("East"), Some("West")],
            "Active users" => [Some(10i64), Some(99), None, None]
        )
        .unwrap();

        let sum = aggregate(&df, &["Region"], "Active users", AggregateOp::Sum).unwrap();
        assert_eq!(sum.len(), 2);
        assert_eq!(sum.get("East"), Some(10.0));

        let count = aggregate(&df, &["Region"], "Active users", AggregateOp::Count).unwrap();
        assert_eq!(count.get("East"), Some(1.0));
        assert_eq!(count.get("West"), Some(0.0));

        let mean = aggregate(&df, &["Region"], "Active users", AggregateOp::Mean).unwrap();
        assert!(mean.get("West").unwrap().is_nan());
    }

    #[test]
    fn test_invalid_requests() {
        let df = durations();

        assert!(matches!(
            aggregate(&df, &[], "Duration", AggregateOp::Sum),
            Err(AggregateError::NoGroupColumns)
        ));
        assert!(matches!(
            aggregate(&df, &["City"], "Duration", AggregateOp::Sum),
            Err(AggregateError::UnknownColumn(c)) if c == "City"
        ));
        assert!(matches!(
            aggregate(&df, &["Location", "Location"], "Duration", AggregateOp::Sum),
            Err(AggregateError::DuplicateGroupColumn(c)) if c == "Location"
        ));
        assert!(matches!(
            aggregate(&df, &["Location"], "Location", AggregateOp::Mean),
            Err(AggregateError::NonNumericMetric { .. })
        ));
        // Counting text values is fine.
        let count = aggregate(&df, &["Location"], "Location", AggregateOp::Count).unwrap();
        assert_eq!(count.total(), 3.0);
    }

    #[test]
    fn test_parse_op() {
        assert_eq!("SUM".parse::<AggregateOp>().unwrap(), AggregateOp::Sum);
        assert_eq!("avg".parse::<AggregateOp>().unwrap(), AggregateOp::Mean);
        assert_eq!("count".parse::<AggregateOp>().unwrap(), AggregateOp::Count);
        assert!(matches!(
            "median".parse::<AggregateOp>(),
            Err(AggregateError::UnknownOp(_))
        ));
    }

    #[test]
    fn test_shares_and_top_n() {
        let summary = aggregate(&durations(), &["Location"], "Duration", AggregateOp::Sum).unwrap();

        let top = summary.top_n(2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].label(), "Accra");
        assert_eq!(top[1].label(), "Lagos");

        let shares = summary.shares();
        assert_eq!(shares[0].0.label(), "Accra");
        assert!((shares[0].1 - 50.0).abs() < 1e-9);
        let total: f64 = shares.iter().map(|(_, pct)| pct).sum();
        assert!((total - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_top_n_rows() {
        let df = df!(
            "Device model" => ["a", "b", "c", "d"],
            "Active users" => [Some(5i64), Some(50), None, Some(20)]
        )
        .unwrap();

        let top = top_n_rows(&df, "Active users", 3).unwrap();
        assert_eq!(
            text_values(&top, "Device model"),
            vec![Some("b".to_string()), Some("d".to_string()), Some("a".to_string())]
        );
        assert_eq!(
            f64_values(&top, "Active users"),
            vec![Some(50.0), Some(20.0), Some(5.0)]
        );
    }
}
