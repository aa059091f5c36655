//! Query parameters of the dashboard's widgets.
//!
//! Every field arrives as an optional string so that bad values become a 400
//! with a readable message instead of an extractor rejection.

use super::error::AppError;
use crate::charts::GeoGrouping;
use crate::stats::AggregateOp;
use serde::Deserialize;

pub const MAX_TOP_N: usize = 100;

#[derive(Debug, Default, Deserialize)]
pub struct TopQuery {
    pub top: Option<String>,
    pub op: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GeoQuery {
    pub group_by: Option<String>,
    pub op: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SummaryQuery {
    pub table: Option<String>,
    /// Comma-separated grouping columns.
    pub group_by: Option<String>,
    pub metric: Option<String>,
    pub op: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChartQuery {
    pub top: Option<String>,
    pub op: Option<String>,
    pub group_by: Option<String>,
}

/// `None` for absent or blank values.
fn present(raw: &Option<String>) -> Option<&str> {
    raw.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

pub fn parse_top(raw: &Option<String>, default: usize) -> Result<usize, AppError> {
    match present(raw) {
        None => Ok(default),
        Some(s) => match s.parse::<usize>() {
            Ok(n) if (1..=MAX_TOP_N).contains(&n) => Ok(n),
            _ => Err(AppError::InvalidInput(format!(
                "top must be a whole number between 1 and {MAX_TOP_N}, got '{s}'"
            ))),
        },
    }
}

pub fn parse_op(raw: &Option<String>) -> Result<AggregateOp, AppError> {
    match present(raw) {
        None => Ok(AggregateOp::default()),
        Some(s) => s.parse().map_err(AppError::from),
    }
}

pub fn parse_geo(raw: &Option<String>) -> Result<GeoGrouping, AppError> {
    match present(raw) {
        None => Ok(GeoGrouping::default()),
        Some(s) => s.parse().map_err(AppError::InvalidInput),
    }
}

/// Split a comma-separated column list, dropping blanks.
pub fn parse_columns(raw: &Option<String>) -> Vec<String> {
    present(raw)
        .map(|s| {
            s.split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

pub fn required<'a>(raw: &'a Option<String>, name: &str) -> Result<&'a str, AppError> {
    present(raw).ok_or_else(|| AppError::InvalidInput(format!("missing parameter '{name}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn some(s: &str) -> Option<String> {
        Some(s.to_string())
    }

    #[test]
    fn test_parse_top() {
        assert_eq!(parse_top(&None, 15).unwrap(), 15);
        assert_eq!(parse_top(&some(""), 15).unwrap(), 15);
        assert_eq!(parse_top(&some("5"), 15).unwrap(), 5);
        assert!(parse_top(&some("0"), 15).is_err());
        assert!(parse_top(&some("101"), 15).is_err());
        assert!(parse_top(&some("ten"), 15).is_err());
    }

    #[test]
    fn test_parse_op_and_geo() {
        assert_eq!(parse_op(&None).unwrap(), AggregateOp::Sum);
        assert_eq!(parse_op(&some("avg")).unwrap(), AggregateOp::Mean);
        assert!(matches!(parse_op(&some("median")), Err(AppError::InvalidInput(_))));

        assert_eq!(parse_geo(&None).unwrap(), GeoGrouping::Region);
        assert_eq!(parse_geo(&some("continent")).unwrap(), GeoGrouping::Continent);
        assert!(parse_geo(&some("city")).is_err());
    }

    #[test]
    fn test_parse_columns() {
        assert_eq!(
            parse_columns(&some("Continent, Region,")),
            vec!["Continent".to_string(), "Region".to_string()]
        );
        assert!(parse_columns(&None).is_empty());
        assert!(required(&some("  "), "metric").is_err());
    }
}
