//! Data Processor Module
//! Handles data cleaning and transformation (derived columns, unpivot to long format).

use super::geo::country_info;
use super::loader::{f64_values, text_values};
use polars::prelude::*;
use thiserror::Error;

pub const COUNTRY_NAME_COL: &str = "Country Name";
pub const CONTINENT_COL: &str = "Continent";
pub const REGION_COL: &str = "Region";

pub const COHORT_COL: &str = "Date";
pub const WEEK_COL: &str = "Week";
pub const RETENTION_COL: &str = "Retention (%)";
pub const BASELINE_WEEK: &str = "Week 0";

#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("Column '{0}' not found")]
    MissingColumn(String),
}

/// Handles data cleaning and transformation operations.
pub struct DataProcessor;

impl DataProcessor {
    /// Drop rows where `column` is null.
    pub fn drop_nulls(df: &DataFrame, column: &str) -> Result<DataFrame, ProcessorError> {
        if df.column(column).is_err() {
            return Err(ProcessorError::MissingColumn(column.to_string()));
        }
        let filtered = df
            .clone()
            .lazy()
            .filter(col(column).is_not_null())
            .collect()?;
        Ok(filtered)
    }

    /// Add country name, continent and region columns derived from an ISO-2 code column.
    pub fn enrich_countries(df: &DataFrame, code_col: &str) -> Result<DataFrame, ProcessorError> {
        if df.column(code_col).is_err() {
            return Err(ProcessorError::MissingColumn(code_col.to_string()));
        }

        let mut names: Vec<Option<String>> = Vec::with_capacity(df.height());
        let mut continents: Vec<Option<String>> = Vec::with_capacity(df.height());
        let mut regions: Vec<Option<String>> = Vec::with_capacity(df.height());

        for code in text_values(df, code_col) {
            match code {
                Some(code) => {
                    let info = country_info(&code);
                    names.push(Some(info.name));
                    continents.push(Some(info.continent));
                    regions.push(Some(info.region));
                }
                None => {
                    names.push(None);
                    continents.push(None);
                    regions.push(None);
                }
            }
        }

        let enriched = df.hstack(&[
            Column::new(COUNTRY_NAME_COL.into(), names),
            Column::new(CONTINENT_COL.into(), continents),
            Column::new(REGION_COL.into(), regions),
        ])?;
        Ok(enriched)
    }

    /// Transform the weekly cohort table to long format, as percentage of week 0.
    ///
    /// Output columns: [`Date`, `Week`, `Retention (%)`]. The baseline week is
    /// dropped; cohorts with a null or zero baseline produce no rows.
    pub fn cohort_retention(df: &DataFrame) -> Result<DataFrame, ProcessorError> {
        for required in [COHORT_COL, BASELINE_WEEK] {
            if df.column(required).is_err() {
                return Err(ProcessorError::MissingColumn(required.to_string()));
            }
        }

        let week_cols: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .filter(|name| name != COHORT_COL && name != BASELINE_WEEK)
            .collect();

        let cohorts = text_values(df, COHORT_COL);
        let baseline = f64_values(df, BASELINE_WEEK);
        let weeks: Vec<Vec<Option<f64>>> = week_cols.iter().map(|c| f64_values(df, c)).collect();

        let mut dates: Vec<String> = Vec::new();
        let mut week_names: Vec<String> = Vec::new();
        let mut values: Vec<f64> = Vec::new();

        for i in 0..df.height() {
            let (Some(cohort), Some(base)) = (&cohorts[i], baseline[i]) else {
                continue;
            };
            if base == 0.0 || base.is_nan() {
                continue;
            }
            for (week, column) in week_cols.iter().zip(&weeks) {
                if let Some(v) = column[i] {
                    dates.push(cohort.clone());
                    week_names.push(week.clone());
                    values.push(v / base * 100.0);
                }
            }
        }

        let df = DataFrame::new(vec![
            Column::new(COHORT_COL.into(), dates),
            Column::new(WEEK_COL.into(), week_names),
            Column::new(RETENTION_COL.into(), values),
        ])?;

        Ok(df)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drop_nulls() {
        let df = df!(
            "Event name" => ["level_up", "purchase", "tutorial_complete"],
            "Key events" => [Some(12i64), None, Some(7)]
        )
        .unwrap();

        let cleaned = DataProcessor::drop_nulls(&df, "Key events").unwrap();
        assert_eq!(cleaned.height(), 2);
        assert_eq!(
            text_values(&cleaned, "Event name"),
            vec![Some("level_up".to_string()), Some("tutorial_complete".to_string())]
        );

        assert!(matches!(
            DataProcessor::drop_nulls(&df, "Missing"),
            Err(ProcessorError::MissingColumn(_))
        ));
    }

    #[test]
    fn test_enrich_countries() {
        let df = df!(
            "Country" => ["KE", "GH", "BR"],
            "Active users" => [500i64, 300, 5]
        )
        .unwrap();

        let enriched = DataProcessor::enrich_countries(&df, "Country").unwrap();
        assert_eq!(enriched.width(), 5);
        assert_eq!(
            text_values(&enriched, COUNTRY_NAME_COL),
            vec![
                Some("Kenya".to_string()),
                Some("Ghana".to_string()),
                Some("BR".to_string())
            ]
        );
        assert_eq!(
            text_values(&enriched, REGION_COL),
            vec![
                Some("East Africa".to_string()),
                Some("West Africa".to_string()),
                Some("Unknown".to_string())
            ]
        );
        assert_eq!(
            text_values(&enriched, CONTINENT_COL),
            vec![
                Some("Africa".to_string()),
                Some("Africa".to_string()),
                Some("Unknown".to_string())
            ]
        );
    }

    #[test]
    fn test_cohort_retention() {
        let df = df!(
            "Date" => ["Jan 5", "Jan 12", "Jan 19"],
            "Week 0" => [200i64, 0, 50],
            "Week 1" => [Some(50i64), Some(10), Some(25)],
            "Week 2" => [Some(20i64), Some(5), None]
        )
        .unwrap();

        let long = DataProcessor::cohort_retention(&df).unwrap();

        // Jan 12 has a zero baseline, Jan 19 has no week 2 value.
        assert_eq!(long.height(), 3);
        assert_eq!(
            text_values(&long, WEEK_COL),
            vec![
                Some("Week 1".to_string()),
                Some("Week 2".to_string()),
                Some("Week 1".to_string())
            ]
        );
        assert_eq!(
            f64_values(&long, RETENTION_COL),
            vec![Some(25.0), Some(10.0), Some(50.0)]
        );
    }
}
