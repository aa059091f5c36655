//! CSV Data Loader Module
//! Handles CSV file loading, schema checks and column extraction using Polars.

use polars::prelude::*;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("CSV file not found: {}", .0.display())]
    FileNotFound(PathBuf),
    #[error("Failed to load CSV: {0}")]
    CsvError(#[from] PolarsError),
    #[error("{}: missing required column '{column}'", path.display())]
    MissingColumn { path: PathBuf, column: String },
    #[error("{}: column '{column}' is {found}, expected {expected}", path.display())]
    Schema {
        path: PathBuf,
        column: String,
        expected: ColumnKind,
        found: DataType,
    },
}

/// Declared type of a CSV column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Integer,
    /// Integer or float.
    Number,
    /// A parsed date, or a free-form date label.
    Date,
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnKind::Text => "text",
            ColumnKind::Integer => "integer",
            ColumnKind::Number => "number",
            ColumnKind::Date => "date",
        };
        f.write_str(name)
    }
}

impl ColumnKind {
    /// Check whether a loaded column conforms to this kind.
    ///
    /// A column with no values at all, including one from a header-only file,
    /// is inferred as text by the CSV reader, so it is accepted for every kind.
    pub fn accepts(&self, column: &Column) -> bool {
        if column.null_count() == column.len() {
            return true;
        }
        let dtype = column.dtype();
        match self {
            ColumnKind::Text => matches!(dtype, DataType::String),
            ColumnKind::Integer => is_integer_dtype(dtype),
            ColumnKind::Number => is_numeric_dtype(dtype),
            ColumnKind::Date => matches!(
                dtype,
                DataType::Date | DataType::Datetime(_, _) | DataType::String
            ),
        }
    }
}

/// Expected layout of one CSV table.
#[derive(Debug, Clone, Copy)]
pub struct TableSchema {
    pub name: &'static str,
    pub file: &'static str,
    pub columns: &'static [(&'static str, ColumnKind)],
    /// Kind every column not listed in `columns` must have, if any.
    pub remaining: Option<ColumnKind>,
}

fn is_integer_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
    )
}

pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    is_integer_dtype(dtype) || matches!(dtype, DataType::Float32 | DataType::Float64)
}

/// Load a CSV file using Polars and check it against `schema`.
pub fn load_csv(path: &Path, schema: &TableSchema) -> Result<DataFrame, LoaderError> {
    if !path.is_file() {
        return Err(LoaderError::FileNotFound(path.to_path_buf()));
    }

    let df = LazyCsvReader::new(path)
        .with_infer_schema_length(Some(10000))
        .with_try_parse_dates(true)
        .finish()?
        .collect()?;

    validate(&df, path, schema)?;
    Ok(df)
}

fn validate(df: &DataFrame, path: &Path, schema: &TableSchema) -> Result<(), LoaderError> {
    for &(name, kind) in schema.columns {
        let column = df.column(name).map_err(|_| LoaderError::MissingColumn {
            path: path.to_path_buf(),
            column: name.to_string(),
        })?;
        check_kind(column, kind, path)?;
    }

    if let Some(kind) = schema.remaining {
        for column in df.get_columns() {
            let declared = schema
                .columns
                .iter()
                .any(|(name, _)| column.name().as_str() == *name);
            if !declared {
                check_kind(column, kind, path)?;
            }
        }
    }
    Ok(())
}

fn check_kind(column: &Column, kind: ColumnKind, path: &Path) -> Result<(), LoaderError> {
    if kind.accepts(column) {
        Ok(())
    } else {
        Err(LoaderError::Schema {
            path: path.to_path_buf(),
            column: column.name().to_string(),
            expected: kind,
            found: column.dtype().clone(),
        })
    }
}

/// Loads the named tables of a run from one directory.
pub struct DataLoader {
    data_dir: PathBuf,
}

impl DataLoader {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Load the table described by `schema` from the data directory.
    pub fn load_table(&self, schema: &TableSchema) -> Result<DataFrame, LoaderError> {
        let path = self.data_dir.join(schema.file);
        let df = load_csv(&path, schema)?;
        tracing::debug!(
            table = schema.name,
            rows = df.height(),
            columns = df.width(),
            "Loaded table"
        );
        Ok(df)
    }
}

/// Get list of column names.
pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Get list of numeric column names.
pub fn numeric_columns(df: &DataFrame) -> Vec<String> {
    df.get_columns()
        .iter()
        .filter(|col| is_numeric_dtype(col.dtype()))
        .map(|col| col.name().to_string())
        .collect()
}

/// Column values rendered as text, `None` for nulls or an unknown column.
pub fn text_values(df: &DataFrame, column: &str) -> Vec<Option<String>> {
    let Ok(col) = df.column(column) else {
        return Vec::new();
    };
    let Ok(cast) = col.cast(&DataType::String) else {
        return Vec::new();
    };
    cast.str()
        .map(|ca| ca.into_iter().map(|v| v.map(str::to_string)).collect())
        .unwrap_or_default()
}

/// Column values as `f64`, `None` for nulls, non-numeric values or an unknown column.
pub fn f64_values(df: &DataFrame, column: &str) -> Vec<Option<f64>> {
    let Ok(col) = df.column(column) else {
        return Vec::new();
    };
    let Ok(cast) = col.cast(&DataType::Float64) else {
        return vec![None; df.height()];
    };
    cast.f64()
        .map(|ca| ca.into_iter().collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    const ENGAGEMENT: TableSchema = TableSchema {
        name: "engagement",
        file: "engagement_time.csv",
        columns: &[
            ("Event name", ColumnKind::Text),
            ("Event count", ColumnKind::Integer),
        ],
        remaining: None,
    };

    fn write_csv(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_load_well_formed_csv() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(
            &dir,
            "engagement_time.csv",
            "Event name,Event count,Total users\n\
             first_open,1000,900\n\
             session_start,260,240\n\
             progress,180,120\n",
        );

        let df = load_csv(&path, &ENGAGEMENT).unwrap();

        assert_eq!(df.height(), 3);
        assert_eq!(df.width(), 3);
        assert_eq!(df.column("Event name").unwrap().dtype(), &DataType::String);
        assert!(ColumnKind::Integer.accepts(df.column("Event count").unwrap()));
        assert!(ColumnKind::Integer.accepts(df.column("Total users").unwrap()));
    }

    #[test]
    fn test_header_only_csv_is_empty_table() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(&dir, "engagement_time.csv", "Event name,Event count\n");

        let df = load_csv(&path, &ENGAGEMENT).unwrap();

        assert_eq!(df.height(), 0);
        assert_eq!(column_names(&df), vec!["Event name", "Event count"]);
    }

    #[test]
    fn test_integer_kind_rejects_floats() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(
            &dir,
            "engagement_time.csv",
            "Event name,Event count\nfirst_open,10.5\n",
        );

        let err = load_csv(&path, &ENGAGEMENT).unwrap_err();
        assert!(matches!(
            err,
            LoaderError::Schema { expected: ColumnKind::Integer, .. }
        ));
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nope.csv");

        let err = load_csv(&path, &ENGAGEMENT).unwrap_err();
        assert!(matches!(err, LoaderError::FileNotFound(p) if p == path));
    }

    #[test]
    fn test_missing_column_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(&dir, "e.csv", "Event name,Users\nfirst_open,10\n");

        let err = load_csv(&path, &ENGAGEMENT).unwrap_err();
        assert!(
            matches!(err, LoaderError::MissingColumn { ref column, .. } if column == "Event count")
        );
    }

    #[test]
    fn test_inconsistent_column_type_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(
            &dir,
            "e.csv",
            "Event name,Event count\nfirst_open,10\nsession_start,lots\n",
        );

        let err = load_csv(&path, &ENGAGEMENT).unwrap_err();
        match err {
            LoaderError::Schema {
                column, expected, ..
            } => {
                assert_eq!(column, "Event count");
                assert_eq!(expected, ColumnKind::Integer);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_remaining_columns_are_checked() {
        let schema = TableSchema {
            name: "consistency",
            file: "consistency.csv",
            columns: &[("Date", ColumnKind::Date)],
            remaining: Some(ColumnKind::Number),
        };
        let dir = TempDir::new().unwrap();
        let good = write_csv(&dir, "good.csv", "Date,Week 0,Week 1\n2025-01-05,100,40\n");
        let bad = write_csv(&dir, "bad.csv", "Date,Week 0,Week 1\n2025-01-05,100,n/a\n");

        assert!(load_csv(&good, &schema).is_ok());
        assert!(matches!(
            load_csv(&bad, &schema),
            Err(LoaderError::Schema { ref column, .. }) if column == "Week 1"
        ));
    }

    #[test]
    fn test_column_helpers() {
        let df = df!(
            "Country" => ["KE", "NG", "KE"],
            "Active users" => [10i64, 20, 30],
            "Share" => [0.1f64, 0.2, 0.3]
        )
        .unwrap();

        assert_eq!(column_names(&df), vec!["Country", "Active users", "Share"]);
        assert_eq!(numeric_columns(&df), vec!["Active users", "Share"]);
        assert_eq!(
            text_values(&df, "Country"),
            vec![Some("KE".to_string()), Some("NG".to_string()), Some("KE".to_string())]
        );
        assert_eq!(
            f64_values(&df, "Active users"),
            vec![Some(10.0), Some(20.0), Some(30.0)]
        );
        assert!(text_values(&df, "Missing").is_empty());
    }
}
