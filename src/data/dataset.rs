//! The named tables of one dashboard run.

use super::loader::{ColumnKind, DataLoader, LoaderError, TableSchema};
use super::processor::{DataProcessor, ProcessorError};
use polars::prelude::DataFrame;
use std::path::Path;
use thiserror::Error;

pub const EVENT_NAME: &str = "Event name";
pub const EVENT_COUNT: &str = "Event count";
pub const KEY_EVENTS: &str = "Key events";
pub const DEVICE_MODEL: &str = "Device model";
pub const ACTIVE_USERS: &str = "Active users";
pub const COUNTRY: &str = "Country";

pub const ENGAGEMENT: TableSchema = TableSchema {
    name: "engagement",
    file: "engagement_time.csv",
    columns: &[
        (EVENT_NAME, ColumnKind::Text),
        (EVENT_COUNT, ColumnKind::Integer),
    ],
    remaining: None,
};

pub const DEVICES: TableSchema = TableSchema {
    name: "devices",
    file: "device_distribution.csv",
    columns: &[
        (DEVICE_MODEL, ColumnKind::Text),
        (ACTIVE_USERS, ColumnKind::Integer),
    ],
    remaining: None,
};

pub const EVENTS: TableSchema = TableSchema {
    name: "events",
    file: "events.csv",
    columns: &[(EVENT_NAME, ColumnKind::Text), (KEY_EVENTS, ColumnKind::Integer)],
    remaining: None,
};

pub const COUNTRIES: TableSchema = TableSchema {
    name: "countries",
    file: "country_distribution.csv",
    columns: &[(COUNTRY, ColumnKind::Text), (ACTIVE_USERS, ColumnKind::Integer)],
    remaining: None,
};

pub const CONSISTENCY: TableSchema = TableSchema {
    name: "consistency",
    file: "consistency.csv",
    columns: &[("Date", ColumnKind::Date), ("Week 0", ColumnKind::Number)],
    remaining: Some(ColumnKind::Number),
};

pub const TABLE_NAMES: [&str; 5] = [
    ENGAGEMENT.name,
    DEVICES.name,
    EVENTS.name,
    COUNTRIES.name,
    CONSISTENCY.name,
];

#[derive(Error, Debug)]
pub enum DatasetError {
    #[error(transparent)]
    Load(#[from] LoaderError),
    #[error("Failed to prepare {table}: {source}")]
    Process {
        table: &'static str,
        #[source]
        source: ProcessorError,
    },
}

/// All tables of a run, cleaned. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub engagement: DataFrame,
    pub devices: DataFrame,
    /// Key events, rows without a value dropped.
    pub events: DataFrame,
    /// Active users per country, with name, continent and region columns.
    pub countries: DataFrame,
    /// Weekly cohort sizes, one row per acquisition week.
    pub consistency: DataFrame,
}

impl Dataset {
    /// Load and clean every table from `data_dir`.
    pub fn load(data_dir: &Path) -> Result<Self, DatasetError> {
        let loader = DataLoader::new(data_dir);

        let engagement = loader.load_table(&ENGAGEMENT)?;
        let devices = loader.load_table(&DEVICES)?;
        let events = loader.load_table(&EVENTS)?;
        let countries = loader.load_table(&COUNTRIES)?;
        let consistency = loader.load_table(&CONSISTENCY)?;

        Self::from_tables(engagement, devices, events, countries, consistency)
    }

    /// Build a dataset from raw tables, applying the cleaning steps.
    pub fn from_tables(
        engagement: DataFrame,
        devices: DataFrame,
        events: DataFrame,
        countries: DataFrame,
        consistency: DataFrame,
    ) -> Result<Self, DatasetError> {
        let events =
            DataProcessor::drop_nulls(&events, KEY_EVENTS).map_err(|source| {
                DatasetError::Process {
                    table: EVENTS.name,
                    source,
                }
            })?;
        let countries = DataProcessor::enrich_countries(&countries, COUNTRY).map_err(|source| {
            DatasetError::Process {
                table: COUNTRIES.name,
                source,
            }
        })?;

        Ok(Self {
            engagement,
            devices,
            events,
            countries,
            consistency,
        })
    }

    /// Look up a table by its name.
    pub fn table(&self, name: &str) -> Option<&DataFrame> {
        match name {
            "engagement" => Some(&self.engagement),
            "devices" => Some(&self.devices),
            "events" => Some(&self.events),
            "countries" => Some(&self.countries),
            "consistency" => Some(&self.consistency),
            _ => None,
        }
    }

    /// Row count per table, in `TABLE_NAMES` order.
    pub fn row_counts(&self) -> Vec<(&'static str, usize)> {
        TABLE_NAMES
            .iter()
            .filter_map(|&name| self.table(name).map(|df| (name, df.height())))
            .collect()
    }
}
