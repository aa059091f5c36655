//! Data module - CSV loading and processing

mod dataset;
pub mod geo;
pub mod loader;
mod processor;

#[cfg(test)]
pub(crate) use dataset::fixtures;
pub use dataset::{
    Dataset, ACTIVE_USERS, DEVICE_MODEL, EVENT_COUNT, EVENT_NAME, KEY_EVENTS, TABLE_NAMES,
};
pub use loader::{column_names, f64_values, numeric_columns, text_values};
pub use processor::{
    DataProcessor, ProcessorError, COHORT_COL, CONTINENT_COL, COUNTRY_NAME_COL, REGION_COL,
    RETENTION_COL, WEEK_COL,
};
