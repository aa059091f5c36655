//! Stats module - Aggregation and game metrics

mod aggregate;
mod metrics;

pub use aggregate::{aggregate, top_n_rows, AggregateError, AggregateOp, Summary, SummaryRow};
pub use metrics::{
    Kpis, MetricsCalculator, MetricsError, ENGAGEMENT_REFERENCE, ENGAGEMENT_THRESHOLD,
    RETENTION_REFERENCE, RETENTION_THRESHOLD,
};
