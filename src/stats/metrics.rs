//! Game Metrics Module
//! KPIs, acquisition funnel, event categories, cohort retention and descriptive statistics.

use super::aggregate::{aggregate, AggregateError, AggregateOp, Summary};
use crate::data::{
    f64_values, text_values, DataProcessor, Dataset, ProcessorError, ACTIVE_USERS, COHORT_COL,
    EVENT_COUNT, EVENT_NAME, KEY_EVENTS, REGION_COL, RETENTION_COL, WEEK_COL,
};
use polars::prelude::DataFrame;
use serde::Serialize;
use statrs::statistics::{Data, Distribution, Median};
use std::collections::BTreeMap;
use thiserror::Error;

pub const FIRST_OPEN: &str = "first_open";
pub const SESSION_START: &str = "session_start";
pub const PROGRESS: &str = "progress";

/// Day-1 retention benchmark and alert threshold, in percent.
pub const RETENTION_REFERENCE: f64 = 30.0;
pub const RETENTION_THRESHOLD: f64 = 50.0;
/// Engagement benchmark and alert threshold, in percent.
pub const ENGAGEMENT_REFERENCE: f64 = 60.0;
pub const ENGAGEMENT_THRESHOLD: f64 = 70.0;

pub const EVENT_CATEGORIES: [(&str, &[&str]); 2] = [
    ("Core", &[FIRST_OPEN, SESSION_START, "user_engagement"]),
    ("Progression", &[PROGRESS, "level_up", "tutorial_complete"]),
];

#[derive(Error, Debug)]
pub enum MetricsError {
    #[error(transparent)]
    Aggregate(#[from] AggregateError),
    #[error(transparent)]
    Processor(#[from] ProcessorError),
}

/// Headline player metrics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Kpis {
    pub total_installs: f64,
    pub session_starts: f64,
    pub progress_events: f64,
    /// session starts / installs, percent.
    pub retention_rate: f64,
    /// progress events / session starts, percent.
    pub engagement_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunnelStage {
    pub name: String,
    pub count: f64,
    pub pct_of_initial: f64,
    pub pct_of_previous: f64,
}

/// One cohort's retention curve: (week, percent of week 0).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cohort {
    pub start: String,
    pub points: Vec<(String, f64)>,
}

/// Descriptive statistics for a numeric column.
#[derive(Debug, Clone, Serialize)]
pub struct ColumnStats {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub std: f64,
    pub p05: f64,
    pub p95: f64,
}

impl Default for ColumnStats {
    fn default() -> Self {
        Self {
            count: 0,
            mean: f64::NAN,
            median: f64::NAN,
            std: f64::NAN,
            p05: f64::NAN,
            p95: f64::NAN,
        }
    }
}

fn ratio_pct(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator * 100.0
    } else {
        0.0
    }
}

/// Handles metric calculations over the loaded dataset.
pub struct MetricsCalculator;

impl MetricsCalculator {
    /// Event counts summed per event name.
    pub fn event_totals(engagement: &DataFrame) -> Result<Summary, AggregateError> {
        aggregate(engagement, &[EVENT_NAME], EVENT_COUNT, AggregateOp::Sum)
    }

    pub fn kpis(engagement: &DataFrame) -> Result<Kpis, AggregateError> {
        let totals = Self::event_totals(engagement)?;
        let total_installs = totals.get(FIRST_OPEN).unwrap_or(0.0);
        let session_starts = totals.get(SESSION_START).unwrap_or(0.0);
        let progress_events = totals.get(PROGRESS).unwrap_or(0.0);

        Ok(Kpis {
            total_installs,
            session_starts,
            progress_events,
            retention_rate: ratio_pct(session_starts, total_installs),
            engagement_rate: ratio_pct(progress_events, session_starts),
        })
    }

    /// Acquisition funnel: install and session start followed by every key event,
    /// largest stage first.
    pub fn funnel(dataset: &Dataset) -> Result<Vec<FunnelStage>, AggregateError> {
        let engagement = Self::event_totals(&dataset.engagement)?;
        let key_events = aggregate(&dataset.events, &[EVENT_NAME], KEY_EVENTS, AggregateOp::Sum)?;

        let mut merged: BTreeMap<String, f64> = BTreeMap::new();
        for stage in [FIRST_OPEN, SESSION_START] {
            if let Some(count) = engagement.get(stage) {
                *merged.entry(stage.to_string()).or_default() += count;
            }
        }
        for row in &key_events.rows {
            *merged.entry(row.label()).or_default() += row.value;
        }

        let mut stages: Vec<(String, f64)> = merged.into_iter().collect();
        stages.sort_by(|a, b| b.1.total_cmp(&a.1));

        let initial = stages.first().map(|(_, c)| *c).unwrap_or(0.0);
        let mut previous = initial;
        Ok(stages
            .into_iter()
            .map(|(name, count)| {
                let stage = FunnelStage {
                    name,
                    count,
                    pct_of_initial: ratio_pct(count, initial),
                    pct_of_previous: ratio_pct(count, previous),
                };
                previous = count;
                stage
            })
            .collect())
    }

    /// Event counts per category.
    pub fn event_categories(engagement: &DataFrame) -> Result<Vec<(String, f64)>, AggregateError> {
        let totals = Self::event_totals(engagement)?;
        Ok(EVENT_CATEGORIES
            .iter()
            .map(|(category, events)| {
                let count = events.iter().filter_map(|e| totals.get(e)).sum::<f64>();
                (category.to_string(), count)
            })
            .collect())
    }

    /// Active users per region, with the percentage share of each.
    pub fn region_share(countries: &DataFrame) -> Result<Vec<(String, f64, f64)>, AggregateError> {
        let summary = aggregate(countries, &[REGION_COL], ACTIVE_USERS, AggregateOp::Sum)?;
        Ok(summary
            .shares()
            .into_iter()
            .map(|(row, pct)| (row.label(), row.value, pct))
            .collect())
    }

    /// Retention curves per cohort, in cohort order.
    pub fn cohorts(consistency: &DataFrame) -> Result<Vec<Cohort>, MetricsError> {
        let long = DataProcessor::cohort_retention(consistency)?;

        let starts = text_values(&long, COHORT_COL);
        let weeks = text_values(&long, WEEK_COL);
        let values = f64_values(&long, RETENTION_COL);

        let mut cohorts: Vec<Cohort> = Vec::new();
        for ((start, week), value) in starts.into_iter().zip(weeks).zip(values) {
            let (Some(start), Some(week), Some(value)) = (start, week, value) else {
                continue;
            };
            match cohorts.last_mut() {
                Some(cohort) if cohort.start == start => cohort.points.push((week, value)),
                _ => cohorts.push(Cohort {
                    start,
                    points: vec![(week, value)],
                }),
            }
        }
        Ok(cohorts)
    }

    /// Compute descriptive statistics for an array of values.
    pub fn describe(values: &[f64]) -> ColumnStats {
        let values: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
        let n = values.len();
        if n == 0 {
            return ColumnStats::default();
        }

        let mut sorted = values.clone();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let data = Data::new(values);
        ColumnStats {
            count: n,
            mean: data.mean().unwrap_or(f64::NAN),
            median: data.median(),
            std: if n > 1 {
                data.std_dev().unwrap_or(f64::NAN)
            } else {
                0.0
            },
            p05: Self::percentile(&sorted, 5.0),
            p95: Self::percentile(&sorted, 95.0),
        }
    }

    /// Calculate percentile using linear interpolation (NumPy compatible).
    fn percentile(sorted_values: &[f64], p: f64) -> f64 {
        let n = sorted_values.len();
        if n == 0 {
            return f64::NAN;
        }
        if n == 1 {
            return sorted_values[0];
        }

        let rank = (p / 100.0) * (n - 1) as f64;
        let lower = rank.floor() as usize;
        let upper = (rank.ceil() as usize).min(n - 1);
        let frac = rank - lower as f64;

        if lower == upper {
            sorted_values[lower]
        } else {
            sorted_values[lower] * (1.0 - frac) + sorted_values[upper] * frac
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fixtures::sample_dataset;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_kpis() {
        let dataset = sample_dataset();
        let kpis = MetricsCalculator::kpis(&dataset.engagement).unwrap();

        assert_eq!(kpis.total_installs, 1000.0);
        assert_eq!(kpis.session_starts, 260.0);
        assert_eq!(kpis.progress_events, 130.0);
        assert!(approx(kpis.retention_rate, 26.0));
        assert!(approx(kpis.engagement_rate, 50.0));
    }

    #[test]
    fn test_kpis_without_installs() {
        let engagement = polars::prelude::df!(
            EVENT_NAME => ["progress"],
            EVENT_COUNT => [10i64]
        )
        .unwrap();
        let kpis = MetricsCalculator::kpis(&engagement).unwrap();
        assert_eq!(kpis.retention_rate, 0.0);
        assert_eq!(kpis.engagement_rate, 0.0);
    }

    #[test]
    fn test_funnel() {
        let dataset = sample_dataset();
        let funnel = MetricsCalculator::funnel(&dataset).unwrap();

        let names: Vec<&str> = funnel.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["first_open", "session_start", "tutorial_complete", "level_up"]
        );
        assert!(approx(funnel[0].pct_of_initial, 100.0));
        assert!(approx(funnel[1].pct_of_previous, 26.0));
        assert!(approx(funnel[3].pct_of_initial, 4.0));
    }

    #[test]
    fn test_event_categories() {
        let dataset = sample_dataset();
        let categories = MetricsCalculator::event_categories(&dataset.engagement).unwrap();
        assert_eq!(
            categories,
            vec![
                ("Core".to_string(), 2160.0),
                ("Progression".to_string(), 170.0)
            ]
        );
    }

    #[test]
    fn test_region_share() {
        let dataset = sample_dataset();
        let regions = MetricsCalculator::region_share(&dataset.countries).unwrap();

        assert_eq!(regions[0].0, "West Africa");
        assert_eq!(regions[0].1, 450.0);
        assert!(approx(regions[0].2, 50.0));
        assert_eq!(regions[1].0, "East Africa");
        let total: f64 = regions.iter().map(|r| r.2).sum();
        assert!(approx(total, 100.0));
    }

    #[test]
    fn test_cohorts() {
        let dataset = sample_dataset();
        let cohorts = MetricsCalculator::cohorts(&dataset.consistency).unwrap();

        assert_eq!(cohorts.len(), 2);
        assert_eq!(cohorts[0].start, "2025-01-05");
        assert_eq!(
            cohorts[0].points,
            vec![("Week 1".to_string(), 25.0), ("Week 2".to_string(), 10.0)]
        );
        assert_eq!(cohorts[1].points[0], ("Week 1".to_string(), 30.0));
    }

    #[test]
    fn test_describe() {
        let stats = MetricsCalculator::describe(&[10.0, 20.0, 30.0, f64::NAN]);
        assert_eq!(stats.count, 3);
        assert!(approx(stats.mean, 20.0));
        assert!(approx(stats.median, 20.0));
        assert!(approx(stats.std, 10.0));
        assert!(approx(stats.p05, 11.0));
        assert!(approx(stats.p95, 29.0));

        assert_eq!(MetricsCalculator::describe(&[]).count, 0);
    }
}
