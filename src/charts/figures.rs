//! Chart builders: turn aggregated dataset views into chart descriptors.

use super::palette;
use super::spec::{ChartKind, ChartSpec, ColorEncoding, DataPoint, GaugeSpec, Rgb, Series};
use crate::data::{
    f64_values, text_values, Dataset, ACTIVE_USERS, CONTINENT_COL, COUNTRY_NAME_COL,
    DEVICE_MODEL, EVENT_COUNT, EVENT_NAME, REGION_COL,
};
use crate::stats::{
    aggregate, top_n_rows, AggregateError, AggregateOp, Kpis, MetricsCalculator, MetricsError,
    Summary, ENGAGEMENT_REFERENCE, ENGAGEMENT_THRESHOLD, RETENTION_REFERENCE,
    RETENTION_THRESHOLD,
};
use polars::prelude::DataFrame;
use std::fmt;
use std::str::FromStr;

/// Named charts served by the JSON API.
pub const CHART_NAMES: [&str; 13] = [
    "funnel",
    "retention-gauge",
    "engagement-gauge",
    "event-categories",
    "top-events",
    "retention-cohorts",
    "devices",
    "device-share",
    "device-scatter",
    "countries",
    "top-countries",
    "region-share",
    "geo-summary",
];

/// Grouping level of the geography breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GeoGrouping {
    Country,
    Continent,
    #[default]
    Region,
}

impl GeoGrouping {
    pub const ALL: [GeoGrouping; 3] = [
        GeoGrouping::Country,
        GeoGrouping::Continent,
        GeoGrouping::Region,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GeoGrouping::Country => "country",
            GeoGrouping::Continent => "continent",
            GeoGrouping::Region => "region",
        }
    }

    pub fn column(&self) -> &'static str {
        match self {
            GeoGrouping::Country => COUNTRY_NAME_COL,
            GeoGrouping::Continent => CONTINENT_COL,
            GeoGrouping::Region => REGION_COL,
        }
    }
}

impl fmt::Display for GeoGrouping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GeoGrouping {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "country" => Ok(GeoGrouping::Country),
            "continent" => Ok(GeoGrouping::Continent),
            "region" => Ok(GeoGrouping::Region),
            other => Err(format!(
                "Unknown grouping '{other}', expected country, continent or region"
            )),
        }
    }
}

/// Widget values that parameterise the interactive charts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FigureParams {
    pub top_n: usize,
    pub op: AggregateOp,
    pub geo: GeoGrouping,
}

impl Default for FigureParams {
    fn default() -> Self {
        Self {
            top_n: 15,
            op: AggregateOp::Sum,
            geo: GeoGrouping::default(),
        }
    }
}

fn op_title(op: AggregateOp) -> &'static str {
    match op {
        AggregateOp::Sum => "Total",
        AggregateOp::Mean => "Average",
        AggregateOp::Count => "Rows",
    }
}

fn summary_points(rows: &[crate::stats::SummaryRow]) -> Vec<DataPoint> {
    rows.iter()
        .map(|row| DataPoint::new(row.label(), row.value))
        .collect()
}

/// (label, value) pairs of a table's two columns, rows with a null skipped.
fn labelled_values(df: &DataFrame, label_col: &str, value_col: &str) -> Vec<DataPoint> {
    text_values(df, label_col)
        .into_iter()
        .zip(f64_values(df, value_col))
        .filter_map(|(label, value)| Some(DataPoint::new(label?, value?)))
        .collect()
}

/// Build a named chart. `None` when the name is unknown.
pub fn by_name(
    dataset: &Dataset,
    name: &str,
    params: &FigureParams,
) -> Option<Result<ChartSpec, MetricsError>> {
    let chart = match name {
        "funnel" => funnel_chart(dataset),
        "retention-gauge" => MetricsCalculator::kpis(&dataset.engagement)
            .map(|k| retention_gauge(&k))
            .map_err(MetricsError::from),
        "engagement-gauge" => MetricsCalculator::kpis(&dataset.engagement)
            .map(|k| engagement_gauge(&k))
            .map_err(MetricsError::from),
        "event-categories" => event_categories_chart(dataset),
        "top-events" => top_events_chart(dataset, params.top_n, params.op),
        "retention-cohorts" => retention_cohorts_chart(dataset),
        "devices" => device_bar_chart(dataset, params.top_n),
        "device-share" => device_share_chart(dataset, params.top_n),
        "device-scatter" => device_scatter_chart(dataset, params.top_n),
        "countries" => country_bar_chart(dataset),
        "top-countries" => top_countries_chart(dataset),
        "region-share" => region_share_chart(dataset),
        "geo-summary" => geo_summary_chart(dataset, params.geo, params.op),
        _ => return None,
    };
    Some(chart)
}

/// Player acquisition funnel.
pub fn funnel_chart(dataset: &Dataset) -> Result<ChartSpec, MetricsError> {
    let stages = MetricsCalculator::funnel(dataset)?;
    let points = stages
        .iter()
        .map(|s| DataPoint::new(s.name.clone(), s.count))
        .collect();

    Ok(ChartSpec::new("funnel", ChartKind::Funnel, "Player Acquisition Funnel")
        .series(Series::new("Event count", points))
        .colors(ColorEncoding::per_point(&palette::FUNNEL))
        .size(640, 400))
}

struct Dial {
    reference: f64,
    threshold: f64,
    steps: [f64; 2],
    bar: Rgb,
}

fn gauge_chart(id: &str, title: &str, value: f64, dial: Dial) -> ChartSpec {
    let Dial {
        reference,
        threshold,
        steps,
        bar,
    } = dial;
    ChartSpec::new(id, ChartKind::Gauge, title)
        .series(Series::new(title, vec![DataPoint::new(title, value)]))
        .colors(ColorEncoding::Uniform { color: bar })
        .suffix("%")
        .gauge(GaugeSpec {
            max: 100.0,
            reference,
            threshold,
            steps: vec![
                (0.0, steps[0], palette::STEP_LIGHT),
                (steps[0], steps[1], palette::STEP_DARK),
            ],
        })
        .size(480, 220)
}

/// Day-1 retention dial.
pub fn retention_gauge(kpis: &Kpis) -> ChartSpec {
    gauge_chart(
        "retention-gauge",
        "Day 1 Retention Rate (%)",
        kpis.retention_rate,
        Dial {
            reference: RETENTION_REFERENCE,
            threshold: RETENTION_THRESHOLD,
            steps: [25.0, 50.0],
            bar: palette::GAUGE_RETENTION,
        },
    )
}

/// Engagement dial.
pub fn engagement_gauge(kpis: &Kpis) -> ChartSpec {
    gauge_chart(
        "engagement-gauge",
        "Engagement Rate (%)",
        kpis.engagement_rate,
        Dial {
            reference: ENGAGEMENT_REFERENCE,
            threshold: ENGAGEMENT_THRESHOLD,
            steps: [40.0, 70.0],
            bar: palette::GAUGE_ENGAGEMENT,
        },
    )
}

pub fn event_categories_chart(dataset: &Dataset) -> Result<ChartSpec, MetricsError> {
    let categories = MetricsCalculator::event_categories(&dataset.engagement)?;
    let points = categories
        .into_iter()
        .map(|(name, count)| DataPoint::new(name, count))
        .collect();

    Ok(
        ChartSpec::new("event-categories", ChartKind::Donut, "Event Categories Comparison")
            .series(Series::new("Count", points))
            .colors(ColorEncoding::per_point(&palette::BOLD))
            .hole(0.4)
            .size(640, 400),
    )
}

/// Largest engagement events, aggregated per event name with `op`.
pub fn top_events_chart(
    dataset: &Dataset,
    top_n: usize,
    op: AggregateOp,
) -> Result<ChartSpec, MetricsError> {
    let summary = aggregate(&dataset.engagement, &[EVENT_NAME], EVENT_COUNT, op)?;
    let rows = summary.top_n(top_n);

    Ok(ChartSpec::new(
        "top-events",
        ChartKind::HorizontalBar,
        format!("Top {} Engagement Events ({})", rows.len(), op),
    )
    .axes(format!("{} {}", op_title(op), EVENT_COUNT), EVENT_NAME)
    .series(Series::new(EVENT_COUNT, summary_points(&rows)))
    .colors(ColorEncoding::scale(&palette::VIRIDIS))
    .size(900, 500))
}

/// Weekly retention curve per acquisition cohort.
pub fn retention_cohorts_chart(dataset: &Dataset) -> Result<ChartSpec, MetricsError> {
    let cohorts = MetricsCalculator::cohorts(&dataset.consistency)?;

    let mut spec = ChartSpec::new(
        "retention-cohorts",
        ChartKind::Line,
        "Safari City Retention Cohorts by Week",
    )
    .axes("Week Since Acquisition", "Retention (% of Week 0 Users)")
    .colors(ColorEncoding::per_series(&palette::PALETTE))
    .suffix("%")
    .size(900, 500);

    for cohort in cohorts {
        let points = cohort
            .points
            .into_iter()
            .map(|(week, pct)| DataPoint::new(week, pct))
            .collect();
        spec = spec.series(Series::new(cohort.start, points));
    }
    Ok(spec)
}

fn top_devices(dataset: &Dataset, top_n: usize) -> Result<Vec<DataPoint>, AggregateError> {
    let top = top_n_rows(&dataset.devices, ACTIVE_USERS, top_n)?;
    Ok(labelled_values(&top, DEVICE_MODEL, ACTIVE_USERS))
}

pub fn device_bar_chart(dataset: &Dataset, top_n: usize) -> Result<ChartSpec, MetricsError> {
    let points = top_devices(dataset, top_n)?;
    Ok(ChartSpec::new(
        "devices",
        ChartKind::HorizontalBar,
        format!("Device Distribution (top {})", points.len()),
    )
    .axes(ACTIVE_USERS, DEVICE_MODEL)
    .series(Series::new(ACTIVE_USERS, points))
    .colors(ColorEncoding::Uniform {
        color: palette::DEVICE_BAR,
    })
    .size(640, 500))
}

pub fn device_share_chart(dataset: &Dataset, top_n: usize) -> Result<ChartSpec, MetricsError> {
    let points = top_devices(dataset, top_n)?;
    Ok(
        ChartSpec::new("device-share", ChartKind::Donut, "Market Share")
            .series(Series::new(ACTIVE_USERS, points))
            .colors(ColorEncoding::per_point(&palette::PALETTE))
            .hole(0.4)
            .size(640, 500),
    )
}

pub fn device_scatter_chart(dataset: &Dataset, top_n: usize) -> Result<ChartSpec, MetricsError> {
    // The scatter shows a wider slice than the bar and share charts.
    let points = top_devices(dataset, top_n + 5)?;
    Ok(ChartSpec::new(
        "device-scatter",
        ChartKind::Scatter,
        "Device Performance Distribution",
    )
    .axes(DEVICE_MODEL, ACTIVE_USERS)
    .series(Series::new(ACTIVE_USERS, points))
    .colors(ColorEncoding::scale(&palette::TURBO))
    .size(900, 500))
}

fn countries_by_users(dataset: &Dataset) -> Result<Summary, AggregateError> {
    aggregate(
        &dataset.countries,
        &[COUNTRY_NAME_COL],
        ACTIVE_USERS,
        AggregateOp::Sum,
    )
}

pub fn country_bar_chart(dataset: &Dataset) -> Result<ChartSpec, MetricsError> {
    let summary = countries_by_users(dataset)?;
    let rows = summary.sorted_by_value_desc();
    Ok(
        ChartSpec::new("countries", ChartKind::Bar, "Active Users by Country")
            .axes("Country", ACTIVE_USERS)
            .series(Series::new(ACTIVE_USERS, summary_points(&rows)))
            .colors(ColorEncoding::per_point(&palette::SET3))
            .size(900, 420),
    )
}

pub fn top_countries_chart(dataset: &Dataset) -> Result<ChartSpec, MetricsError> {
    let summary = countries_by_users(dataset)?;
    Ok(
        ChartSpec::new("top-countries", ChartKind::Donut, "Top 5 Countries")
            .series(Series::new(ACTIVE_USERS, summary_points(&summary.top_n(5))))
            .colors(ColorEncoding::per_point(&palette::SET3))
            .hole(0.3)
            .size(640, 420),
    )
}

pub fn region_share_chart(dataset: &Dataset) -> Result<ChartSpec, MetricsError> {
    let regions = MetricsCalculator::region_share(&dataset.countries)?;
    let points = regions
        .into_iter()
        .map(|(region, _, pct)| DataPoint::new(region, pct))
        .collect();
    Ok(
        ChartSpec::new("region-share", ChartKind::Bar, "User Concentration %")
            .axes("Region", "Share of active users (%)")
            .series(Series::new("Percentage", points))
            .colors(ColorEncoding::per_point(&palette::REGIONS))
            .suffix("%")
            .size(640, 420),
    )
}

/// Active users aggregated at the selected geographic level.
pub fn geo_summary_chart(
    dataset: &Dataset,
    geo: GeoGrouping,
    op: AggregateOp,
) -> Result<ChartSpec, MetricsError> {
    let summary = geo_summary(dataset, geo, op)?;
    Ok(summary_chart("geo-summary", &geo_title(geo, op), &summary))
}

/// Active users per group at the selected geographic level.
pub fn geo_summary(
    dataset: &Dataset,
    geo: GeoGrouping,
    op: AggregateOp,
) -> Result<Summary, AggregateError> {
    aggregate(&dataset.countries, &[geo.column()], ACTIVE_USERS, op)
}

pub fn geo_title(geo: GeoGrouping, op: AggregateOp) -> String {
    format!("{} Active Users by {}", op_title(op), geo.column())
}

/// Bar chart of any summary, in descending value order.
pub fn summary_chart(id: &str, title: &str, summary: &Summary) -> ChartSpec {
    let rows = summary.sorted_by_value_desc();
    ChartSpec::new(id, ChartKind::Bar, title)
        .axes(
            summary.group_by.join(" / "),
            format!("{} of {}", summary.op, summary.metric),
        )
        .series(Series::new(summary.metric.clone(), summary_points(&rows)))
        .colors(ColorEncoding::per_point(&palette::PALETTE))
        .size(900, 450)
}
