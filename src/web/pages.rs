//! HTML pages of the dashboard, one handler per sidebar entry.

use super::api::summarize;
use super::error::AppError;
use super::params::{
    parse_columns, parse_geo, parse_op, parse_top, GeoQuery, SummaryQuery, TopQuery,
};
use super::AppState;
use crate::charts::figures::{self, GeoGrouping};
use crate::charts::{render_all, ChartSpec};
use crate::data::{column_names, f64_values, numeric_columns, TABLE_NAMES};
use crate::stats::{AggregateOp, MetricsCalculator, Summary};
use axum::{
    extract::{Query, State},
    http::{StatusCode, Uri},
    response::{Html, IntoResponse, Response},
};
use serde::Serialize;
use std::sync::Arc;
use tera::Context;

const TOP_CHOICES: [usize; 6] = [5, 10, 15, 20, 25, 30];

const FUNNEL_INSIGHTS: &[&str] = &[
    "Track player drop-off at each stage of the journey",
    "Identify critical retention bottlenecks",
    "Optimize onboarding experience based on conversion rates",
    "Monitor day-1 retention trends",
];

const ENGAGEMENT_INSIGHTS: &[&str] = &[
    "Top events indicate strong mid-game engagement loops",
    "session_start and user_engagement show healthy player activity",
    "Progress events suggest good game flow and difficulty balance",
    "Late-game events such as SafariRace_Complete need attention",
    "Engagement falls sharply from week 1 to week 2; by week 4 almost 90% of players have stopped",
];

const DEVICE_INSIGHTS: &[&str] = &[
    "Dominated by mid-range Android devices (Samsung A-series)",
    "Optimize performance for the top 10 device models, 70%+ of the user base",
    "Consider device-specific testing for Samsung SM-A055F and similar models",
    "Low-end device optimization is critical for market penetration",
];

const GEO_INSIGHTS: &[&str] = &[
    "The whole player base is in Africa",
    "Kenya and Nigeria account for over half of all users",
    "Kenya leads by country, but West Africa is the largest sub-region",
    "Opportunity for localization: language, currency, payment methods",
    "Target marketing campaigns at East and West African markets",
    "Consider regional partnerships and local payment gateways",
];

#[derive(Serialize)]
struct RenderedChart {
    id: String,
    title: String,
    svg: String,
}

#[derive(Serialize)]
struct Card {
    label: String,
    value: String,
}

#[derive(Serialize)]
struct SelectOption {
    value: String,
    label: String,
    selected: bool,
}

#[derive(Serialize)]
struct Control {
    name: &'static str,
    label: &'static str,
    options: Vec<SelectOption>,
    /// Changing this control discards the other selections.
    resets: bool,
}

impl Control {
    fn new<I>(name: &'static str, label: &'static str, values: I, selected: &str) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let options = values
            .into_iter()
            .map(|value| SelectOption {
                selected: value == selected,
                label: value.clone(),
                value,
            })
            .collect();
        Self {
            name,
            label,
            options,
            resets: false,
        }
    }

    fn top(selected: usize) -> Self {
        let mut choices = TOP_CHOICES.to_vec();
        if !choices.contains(&selected) {
            choices.push(selected);
            choices.sort_unstable();
        }
        Self::new(
            "top",
            "Top N",
            choices.into_iter().map(|n| n.to_string()),
            &selected.to_string(),
        )
    }

    fn op(selected: AggregateOp) -> Self {
        Self::new(
            "op",
            "Aggregation",
            AggregateOp::ALL.iter().map(|op| op.to_string()),
            selected.as_str(),
        )
    }
}

#[derive(Serialize)]
struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

#[derive(Serialize, Default)]
struct PageView {
    active: &'static str,
    heading: String,
    action: &'static str,
    cards: Vec<Card>,
    controls: Vec<Control>,
    charts: Vec<RenderedChart>,
    insights_title: String,
    insights: Vec<&'static str>,
    table: Option<Table>,
}

/// Plain number for tables: integers without decimals, NaN as n/a.
fn fmt_number(value: f64) -> String {
    if !value.is_finite() {
        "n/a".to_string()
    } else if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}

fn render_charts(specs: Vec<ChartSpec>) -> Result<Vec<RenderedChart>, AppError> {
    render_all(&specs)
        .into_iter()
        .zip(specs)
        .map(|(svg, spec)| -> Result<RenderedChart, AppError> {
            Ok(RenderedChart {
                id: spec.id,
                title: spec.title,
                svg: svg?,
            })
        })
        .collect()
}

fn render(state: &AppState, template: &str, view: &PageView) -> Result<Html<String>, AppError> {
    let context = Context::from_serialize(view)?;
    Ok(Html(state.templates.render(template, &context)?))
}

fn summary_table(summary: &Summary) -> Table {
    let mut headers = summary.group_by.clone();
    headers.push(format!("{} of {}", summary.op, summary.metric));
    let rows = summary
        .rows
        .iter()
        .map(|row| {
            let mut cells = row.key.clone();
            cells.push(fmt_number(row.value));
            cells
        })
        .collect();
    Table { headers, rows }
}

pub async fn overview(State(state): State<Arc<AppState>>) -> Result<Html<String>, AppError> {
    let dataset = &state.dataset;
    let kpis = MetricsCalculator::kpis(&dataset.engagement)?;

    let cards = vec![
        Card {
            label: "Total Installs".into(),
            value: fmt_number(kpis.total_installs),
        },
        Card {
            label: "Session Starts".into(),
            value: fmt_number(kpis.session_starts),
        },
        Card {
            label: "Day-1 Retention".into(),
            value: format!("{:.1}%", kpis.retention_rate),
        },
        Card {
            label: "Engagement Rate".into(),
            value: format!("{:.1}%", kpis.engagement_rate),
        },
    ];
    let charts = render_charts(vec![
        figures::retention_gauge(&kpis),
        figures::engagement_gauge(&kpis),
        figures::event_categories_chart(dataset)?,
        figures::funnel_chart(dataset)?,
    ])?;

    render(
        &state,
        "page.html",
        &PageView {
            active: "overview",
            heading: "Safari City Analytics Overview".into(),
            cards,
            charts,
            ..Default::default()
        },
    )
}

pub async fn funnel(State(state): State<Arc<AppState>>) -> Result<Html<String>, AppError> {
    let dataset = &state.dataset;
    let kpis = MetricsCalculator::kpis(&dataset.engagement)?;
    let stages = MetricsCalculator::funnel(dataset)?;

    let charts = render_charts(vec![
        figures::funnel_chart(dataset)?,
        figures::retention_gauge(&kpis),
        figures::engagement_gauge(&kpis),
    ])?;
    let table = Table {
        headers: vec![
            "Stage".into(),
            "Players".into(),
            "% of initial".into(),
            "% of previous".into(),
        ],
        rows: stages
            .iter()
            .map(|s| {
                vec![
                    s.name.clone(),
                    fmt_number(s.count),
                    format!("{:.1}%", s.pct_of_initial),
                    format!("{:.1}%", s.pct_of_previous),
                ]
            })
            .collect(),
    };

    render(
        &state,
        "page.html",
        &PageView {
            active: "funnel",
            heading: "Player Funnel Analysis".into(),
            charts,
            table: Some(table),
            insights_title: "Funnel Insights".into(),
            insights: FUNNEL_INSIGHTS.to_vec(),
            ..Default::default()
        },
    )
}

pub async fn engagement(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TopQuery>,
) -> Result<Html<String>, AppError> {
    let top = parse_top(&query.top, state.config.default_top_n)?;
    let op = parse_op(&query.op)?;
    tracing::debug!(top, %op, "Rendering engagement page");

    let dataset = &state.dataset;
    let charts = render_charts(vec![
        figures::top_events_chart(dataset, top, op)?,
        figures::event_categories_chart(dataset)?,
        figures::retention_cohorts_chart(dataset)?,
    ])?;

    render(
        &state,
        "page.html",
        &PageView {
            active: "engagement",
            heading: "Player Engagement Metrics".into(),
            action: "/engagement",
            controls: vec![Control::top(top), Control::op(op)],
            charts,
            insights_title: "Engagement Insights".into(),
            insights: ENGAGEMENT_INSIGHTS.to_vec(),
            ..Default::default()
        },
    )
}

pub async fn devices(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TopQuery>,
) -> Result<Html<String>, AppError> {
    let top = parse_top(&query.top, state.config.default_top_n)?;
    tracing::debug!(top, "Rendering devices page");

    let dataset = &state.dataset;
    let charts = render_charts(vec![
        figures::device_bar_chart(dataset, top)?,
        figures::device_share_chart(dataset, top)?,
        figures::device_scatter_chart(dataset, top)?,
    ])?;

    render(
        &state,
        "page.html",
        &PageView {
            active: "devices",
            heading: "Device Analytics".into(),
            action: "/devices",
            controls: vec![Control::top(top)],
            charts,
            insights_title: "Device Insights".into(),
            insights: DEVICE_INSIGHTS.to_vec(),
            ..Default::default()
        },
    )
}

pub async fn geography(
    State(state): State<Arc<AppState>>,
    Query(query): Query<GeoQuery>,
) -> Result<Html<String>, AppError> {
    let geo = parse_geo(&query.group_by)?;
    let op = parse_op(&query.op)?;
    tracing::debug!(%geo, %op, "Rendering geography page");

    let dataset = &state.dataset;
    let summary = figures::geo_summary(dataset, geo, op)?;
    let charts = render_charts(vec![
        figures::country_bar_chart(dataset)?,
        figures::top_countries_chart(dataset)?,
        figures::region_share_chart(dataset)?,
        figures::summary_chart("geo-summary", &figures::geo_title(geo, op), &summary),
    ])?;

    render(
        &state,
        "page.html",
        &PageView {
            active: "geography",
            heading: "Geographic Distribution".into(),
            action: "/geography",
            controls: vec![
                Control::new(
                    "group_by",
                    "Group by",
                    GeoGrouping::ALL.iter().map(|g| g.to_string()),
                    geo.as_str(),
                ),
                Control::op(op),
            ],
            charts,
            table: Some(summary_table(&summary)),
            insights_title: "Geographic Insights".into(),
            insights: GEO_INSIGHTS.to_vec(),
            ..Default::default()
        },
    )
}

pub async fn insights(State(state): State<Arc<AppState>>) -> Result<Html<String>, AppError> {
    render(
        &state,
        "insights.html",
        &PageView {
            active: "insights",
            heading: "Strategic Insights & Recommendations".into(),
            ..Default::default()
        },
    )
}

/// Generic aggregation over any loaded table.
pub async fn explore(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SummaryQuery>,
) -> Result<Html<String>, AppError> {
    let table = query
        .table
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(TABLE_NAMES[0]);
    let df = state
        .dataset
        .table(table)
        .ok_or_else(|| AppError::InvalidInput(format!("unknown table '{table}'")))?;

    let columns = column_names(df);
    let numeric = numeric_columns(df);
    let mut group_by = parse_columns(&query.group_by);
    if group_by.is_empty() {
        let first_label = columns
            .iter()
            .find(|c| !numeric.contains(c))
            .or_else(|| columns.first());
        group_by.extend(first_label.cloned());
    }
    let metric = match query.metric.as_deref().map(str::trim).filter(|m| !m.is_empty()) {
        Some(m) => m.to_string(),
        None => numeric
            .iter()
            .find(|c| !group_by.contains(c))
            .cloned()
            .ok_or_else(|| {
                AppError::InvalidInput(format!("table '{table}' has no numeric column"))
            })?,
    };
    let op = parse_op(&query.op)?;
    tracing::debug!(table, ?group_by, %metric, %op, "Rendering explore page");

    let summary = summarize(&state.dataset, table, &group_by, &metric, op)?;
    let title = format!("{} of {} by {}", op, metric, group_by.join(" / "));
    let charts = render_charts(vec![figures::summary_chart("explore", &title, &summary)])?;

    let values: Vec<f64> = f64_values(df, &metric).into_iter().flatten().collect();
    let stats = MetricsCalculator::describe(&values);
    let cards = vec![
        ("Values", stats.count as f64),
        ("Mean", stats.mean),
        ("Median", stats.median),
        ("Std dev", stats.std),
        ("P05", stats.p05),
        ("P95", stats.p95),
    ]
    .into_iter()
    .map(|(label, value)| Card {
        label: format!("{label} of {metric}"),
        value: fmt_number(value),
    })
    .collect();

    let mut table_control = Control::new(
        "table",
        "Table",
        TABLE_NAMES.iter().map(|t| t.to_string()),
        table,
    );
    table_control.resets = true;
    let selected_group = group_by.first().cloned().unwrap_or_default();

    render(
        &state,
        "page.html",
        &PageView {
            active: "explore",
            heading: "Explore".into(),
            action: "/explore",
            cards,
            controls: vec![
                table_control,
                Control::new("group_by", "Group by", columns.clone(), &selected_group),
                Control::new("metric", "Metric", columns, &metric),
                Control::op(op),
            ],
            charts,
            table: (!summary.is_empty()).then(|| summary_table(&summary)),
            ..Default::default()
        },
    )
}

pub async fn not_found(State(state): State<Arc<AppState>>, uri: Uri) -> Response {
    tracing::debug!(path = %uri.path(), "Unknown route");
    let mut context = Context::new();
    context.insert("active", "");
    context.insert("pathname", uri.path());
    match state.templates.render("not_found.html", &context) {
        Ok(body) => (StatusCode::NOT_FOUND, Html(body)).into_response(),
        Err(e) => AppError::from(e).into_response(),
    }
}
