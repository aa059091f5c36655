//! JSON API: on-demand summaries and chart descriptors.

use super::error::AppError;
use super::params::{
    parse_columns, parse_geo, parse_op, parse_top, required, ChartQuery, SummaryQuery,
};
use super::AppState;
use crate::charts::{by_name, render_svg, ChartSpec, FigureParams, CHART_NAMES};
use crate::data::Dataset;
use crate::stats::{aggregate, AggregateOp, Summary};
use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

/// Aggregate one table of the dataset; unknown tables are a bad request.
pub(super) fn summarize(
    dataset: &Dataset,
    table: &str,
    group_by: &[String],
    metric: &str,
    op: AggregateOp,
) -> Result<Summary, AppError> {
    let df = dataset
        .table(table)
        .ok_or_else(|| AppError::InvalidInput(format!("unknown table '{table}'")))?;
    let columns: Vec<&str> = group_by.iter().map(String::as_str).collect();
    Ok(aggregate(df, &columns, metric, op)?)
}

pub async fn summary(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<Summary>, AppError> {
    let table = required(&query.table, "table")?;
    let group_by = parse_columns(&query.group_by);
    let metric = required(&query.metric, "metric")?;
    let op = parse_op(&query.op)?;
    tracing::debug!(table, ?group_by, metric, %op, "Summary requested");

    let summary = summarize(&state.dataset, table, &group_by, metric, op)?;
    tracing::debug!(groups = summary.len(), "Summary computed");
    Ok(Json(summary))
}

pub async fn chart_names() -> Json<&'static [&'static str]> {
    let names: &'static [&'static str] = &CHART_NAMES;
    Json(names)
}

fn build_chart(state: &AppState, name: &str, query: &ChartQuery) -> Result<ChartSpec, AppError> {
    let params = FigureParams {
        top_n: parse_top(&query.top, state.config.default_top_n)?,
        op: parse_op(&query.op)?,
        geo: parse_geo(&query.group_by)?,
    };
    tracing::debug!(name, ?params, "Chart requested");

    match by_name(&state.dataset, name, &params) {
        Some(chart) => Ok(chart?),
        None => Err(AppError::NotFound(format!("chart '{name}'"))),
    }
}

pub async fn chart(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Query(query): Query<ChartQuery>,
) -> Result<Json<ChartSpec>, AppError> {
    Ok(Json(build_chart(&state, &name, &query)?))
}

pub async fn chart_svg(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Query(query): Query<ChartQuery>,
) -> Result<impl IntoResponse, AppError> {
    let spec = build_chart(&state, &name, &query)?;
    let svg = render_svg(&spec)?;
    Ok(([(header::CONTENT_TYPE, "image/svg+xml")], svg))
}

pub async fn health() -> &'static str {
    "OK"
}
