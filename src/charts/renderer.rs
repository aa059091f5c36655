//! Static Chart Renderer
//! Draws chart descriptors as SVG documents with plotters.
//!
//! Layout per kind:
//! - Bar / horizontal bar / line / scatter: cartesian chart over categorical segments
//! - Donut: annulus sectors with percentage labels and a legend on the right
//! - Funnel: centered bars, widths proportional to the first stage
//! - Gauge: horizontal track with shaded steps, value bar and threshold line

use super::palette;
use super::spec::{ChartKind, ChartSpec, Rgb};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use rayon::prelude::*;
use std::f64::consts::PI;
use thiserror::Error;

const FONT: &str = "sans-serif";
const LABEL_CHARS: usize = 16;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Drawing failed: {0}")]
    Drawing(String),
}

impl<E: std::error::Error + Send + Sync> From<DrawingAreaErrorKind<E>> for RenderError {
    fn from(err: DrawingAreaErrorKind<E>) -> Self {
        RenderError::Drawing(err.to_string())
    }
}

type Area<'a> = DrawingArea<SVGBackend<'a>, Shift>;

fn to_color(rgb: Rgb) -> RGBColor {
    RGBColor(rgb.0, rgb.1, rgb.2)
}

fn centered(size: u32) -> TextStyle<'static> {
    TextStyle::from((FONT, f64::from(size)).into_font())
        .pos(Pos::new(HPos::Center, VPos::Center))
}

fn left_aligned(size: u32) -> TextStyle<'static> {
    TextStyle::from((FONT, f64::from(size)).into_font())
        .pos(Pos::new(HPos::Left, VPos::Center))
}

/// Value annotation: percentages with one decimal, counts abbreviated.
pub fn format_value(value: f64, suffix: &str) -> String {
    if !value.is_finite() {
        return "n/a".to_string();
    }
    if suffix == "%" {
        return format!("{value:.1}%");
    }
    let abs = value.abs();
    let text = if abs >= 1_000_000.0 {
        format!("{:.1}M", value / 1_000_000.0)
    } else if abs >= 1_000.0 {
        format!("{:.1}k", value / 1_000.0)
    } else if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    };
    format!("{text}{suffix}")
}

fn short_label(label: &str) -> String {
    if label.chars().count() <= LABEL_CHARS {
        label.to_string()
    } else {
        let head: String = label.chars().take(LABEL_CHARS - 1).collect();
        format!("{head}…")
    }
}

fn headroom(max: f64) -> f64 {
    if max > 0.0 {
        max * 1.15
    } else {
        1.0
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value.max(0.0)
    } else {
        0.0
    }
}

/// Render a chart descriptor to a standalone SVG document.
pub fn render_svg(spec: &ChartSpec) -> Result<String, RenderError> {
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (spec.width, spec.height)).into_drawing_area();
        root.fill(&WHITE)?;

        let empty = match spec.kind {
            ChartKind::Line => spec.series.iter().all(|s| s.points.is_empty()),
            _ => spec.points().is_empty(),
        };
        if empty {
            draw_placeholder(&root, spec)?;
        } else {
            match spec.kind {
                ChartKind::Bar => draw_bars(&root, spec)?,
                ChartKind::HorizontalBar => draw_horizontal_bars(&root, spec)?,
                ChartKind::Line => draw_lines(&root, spec)?,
                ChartKind::Scatter => draw_scatter(&root, spec)?,
                ChartKind::Donut => draw_donut(&root, spec)?,
                ChartKind::Funnel => draw_funnel(&root, spec)?,
                ChartKind::Gauge => draw_gauge(&root, spec)?,
            }
        }
        root.present()?;
    }
    Ok(svg)
}

/// Render several charts on the rayon pool, keeping input order.
pub fn render_all(specs: &[ChartSpec]) -> Vec<Result<String, RenderError>> {
    specs.par_iter().map(render_svg).collect()
}

fn draw_placeholder(root: &Area, spec: &ChartSpec) -> Result<(), RenderError> {
    let area = root.titled(&spec.title, (FONT, 20))?;
    let (w, h) = area.dim_in_pixel();
    area.draw(&Text::new(
        "No data",
        (w as i32 / 2, h as i32 / 2),
        centered(16).color(&RGBColor(120, 120, 120)),
    ))?;
    Ok(())
}

fn draw_bars(root: &Area, spec: &ChartSpec) -> Result<(), RenderError> {
    let points = spec.points();
    let n = points.len();
    let labels: Vec<String> = points.iter().map(|p| short_label(&p.label)).collect();

    let mut chart = ChartBuilder::on(root)
        .caption(&spec.title, (FONT, 20))
        .margin(12)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d((0..n).into_segmented(), 0f64..headroom(spec.max_value()))?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n)
        .x_label_formatter(&|v| match v {
            SegmentValue::CenterOf(i) => labels.get(*i).cloned().unwrap_or_default(),
            _ => String::new(),
        })
        .x_desc(spec.x_label.clone().unwrap_or_default())
        .y_desc(spec.y_label.clone().unwrap_or_default())
        .draw()?;

    chart.draw_series(points.iter().enumerate().map(|(i, p)| {
        let color = to_color(spec.color_for(0, i));
        let mut bar = Rectangle::new(
            [
                (SegmentValue::Exact(i), 0.0),
                (SegmentValue::Exact(i + 1), finite_or_zero(p.value)),
            ],
            color.filled(),
        );
        bar.set_margin(0, 0, 6, 6);
        bar
    }))?;

    chart.draw_series(points.iter().enumerate().map(|(i, p)| {
        Text::new(
            format_value(p.value, &spec.value_suffix),
            (SegmentValue::CenterOf(i), finite_or_zero(p.value)),
            (FONT, 12.0).into_font(),
        )
    }))?;
    Ok(())
}

fn draw_horizontal_bars(root: &Area, spec: &ChartSpec) -> Result<(), RenderError> {
    let points = spec.points();
    let n = points.len();
    // First point on top.
    let row = |i: usize| n - 1 - i;
    let labels: Vec<String> = points.iter().map(|p| short_label(&p.label)).collect();

    let mut chart = ChartBuilder::on(root)
        .caption(&spec.title, (FONT, 20))
        .margin(12)
        .x_label_area_size(45)
        .y_label_area_size(140)
        .build_cartesian_2d(0f64..headroom(spec.max_value()), (0..n).into_segmented())?;

    chart
        .configure_mesh()
        .disable_y_mesh()
        .y_labels(n)
        .y_label_formatter(&|v| match v {
            SegmentValue::CenterOf(r) if *r < n => labels[n - 1 - *r].clone(),
            _ => String::new(),
        })
        .x_desc(spec.x_label.clone().unwrap_or_default())
        .draw()?;

    chart.draw_series(points.iter().enumerate().map(|(i, p)| {
        let color = to_color(spec.color_for(0, i));
        let mut bar = Rectangle::new(
            [
                (0.0, SegmentValue::Exact(row(i))),
                (finite_or_zero(p.value), SegmentValue::Exact(row(i) + 1)),
            ],
            color.filled(),
        );
        bar.set_margin(3, 3, 0, 0);
        bar
    }))?;

    chart.draw_series(points.iter().enumerate().map(|(i, p)| {
        Text::new(
            format!(" {}", format_value(p.value, &spec.value_suffix)),
            (finite_or_zero(p.value), SegmentValue::CenterOf(row(i))),
            (FONT, 11.0).into_font(),
        )
    }))?;
    Ok(())
}

/// Category labels over all series, in order of first appearance.
fn categories(spec: &ChartSpec) -> Vec<String> {
    let mut labels: Vec<String> = Vec::new();
    for point in spec.series.iter().flat_map(|s| s.points.iter()) {
        if !labels.contains(&point.label) {
            labels.push(point.label.clone());
        }
    }
    labels
}

fn draw_lines(root: &Area, spec: &ChartSpec) -> Result<(), RenderError> {
    let categories = categories(spec);
    let n = categories.len();

    let mut chart = ChartBuilder::on(root)
        .caption(&spec.title, (FONT, 20))
        .margin(12)
        .x_label_area_size(45)
        .y_label_area_size(70)
        .build_cartesian_2d((0..n).into_segmented(), 0f64..headroom(spec.max_value()))?;

    chart
        .configure_mesh()
        .x_labels(n)
        .x_label_formatter(&|v| match v {
            SegmentValue::CenterOf(i) => categories
                .get(*i)
                .map(|c| short_label(c))
                .unwrap_or_default(),
            _ => String::new(),
        })
        .x_desc(spec.x_label.clone().unwrap_or_default())
        .y_desc(spec.y_label.clone().unwrap_or_default())
        .draw()?;

    for (s, series) in spec.series.iter().enumerate() {
        let color = to_color(spec.color_for(s, 0));
        let coords: Vec<(SegmentValue<usize>, f64)> = series
            .points
            .iter()
            .filter(|p| p.value.is_finite())
            .filter_map(|p| {
                categories
                    .iter()
                    .position(|c| c == &p.label)
                    .map(|i| (SegmentValue::CenterOf(i), p.value))
            })
            .collect();

        chart
            .draw_series(LineSeries::new(coords.clone(), color.stroke_width(3)))?
            .label(series.name.clone())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(3)));
        chart.draw_series(
            coords
                .iter()
                .map(|(x, y)| Circle::new((x.clone(), *y), 4, color.filled())),
        )?;
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(WHITE.mix(0.85))
        .border_style(&BLACK)
        .draw()?;
    Ok(())
}

fn draw_scatter(root: &Area, spec: &ChartSpec) -> Result<(), RenderError> {
    let points = spec.points();
    let n = points.len();
    let max = spec.max_value();
    let labels: Vec<String> = points.iter().map(|p| short_label(&p.label)).collect();

    let mut chart = ChartBuilder::on(root)
        .caption(&spec.title, (FONT, 20))
        .margin(12)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d((0..n).into_segmented(), 0f64..headroom(max))?;

    chart
        .configure_mesh()
        .x_labels(n)
        .x_label_formatter(&|v| match v {
            SegmentValue::CenterOf(i) => labels.get(*i).cloned().unwrap_or_default(),
            _ => String::new(),
        })
        .x_desc(spec.x_label.clone().unwrap_or_default())
        .y_desc(spec.y_label.clone().unwrap_or_default())
        .draw()?;

    chart.draw_series(points.iter().enumerate().map(|(i, p)| {
        let value = finite_or_zero(p.value);
        let radius = if max > 0.0 { 4.0 + 21.0 * value / max } else { 4.0 };
        let color = to_color(spec.color_for(0, i));
        Circle::new(
            (SegmentValue::CenterOf(i), value),
            radius.round() as i32,
            color.mix(0.75).filled(),
        )
    }))?;
    Ok(())
}

/// Polygon outline of an annulus sector between two angles (radians).
fn sector(center: (i32, i32), outer: f64, inner: f64, start: f64, end: f64) -> Vec<(i32, i32)> {
    let steps = (((end - start) / 0.04).ceil() as usize).max(2);
    let at = |r: f64, a: f64| {
        (
            center.0 + (r * a.cos()).round() as i32,
            center.1 + (r * a.sin()).round() as i32,
        )
    };

    let mut outline: Vec<(i32, i32)> = (0..=steps)
        .map(|k| at(outer, start + (end - start) * k as f64 / steps as f64))
        .collect();
    if inner > 0.0 {
        outline.extend(
            (0..=steps)
                .rev()
                .map(|k| at(inner, start + (end - start) * k as f64 / steps as f64)),
        );
    } else {
        outline.push(center);
    }
    outline
}

fn draw_donut(root: &Area, spec: &ChartSpec) -> Result<(), RenderError> {
    let area = root.titled(&spec.title, (FONT, 20))?;
    let (w, h) = area.dim_in_pixel();
    let (w, h) = (w as i32, h as i32);
    let legend_x = w * 2 / 3;
    let center = (legend_x / 2, h / 2);
    let outer = ((legend_x / 2).min(h / 2) - 16).max(10) as f64;
    let inner = outer * spec.hole;

    let points = spec.points();
    let total: f64 = points.iter().map(|p| finite_or_zero(p.value)).sum();
    let mut angle = -PI / 2.0;

    for (i, p) in points.iter().enumerate() {
        let color = to_color(spec.color_for(0, i));
        let value = finite_or_zero(p.value);
        let pct = if total > 0.0 { value / total * 100.0 } else { 0.0 };

        if value > 0.0 && total > 0.0 {
            let sweep = value / total * 2.0 * PI;
            area.draw(&Polygon::new(
                sector(center, outer, inner, angle, angle + sweep),
                color.filled(),
            ))?;

            let mid = angle + sweep / 2.0;
            let r = if inner > 0.0 { (outer + inner) / 2.0 } else { outer * 0.62 };
            let pos = (
                center.0 + (r * mid.cos()).round() as i32,
                center.1 + (r * mid.sin()).round() as i32,
            );
            if pct >= 3.0 {
                area.draw(&Text::new(format!("{pct:.1}%"), pos, centered(12)))?;
            }
            angle += sweep;
        }

        let y = 24 + i as i32 * 22;
        area.draw(&Rectangle::new(
            [(legend_x, y - 6), (legend_x + 12, y + 6)],
            color.filled(),
        ))?;
        area.draw(&Text::new(
            format!(
                "{} ({})",
                short_label(&p.label),
                format_value(p.value, &spec.value_suffix)
            ),
            (legend_x + 18, y),
            left_aligned(12),
        ))?;
    }
    Ok(())
}

fn draw_funnel(root: &Area, spec: &ChartSpec) -> Result<(), RenderError> {
    let area = root.titled(&spec.title, (FONT, 20))?;
    let (w, h) = area.dim_in_pixel();
    let (w, h) = (w as i32, h as i32);

    let points = spec.points();
    let initial = points.first().map(|p| finite_or_zero(p.value)).unwrap_or(0.0);
    let max = spec.max_value();
    let slot = ((h - 10) / points.len() as i32).max(1);
    let full_width = (w - 40) as f64;
    let mut previous = initial;

    for (i, p) in points.iter().enumerate() {
        let value = finite_or_zero(p.value);
        let width = if max > 0.0 {
            (full_width * value / max).max(2.0)
        } else {
            2.0
        };
        let top = 5 + i as i32 * slot;
        let half = (width / 2.0).round() as i32;
        area.draw(&Rectangle::new(
            [(w / 2 - half, top), (w / 2 + half, top + slot - 6)],
            to_color(spec.color_for(0, i)).filled(),
        ))?;

        let of_initial = if initial > 0.0 { value / initial * 100.0 } else { 0.0 };
        let of_previous = if previous > 0.0 { value / previous * 100.0 } else { 0.0 };
        previous = value;
        area.draw(&Text::new(
            format!(
                "{}: {} ({of_initial:.0}% of initial, {of_previous:.0}% of previous)",
                p.label,
                format_value(p.value, "")
            ),
            (w / 2, top + (slot - 6) / 2),
            centered(12),
        ))?;
    }
    Ok(())
}

fn draw_gauge(root: &Area, spec: &ChartSpec) -> Result<(), RenderError> {
    let area = root.titled(&spec.title, (FONT, 18))?;
    let (w, _) = area.dim_in_pixel();
    let w = w as i32;

    let value = spec.points().first().map(|p| p.value).unwrap_or(0.0);
    let (max, reference, threshold, steps) = match &spec.gauge {
        Some(g) => (g.max, Some(g.reference), Some(g.threshold), g.steps.clone()),
        None => (headroom(value), None, None, Vec::new()),
    };
    let max = if max > 0.0 { max } else { 1.0 };
    let (left, right, top, bottom) = (30, w - 30, 20, 60);
    let x_at = |v: f64| left + ((right - left) as f64 * (v / max).clamp(0.0, 1.0)).round() as i32;

    area.draw(&Rectangle::new(
        [(left, top), (right, bottom)],
        ShapeStyle::from(&BLACK).stroke_width(1),
    ))?;
    for (from, to, color) in &steps {
        area.draw(&Rectangle::new(
            [(x_at(*from), top + 1), (x_at(*to), bottom - 1)],
            to_color(*color).filled(),
        ))?;
    }
    area.draw(&Rectangle::new(
        [(left, top + 12), (x_at(finite_or_zero(value)), bottom - 12)],
        to_color(spec.color_for(0, 0)).filled(),
    ))?;
    if let Some(threshold) = threshold {
        let x = x_at(threshold);
        area.draw(&PathElement::new(
            vec![(x, top - 6), (x, bottom + 6)],
            to_color(palette::ALERT).stroke_width(4),
        ))?;
    }

    for k in 0..=4 {
        let tick = max * k as f64 / 4.0;
        area.draw(&Text::new(
            format_value(tick, ""),
            (x_at(tick), bottom + 14),
            centered(11),
        ))?;
    }

    area.draw(&Text::new(
        format_value(value, &spec.value_suffix),
        (w / 2, bottom + 50),
        centered(30),
    ))?;
    if let Some(reference) = reference {
        let delta = value - reference;
        let (arrow, color) = if delta >= 0.0 {
            ("▲", to_color(palette::POSITIVE))
        } else {
            ("▼", to_color(palette::ALERT))
        };
        area.draw(&Text::new(
            format!("{arrow} {:+.1} vs {reference:.0}", delta),
            (w / 2, bottom + 85),
            centered(14).color(&color),
        ))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charts::spec::{ColorEncoding, DataPoint, GaugeSpec, Series};

    fn sample(kind: ChartKind) -> ChartSpec {
        ChartSpec::new("sample", kind, "Sample Chart")
            .axes("Event name", "Event count")
            .series(Series::new(
                "first",
                vec![
                    DataPoint::new("first_open", 1000.0),
                    DataPoint::new("session_start", 260.0),
                    DataPoint::new("progress", 130.0),
                ],
            ))
            .series(Series::new(
                "second",
                vec![
                    DataPoint::new("first_open", 800.0),
                    DataPoint::new("progress", 90.0),
                ],
            ))
            .colors(ColorEncoding::per_point(&crate::charts::palette::FUNNEL))
            .hole(0.4)
    }

    #[test]
    fn test_renders_every_kind() {
        for kind in [
            ChartKind::Bar,
            ChartKind::HorizontalBar,
            ChartKind::Line,
            ChartKind::Scatter,
            ChartKind::Donut,
            ChartKind::Funnel,
        ] {
            let svg = render_svg(&sample(kind)).unwrap();
            assert!(svg.starts_with("<svg"), "{kind:?} did not produce svg");
            assert!(svg.contains("Sample Chart"), "{kind:?} lost its title");
        }
    }

    #[test]
    fn test_renders_gauge() {
        let spec = ChartSpec::new("g", ChartKind::Gauge, "Retention")
            .series(Series::new("r", vec![DataPoint::new("r", 26.0)]))
            .suffix("%")
            .gauge(GaugeSpec {
                max: 100.0,
                reference: 30.0,
                threshold: 50.0,
                steps: vec![(0.0, 25.0, Rgb(211, 211, 211))],
            });

        let svg = render_svg(&spec).unwrap();
        assert!(svg.contains("26.0%"));
        assert!(svg.contains("vs 30"));
    }

    #[test]
    fn test_empty_chart_renders_placeholder() {
        let spec = ChartSpec::new("empty", ChartKind::Bar, "Nothing here");
        let svg = render_svg(&spec).unwrap();
        assert!(svg.contains("No data"));
    }

    #[test]
    fn test_render_all_keeps_order() {
        let specs = vec![
            ChartSpec::new("a", ChartKind::Bar, "Alpha"),
            sample(ChartKind::Bar),
        ];
        let rendered = render_all(&specs);
        assert_eq!(rendered.len(), 2);
        assert!(rendered[0].as_ref().unwrap().contains("Alpha"));
        assert!(rendered[1].as_ref().unwrap().contains("Sample Chart"));
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(26.04, "%"), "26.0%");
        assert_eq!(format_value(1500.0, ""), "1.5k");
        assert_eq!(format_value(2_300_000.0, ""), "2.3M");
        assert_eq!(format_value(42.0, ""), "42");
        assert_eq!(format_value(f64::NAN, ""), "n/a");
    }

    #[test]
    fn test_short_label() {
        assert_eq!(short_label("first_open"), "first_open");
        let long = short_label("SafariRace_Complete_Bonus_Round");
        assert_eq!(long.chars().count(), LABEL_CHARS);
        assert!(long.ends_with('…'));
    }
}
