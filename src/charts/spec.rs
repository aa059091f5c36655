//! Chart descriptors: what to draw, independent of how it is drawn.

use super::palette;
use serde::{Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub fn hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

impl Serialize for Rgb {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.hex())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Bar,
    HorizontalBar,
    Line,
    Scatter,
    Donut,
    Funnel,
    Gauge,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataPoint {
    pub label: String,
    pub value: f64,
}

impl DataPoint {
    pub fn new(label: impl Into<String>, value: f64) -> Self {
        Self {
            label: label.into(),
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub name: String,
    pub points: Vec<DataPoint>,
}

impl Series {
    pub fn new(name: impl Into<String>, points: Vec<DataPoint>) -> Self {
        Self {
            name: name.into(),
            points,
        }
    }
}

/// How marks are colored.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ColorEncoding {
    Uniform { color: Rgb },
    /// Cycle through `palette` by point index.
    PerPoint { palette: Vec<Rgb> },
    /// Cycle through `palette` by series index.
    PerSeries { palette: Vec<Rgb> },
    /// Interpolate `stops` by value, from the series minimum to its maximum.
    Scale { stops: Vec<Rgb> },
}

impl ColorEncoding {
    pub fn per_point(palette: &[Rgb]) -> Self {
        ColorEncoding::PerPoint {
            palette: palette.to_vec(),
        }
    }

    pub fn per_series(palette: &[Rgb]) -> Self {
        ColorEncoding::PerSeries {
            palette: palette.to_vec(),
        }
    }

    pub fn scale(stops: &[Rgb]) -> Self {
        ColorEncoding::Scale {
            stops: stops.to_vec(),
        }
    }

    /// Color of one mark. `range` is the (min, max) value of its series.
    pub fn color_for(&self, series: usize, point: usize, value: f64, range: (f64, f64)) -> Rgb {
        match self {
            ColorEncoding::Uniform { color } => *color,
            ColorEncoding::PerPoint { palette } => cycle(palette, point),
            ColorEncoding::PerSeries { palette } => cycle(palette, series),
            ColorEncoding::Scale { stops } => {
                let (min, max) = range;
                let t = if max > min {
                    (value - min) / (max - min)
                } else {
                    1.0
                };
                palette::interpolate(stops, t)
            }
        }
    }
}

fn cycle(colors: &[Rgb], idx: usize) -> Rgb {
    if colors.is_empty() {
        palette::PRIMARY
    } else {
        colors[idx % colors.len()]
    }
}

/// Gauge dial settings: range, shaded steps, benchmark and alert line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GaugeSpec {
    pub max: f64,
    pub reference: f64,
    pub threshold: f64,
    pub steps: Vec<(f64, f64, Rgb)>,
}

/// A renderable chart: kind, axis bindings, data and color encoding.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub id: String,
    pub kind: ChartKind,
    pub title: String,
    pub x_label: Option<String>,
    pub y_label: Option<String>,
    pub series: Vec<Series>,
    pub colors: ColorEncoding,
    /// Appended to value annotations, e.g. "%".
    pub value_suffix: String,
    /// Donut hole as a fraction of the radius.
    pub hole: f64,
    pub gauge: Option<GaugeSpec>,
    pub width: u32,
    pub height: u32,
}

impl ChartSpec {
    pub fn new(id: impl Into<String>, kind: ChartKind, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            title: title.into(),
            x_label: None,
            y_label: None,
            series: Vec::new(),
            colors: ColorEncoding::Uniform {
                color: palette::PRIMARY,
            },
            value_suffix: String::new(),
            hole: 0.0,
            gauge: None,
            width: 640,
            height: 420,
        }
    }

    pub fn axes(mut self, x_label: impl Into<String>, y_label: impl Into<String>) -> Self {
        self.x_label = Some(x_label.into());
        self.y_label = Some(y_label.into());
        self
    }

    pub fn series(mut self, series: Series) -> Self {
        self.series.push(series);
        self
    }

    pub fn colors(mut self, colors: ColorEncoding) -> Self {
        self.colors = colors;
        self
    }

    pub fn suffix(mut self, suffix: &str) -> Self {
        self.value_suffix = suffix.to_string();
        self
    }

    pub fn hole(mut self, hole: f64) -> Self {
        self.hole = hole.clamp(0.0, 0.9);
        self
    }

    pub fn gauge(mut self, gauge: GaugeSpec) -> Self {
        self.gauge = Some(gauge);
        self
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Points of the first series.
    pub fn points(&self) -> &[DataPoint] {
        self.series
            .first()
            .map(|s| s.points.as_slice())
            .unwrap_or_default()
    }

    /// Largest value over all series, 0 when empty.
    pub fn max_value(&self) -> f64 {
        self.series
            .iter()
            .flat_map(|s| s.points.iter().map(|p| p.value))
            .filter(|v| v.is_finite())
            .fold(0.0, f64::max)
    }

    /// (min, max) of one series' finite values.
    pub fn series_range(&self, idx: usize) -> (f64, f64) {
        let values = self
            .series
            .get(idx)
            .into_iter()
            .flat_map(|s| s.points.iter().map(|p| p.value))
            .filter(|v| v.is_finite());
        values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        })
    }

    pub fn color_for(&self, series: usize, point: usize) -> Rgb {
        let value = self
            .series
            .get(series)
            .and_then(|s| s.points.get(point))
            .map(|p| p.value)
            .unwrap_or(0.0);
        self.colors
            .color_for(series, point, value, self.series_range(series))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_descriptor() {
        let spec = ChartSpec::new("top-events", ChartKind::HorizontalBar, "Top events")
            .axes("Event count", "Event name")
            .series(Series::new(
                "Event count",
                vec![DataPoint::new("first_open", 1000.0)],
            ))
            .colors(ColorEncoding::Uniform {
                color: Rgb(255, 0, 16),
            });

        let json = serde_json::to_value(&spec).unwrap();
        assert_eq!(json["kind"], "horizontal_bar");
        assert_eq!(json["x_label"], "Event count");
        assert_eq!(json["colors"]["mode"], "uniform");
        assert_eq!(json["colors"]["color"], "#ff0010");
        assert_eq!(json["series"][0]["points"][0]["label"], "first_open");
    }

    #[test]
    fn test_color_encodings() {
        let spec = ChartSpec::new("c", ChartKind::Bar, "c")
            .series(Series::new(
                "s",
                vec![
                    DataPoint::new("a", 0.0),
                    DataPoint::new("b", 5.0),
                    DataPoint::new("c", 10.0),
                ],
            ))
            .colors(ColorEncoding::scale(&palette::VIRIDIS));

        assert_eq!(spec.color_for(0, 0), palette::VIRIDIS[0]);
        assert_eq!(spec.color_for(0, 2), palette::VIRIDIS[4]);

        let cycling = ColorEncoding::per_point(&palette::FUNNEL);
        assert_eq!(cycling.color_for(0, 4, 0.0, (0.0, 1.0)), palette::FUNNEL[1]);
    }

    #[test]
    fn test_max_value_ignores_nan() {
        let spec = ChartSpec::new("c", ChartKind::Bar, "c").series(Series::new(
            "s",
            vec![DataPoint::new("a", f64::NAN), DataPoint::new("b", 3.0)],
        ));
        assert_eq!(spec.max_value(), 3.0);
        assert_eq!(spec.series_range(0), (3.0, 3.0));
    }
}
