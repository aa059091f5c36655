//! Charts module - Chart descriptors, figure builders and SVG rendering

pub mod figures;
pub mod palette;
mod renderer;
pub mod spec;

pub use figures::{by_name, FigureParams, GeoGrouping, CHART_NAMES};
pub use renderer::{render_all, render_svg, RenderError};
pub use spec::ChartSpec;
