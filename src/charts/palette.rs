//! Color palettes shared by chart builders.

use super::spec::Rgb;

/// Default single-series color.
pub const PRIMARY: Rgb = Rgb(52, 152, 219);
pub const DEVICE_BAR: Rgb = Rgb(32, 178, 170);
pub const ALERT: Rgb = Rgb(214, 39, 40);
pub const POSITIVE: Rgb = Rgb(46, 160, 67);
pub const GAUGE_RETENTION: Rgb = Rgb(0, 0, 139);
pub const GAUGE_ENGAGEMENT: Rgb = Rgb(0, 100, 0);
pub const STEP_LIGHT: Rgb = Rgb(211, 211, 211);
pub const STEP_DARK: Rgb = Rgb(128, 128, 128);

pub const PALETTE: [Rgb; 10] = [
    Rgb(231, 76, 60),   // Red
    Rgb(46, 204, 113),  // Green
    Rgb(155, 89, 182),  // Purple
    Rgb(243, 156, 18),  // Orange
    Rgb(26, 188, 156),  // Teal
    Rgb(233, 30, 99),   // Pink
    Rgb(0, 188, 212),   // Cyan
    Rgb(255, 87, 34),   // Deep Orange
    Rgb(121, 85, 72),   // Brown
    Rgb(96, 125, 139),  // Blue Grey
];

pub const FUNNEL: [Rgb; 3] = [Rgb(255, 107, 107), Rgb(78, 205, 196), Rgb(69, 183, 209)];

pub const REGIONS: [Rgb; 4] = [
    Rgb(31, 119, 180),
    Rgb(255, 127, 14),
    Rgb(44, 160, 44),
    Rgb(214, 39, 40),
];

/// Pastel qualitative palette for per-country bars.
pub const SET3: [Rgb; 12] = [
    Rgb(141, 211, 199),
    Rgb(255, 255, 179),
    Rgb(190, 186, 218),
    Rgb(251, 128, 114),
    Rgb(128, 177, 211),
    Rgb(253, 180, 98),
    Rgb(179, 222, 105),
    Rgb(252, 205, 229),
    Rgb(217, 217, 217),
    Rgb(188, 128, 189),
    Rgb(204, 235, 197),
    Rgb(255, 237, 111),
];

pub const BOLD: [Rgb; 6] = [
    Rgb(127, 60, 141),
    Rgb(17, 165, 121),
    Rgb(57, 105, 172),
    Rgb(242, 183, 1),
    Rgb(231, 63, 116),
    Rgb(128, 186, 90),
];

/// Sequential scale, dark purple to yellow.
pub const VIRIDIS: [Rgb; 5] = [
    Rgb(68, 1, 84),
    Rgb(59, 82, 139),
    Rgb(33, 145, 140),
    Rgb(94, 201, 98),
    Rgb(253, 231, 37),
];

/// Sequential scale, blue through green to red.
pub const TURBO: [Rgb; 5] = [
    Rgb(48, 18, 59),
    Rgb(40, 188, 235),
    Rgb(164, 252, 60),
    Rgb(251, 128, 34),
    Rgb(122, 4, 3),
];

/// Linear interpolation over evenly spaced color stops, `t` in [0, 1].
pub fn interpolate(stops: &[Rgb], t: f64) -> Rgb {
    match stops.len() {
        0 => PRIMARY,
        1 => stops[0],
        n => {
            let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
            let scaled = t * (n - 1) as f64;
            let lower = (scaled.floor() as usize).min(n - 2);
            let frac = scaled - lower as f64;
            let (a, b) = (stops[lower], stops[lower + 1]);
            let mix = |x: u8, y: u8| (x as f64 + (y as f64 - x as f64) * frac).round() as u8;
            Rgb(mix(a.0, b.0), mix(a.1, b.1), mix(a.2, b.2))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interpolate_endpoints() {
        assert_eq!(interpolate(&VIRIDIS, 0.0), VIRIDIS[0]);
        assert_eq!(interpolate(&VIRIDIS, 1.0), VIRIDIS[4]);
        assert_eq!(interpolate(&VIRIDIS, 0.5), VIRIDIS[2]);
        assert_eq!(interpolate(&VIRIDIS, 7.0), VIRIDIS[4]);
    }

    #[test]
    fn test_interpolate_midpoint() {
        let stops = [Rgb(0, 0, 0), Rgb(200, 100, 50)];
        assert_eq!(interpolate(&stops, 0.5), Rgb(100, 50, 25));
    }
}
