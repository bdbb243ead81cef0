//! Line chart rendering.

use anyhow::{Context, Result};
use plotters::prelude::*;
use std::ops::Range;
use std::path::Path;

/// Point marker drawn on top of a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    None,
    Circle,
    Cross,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesStyle {
    pub color: RGBColor,
    pub marker: Marker,
}

impl SeriesStyle {
    pub fn new(color: RGBColor, marker: Marker) -> Self {
        Self { color, marker }
    }
}

/// One labeled line
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub label: Option<String>,
    pub points: Vec<(f64, f64)>,
    pub style: SeriesStyle,
}

/// Everything needed to draw one chart file
#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    pub title: String,
    pub x_desc: String,
    pub y_desc: String,
    pub series: Vec<Series>,
    pub size: (u32, u32),
}

impl Chart {
    pub fn new(title: impl Into<String>, x_desc: impl Into<String>, y_desc: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            x_desc: x_desc.into(),
            y_desc: y_desc.into(),
            series: Vec::new(),
            size: (1200, 800),
        }
    }

    pub fn with_size(mut self, size: (u32, u32)) -> Self {
        self.size = size;
        self
    }

    pub fn push(&mut self, label: Option<String>, points: Vec<(f64, f64)>, style: SeriesStyle) {
        self.series.push(Series { label, points, style });
    }

    /// Finite points across all series
    pub fn point_count(&self) -> usize {
        self.series.iter().map(|s| finite_points(&s.points).count()).sum()
    }

    fn ranges(&self) -> (Range<f64>, Range<f64>) {
        let points = || self.series.iter().flat_map(|s| finite_points(&s.points));
        (
            padded_range(points().map(|(x, _)| x)),
            padded_range(points().map(|(_, y)| y)),
        )
    }
}

const PALETTE: [RGBColor; 6] = [BLUE, RED, GREEN, MAGENTA, CYAN, BLACK];

/// Distinct style for the `i`-th overlaid series
pub fn palette(i: usize) -> SeriesStyle {
    SeriesStyle::new(PALETTE[i % PALETTE.len()], Marker::None)
}

fn finite_points(points: &[(f64, f64)]) -> impl Iterator<Item = (f64, f64)> + '_ {
    points
        .iter()
        .copied()
        .filter(|(x, y)| x.is_finite() && y.is_finite())
}

/// Range covering all values with 5% padding on each side
fn padded_range<I: Iterator<Item = f64>>(values: I) -> Range<f64> {
    let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });

    if min > max {
        return 0.0..1.0;
    }
    if min == max {
        let pad = if min == 0.0 { 1.0 } else { min.abs() * 0.1 };
        return (min - pad)..(max + pad);
    }

    let pad = (max - min) * 0.05;
    (min - pad)..(max + pad)
}

/// Draw a chart to an SVG file, creating parent directories and replacing any
/// existing file
pub fn render<P: AsRef<Path>>(chart: &Chart, path: P) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory: {}", parent.display()))?;
    }

    let (x_range, y_range) = chart.ranges();

    let root = SVGBackend::new(path, chart.size).into_drawing_area();
    root.fill(&WHITE)?;

    let mut ctx = ChartBuilder::on(&root)
        .caption(&chart.title, ("sans-serif", 26))
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(70)
        .build_cartesian_2d(x_range, y_range)?;

    ctx.configure_mesh()
        .axis_desc_style(("sans-serif", 16))
        .x_desc(chart.x_desc.as_str())
        .y_desc(chart.y_desc.as_str())
        .draw()?;

    for series in &chart.series {
        let color = series.style.color;
        let points: Vec<(f64, f64)> = finite_points(&series.points).collect();

        let anno = ctx.draw_series(LineSeries::new(points.iter().copied(), color.stroke_width(2)))?;
        if let Some(label) = &series.label {
            anno.label(label.as_str())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
        }

        match series.style.marker {
            Marker::None => {}
            Marker::Circle => {
                ctx.draw_series(points.iter().map(|p| Circle::new(*p, 4, color.filled())))?;
            }
            Marker::Cross => {
                ctx.draw_series(points.iter().map(|p| Cross::new(*p, 5, color.stroke_width(2))))?;
            }
        }
    }

    if chart.series.iter().any(|s| s.label.is_some()) {
        ctx.configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
    }

    root.present()
        .with_context(|| format!("Failed to write chart: {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn range_is_padded() {
        let r = padded_range([0.0, 10.0].into_iter());
        assert_eq!(r, -0.5..10.5);
    }

    #[test]
    fn degenerate_ranges_are_widened() {
        assert_eq!(padded_range(std::iter::empty()), 0.0..1.0);
        assert_eq!(padded_range([0.0].into_iter()), -1.0..1.0);
        let r = padded_range([50.0, 50.0].into_iter());
        assert_eq!(r, 45.0..55.0);
    }

    #[test]
    fn non_finite_points_are_ignored() {
        let mut chart = Chart::new("t", "x", "y");
        chart.push(None, vec![(0.0, 1.0), (1.0, f64::NAN), (2.0, 3.0)], palette(0));
        chart.push(None, vec![(f64::INFINITY, 1.0)], palette(1));
        assert_eq!(chart.point_count(), 2);
        let (x, y) = chart.ranges();
        let close = |a: f64, b: f64| (a - b).abs() < 1e-9;
        assert!(close(x.start, -0.1) && close(x.end, 2.1));
        assert!(close(y.start, 0.9) && close(y.end, 3.1));
    }

    #[test]
    fn styles_cycle() {
        assert_eq!(palette(0).color, BLUE);
        assert_eq!(palette(6).color, BLUE);
        assert_eq!(palette(1).color, RED);
        assert_eq!(palette(1).marker, Marker::None);
    }

    #[test]
    fn renders_into_new_directory() {
        let dir = std::env::temp_dir().join(format!("nsplot-plot-{}", std::process::id()));
        let path = dir.join("nested").join("chart.svg");

        let mut chart = Chart::new("NumOfNodes vs Throughput", "NumOfNodes", "Throughput");
        chart.push(
            Some("AODV".to_string()),
            vec![(20.0, 1.0), (40.0, 2.0), (60.0, 1.5), (80.0, 3.0)],
            SeriesStyle::new(BLUE, Marker::Circle),
        );
        chart.push(
            Some("RAODV".to_string()),
            vec![(20.0, 1.2), (40.0, 2.1), (60.0, 1.9), (80.0, 3.3)],
            SeriesStyle::new(RED, Marker::Cross),
        );
        render(&chart, &path).unwrap();

        let svg = fs::read_to_string(&path).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("NumOfNodes vs Throughput"));

        // overwriting is allowed
        render(&chart, &path).unwrap();

        fs::remove_dir_all(&dir).unwrap();
    }
}
