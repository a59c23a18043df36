use crate::{detectors::extrema::ExtremumPoint, report::FeatureReport, signal::SeriesStore};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Axis {
    pub label: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Style {
    pub width: f32,
    pub color: Color,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color(pub u32);

impl Color {
    pub fn rgb(self) -> (u8, u8, u8) {
        (
            ((self.0 >> 16) & 0xFF) as u8,
            ((self.0 >> 8) & 0xFF) as u8,
            (self.0 & 0xFF) as u8,
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineSeries {
    pub name: String,
    pub points: Vec<[f64; 2]>,
    pub style: Style,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkerSeries {
    pub name: String,
    pub points: Vec<[f64; 2]>,
    pub size: u32,
    pub color: Color,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Series {
    Line(LineSeries),
    Markers(MarkerSeries),
}

impl Series {
    pub fn points(&self) -> &[[f64; 2]] {
        match self {
            Series::Line(line) => &line.points,
            Series::Markers(markers) => &markers.points,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Figure {
    pub title: Option<String>,
    pub x: Axis,
    pub y: Axis,
    pub series: Vec<Series>,
}

impl Figure {
    pub fn new(title: impl Into<Option<String>>) -> Self {
        Self {
            title: title.into(),
            x: Axis { label: None },
            y: Axis { label: None },
            series: Vec::new(),
        }
    }

    pub fn add_series(&mut self, series: Series) {
        self.series.push(series);
    }

    /// `(x_min, x_max, y_min, y_max)` over every series, or `None` when there are no points.
    pub fn bounds(&self) -> Option<(f64, f64, f64, f64)> {
        let mut points = self.series.iter().flat_map(|s| s.points().iter());
        let first = points.next()?;
        let init = (first[0], first[0], first[1], first[1]);
        Some(points.fold(init, |(x0, x1, y0, y1), p| {
            (x0.min(p[0]), x1.max(p[0]), y0.min(p[1]), y1.max(p[1]))
        }))
    }
}

pub trait PlotBackend {
    fn draw(&mut self, fig: &Figure) -> anyhow::Result<()>;
}

pub fn decimate_points(points: &[[f64; 2]], max_points: usize) -> Vec<[f64; 2]> {
    if points.len() <= max_points {
        return points.to_vec();
    }
    let bucket_size = points.len() as f64 / max_points as f64;
    let mut result = Vec::with_capacity(max_points);
    for i in 0..max_points {
        let start = (i as f64 * bucket_size).floor() as usize;
        if start >= points.len() {
            break;
        }
        result.push(points[start]);
    }
    result
}

/// Hours elapsed since `origin`, used as the x coordinate.
fn hours_since(origin: NaiveDateTime, t: NaiveDateTime) -> f64 {
    (t - origin).num_milliseconds() as f64 / 3_600_000.0
}

fn extremum_points(origin: NaiveDateTime, points: &[ExtremumPoint]) -> Vec<[f64; 2]> {
    points
        .iter()
        .map(|p| [hours_since(origin, p.timestamp), p.value])
        .collect()
}

/// Chart of the raw values, the moving average, and peak/low markers.
pub fn figure_from_report_limit(
    store: &SeriesStore,
    report: &FeatureReport,
    max_points: usize,
) -> Figure {
    let mut fig = Figure::new(Some("Voltage over time".into()));
    fig.y.label = Some("Value".into());
    let Some(origin) = store.first().map(|s| s.timestamp) else {
        return fig;
    };
    fig.x.label = Some(format!("Hours since {}", origin));

    let values: Vec<[f64; 2]> = store
        .samples()
        .iter()
        .map(|s| [hours_since(origin, s.timestamp), s.value])
        .collect();
    fig.add_series(Series::Line(LineSeries {
        name: "Values".into(),
        points: decimate_points(&values, max_points),
        style: Style {
            width: 1.4,
            color: Color(0x1F77B4),
        },
    }));

    let average: Vec<[f64; 2]> = report
        .moving_average
        .iter()
        .filter_map(|p| p.value.map(|v| [hours_since(origin, p.timestamp), v]))
        .collect();
    fig.add_series(Series::Line(LineSeries {
        name: format!("{}-sample MA", report.config.window),
        points: decimate_points(&average, max_points),
        style: Style {
            width: 2.0,
            color: Color(0xFF7F0E),
        },
    }));

    fig.add_series(Series::Markers(MarkerSeries {
        name: "Peaks".into(),
        points: extremum_points(origin, &report.peaks),
        size: 4,
        color: Color(0x2CA02C),
    }));
    fig.add_series(Series::Markers(MarkerSeries {
        name: "Lows".into(),
        points: extremum_points(origin, &report.lows),
        size: 4,
        color: Color(0xD62728),
    }));
    fig
}

pub fn figure_from_report(store: &SeriesStore, report: &FeatureReport) -> Figure {
    figure_from_report_limit(store, report, 2048)
}
