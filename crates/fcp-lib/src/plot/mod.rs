use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::cycles::{CycleKind, CycleSelection, DEFAULT_ACTIVITY_THRESHOLD};
use crate::dataset::Dataset;
use crate::error::{FcpError, Result};
use crate::table::Field;
use crate::transforms::axis_values;

pub mod colormap;

pub use colormap::Colormap;

pub const DEFAULT_TITLE: &str = "Formation Cycle Data";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Axis {
    pub label: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Style {
    pub width: f32,
    pub color: Color,
}

/// Packed `0xRRGGBB` color.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color(pub u32);

impl Color {
    pub const BLACK: Color = Color(0x000000);

    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color(((r as u32) << 16) | ((g as u32) << 8) | b as u32)
    }

    pub fn channels(&self) -> (u8, u8, u8) {
        (
            ((self.0 >> 16) & 0xFF) as u8,
            ((self.0 >> 8) & 0xFF) as u8,
            (self.0 & 0xFF) as u8,
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineSeries {
    /// Legend entry; empty for continuation segments of the same file.
    pub name: String,
    pub points: Vec<[f64; 2]>,
    pub style: Style,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Series {
    Line(LineSeries),
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

    fn points(&self) -> impl Iterator<Item = &[f64; 2]> {
        self.series.iter().flat_map(|series| match series {
            Series::Line(line) => line.points.iter(),
        })
    }

    /// Data extent as `((x_min, x_max), (y_min, y_max))`, widened when flat.
    pub fn bounds(&self) -> ((f64, f64), (f64, f64)) {
        let mut x = (f64::INFINITY, f64::NEG_INFINITY);
        let mut y = (f64::INFINITY, f64::NEG_INFINITY);
        for p in self.points() {
            x = (x.0.min(p[0]), x.1.max(p[0]));
            y = (y.0.min(p[1]), y.1.max(p[1]));
        }
        (widen(x), widen(y))
    }
}

fn widen((lo, hi): (f64, f64)) -> (f64, f64) {
    if !lo.is_finite() || !hi.is_finite() {
        return (0.0, 1.0);
    }
    if lo == hi {
        let pad = if lo == 0.0 { 1.0 } else { lo.abs() * 0.05 };
        return (lo - pad, hi + pad);
    }
    (lo, hi)
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
        let sample = points[start];
        result.push(sample);
    }
    result
}

/// What to draw from each file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlotRequest {
    pub x: Field,
    pub y: Field,
    pub cycles: CycleSelection,
    /// Active material mass in grams, for specific capacity.
    pub active_mass: Option<f64>,
    pub threshold: f64,
}

impl Default for PlotRequest {
    fn default() -> Self {
        Self {
            x: Field::Time,
            y: Field::Potential,
            cycles: CycleSelection::All,
            active_mass: None,
            threshold: DEFAULT_ACTIVITY_THRESHOLD,
        }
    }
}

impl PlotRequest {
    fn labelled_figure(&self, title: Option<&str>) -> Figure {
        let mut fig = Figure::new(Some(title.unwrap_or(DEFAULT_TITLE).to_string()));
        let per_gram = self.active_mass.is_some();
        fig.x.label = Some(self.x.axis_label(per_gram).into());
        fig.y.label = Some(self.y.axis_label(per_gram).into());
        fig
    }
}

/// One selected cycle of one file, in plotting units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleTrace {
    pub file: String,
    /// 1-based chronological cycle number.
    pub number: usize,
    pub kind: CycleKind,
    pub points: Vec<[f64; 2]>,
}

/// Segment `dataset`, apply the cycle selection and extract x/y for each cycle.
pub fn cycle_traces(dataset: &Dataset, request: &PlotRequest) -> Result<Vec<CycleTrace>> {
    let set = dataset.compute_cycles(request.threshold)?;
    let kinds = dataset.kinds(&set)?;
    let mut traces = Vec::new();
    for number in dataset.select(&request.cycles, &set)? {
        let cycle = set.get(number)?;
        let xs = dataset.extract_cycle(request.x, &set, &cycle)?;
        let ys = dataset.extract_cycle(request.y, &set, &cycle)?;
        let xs = axis_values(request.x, &xs, request.active_mass)?;
        let ys = axis_values(request.y, &ys, request.active_mass)?;
        traces.push(CycleTrace {
            file: dataset.name().to_string(),
            number,
            kind: kinds[number - 1],
            points: xs.into_iter().zip(ys).map(|(x, y)| [x, y]).collect(),
        });
    }
    Ok(traces)
}

fn line(name: String, points: Vec<[f64; 2]>, color: Color) -> Series {
    Series::Line(LineSeries {
        name,
        points,
        style: Style {
            width: 0.8,
            color,
        },
    })
}

/// Series for one file in a single color; only the first carries the file name.
pub fn series_for_dataset(
    dataset: &Dataset,
    request: &PlotRequest,
    color: Color,
) -> Result<Vec<Series>> {
    let traces = cycle_traces(dataset, request)?;
    Ok(traces
        .into_iter()
        .enumerate()
        .map(|(i, trace)| {
            let name = if i == 0 { trace.file } else { String::new() };
            line(name, trace.points, color)
        })
        .collect())
}

pub fn single_file_figure(
    dataset: &Dataset,
    request: &PlotRequest,
    title: Option<&str>,
) -> Result<Figure> {
    let mut fig = request.labelled_figure(title);
    for series in series_for_dataset(dataset, request, Color::BLACK)? {
        fig.add_series(series);
    }
    Ok(fig)
}

/// One colormap color per file.
pub fn multi_file_figure(
    datasets: &[Dataset],
    request: &PlotRequest,
    colormap: Colormap,
    title: Option<&str>,
) -> Result<Figure> {
    let mut fig = request.labelled_figure(title);
    for (dataset, color) in datasets.iter().zip(colormap.colors(datasets.len())) {
        for series in series_for_dataset(dataset, request, color)? {
            fig.add_series(series);
        }
    }
    Ok(fig)
}

/// One colormap color and legend entry per selected cycle across all files.
pub fn cycle_analysis_figure(
    datasets: &[Dataset],
    request: &PlotRequest,
    colormap: Colormap,
    title: Option<&str>,
) -> Result<Figure> {
    let mut traces = Vec::new();
    for dataset in datasets {
        traces.extend(cycle_traces(dataset, request)?);
    }
    let colors = colormap.colors(traces.len());
    let mut fig = request.labelled_figure(title);
    for (trace, color) in traces.into_iter().zip(colors) {
        let kind = match trace.kind {
            CycleKind::Charge => "charge",
            CycleKind::Discharge => "discharge",
        };
        let name = format!("{} cycle {} ({})", trace.file, trace.number, kind);
        fig.add_series(line(name, trace.points, color));
    }
    Ok(fig)
}

/// Figure layout chosen by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlotMode {
    /// First file only, black lines.
    Single,
    /// Color per file.
    Multi,
    /// Color per selected cycle.
    Cycles,
}

impl FromStr for PlotMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "single" => Ok(PlotMode::Single),
            "multi" => Ok(PlotMode::Multi),
            "cycles" => Ok(PlotMode::Cycles),
            other => Err(format!("unknown plot mode '{}'", other)),
        }
    }
}

pub fn build_figure(
    mode: PlotMode,
    datasets: &[Dataset],
    request: &PlotRequest,
    colormap: Colormap,
    title: Option<&str>,
) -> Result<Figure> {
    match (mode, datasets.first()) {
        (_, None) => Err(FcpError::Load {
            file: "<none>".into(),
            reason: "no input files".into(),
        }),
        (PlotMode::Single, Some(first)) => single_file_figure(first, request, title),
        (PlotMode::Multi, _) => multi_file_figure(datasets, request, colormap, title),
        (PlotMode::Cycles, _) => cycle_analysis_figure(datasets, request, colormap, title),
    }
}
