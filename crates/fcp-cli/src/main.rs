use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use fcp_lib::{
    io::{load_dataset, LoadOptions},
    plot::{build_figure, cycle_traces, Colormap, CycleTrace, PlotBackend, PlotMode, PlotRequest},
    ColumnMapping, ColumnResolver, CycleKind, CycleSelection, Dataset, Field,
    DEFAULT_ACTIVITY_THRESHOLD,
};
use log::info;
use serde::Serialize;
use std::path::{Path, PathBuf};

mod config;
mod render;

use config::{parse_delimiter, read_config, PlotConfig};
use render::PngBackend;

#[derive(Parser)]
#[command(
    name = "fcp",
    version,
    about = "Formation cycle plotter: segment cycler exports into charge/discharge cycles and plot them"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum AxisField {
    Time,
    Potential,
    Capacity,
    Current,
}

impl From<AxisField> for Field {
    fn from(value: AxisField) -> Self {
        match value {
            AxisField::Time => Field::Time,
            AxisField::Potential => Field::Potential,
            AxisField::Capacity => Field::Capacity,
            AxisField::Current => Field::Current,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ModeArg {
    Single,
    Multi,
    Cycles,
}

impl From<ModeArg> for PlotMode {
    fn from(value: ModeArg) -> Self {
        match value {
            ModeArg::Single => PlotMode::Single,
            ModeArg::Multi => PlotMode::Multi,
            ModeArg::Cycles => PlotMode::Cycles,
        }
    }
}

/// How input files are read and prepared.
#[derive(Args, Clone, Debug, Default)]
struct LoadArgs {
    /// Read a header row and match columns by name instead of the fixed export order
    #[arg(long)]
    auto_detect: bool,
    /// Field delimiter (`tab`, `semicolon`, `comma` or a single character)
    #[arg(long)]
    delimiter: Option<String>,
    /// Values use a decimal point (default for --auto-detect)
    #[arg(long, conflicts_with = "decimal_comma")]
    decimal_point: bool,
    /// Values use a decimal comma (default for the fixed export layout)
    #[arg(long)]
    decimal_comma: bool,
    /// Minimum absolute current counted as activity
    #[arg(long)]
    threshold: Option<f64>,
    /// Keep rows before the first active row and the original time origin
    #[arg(long)]
    no_trim: bool,
    /// Parse input through polars instead of the csv reader
    #[cfg(feature = "polars")]
    #[arg(long)]
    polars: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print column mapping and cycle summary for each file as JSON lines
    Inspect {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[command(flatten)]
        load: LoadArgs,
    },
    /// Print the selected cycles of one file as JSON series
    Series {
        file: PathBuf,
        #[arg(long, default_value = "time")]
        x: AxisField,
        #[arg(long, default_value = "potential")]
        y: AxisField,
        /// 'discharge K', 'charge K', a cycle number, or 'all'
        #[arg(long)]
        cycles: Option<String>,
        /// Active material mass in grams
        #[arg(long)]
        mass: Option<f64>,
        #[command(flatten)]
        load: LoadArgs,
    },
    /// Render files to a PNG via plotters
    Plot {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[arg(long)]
        out: PathBuf,
        #[arg(long)]
        mode: Option<ModeArg>,
        #[arg(long)]
        x: Option<AxisField>,
        #[arg(long)]
        y: Option<AxisField>,
        /// 'discharge K', 'charge K', a cycle number, or 'all'
        #[arg(long)]
        cycles: Option<String>,
        /// Active material mass in grams
        #[arg(long)]
        mass: Option<f64>,
        #[arg(long)]
        colormap: Option<String>,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        width: Option<u32>,
        #[arg(long)]
        height: Option<u32>,
        /// TOML file with plot defaults
        #[arg(long)]
        config: Option<PathBuf>,
        #[command(flatten)]
        load: LoadArgs,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Commands::Inspect { files, load } => cmd_inspect(&files, &load)?,
        Commands::Series {
            file,
            x,
            y,
            cycles,
            mass,
            load,
        } => cmd_series(&file, x.into(), y.into(), cycles.as_deref(), mass, &load)?,
        Commands::Plot {
            files,
            out,
            mode,
            x,
            y,
            cycles,
            mass,
            colormap,
            title,
            width,
            height,
            config,
            load,
        } => {
            let config = match config {
                Some(path) => read_config(&path)?,
                None => PlotConfig::default(),
            };
            let load = merge_load_args(load, &config);
            let opts = PlotOptions {
                mode: mode.map(PlotMode::from).or(config.mode).unwrap_or(PlotMode::Single),
                x: x.map(Field::from).or(config.x).unwrap_or(Field::Time),
                y: y.map(Field::from).or(config.y).unwrap_or(Field::Potential),
                cycles: cycles.or(config.cycles),
                mass: mass.or(config.active_mass),
                colormap: colormap.or(config.colormap),
                title: title.or(config.title),
                size: (
                    width.or(config.width).unwrap_or(1000),
                    height.or(config.height).unwrap_or(600),
                ),
            };
            cmd_plot(&files, &out, &opts, &load)?
        }
    }
    Ok(())
}

fn merge_load_args(mut load: LoadArgs, config: &PlotConfig) -> LoadArgs {
    load.auto_detect = load.auto_detect || config.load.auto_detect.unwrap_or(false);
    load.delimiter = load.delimiter.or_else(|| config.load.delimiter.clone());
    if !load.decimal_point && !load.decimal_comma {
        match config.load.decimal_comma {
            Some(true) => load.decimal_comma = true,
            Some(false) => load.decimal_point = true,
            None => {}
        }
    }
    load.threshold = load.threshold.or(config.threshold);
    load
}

impl LoadArgs {
    fn options(&self) -> Result<LoadOptions> {
        let mut options = if self.auto_detect {
            LoadOptions::auto_detect()
        } else {
            LoadOptions::default()
        };
        if let Some(text) = &self.delimiter {
            options.delimiter = Some(parse_delimiter(text)?);
        }
        if self.decimal_point {
            options.decimal_comma = false;
        } else if self.decimal_comma {
            options.decimal_comma = true;
        }
        Ok(options)
    }

    fn threshold(&self) -> f64 {
        self.threshold.unwrap_or(DEFAULT_ACTIVITY_THRESHOLD)
    }

    #[cfg(feature = "polars")]
    fn load(&self, path: &Path) -> Result<Dataset> {
        let options = self.options()?;
        if self.polars {
            return Ok(fcp_lib::io::frame::load_dataset_polars(path, &options)?);
        }
        Ok(load_dataset(path, &options)?)
    }

    #[cfg(not(feature = "polars"))]
    fn load(&self, path: &Path) -> Result<Dataset> {
        Ok(load_dataset(path, &self.options()?)?)
    }

    /// Load, then trim to the first active row and zero the time axis.
    fn prepare(&self, path: &Path) -> Result<Dataset> {
        let dataset = self.load(path)?;
        info!(
            "loaded {} ({} rows, mapping {:?})",
            dataset.name(),
            dataset.row_count(),
            dataset.mapping()
        );
        if self.no_trim {
            return Ok(dataset);
        }
        Ok(dataset.trim_to_active(self.threshold())?.normalize_time())
    }
}

#[derive(Serialize)]
struct CycleSummary {
    number: usize,
    start: usize,
    end: usize,
    kind: CycleKind,
}

#[derive(Serialize)]
struct InspectReport {
    file: String,
    rows: usize,
    resolver: &'static str,
    mapping: ColumnMapping,
    cycles: Vec<CycleSummary>,
    discharge: usize,
    charge: usize,
}

fn cmd_inspect(files: &[PathBuf], load: &LoadArgs) -> Result<()> {
    let resolver = match load.options()?.resolver {
        ColumnResolver::Fixed(_) => "fixed",
        ColumnResolver::Patterns => "patterns",
    };
    for path in files {
        let dataset = load.prepare(path)?;
        let set = dataset.compute_cycles(load.threshold())?;
        let kinds = dataset.kinds(&set)?;
        let classified = dataset.classify(&set)?;
        let cycles = set
            .cycles()
            .iter()
            .zip(kinds)
            .enumerate()
            .map(|(i, (cycle, kind))| CycleSummary {
                number: i + 1,
                start: cycle.start,
                end: cycle.end,
                kind,
            })
            .collect();
        let report = InspectReport {
            file: dataset.name().to_string(),
            rows: dataset.row_count(),
            resolver,
            mapping: *dataset.mapping(),
            cycles,
            discharge: classified.discharge.len(),
            charge: classified.charge.len(),
        };
        println!("{}", serde_json::to_string(&report)?);
    }
    Ok(())
}

#[derive(Serialize)]
struct SeriesOutput {
    file: String,
    x: Field,
    y: Field,
    x_label: &'static str,
    y_label: &'static str,
    traces: Vec<CycleTrace>,
}

fn parse_selection(cycles: Option<&str>) -> Result<CycleSelection> {
    Ok(cycles.unwrap_or("all").parse::<CycleSelection>()?)
}

fn cmd_series(
    path: &Path,
    x: Field,
    y: Field,
    cycles: Option<&str>,
    mass: Option<f64>,
    load: &LoadArgs,
) -> Result<()> {
    let request = PlotRequest {
        x,
        y,
        cycles: parse_selection(cycles)?,
        active_mass: mass,
        threshold: load.threshold(),
    };
    let dataset = load.prepare(path)?;
    let traces = cycle_traces(&dataset, &request)?;
    let output = SeriesOutput {
        file: dataset.name().to_string(),
        x,
        y,
        x_label: x.axis_label(mass.is_some()),
        y_label: y.axis_label(mass.is_some()),
        traces,
    };
    println!("{}", serde_json::to_string(&output)?);
    Ok(())
}

struct PlotOptions {
    mode: PlotMode,
    x: Field,
    y: Field,
    cycles: Option<String>,
    mass: Option<f64>,
    colormap: Option<String>,
    title: Option<String>,
    size: (u32, u32),
}

fn cmd_plot(files: &[PathBuf], out: &Path, opts: &PlotOptions, load: &LoadArgs) -> Result<()> {
    let request = PlotRequest {
        x: opts.x,
        y: opts.y,
        cycles: parse_selection(opts.cycles.as_deref())?,
        active_mass: opts.mass,
        threshold: load.threshold(),
    };
    let colormap = match &opts.colormap {
        Some(name) => name.parse::<Colormap>()?,
        None => Colormap::default(),
    };
    let inputs = match opts.mode {
        PlotMode::Single => &files[..1],
        PlotMode::Multi | PlotMode::Cycles => files,
    };
    let mut datasets = Vec::with_capacity(inputs.len());
    for path in inputs {
        datasets.push(
            load.prepare(path)
                .with_context(|| format!("preparing {}", path.display()))?,
        );
    }
    let figure = build_figure(
        opts.mode,
        &datasets,
        &request,
        colormap,
        opts.title.as_deref(),
    )?;
    let mut backend = PngBackend::new(out.to_path_buf(), opts.size);
    backend.draw(&figure)?;
    info!("plot saved to {}", out.display());
    Ok(())
}
