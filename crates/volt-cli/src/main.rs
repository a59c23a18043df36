use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand};
use log::info;
use plotters::prelude::*;
use serde::Serialize;
use std::{
    io::{self, Read},
    path::{Path, PathBuf},
};
use volt_lib::{
    detectors::{
        acceleration::{find_accelerating_downslopes_with, Attribution},
        extrema::{find_lows, find_peaks},
        threshold::below_threshold,
    },
    io::csv::{self as csv_io, CsvLayout},
    metrics::trend::moving_average,
    plot::{figure_from_report, Figure, PlotBackend, Series},
    report::{read_config, FeatureConfig, FeatureReport},
    signal::SeriesStore,
};

#[derive(Parser)]
#[command(
    name = "volt",
    version,
    about = "Volt: feature extraction for voltage time series"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Where the series comes from and how to read it.
#[derive(Args, Debug)]
struct InputArgs {
    /// CSV file; stdin when omitted
    #[arg(long)]
    input: Option<PathBuf>,
    #[arg(long, default_value = "Timestamp")]
    timestamp_column: String,
    #[arg(long, default_value = "Values")]
    value_column: String,
    #[arg(long, default_value = "%d-%m-%Y %H:%M:%S")]
    timestamp_format: String,
    #[arg(long, default_value_t = ',')]
    delimiter: char,
    /// Sort rows by timestamp instead of rejecting out-of-order input
    #[arg(long)]
    sort: bool,
}

/// Analysis parameters; flags override values from `--config`. Each command
/// checks only the parameters it uses.
#[derive(Args, Debug)]
struct FeatureArgs {
    /// TOML file with `window`, `threshold` and `attribution`
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    window: Option<usize>,
    #[arg(long)]
    threshold: Option<f64>,
    #[arg(long, value_enum)]
    attribution: Option<Attribution>,
}

#[derive(Subcommand)]
enum Commands {
    /// Full feature report (moving average, peaks, lows, threshold and acceleration events)
    Analyze {
        #[command(flatten)]
        input: InputArgs,
        #[command(flatten)]
        features: FeatureArgs,
    },
    /// Trailing moving average
    Trend {
        #[command(flatten)]
        input: InputArgs,
        #[command(flatten)]
        features: FeatureArgs,
    },
    /// Local peaks
    Peaks {
        #[command(flatten)]
        input: InputArgs,
    },
    /// Local lows
    Lows {
        #[command(flatten)]
        input: InputArgs,
    },
    /// Samples strictly below the threshold
    Below {
        #[command(flatten)]
        input: InputArgs,
        #[command(flatten)]
        features: FeatureArgs,
    },
    /// Accelerating downward slopes
    Accel {
        #[command(flatten)]
        input: InputArgs,
        #[command(flatten)]
        features: FeatureArgs,
    },
    /// Render values, moving average, peaks and lows to a PNG
    Plot {
        #[command(flatten)]
        input: InputArgs,
        #[command(flatten)]
        features: FeatureArgs,
        #[arg(long)]
        out: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Commands::Analyze { input, features } => cmd_analyze(&input, &features)?,
        Commands::Trend { input, features } => cmd_trend(&input, &features)?,
        Commands::Peaks { input } => {
            let store = load_store(&input)?;
            print_json(&find_peaks(&store))?
        }
        Commands::Lows { input } => {
            let store = load_store(&input)?;
            print_json(&find_lows(&store))?
        }
        Commands::Below { input, features } => {
            let store = load_store(&input)?;
            let cfg = resolve_config(&features)?;
            cfg.validate_threshold()?;
            print_json(&below_threshold(&store, cfg.threshold))?
        }
        Commands::Accel { input, features } => {
            let store = load_store(&input)?;
            let cfg = resolve_config(&features)?;
            print_json(&find_accelerating_downslopes_with(&store, cfg.attribution))?
        }
        Commands::Plot {
            input,
            features,
            out,
        } => cmd_plot(&input, &features, &out)?,
    }
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

fn layout_from_args(args: &InputArgs) -> Result<CsvLayout> {
    if !args.delimiter.is_ascii() {
        return Err(anyhow!("delimiter must be a single ASCII character"));
    }
    Ok(CsvLayout {
        timestamp_col: args.timestamp_column.clone(),
        value_col: args.value_column.clone(),
        timestamp_format: args.timestamp_format.clone(),
        delimiter: args.delimiter as u8,
    })
}

fn load_store(args: &InputArgs) -> Result<SeriesStore> {
    let layout = layout_from_args(args)?;
    let store = match args.input.as_deref() {
        Some(path) => csv_io::read_series(path, &layout, args.sort)?,
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            csv_io::parse_series(buf.as_bytes(), &layout, args.sort)?
        }
    };
    info!("loaded {} samples", store.len());
    Ok(store)
}

fn resolve_config(args: &FeatureArgs) -> Result<FeatureConfig> {
    let mut cfg = match args.config.as_deref() {
        Some(path) => read_config(path)?,
        None => FeatureConfig::default(),
    };
    if let Some(window) = args.window {
        cfg.window = window;
    }
    if let Some(threshold) = args.threshold {
        cfg.threshold = threshold;
    }
    if let Some(attribution) = args.attribution {
        cfg.attribution = attribution;
    }
    Ok(cfg)
}

fn cmd_analyze(input: &InputArgs, features: &FeatureArgs) -> Result<()> {
    let store = load_store(input)?;
    let cfg = resolve_config(features)?;
    let report = FeatureReport::build(&store, &cfg)?;
    print_json(&report)
}

fn cmd_trend(input: &InputArgs, features: &FeatureArgs) -> Result<()> {
    let store = load_store(input)?;
    let cfg = resolve_config(features)?;
    cfg.validate_window()?;
    print_json(&moving_average(&store, cfg.window)?)
}

fn cmd_plot(input: &InputArgs, features: &FeatureArgs, out: &Path) -> Result<()> {
    let store = load_store(input)?;
    let cfg = resolve_config(features)?;
    let report = FeatureReport::build(&store, &cfg)?;
    let fig = figure_from_report(&store, &report);
    PngBackend::new(out).draw(&fig)?;
    info!("wrote {}", out.display());
    Ok(())
}

struct PngBackend<'a> {
    path: &'a Path,
    size: (u32, u32),
}

impl<'a> PngBackend<'a> {
    fn new(path: &'a Path) -> Self {
        Self {
            path,
            size: (960, 540),
        }
    }
}

impl PlotBackend for PngBackend<'_> {
    fn draw(&mut self, fig: &Figure) -> Result<()> {
        let root = BitMapBackend::new(self.path, self.size).into_drawing_area();
        root.fill(&WHITE)?;
        let (x_min, mut x_max, y_min, mut y_max) = fig.bounds().unwrap_or((0.0, 1.0, 0.0, 1.0));
        if x_max <= x_min {
            x_max = x_min + 1.0;
        }
        if y_max <= y_min {
            y_max = y_min + 1.0;
        }
        let mut chart = ChartBuilder::on(&root)
            .margin(10)
            .caption(
                fig.title.clone().unwrap_or_else(|| "Plot".into()),
                ("sans-serif", 24),
            )
            .x_label_area_size(30)
            .y_label_area_size(40)
            .build_cartesian_2d(x_min..x_max, y_min..y_max)?;
        let mut mesh = chart.configure_mesh();
        if let Some(label) = &fig.x.label {
            mesh.x_desc(label.as_str());
        }
        if let Some(label) = &fig.y.label {
            mesh.y_desc(label.as_str());
        }
        mesh.draw()?;
        for series in &fig.series {
            match series {
                Series::Line(line) => {
                    let (r, g, b) = line.style.color.rgb();
                    let color = RGBColor(r, g, b);
                    chart
                        .draw_series(LineSeries::new(
                            line.points.iter().map(|p| (p[0], p[1])),
                            color.stroke_width(line.style.width.round().max(1.0) as u32),
                        ))?
                        .label(line.name.clone())
                        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 16, y)], color));
                }
                Series::Markers(markers) => {
                    let (r, g, b) = markers.color.rgb();
                    let color = RGBColor(r, g, b);
                    let size = markers.size;
                    chart
                        .draw_series(
                            markers
                                .points
                                .iter()
                                .map(|p| Circle::new((p[0], p[1]), size, color.filled())),
                        )?
                        .label(markers.name.clone())
                        .legend(move |(x, y)| Circle::new((x + 8, y), size, color.filled()));
                }
            }
        }
        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
        root.present()?;
        Ok(())
    }
}
