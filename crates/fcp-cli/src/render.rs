use anyhow::Result;
use fcp_lib::plot::{decimate_points, Figure, PlotBackend, Series};
use log::warn;
use plotters::prelude::*;
use std::path::PathBuf;

/// Upper bound on points drawn per line.
const MAX_POINTS_PER_SERIES: usize = 4000;

/// Renders figures to a PNG file with plotters.
pub struct PngBackend {
    pub path: PathBuf,
    pub size: (u32, u32),
}

impl PngBackend {
    pub fn new(path: PathBuf, size: (u32, u32)) -> Self {
        Self { path, size }
    }
}

impl PlotBackend for PngBackend {
    fn draw(&mut self, fig: &Figure) -> anyhow::Result<()> {
        match draw_plotters_figure(self, fig, true) {
            Ok(()) => Ok(()),
            Err(err) => {
                // Text needs a system font; headless hosts may have none.
                warn!("rendering with text failed ({err:#}); retrying without labels");
                draw_plotters_figure(self, fig, false)
            }
        }
    }
}

fn draw_plotters_figure(target: &PngBackend, fig: &Figure, text: bool) -> Result<()> {
    let root = BitMapBackend::new(&target.path, target.size).into_drawing_area();
    root.fill(&WHITE)?;
    let ((x_min, x_max), (y_min, y_max)) = fig.bounds();
    let mut builder = ChartBuilder::on(&root);
    builder.margin(16);
    if text {
        builder
            .caption(
                fig.title.clone().unwrap_or_else(|| "Plot".into()),
                ("sans-serif", 24),
            )
            .x_label_area_size(45)
            .y_label_area_size(70);
    }
    let mut chart = builder.build_cartesian_2d(x_min..x_max, y_min..y_max)?;
    let mut mesh = chart.configure_mesh();
    mesh.light_line_style(&WHITE.mix(0.0))
        .bold_line_style(&BLACK.mix(0.15));
    if text {
        mesh.x_desc(fig.x.label.clone().unwrap_or_default())
            .y_desc(fig.y.label.clone().unwrap_or_default());
    } else {
        mesh.x_labels(0).y_labels(0);
    }
    mesh.draw()?;

    let mut labelled = false;
    for series in &fig.series {
        match series {
            Series::Line(line) => {
                let (r, g, b) = line.style.color.channels();
                let color = RGBColor(r, g, b);
                let width = (line.style.width * 2.0).ceil().max(1.0) as u32;
                let points = decimate_points(&line.points, MAX_POINTS_PER_SERIES);
                let drawn = chart.draw_series(LineSeries::new(
                    points.into_iter().map(|p| (p[0], p[1])),
                    ShapeStyle::from(&color).stroke_width(width),
                ))?;
                if text && !line.name.is_empty() {
                    labelled = true;
                    drawn
                        .label(line.name.clone())
                        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &color));
                }
            }
        }
    }
    if labelled {
        chart
            .configure_series_labels()
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK.mix(0.3))
            .draw()?;
    }
    root.present()?;
    Ok(())
}
