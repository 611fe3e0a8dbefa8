use crate::export::file_stem;
use crate::query::SubField;
use crate::stability::StabilityPhase;
use plotters::prelude::*;
use std::ops::Range;
use std::path::{Path, PathBuf};

pub struct FieldVisualiser {
    output_dir: PathBuf,
    width: u32,
    height: u32,
    // Diverging map for signed perturbations, sequential map otherwise
    diverging: Box<dyn colorgrad::Gradient>,
    sequential: Box<dyn colorgrad::Gradient>,
}

impl FieldVisualiser {
    pub fn new(output_dir: &Path, width: u32, height: u32) -> std::io::Result<Self> {
        std::fs::create_dir_all(output_dir)?;

        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            width,
            height,
            diverging: Box::new(colorgrad::preset::rd_yl_bu()),
            sequential: Box::new(colorgrad::preset::viridis()),
        })
    }

    /// Draws `field` as a heat map over x/D and r/D; returns the image path.
    pub fn plot_field(
        &self,
        field: &SubField,
        label: &str,
        title: &str,
        frame: usize,
        symmetric: bool,
    ) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let filename = self.frame_path(label, frame);
        let root = BitMapBackend::new(&filename, (self.width, self.height)).into_drawing_area();
        root.fill(&WHITE)?;

        let x_edges = cell_edges(&field.x);
        let r_edges = cell_edges(&field.r);
        let (min_val, max_val) = if symmetric {
            let max_abs = field.max_abs();
            (-max_abs, max_abs)
        } else {
            field.bounds()
        };

        let mut chart = ChartBuilder::on(&root)
            .caption(title, ("sans-serif", 30))
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(50)
            .build_cartesian_2d(
                x_edges[0]..x_edges[x_edges.len() - 1],
                r_edges[0]..r_edges[r_edges.len() - 1],
            )?;

        chart
            .configure_mesh()
            .disable_mesh()
            .x_desc("x/D")
            .y_desc("r/D")
            .draw()?;

        let gradient = if symmetric {
            &self.diverging
        } else {
            &self.sequential
        };
        chart.draw_series(field.values.indexed_iter().map(|((i, k), &value)| {
            let color = value_to_color(gradient.as_ref(), value, min_val, max_val);
            Rectangle::new(
                [(x_edges[i], r_edges[k]), (x_edges[i + 1], r_edges[k + 1])],
                color.filled(),
            )
        }))?;

        root.present()?;
        // The backend borrows the path until it is dropped.
        drop(chart);
        drop(root);
        Ok(filename)
    }

    /// Draws Re(alpha) and Im(alpha) against x/D in two stacked panels.
    pub fn plot_alpha(
        &self,
        phase: &StabilityPhase,
        name: &str,
        title: &str,
    ) -> Result<PathBuf, Box<dyn std::error::Error>> {
        if phase.is_empty() {
            return Err(format!("{} has no stations", phase.source().display()).into());
        }
        let filename = self.output_dir.join(format!("{}.png", file_stem(name)));
        let root = BitMapBackend::new(&filename, (self.width, self.height)).into_drawing_area();
        root.fill(&WHITE)?;
        let area = root.titled(title, ("sans-serif", 30))?;
        let panels = area.split_evenly((2, 1));

        let x_range = axis_range(&phase.x);
        let re: Vec<f64> = phase.alpha.iter().map(|a| a.re).collect();
        let im: Vec<f64> = phase.alpha.iter().map(|a| a.im).collect();
        for (panel, (label, values, color)) in panels
            .iter()
            .zip([("Re(alpha)", re, BLUE), ("Im(alpha)", im, RED)])
        {
            let mut chart = ChartBuilder::on(panel)
                .margin(10)
                .x_label_area_size(40)
                .y_label_area_size(60)
                .build_cartesian_2d(x_range.clone(), axis_range(&values))?;
            chart.configure_mesh().x_desc("x/D").y_desc(label).draw()?;
            chart.draw_series(LineSeries::new(
                phase.x.iter().copied().zip(values.iter().copied()),
                &color,
            ))?;
        }

        root.present()?;
        drop(panels);
        drop(area);
        drop(root);
        Ok(filename)
    }

    /// Image path of `label` at `frame` under the output directory.
    pub fn frame_path(&self, label: &str, frame: usize) -> PathBuf {
        self.output_dir
            .join(format!("{}_{:04}.png", file_stem(label), frame))
    }
}

/// Cell boundaries halfway between coordinates, extended half a spacing
/// beyond the ends.
fn cell_edges(coords: &[f64]) -> Vec<f64> {
    if coords.len() == 1 {
        return vec![coords[0] - 0.5, coords[0] + 0.5];
    }
    let n = coords.len();
    let mut edges = Vec::with_capacity(n + 1);
    edges.push(coords[0] - 0.5 * (coords[1] - coords[0]));
    edges.extend(coords.windows(2).map(|w| 0.5 * (w[0] + w[1])));
    edges.push(coords[n - 1] + 0.5 * (coords[n - 1] - coords[n - 2]));
    edges
}

/// Data range padded by 5% on each side; a flat series gets a unit span.
fn axis_range(values: &[f64]) -> Range<f64> {
    let (lo, hi) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if !(hi > lo) {
        let centre = if lo.is_finite() { lo } else { 0.0 };
        return centre - 0.5..centre + 0.5;
    }
    let pad = 0.05 * (hi - lo);
    lo - pad..hi + pad
}

fn value_to_color(
    gradient: &dyn colorgrad::Gradient,
    value: f64,
    min_val: f64,
    max_val: f64,
) -> RGBColor {
    let normalized = if max_val > min_val {
        (value - min_val) / (max_val - min_val)
    } else {
        0.5
    };
    let normalized = normalized.clamp(0.0, 1.0);
    let color_rgba = gradient.at(normalized as f32).to_rgba8();
    RGBColor(color_rgba[0], color_rgba[1], color_rgba[2])
}
