use anyhow::{anyhow, Context, Result};
use clap::Parser;
use jet_stability_fields::config::Config;
use jet_stability_fields::export::write_field_set;
use jet_stability_fields::query::{FieldLabel, FieldQuery, FieldSummary};
use jet_stability_fields::visualisation::FieldVisualiser;
use jet_stability_fields::{DataDirectory, FieldContext};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Reconstructs total jet fields from RANS mean flow and PSE perturbations"
)]
struct Args {
    /// TOML run configuration
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Override the phase of the oscillation period, in percent
    #[arg(long)]
    phase: Option<f64>,

    /// Override the disturbance amplitude
    #[arg(long)]
    amplitude: Option<f64>,

    /// Print per-quantity statistics of the mean flow and the total field
    #[arg(long)]
    summary: bool,

    /// Plot the local wavenumber alpha(x) of the stability record
    #[arg(long)]
    alpha: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let args = Args::parse();
    let mut config = Config::from_file(&args.config)?;
    if let Some(phase) = args.phase {
        config.total.phase_percent = phase;
        config.total.frames = 1;
    }
    if let Some(amplitude) = args.amplitude {
        config.total.amplitude = amplitude;
    }
    if args.alpha {
        config.visualization.plot_alpha = true;
    }
    config.validate()?;
    config.print_summary();

    let store = DataDirectory::new(&config.data.root)?;
    let context = FieldContext::load(
        Arc::new(store),
        config.conversion.ambient,
        config.conversion.pressure_scaling,
    )?;
    let case_id = config.case.case_id;
    let field = context
        .perturbation(config.case.strouhal, case_id)
        .with_context(|| {
            format!(
                "Failed to load case {} at St={}",
                case_id, config.case.strouhal
            )
        })?;
    let (nx, nr) = field.grid().dim();
    println!(
        "Loaded case {} at St={}: {} x {} grid ({} of {} mean-flow stations shared), Mach {:.5}",
        case_id,
        field.frequency(),
        nx,
        nr,
        field.shared_axial_points(),
        field.mean_flow().native_axial_grid().len(),
        context.catalog().get_mach(case_id)?
    );

    let labels = config.visualization.labels()?;
    let window = config.visualization.window()?;
    let visualiser = FieldVisualiser::new(
        &config.visualization.output_dir,
        config.visualization.image_width,
        config.visualization.image_height,
    )
    .with_context(|| {
        format!(
            "Failed to create output directory '{}'",
            config.visualization.output_dir.display()
        )
    })?;

    if config.visualization.plot_alpha {
        let name = format!("alpha_case{}_{}", case_id, field.selector().strouhal_tag());
        let title = format!("alpha (case {}, St={})", case_id, field.frequency());
        let path = visualiser
            .plot_alpha(field.stability_phase(), &name, &title)
            .map_err(|e| anyhow!("Failed to plot alpha: {}", e))?;
        println!("Saved alpha plot: {}", path.display());
    }

    for (frame, phase) in config.total.phases().into_iter().enumerate() {
        let query = FieldQuery::new(&field, phase, config.total.amplitude)?;
        info!(frame, phase, "rendering frame");

        for label in &labels {
            let sub = query.select(label, &window)?;
            let title = format!("{} (case {}, St={}, {:.0}%)", label, case_id, field.frequency(), phase);
            let path = visualiser
                .plot_field(&sub, &label.to_string(), &title, frame, label.symmetric_scale())
                .map_err(|e| anyhow!("Failed to render {}: {}", label, e))?;
            println!("Saved frame: {}", path.display());
        }

        if args.summary {
            if frame == 0 {
                println!("--- Mean flow on the perturbation grid ---");
                print_summaries(&query.mean_summaries()?);
            }
            println!("--- Total field at {:.1}% of the period ---", phase);
            print_summaries(&query.total_summaries()?);
        }

        if let Some(export) = &config.export {
            let prefix = format!("case{}_St{}_frame{:04}", case_id, field.frequency(), frame);
            let written = write_field_set(query.total(), &export.dir, &prefix)?;
            println!("Exported {} field(s) to {}", written.len(), export.dir.display());
        }
    }

    println!("Done!");
    Ok(())
}

fn print_summaries(summaries: &[(FieldLabel, FieldSummary)]) {
    for (label, summary) in summaries {
        let name = match label {
            FieldLabel::Mean(q) => format!("Mean({})", q.symbol()),
            other => other.to_string(),
        };
        println!("{:>10}: {}", name, summary);
    }
}
