use argh::FromArgs;
use std::path::PathBuf;

use nerfpose::{
    pipeline::{
        ColmapCli, Pipeline, PipelineConfig, PipelineError, PipelineOutcome, ProjectLayout,
    },
    validation::Status,
};

#[derive(FromArgs)]
/// Reconstruct camera poses with COLMAP and write a validated NeRF transforms.json
struct Args {
    /// project working directory
    #[argh(option, default = "PathBuf::from(\"nerf_project\")")]
    project: PathBuf,

    /// directory with the source photographs
    #[argh(option)]
    raw_images: Option<PathBuf>,

    /// existing reconstruction directory, defaults to <project>/colmap_output
    #[argh(option)]
    colmap_dir: Option<PathBuf>,

    /// path of the dataset file, defaults to <project>/nerf_data/transforms.json
    #[argh(option)]
    output: Option<PathBuf>,

    /// path of the validation report, defaults to <project>/validation/report.json
    #[argh(option)]
    report: Option<PathBuf>,

    /// json file with configuration overrides
    #[argh(option)]
    config: Option<PathBuf>,

    /// convert an existing reconstruction without running COLMAP
    #[argh(switch)]
    skip_colmap: bool,

    /// pair unmatched image names by sorted position when the counts agree
    #[argh(switch)]
    positional_fallback: bool,

    /// enable debug logging
    #[argh(switch, short = 'v')]
    verbose: bool,
}

fn load_config(args: &Args) -> Result<PipelineConfig, PipelineError> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    }
    .with_env()?;

    if args.positional_fallback {
        config.correspondence.positional_fallback = true;
    }

    Ok(config)
}

fn run(args: &Args) -> Result<PipelineOutcome, Box<dyn std::error::Error>> {
    let config = load_config(args)?;
    let engine = ColmapCli::new(config.colmap.clone());

    let mut pipeline = Pipeline::new(config, ProjectLayout::new(&args.project), engine);
    if let Some(dir) = &args.colmap_dir {
        pipeline = pipeline.with_model_dir(dir);
    }
    if let Some(path) = &args.output {
        pipeline = pipeline.with_dataset_path(path);
    }
    if let Some(path) = &args.report {
        pipeline = pipeline.with_report_path(path);
    }

    let outcome = if args.skip_colmap {
        if let Some(dir) = &args.raw_images {
            pipeline = pipeline.with_images_dir(dir);
        }
        pipeline.run_existing()?
    } else {
        let raw_images = args
            .raw_images
            .as_ref()
            .ok_or("--raw-images is required unless --skip-colmap is set")?;
        pipeline.run(raw_images)?
    };

    Ok(outcome)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Args = argh::from_env();

    let default_filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let outcome = match run(&args) {
        Ok(outcome) => outcome,
        Err(e) => {
            log::error!("pipeline failed: {e}");
            return Err(e);
        }
    };

    let conversion = &outcome.conversion;
    log::info!(
        "wrote {} frames to {} ({} images skipped)",
        conversion.dataset.len(),
        outcome.dataset_path.display(),
        conversion.skipped.len()
    );

    let report = &outcome.report;
    log::info!(
        "validation {}: {} passed, {} warnings, {} errors",
        report.status(),
        report.count(Status::Success),
        report.count(Status::Warning),
        report.count(Status::Error),
    );
    match &outcome.report_path {
        Some(path) => log::info!("report in {}", path.display()),
        None => log::warn!("the validation report was not written"),
    }

    Ok(())
}
