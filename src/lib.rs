//! Camtrap - camera-trap image pipeline.
//!
//! Detects animals, people and vehicles in camera-trap images, classifies
//! animal detections by species, and derives sorted folders, annotated
//! images, species crops and a JSON export from a single CSV detection log.

#![warn(missing_docs)]

pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod fetch;
pub mod imaging;
pub mod inference;
pub mod locking;
pub mod output;
pub mod passes;
pub mod pipeline;
pub mod store;

use clap::Parser;
use cli::{Cli, Command, ConfigAction, RunArgs};
use config::{Config, config_file_path, load_default_config, save_default_config};
use inference::{OnnxDetector, OnnxSpeciesClassifier};
use passes::visualize::VisualizeTargets;
use pipeline::{OnnxModels, Pipeline, PipelineSettings, build_annotator};
use tracing::{info, warn};

pub use error::{Error, Result};

/// Main entry point for the camtrap CLI.
pub fn run() -> Result<()> {
    // Help and version exit 0; every other parse failure exits 1.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if !e.use_stderr() => e.exit(),
        Err(e) => {
            let _ = e.print();
            std::process::exit(1);
        }
    };

    init_logging(cli.global.verbose, cli.global.quiet);

    // Remove store lock files on interrupt
    if let Err(e) = ctrlc::set_handler(|| {
        locking::cleanup_all_locks();
        std::process::exit(130); // 128 + SIGINT(2)
    }) {
        warn!("Failed to install Ctrl+C handler: {e}");
    }

    let show_progress = cli.global.show_progress();

    match cli.command {
        Command::Config { action } => handle_config_command(action),
        command => {
            let config = load_default_config()?;
            handle_command(command, &config, show_progress)
        }
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    use tracing_subscriber::{EnvFilter, fmt};

    // ORT logging is suppressed by default because CUDA fallback is expected in auto mode.
    let filter_str = if quiet {
        "warn,ort=off".to_string()
    } else {
        match verbose {
            0 => "info,ort=off".to_string(),
            1 => "debug,ort=warn".to_string(),
            2 => "trace,ort=info".to_string(),
            _ => "trace".to_string(),
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn handle_command(command: Command, config: &Config, show_progress: bool) -> Result<()> {
    match command {
        Command::Detect {
            input_dir,
            store,
            column_order,
            detector,
            inference,
        } => {
            let device = inference.device(config.inference.device);
            let mut detector = OnnxDetector::from_config(&detector.resolve(&config.detector), device)?;
            passes::detect::run(&input_dir, &store, &column_order, &mut detector, show_progress)?;
        }
        Command::Metadata {
            input_dir,
            store,
            column_order,
        } => {
            passes::metadata::run(&input_dir, &store, &column_order, show_progress)?;
        }
        Command::Classify {
            input_dir,
            store,
            column_order,
            classifier,
            inference,
        } => {
            let device = inference.device(config.inference.device);
            let mut classifier =
                OnnxSpeciesClassifier::from_config(&classifier.resolve(&config.classifier), device)?;
            passes::classify::run(&input_dir, &store, &column_order, &mut classifier, show_progress)?;
        }
        Command::Sort {
            input_dir,
            store,
            output_dir,
            thresholds,
        } => {
            passes::sort::run(
                &input_dir,
                &store,
                &output_dir,
                &thresholds.resolve(config.thresholds),
                show_progress,
            )?;
        }
        Command::Visualize {
            input_dir,
            store,
            annotated_dir,
            crop_dir,
            thresholds,
        } => {
            let annotator = build_annotator(&config.visualize);
            passes::visualize::run(
                &input_dir,
                &store,
                VisualizeTargets {
                    annotated_dir: &annotated_dir,
                    crop_dir: &crop_dir,
                },
                &thresholds.resolve(config.thresholds),
                &annotator,
                show_progress,
            )?;
        }
        Command::Export { store, output_json } => {
            passes::export::run(&store, &output_json)?;
        }
        Command::Run(args) => handle_run_command(args, config, show_progress)?,
        Command::Config { action } => handle_config_command(action)?,
        Command::Fetch(args) => handle_fetch_command(args, show_progress)?,
    }
    Ok(())
}

fn handle_run_command(args: RunArgs, config: &Config, show_progress: bool) -> Result<()> {
    let stages = args.stages();
    let paths = &config.paths;

    let settings = PipelineSettings {
        store: args.csv.clone().unwrap_or_else(|| paths.store.clone()),
        json: args.json.clone().unwrap_or_else(|| paths.json.clone()),
        sorted: args.sorted.clone().unwrap_or_else(|| paths.sorted.clone()),
        annotated: args.annotated.clone().unwrap_or_else(|| paths.annotated.clone()),
        crops: args.crops.clone().unwrap_or_else(|| paths.crops.clone()),
        column_order: args.column_order.clone().unwrap_or_default(),
        thresholds: args.thresholds.resolve(config.thresholds),
        visualize: config.visualize.clone(),
        input_dir: args.input_dir.clone(),
        show_progress,
    };

    let mut models = OnnxModels::new(
        args.detector.resolve(&config.detector),
        args.classifier.resolve(&config.classifier),
        args.inference.device(config.inference.device),
    );

    let names: Vec<&str> = stages.iter().map(|s| s.name()).collect();
    info!(
        "Running {} on {}",
        names.join(" -> "),
        settings.input_dir.display()
    );

    Pipeline::new(settings).run(&stages, &mut models)?;
    Ok(())
}

#[allow(clippy::print_stdout)]
fn handle_config_command(action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Init => {
            let path = config_file_path()?;
            if path.exists() {
                println!("Configuration file already exists: {}", path.display());
            } else {
                let config = Config::default();
                let saved_path = save_default_config(&config)?;
                println!("Created configuration file: {}", saved_path.display());
                println!("\nNext steps:");
                println!("  Set [detector] model and [classifier] model/labels in the file, then run:");
                println!("  camtrap run <input_dir>");
            }
            Ok(())
        }
        ConfigAction::Show => {
            let config = load_default_config()?;
            println!("{config:#?}");
            Ok(())
        }
        ConfigAction::Path => {
            let path = config_file_path()?;
            println!("{}", path.display());
            Ok(())
        }
    }
}

fn handle_fetch_command(args: cli::FetchArgs, show_progress: bool) -> Result<()> {
    let options = fetch::FetchOptions {
        annotations: args.annotations,
        images: args.images,
        season: args.season,
        limit: args.limit,
        output_dir: args.output,
        show_progress,
    };

    let runtime = tokio::runtime::Runtime::new().map_err(|e| Error::Internal {
        message: format!("Failed to create async runtime: {e}"),
    })?;

    runtime.block_on(fetch::fetch(&options))?;
    Ok(())
}
