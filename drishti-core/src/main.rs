//! Drishti command-line shell.
//!
//! Drives the engine over replayed point streams: capture a background and
//! an object frame from a recording, save the descriptor as a named model,
//! and compare later recordings against it.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use drishti_core::{
    compare, AnomalyReport, CharacterizedObject, EngineConfig, Error, ModelRegistry,
    ObjectCharacterizer, Result,
};
use drishti_io::{capture::CaptureScanner, csv::CsvScanner, PointSource};

#[derive(Parser)]
#[command(name = "drishti", about = "LiDAR object characterization and anomaly detection")]
struct Cli {
    /// Path to a TOML engine configuration
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Characterize an object from a recorded stream and store the model
    Characterize {
        /// Input recording (.csv or .dcap)
        input: PathBuf,
        /// Name to store the model under
        #[arg(long)]
        name: String,
        /// Model directory
        #[arg(long, default_value = "models")]
        models_dir: PathBuf,
        /// Skip the background capture phase
        #[arg(long)]
        no_background: bool,
    },
    /// Characterize an observation and compare it against a stored model
    Analyze {
        /// Input recording (.csv or .dcap)
        input: PathBuf,
        /// Name of the reference model
        #[arg(long)]
        model: String,
        /// Model directory
        #[arg(long, default_value = "models")]
        models_dir: PathBuf,
        /// Skip the background capture phase
        #[arg(long)]
        no_background: bool,
    },
    /// Inspect stored models
    Model {
        #[command(subcommand)]
        command: ModelCommand,
    },
}

#[derive(Subcommand)]
enum ModelCommand {
    /// List models in a directory
    List {
        #[arg(long, default_value = "models")]
        models_dir: PathBuf,
    },
    /// Print a model summary
    Info {
        /// Model name
        name: String,
        #[arg(long, default_value = "models")]
        models_dir: PathBuf,
    },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => {
            log::info!("Loading configuration from {}", path.display());
            EngineConfig::load(path)?
        }
        None => EngineConfig::default(),
    };

    match cli.command {
        Command::Characterize {
            input,
            name,
            models_dir,
            no_background,
        } => {
            let object = characterize_stream(&input, &config, no_background)?;
            print_object(&name, &object);

            let mut registry = ModelRegistry::open(&models_dir)?;
            registry.insert(name.clone(), object);
            registry.save(&name)?;
            println!("Model `{}` saved to {}", name, models_dir.display());
            Ok(())
        }
        Command::Analyze {
            input,
            model,
            models_dir,
            no_background,
        } => {
            let mut registry = ModelRegistry::open(&models_dir)?;
            registry.load(&model)?;
            let observed = characterize_stream(&input, &config, no_background)?;
            let reference = registry
                .get(&model)
                .ok_or_else(|| Error::Model(format!("no model named `{}`", model)))?;

            let report = compare(&observed, reference, &config.detection);
            print_report(&model, &report);
            Ok(())
        }
        Command::Model { command } => match command {
            ModelCommand::List { models_dir } => {
                let registry = ModelRegistry::open(&models_dir)?;
                for name in registry.list()? {
                    println!("{}", name);
                }
                Ok(())
            }
            ModelCommand::Info { name, models_dir } => {
                let mut registry = ModelRegistry::open(&models_dir)?;
                let object = registry.load(&name)?;
                print_object(&name, object);
                Ok(())
            }
        },
    }
}

/// Open the right scanner for the input extension and run the phases.
fn characterize_stream(
    input: &Path,
    config: &EngineConfig,
    no_background: bool,
) -> Result<CharacterizedObject> {
    let source: Box<dyn PointSource> = match input.extension().and_then(|e| e.to_str()) {
        Some("dcap") => Box::new(CaptureScanner::new(input)),
        _ => Box::new(CsvScanner::new(input)),
    };

    let mut characterizer = ObjectCharacterizer::new(source, config.clone());
    characterizer.init()?;

    if !no_background {
        characterizer.define_background()?;
        log::info!("Background map: {} points", characterizer.background_size());
    }

    characterizer.define_object()
}

fn print_object(name: &str, object: &CharacterizedObject) {
    let delta = object.bbox.delta();
    println!(
        "{}: {} points, {} faces, bbox {:.1} x {:.1} x {:.1} mm",
        name,
        object.points.len(),
        object.face_count(),
        delta.x,
        delta.y,
        delta.z
    );
    for (i, face) in object.faces.iter().enumerate() {
        let (w, h) = face.extents();
        println!(
            "  face {}: {} points, normal {}, extent {:.1} x {:.1} mm",
            i,
            face.len(),
            face.normal,
            w,
            h
        );
    }
}

fn print_report(model: &str, report: &AnomalyReport) {
    println!(
        "Comparison against `{}`: {}",
        model,
        if report.similar { "SIMILAR" } else { "ANOMALOUS" }
    );
    println!("  overall delta {}", report.overall);
    println!("  face count delta {:+}", report.delta_face_count);
    for fc in &report.face_comparisons {
        match &fc.matched {
            Some(m) => println!(
                "  face {} -> model face {} (angle {:.3} rad) delta {}",
                fc.observed_face, m.model_face, m.angle, m.deltas
            ),
            None => println!("  face {} -> no match", fc.observed_face),
        }
    }
}
