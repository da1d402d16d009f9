//! huella - web framework fingerprinting CLI
//!
//! Usage:
//!   huella --mode train --file corpus.json --model model.hla
//!   huella --mode predict --file captures.json --model model.hla
//!
//! Train mode prints an evaluation report, writes the model artifact and a
//! diagnostics side file. Predict mode loads the artifact and prints one
//! predicted framework per input record.

use clap::{Parser, ValueEnum};
use huella::model::{train_model, ModelArtifact, TrainConfig};
use huella::report::render_training_report;
use huella::response::RawSample;
use huella::Result;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;

/// huella - guess the web framework behind raw HTTP response captures.
#[derive(Parser)]
#[command(name = "huella")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Mode of operation
    #[arg(long, value_enum)]
    mode: Mode,

    /// Path to the input JSON corpus
    #[arg(long, value_name = "FILE")]
    file: PathBuf,

    /// Path to save/load the trained model artifact
    #[arg(long, value_name = "FILE", default_value = "model.hla")]
    model: PathBuf,

    /// Path for the diagnostics report (train mode); defaults to
    /// <model>.report.txt
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    /// Fit the encoders and the forest, evaluate, persist the artifact
    Train,
    /// Load a persisted artifact and classify each input record
    Predict,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let default_filter = if verbose { "huella=debug" } else { "huella=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    let samples = load_corpus(&cli.file)?;
    info!(records = samples.len(), corpus = %cli.file.display(), "corpus loaded");

    match cli.mode {
        Mode::Train => train(cli, &samples),
        Mode::Predict => predict(cli, &samples),
    }
}

fn train(cli: &Cli, samples: &[RawSample]) -> Result<()> {
    let outcome = train_model(samples, &TrainConfig::default())?;
    let report = render_training_report(&outcome);
    print!("{report}");

    outcome.artifact.save(&cli.model)?;
    info!(model = %cli.model.display(), "artifact written");

    let report_path = cli
        .report
        .clone()
        .unwrap_or_else(|| default_report_path(&cli.model));
    fs::write(&report_path, &report)?;
    info!(report = %report_path.display(), "diagnostics written");

    println!(
        "Model, vocabulary, encoders, and label encoder saved to: {}",
        cli.model.display()
    );
    Ok(())
}

fn predict(cli: &Cli, samples: &[RawSample]) -> Result<()> {
    let artifact = ModelArtifact::load(&cli.model)?;
    info!(
        vocabulary = artifact.registry.vocabulary().len(),
        classes = artifact.labels.n_classes(),
        "artifact loaded"
    );

    let predictions = artifact.predict_samples(samples)?;
    println!("Predicted frameworks:");
    for prediction in predictions {
        println!("{prediction}");
    }
    Ok(())
}

fn load_corpus(path: &Path) -> Result<Vec<RawSample>> {
    let contents = fs::read_to_string(path)?;
    let samples: Vec<RawSample> = serde_json::from_str(&contents)?;
    Ok(samples)
}

fn default_report_path(model: &Path) -> PathBuf {
    let mut name = model.file_name().unwrap_or_default().to_os_string();
    name.push(".report.txt");
    model.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_report_path() {
        let path = default_report_path(Path::new("out/model.hla"));
        assert_eq!(path, Path::new("out/model.hla.report.txt"));
    }

    #[test]
    fn test_load_corpus_rejects_malformed_json() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("corpus.json");
        fs::write(&path, "{not json").expect("writes");
        assert!(load_corpus(&path).is_err());
    }

    #[test]
    fn test_load_corpus_reads_records() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("corpus.json");
        fs::write(
            &path,
            r#"[{"response": "HTTP/1.1 200 OK\r\n\r\n", "response_time": 0.1, "framework": "laravel"}]"#,
        )
        .expect("writes");
        let samples = load_corpus(&path).expect("loads");
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].framework.as_deref(), Some("laravel"));
    }
}
