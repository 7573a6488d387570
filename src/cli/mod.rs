//! Heart classifier CLI module
//!
//! Command-line interface for data preparation, training, prediction and
//! artifact inspection.

use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use std::time::Instant;

use crate::config::PipelineConfig;
use crate::export::ArtifactStore;
use crate::inference::ModelWrapper;
use crate::preprocessing::{DataPreparer, Dataset};
use crate::schema::FeatureSchema;
use crate::tracking::{FileTracker, NoopTracker, Tracker};
use crate::training::{train, CandidateRegistry};
use crate::utils::DataLoader;

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

fn kv_line(key: &str, val: impl std::fmt::Display) {
    println!("  {:<16} {}", muted(key), val.to_string().white());
}

// ─── CLI definitions ───────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "heart-classifier")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Cross-validated heart disease classifier")]
#[command(long_about = None)]
pub struct Cli {
    /// JSON configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Clean the raw dataset and write the processed file
    Prepare {
        /// Raw headerless CSV
        #[arg(short, long)]
        raw: Option<PathBuf>,

        /// Processed CSV to write
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Search, evaluate and persist every candidate
    Train {
        /// Processed CSV
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Artifact directory
        #[arg(short, long)]
        model_dir: Option<PathBuf>,

        /// Number of cross-validation folds
        #[arg(long)]
        cv_folds: Option<usize>,

        /// Random seed
        #[arg(long)]
        seed: Option<u64>,

        /// Only train these candidates (comma separated)
        #[arg(long, value_delimiter = ',')]
        candidates: Vec<String>,

        /// Experiment tracking directory
        #[arg(long)]
        tracking_dir: Option<PathBuf>,
    },

    /// Predict a CSV file of feature rows
    Predict {
        /// Model file
        #[arg(short, long)]
        model: Option<PathBuf>,

        /// CSV with a header of feature names
        #[arg(short, long)]
        data: PathBuf,

        /// Write predictions as JSON here instead of printing them
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the selection summary of an artifact directory
    Info {
        /// Artifact directory
        #[arg(short, long)]
        model_dir: Option<PathBuf>,
    },
}

/// Defaults, then the config file, then the environment.
///
/// Command-specific flags are applied by each command.
pub fn resolve_config(cli: &Cli) -> anyhow::Result<PipelineConfig> {
    let base = match &cli.config {
        Some(path) => PipelineConfig::from_file(path)?,
        None => PipelineConfig::default(),
    };
    let mut config = base.apply_env(|key| std::env::var(key).ok())?;
    config.json_logs |= cli.json_logs;
    Ok(config)
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_prepare(config: &PipelineConfig) -> anyhow::Result<()> {
    section("Prepare");

    step_run(&format!("Reading {}", config.raw_data.display()));
    let start = Instant::now();
    let (dataset, report) = DataPreparer::default().prepare_file(&config.raw_data)?;
    step_done(&format!("{} records in {:?}", report.n_records, start.elapsed()));

    step_run(&format!("Writing {}", config.processed_data.display()));
    dataset.save_csv(&config.processed_data)?;
    step_done("");

    println!();
    kv_line("Records", report.n_records);
    kv_line("Positive", report.n_positive);
    if report.missing_targets > 0 {
        kv_line("Missing targets", report.missing_targets);
    }
    let imputed: usize = report.imputed.values().sum();
    kv_line("Imputed cells", imputed);
    for (column, count) in report.imputed.iter().filter(|(_, n)| **n > 0) {
        let median = report.medians.get(column).copied().unwrap_or(f64::NAN);
        println!("    {:<14} {} {}", muted(column), count, dim(&format!("(median {})", median)));
    }
    println!();
    Ok(())
}

pub fn cmd_train(config: &PipelineConfig, only: &[String]) -> anyhow::Result<()> {
    section("Train");
    config.validate()?;

    step_run("Loading data");
    let start = Instant::now();
    let dataset = Dataset::load_csv(&config.processed_data, &FeatureSchema::standard())?;
    let (negatives, positives) = dataset.class_counts();
    step_done(&format!(
        "{} rows ({} positive, {} negative) in {:?}",
        dataset.n_samples(),
        positives,
        negatives,
        start.elapsed()
    ));

    let mut registry = CandidateRegistry::standard(config.random_state);
    if !only.is_empty() {
        registry = registry.select(only)?;
    }

    let file_tracker = match &config.tracking_dir {
        Some(dir) => Some(FileTracker::new(dir)?),
        None => None,
    };
    let tracker: &dyn Tracker = match &file_tracker {
        Some(t) => t,
        None => &NoopTracker,
    };

    step_run(&format!(
        "Evaluating {} with {}-fold CV",
        registry.names().join(", ").cyan(),
        config.cv_folds
    ));
    let start = Instant::now();
    let store = ArtifactStore::new(&config.artifact_dir);
    let summary = train(&dataset, &registry, &config.training(), &store, tracker)?;
    step_done(&format!("{:?}", start.elapsed()));

    print_summary(&summary);
    kv_line("Artifacts", store.dir().display());
    println!();
    Ok(())
}

fn print_summary(summary: &crate::training::SelectionSummary) {
    println!();
    println!(
        "  {:<22} {:>9} {:>9} {:>9} {:>9}",
        muted("Candidate"),
        muted("ROC-AUC"),
        muted("Accuracy"),
        muted("Precision"),
        muted("Recall")
    );
    println!("  {}", dim(&"─".repeat(62)));
    for candidate in &summary.candidates {
        let m = &candidate.result.metrics;
        let marker = if candidate.name == summary.best_model { ok("★") } else { dim(" ") };
        println!(
            "{} {:<22} {:>9.4} {:>9.4} {:>9.4} {:>9.4}",
            marker, candidate.name, m.roc_auc, m.accuracy, m.precision, m.recall
        );
        println!("    {}", dim(&candidate.result.best_params.to_string()));
    }
    for (name, reason) in &summary.failures {
        println!("  {:<22} {}", name, reason.red());
    }
    println!();
    kv_line("Best model", summary.best_model.green().bold());
    kv_line("Best ROC-AUC", format!("{:.4}", summary.best_score));
}

pub fn cmd_predict(config: &PipelineConfig, data: &PathBuf, output: Option<&std::path::Path>) -> anyhow::Result<()> {
    let df = DataLoader::new().load_csv(data)?;
    let wrapper = ModelWrapper::new(&config.model_path);
    let predictions = wrapper.predict(&df)?;

    let json = serde_json::to_string_pretty(&predictions)?;
    match output {
        Some(path) => {
            std::fs::write(path, json)?;
            section("Predict");
            kv_line("Rows", predictions.len());
            kv_line("Written to", path.display());
            println!();
        }
        None => println!("{}", json),
    }
    Ok(())
}

pub fn cmd_info(config: &PipelineConfig) -> anyhow::Result<()> {
    section("Artifacts");
    let store = ArtifactStore::new(&config.artifact_dir);
    let summary = store.load_summary()?;

    kv_line("Directory", store.dir().display());
    kv_line("Created", summary.created_at.to_rfc3339());
    kv_line("CV folds", summary.cv_folds);
    kv_line("Seed", summary.random_state);
    print_summary(&summary);
    println!();
    Ok(())
}

/// Apply command flags over the resolved configuration and run the command
pub fn run(cli: Cli, mut config: PipelineConfig) -> anyhow::Result<()> {
    match cli.command {
        Commands::Prepare { raw, output } => {
            if let Some(raw) = raw {
                config.raw_data = raw;
            }
            if let Some(output) = output {
                config.processed_data = output;
            }
            cmd_prepare(&config)
        }
        Commands::Train { data, model_dir, cv_folds, seed, candidates, tracking_dir } => {
            if let Some(data) = data {
                config.processed_data = data;
            }
            if let Some(dir) = model_dir {
                config.artifact_dir = dir;
            }
            if let Some(k) = cv_folds {
                config.cv_folds = k;
            }
            if let Some(seed) = seed {
                config.random_state = seed;
            }
            if let Some(dir) = tracking_dir {
                config.tracking_dir = Some(dir);
            }
            cmd_train(&config, &candidates)
        }
        Commands::Predict { model, data, output } => {
            if let Some(model) = model {
                config.model_path = model;
            }
            cmd_predict(&config, &data, output.as_deref())
        }
        Commands::Info { model_dir } => {
            if let Some(dir) = model_dir {
                config.artifact_dir = dir;
            }
            cmd_info(&config)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_train_flags() {
        let cli = Cli::parse_from([
            "heart-classifier",
            "train",
            "--cv-folds",
            "3",
            "--candidates",
            "random_forest,logistic_regression",
        ]);
        match cli.command {
            Commands::Train { cv_folds, candidates, .. } => {
                assert_eq!(cv_folds, Some(3));
                assert_eq!(candidates, vec!["random_forest", "logistic_regression"]);
            }
            _ => panic!("expected train"),
        }
    }

    #[test]
    fn test_parse_predict_requires_data() {
        assert!(Cli::try_parse_from(["heart-classifier", "predict"]).is_err());
    }
}
