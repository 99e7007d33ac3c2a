//! Train the shelter outcome network and write a submission
//!
//! Usage: cargo run --bin shelter-train -- --config run.toml --epochs 8

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use shelter_outcome_nn::{
    utils::{setup_logging, Config},
    ModelSource, Pipeline, RunOptions,
};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Categorical embedding network for shelter animal outcomes")]
struct Args {
    /// TOML config file; defaults are used for anything it leaves out
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Training CSV
    #[arg(long)]
    train: Option<PathBuf>,

    /// Test CSV
    #[arg(long)]
    test: Option<PathBuf>,

    /// Submission template CSV
    #[arg(long)]
    sample: Option<PathBuf>,

    /// Output submission CSV
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[arg(short, long)]
    epochs: Option<usize>,

    #[arg(short, long)]
    batch_size: Option<usize>,

    #[arg(long)]
    lr: Option<f64>,

    #[arg(long)]
    weight_decay: Option<f64>,

    #[arg(long)]
    seed: Option<u64>,

    /// Save the trained model as JSON
    #[arg(long)]
    save_model: Option<PathBuf>,

    /// Load a saved model instead of training
    #[arg(long, conflicts_with = "save_model")]
    load_model: Option<PathBuf>,

    /// Stop after training; do not write a submission
    #[arg(long)]
    skip_predict: bool,

    /// Log level (overridden by RUST_LOG)
    #[arg(long)]
    log_level: Option<String>,
}

impl Args {
    fn apply(&self, config: &mut Config) {
        let data = &mut config.data;
        if let Some(p) = &self.train {
            data.train_path = p.clone();
        }
        if let Some(p) = &self.test {
            data.test_path = p.clone();
        }
        if let Some(p) = &self.sample {
            data.sample_submission_path = p.clone();
        }
        if let Some(p) = &self.output {
            data.output_path = p.clone();
        }

        let training = &mut config.training;
        if let Some(v) = self.epochs {
            training.epochs = v;
        }
        if let Some(v) = self.batch_size {
            training.batch_size = v;
        }
        if let Some(v) = self.lr {
            training.learning_rate = v;
        }
        if let Some(v) = self.weight_decay {
            training.weight_decay = v;
        }
        if let Some(v) = self.seed {
            training.seed = v;
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => Config::default(),
    };
    args.apply(&mut config);
    setup_logging(&config.logging.level);

    let options = RunOptions {
        model_source: match &args.load_model {
            Some(path) => ModelSource::Load(path.clone()),
            None => ModelSource::Train,
        },
        save_model: args.save_model.clone(),
        predict: !args.skip_predict,
    };

    let epochs = match options.model_source {
        ModelSource::Train => config.training.epochs as u64,
        ModelSource::Load(_) => 0,
    };
    let pb = ProgressBar::new(epochs);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .context("invalid progress bar template")?
            .progress_chars("#>-"),
    );

    let pipeline = Pipeline::new(config, options).context("invalid configuration")?;
    let report = pipeline
        .run(|m| {
            pb.set_message(format!("val loss {:.3} acc {:.3}", m.val_loss, m.val_accuracy));
            pb.inc(1);
        })
        .context("pipeline failed")?;
    pb.finish_and_clear();

    info!(
        "rows: {} train, {} validation, {} test",
        report.n_train_rows, report.n_validation_rows, report.n_test_rows
    );
    if !report.dropped_columns.is_empty() {
        info!("dropped sparse columns: {:?}", report.dropped_columns);
    }
    info!("classes: {:?}", report.class_names);
    if let Some(history) = &report.history {
        if let (Some(first), Some(last)) = (history.epochs.first(), history.last()) {
            info!(
                "training loss {:.4} -> {:.4}, final validation accuracy {:.3}",
                first.train_loss, last.train_loss, last.val_accuracy
            );
        }
    }
    if let Some(path) = &report.submission {
        info!("submission written to {}", path.display());
    }

    Ok(())
}
