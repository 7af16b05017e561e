use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{info, info_span, warn, Instrument, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use stylebank::io::write_text;
use stylebank::llm::DEFAULT_MODEL;
use stylebank::segmentation::DEFAULT_HOST_PHRASE;
use stylebank::stages::{build_evaluation_set, render_statistics, DatasetComparison, MAX_STD_DEVIATION};
use stylebank::{
    accumulate_feature_bank, build_dataset, evaluate_across_batches, load_corpus,
    load_feature_bank, write_feature_bank, AccumulationError, AccumulatorConfig, CorpusFormat,
    DatasetConfig, FeatureStatistics, LlmConfig, MissingHostPolicy, OpenRouterClient, RunSummary,
    ScoringConfig, TotalFailurePolicy,
};

#[derive(Parser)]
#[command(name = "stylebank")]
#[command(author, version, about = "Mine stable stylometric features from transcripts", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a feature bank from the training split of a corpus
    Bank {
        /// Directory of .txt transcripts
        #[arg(short, long)]
        input: PathBuf,

        /// Output file for the feature bank (JSON)
        #[arg(short, long)]
        output: PathBuf,

        /// Output file for the run summary (defaults next to the bank)
        #[arg(long)]
        summary: Option<PathBuf>,

        #[command(flatten)]
        format: FormatArgs,

        #[command(flatten)]
        dataset: DatasetArgs,

        #[command(flatten)]
        llm: LlmArgs,

        /// Proposal calls per model per batch
        #[arg(long, default_value = "2")]
        rubrics_per_model: usize,

        /// Highest standard deviation a kept feature may show
        #[arg(long, default_value_t = MAX_STD_DEVIATION)]
        max_std: f64,

        /// Skip a batch when a step fails completely instead of aborting
        #[arg(long)]
        skip_failed_batches: bool,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Score a feature bank against one or more corpora
    Evaluate {
        /// Feature bank file (JSON)
        #[arg(short, long)]
        bank: PathBuf,

        /// Dataset as name=directory (repeatable)
        #[arg(long = "dataset", required = true)]
        datasets: Vec<String>,

        #[command(flatten)]
        format: FormatArgs,

        #[command(flatten)]
        llm: LlmArgs,

        /// Maximum words per batch
        #[arg(long, default_value = "2000")]
        max_words: usize,

        /// Only score the first N batches of each dataset
        #[arg(long)]
        max_samples: Option<usize>,

        /// Write the cross-dataset comparison as CSV
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Show how a corpus segments and splits, without calling any model
    Inspect {
        /// Directory of .txt transcripts
        #[arg(short, long)]
        input: PathBuf,

        #[command(flatten)]
        format: FormatArgs,

        #[command(flatten)]
        dataset: DatasetArgs,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FormatKind {
    /// "<id> (<timestamp>):" headers
    HeaderTagged,
    /// "Name: text" lines
    SpeakerName,
    /// Plain single-author paragraphs
    Paragraphs,
}

#[derive(Args, Debug)]
struct FormatArgs {
    /// Transcript format
    #[arg(long, value_enum, default_value = "header-tagged")]
    format: FormatKind,

    /// Phrase the host says, used to renumber header-tagged speakers
    #[arg(long, default_value = DEFAULT_HOST_PHRASE)]
    host_phrase: String,

    /// Keep header-tagged speaker ids as they are
    #[arg(long)]
    no_normalize: bool,

    /// Skip header-tagged files where the host phrase is missing
    #[arg(long)]
    strict_host: bool,

    /// Speaker id to keep in header-tagged transcripts
    #[arg(long, default_value = "0")]
    speaker: u32,

    /// Host name for speaker-name transcripts
    #[arg(long)]
    host_name: Option<String>,
}

impl FormatArgs {
    fn corpus_format(&self) -> Result<CorpusFormat> {
        Ok(match self.format {
            FormatKind::HeaderTagged => CorpusFormat::HeaderTagged {
                host_phrase: (!self.no_normalize).then(|| self.host_phrase.clone()),
                missing_host: if self.strict_host {
                    MissingHostPolicy::Fail
                } else {
                    MissingHostPolicy::KeepUnchanged
                },
                target_speaker: self.speaker,
            },
            FormatKind::SpeakerName => CorpusFormat::SpeakerName {
                host_name: self
                    .host_name
                    .clone()
                    .context("--host-name is required for speaker-name transcripts")?,
            },
            FormatKind::Paragraphs => CorpusFormat::Paragraphs,
        })
    }
}

#[derive(Args, Debug)]
struct DatasetArgs {
    /// Maximum words per batch
    #[arg(long, default_value = "2000")]
    max_words: usize,

    /// Share of pooled batches used for training
    #[arg(long, default_value = "0.5")]
    train_ratio: f64,

    /// Share of files held out for validation
    #[arg(long, default_value = "0.2")]
    val_ratio: f64,

    /// Seed for the batch shuffle
    #[arg(long)]
    seed: Option<u64>,
}

impl DatasetArgs {
    fn config(&self) -> DatasetConfig {
        DatasetConfig {
            max_words_per_batch: self.max_words,
            train_ratio: self.train_ratio,
            val_ratio: self.val_ratio,
            seed: self.seed,
            require_non_empty: true,
        }
    }
}

#[derive(Args, Debug)]
struct LlmArgs {
    /// Model used for proposing and scoring (repeatable)
    #[arg(long = "model")]
    models: Vec<String>,

    /// Scoring calls per model per batch
    #[arg(long, default_value = "5")]
    evaluations_per_model: usize,

    /// Maximum requests in flight
    #[arg(long, default_value = "8")]
    max_in_flight: usize,
}

impl LlmArgs {
    fn models(&self) -> Vec<String> {
        if self.models.is_empty() {
            vec![DEFAULT_MODEL.to_string()]
        } else {
            self.models.clone()
        }
    }

    fn client(&self) -> Result<OpenRouterClient> {
        let mut config = LlmConfig::from_env()?;
        config.max_in_flight = self.max_in_flight;
        OpenRouterClient::new(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Commands::Bank {
            input,
            output,
            summary,
            format,
            dataset,
            llm,
            rubrics_per_model,
            max_std,
            skip_failed_batches,
            verbose,
        } => {
            setup_logging(verbose);
            let config = AccumulatorConfig {
                models: llm.models(),
                rubrics_per_model,
                evaluations_per_model: llm.evaluations_per_model,
                max_std_deviation: max_std,
                on_total_failure: if skip_failed_batches {
                    TotalFailurePolicy::SkipBatch
                } else {
                    TotalFailurePolicy::Abort
                },
            };
            let summary = summary.unwrap_or_else(|| output.with_extension("summary.json"));
            build_bank(&input, &output, &summary, &format, &dataset, &llm, &config).await
        }
        Commands::Evaluate {
            bank,
            datasets,
            format,
            llm,
            max_words,
            max_samples,
            csv,
            verbose,
        } => {
            setup_logging(verbose);
            evaluate_bank(&bank, &datasets, &format, &llm, max_words, max_samples, csv.as_deref()).await
        }
        Commands::Inspect {
            input,
            format,
            dataset,
            verbose,
        } => {
            setup_logging(verbose);
            inspect_corpus(&input, &format, &dataset)
        }
    }
}

fn setup_logging(verbose: bool) {
    let result = match EnvFilter::try_from_default_env() {
        Ok(filter) => tracing::subscriber::set_global_default(
            FmtSubscriber::builder().with_env_filter(filter).finish(),
        ),
        Err(_) => {
            let level = if verbose { Level::DEBUG } else { Level::INFO };
            tracing::subscriber::set_global_default(
                FmtSubscriber::builder().with_max_level(level).finish(),
            )
        }
    };
    result.ok();
}

async fn build_bank(
    input: &Path,
    output: &Path,
    summary_path: &Path,
    format: &FormatArgs,
    dataset: &DatasetArgs,
    llm: &LlmArgs,
    config: &AccumulatorConfig,
) -> Result<()> {
    config.validate()?;
    let format = format.corpus_format()?;

    let corpus = load_corpus(input, &format).context("Failed to load corpus")?;
    let split = build_dataset(&corpus, &dataset.config())?;
    let client = llm.client()?;

    let mut summary = RunSummary::start(split.train.len());
    let span = info_span!("run", run_id = %summary.run_id);

    let result = accumulate_feature_bank(&client, &split.train, config)
        .instrument(span)
        .await;

    match result {
        Ok(outcome) => {
            write_feature_bank(output, &outcome.bank)?;
            summary.record_outcome(&outcome);
            summary.write_json(summary_path)?;

            info!(
                "Saved {} feature(s) to {:?} ({} pruned by the global pass)",
                outcome.bank.len(),
                output,
                outcome.features_pruned
            );
            Ok(())
        }
        Err(AccumulationError::Aborted { progress, reason }) => {
            write_feature_bank(output, &progress.bank)?;
            summary.record_abort(&progress, &reason.to_string());
            summary.write_json(summary_path)?;

            warn!(
                "Partial bank of {} feature(s) saved to {:?}",
                progress.bank.len(),
                output
            );
            anyhow::bail!(
                "Accumulation aborted after {} of {} batch(es) with {} feature(s) in the bank: {}",
                progress.batches_processed,
                split.train.len(),
                progress.bank.len(),
                reason
            )
        }
        Err(e) => Err(e.into()),
    }
}

async fn evaluate_bank(
    bank_path: &Path,
    datasets: &[String],
    format: &FormatArgs,
    llm: &LlmArgs,
    max_words: usize,
    max_samples: Option<usize>,
    csv: Option<&Path>,
) -> Result<()> {
    let bank = load_feature_bank(bank_path).context("Failed to load feature bank")?;
    let format = format.corpus_format()?;
    let scoring = ScoringConfig {
        models: llm.models(),
        num_evaluations_per_model: llm.evaluations_per_model,
    };
    scoring.validate()?;
    let client = llm.client()?;

    info!("Loaded {} feature(s) from {:?}", bank.len(), bank_path);

    let mut results: Vec<(String, Vec<FeatureStatistics>)> = Vec::new();
    for spec in datasets {
        let (name, dir) = parse_dataset_arg(spec)?;
        let corpus = load_corpus(&dir, &format)
            .with_context(|| format!("Failed to load dataset '{}'", name))?;
        let batches = build_evaluation_set(&corpus, max_words, max_samples)?;

        let words: usize = batches.iter().flatten().map(|t| stylebank::models::word_count(t)).sum();
        info!("Dataset '{}': {} batch(es), {} word(s)", name, batches.len(), words);

        let statistics = evaluate_across_batches(&client, &batches, &bank, &scoring)
            .instrument(info_span!("dataset", name = %name))
            .await
            .with_context(|| format!("Failed to evaluate dataset '{}'", name))?;

        println!("=== {} ===", name);
        print!("{}", render_statistics(&statistics));
        results.push((name, statistics));
    }

    let comparison = DatasetComparison::build(&bank, &results);
    print!("{}", comparison.render_table());

    if let Some(path) = csv {
        write_text(path, &comparison.to_csv())?;
        info!("Comparison written to {:?}", path);
    }

    Ok(())
}

fn parse_dataset_arg(spec: &str) -> Result<(String, PathBuf)> {
    let (name, dir) = spec
        .split_once('=')
        .with_context(|| format!("Dataset must be name=directory, got {:?}", spec))?;
    if name.trim().is_empty() || dir.trim().is_empty() {
        anyhow::bail!("Dataset must be name=directory, got {:?}", spec);
    }
    Ok((name.trim().to_string(), PathBuf::from(dir.trim())))
}

fn inspect_corpus(input: &Path, format: &FormatArgs, dataset: &DatasetArgs) -> Result<()> {
    let format = format.corpus_format()?;
    let corpus = load_corpus(input, &format).context("Failed to load corpus")?;

    println!("Corpus: {:?} ({})", input, format.label());
    for file in &corpus {
        println!(
            "  {:?}: {} text(s), {} word(s)",
            file.path.file_name().unwrap_or_default(),
            file.texts.len(),
            file.word_count()
        );
    }

    let config = DatasetConfig {
        require_non_empty: false,
        ..dataset.config()
    };
    let split = build_dataset(&corpus, &config)?;
    let (train_words, test_words, validation_words) = split.word_counts();

    println!("Splits:");
    println!("  train:      {} batch(es), {} word(s)", split.train.len(), train_words);
    println!("  test:       {} batch(es), {} word(s)", split.test.len(), test_words);
    println!(
        "  validation: {} batch(es), {} word(s)",
        split.validation.len(),
        validation_words
    );

    Ok(())
}
