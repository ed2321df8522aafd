//! `nog`: weekly price forecasts and document research for NOG

mod commands;
mod render;

use clap::{Parser, Subcommand, ValueEnum};
use nog_forecast::{DataRefresh, ForecastMode};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "nog")]
#[command(about = "Weekly price forecasts and filing/news research for NOG", long_about = None)]
struct Cli {
    /// Directory holding caches, models and generated files (overrides NOG_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the weekly prediction pipeline and print the JSON report
    Weekly {
        /// Whether to fetch new market data first
        #[arg(long, value_enum, default_value_t = RefreshArg::Auto)]
        refresh: RefreshArg,
        /// Reuse the saved model instead of training a new one
        #[arg(long)]
        no_retrain: bool,
        /// Number of business days to forecast
        #[arg(long)]
        days: Option<usize>,
        #[arg(long, value_enum, default_value_t = ModeArg::Flat)]
        mode: ModeArg,
    },
    /// Show when market data was last refreshed
    Status,
    /// Show the latest saved predictions
    Predictions,
    /// Show recent training runs
    History {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Refresh news, optionally refresh prices, then build the feature frame
    Data {
        #[arg(long)]
        refresh: bool,
    },
    /// Pull documents from an external source
    Ingest {
        #[command(subcommand)]
        source: IngestSource,
    },
    /// Corpus operations
    Corpus {
        #[command(subcommand)]
        action: BuildAction,
    },
    /// Vector index operations
    Index {
        #[command(subcommand)]
        action: IndexAction,
    },
    /// Answer a question from the indexed corpus
    Ask {
        question: String,
        /// Print the full response as JSON
        #[arg(long)]
        json: bool,
        /// Provider that writes the answer
        #[arg(long, value_enum, default_value_t = LlmArg::Openai)]
        llm: LlmArg,
        /// Answer model (defaults per provider)
        #[arg(long)]
        model: Option<String>,
    },
    /// Show vector index statistics
    Stats,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum IngestSource {
    /// Company and sector articles from NewsAPI
    News,
    /// Recent 10-K and 10-Q filings from SEC EDGAR
    Sec,
    /// Quarterly statements from Alpha Vantage
    Financials,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum BuildAction {
    /// Assemble every source into the corpus JSONL
    Build,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum IndexAction {
    /// Embed the corpus into a fresh vector index
    Build {
        #[arg(long, value_enum, default_value_t = EmbedderArg::Hashing)]
        embedder: EmbedderArg,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum RefreshArg {
    Auto,
    Force,
    Skip,
}

impl From<RefreshArg> for DataRefresh {
    fn from(arg: RefreshArg) -> Self {
        match arg {
            RefreshArg::Auto => Self::Auto,
            RefreshArg::Force => Self::Force,
            RefreshArg::Skip => Self::Skip,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum ModeArg {
    Flat,
    Rolling,
}

impl From<ModeArg> for ForecastMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Flat => Self::Flat,
            ModeArg::Rolling => Self::Rolling,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedderArg {
    /// Offline feature hashing
    Hashing,
    /// OpenAI embeddings (needs OPENAI_API_KEY)
    Openai,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmArg {
    /// Needs OPENAI_API_KEY
    Openai,
    /// Needs ANTHROPIC_API_KEY
    Anthropic,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    nog_utils::init_tracing();

    let cli = Cli::parse();

    let mut app = nog_utils::Config::from_env();
    if let Some(dir) = cli.data_dir {
        app = app.with_data_dir(dir);
    }
    tracing::debug!(data_dir = %app.data_dir.display(), "Resolved data directory");

    match cli.command {
        Commands::Weekly {
            refresh,
            no_retrain,
            days,
            mode,
        } => {
            let succeeded =
                commands::forecast::weekly(&app, refresh.into(), !no_retrain, days, mode.into())
                    .await?;
            if !succeeded {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Status => commands::forecast::status(&app)?,
        Commands::Predictions => commands::forecast::predictions(&app)?,
        Commands::History { limit } => commands::forecast::history(&app, limit)?,
        Commands::Data { refresh } => commands::forecast::data(&app, refresh).await?,
        Commands::Ingest { source } => match source {
            IngestSource::News => commands::rag::ingest_news(&app).await?,
            IngestSource::Sec => commands::rag::ingest_sec(&app).await?,
            IngestSource::Financials => commands::rag::ingest_financials(&app).await?,
        },
        Commands::Corpus {
            action: BuildAction::Build,
        } => commands::rag::build_corpus(&app)?,
        Commands::Index {
            action: IndexAction::Build { embedder },
        } => commands::rag::build_index(&app, embedder).await?,
        Commands::Ask {
            question,
            json,
            llm,
            model,
        } => commands::rag::ask(&app, &question, json, llm, model).await?,
        Commands::Stats => commands::rag::stats(&app)?,
    }

    Ok(ExitCode::SUCCESS)
}
