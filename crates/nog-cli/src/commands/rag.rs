//! Document subcommands: ingestion, corpus, index and question answering

use crate::{EmbedderArg, LlmArg};
use crate::render;
use anyhow::{Context, Result, bail};
use chrono::Local;
use nog_llm::providers::{AnthropicProvider, OpenAIProvider};
use nog_llm::{EmbeddingProvider, LLMProvider};
use nog_rag::api::{AlphaVantageClient, NewsApiClient, SecEdgarClient};
use nog_rag::corpus::write_jsonl;
use nog_rag::{
    AnalysisSystem, AnswerGenerator, CorpusBuilder, FinancialsIngestor, HashEmbedder,
    NewsIngestor, RagConfig, SecIngestor, VectorStore,
};
use nog_utils::Config;
use std::sync::Arc;
use tracing::info;

const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-5-haiku-latest";

fn rag_config(app: &Config) -> Result<RagConfig> {
    let config = RagConfig::default().with_data_dir(app.data_dir.clone());
    config.validate()?;
    Ok(config)
}

fn embedder(kind: EmbedderArg, dimension: Option<usize>) -> Result<Arc<dyn EmbeddingProvider>> {
    let provider: Arc<dyn EmbeddingProvider> = match kind {
        EmbedderArg::Hashing => {
            Arc::new(dimension.map_or_else(HashEmbedder::default, HashEmbedder::new))
        }
        EmbedderArg::Openai => Arc::new(OpenAIProvider::from_env()?),
    };
    Ok(provider)
}

/// Queries must be embedded by the model the index was built with
fn embedder_for(store: &VectorStore) -> Result<Arc<dyn EmbeddingProvider>> {
    let stats = store.stats();
    match stats.embedding_model.as_str() {
        "openai" => embedder(EmbedderArg::Openai, None),
        "hashing" => embedder(EmbedderArg::Hashing, Some(stats.dimension)),
        other => bail!("index was built with unsupported embedding model '{other}'"),
    }
}

/// The answer provider and the model it should use
fn answer_llm(
    kind: LlmArg,
    model: Option<String>,
    rag: &RagConfig,
) -> Result<(Arc<dyn LLMProvider>, String)> {
    let provider: Arc<dyn LLMProvider> = match kind {
        LlmArg::Openai => {
            Arc::new(OpenAIProvider::from_env().context("answer generation needs OPENAI_API_KEY")?)
        }
        LlmArg::Anthropic => Arc::new(
            AnthropicProvider::from_env().context("answer generation needs ANTHROPIC_API_KEY")?,
        ),
    };
    let model = model.unwrap_or_else(|| match kind {
        LlmArg::Openai => rag.answer_model.clone(),
        LlmArg::Anthropic => DEFAULT_ANTHROPIC_MODEL.to_string(),
    });
    Ok((provider, model))
}

fn open_index(rag: &RagConfig) -> Result<VectorStore> {
    let store = VectorStore::open(rag.index_path())?;
    if store.is_empty() {
        bail!(
            "vector index at {} is empty; run `nog corpus build` and `nog index build` first",
            rag.index_path().display()
        );
    }
    Ok(store)
}

pub async fn ingest_news(app: &Config) -> Result<()> {
    let rag = rag_config(app)?;
    let client = NewsApiClient::from_env(rag.request_timeout)?;
    let ingestor = NewsIngestor::new(Arc::new(client), rag.news_path(), rag.news_page_size);

    let state = ingestor.load_state()?;
    let (added, state) = ingestor.ingest(state).await?;
    println!(
        "Added {added} new articles to {} ({} known)",
        ingestor.path().display(),
        state.len()
    );
    Ok(())
}

pub async fn ingest_sec(app: &Config) -> Result<()> {
    let rag = rag_config(app)?;
    let client = SecEdgarClient::from_env(rag.request_timeout);
    let ingestor = SecIngestor::new(
        Arc::new(client),
        rag.ticker.clone(),
        rag.sec_years,
        rag.chunk_size,
    );

    let chunks = ingestor.ingest(Local::now().date_naive()).await?;
    let path = rag.sec_chunks_path();
    write_jsonl(&path, &chunks)?;
    println!("Wrote {} filing chunks to {}", chunks.len(), path.display());
    Ok(())
}

pub async fn ingest_financials(app: &Config) -> Result<()> {
    let rag = rag_config(app)?;
    let client = AlphaVantageClient::from_env(rag.request_timeout)?;
    let ingestor = FinancialsIngestor::new(Arc::new(client), rag.ticker.clone());

    let path = rag.financials_path();
    let quarters = ingestor.ingest(&path).await?;
    println!("Wrote {quarters} quarters to {}", path.display());
    Ok(())
}

pub fn build_corpus(app: &Config) -> Result<()> {
    let rag = rag_config(app)?;
    let stats = CorpusBuilder::new(&rag).build()?;
    println!("Corpus written to {}", rag.corpus_path().display());
    println!("{}", render::corpus_stats(&stats));
    Ok(())
}

pub async fn build_index(app: &Config, kind: EmbedderArg) -> Result<()> {
    let rag = rag_config(app)?;
    let corpus = rag.corpus_path();
    if !corpus.exists() {
        bail!(
            "corpus not found at {}; run `nog corpus build` first",
            corpus.display()
        );
    }

    let embedder = embedder(kind, None)?;
    let store = VectorStore::build_from_jsonl(&rag.index_path(), &corpus, embedder.as_ref()).await?;
    println!("{}", render::store_stats(&store.stats()));
    Ok(())
}

pub async fn ask(
    app: &Config,
    question: &str,
    json: bool,
    llm: LlmArg,
    model: Option<String>,
) -> Result<()> {
    let rag = rag_config(app)?;
    let store = open_index(&rag)?;
    let embedder = embedder_for(&store)?;

    let (llm, model) = answer_llm(llm, model, &rag)?;
    let answerer = AnswerGenerator::new(llm, model, rag.max_tokens, rag.temperature);

    let system = AnalysisSystem::new(embedder, store, answerer, rag.top_k).await?;
    info!("Answering: {question}");
    let response = system.analyze(question).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        println!("{}", render::analysis(&response));
    }
    Ok(())
}

pub fn stats(app: &Config) -> Result<()> {
    let rag = rag_config(app)?;
    let store = VectorStore::open(rag.index_path())?;
    if store.is_empty() {
        println!("No vector index at {}", rag.index_path().display());
        return Ok(());
    }
    println!("{}", render::store_stats(&store.stats()));
    Ok(())
}
