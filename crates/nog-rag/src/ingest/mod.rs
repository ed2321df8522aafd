//! Ingestion of news, SEC filings and financial statements

pub mod financials;
pub mod news;
pub mod sec;

pub use financials::{FinancialsIngestor, merge_statements, write_financials_csv};
pub use news::{IngestState, NewsIngestor, NewsRecord, dedupe_articles, read_news_csv};
pub use sec::{SecIngestor, chunk_text, strip_tags};
