//! Document corpus: types, JSONL persistence and assembly

pub mod builder;
pub mod document;
pub mod jsonl;

pub use builder::{CorpusBuilder, CorpusStats, clean_text, company_overview, format_amount};
pub use document::{Document, Metadata};
pub use jsonl::{read_jsonl, write_jsonl};
