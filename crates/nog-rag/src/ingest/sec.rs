//! SEC filing ingestion: download, strip markup, chunk

use crate::api::{Filing, FilingSource, FilingType};
use crate::corpus::{Document, Metadata};
use crate::error::{RagError, Result};
use chrono::{Duration, NaiveDate};
use regex::Regex;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Remove markup from a filing document and normalise whitespace
pub fn strip_tags(raw: &str) -> Result<String> {
    let blocks = Regex::new(r"(?is)<(script|style)[^>]*>.*?</(script|style)>")
        .map_err(|e| RagError::InvalidPattern(e.to_string()))?;
    let tags = Regex::new(r"(?s)<[^>]*>").map_err(|e| RagError::InvalidPattern(e.to_string()))?;

    let text = blocks.replace_all(raw, " ");
    let text = tags.replace_all(&text, " ");
    let text = text
        .replace("&nbsp;", " ")
        .replace("&#160;", " ")
        .replace("&#xa0;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&");

    Ok(text.split_whitespace().collect::<Vec<_>>().join(" "))
}

/// Split on word boundaries into chunks of at most `size` characters.
/// A single word longer than `size` becomes its own chunk.
pub fn chunk_text(text: &str, size: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();
        if current_len > 0 && current_len + 1 + word_len > size {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(word);
        current_len += word_len;
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Turns recent 10-K/10-Q filings into corpus chunks
pub struct SecIngestor {
    source: Arc<dyn FilingSource>,
    ticker: String,
    years: u32,
    chunk_size: usize,
}

impl SecIngestor {
    pub fn new(
        source: Arc<dyn FilingSource>,
        ticker: impl Into<String>,
        years: u32,
        chunk_size: usize,
    ) -> Self {
        Self {
            source,
            ticker: ticker.into(),
            years,
            chunk_size,
        }
    }

    /// Chunks of every periodic filing from the last `years` years. A filing
    /// that fails to download is skipped.
    #[instrument(skip(self), fields(ticker = %self.ticker))]
    pub async fn ingest(&self, today: NaiveDate) -> Result<Vec<Document>> {
        let since = today - Duration::days(365 * i64::from(self.years));
        let filings = self
            .source
            .filings(&self.ticker, &FilingType::PERIODIC, since)
            .await?;
        info!("Found {} filings since {}", filings.len(), since);

        let mut documents = Vec::new();
        for filing in &filings {
            match self.source.document(filing).await {
                Ok(raw) => documents.extend(self.filing_documents(filing, &raw)?),
                Err(e) => warn!(
                    "Error downloading filing {}: {}",
                    filing.accession_number, e
                ),
            }
        }

        info!("Created {} filing chunks", documents.len());
        Ok(documents)
    }

    fn filing_documents(&self, filing: &Filing, raw: &str) -> Result<Vec<Document>> {
        let text = strip_tags(raw)?;
        let form = filing.form.as_str();
        let date = filing.filing_date.to_string();

        Ok(chunk_text(&text, self.chunk_size)
            .into_iter()
            .enumerate()
            .map(|(index, chunk)| {
                let metadata = Metadata::new("sec_filing", "sec.gov")
                    .with_date(date.clone())
                    .with_ticker(self.ticker.clone())
                    .with_url(filing.document_url())
                    .with_extra("form", form)
                    .with_extra("accession_number", filing.accession_number.clone())
                    .with_extra("chunk", index);
                Document::new(
                    format!("Filing type {form} submitted by {} on {date}. {chunk}", self.ticker),
                    metadata,
                )
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockFilingSource;

    fn filing(accession: &str) -> Filing {
        Filing {
            cik: "1104485".into(),
            accession_number: accession.into(),
            form: FilingType::Form10Q,
            filing_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            primary_document: "nog.htm".into(),
        }
    }

    #[test]
    fn test_strip_tags() {
        let raw = "<html><head><style>p { color: red; }</style></head>\
                   <body><p>Net&nbsp;income   rose</p>\n<div>R&amp;D &lt;flat&gt;</div>\
                   <script type=\"text/javascript\">var x = 1;</script></body></html>";
        assert_eq!(strip_tags(raw).unwrap(), "Net income rose R&D <flat>");
    }

    #[test]
    fn test_chunk_text_respects_size() {
        let text = "alpha beta gamma delta epsilon zeta eta theta";
        let chunks = chunk_text(text, 12);
        assert!(chunks.iter().all(|c| c.chars().count() <= 12));
        assert_eq!(chunks.join(" "), text);

        assert_eq!(chunk_text("averyveryverylongword", 5), vec!["averyveryverylongword"]);
        assert!(chunk_text("   ", 10).is_empty());
    }

    #[tokio::test]
    async fn test_ingest_skips_failed_downloads() {
        let mut source = MockFilingSource::new();
        source
            .expect_filings()
            .times(1)
            .returning(|_, _, _| Ok(vec![filing("0001-24-1"), filing("0001-24-2")]));
        source.expect_document().returning(|f| {
            if f.accession_number.ends_with('1') {
                Ok("<p>Production averaged 120,000 Boe per day.</p>".to_string())
            } else {
                Err(RagError::SecError("HTTP 503".to_string()))
            }
        });

        let ingestor = SecIngestor::new(Arc::new(source), "NOG", 2, 1000);
        let docs = ingestor
            .ingest(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap())
            .await
            .unwrap();

        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].metadata.doc_type, "sec_filing");
        assert_eq!(docs[0].metadata.extra["form"], "10-Q");
        assert!(docs[0].text.starts_with("Filing type 10-Q submitted by NOG on 2024-05-01."));
        assert!(docs[0].text.contains("120,000 Boe"));
    }
}
