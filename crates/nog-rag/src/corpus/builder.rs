//! Corpus assembly from every ingested source

use super::{Document, Metadata, read_jsonl, write_jsonl};
use crate::config::RagConfig;
use crate::error::Result;
use crate::ingest::{NewsRecord, read_news_csv};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

/// Documents shorter than this (in characters) are dropped
pub const MIN_DOCUMENT_CHARS: usize = 20;
const MIN_NEWS_CHARS: usize = 10;

/// Collapse runs of whitespace; `nan`/`None` placeholders become empty
pub fn clean_text(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.eq_ignore_ascii_case("nan") || trimmed == "None" {
        return String::new();
    }
    trimmed.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// `$1.2M`, `$4.5K` or `$12.00`
pub fn format_amount(value: f64) -> String {
    if value > 1e6 {
        format!("${:.1}M", value / 1e6)
    } else if value > 1e3 {
        format!("${:.1}K", value / 1e3)
    } else {
        format!("${value:.2}")
    }
}

/// Static background documents about the company
pub fn company_overview() -> Vec<Document> {
    let background = |doc_type: &str, text: &str| {
        Document::new(text, Metadata::new(doc_type, "company_background"))
    };

    vec![
        background(
            "overview",
            "Northern Oil and Gas (NOG) is a publicly traded independent energy company focused on \
             the acquisition, exploration, and development of oil and gas properties in the United \
             States. The company primarily operates in the Williston Basin in North Dakota and \
             Montana, as well as the Permian Basin in Texas and New Mexico. NOG follows a \
             non-operated business model, partnering with established operators to develop oil and \
             gas assets while minimizing operational risks and capital requirements.",
        ),
        background(
            "strategy",
            "NOG's business strategy focuses on acquiring high-quality, long-lived oil and gas \
             properties with predictable production profiles. The company targets assets with low \
             decline rates, strong cash flow generation, and significant development upside. NOG \
             typically acquires working interests in producing wells and undeveloped acreage, \
             allowing it to participate in future drilling programs without bearing the full cost \
             and operational risk of being the operator.",
        ),
        background(
            "operations",
            "The company's primary operating areas include the Williston Basin (Bakken/Three Forks \
             formations) and the Permian Basin (Wolfcamp, Bone Spring, and Delaware formations). \
             These are among the most prolific oil-producing regions in the United States, with \
             significant remaining reserves and development potential. NOG's diversified portfolio \
             across multiple basins helps reduce geographic concentration risk.",
        ),
    ]
}

/// One document per article with meaningful text (content, else description)
pub fn news_documents(records: &[NewsRecord]) -> Vec<Document> {
    records
        .iter()
        .filter_map(|record| {
            let text = clean_text(record.body());
            if text.chars().count() <= MIN_NEWS_CHARS {
                return None;
            }
            let metadata = Metadata::new("news", "news")
                .with_date(record.date.trim())
                .with_title(clean_text(&record.title))
                .with_publisher(clean_text(&record.publisher))
                .with_url(record.url.trim());
            Some(Document::new(text, metadata))
        })
        .collect()
}

/// One summary document per CSV row: `"<heading> for <date>: col: $x; ..."`
pub fn tabular_documents(
    path: &Path,
    heading: &str,
    doc_type: &str,
    source: &str,
) -> Result<Vec<Document>> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();
    let date_index = headers.iter().position(|h| h == "date");

    let mut documents = Vec::new();
    for record in reader.records() {
        let record = record?;
        let date = date_index
            .and_then(|i| record.get(i))
            .map(str::trim)
            .filter(|d| !d.is_empty());

        let metrics: Vec<String> = headers
            .iter()
            .zip(record.iter())
            .enumerate()
            .filter(|(i, _)| Some(*i) != date_index)
            .filter_map(|(_, (column, raw))| {
                let value = clean_text(raw);
                if value.is_empty() {
                    return None;
                }
                let value = match value.parse::<f64>() {
                    Ok(number) if number.is_finite() => format_amount(number),
                    _ => value,
                };
                Some(format!("{column}: {value}"))
            })
            .collect();

        if metrics.is_empty() {
            continue;
        }

        let mut metadata = Metadata::new(doc_type, source);
        if let Some(date) = date {
            metadata = metadata.with_date(date);
        }
        documents.push(Document::new(
            format!(
                "{heading} for {}: {}",
                date.unwrap_or("Unknown Date"),
                metrics.join("; ")
            ),
            metadata,
        ));
    }

    Ok(documents)
}

/// Document counts by source and by type
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusStats {
    pub total: usize,
    pub by_source: BTreeMap<String, usize>,
    pub by_type: BTreeMap<String, usize>,
}

impl CorpusStats {
    pub fn from_documents(documents: &[Document]) -> Self {
        let mut stats = Self {
            total: documents.len(),
            ..Self::default()
        };
        for doc in documents {
            *stats.by_source.entry(doc.metadata.source.clone()).or_insert(0) += 1;
            *stats.by_type.entry(doc.metadata.doc_type.clone()).or_insert(0) += 1;
        }
        stats
    }
}

/// Builds the comprehensive corpus from whatever ingested files exist
pub struct CorpusBuilder<'a> {
    config: &'a RagConfig,
}

impl<'a> CorpusBuilder<'a> {
    pub fn new(config: &'a RagConfig) -> Self {
        Self { config }
    }

    /// Overview, news, financial, earnings and filing documents, cleaned and
    /// filtered. A source whose file is missing contributes nothing.
    pub fn collect(&self) -> Result<Vec<Document>> {
        let mut documents = company_overview();

        let news = read_news_csv(&self.config.news_path())?;
        documents.extend(news_documents(&news));

        for (path, heading, doc_type, source) in [
            (self.config.financials_path(), "Financial Data", "financial", "financials"),
            (self.config.earnings_path(), "Earnings Report", "earnings", "earnings"),
        ] {
            if !path.exists() {
                continue;
            }
            match tabular_documents(&path, heading, doc_type, source) {
                Ok(docs) => documents.extend(docs),
                Err(e) => warn!("Error loading {} data: {}", doc_type, e),
            }
        }

        let sec_path = self.config.sec_chunks_path();
        if sec_path.exists() {
            documents.extend(read_jsonl(&sec_path)?);
        }

        Ok(documents
            .into_iter()
            .filter_map(|mut doc| {
                doc.text = clean_text(&doc.text);
                (doc.text.chars().count() > MIN_DOCUMENT_CHARS).then_some(doc)
            })
            .collect())
    }

    /// Collect and write the corpus JSONL
    pub fn build(&self) -> Result<CorpusStats> {
        let documents = self.collect()?;
        let path = self.config.corpus_path();
        write_jsonl(&path, &documents)?;

        let stats = CorpusStats::from_documents(&documents);
        info!(
            "Corpus saved to {} with {} documents",
            path.display(),
            stats.total
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::news::append_news_csv;
    use tempfile::TempDir;

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("  Oil \n\t prices   rise "), "Oil prices rise");
        assert_eq!(clean_text("nan"), "");
        assert_eq!(clean_text("None"), "");
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(396_000_000.0), "$396.0M");
        assert_eq!(format_amount(12_500.0), "$12.5K");
        assert_eq!(format_amount(0.42), "$0.42");
        assert_eq!(format_amount(1_000_000.0), "$1000.0K");
    }

    #[test]
    fn test_news_documents_fall_back_to_description() {
        let records = vec![
            NewsRecord {
                title: "Deal".into(),
                description: "Northern Oil and Gas announced a bolt-on deal.".into(),
                url: "https://x/1".into(),
                content: "nan".into(),
                ..NewsRecord::default()
            },
            NewsRecord {
                description: "short".into(),
                url: "https://x/2".into(),
                ..NewsRecord::default()
            },
        ];

        let docs = news_documents(&records);
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].text, "Northern Oil and Gas announced a bolt-on deal.");
        assert_eq!(docs[0].metadata.url.as_deref(), Some("https://x/1"));
    }

    #[test]
    fn test_tabular_documents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("financials.csv");
        std::fs::write(
            &path,
            "date,reportedCurrency_income,totalRevenue,netIncome\n2024-03-31,USD,396000000,None\n",
        )
        .unwrap();

        let docs = tabular_documents(&path, "Financial Data", "financial", "financials").unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(
            docs[0].text,
            "Financial Data for 2024-03-31: reportedCurrency_income: USD; totalRevenue: $396.0M"
        );
        assert_eq!(docs[0].metadata.date.as_deref(), Some("2024-03-31"));
    }

    #[test]
    fn test_build_corpus() {
        let dir = TempDir::new().unwrap();
        let config = RagConfig::default().with_data_dir(dir.path());

        append_news_csv(
            &config.news_path(),
            &[NewsRecord {
                date: "2024-05-01".into(),
                title: "Update".into(),
                content: "NOG raised its full-year production guidance.".into(),
                url: "https://x/1".into(),
                ..NewsRecord::default()
            }],
        )
        .unwrap();
        std::fs::create_dir_all(config.financials_path().parent().unwrap()).unwrap();
        std::fs::write(config.financials_path(), "date,totalRevenue\n2024-03-31,396000000\n").unwrap();

        let stats = CorpusBuilder::new(&config).build().unwrap();

        assert_eq!(stats.total, 5);
        assert_eq!(stats.by_source["company_background"], 3);
        assert_eq!(stats.by_type["news"], 1);
        assert_eq!(stats.by_type["financial"], 1);
        assert_eq!(read_jsonl(&config.corpus_path()).unwrap().len(), 5);
    }
}
