//! Corpus documents and their metadata

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A retrievable piece of text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub text: String,
    pub metadata: Metadata,
}

impl Document {
    pub fn new(text: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            text: text.into(),
            metadata,
        }
    }
}

/// Document metadata. `type` and `source` are always present; anything
/// source-specific (form, accession number, chunk index, ...) lands in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(rename = "type", default = "unknown")]
    pub doc_type: String,
    #[serde(default = "unknown")]
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticker: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

fn unknown() -> String {
    "unknown".to_string()
}

impl Metadata {
    pub fn new(doc_type: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            doc_type: doc_type.into(),
            source: source.into(),
            ..Self::default()
        }
    }

    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_publisher(mut self, publisher: impl Into<String>) -> Self {
        self.publisher = Some(publisher.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_ticker(mut self, ticker: impl Into<String>) -> Self {
        self.ticker = Some(ticker.into());
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_serialization() {
        let metadata = Metadata::new("sec_filing", "sec.gov")
            .with_date("2024-05-01")
            .with_extra("form", "10-Q")
            .with_extra("chunk", 3);

        let json = serde_json::to_value(&metadata).unwrap();
        assert_eq!(json["type"], "sec_filing");
        assert_eq!(json["form"], "10-Q");
        assert_eq!(json["chunk"], 3);
        assert!(json.get("title").is_none());

        let back: Metadata = serde_json::from_value(json).unwrap();
        assert_eq!(back, metadata);
    }

    #[test]
    fn test_missing_fields_default_to_unknown() {
        let metadata: Metadata = serde_json::from_str(r#"{"date": "2024-01-01"}"#).unwrap();
        assert_eq!(metadata.doc_type, "unknown");
        assert_eq!(metadata.source, "unknown");
    }
}
