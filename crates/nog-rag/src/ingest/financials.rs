//! Quarterly financial statements merged into one CSV

use crate::api::{StatementKind, StatementRow, StatementSource};
use crate::error::{RagError, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument};

const FISCAL_DATE: &str = "fiscalDateEnding";

/// Join income statement and balance sheet rows on fiscal date, newest first.
///
/// The merged row has a `date` column. Columns present in both statements get
/// `_income` / `_balance` suffixes; quarters missing from either side are dropped.
pub fn merge_statements(income: &[StatementRow], balance: &[StatementRow]) -> Vec<StatementRow> {
    let income_columns: BTreeSet<&str> = income.iter().flat_map(|r| r.keys()).map(String::as_str).collect();
    let balance_columns: BTreeSet<&str> = balance.iter().flat_map(|r| r.keys()).map(String::as_str).collect();
    let shared: BTreeSet<&str> = income_columns.intersection(&balance_columns).copied().collect();

    let balance_by_date: BTreeMap<&str, &StatementRow> = balance
        .iter()
        .filter_map(|row| row.get(FISCAL_DATE).map(|d| (d.as_str(), row)))
        .collect();

    let mut merged: Vec<StatementRow> = income
        .iter()
        .filter_map(|income_row| {
            let date = income_row.get(FISCAL_DATE)?;
            let balance_row = balance_by_date.get(date.as_str())?;

            let mut row = StatementRow::new();
            row.insert("date".to_string(), date.clone());
            for (side, suffix) in [(income_row, "_income"), (*balance_row, "_balance")] {
                for (key, value) in side {
                    if key == FISCAL_DATE {
                        continue;
                    }
                    let column = if shared.contains(key.as_str()) {
                        format!("{key}{suffix}")
                    } else {
                        key.clone()
                    };
                    row.insert(column, value.clone());
                }
            }
            Some(row)
        })
        .collect();

    // ISO dates sort lexicographically
    merged.sort_by(|a, b| b["date"].cmp(&a["date"]));
    merged
}

/// Write merged rows with `date` first and the remaining columns sorted
pub fn write_financials_csv(path: &Path, rows: &[StatementRow]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let columns: BTreeSet<&str> = rows
        .iter()
        .flat_map(|r| r.keys())
        .map(String::as_str)
        .filter(|c| *c != "date")
        .collect();

    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(std::iter::once("date").chain(columns.iter().copied()))?;
    for row in rows {
        let date = row.get("date").map_or("", String::as_str);
        let values = columns.iter().map(|c| row.get(*c).map_or("", String::as_str));
        writer.write_record(std::iter::once(date).chain(values))?;
    }
    writer.flush()?;
    Ok(())
}

/// Fetches both statements and writes the merged quarterly table
pub struct FinancialsIngestor {
    source: Arc<dyn StatementSource>,
    symbol: String,
}

impl FinancialsIngestor {
    pub fn new(source: Arc<dyn StatementSource>, symbol: impl Into<String>) -> Self {
        Self {
            source,
            symbol: symbol.into(),
        }
    }

    #[instrument(skip(self, path), fields(symbol = %self.symbol))]
    pub async fn ingest(&self, path: &Path) -> Result<usize> {
        let income = self
            .source
            .quarterly_reports(&self.symbol, StatementKind::IncomeStatement)
            .await?;
        let balance = self
            .source
            .quarterly_reports(&self.symbol, StatementKind::BalanceSheet)
            .await?;

        let merged = merge_statements(&income, &balance);
        if merged.is_empty() {
            return Err(RagError::AlphaVantageError(
                "no quarter present in both statements".to_string(),
            ));
        }

        write_financials_csv(path, &merged)?;
        info!("Wrote {} quarters to {}", merged.len(), path.display());
        Ok(merged.len())
    }
}
