//! Terminal tables for command output

use comfy_table::presets::UTF8_FULL;
use comfy_table::{CellAlignment, ContentArrangement, Table};
use nog_forecast::data::{DataOutput, NewsRefreshOutcome, PriceRefreshOutcome};
use nog_forecast::{PerformanceRecord, PredictionRecord, UpdateStatus};
use nog_rag::{AnalysisResponse, CorpusStats, StoreStats};
use std::collections::BTreeMap;

fn table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn right_align(table: &mut Table, columns: std::ops::Range<usize>) {
    for index in columns {
        if let Some(column) = table.column_mut(index) {
            column.set_cell_alignment(CellAlignment::Right);
        }
    }
}

fn key_values(rows: Vec<(&str, String)>) -> Table {
    let mut out = table(vec!["Field", "Value"]);
    for (key, value) in rows {
        out.add_row(vec![key.to_string(), value]);
    }
    out
}

fn counts(label: &str, values: &BTreeMap<String, usize>) -> Table {
    let mut out = table(vec![label, "Documents"]);
    for (key, count) in values {
        out.add_row(vec![key.clone(), count.to_string()]);
    }
    right_align(&mut out, 1..2);
    out
}

pub fn update_status(status: &UpdateStatus) -> Table {
    key_values(vec![
        ("State", format!("{:?}", status.state)),
        ("Last update", status.last_update.clone()),
        ("Next scheduled update", status.next_scheduled_update.clone()),
        (
            "Days since update",
            status
                .days_since_update
                .map_or_else(|| "-".to_string(), |d| d.to_string()),
        ),
        ("Days until next update", status.days_until_next_update.to_string()),
        ("Last update succeeded", status.update_success.to_string()),
    ])
}

pub fn predictions(records: &[PredictionRecord]) -> Table {
    let mut out = table(vec!["Date", "Predicted", "Lower", "Upper", "Model"]);
    for record in records {
        out.add_row(vec![
            record.date.to_string(),
            format!("{:.2}", record.predicted_price),
            format!("{:.2}", record.confidence_interval.lower),
            format!("{:.2}", record.confidence_interval.upper),
            record.model_version.clone(),
        ]);
    }
    right_align(&mut out, 1..4);
    out
}

pub fn performance_history(records: &[PerformanceRecord]) -> Table {
    let mut out = table(vec!["Trained", "MSE", "MAE", "R2", "Rows", "Train", "Test"]);
    for record in records {
        out.add_row(vec![
            record.training_date.format("%Y-%m-%d %H:%M").to_string(),
            format!("{:.4}", record.metrics.mse),
            format!("{:.4}", record.metrics.mae),
            format!("{:.4}", record.metrics.r2),
            record.data_shape.0.to_string(),
            record.train_size.to_string(),
            record.test_size.to_string(),
        ]);
    }
    right_align(&mut out, 1..7);
    out
}

fn describe_price_refresh(outcome: &PriceRefreshOutcome) -> String {
    match outcome {
        PriceRefreshOutcome::NotRequested => "not requested".to_string(),
        PriceRefreshOutcome::Appended { rows } => format!("appended {rows} rows"),
        PriceRefreshOutcome::UpToDate => "up to date".to_string(),
        PriceRefreshOutcome::Degraded { error } => format!("degraded: {error}"),
    }
}

fn describe_news_refresh(outcome: &NewsRefreshOutcome) -> String {
    match outcome {
        NewsRefreshOutcome::Skipped => "skipped".to_string(),
        NewsRefreshOutcome::Refreshed { articles } => format!("{articles} new articles"),
        NewsRefreshOutcome::Failed { error } => format!("failed: {error}"),
    }
}

pub fn data_summary(output: &DataOutput) -> Table {
    let range = match (output.prices.first(), output.prices.last()) {
        (Some(first), Some(last)) => format!("{} to {}", first.date, last.date),
        _ => "-".to_string(),
    };

    key_values(vec![
        ("Price rows", output.prices.len().to_string()),
        ("Price range", range),
        ("Macro rows", output.macro_records.len().to_string()),
        ("Feature rows", output.frame.len().to_string()),
        ("Feature columns", output.frame.columns().len().to_string()),
        ("Price refresh", describe_price_refresh(&output.price_refresh)),
        ("News refresh", describe_news_refresh(&output.news_refresh)),
    ])
}

pub fn corpus_stats(stats: &CorpusStats) -> String {
    format!(
        "Total documents: {}\n{}\n{}",
        stats.total,
        counts("Source", &stats.by_source),
        counts("Type", &stats.by_type)
    )
}

pub fn store_stats(stats: &StoreStats) -> String {
    let summary = key_values(vec![
        ("Documents", stats.total_documents.to_string()),
        ("Embedding model", stats.embedding_model.clone()),
        ("Dimension", stats.dimension.to_string()),
    ]);
    format!("{summary}\n{}", counts("Type", &stats.by_type))
}

pub fn analysis(response: &AnalysisResponse) -> String {
    let mut out = table(vec!["#", "Type", "Source", "Date", "Score", "Excerpt"]);
    for (index, source) in response.sources.iter().enumerate() {
        let meta = &source.metadata;
        out.add_row(vec![
            (index + 1).to_string(),
            meta.doc_type.clone(),
            meta.source.clone(),
            meta.date.clone().unwrap_or_default(),
            format!("{:.3}", source.relevance_score),
            source.text.clone(),
        ]);
    }

    format!(
        "{}\n\nIntent: {}  Confidence: {:?}\n{}",
        response.answer, response.intent, response.confidence, out
    )
}
