//! Forecast subcommands: weekly run, status, predictions, history, data

use crate::render;
use anyhow::{Context, Result};
use nog_forecast::weekly::{PredictionStore, TrackerStore};
use nog_forecast::{
    CachedMacroSource, DataPipeline, DataRefresh, DataRequest, ForecastConfig, ForecastMode,
    FredClient, NewsRefresher, RunOptions, WeeklyPredictionPipeline, YahooFinanceClient,
};
use nog_rag::api::NewsApiClient;
use nog_rag::{NewsIngestor, RagConfig};
use nog_utils::Config;
use std::sync::Arc;
use tracing::{info, warn};

fn forecast_config(app: &Config) -> Result<Arc<ForecastConfig>> {
    let config = ForecastConfig::builder()
        .data_dir(app.data_dir.clone())
        .with_env_api_key()
        .build()?;
    Ok(Arc::new(config))
}

fn prediction_store(config: &ForecastConfig) -> PredictionStore {
    PredictionStore::new(config.predictions_path(), config.performance_path())
}

/// News is refreshed on every run when a NewsAPI key is configured
fn news_refresher(app: &Config) -> Result<Option<Arc<dyn NewsRefresher>>> {
    if std::env::var_os("NEWS_API_KEY").is_none() {
        info!("NEWS_API_KEY not set, news refresh disabled");
        return Ok(None);
    }

    let rag = RagConfig::default().with_data_dir(app.data_dir.clone());
    let client = NewsApiClient::from_env(rag.request_timeout)?;
    let ingestor = NewsIngestor::new(Arc::new(client), rag.news_path(), rag.news_page_size);
    Ok(Some(Arc::new(ingestor)))
}

fn data_pipeline(app: &Config, config: &Arc<ForecastConfig>) -> Result<DataPipeline> {
    let api_key = config
        .fred_api_key
        .clone()
        .context("FRED_API_KEY environment variable not set")?;

    let fred = FredClient::with_timeout(api_key, None, config.request_timeout);
    let macros = CachedMacroSource::new(Arc::new(fred), config.macro_cache_ttl);
    let prices = YahooFinanceClient::new().with_timeout(config.request_timeout);

    let mut pipeline = DataPipeline::new(config.clone(), Arc::new(prices), Arc::new(macros));
    if let Some(news) = news_refresher(app)? {
        pipeline = pipeline.with_news_refresher(news);
    }
    Ok(pipeline)
}

/// Run the weekly pipeline, print its report and return whether it succeeded
pub async fn weekly(
    app: &Config,
    refresh: DataRefresh,
    retrain: bool,
    days: Option<usize>,
    mode: ForecastMode,
) -> Result<bool> {
    let config = forecast_config(app)?;
    let data = data_pipeline(app, &config)?;

    let options = RunOptions {
        refresh,
        retrain,
        prediction_days: days.unwrap_or(config.prediction_days),
        mode,
    };
    let pipeline = WeeklyPredictionPipeline::new(config, data);
    let report = pipeline.run(options).await;

    println!("{}", serde_json::to_string_pretty(&report)?);

    if !report.is_success() {
        warn!("Weekly pipeline finished with status {:?}", report.status);
    }
    Ok(report.is_success())
}

pub fn status(app: &Config) -> Result<()> {
    let config = forecast_config(app)?;
    let tracker = TrackerStore::new(config.tracker_path());
    println!("{}", render::update_status(&tracker.status()));
    Ok(())
}

pub fn predictions(app: &Config) -> Result<()> {
    let config = forecast_config(app)?;
    match prediction_store(&config).latest_predictions()? {
        Some(records) if !records.is_empty() => println!("{}", render::predictions(&records)),
        _ => println!("No predictions saved yet. Run `nog weekly` first."),
    }
    Ok(())
}

pub fn history(app: &Config, limit: usize) -> Result<()> {
    let config = forecast_config(app)?;
    let records = prediction_store(&config).performance_history();
    if records.is_empty() {
        println!("No training runs recorded yet.");
        return Ok(());
    }

    let recent = &records[records.len().saturating_sub(limit)..];
    println!("{}", render::performance_history(recent));
    Ok(())
}

pub async fn data(app: &Config, refresh: bool) -> Result<()> {
    let config = forecast_config(app)?;
    let pipeline = data_pipeline(app, &config)?;

    let output = pipeline
        .run(DataRequest {
            refresh,
            ..DataRequest::default()
        })
        .await?;

    println!("{}", render::data_summary(&output));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_forecast_paths_follow_data_dir() {
        let dir = TempDir::new().unwrap();
        let app = Config::default().with_data_dir(dir.path());

        let config = forecast_config(&app).unwrap();
        assert!(config.tracker_path().starts_with(dir.path()));
        assert!(config.predictions_path().starts_with(dir.path()));
    }

    #[test]
    fn test_read_commands_on_empty_data_dir() {
        let dir = TempDir::new().unwrap();
        let app = Config::default().with_data_dir(dir.path());

        status(&app).unwrap();
        predictions(&app).unwrap();
        history(&app, 5).unwrap();
    }
}
