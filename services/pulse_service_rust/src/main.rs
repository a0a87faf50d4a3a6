mod config;

use anyhow::Result;
use config::{Config, ServiceMode};
use dotenv::dotenv;
use polypulse_core::clients::{
    ChatCompletion, GammaClient, OpenRouterClient, PaperPublisher, PollPublisher, XClient,
};
use polypulse_core::db::health::check_pool_health;
use polypulse_core::db::schema::ensure_schema;
use polypulse_core::db::{create_pool, PgStore, RecordStore};
use polypulse_core::{trigger_response, Enricher, Pipeline, Profile, Sink};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "pulse_service_rust=info,pulse_service=info,polypulse_core=info";

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();

    // stdout carries the JSON result; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .init();

    match run().await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("pulse service failed: {:#}", e);
            println!(
                "{}",
                serde_json::json!({ "success": false, "error": format!("{:#}", e) })
            );
            ExitCode::FAILURE
        }
    }
}

/// Returns whether the last run succeeded.
async fn run() -> Result<bool> {
    info!("Starting Polypulse service...");

    let cfg = Config::from_env()?;
    info!(
        "Config: mode={:?} feed_limit={} batch_size={} window={}h enrichment={} paper={} interval={:?}",
        cfg.mode,
        cfg.pipeline.fetch_limit,
        cfg.pipeline.batch_size,
        cfg.pipeline.dedup_window.num_hours(),
        cfg.openrouter.is_some(),
        cfg.paper_posting,
        cfg.run_interval,
    );

    let pool = create_pool(&cfg.database_url, &cfg.db_pool).await?;
    check_pool_health(&pool).await?;
    ensure_schema(&pool).await?;
    let store: Arc<dyn RecordStore> = Arc::new(PgStore::new(pool));

    if cfg.mode == ServiceMode::Feed {
        let entries = store.recent_feed_entries(cfg.feed_display_limit).await?;
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(true);
    }

    let pipeline = build_pipeline(&cfg, store);

    let Some(interval) = cfg.run_interval else {
        return Ok(run_once(&pipeline).await);
    };

    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                run_once(&pipeline).await;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received, stopping");
                return Ok(true);
            }
        }
    }
}

fn build_pipeline(cfg: &Config, store: Arc<dyn RecordStore>) -> Pipeline {
    let feed = Arc::new(GammaClient::new(cfg.gamma_api_url.clone()));

    let backend: Option<Arc<dyn ChatCompletion>> = cfg.openrouter.clone().map(|or_cfg| {
        info!("Enrichment via OpenRouter model {}", or_cfg.model);
        Arc::new(OpenRouterClient::new(or_cfg)) as Arc<dyn ChatCompletion>
    });

    let (profile, sink) = match cfg.mode {
        ServiceMode::Log => (Profile::CynicalTake, Sink::Log),
        ServiceMode::Publish | ServiceMode::Feed => {
            let publisher: Arc<dyn PollPublisher> = match (&cfg.x_access_token, cfg.paper_posting) {
                (Some(token), false) => {
                    Arc::new(XClient::new(cfg.x_api_base_url.clone(), token.clone()))
                }
                _ => {
                    warn!("Paper posting enabled: polls are logged, not sent");
                    Arc::new(PaperPublisher)
                }
            };
            (Profile::NeutralFact, Sink::Publish(publisher))
        }
    };

    Pipeline::new(
        cfg.pipeline.clone(),
        feed,
        Enricher::new(backend, profile),
        store,
        sink,
    )
}

async fn run_once(pipeline: &Pipeline) -> bool {
    let result = pipeline.run().await;
    if let Err(e) = &result {
        error!(code = e.code(), "run failed: {}", e);
    }
    println!("{}", trigger_response(&result));
    result.is_ok()
}
