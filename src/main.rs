//! Process entry point: loads configuration, wires the Store/Fetcher/
//! Analyzer/Coordinator, and drives the Coordinator through its lifecycle.
//!
//! The five request-surface operations (§6) are an external collaborator per
//! the spec — this binary exposes them as a minimal CLI rather than an HTTP/
//! IPC transport, which is out of scope here.

use lexisearch::analyzer::{Morphology, RuleBasedMorphology};
use lexisearch::api::{self, AppState};
use lexisearch::config::Config;
use lexisearch::coordinator::Coordinator;
use lexisearch::fetcher::Fetcher;
use lexisearch::store::Store;
use std::process::ExitCode;
use std::sync::Arc;

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sqlx=warn".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .compact()
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();

    let mut args = std::env::args().skip(1);
    let config_path = std::env::var("LEXISEARCH_CONFIG").unwrap_or_else(|_| "lexisearch.toml".into());
    let command = args.next().unwrap_or_else(|| "serve".into());

    let config = match Config::from_toml_path(&config_path) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("failed to load config at {config_path}: {err:#}");
            return ExitCode::FAILURE;
        }
    };

    let pool = match lexisearch::db::init_db(&config.database_path).await {
        Ok(pool) => pool,
        Err(err) => {
            eprintln!("failed to open database: {err:#}");
            return ExitCode::FAILURE;
        }
    };

    let store = Arc::new(Store::new(pool, config.store.clone()));
    let fetcher = match Fetcher::with_timeout(
        config.user_agent.clone(),
        config.referrer.clone(),
        std::time::Duration::from_secs(config.crawl.fetch_timeout_secs),
    ) {
        Ok(fetcher) => Arc::new(fetcher),
        Err(err) => {
            eprintln!("failed to build fetcher: {err:#}");
            return ExitCode::FAILURE;
        }
    };
    let morphology: Arc<dyn Morphology> = Arc::new(RuleBasedMorphology::new());
    let coordinator = Arc::new(Coordinator::new(
        store.clone(),
        fetcher,
        morphology,
        config,
    ));
    let state = AppState { store, coordinator };

    match command.as_str() {
        "serve" => serve(&state).await,
        "stats" => print_json(
            api::statistics(&state)
                .await
                .map(|statistics| serde_json::json!({"result": true, "statistics": statistics})),
        ),
        "start" => print_json(
            api::start_indexing(&state)
                .await
                .map(|()| serde_json::json!({"result": true})),
        ),
        "stop" => print_json(
            api::stop_indexing(&state)
                .await
                .map(|()| serde_json::json!({"result": true})),
        ),
        "index-page" => {
            let Some(url) = args.next() else {
                eprintln!("usage: lexisearch index-page <url>");
                return ExitCode::FAILURE;
            };
            print_json(
                api::index_page(&state, &url)
                    .await
                    .map(|()| serde_json::json!({"result": true})),
            )
        }
        "search" => {
            let Some(query) = args.next() else {
                eprintln!("usage: lexisearch search <query> [site] [offset] [limit]");
                return ExitCode::FAILURE;
            };
            let site = args.next();
            let offset = args.next().and_then(|s| s.parse().ok()).unwrap_or(0);
            let limit = args.next().and_then(|s| s.parse().ok()).unwrap_or(20);
            print_json(
                api::search(&state, &query, site.as_deref(), offset, limit)
                    .await
                    .map(|(count, data)| {
                        serde_json::json!({"result": true, "count": count, "data": data})
                    }),
            )
        }
        other => {
            eprintln!("unknown command: {other} (expected serve|stats|start|stop|index-page|search)");
            ExitCode::FAILURE
        }
    }
}

/// Starts indexing and runs until interrupted, then stops the crawl cleanly
/// (§4.5 `stopIndexing`'s 5-second grace period).
async fn serve(state: &AppState) -> ExitCode {
    if let Err(err) = api::start_indexing(state).await {
        eprintln!("{err}");
        return ExitCode::FAILURE;
    }
    tracing::info!(sites = state.coordinator.config().sites.len(), "indexing started");

    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::info!("shutdown signal received");
    }

    if let Err(err) = api::stop_indexing(state).await {
        eprintln!("{err}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

/// Prints the already-shaped §6 success payload, or the `{result: false,
/// error}` failure payload.
fn print_json(result: Result<serde_json::Value, lexisearch::error::CommandError>) -> ExitCode {
    match result {
        Ok(payload) => {
            println!("{payload}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            println!(
                "{}",
                serde_json::json!({"result": false, "error": err.to_string()})
            );
            ExitCode::FAILURE
        }
    }
}
