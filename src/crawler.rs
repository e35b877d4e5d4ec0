//! Per-site recursive frontier traversal with deduplication and cooperative
//! cancellation (§4.4): a fixed-size worker pool draining a shared frontier.

use crate::analyzer::{collect_lemmas, Morphology};
use crate::domain::models::{Site, SiteStatus};
use crate::error::Result;
use crate::fetcher::{extract_plain_text, Fetcher};
use crate::store::Store;
use dashmap::DashSet;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Shared state for one site's crawl, handed to every worker in the pool.
struct CrawlState {
    site: Site,
    store: Arc<Store>,
    fetcher: Arc<Fetcher>,
    morphology: Arc<dyn Morphology>,
    visited: DashSet<String>,
    frontier: Mutex<VecDeque<String>>,
    in_flight: AtomicUsize,
    cancel_flag: Arc<AtomicBool>,
    rate_limit: Duration,
}

/// Runs one site's crawl to completion (frontier drains), cancellation, or
/// fatal error, transitioning `site.status` accordingly (§4.4 Termination).
pub async fn crawl_site(
    store: Arc<Store>,
    fetcher: Arc<Fetcher>,
    morphology: Arc<dyn Morphology>,
    site: Site,
    cancel_flag: Arc<AtomicBool>,
    worker_count: usize,
    rate_limit: Duration,
) -> Result<()> {
    let visited = DashSet::new();
    visited.insert("/".to_string());
    let mut frontier = VecDeque::new();
    frontier.push_back("/".to_string());

    let state = Arc::new(CrawlState {
        site: site.clone(),
        store: store.clone(),
        fetcher,
        morphology,
        visited,
        frontier: Mutex::new(frontier),
        in_flight: AtomicUsize::new(0),
        cancel_flag: cancel_flag.clone(),
        rate_limit,
    });

    let mut handles = Vec::with_capacity(worker_count);
    for _ in 0..worker_count.max(1) {
        let state = state.clone();
        handles.push(tokio::spawn(async move { worker_loop(state).await }));
    }

    let fatal = futures::future::join_all(handles)
        .await
        .into_iter()
        .find_map(|joined| joined.err().map(|e| e.to_string()));

    if cancel_flag.load(Ordering::Relaxed) {
        store
            .set_site_status(site.id, SiteStatus::Failed, Some("stopped by user"))
            .await?;
    } else if let Some(reason) = fatal {
        store
            .set_site_status(site.id, SiteStatus::Failed, Some(&reason))
            .await?;
    } else {
        store.set_site_status(site.id, SiteStatus::Indexed, None).await?;
    }

    Ok(())
}

async fn worker_loop(state: Arc<CrawlState>) {
    loop {
        if state.cancel_flag.load(Ordering::Relaxed) {
            return;
        }

        let path = {
            let mut frontier = state.frontier.lock().await;
            frontier.pop_front()
        };

        let path = match path {
            Some(path) => {
                state.in_flight.fetch_add(1, Ordering::SeqCst);
                path
            }
            None => {
                if state.in_flight.load(Ordering::SeqCst) == 0 {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(20)).await;
                continue;
            }
        };

        process_path(&state, &path).await;
        state.in_flight.fetch_sub(1, Ordering::SeqCst);

        tokio::time::sleep(state.rate_limit).await;
    }
}

/// The §4.4 per-path procedure, steps 1-6.
async fn process_path(state: &Arc<CrawlState>, path: &str) {
    if state.cancel_flag.load(Ordering::Relaxed) {
        return;
    }

    let url = format!("{}{}", state.site.url, path);
    let fetched = match state.fetcher.fetch(&url).await {
        Ok(result) => result,
        Err(err) => {
            tracing::warn!(path, error = %err, "fetch failed, abandoning path");
            return;
        }
    };

    let page = match state
        .store
        .upsert_page(state.site.id, path, fetched.http_code, &fetched.html)
        .await
    {
        Ok(page) => page,
        Err(err) => {
            tracing::warn!(path, error = %err, "store write failed, abandoning path");
            return;
        }
    };

    let text = extract_plain_text(&fetched.html);
    let counts = collect_lemmas(&text, Some(state.morphology.as_ref())).await;
    let entries: Vec<(String, f64)> = counts
        .into_iter()
        .map(|(lemma, count)| (lemma, count as f64))
        .collect();

    if let Err(err) = state.store.write_index_batch(page.id, state.site.id, &entries).await {
        tracing::warn!(path, error = %err, "index write failed, abandoning path");
        return;
    }

    if let Err(err) = state
        .store
        .set_site_status(state.site.id, SiteStatus::Indexing, None)
        .await
    {
        tracing::warn!(error = %err, "failed to stamp progress");
    }

    for link in fetched.outbound_links {
        if state.visited.insert(link.clone()) {
            state.frontier.lock().await.push_back(link);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::RuleBasedMorphology;
    use crate::config::StoreConfig;

    #[tokio::test]
    async fn crawl_drains_frontier_and_marks_indexed() {
        let mut server = mockito::Server::new_async().await;
        let _root = server
            .mock("GET", "/")
            .with_status(200)
            .with_body(r#"<html><body><a href="/about">About</a>Some root text here</body></html>"#)
            .create_async()
            .await;
        let _about = server
            .mock("GET", "/about")
            .with_status(200)
            .with_body("<html><body>About page text</body></html>")
            .create_async()
            .await;

        let pool = crate::test_utils::setup_test_db().await;
        let store = Arc::new(Store::new(pool, StoreConfig::default()));
        let site = store.find_or_create_site(&server.url(), "Test").await.unwrap();

        let fetcher = Arc::new(Fetcher::new("lexisearch/0.1", "https://lexisearch.local/").unwrap());
        let morphology: Arc<dyn Morphology> = Arc::new(RuleBasedMorphology::new());
        let cancel_flag = Arc::new(AtomicBool::new(false));

        crawl_site(
            store.clone(),
            fetcher,
            morphology,
            site.clone(),
            cancel_flag,
            2,
            Duration::from_millis(1),
        )
        .await
        .unwrap();

        let updated = store.site_by_url(&site.url).await.unwrap().unwrap();
        assert_eq!(updated.status, SiteStatus::Indexed);
        assert_eq!(store.count_pages_of_site(site.id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn cancellation_marks_site_failed() {
        let mut server = mockito::Server::new_async().await;
        let _root = server
            .mock("GET", "/")
            .with_status(200)
            .with_body("<html><body>text</body></html>")
            .create_async()
            .await;

        let pool = crate::test_utils::setup_test_db().await;
        let store = Arc::new(Store::new(pool, StoreConfig::default()));
        let site = store.find_or_create_site(&server.url(), "Test").await.unwrap();

        let fetcher = Arc::new(Fetcher::new("lexisearch/0.1", "https://lexisearch.local/").unwrap());
        let morphology: Arc<dyn Morphology> = Arc::new(RuleBasedMorphology::new());
        let cancel_flag = Arc::new(AtomicBool::new(true));

        crawl_site(
            store.clone(),
            fetcher,
            morphology,
            site.clone(),
            cancel_flag,
            1,
            Duration::from_millis(1),
        )
        .await
        .unwrap();

        let updated = store.site_by_url(&site.url).await.unwrap().unwrap();
        assert_eq!(updated.status, SiteStatus::Failed);
        assert_eq!(updated.last_error.as_deref(), Some("stopped by user"));
    }
}
