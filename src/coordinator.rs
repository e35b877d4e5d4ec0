//! Process-wide lifecycle for crawling: `startIndexing`, `stopIndexing`,
//! `indexPage`, and the §4.7 [SUPPLEMENT] `reindex_site` (§4.5).

use crate::analyzer::{collect_lemmas, Morphology};
use crate::config::{Config, CrawlConfig};
use crate::crawler::crawl_site;
use crate::domain::models::SiteStatus;
use crate::error::{AppError, Result};
use crate::fetcher::{extract_plain_text, extract_title, Fetcher};
use crate::store::Store;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Process-wide crawl state: a cancellation flag, the configured sites, and
/// a handle to every currently-running per-site crawl task.
pub struct Coordinator {
    store: Arc<Store>,
    fetcher: Arc<Fetcher>,
    morphology: Arc<dyn Morphology>,
    config: Config,
    running: AtomicBool,
    cancel_flag: Arc<AtomicBool>,
    handles: DashMap<String, JoinHandle<()>>,
}

impl Coordinator {
    pub fn new(
        store: Arc<Store>,
        fetcher: Arc<Fetcher>,
        morphology: Arc<dyn Morphology>,
        config: Config,
    ) -> Self {
        Self {
            store,
            fetcher,
            morphology,
            config,
            running: AtomicBool::new(false),
            cancel_flag: Arc::new(AtomicBool::new(false)),
            handles: DashMap::new(),
        }
    }

    pub fn is_indexing(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The morphology provider, for Search's synchronous boundary (§4.6) —
    /// Search runs over Store and Analyzer and does not otherwise touch the
    /// Coordinator.
    pub fn morphology(&self) -> &dyn Morphology {
        self.morphology.as_ref()
    }

    /// Spawns one Crawler job per configured site. Returns `false` if a crawl
    /// is already running.
    pub async fn start_indexing(&self) -> Result<bool> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Ok(false);
        }
        self.cancel_flag.store(false, Ordering::SeqCst);

        for site_config in &self.config.sites {
            self.spawn_site_crawl(&site_config.url, &site_config.name, self.config.crawl.clone())
                .await?;
        }

        Ok(true)
    }

    /// Requests all active crawls to stop, waits up to 5 seconds, then forces
    /// every site still INDEXING to FAILED. Returns `false` if not running.
    pub async fn stop_indexing(&self) -> Result<bool> {
        if !self.running.swap(false, Ordering::SeqCst) {
            return Ok(false);
        }
        self.cancel_flag.store(true, Ordering::SeqCst);

        let handles: Vec<_> = self
            .handles
            .iter()
            .map(|entry| entry.key().clone())
            .collect();

        for url in handles {
            if let Some((_, handle)) = self.handles.remove(&url) {
                let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
            }
        }

        for site in self.store.all_sites().await? {
            if site.status == SiteStatus::Indexing {
                self.store
                    .set_site_status(site.id, SiteStatus::Failed, Some("stopped by user"))
                    .await?;
            }
        }

        Ok(true)
    }

    /// Runs the §4.4 per-path procedure for a single path, independent of the
    /// global cancellation flag. Returns an error if `url` isn't owned by any
    /// configured site.
    pub async fn index_page(&self, url: &str) -> Result<()> {
        let (site_url, path) = self
            .resolve_configured_path(url)
            .ok_or_else(|| AppError::input("page not in configured sites"))?;

        let site_config = self
            .config
            .sites
            .iter()
            .find(|s| s.url == site_url)
            .ok_or_else(|| AppError::input("page not in configured sites"))?;

        let site = self
            .store
            .find_or_create_site(&site_config.url, &site_config.name)
            .await?;

        let full_url = format!("{}{}", site.url, path);
        let fetched = self.fetcher.fetch(&full_url).await?;

        let page = self
            .store
            .upsert_page(site.id, &path, fetched.http_code, &fetched.html)
            .await?;

        let text = extract_plain_text(&fetched.html);
        let counts = collect_lemmas(&text, Some(self.morphology.as_ref())).await;
        let entries: Vec<(String, f64)> = counts
            .into_iter()
            .map(|(lemma, count)| (lemma, count as f64))
            .collect();

        self.store
            .write_index_batch(page.id, site.id, &entries)
            .await?;

        Ok(())
    }

    /// [SUPPLEMENT]: `purgeSite` then `startIndexing` for a single site — the
    /// natural generalization of the §4.1 state machine's `INDEXED/FAILED →
    /// INDEXING` "on re-index" transition, scoped to one site rather than the
    /// whole configured set.
    pub async fn reindex_site(&self, site_url: &str) -> Result<()> {
        let site_config = self
            .config
            .sites
            .iter()
            .find(|s| s.url == site_url)
            .ok_or_else(|| AppError::input("page not in configured sites"))?
            .clone();

        self.spawn_site_crawl(&site_config.url, &site_config.name, self.config.crawl.clone())
            .await
    }

    /// §4.1: `purgeSite` then the `→ INDEXING` transition, for both the
    /// whole-config `startIndexing` path and the single-site `reindex_site`
    /// path — a prior run's stale pages must never linger into a new crawl.
    async fn spawn_site_crawl(&self, url: &str, name: &str, crawl_config: CrawlConfig) -> Result<()> {
        let mut site = self.store.find_or_create_site(url, name).await?;
        self.store.purge_site(site.id).await?;
        self.store
            .set_site_status(site.id, SiteStatus::Indexing, None)
            .await?;
        site.status = SiteStatus::Indexing;

        let store = self.store.clone();
        let fetcher = self.fetcher.clone();
        let morphology = self.morphology.clone();
        let cancel_flag = self.cancel_flag.clone();
        let worker_count = crawl_config.workers_per_site;
        let rate_limit = Duration::from_millis(crawl_config.rate_limit_ms);
        let site_url = site.url.clone();

        let handle = tokio::spawn(async move {
            if let Err(err) = crawl_site(
                store,
                fetcher,
                morphology,
                site,
                cancel_flag,
                worker_count,
                rate_limit,
            )
            .await
            {
                tracing::error!(error = %err, "site crawl ended with an error");
            }
        });

        self.handles.insert(site_url, handle);
        Ok(())
    }

    /// Resolves an absolute `url` to `(configured site url, site-relative path)`.
    fn resolve_configured_path(&self, url: &str) -> Option<(String, String)> {
        self.config
            .sites
            .iter()
            .find(|s| url.starts_with(&s.url))
            .map(|s| {
                let path = &url[s.url.len()..];
                let path = if path.is_empty() { "/" } else { path };
                (s.url.clone(), path.to_string())
            })
    }
}
