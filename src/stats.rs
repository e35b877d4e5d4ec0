//! Read-only aggregation for observers (§4.7): total counts and per-site
//! status, plus the current indexing flag.

use crate::coordinator::Coordinator;
use crate::domain::models::{SiteStatistics, Statistics, TotalStatistics};
use crate::error::Result;
use crate::store::Store;

/// Assembles the `statistics` endpoint payload.
pub async fn statistics(store: &Store, coordinator: &Coordinator) -> Result<Statistics> {
    let site_count = store.total_site_count().await?;
    let page_count = store.total_page_count().await?;
    let lemma_count = store.total_lemma_count().await?;
    let indexing = coordinator.is_indexing();

    let mut detailed = Vec::new();
    for site in store.all_sites().await? {
        let page_count = store.count_pages_of_site(site.id).await?;
        let lemma_count = store.count_lemmas_of_site(site.id).await?;
        detailed.push(SiteStatistics {
            url: site.url,
            name: site.name,
            status: site.status,
            status_time: site.status_time,
            last_error: site.last_error,
            page_count,
            lemma_count,
        });
    }

    Ok(Statistics {
        total: TotalStatistics {
            site_count,
            page_count,
            lemma_count,
            indexing,
        },
        detailed,
    })
}
