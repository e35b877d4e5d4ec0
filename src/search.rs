//! Ranked multi-term retrieval over the persisted index (§4.6).

use crate::analyzer::{collect_lemmas, Morphology};
use crate::domain::models::{Lemma, SearchResult, SiteStatus};
use crate::error::{AppError, Result};
use crate::fetcher::{extract_plain_text, extract_title};
use crate::store::Store;
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

const HIGH_FREQUENCY_RATIO: f64 = 0.8;
const SNIPPET_WINDOW: usize = 30;
const FALLBACK_SNIPPET_LEN: usize = 200;

/// One page surviving the intersection step, with its absolute relevance.
struct Hit {
    page_id: i64,
    site_id: i64,
    absolute_relevance: f64,
}

/// Answers a ranked query (§4.6 steps 1-9). `site_url`, when set, scopes the
/// search to that (INDEXED) site; otherwise the search spans every site.
pub async fn search(
    store: &Store,
    morphology: &dyn Morphology,
    query: &str,
    site_url: Option<&str>,
    offset: usize,
    limit: usize,
) -> Result<(i64, Vec<SearchResult>)> {
    let query_counts = collect_lemmas(query, Some(morphology)).await;
    if query_counts.is_empty() {
        return Err(AppError::InvalidQuery);
    }
    let query_texts: Vec<String> = query_counts.keys().cloned().collect();

    let groups = resolve_site_groups(store, site_url, &query_texts).await?;
    if groups.is_empty() {
        return Ok((0, Vec::new()));
    }

    // §4.6 step 4: totalPages is per-site when scoped, the grand total across
    // every site when not — the same denominator for every group either way.
    let total_pages = match site_url {
        Some(_) => None,
        None => Some(store.total_page_count().await?),
    };

    let mut hits = Vec::new();
    for (site_id, site_lemmas) in groups {
        let total_pages = match total_pages {
            Some(total) => total,
            None => store.count_pages_of_site(site_id).await?,
        };
        let Some(surviving) = apply_high_frequency_filter(&site_lemmas, total_pages) else {
            continue;
        };

        let pages = intersect_pages(store, &surviving).await?;
        if pages.is_empty() {
            continue;
        }

        let lemma_by_text: HashMap<&str, &Lemma> =
            site_lemmas.iter().map(|l| (l.text.as_str(), l)).collect();

        for page_id in pages {
            let mut absolute_relevance = 0.0;
            for text in &query_texts {
                if let Some(lemma) = lemma_by_text.get(text.as_str()) {
                    absolute_relevance += store.rank_of(page_id, lemma.id).await?;
                }
            }
            hits.push(Hit {
                page_id,
                site_id,
                absolute_relevance,
            });
        }
    }

    let total_count = hits.len() as i64;
    let max_relevance = hits
        .iter()
        .map(|h| h.absolute_relevance)
        .fold(0.0_f64, f64::max);

    let mut scored: Vec<(Hit, f64)> = hits
        .into_iter()
        .map(|h| {
            let relevance = if max_relevance > 0.0 {
                h.absolute_relevance / max_relevance
            } else {
                h.absolute_relevance
            };
            (h, relevance)
        })
        .collect();

    // Stable sort: ties preserve discovery order (§8 Ordering).
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let page_slice: Vec<&(Hit, f64)> = scored.iter().skip(offset).take(limit).collect();

    let mut results = Vec::with_capacity(page_slice.len());
    for (hit, relevance) in page_slice {
        let site = store
            .site_by_id(hit.site_id)
            .await?
            .ok_or_else(|| AppError::store("page referenced a missing site"))?;
        let page = store
            .page_by_id(hit.page_id)
            .await?
            .ok_or_else(|| AppError::store("lemma referenced a missing page"))?;

        let plain_text = extract_plain_text(&page.content);
        let title = extract_title(&page.content);
        let snippet = build_snippet(&plain_text, &query_texts);

        results.push(SearchResult {
            site: site.url,
            site_name: site.name,
            uri: page.path,
            title,
            snippet,
            relevance: *relevance,
        });
    }

    Ok((total_count, results))
}

/// Fetches the Lemma rows matching `query_texts`, grouped by owning site
/// (step 2-3). A scoped search only considers the named, INDEXED site.
async fn resolve_site_groups(
    store: &Store,
    site_url: Option<&str>,
    query_texts: &[String],
) -> Result<Vec<(i64, Vec<Lemma>)>> {
    match site_url {
        Some(url) => {
            let Some(site) = store.site_by_url(url).await? else {
                return Ok(Vec::new());
            };
            if site.status != SiteStatus::Indexed {
                return Ok(Vec::new());
            }
            let lemmas = store.lemmas_by_site_and_texts(site.id, query_texts).await?;
            Ok(vec![(site.id, lemmas)])
        }
        None => {
            let lemmas = store.lemmas_by_texts(query_texts).await?;
            let mut grouped: HashMap<i64, Vec<Lemma>> = HashMap::new();
            for lemma in lemmas {
                grouped.entry(lemma.site_id).or_default().push(lemma);
            }
            // Discovery order must be deterministic (§8 Ordering), not the
            // hasher's randomized-seed iteration order.
            let mut groups: Vec<(i64, Vec<Lemma>)> = grouped.into_iter().collect();
            groups.sort_by_key(|(site_id, _)| *site_id);
            Ok(groups)
        }
    }
}

/// Step 4: drop lemmas with `frequency > 0.8 * totalPages`; if that would
/// leave none, keep the single rarest instead. Returns `None` if there was
/// nothing to search against for this group at all.
fn apply_high_frequency_filter(lemmas: &[Lemma], total_pages: i64) -> Option<Vec<Lemma>> {
    if lemmas.is_empty() {
        return None;
    }
    let threshold = HIGH_FREQUENCY_RATIO * total_pages as f64;
    let mut surviving: Vec<Lemma> = lemmas
        .iter()
        .filter(|l| (l.frequency as f64) <= threshold)
        .cloned()
        .collect();

    if surviving.is_empty() {
        let rarest = lemmas
            .iter()
            .min_by_key(|l| l.frequency)
            .cloned()
            .expect("lemmas is non-empty");
        surviving.push(rarest);
    }

    // Step 5: sort ascending by frequency so the rarest lemma drives the
    // intersection's starting set.
    surviving.sort_by_key(|l| l.frequency);
    Some(surviving)
}

/// Step 6: intersect pages-of-lemma across the sorted surviving lemmas,
/// stopping early once the running set is empty.
async fn intersect_pages(store: &Store, surviving: &[Lemma]) -> Result<Vec<i64>> {
    let mut iter = surviving.iter();
    let Some(first) = iter.next() else {
        return Ok(Vec::new());
    };
    let mut pages: HashSet<i64> = store.pages_by_lemma(first.id).await?.into_iter().collect();

    for lemma in iter {
        if pages.is_empty() {
            break;
        }
        let next: HashSet<i64> = store.pages_by_lemma(lemma.id).await?.into_iter().collect();
        pages.retain(|p| next.contains(p));
    }

    // Discovery order must be deterministic (§8 Ordering), not the hash
    // set's randomized-seed iteration order.
    let mut pages: Vec<i64> = pages.into_iter().collect();
    pages.sort_unstable();
    Ok(pages)
}

fn word_boundary_regex(word: &str) -> regex::Regex {
    static CACHE: OnceLock<std::sync::Mutex<HashMap<String, regex::Regex>>> = OnceLock::new();
    let cache = CACHE.get_or_init(|| std::sync::Mutex::new(HashMap::new()));
    let mut cache = cache.lock().unwrap();
    if let Some(re) = cache.get(word) {
        return re.clone();
    }
    let pattern = format!(r"(?i)\b{}\b", regex::escape(word));
    let re = regex::Regex::new(&pattern).expect("valid word-boundary pattern");
    cache.insert(word.to_string(), re.clone());
    re
}

/// §4.6.1: windowed, bolded fragments for each query lemma that occurs in the
/// page text, joined with " ... "; falls back to the first 200 characters if
/// any query lemma had no occurrence at all.
fn build_snippet(text: &str, query_texts: &[String]) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut accepted_windows: Vec<(usize, usize)> = Vec::new();
    let mut fragments: Vec<String> = Vec::new();
    let mut matched_lemmas = 0;

    for lemma in query_texts {
        let re = word_boundary_regex(lemma);
        let mut lemma_matched = false;
        for m in re.find_iter(text) {
            let char_start = text[..m.start()].chars().count();
            let char_end = text[..m.end()].chars().count();
            let window_start = char_start.saturating_sub(SNIPPET_WINDOW);
            let window_end = (char_end + SNIPPET_WINDOW).min(chars.len());

            if accepted_windows
                .iter()
                .any(|&(s, e)| window_start < e && s < window_end)
            {
                continue;
            }

            let before: String = chars[window_start..char_start].iter().collect();
            let matched: String = chars[char_start..char_end].iter().collect();
            let after: String = chars[char_end..window_end].iter().collect();
            fragments.push(format!("{before}**{matched}**{after}"));
            accepted_windows.push((window_start, window_end));
            lemma_matched = true;
        }
        if lemma_matched {
            matched_lemmas += 1;
        }
    }

    if matched_lemmas == query_texts.len() && !fragments.is_empty() {
        format!("...{}...", fragments.join(" ... "))
    } else {
        let cut = chars.len().min(FALLBACK_SNIPPET_LEN);
        let prefix: String = chars[..cut].iter().collect();
        format!("{prefix}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::RuleBasedMorphology;
    use crate::config::StoreConfig;

    async fn seeded_store() -> Store {
        let pool = crate::test_utils::setup_test_db().await;
        Store::new(pool, StoreConfig::default())
    }

    #[tokio::test]
    async fn empty_query_is_rejected() {
        let store = seeded_store().await;
        let morphology = RuleBasedMorphology::new();
        let result = search(&store, &morphology, "   ", None, 0, 20).await;
        assert!(matches!(result, Err(AppError::InvalidQuery)));
    }

    #[tokio::test]
    async fn single_lemma_hit() {
        let store = seeded_store().await;
        let morphology = RuleBasedMorphology::new();
        let site = store.find_or_create_site("https://a.example", "A").await.unwrap();
        store.set_site_status(site.id, SiteStatus::Indexed, None).await.unwrap();
        let page = store
            .upsert_page(site.id, "/", 200, "<html><body>кот кот собака</body></html>")
            .await
            .unwrap();
        store
            .write_index_batch(page.id, site.id, &[("кот".into(), 2.0), ("собак".into(), 1.0)])
            .await
            .unwrap();

        let (count, results) = search(&store, &morphology, "кот", None, 0, 20).await.unwrap();
        assert_eq!(count, 1);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].relevance, 1.0);
        assert!(results[0].snippet.contains("кот"));
    }

    #[tokio::test]
    async fn intersection_returns_only_page_with_both_lemmas() {
        let store = seeded_store().await;
        let morphology = RuleBasedMorphology::new();
        let site = store.find_or_create_site("https://a.example", "A").await.unwrap();
        store.set_site_status(site.id, SiteStatus::Indexed, None).await.unwrap();

        let page_a = store
            .upsert_page(site.id, "/a", 200, "<html><body>кот собака</body></html>")
            .await
            .unwrap();
        store
            .write_index_batch(page_a.id, site.id, &[("кот".into(), 1.0), ("собак".into(), 1.0)])
            .await
            .unwrap();

        let page_b = store
            .upsert_page(site.id, "/b", 200, "<html><body>кот</body></html>")
            .await
            .unwrap();
        store
            .write_index_batch(page_b.id, site.id, &[("кот".into(), 1.0)])
            .await
            .unwrap();

        let (count, results) = search(&store, &morphology, "кот собака", None, 0, 20)
            .await
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(results[0].uri, "/a");
    }

    #[tokio::test]
    async fn high_frequency_lemma_is_dropped() {
        let store = seeded_store().await;
        let morphology = RuleBasedMorphology::new();
        let site = store.find_or_create_site("https://a.example", "A").await.unwrap();
        store.set_site_status(site.id, SiteStatus::Indexed, None).await.unwrap();

        for i in 0..10 {
            let path = format!("/{i}");
            let page = store
                .upsert_page(site.id, &path, 200, "<html><body>вода</body></html>")
                .await
                .unwrap();
            let mut entries = vec![("вод".to_string(), 1.0)];
            if i == 0 {
                entries.push(("лимон".to_string(), 1.0));
            }
            store.write_index_batch(page.id, site.id, &entries).await.unwrap();
        }

        let (count, results) = search(&store, &morphology, "вода лимон", None, 0, 20)
            .await
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(results[0].uri, "/0");
    }
}
