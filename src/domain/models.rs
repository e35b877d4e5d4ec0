//! Domain models for the crawl/lemmatize/persist/query pipeline.
//!
//! Four entities (§3): `Site`, `Page`, `Lemma`, `IndexEntry`. The rest of this
//! module is response DTOs for the request surface (§6), serialized verbatim
//! into the documented JSON field names.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of a Site's indexing lifecycle (§3 state machine).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SiteStatus {
    Indexing,
    Indexed,
    Failed,
}

impl SiteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Indexing => "indexing",
            Self::Indexed => "indexed",
            Self::Failed => "failed",
        }
    }
}

impl std::str::FromStr for SiteStatus {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "indexing" => Ok(Self::Indexing),
            "indexed" => Ok(Self::Indexed),
            "failed" => Ok(Self::Failed),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for SiteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A configured site: url unique, status tracks its indexing lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Site {
    pub id: i64,
    pub url: String,
    pub name: String,
    pub status: SiteStatus,
    pub status_time: DateTime<Utc>,
    pub last_error: Option<String>,
}

/// A fetched page: (site, path) unique.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    pub id: i64,
    pub site_id: i64,
    pub path: String,
    pub http_code: i64,
    pub content: String,
}

/// A lemma observed on at least one page of a site: (site, text) unique.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lemma {
    pub id: i64,
    pub site_id: i64,
    pub text: String,
    pub frequency: i64,
}

/// A (page, lemma) occurrence: (page, lemma) unique.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub page_id: i64,
    pub lemma_id: i64,
    pub rank: f64,
}

// ============================================================================
// Request-surface DTOs (§6)
// ============================================================================

/// A single row in the `statistics` response's per-site detail list.
#[derive(Debug, Clone, Serialize)]
pub struct SiteStatistics {
    pub url: String,
    pub name: String,
    pub status: SiteStatus,
    #[serde(rename = "statusTime")]
    pub status_time: DateTime<Utc>,
    #[serde(rename = "lastError")]
    pub last_error: Option<String>,
    #[serde(rename = "pageCount")]
    pub page_count: i64,
    #[serde(rename = "lemmaCount")]
    pub lemma_count: i64,
}

/// Process-wide totals for the `statistics` response.
#[derive(Debug, Clone, Serialize)]
pub struct TotalStatistics {
    #[serde(rename = "siteCount")]
    pub site_count: i64,
    #[serde(rename = "pageCount")]
    pub page_count: i64,
    #[serde(rename = "lemmaCount")]
    pub lemma_count: i64,
    #[serde(rename = "indexing")]
    pub indexing: bool,
}

/// `statistics` endpoint payload: `{total, detailed[]}`.
#[derive(Debug, Clone, Serialize)]
pub struct Statistics {
    pub total: TotalStatistics,
    pub detailed: Vec<SiteStatistics>,
}

/// One entry of the `search` endpoint's `data[]`.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub site: String,
    #[serde(rename = "siteName")]
    pub site_name: String,
    pub uri: String,
    pub title: String,
    pub snippet: String,
    pub relevance: f64,
}
