use super::lemma::find_or_create_lemma_in_tx;
use super::Store;
use crate::error::{AppError, Result};
use sqlx::Row;
use std::collections::HashSet;

impl Store {
    /// For each (lemmaText, rank): finds-or-creates the Lemma on `page`'s
    /// site, increments its frequency by one, and inserts the IndexEntry.
    /// Runs inside one transaction, satisfying invariant 2 (a lemma's
    /// frequency is incremented at most once per distinct page per call).
    pub async fn write_index_batch(
        &self,
        page_id: i64,
        site_id: i64,
        entries: &[(String, f64)],
    ) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let max_retries = self.config.max_retries;
        let base_delay = std::time::Duration::from_secs(self.config.retry_base_delay_secs);
        super::retry_locked(max_retries, base_delay, || async {
            let mut tx = self.pool.begin().await?;
            let mut seen = HashSet::new();
            for (text, rank) in entries {
                if !seen.insert(text.clone()) {
                    continue;
                }
                let lemma_id = find_or_create_lemma_in_tx(&mut tx, site_id, text).await?;
                sqlx::query("UPDATE lemmas SET frequency = frequency + 1 WHERE id = ?")
                    .bind(lemma_id)
                    .execute(&mut *tx)
                    .await?;
                sqlx::query(
                    "INSERT INTO index_entries (page_id, lemma_id, rank) VALUES (?, ?, ?) \
                     ON CONFLICT (page_id, lemma_id) DO UPDATE SET rank = excluded.rank",
                )
                .bind(page_id)
                .bind(lemma_id)
                .bind(rank)
                .execute(&mut *tx)
                .await?;
            }
            tx.commit().await?;
            Ok(())
        })
        .await
    }

    /// Page ids that have an IndexEntry referring to `lemma_id`.
    pub async fn pages_by_lemma(&self, lemma_id: i64) -> Result<Vec<i64>> {
        let rows = sqlx::query("SELECT page_id FROM index_entries WHERE lemma_id = ?")
            .bind(lemma_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::store(e.to_string()))?;
        Ok(rows.iter().map(|r| r.get("page_id")).collect())
    }

    /// The occurrence count of `lemma_id` on `page_id`, or 0.0 if no entry exists.
    pub async fn rank_of(&self, page_id: i64, lemma_id: i64) -> Result<f64> {
        let row = sqlx::query("SELECT rank FROM index_entries WHERE page_id = ? AND lemma_id = ?")
            .bind(page_id)
            .bind(lemma_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::store(e.to_string()))?;
        Ok(row.map(|r| r.get::<f64, _>("rank")).unwrap_or(0.0))
    }
}
