use super::Store;
use crate::domain::models::Page;
use crate::error::{AppError, Result};
use sqlx::{Row, SqliteConnection};

impl Store {
    /// If a Page at (site, path) exists, purges it first, then inserts the
    /// new row. Committed before the caller writes any IndexEntry for it.
    pub async fn upsert_page(
        &self,
        site_id: i64,
        path: &str,
        http_code: i64,
        content: &str,
    ) -> Result<Page> {
        let max_retries = self.config.max_retries;
        let base_delay = std::time::Duration::from_secs(self.config.retry_base_delay_secs);
        super::retry_locked(max_retries, base_delay, || async {
            let mut tx = self.pool.begin().await?;

            let existing: Option<i64> =
                sqlx::query("SELECT id FROM pages WHERE site_id = ? AND path = ?")
                    .bind(site_id)
                    .bind(path)
                    .fetch_optional(&mut *tx)
                    .await?
                    .map(|r| r.get("id"));

            if let Some(page_id) = existing {
                purge_page_in_tx(&mut tx, page_id).await?;
            }

            sqlx::query(
                "INSERT INTO pages (site_id, path, http_code, content) VALUES (?, ?, ?, ?)",
            )
            .bind(site_id)
            .bind(path)
            .bind(http_code)
            .bind(content)
            .execute(&mut *tx)
            .await?;

            let row = sqlx::query(
                "SELECT id, site_id, path, http_code, content FROM pages WHERE site_id = ? AND path = ?",
            )
            .bind(site_id)
            .bind(path)
            .fetch_one(&mut *tx)
            .await?;

            tx.commit().await?;
            Ok(row)
        })
        .await
        .map(|row| row_to_page(&row))
    }

    /// Deletes IndexEntries for the page, decrements each affected Lemma's
    /// frequency by one, then deletes the Page (invariant 3).
    pub async fn purge_page(&self, page_id: i64) -> Result<()> {
        let max_retries = self.config.max_retries;
        let base_delay = std::time::Duration::from_secs(self.config.retry_base_delay_secs);
        super::retry_locked(max_retries, base_delay, || async {
            let mut tx = self.pool.begin().await?;
            purge_page_in_tx(&mut tx, page_id).await?;
            sqlx::query("DELETE FROM pages WHERE id = ?")
                .bind(page_id)
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;
            Ok(())
        })
        .await
    }

    pub async fn page_by_id(&self, page_id: i64) -> Result<Option<Page>> {
        let row = sqlx::query("SELECT id, site_id, path, http_code, content FROM pages WHERE id = ?")
            .bind(page_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::store(e.to_string()))?;
        Ok(row.map(|r| row_to_page(&r)))
    }
}

/// Shared by `upsert_page` (re-crawl cascade) and `purge_page`: deletes the
/// page's IndexEntries and decrements each referenced Lemma's frequency.
/// Leaves the Page row itself untouched — callers delete it separately.
async fn purge_page_in_tx(tx: &mut SqliteConnection, page_id: i64) -> std::result::Result<(), sqlx::Error> {
    let lemma_ids: Vec<i64> = sqlx::query("SELECT lemma_id FROM index_entries WHERE page_id = ?")
        .bind(page_id)
        .fetch_all(&mut *tx)
        .await?
        .iter()
        .map(|r| r.get("lemma_id"))
        .collect();

    sqlx::query("DELETE FROM index_entries WHERE page_id = ?")
        .bind(page_id)
        .execute(&mut *tx)
        .await?;

    for lemma_id in lemma_ids {
        sqlx::query("UPDATE lemmas SET frequency = frequency - 1 WHERE id = ?")
            .bind(lemma_id)
            .execute(&mut *tx)
            .await?;
    }

    Ok(())
}

fn row_to_page(row: &sqlx::sqlite::SqliteRow) -> Page {
    Page {
        id: row.get("id"),
        site_id: row.get("site_id"),
        path: row.get("path"),
        http_code: row.get("http_code"),
        content: row.get("content"),
    }
}
