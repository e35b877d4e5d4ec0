use super::Store;
use crate::domain::models::{Site, SiteStatus};
use crate::error::{AppError, Result};
use chrono::Utc;
use sqlx::Row;

impl Store {
    /// Atomically finds the Site row for `url`, creating it (status=INDEXING)
    /// if absent.
    pub async fn find_or_create_site(&self, url: &str, name: &str) -> Result<Site> {
        let max_retries = self.config.max_retries;
        let base_delay = std::time::Duration::from_secs(self.config.retry_base_delay_secs);
        super::retry_locked(max_retries, base_delay, || async {
            let mut tx = self.pool.begin().await?;
            let existing = sqlx::query(
                "SELECT id, url, name, status, status_time, last_error FROM sites WHERE url = ?",
            )
            .bind(url)
            .fetch_optional(&mut *tx)
            .await?;

            let row = if let Some(row) = existing {
                row
            } else {
                let now = Utc::now();
                sqlx::query(
                    "INSERT INTO sites (url, name, status, status_time) VALUES (?, ?, 'indexing', ?)",
                )
                .bind(url)
                .bind(name)
                .bind(now.to_rfc3339())
                .execute(&mut *tx)
                .await?;
                sqlx::query(
                    "SELECT id, url, name, status, status_time, last_error FROM sites WHERE url = ?",
                )
                .bind(url)
                .fetch_one(&mut *tx)
                .await?
            };
            tx.commit().await?;
            Ok(row)
        })
        .await
        .map(|row| row_to_site(&row))
    }

    /// Looks up a Site by its internal row id.
    pub async fn site_by_id(&self, site_id: i64) -> Result<Option<Site>> {
        let row = sqlx::query(
            "SELECT id, url, name, status, status_time, last_error FROM sites WHERE id = ?",
        )
        .bind(site_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::store(e.to_string()))?;
        Ok(row.map(|r| row_to_site(&r)))
    }

    /// Looks up a Site by its configured url, without creating it.
    pub async fn site_by_url(&self, url: &str) -> Result<Option<Site>> {
        let row = sqlx::query(
            "SELECT id, url, name, status, status_time, last_error FROM sites WHERE url = ?",
        )
        .bind(url)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::store(e.to_string()))?;
        Ok(row.map(|r| row_to_site(&r)))
    }

    /// Stamps `status_time = now` and updates status/last_error.
    pub async fn set_site_status(
        &self,
        site_id: i64,
        status: SiteStatus,
        error: Option<&str>,
    ) -> Result<()> {
        let now = Utc::now();
        sqlx::query("UPDATE sites SET status = ?, status_time = ?, last_error = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(now.to_rfc3339())
            .bind(error)
            .bind(site_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::store(e.to_string()))?;
        Ok(())
    }

    /// Removes all IndexEntries, Lemmas and Pages for the site, in that order.
    pub async fn purge_site(&self, site_id: i64) -> Result<()> {
        let max_retries = self.config.max_retries;
        let base_delay = std::time::Duration::from_secs(self.config.retry_base_delay_secs);
        super::retry_locked(max_retries, base_delay, || async {
            let mut tx = self.pool.begin().await?;
            sqlx::query(
                "DELETE FROM index_entries WHERE page_id IN (SELECT id FROM pages WHERE site_id = ?)",
            )
            .bind(site_id)
            .execute(&mut *tx)
            .await?;
            sqlx::query("DELETE FROM lemmas WHERE site_id = ?")
                .bind(site_id)
                .execute(&mut *tx)
                .await?;
            sqlx::query("DELETE FROM pages WHERE site_id = ?")
                .bind(site_id)
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;
            Ok(())
        })
        .await
    }

    /// Total number of Page rows belonging to the site.
    pub async fn count_pages_of_site(&self, site_id: i64) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM pages WHERE site_id = ?")
            .bind(site_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::store(e.to_string()))?;
        Ok(row.get::<i64, _>("n"))
    }

    /// Total number of Lemma rows belonging to the site.
    pub async fn count_lemmas_of_site(&self, site_id: i64) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM lemmas WHERE site_id = ?")
            .bind(site_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::store(e.to_string()))?;
        Ok(row.get::<i64, _>("n"))
    }

    /// All configured/known sites, for Stats' per-site detail list.
    pub async fn all_sites(&self) -> Result<Vec<Site>> {
        let rows = sqlx::query(
            "SELECT id, url, name, status, status_time, last_error FROM sites ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::store(e.to_string()))?;
        Ok(rows.iter().map(row_to_site).collect())
    }

    pub async fn total_site_count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM sites")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::store(e.to_string()))?;
        Ok(row.get::<i64, _>("n"))
    }

    pub async fn total_page_count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM pages")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::store(e.to_string()))?;
        Ok(row.get::<i64, _>("n"))
    }

    pub async fn total_lemma_count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM lemmas")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::store(e.to_string()))?;
        Ok(row.get::<i64, _>("n"))
    }
}

fn row_to_site(row: &sqlx::sqlite::SqliteRow) -> Site {
    Site {
        id: row.get("id"),
        url: row.get("url"),
        name: row.get("name"),
        status: row
            .get::<String, _>("status")
            .parse()
            .unwrap_or(SiteStatus::Failed),
        status_time: row
            .get::<String, _>("status_time")
            .parse()
            .unwrap_or_else(|_| Utc::now()),
        last_error: row.get("last_error"),
    }
}
