use super::Store;
use crate::domain::models::Lemma;
use crate::error::{AppError, Result};
use sqlx::{Row, SqliteConnection};

impl Store {
    /// Lemma rows on `site_id` whose text is in `texts` (Search's scoped lookup).
    pub async fn lemmas_by_site_and_texts(&self, site_id: i64, texts: &[String]) -> Result<Vec<Lemma>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = texts.iter().map(|_| "?").collect::<Vec<_>>().join(", ");
        let sql = format!(
            "SELECT id, site_id, text, frequency FROM lemmas WHERE site_id = ? AND text IN ({placeholders})"
        );
        let mut query = sqlx::query(&sql).bind(site_id);
        for text in texts {
            query = query.bind(text);
        }
        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::store(e.to_string()))?;
        Ok(rows.iter().map(row_to_lemma).collect())
    }

    /// Lemma rows across every site whose text is in `texts` (Search's unscoped lookup).
    pub async fn lemmas_by_texts(&self, texts: &[String]) -> Result<Vec<Lemma>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = texts.iter().map(|_| "?").collect::<Vec<_>>().join(", ");
        let sql = format!(
            "SELECT id, site_id, text, frequency FROM lemmas WHERE text IN ({placeholders})"
        );
        let mut query = sqlx::query(&sql);
        for text in texts {
            query = query.bind(text);
        }
        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::store(e.to_string()))?;
        Ok(rows.iter().map(row_to_lemma).collect())
    }

    pub async fn lemma_by_id(&self, lemma_id: i64) -> Result<Option<Lemma>> {
        let row = sqlx::query("SELECT id, site_id, text, frequency FROM lemmas WHERE id = ?")
            .bind(lemma_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::store(e.to_string()))?;
        Ok(row.map(|r| row_to_lemma(&r)))
    }
}

/// Finds or creates the Lemma row for `(site_id, text)`, returning its id.
/// Does not touch `frequency` — the caller increments it as part of the same
/// write-batch transaction.
pub(super) async fn find_or_create_lemma_in_tx(
    tx: &mut SqliteConnection,
    site_id: i64,
    text: &str,
) -> std::result::Result<i64, sqlx::Error> {
    let existing: Option<i64> = sqlx::query("SELECT id FROM lemmas WHERE site_id = ? AND text = ?")
        .bind(site_id)
        .bind(text)
        .fetch_optional(&mut *tx)
        .await?
        .map(|r| r.get("id"));

    if let Some(id) = existing {
        return Ok(id);
    }

    sqlx::query("INSERT INTO lemmas (site_id, text, frequency) VALUES (?, ?, 0)")
        .bind(site_id)
        .bind(text)
        .execute(&mut *tx)
        .await?;

    let row = sqlx::query("SELECT id FROM lemmas WHERE site_id = ? AND text = ?")
        .bind(site_id)
        .bind(text)
        .fetch_one(&mut *tx)
        .await?;
    Ok(row.get("id"))
}

fn row_to_lemma(row: &sqlx::sqlite::SqliteRow) -> Lemma {
    Lemma {
        id: row.get("id"),
        site_id: row.get("site_id"),
        text: row.get("text"),
        frequency: row.get("frequency"),
    }
}
