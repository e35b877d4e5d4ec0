//! Retry-with-backoff wrapper for write operations (§4.1, §7 TransientStoreError).

use crate::error::{AppError, Result};
use std::future::Future;
use std::time::Duration;

fn is_lock_conflict(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            // SQLite's primary result codes: 5 = SQLITE_BUSY, 6 = SQLITE_LOCKED.
            matches!(db_err.code().as_deref(), Some("5") | Some("6"))
        }
        _ => false,
    }
}

/// Runs `f` up to `max_retries + 1` times, sleeping `attempt * base_delay`
/// between attempts, retrying only lock-conflict errors. After the budget is
/// exhausted the last error is wrapped as `AppError::Store`.
pub async fn retry_locked<F, Fut, T>(
    max_retries: u32,
    base_delay: Duration,
    mut f: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, sqlx::Error>>,
{
    let mut attempt = 0u32;
    loop {
        match f().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < max_retries && is_lock_conflict(&err) => {
                attempt += 1;
                tokio::time::sleep(base_delay * attempt).await;
            }
            Err(err) => return Err(AppError::store(err.to_string())),
        }
    }
}
