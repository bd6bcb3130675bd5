//! Query execution against PostgreSQL: JSON row mapping and transient-error
//! retry (serialization failures and deadlocks, 3 retries with backoff).

use crate::error::ApiError;
use crate::sql::{PgBindValue, QueryBuf};
use serde_json::Value;
use sqlx::PgPool;
use std::time::Duration;

const RETRY_DELAYS: [Duration; 3] = [
    Duration::from_millis(50),
    Duration::from_millis(150),
    Duration::from_millis(450),
];

/// PostgreSQL codes worth retrying: serialization_failure, deadlock_detected.
pub fn is_transient(e: &ApiError) -> bool {
    if let ApiError::Db(sqlx::Error::Database(db)) = e {
        matches!(db.code().as_deref(), Some("40001") | Some("40P01"))
    } else {
        false
    }
}

pub struct DataService;

impl DataService {
    pub async fn fetch_optional(pool: &PgPool, q: &QueryBuf) -> Result<Option<Value>, ApiError> {
        Self::with_retries(|| Self::fetch_optional_once(pool, q)).await
    }

    pub async fn fetch_all(pool: &PgPool, q: &QueryBuf) -> Result<Vec<Value>, ApiError> {
        Self::with_retries(|| Self::fetch_all_once(pool, q)).await
    }

    async fn fetch_optional_once(pool: &PgPool, q: &QueryBuf) -> Result<Option<Value>, ApiError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(PgBindValue::from(p));
        }
        let row = query.fetch_optional(pool).await?;
        Ok(row.map(|r| row_to_json(&r)))
    }

    async fn fetch_all_once(pool: &PgPool, q: &QueryBuf) -> Result<Vec<Value>, ApiError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(PgBindValue::from(p));
        }
        let rows = query.fetch_all(pool).await?;
        Ok(rows.iter().map(row_to_json).collect())
    }

    pub async fn execute_tx(
        tx: &mut sqlx::PgConnection,
        q: &QueryBuf,
    ) -> Result<Option<Value>, ApiError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query (tx)");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(PgBindValue::from(p));
        }
        let row = query.fetch_optional(&mut *tx).await?;
        Ok(row.map(|r| row_to_json(&r)))
    }

    /// Run an operation, retrying transient failures with exponential backoff.
    /// Surfaces `Transient` when retries run out.
    pub async fn with_retries<T, F, Fut>(op: F) -> Result<T, ApiError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T, ApiError>>,
    {
        let mut last_attempt = op().await;
        for delay in RETRY_DELAYS {
            match last_attempt {
                Err(ref e) if is_transient(e) => {
                    tracing::warn!(delay_ms = delay.as_millis() as u64, "transient database error, retrying");
                    tokio::time::sleep(delay).await;
                    last_attempt = op().await;
                }
                other => return other,
            }
        }
        match last_attempt {
            Err(ref e) if is_transient(e) => Err(ApiError::Transient),
            other => other,
        }
    }
}

pub fn row_to_json(row: &sqlx::postgres::PgRow) -> Value {
    use sqlx::Column;
    use sqlx::Row;
    let mut map = serde_json::Map::new();
    for col in row.columns() {
        let name = col.name();
        map.insert(name.to_string(), cell_to_value(row, name));
    }
    Value::Object(map)
}

fn cell_to_value(row: &sqlx::postgres::PgRow, name: &str) -> Value {
    use sqlx::Row;
    if let Ok(Some(n)) = row.try_get::<Option<i16>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i32>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i64>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<f64>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(n) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(b)) = row.try_get::<Option<bool>, _>(name) {
        return Value::Bool(b);
    }
    if let Ok(Some(u)) = row.try_get::<Option<uuid::Uuid>, _>(name) {
        return Value::String(u.to_string());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(name) {
        return Value::String(d.to_rfc3339());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDateTime>, _>(name) {
        return Value::String(d.format("%Y-%m-%dT%H:%M:%S%.f").to_string());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDate>, _>(name) {
        return Value::String(d.format("%Y-%m-%d").to_string());
    }
    if let Ok(Some(s)) = row.try_get::<Option<String>, _>(name) {
        return Value::String(s);
    }
    if let Ok(Some(j)) = row.try_get::<Option<Value>, _>(name) {
        return j;
    }
    Value::Null
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn success_passes_through_without_retry() {
        let calls = AtomicU32::new(0);
        let calls = &calls;
        let result = DataService::with_retries(|| async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(42)
        })
        .await
        .unwrap();
        assert_eq!(result, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn non_transient_error_is_not_retried() {
        let calls = AtomicU32::new(0);
        let calls = &calls;
        let result: Result<(), ApiError> = DataService::with_retries(|| async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ApiError::BadRequest("nope".into()))
        })
        .await;
        assert!(matches!(result, Err(ApiError::BadRequest(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn only_serialization_and_deadlock_are_transient() {
        assert!(!is_transient(&ApiError::BadRequest("x".into())));
        assert!(!is_transient(&ApiError::Db(sqlx::Error::RowNotFound)));
    }
}
