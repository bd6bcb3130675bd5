//! Operational helpers used at startup and by the admin binary.

use crate::error::ApiError;
use crate::registry::ResourceRegistry;
use sqlx::PgPool;

/// Name-search indexes for the person and location registries, created only
/// when those resources are registered.
const NAME_INDEXES: &[(&str, &str, &[&str])] = &[
    ("pr", "person", &["first_name", "middle_name", "last_name"]),
    ("gis", "location", &["name"]),
];

pub async fn create_name_indexes(
    pool: &PgPool,
    registry: &ResourceRegistry,
) -> Result<usize, ApiError> {
    let mut created = 0;
    for (prefix, name, columns) in NAME_INDEXES {
        let resource = match registry.resolve(prefix, name) {
            Ok(r) => r,
            Err(_) => continue,
        };
        for col in *columns {
            if resource.field(col).is_none() {
                continue;
            }
            let sql = format!(
                "CREATE INDEX IF NOT EXISTS \"{table}_{col}_idx\" ON \"{table}\" (\"{col}\")",
                table = resource.tablename(),
                col = col
            );
            tracing::debug!(sql = %sql, "create index");
            sqlx::query(&sql).execute(pool).await?;
            created += 1;
        }
    }
    Ok(created)
}

/// Background-worker heartbeat check: the worker is healthy if it has checked
/// in within the last two minutes. A missing heartbeat table means no worker
/// has ever run, which is also unhealthy.
pub async fn scheduler_healthy(pool: &PgPool) -> Result<bool, ApiError> {
    let result = sqlx::query_scalar::<_, bool>(
        "SELECT COALESCE(MAX(\"last_heartbeat\") > NOW() - INTERVAL '2 minutes', FALSE) \
         FROM \"scheduler_worker\"",
    )
    .fetch_optional(pool)
    .await;
    match result {
        Ok(flag) => Ok(flag.unwrap_or(false)),
        Err(sqlx::Error::Database(db)) if db.code().as_deref() == Some("42P01") => Ok(false),
        Err(e) => Err(ApiError::Db(e)),
    }
}
