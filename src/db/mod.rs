use std::time::Duration;

use serde_json::Value;
use sqlx::postgres::{PgArguments, PgPoolOptions, PgRow};
use sqlx::{FromRow, PgPool};

use crate::config;

pub mod page;
pub mod update;

/// Build the process-wide connection pool from DATABASE_URL.
pub async fn connect() -> Result<PgPool, sqlx::Error> {
    let url = std::env::var("DATABASE_URL")
        .map_err(|_| sqlx::Error::Configuration("DATABASE_URL is not set".into()))?;
    let db = &config::config().database;

    PgPoolOptions::new()
        .max_connections(db.max_connections)
        .acquire_timeout(Duration::from_secs(db.acquire_timeout_secs))
        .connect(&url)
        .await
}

/// Ping the pool to verify connectivity.
pub async fn health_check(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// True when the error is a Postgres unique-constraint violation (23505).
/// The single source of truth for every 409 path.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db| db.code())
        .map(|code| code == "23505")
        .unwrap_or(false)
}

/// Bind a JSON value as a SQL parameter on a plain query.
///
/// Arrays are bound as TEXT[]; non-string array elements are coerced through
/// their JSON rendering.
pub fn bind_value<'q>(
    q: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
    v: &'q Value,
) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
    match v {
        Value::Null => {
            let none: Option<String> = None;
            q.bind(none)
        }
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(n.to_string())
            }
        }
        Value::String(s) => q.bind(s),
        Value::Array(items) => q.bind(string_items(items)),
        Value::Object(_) => q.bind(v.clone()), // JSONB
    }
}

/// Bind a JSON value as a SQL parameter on a typed query.
pub fn bind_value_as<'q, O>(
    q: sqlx::query::QueryAs<'q, sqlx::Postgres, O, PgArguments>,
    v: &'q Value,
) -> sqlx::query::QueryAs<'q, sqlx::Postgres, O, PgArguments>
where
    O: for<'r> FromRow<'r, PgRow>,
{
    match v {
        Value::Null => {
            let none: Option<String> = None;
            q.bind(none)
        }
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(n.to_string())
            }
        }
        Value::String(s) => q.bind(s),
        Value::Array(items) => q.bind(string_items(items)),
        Value::Object(_) => q.bind(v.clone()),
    }
}

fn string_items(items: &[Value]) -> Vec<String> {
    items
        .iter()
        .map(|item| match item {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    // A genuine 23505 error only comes out of a live Postgres; sqlx's
    // PgDatabaseError has no public constructor. The positive branch is
    // exercised by the duplicate-create handler paths against a real
    // database; what we can pin down here is that nothing else ever reads
    // as a unique violation.
    #[test]
    fn non_database_errors_are_not_unique_violations() {
        assert!(!is_unique_violation(&sqlx::Error::RowNotFound));
        assert!(!is_unique_violation(&sqlx::Error::PoolTimedOut));
        assert!(!is_unique_violation(&sqlx::Error::Protocol(
            "connection reset".into()
        )));
    }

    #[test]
    fn array_params_bind_as_text_items() {
        let items = vec![
            Value::String("Mon".into()),
            Value::Number(3.into()),
            Value::Bool(true),
        ];
        assert_eq!(string_items(&items), vec!["Mon", "3", "true"]);
    }
}
