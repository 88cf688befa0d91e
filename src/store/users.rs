use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::Serialize;
use serde_json::{json, Map, Value};
use sqlx::{FromRow, PgPool};
use sqlx::Row;

use crate::db::{self, page::Page, update};

/// Public projection of a user row. The password hash never leaves the store
/// except through [`UserAuth`].
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub user_id: String,
    pub email: String,
    pub full_name: String,
    pub role: String,
    pub status: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct UserAuth {
    pub user_id: String,
    pub email: String,
    pub full_name: String,
    pub role: String,
    pub status: String,
    pub password_hash: String,
}

#[derive(Debug)]
pub struct CreatedUser {
    pub user_id: String,
    pub email: String,
    /// Generated temporary password, returned once so the caller can queue
    /// the credentials email. Never persisted in the clear.
    pub password: String,
}

/// Allow-list for partial updates: API field name -> column.
pub const UPDATE_ALLOW: &[(&str, &str)] = &[
    ("email", "email"),
    ("full_name", "full_name"),
    ("role", "role"),
    ("status", "status"),
];

fn generate_user_id() -> String {
    format!("US{}", rand::thread_rng().gen_range(10000..100000))
}

fn generate_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(10)
        .map(char::from)
        .collect()
}

pub async fn create(
    pool: &PgPool,
    email: &str,
    full_name: &str,
    role: &str,
    status: &str,
) -> Result<CreatedUser, sqlx::Error> {
    let user_id = generate_user_id();
    let password = generate_password();
    let password_hash = bcrypt::hash(&password, bcrypt::DEFAULT_COST)
        .map_err(|e| sqlx::Error::Protocol(format!("password hashing failed: {}", e)))?;
    let now = Utc::now();

    sqlx::query(
        r#"
        INSERT INTO users
        (user_id, email, full_name, role, status, password_hash, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
        "#,
    )
    .bind(&user_id)
    .bind(email)
    .bind(full_name)
    .bind(role)
    .bind(status)
    .bind(&password_hash)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(CreatedUser {
        user_id,
        email: email.to_string(),
        password,
    })
}

pub async fn get_by_email(pool: &PgPool, email: &str) -> Result<Option<UserAuth>, sqlx::Error> {
    sqlx::query_as::<_, UserAuth>(
        r#"
        SELECT user_id, email, full_name, role, status, password_hash
        FROM users
        WHERE email = $1
        "#,
    )
    .bind(email)
    .fetch_optional(pool)
    .await
}

pub async fn list(
    pool: &PgPool,
    limit: i64,
    offset: i64,
    search: Option<&str>,
) -> Result<Page<User>, sqlx::Error> {
    let mut params: Vec<Value> = Vec::new();
    let mut clauses: Vec<String> = Vec::new();

    if let Some(term) = search {
        params.push(json!(format!("%{}%", term)));
        let n = params.len();
        clauses.push(format!("(email ILIKE ${n} OR full_name ILIKE ${n})"));
    }

    // Count and item queries share the exact same WHERE fragment so the
    // pagination metadata stays truthful.
    let where_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    };

    let item_sql = format!(
        "SELECT user_id, email, full_name, role, status FROM users {} \
         ORDER BY created_at DESC LIMIT ${} OFFSET ${}",
        where_sql,
        params.len() + 1,
        params.len() + 2
    );
    let mut q = sqlx::query_as::<_, User>(&item_sql);
    for p in &params {
        q = db::bind_value_as(q, p);
    }
    let items = q.bind(limit).bind(offset).fetch_all(pool).await?;

    let count_sql = format!("SELECT COUNT(*) AS count FROM users {}", where_sql);
    let mut q = sqlx::query(&count_sql);
    for p in &params {
        q = db::bind_value(q, p);
    }
    let total: i64 = q.fetch_one(pool).await?.try_get("count")?;

    Ok(Page::new(items, total, limit, offset))
}

pub async fn update_fields(
    pool: &PgPool,
    user_id: &str,
    fields: &Map<String, Value>,
) -> Result<Result<Option<User>, update::UpdateError>, sqlx::Error> {
    let stmt = match update::build_update("users", UPDATE_ALLOW, fields, &["user_id"]) {
        Ok(stmt) => stmt,
        Err(e) => return Ok(Err(e)),
    };

    let sql = format!("{} RETURNING user_id, email, full_name, role, status", stmt.sql);
    let mut q = sqlx::query_as::<_, User>(&sql);
    for p in &stmt.params {
        q = db::bind_value_as(q, p);
    }
    let row = q
        .bind(stmt.touched_at)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    Ok(Ok(row))
}

/// Delete by user id or email, matching the source contract.
pub async fn delete(pool: &PgPool, user_id_or_email: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM users WHERE user_id = $1 OR email = $2")
        .bind(user_id_or_email)
        .bind(user_id_or_email.to_lowercase())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Replace the stored hash with one for a fresh temporary password.
/// Returns the plain password for the notification email, or None when the
/// account does not exist.
pub async fn reset_password(pool: &PgPool, email: &str) -> Result<Option<String>, sqlx::Error> {
    let password = generate_password();
    let password_hash = bcrypt::hash(&password, bcrypt::DEFAULT_COST)
        .map_err(|e| sqlx::Error::Protocol(format!("password hashing failed: {}", e)))?;

    let result = sqlx::query(
        "UPDATE users SET password_hash = $1, updated_at = $2 WHERE email = $3",
    )
    .bind(&password_hash)
    .bind(Utc::now())
    .bind(email)
    .execute(pool)
    .await?;

    Ok((result.rows_affected() > 0).then_some(password))
}
