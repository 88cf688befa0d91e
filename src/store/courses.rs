use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Map, Value};
use sqlx::{FromRow, PgPool, Row};
use uuid::Uuid;

use crate::db::{self, page::Page, update};

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Course {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Allow-list for partial updates: API field name -> column.
pub const UPDATE_ALLOW: &[(&str, &str)] = &[
    ("title", "title"),
    ("description", "description"),
    ("status", "status"),
    ("thumbnailUrl", "thumbnail_url"),
];

const ALL_COLUMNS: &str = "id, title, description, thumbnail_url, status, created_at, updated_at";

pub async fn create(
    pool: &PgPool,
    title: &str,
    description: Option<&str>,
    thumbnail_url: Option<&str>,
    status: &str,
) -> Result<Course, sqlx::Error> {
    let sql = format!(
        r#"
        INSERT INTO courses (id, title, description, thumbnail_url, status, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $6)
        RETURNING {ALL_COLUMNS}
        "#
    );

    sqlx::query_as::<_, Course>(&sql)
        .bind(Uuid::new_v4())
        .bind(title)
        .bind(description)
        .bind(thumbnail_url)
        .bind(status)
        .bind(Utc::now())
        .fetch_one(pool)
        .await
}

pub async fn get_by_id(pool: &PgPool, course_id: Uuid) -> Result<Option<Course>, sqlx::Error> {
    let sql = format!("SELECT {ALL_COLUMNS} FROM courses WHERE id = $1");
    sqlx::query_as::<_, Course>(&sql)
        .bind(course_id)
        .fetch_optional(pool)
        .await
}

pub async fn list(
    pool: &PgPool,
    limit: i64,
    offset: i64,
    search: Option<&str>,
    status: Option<&str>,
) -> Result<Page<Course>, sqlx::Error> {
    let mut params: Vec<Value> = Vec::new();
    let mut clauses: Vec<String> = Vec::new();

    if let Some(term) = search {
        params.push(json!(format!("%{}%", term)));
        let n = params.len();
        clauses.push(format!("(title ILIKE ${n} OR description ILIKE ${n})"));
    }
    if let Some(status) = status {
        params.push(json!(status));
        clauses.push(format!("status = ${}", params.len()));
    }

    let where_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    };

    let item_sql = format!(
        "SELECT {ALL_COLUMNS} FROM courses {} ORDER BY created_at DESC LIMIT ${} OFFSET ${}",
        where_sql,
        params.len() + 1,
        params.len() + 2
    );
    let mut q = sqlx::query_as::<_, Course>(&item_sql);
    for p in &params {
        q = db::bind_value_as(q, p);
    }
    let items = q.bind(limit).bind(offset).fetch_all(pool).await?;

    let count_sql = format!("SELECT COUNT(*) AS count FROM courses {}", where_sql);
    let mut q = sqlx::query(&count_sql);
    for p in &params {
        q = db::bind_value(q, p);
    }
    let total: i64 = q.fetch_one(pool).await?.try_get("count")?;

    Ok(Page::new(items, total, limit, offset))
}

pub async fn update_fields(
    pool: &PgPool,
    course_id: Uuid,
    fields: &Map<String, Value>,
) -> Result<Result<Option<Course>, update::UpdateError>, sqlx::Error> {
    let stmt = match update::build_update("courses", UPDATE_ALLOW, fields, &["id"]) {
        Ok(stmt) => stmt,
        Err(e) => return Ok(Err(e)),
    };

    let sql = format!("{} RETURNING {ALL_COLUMNS}", stmt.sql);
    let mut q = sqlx::query_as::<_, Course>(&sql);
    for p in &stmt.params {
        q = db::bind_value_as(q, p);
    }
    let row = q
        .bind(stmt.touched_at)
        .bind(course_id)
        .fetch_optional(pool)
        .await?;

    Ok(Ok(row))
}

pub async fn delete(pool: &PgPool, course_id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM courses WHERE id = $1")
        .bind(course_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
