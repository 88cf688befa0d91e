use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::db::{self, update};

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Module {
    pub module_id: Uuid,
    pub course_id: Uuid,
    pub title: String,
    // "position" is reserved in Postgres; the column is sort_order
    #[sqlx(rename = "sort_order")]
    pub position: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub const UPDATE_ALLOW: &[(&str, &str)] = &[("title", "title"), ("position", "sort_order")];

const ALL_COLUMNS: &str = "module_id, course_id, title, sort_order, created_at, updated_at";

/// Create a module under a course. Omitted position appends to the end.
pub async fn create(
    pool: &PgPool,
    course_id: Uuid,
    title: &str,
    position: Option<i32>,
) -> Result<Module, sqlx::Error> {
    let sql = format!(
        r#"
        INSERT INTO modules (module_id, course_id, title, sort_order, created_at, updated_at)
        VALUES ($1, $2, $3,
                COALESCE($4, (SELECT COALESCE(MAX(sort_order), 0) + 1 FROM modules WHERE course_id = $2)),
                $5, $5)
        RETURNING {ALL_COLUMNS}
        "#
    );

    sqlx::query_as::<_, Module>(&sql)
        .bind(Uuid::new_v4())
        .bind(course_id)
        .bind(title)
        .bind(position)
        .bind(Utc::now())
        .fetch_one(pool)
        .await
}

pub async fn list_by_course(pool: &PgPool, course_id: Uuid) -> Result<Vec<Module>, sqlx::Error> {
    let sql = format!(
        "SELECT {ALL_COLUMNS} FROM modules WHERE course_id = $1 ORDER BY sort_order ASC, created_at ASC"
    );
    sqlx::query_as::<_, Module>(&sql)
        .bind(course_id)
        .fetch_all(pool)
        .await
}

pub async fn get_by_id(pool: &PgPool, module_id: Uuid) -> Result<Option<Module>, sqlx::Error> {
    let sql = format!("SELECT {ALL_COLUMNS} FROM modules WHERE module_id = $1");
    sqlx::query_as::<_, Module>(&sql)
        .bind(module_id)
        .fetch_optional(pool)
        .await
}

pub async fn update_fields(
    pool: &PgPool,
    module_id: Uuid,
    fields: &Map<String, Value>,
) -> Result<Result<Option<Module>, update::UpdateError>, sqlx::Error> {
    let stmt = match update::build_update("modules", UPDATE_ALLOW, fields, &["module_id"]) {
        Ok(stmt) => stmt,
        Err(e) => return Ok(Err(e)),
    };

    let sql = format!("{} RETURNING {ALL_COLUMNS}", stmt.sql);
    let mut q = sqlx::query_as::<_, Module>(&sql);
    for p in &stmt.params {
        q = db::bind_value_as(q, p);
    }
    let row = q
        .bind(stmt.touched_at)
        .bind(module_id)
        .fetch_optional(pool)
        .await?;

    Ok(Ok(row))
}

pub async fn delete(pool: &PgPool, module_id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM modules WHERE module_id = $1")
        .bind(module_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
