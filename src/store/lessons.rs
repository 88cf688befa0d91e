use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::db::{self, update};

/// A lesson inside a module. `video_key` is an opaque object-storage key;
/// handlers enrich it into a presigned download URL.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Lesson {
    pub lesson_id: Uuid,
    pub module_id: Uuid,
    pub title: String,
    pub video_key: Option<String>,
    pub duration_minutes: Option<i32>,
    #[sqlx(rename = "sort_order")]
    pub position: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub const UPDATE_ALLOW: &[(&str, &str)] = &[
    ("title", "title"),
    ("videoKey", "video_key"),
    ("durationMinutes", "duration_minutes"),
    ("position", "sort_order"),
];

const ALL_COLUMNS: &str =
    "lesson_id, module_id, title, video_key, duration_minutes, sort_order, created_at, updated_at";

pub async fn create(
    pool: &PgPool,
    module_id: Uuid,
    title: &str,
    video_key: Option<&str>,
    duration_minutes: Option<i32>,
    position: Option<i32>,
) -> Result<Lesson, sqlx::Error> {
    let sql = format!(
        r#"
        INSERT INTO lessons (lesson_id, module_id, title, video_key, duration_minutes, sort_order, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5,
                COALESCE($6, (SELECT COALESCE(MAX(sort_order), 0) + 1 FROM lessons WHERE module_id = $2)),
                $7, $7)
        RETURNING {ALL_COLUMNS}
        "#
    );

    sqlx::query_as::<_, Lesson>(&sql)
        .bind(Uuid::new_v4())
        .bind(module_id)
        .bind(title)
        .bind(video_key)
        .bind(duration_minutes)
        .bind(position)
        .bind(Utc::now())
        .fetch_one(pool)
        .await
}

pub async fn list_by_module(pool: &PgPool, module_id: Uuid) -> Result<Vec<Lesson>, sqlx::Error> {
    let sql = format!(
        "SELECT {ALL_COLUMNS} FROM lessons WHERE module_id = $1 ORDER BY sort_order ASC, created_at ASC"
    );
    sqlx::query_as::<_, Lesson>(&sql)
        .bind(module_id)
        .fetch_all(pool)
        .await
}

pub async fn list_by_course(pool: &PgPool, course_id: Uuid) -> Result<Vec<Lesson>, sqlx::Error> {
    let sql = format!(
        "SELECT l.lesson_id, l.module_id, l.title, l.video_key, l.duration_minutes, \
                l.sort_order, l.created_at, l.updated_at \
         FROM lessons l \
         JOIN modules m ON m.module_id = l.module_id \
         WHERE m.course_id = $1 \
         ORDER BY m.sort_order ASC, l.sort_order ASC"
    );
    sqlx::query_as::<_, Lesson>(&sql)
        .bind(course_id)
        .fetch_all(pool)
        .await
}

pub async fn update_fields(
    pool: &PgPool,
    lesson_id: Uuid,
    fields: &Map<String, Value>,
) -> Result<Result<Option<Lesson>, update::UpdateError>, sqlx::Error> {
    let stmt = match update::build_update("lessons", UPDATE_ALLOW, fields, &["lesson_id"]) {
        Ok(stmt) => stmt,
        Err(e) => return Ok(Err(e)),
    };

    let sql = format!("{} RETURNING {ALL_COLUMNS}", stmt.sql);
    let mut q = sqlx::query_as::<_, Lesson>(&sql);
    for p in &stmt.params {
        q = db::bind_value_as(q, p);
    }
    let row = q
        .bind(stmt.touched_at)
        .bind(lesson_id)
        .fetch_optional(pool)
        .await?;

    Ok(Ok(row))
}

pub async fn delete(pool: &PgPool, lesson_id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM lessons WHERE lesson_id = $1")
        .bind(lesson_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
