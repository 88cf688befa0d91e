use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use sqlx::{FromRow, PgPool, Row};
use uuid::Uuid;

use crate::db::{self, page::Page};

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Enrollment {
    pub enrollment_id: Uuid,
    pub batch_id: Uuid,
    pub student_id: String,
    pub enrolled_at: DateTime<Utc>,
}

/// Roster projection for batch-student listings.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct BatchStudent {
    pub student_id: String,
    pub name: String,
    pub email: String,
}

/// Enroll a student in a batch. Uniqueness of (batch_id, student_id) is
/// enforced by the database constraint; a violation surfaces as a 23505
/// error for the handler to map to 409. The insert and the enrollment
/// counter bump commit together.
pub async fn enroll(
    pool: &PgPool,
    batch_id: Uuid,
    student_id: &str,
) -> Result<Enrollment, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let enrollment = sqlx::query_as::<_, Enrollment>(
        r#"
        INSERT INTO enrollments (enrollment_id, batch_id, student_id, enrolled_at)
        VALUES ($1, $2, $3, $4)
        RETURNING enrollment_id, batch_id, student_id, enrolled_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(batch_id)
    .bind(student_id)
    .bind(Utc::now())
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("UPDATE batches SET current_enrollment = current_enrollment + 1 WHERE batch_id = $1")
        .bind(batch_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(enrollment)
}

pub async fn unenroll(pool: &PgPool, batch_id: Uuid, student_id: &str) -> Result<bool, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let result = sqlx::query("DELETE FROM enrollments WHERE batch_id = $1 AND student_id = $2")
        .bind(batch_id)
        .bind(student_id)
        .execute(&mut *tx)
        .await?;

    if result.rows_affected() == 0 {
        return Ok(false);
    }

    sqlx::query(
        "UPDATE batches SET current_enrollment = GREATEST(current_enrollment - 1, 0) WHERE batch_id = $1",
    )
    .bind(batch_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(true)
}

pub async fn list_batch_students(
    pool: &PgPool,
    batch_id: Uuid,
    limit: i64,
    offset: i64,
    search: Option<&str>,
) -> Result<Page<BatchStudent>, sqlx::Error> {
    let mut params: Vec<Value> = vec![json!(batch_id.to_string())];
    let mut clauses: Vec<String> = vec!["e.batch_id = $1::uuid".to_string()];

    if let Some(term) = search {
        params.push(json!(format!("%{}%", term)));
        let n = params.len();
        clauses.push(format!(
            "(s.first_name ILIKE ${n} OR s.last_name ILIKE ${n} OR s.email ILIKE ${n})"
        ));
    }

    let where_sql = format!("WHERE {}", clauses.join(" AND "));

    let item_sql = format!(
        "SELECT s.student_id, s.first_name || ' ' || s.last_name AS name, s.email \
         FROM enrollments e \
         JOIN students s ON s.student_id = e.student_id \
         {} ORDER BY s.first_name ASC LIMIT ${} OFFSET ${}",
        where_sql,
        params.len() + 1,
        params.len() + 2
    );
    let mut q = sqlx::query_as::<_, BatchStudent>(&item_sql);
    for p in &params {
        q = db::bind_value_as(q, p);
    }
    let items = q.bind(limit).bind(offset).fetch_all(pool).await?;

    let count_sql = format!(
        "SELECT COUNT(*) AS count FROM enrollments e \
         JOIN students s ON s.student_id = e.student_id {}",
        where_sql
    );
    let mut q = sqlx::query(&count_sql);
    for p in &params {
        q = db::bind_value(q, p);
    }
    let total: i64 = q.fetch_one(pool).await?.try_get("count")?;

    Ok(Page::new(items, total, limit, offset))
}

/// Batch existence probe used for 404s before enrolling.
pub async fn batch_exists(pool: &PgPool, batch_id: Uuid) -> Result<bool, sqlx::Error> {
    let row = sqlx::query("SELECT 1 FROM batches WHERE batch_id = $1")
        .bind(batch_id)
        .fetch_optional(pool)
        .await?;
    Ok(row.is_some())
}
