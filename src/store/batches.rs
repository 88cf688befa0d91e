use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Map, Value};
use sqlx::{FromRow, PgPool, Row};
use uuid::Uuid;

use crate::db::{self, page::Page, update};

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Batch {
    pub batch_id: Uuid,
    pub course_id: Uuid,
    pub batch_name: String,
    pub batch_code: String,
    pub start_date: String,
    pub end_date: Option<String>,
    pub schedule_type: String,
    pub days_of_week: Option<Vec<String>>,
    pub time_slot: Option<String>,
    pub instructor_id: Option<String>,
    pub max_capacity: i32,
    pub current_enrollment: i32,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Joined row for the cross-course batch listing: adds course title and
/// instructor name.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct BatchListing {
    pub batch_id: Uuid,
    pub course_id: Uuid,
    pub course_title: String,
    pub batch_name: String,
    pub batch_code: String,
    pub start_date: String,
    pub end_date: Option<String>,
    pub schedule_type: String,
    pub days_of_week: Option<Vec<String>>,
    pub time_slot: Option<String>,
    pub instructor_id: Option<String>,
    pub instructor_name: Option<String>,
    pub max_capacity: i32,
    pub current_enrollment: i32,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct NewBatch {
    pub batch_name: String,
    pub batch_code: String,
    pub start_date: String,
    pub end_date: Option<String>,
    pub schedule_type: String,
    pub days_of_week: Option<Vec<String>>,
    pub time_slot: Option<String>,
    pub instructor_id: Option<String>,
    pub max_capacity: i32,
    pub status: String,
}

pub const UPDATE_ALLOW: &[(&str, &str)] = &[
    ("batchName", "batch_name"),
    ("batchCode", "batch_code"),
    ("startDate", "start_date"),
    ("endDate", "end_date"),
    ("scheduleType", "schedule_type"),
    ("daysOfWeek", "days_of_week"),
    ("timeSlot", "time_slot"),
    ("instructorId", "instructor_id"),
    ("maxCapacity", "max_capacity"),
    ("status", "status"),
];

const ALL_COLUMNS: &str = "batch_id, course_id, batch_name, batch_code, start_date, end_date, \
     schedule_type, days_of_week, time_slot, instructor_id, max_capacity, \
     current_enrollment, status, created_at, updated_at";

pub async fn create(pool: &PgPool, course_id: Uuid, new: &NewBatch) -> Result<Batch, sqlx::Error> {
    let sql = format!(
        r#"
        INSERT INTO batches (
            batch_id, course_id, batch_name, batch_code, start_date, end_date,
            schedule_type, days_of_week, time_slot, instructor_id, max_capacity,
            current_enrollment, status, created_at, updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, 0, $12, $13, $13)
        RETURNING {ALL_COLUMNS}
        "#
    );

    sqlx::query_as::<_, Batch>(&sql)
        .bind(Uuid::new_v4())
        .bind(course_id)
        .bind(&new.batch_name)
        .bind(&new.batch_code)
        .bind(&new.start_date)
        .bind(&new.end_date)
        .bind(&new.schedule_type)
        .bind(&new.days_of_week)
        .bind(&new.time_slot)
        .bind(&new.instructor_id)
        .bind(new.max_capacity)
        .bind(&new.status)
        .bind(Utc::now())
        .fetch_one(pool)
        .await
}

/// Fetch a batch scoped to its course, per the source contract.
pub async fn get_by_id(
    pool: &PgPool,
    course_id: Uuid,
    batch_id: Uuid,
) -> Result<Option<Batch>, sqlx::Error> {
    let sql = format!("SELECT {ALL_COLUMNS} FROM batches WHERE batch_id = $1 AND course_id = $2");
    sqlx::query_as::<_, Batch>(&sql)
        .bind(batch_id)
        .bind(course_id)
        .fetch_optional(pool)
        .await
}

pub async fn list_by_course(pool: &PgPool, course_id: Uuid) -> Result<Vec<Batch>, sqlx::Error> {
    let sql = format!(
        "SELECT {ALL_COLUMNS} FROM batches WHERE course_id = $1 ORDER BY start_date ASC"
    );
    sqlx::query_as::<_, Batch>(&sql)
        .bind(course_id)
        .fetch_all(pool)
        .await
}

/// Join clause shared verbatim by the listing's item and count queries.
/// Instructor is optional at creation, hence the LEFT JOIN.
const LISTING_FROM: &str = "FROM batches b \
     JOIN courses c ON c.id = b.course_id \
     LEFT JOIN users u ON u.user_id = b.instructor_id";

fn listing_filters(
    search: Option<&str>,
    course_id: Option<Uuid>,
    status: Option<&str>,
) -> (Vec<Value>, String) {
    let mut params: Vec<Value> = Vec::new();
    let mut clauses: Vec<String> = Vec::new();

    if let Some(course_id) = course_id {
        params.push(json!(course_id.to_string()));
        clauses.push(format!("b.course_id = ${}::uuid", params.len()));
    }
    if let Some(status) = status {
        params.push(json!(status));
        clauses.push(format!("b.status = ${}", params.len()));
    }
    if let Some(term) = search {
        params.push(json!(format!("%{}%", term)));
        let n = params.len();
        clauses.push(format!("(b.batch_name ILIKE ${n} OR b.batch_code ILIKE ${n})"));
    }

    let where_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    };

    (params, where_sql)
}

/// Both queries embed the same FROM and WHERE text so the count can never
/// drift from the rows the item query sees.
fn listing_queries(where_sql: &str, first_bind: usize) -> (String, String) {
    let item_sql = format!(
        "SELECT b.batch_id, b.course_id, c.title AS course_title, b.batch_name, \
                b.batch_code, b.start_date, b.end_date, b.schedule_type, \
                b.days_of_week, b.time_slot, b.instructor_id, \
                u.full_name AS instructor_name, b.max_capacity, \
                b.current_enrollment, b.status, b.created_at, b.updated_at \
         {LISTING_FROM} {where_sql} ORDER BY b.start_date DESC LIMIT ${first_bind} OFFSET ${}",
        first_bind + 1
    );
    let count_sql = format!("SELECT COUNT(*) AS count {LISTING_FROM} {where_sql}");
    (item_sql, count_sql)
}

/// Cross-course listing joined with course title and instructor name.
pub async fn list_all(
    pool: &PgPool,
    limit: i64,
    offset: i64,
    search: Option<&str>,
    course_id: Option<Uuid>,
    status: Option<&str>,
) -> Result<Page<BatchListing>, sqlx::Error> {
    let (params, where_sql) = listing_filters(search, course_id, status);
    let (item_sql, count_sql) = listing_queries(&where_sql, params.len() + 1);

    let mut q = sqlx::query_as::<_, BatchListing>(&item_sql);
    for p in &params {
        q = db::bind_value_as(q, p);
    }
    let items = q.bind(limit).bind(offset).fetch_all(pool).await?;

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
    batch_id: Uuid,
    fields: &Map<String, Value>,
) -> Result<Result<Option<Batch>, update::UpdateError>, sqlx::Error> {
    let stmt = match update::build_update("batches", UPDATE_ALLOW, fields, &["batch_id", "course_id"])
    {
        Ok(stmt) => stmt,
        Err(e) => return Ok(Err(e)),
    };

    let sql = format!("{} RETURNING {ALL_COLUMNS}", stmt.sql);
    let mut q = sqlx::query_as::<_, Batch>(&sql);
    for p in &stmt.params {
        q = db::bind_value_as(q, p);
    }
    let row = q
        .bind(stmt.touched_at)
        .bind(batch_id)
        .bind(course_id)
        .fetch_optional(pool)
        .await?;

    Ok(Ok(row))
}

pub async fn delete(pool: &PgPool, batch_id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM batches WHERE batch_id = $1")
        .bind(batch_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_and_count_queries_share_from_and_where() {
        let (item, count) = listing_queries("WHERE b.status = $1", 2);

        let item_from = &item[item.find("FROM").unwrap()..item.find(" ORDER BY").unwrap()];
        let count_from = &count[count.find("FROM").unwrap()..];
        assert_eq!(item_from, count_from);

        // empty filter set keeps the parity too
        let (item, count) = listing_queries("", 1);
        let item_from = &item[item.find("FROM").unwrap()..item.find(" ORDER BY").unwrap()];
        let count_from = &count[count.find("FROM").unwrap()..];
        assert_eq!(item_from, count_from);
    }

    #[test]
    fn listing_filters_number_params_sequentially() {
        let course_id = Uuid::new_v4();
        let (params, where_sql) = listing_filters(Some("morning"), Some(course_id), Some("active"));

        assert_eq!(params.len(), 3);
        assert!(where_sql.contains("b.course_id = $1::uuid"));
        assert!(where_sql.contains("b.status = $2"));
        assert!(where_sql.contains("ILIKE $3"));

        let (params, where_sql) = listing_filters(None, None, None);
        assert!(params.is_empty());
        assert!(where_sql.is_empty());
    }
}
