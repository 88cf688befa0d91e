use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;
use serde_json::{json, Map, Value};
use sqlx::{FromRow, PgPool, Row};

use crate::db::{self, page::Page, update};

/// Full student profile. Date-like fields hold ISO-8601 strings, matching the
/// wire format they arrive in.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Student {
    pub student_id: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<String>,
    pub gender: Option<String>,
    pub profile_photo_url: Option<String>,
    pub email: String,
    pub mobile_number: String,
    pub emergency_contact: Option<String>,
    pub residential_address: Option<String>,
    pub current_status: String,
    pub highest_qualification: Option<String>,
    pub id_proof_type: String,
    pub id_number: Option<String>,
    pub lead_source: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Condensed projection used by list endpoints.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct StudentSummary {
    pub student_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub mobile_number: String,
    pub current_status: String,
    pub highest_qualification: Option<String>,
    pub lead_source: String,
}

#[derive(Debug)]
pub struct NewStudent {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub mobile_number: String,
    pub date_of_birth: Option<String>,
    pub gender: Option<String>,
    pub profile_photo_url: Option<String>,
    pub emergency_contact: Option<String>,
    pub residential_address: Option<String>,
    pub current_status: String,
    pub highest_qualification: Option<String>,
    pub id_proof_type: String,
    pub id_number: Option<String>,
    pub lead_source: String,
}

/// Allow-list for partial updates: API (camelCase) field name -> column.
pub const UPDATE_ALLOW: &[(&str, &str)] = &[
    ("firstName", "first_name"),
    ("lastName", "last_name"),
    ("dateOfBirth", "date_of_birth"),
    ("gender", "gender"),
    ("profilePhotoUrl", "profile_photo_url"),
    ("email", "email"),
    ("mobileNumber", "mobile_number"),
    ("emergencyContact", "emergency_contact"),
    ("residentialAddress", "residential_address"),
    ("currentStatus", "current_status"),
    ("highestQualification", "highest_qualification"),
    ("idProofType", "id_proof_type"),
    ("idNumber", "id_number"),
    ("leadSource", "lead_source"),
];

const ALL_COLUMNS: &str = "student_id, first_name, last_name, date_of_birth, gender, \
     profile_photo_url, email, mobile_number, emergency_contact, \
     residential_address, current_status, highest_qualification, \
     id_proof_type, id_number, lead_source, created_at, updated_at";

fn generate_student_id() -> String {
    format!("STU{}", rand::thread_rng().gen_range(10000..100000))
}

pub async fn create(pool: &PgPool, new: &NewStudent) -> Result<Student, sqlx::Error> {
    let student_id = generate_student_id();
    let now = Utc::now();

    let sql = format!(
        r#"
        INSERT INTO students (
            student_id, first_name, last_name, date_of_birth, gender,
            profile_photo_url, email, mobile_number, emergency_contact,
            residential_address, current_status, highest_qualification,
            id_proof_type, id_number, lead_source, created_at, updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $16)
        RETURNING {ALL_COLUMNS}
        "#
    );

    sqlx::query_as::<_, Student>(&sql)
        .bind(&student_id)
        .bind(&new.first_name)
        .bind(&new.last_name)
        .bind(&new.date_of_birth)
        .bind(&new.gender)
        .bind(&new.profile_photo_url)
        .bind(&new.email)
        .bind(&new.mobile_number)
        .bind(&new.emergency_contact)
        .bind(&new.residential_address)
        .bind(&new.current_status)
        .bind(&new.highest_qualification)
        .bind(&new.id_proof_type)
        .bind(&new.id_number)
        .bind(&new.lead_source)
        .bind(now)
        .fetch_one(pool)
        .await
}

pub async fn get_by_id(pool: &PgPool, student_id: &str) -> Result<Option<Student>, sqlx::Error> {
    let sql = format!("SELECT {ALL_COLUMNS} FROM students WHERE student_id = $1");
    sqlx::query_as::<_, Student>(&sql)
        .bind(student_id)
        .fetch_optional(pool)
        .await
}

pub async fn list(
    pool: &PgPool,
    limit: i64,
    offset: i64,
    search: Option<&str>,
    status: Option<&str>,
) -> Result<Page<StudentSummary>, sqlx::Error> {
    let mut params: Vec<Value> = Vec::new();
    let mut clauses: Vec<String> = Vec::new();

    if let Some(term) = search {
        params.push(json!(format!("%{}%", term)));
        let n = params.len();
        clauses.push(format!(
            "(email ILIKE ${n} OR first_name ILIKE ${n} OR last_name ILIKE ${n} OR mobile_number ILIKE ${n})"
        ));
    }
    if let Some(status) = status {
        params.push(json!(status));
        clauses.push(format!("current_status = ${}", params.len()));
    }

    let where_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    };

    let item_sql = format!(
        "SELECT student_id, first_name, last_name, email, mobile_number, \
                current_status, highest_qualification, lead_source \
         FROM students {} \
         ORDER BY created_at DESC LIMIT ${} OFFSET ${}",
        where_sql,
        params.len() + 1,
        params.len() + 2
    );
    let mut q = sqlx::query_as::<_, StudentSummary>(&item_sql);
    for p in &params {
        q = db::bind_value_as(q, p);
    }
    let items = q.bind(limit).bind(offset).fetch_all(pool).await?;

    let count_sql = format!("SELECT COUNT(*) AS count FROM students {}", where_sql);
    let mut q = sqlx::query(&count_sql);
    for p in &params {
        q = db::bind_value(q, p);
    }
    let total: i64 = q.fetch_one(pool).await?.try_get("count")?;

    Ok(Page::new(items, total, limit, offset))
}

pub async fn update_fields(
    pool: &PgPool,
    student_id: &str,
    fields: &Map<String, Value>,
) -> Result<Result<Option<Student>, update::UpdateError>, sqlx::Error> {
    let stmt = match update::build_update("students", UPDATE_ALLOW, fields, &["student_id"]) {
        Ok(stmt) => stmt,
        Err(e) => return Ok(Err(e)),
    };

    let sql = format!("{} RETURNING {ALL_COLUMNS}", stmt.sql);
    let mut q = sqlx::query_as::<_, Student>(&sql);
    for p in &stmt.params {
        q = db::bind_value_as(q, p);
    }
    let row = q
        .bind(stmt.touched_at)
        .bind(student_id)
        .fetch_optional(pool)
        .await?;

    Ok(Ok(row))
}

pub async fn delete(pool: &PgPool, student_id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM students WHERE student_id = $1")
        .bind(student_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
