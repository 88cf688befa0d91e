use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UpdateError {
    /// Nothing to update after allow-list filtering. Distinct from "entity
    /// not found": callers must not issue a statement in this case.
    #[error("no valid fields to update")]
    EmptyUpdate,
}

/// A ready-to-bind partial UPDATE statement.
///
/// Bind order is fixed: `params` first, then `touched_at`, then the key
/// values for the WHERE predicate.
#[derive(Debug)]
pub struct UpdateStatement {
    pub sql: String,
    pub params: Vec<Value>,
    pub touched_at: DateTime<Utc>,
}

/// Build a partial UPDATE touching exactly the allow-listed fields supplied
/// by the caller, plus an automatic `updated_at` assignment and the key
/// predicate.
///
/// `allow` maps caller-facing field names to column names; field names are
/// never taken verbatim as SQL identifiers. Unknown keys are silently
/// dropped. `key_columns` are matched with `AND`, with placeholders following
/// the timestamp parameter; the caller binds the key values last.
pub fn build_update(
    table: &str,
    allow: &[(&str, &str)],
    fields: &Map<String, Value>,
    key_columns: &[&str],
) -> Result<UpdateStatement, UpdateError> {
    let mut set_parts = Vec::new();
    let mut params = Vec::new();

    for (field, column) in allow {
        if let Some(value) = fields.get(*field) {
            set_parts.push(format!("\"{}\" = ${}", column, params.len() + 1));
            params.push(value.clone());
        }
    }

    if set_parts.is_empty() {
        return Err(UpdateError::EmptyUpdate);
    }

    set_parts.push(format!("\"updated_at\" = ${}", params.len() + 1));

    let mut next = params.len() + 2;
    let predicate = key_columns
        .iter()
        .map(|column| {
            let clause = format!("\"{}\" = ${}", column, next);
            next += 1;
            clause
        })
        .collect::<Vec<_>>()
        .join(" AND ");

    Ok(UpdateStatement {
        sql: format!(
            "UPDATE \"{}\" SET {} WHERE {}",
            table,
            set_parts.join(", "),
            predicate
        ),
        params,
        touched_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const ALLOW: &[(&str, &str)] = &[
        ("email", "email"),
        ("fullName", "full_name"),
        ("role", "role"),
    ];

    fn fields(v: Value) -> Map<String, Value> {
        v.as_object().unwrap().clone()
    }

    #[test]
    fn touches_exactly_the_supplied_allow_listed_fields() {
        let stmt = build_update(
            "users",
            ALLOW,
            &fields(json!({"email": "a@b.c", "role": "admin"})),
            &["user_id"],
        )
        .unwrap();

        assert_eq!(
            stmt.sql,
            "UPDATE \"users\" SET \"email\" = $1, \"role\" = $2, \"updated_at\" = $3 WHERE \"user_id\" = $4"
        );
        assert_eq!(stmt.params, vec![json!("a@b.c"), json!("admin")]);
    }

    #[test]
    fn unknown_keys_are_silently_dropped() {
        let stmt = build_update(
            "users",
            ALLOW,
            &fields(json!({"email": "a@b.c", "password_hash": "evil", "x; DROP TABLE": 1})),
            &["user_id"],
        )
        .unwrap();

        assert!(!stmt.sql.contains("password_hash"));
        assert!(!stmt.sql.contains("DROP"));
        assert_eq!(stmt.params.len(), 1);
    }

    #[test]
    fn zero_allow_listed_fields_is_an_empty_update() {
        let err = build_update(
            "users",
            ALLOW,
            &fields(json!({"password_hash": "evil"})),
            &["user_id"],
        )
        .unwrap_err();
        assert_eq!(err, UpdateError::EmptyUpdate);

        let err = build_update("users", ALLOW, &Map::new(), &["user_id"]).unwrap_err();
        assert_eq!(err, UpdateError::EmptyUpdate);
    }

    #[test]
    fn composite_keys_are_anded_after_the_timestamp() {
        let stmt = build_update(
            "batches",
            &[("batchName", "batch_name")],
            &fields(json!({"batchName": "Morning"})),
            &["batch_id", "course_id"],
        )
        .unwrap();

        assert_eq!(
            stmt.sql,
            "UPDATE \"batches\" SET \"batch_name\" = $1, \"updated_at\" = $2 WHERE \"batch_id\" = $3 AND \"course_id\" = $4"
        );
    }

    #[test]
    fn api_field_names_map_to_columns() {
        let stmt = build_update(
            "users",
            ALLOW,
            &fields(json!({"fullName": "Alice"})),
            &["user_id"],
        )
        .unwrap();
        assert!(stmt.sql.contains("\"full_name\" = $1"));
        assert!(!stmt.sql.contains("fullName"));
    }
}
