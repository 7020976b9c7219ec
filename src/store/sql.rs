//! SQL for the JSONB collection tables. Identifiers come from code or validated config only; values are always parameters.

/// Quote identifier for PostgreSQL.
pub fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Full qualified table name.
pub fn qualified_table(schema: &str, table: &str) -> String {
    format!("{}.{}", quoted(schema), quoted(table))
}

/// Quote a JSON key as a SQL string literal (for `payload->>'key'`).
fn literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

pub fn create_schema(schema: &str) -> String {
    format!("CREATE SCHEMA IF NOT EXISTS {}", quoted(schema))
}

pub fn create_collection_table(schema: &str, collection: &str) -> String {
    format!(
        r#"CREATE TABLE IF NOT EXISTS {} (
    id UUID PRIMARY KEY,
    payload JSONB NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
)"#,
        qualified_table(schema, collection)
    )
}

/// Unique expression index over `payload->>'key'` for each key. `None` when there are no keys.
pub fn create_unique_index(schema: &str, collection: &str, keys: &[&str]) -> Option<String> {
    if keys.is_empty() {
        return None;
    }
    let index_name = format!("{}_{}_uniq", collection, keys.join("_")).to_lowercase();
    let exprs = keys
        .iter()
        .map(|k| format!("(payload->>{})", literal(k)))
        .collect::<Vec<_>>()
        .join(", ");
    Some(format!(
        "CREATE UNIQUE INDEX IF NOT EXISTS {} ON {} ({})",
        quoted(&index_name),
        qualified_table(schema, collection),
        exprs
    ))
}

/// `$1`: id.
pub fn select_by_id(schema: &str, collection: &str) -> String {
    format!(
        "SELECT payload FROM {} WHERE id = $1",
        qualified_table(schema, collection)
    )
}

/// `$1`: uuid[].
pub fn select_by_ids(schema: &str, collection: &str) -> String {
    format!(
        "SELECT payload FROM {} WHERE id = ANY($1) ORDER BY created_at, id",
        qualified_table(schema, collection)
    )
}

/// `$1`: JSONB object the payload must contain. Pass `{}` to select everything.
pub fn select_filtered(schema: &str, collection: &str, limit: Option<u32>) -> String {
    let mut sql = format!(
        "SELECT payload FROM {} WHERE payload @> $1 ORDER BY created_at, id",
        qualified_table(schema, collection)
    );
    if let Some(n) = limit {
        sql.push_str(&format!(" LIMIT {}", n));
    }
    sql
}

pub fn count(schema: &str, collection: &str) -> String {
    format!("SELECT COUNT(*) FROM {}", qualified_table(schema, collection))
}

/// `$1`: id, `$2`: payload.
pub fn insert(schema: &str, collection: &str) -> String {
    format!(
        "INSERT INTO {} (id, payload) VALUES ($1, $2) RETURNING payload",
        qualified_table(schema, collection)
    )
}

/// `$1`: id, `$2`: JSONB object merged over the stored payload.
pub fn update_merge(schema: &str, collection: &str) -> String {
    format!(
        "UPDATE {} SET payload = payload || $2 WHERE id = $1 RETURNING payload",
        qualified_table(schema, collection)
    )
}

/// `$1`: id.
pub fn delete(schema: &str, collection: &str) -> String {
    format!(
        "DELETE FROM {} WHERE id = $1 RETURNING id",
        qualified_table(schema, collection)
    )
}

/// `$1`: id, `$2`: array field name, `$3`: target id as text. Appends only when absent; no row means missing or already present.
pub fn push_reference(schema: &str, collection: &str) -> String {
    format!(
        "UPDATE {t} SET payload = jsonb_set(payload, ARRAY[$2::text], \
         COALESCE(payload->($2::text), '[]'::jsonb) || jsonb_build_array($3::text)) \
         WHERE id = $1 AND NOT (COALESCE(payload->($2::text), '[]'::jsonb) @> jsonb_build_array($3::text)) \
         RETURNING payload",
        t = qualified_table(schema, collection)
    )
}

/// `$1`: id.
pub fn exists(schema: &str, collection: &str) -> String {
    format!(
        "SELECT EXISTS(SELECT 1 FROM {} WHERE id = $1)",
        qualified_table(schema, collection)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_identifiers() {
        assert_eq!(qualified_table("school", "class_levels"), "\"school\".\"class_levels\"");
        assert_eq!(quoted("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn unique_index_covers_every_key() {
        let sql = create_unique_index("school", "exam_results", &["studentId", "exam"]).unwrap();
        assert!(sql.contains("\"exam_results_studentid_exam_uniq\""));
        assert!(sql.contains("(payload->>'studentId'), (payload->>'exam')"));
        assert!(create_unique_index("school", "questions", &[]).is_none());
    }

    #[test]
    fn filtered_select_uses_containment_and_limit() {
        let sql = select_filtered("school", "programs", Some(1));
        assert!(sql.contains("payload @> $1"));
        assert!(sql.ends_with("LIMIT 1"));
        assert!(!select_filtered("school", "programs", None).contains("LIMIT"));
    }

    #[test]
    fn push_is_guarded_against_duplicates() {
        let sql = push_reference("school", "programs");
        assert!(sql.contains("jsonb_set"));
        assert!(sql.contains("NOT (COALESCE"));
    }
}
