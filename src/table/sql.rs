//! SQL text generated for table operations.

use super::metadata::TableMetadata;
use crate::naming::quote_identifier;

pub(crate) fn qualified_name(meta: &TableMetadata) -> String {
    match meta.schema() {
        Some(schema) => format!("{}.{}", quote_identifier(schema), quote_identifier(meta.table_name())),
        None => quote_identifier(meta.table_name()),
    }
}

fn equals_list<'a>(columns: impl IntoIterator<Item = &'a str>, separator: &str) -> String {
    columns
        .into_iter()
        .map(|c| format!("{} = ?", quote_identifier(c)))
        .collect::<Vec<_>>()
        .join(separator)
}

fn column_list<'a>(columns: impl IntoIterator<Item = &'a str>) -> String {
    columns
        .into_iter()
        .map(quote_identifier)
        .collect::<Vec<_>>()
        .join(", ")
}

pub(crate) fn insert(meta: &TableMetadata, columns: &[&str]) -> String {
    if columns.is_empty() {
        return format!("INSERT INTO {} DEFAULT VALUES", qualified_name(meta));
    }
    let placeholders = vec!["?"; columns.len()].join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        qualified_name(meta),
        column_list(columns.iter().copied()),
        placeholders
    )
}

/// UPDATE with one placeholder per SET and WHERE column. With a revision
/// column the revision is incremented and checked by a final placeholder.
pub(crate) fn update(meta: &TableMetadata, set: &[&str], conditions: &[&str], revision: Option<&str>) -> String {
    let mut set_list = equals_list(set.iter().copied(), ", ");
    let mut where_list = equals_list(conditions.iter().copied(), " AND ");
    if let Some(rev) = revision {
        let rev = quote_identifier(rev);
        set_list.push_str(&format!(", {rev} = {rev} + 1"));
        where_list.push_str(&format!(" AND {rev} = ?"));
    }
    format!("UPDATE {} SET {} WHERE {}", qualified_name(meta), set_list, where_list)
}

pub(crate) fn delete(meta: &TableMetadata, pk: &str, revision: Option<&str>) -> String {
    let conditions: Vec<&str> = std::iter::once(pk).chain(revision).collect();
    format!(
        "DELETE FROM {} WHERE {}",
        qualified_name(meta),
        equals_list(conditions, " AND ")
    )
}

pub(crate) fn select_where(meta: &TableMetadata, columns: &[&str], conditions: &[&str]) -> String {
    format!(
        "SELECT {} FROM {} WHERE {}",
        column_list(columns.iter().copied()),
        qualified_name(meta),
        equals_list(conditions.iter().copied(), " AND ")
    )
}

pub(crate) fn count_by_id(meta: &TableMetadata, pk: &str) -> String {
    format!(
        "SELECT COUNT(*) FROM {} WHERE {} = ?",
        qualified_name(meta),
        quote_identifier(pk)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::table::metadata::tests::load_person;

    #[test]
    fn test_insert() {
        let meta = load_person(&Config::default());
        assert_eq!(
            insert(&meta, &["id", "first_name"]),
            r#"INSERT INTO "main"."person" ("id", "first_name") VALUES (?, ?)"#
        );
        assert_eq!(insert(&meta, &[]), r#"INSERT INTO "main"."person" DEFAULT VALUES"#);
    }

    #[test]
    fn test_update_with_revision() {
        let meta = load_person(&Config::default());
        assert_eq!(
            update(&meta, &["first_name"], &["id"], None),
            r#"UPDATE "main"."person" SET "first_name" = ? WHERE "id" = ?"#
        );
        assert_eq!(
            update(&meta, &["first_name"], &["id"], Some("revision")),
            r#"UPDATE "main"."person" SET "first_name" = ?, "revision" = "revision" + 1 WHERE "id" = ? AND "revision" = ?"#
        );
    }

    #[test]
    fn test_delete_and_select() {
        let meta = load_person(&Config::default());
        assert_eq!(
            delete(&meta, "id", Some("revision")),
            r#"DELETE FROM "main"."person" WHERE "id" = ? AND "revision" = ?"#
        );
        assert_eq!(
            select_where(&meta, &["id", "first_name"], &["id"]),
            r#"SELECT "id", "first_name" FROM "main"."person" WHERE "id" = ?"#
        );
        assert_eq!(
            count_by_id(&meta, "id"),
            r#"SELECT COUNT(*) FROM "main"."person" WHERE "id" = ?"#
        );
    }
}
