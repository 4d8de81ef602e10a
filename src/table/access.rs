//! Row-level CRUD on one table.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, trace};

use super::column::Column;
use super::linked_row::LinkedRow;
use super::metadata::TableMetadata;
use super::sql;
use crate::connection::Connection;
use crate::cursor::{OutputColumn, RowCursor};
use crate::error::{affected_rows_message, Error, Result};
use crate::row::Row;
use crate::statement::{BoundStatement, StatementKind};
use crate::types::Value;
use crate::validation::ValidationError;

/// Data access for one table over a borrowed connection.
///
/// Obtained from [`Database::table`](crate::Database::table).
pub struct Table<'a> {
    meta: Arc<TableMetadata>,
    conn: &'a mut dyn Connection,
}

impl<'a> Table<'a> {
    pub fn new(meta: Arc<TableMetadata>, conn: &'a mut dyn Connection) -> Self {
        Self { meta, conn }
    }

    pub fn metadata(&self) -> &Arc<TableMetadata> {
        &self.meta
    }

    /// Empty row linked to this table.
    pub fn new_row(&self) -> LinkedRow {
        LinkedRow::new(Arc::clone(&self.meta), Row::new())
    }

    pub fn validate(&self, row: &Row) -> BTreeMap<String, ValidationError> {
        self.meta.validate(row)
    }

    pub fn validate_value(&self, column: &str, value: &Value) -> Option<ValidationError> {
        self.meta.validate_value(column, value)
    }

    /// Insert a row.
    ///
    /// A null primary key is dropped so the database can generate it; the
    /// generated key and, with revision support, the initial revision are
    /// written back into `row`. Returns the primary-key value.
    pub fn insert(&mut self, row: &mut Row) -> Result<Option<Value>> {
        self.try_insert(row).map_err(Error::into_insert)
    }

    fn try_insert(&mut self, row: &mut Row) -> Result<Option<Value>> {
        let meta = Arc::clone(&self.meta);
        let pk = meta.primary_key_name();
        if let Some(pk) = pk {
            if row.get(pk).is_some_and(Value::is_null) {
                row.remove(pk);
            }
        }

        let mut columns: Vec<(&Column, &Value)> = Vec::with_capacity(row.len());
        for (key, value) in row.iter() {
            let column = meta.require_column(key)?;
            if !column.is_ignored() {
                columns.push((column, value));
            }
        }
        let names: Vec<&str> = columns.iter().map(|(c, _)| c.name()).collect();
        let bound = bind(sql::insert(&meta, &names), StatementKind::Command, &columns)?;
        let affected = self.run(&bound)?;
        if affected != 1 {
            return Err(Error::insert(format!(
                "{} rows were affected by insert operation. Expected: 1",
                affected
            )));
        }

        let Some(pk) = meta.primary_key() else {
            return Ok(None);
        };
        if !row.has_value(pk.name()) {
            if let Some(key) = self.conn.generated_key()? {
                let key = pk.converter().from_sql(key)?;
                trace!(table = %meta.name(), key = %key, "Generated key");
                row.insert(pk.name(), key);
            }
        }
        let id = row.get(pk.name()).cloned();
        if let (Some(rev), Some(id)) = (meta.revision_column(), &id) {
            let revision = self.fetch_revision(rev, &[(pk, id)])?;
            row.insert(rev.name(), revision);
        }
        Ok(id)
    }

    /// Update a row by its primary key.
    pub fn update(&mut self, row: &mut Row) -> Result<()> {
        let pk = self
            .meta
            .primary_key_name()
            .ok_or_else(|| Error::update("Can not update row without a primary key column."))?
            .to_string();
        let id = row
            .get(&pk)
            .filter(|v| !v.is_null())
            .cloned()
            .ok_or_else(|| Error::update(format!("Row has no value for primary key column '{}'", pk)))?;
        let mut conditions = Row::new();
        conditions.insert(pk, id);
        self.update_where(row, &conditions)
    }

    /// Update the row matching every entry of `conditions` with `values`.
    ///
    /// The revision column is never set from `values`. With revision support
    /// the current revision in `values` must match the stored one, and the
    /// incremented revision is written back into `values`.
    pub fn update_where(&mut self, values: &mut Row, conditions: &Row) -> Result<()> {
        self.try_update_where(values, conditions)
            .map_err(Error::into_update)
    }

    fn try_update_where(&mut self, values: &mut Row, conditions: &Row) -> Result<()> {
        if conditions.is_empty() {
            return Err(Error::update("Can not update without a where condition."));
        }
        let meta = Arc::clone(&self.meta);
        let revision = meta.revision_column();
        let is_revision = |key: &str| revision.is_some_and(|r| r.name() == key);
        let pk = meta.primary_key();

        let mut where_columns: Vec<(&Column, &Value)> = Vec::new();
        for (key, value) in conditions.iter().filter(|&(k, _)| !is_revision(k)) {
            where_columns.push((meta.require_column(key)?, value));
        }
        let pk_in_where = pk.is_some_and(|pk| where_columns.iter().any(|(c, _)| c.name() == pk.name()));

        let mut set_columns: Vec<(&Column, &Value)> = Vec::new();
        for (key, value) in values.iter().filter(|&(k, _)| !is_revision(k)) {
            let column = meta.require_column(key)?;
            if column.is_ignored() || column.is_ignored_on_update() {
                continue;
            }
            if pk_in_where && pk.is_some_and(|pk| pk.name() == column.name()) {
                continue;
            }
            set_columns.push((column, value));
        }
        if set_columns.is_empty() {
            debug!(table = %meta.name(), "No columns to update");
            if let Some(rev) = revision {
                let lookup = revision_lookup(pk, values, where_columns);
                let stored = self.fetch_revision(rev, &lookup)?;
                values.insert(rev.name(), stored);
            }
            return Ok(());
        }

        let current_revision = match revision {
            Some(rev) => Some(
                values
                    .get(rev.name())
                    .filter(|v| !v.is_null())
                    .cloned()
                    .ok_or_else(|| Error::update("Row must contain a revision."))?,
            ),
            None => None,
        };

        let set_names: Vec<&str> = set_columns.iter().map(|(c, _)| c.name()).collect();
        let where_names: Vec<&str> = where_columns.iter().map(|(c, _)| c.name()).collect();
        let text = sql::update(&meta, &set_names, &where_names, revision.map(Column::name));
        let mut params = set_columns.clone();
        params.extend(where_columns.iter().copied());
        if let (Some(rev), Some(current)) = (revision, &current_revision) {
            params.push((rev, current));
        }
        let bound = bind(text, StatementKind::Command, &params)?;
        let affected = self.run(&bound)?;
        if affected != 1 {
            return Err(Error::update(affected_rows_message("update", affected)));
        }

        if let Some(rev) = revision {
            let lookup = revision_lookup(pk, values, where_columns);
            let fresh = self.fetch_revision(rev, &lookup)?;
            values.insert(rev.name(), fresh);
        }
        Ok(())
    }

    /// Insert when the row's key is absent or not stored yet, update otherwise.
    ///
    /// Returns the primary-key value.
    pub fn save(&mut self, row: &mut Row) -> Result<Option<Value>> {
        let meta = Arc::clone(&self.meta);
        let pk = require_primary_key(&meta, "save")?;
        let id = match row.get(pk.name()).filter(|v| !v.is_null()) {
            Some(id) => id.clone(),
            None => return self.insert(row),
        };

        let bound = bind(sql::count_by_id(&meta, pk.name()), StatementKind::Query, &[(pk, &id)])?;
        debug!(sql = %bound.sql(), params = bound.params().len(), "Executing query");
        let raw = self
            .conn
            .query(bound.sql(), bound.params())
            .map_err(Error::into_access)?;
        let count = RowCursor::new(raw, Vec::new())
            .first()?
            .and_then(|r| r.values().next().and_then(Value::to_i64))
            .unwrap_or(0);

        if count == 0 {
            self.insert(row)
        } else {
            self.update(row)?;
            Ok(Some(id))
        }
    }

    /// Delete by primary key. Not available with revision support.
    pub fn delete_by_id(&mut self, id: impl Into<Value>) -> Result<()> {
        let id = id.into();
        self.try_delete(&id, None).map_err(Error::into_delete)
    }

    /// Delete a row by its primary key and, with revision support, its revision.
    pub fn delete(&mut self, row: &Row) -> Result<()> {
        let (id, revision) = self.delete_keys(row).map_err(Error::into_delete)?;
        self.try_delete(&id, revision.as_ref())
            .map_err(Error::into_delete)
    }

    fn delete_keys(&self, row: &Row) -> Result<(Value, Option<Value>)> {
        let pk = require_primary_key(&self.meta, "delete")?;
        let id = row
            .get(pk.name())
            .filter(|v| !v.is_null())
            .cloned()
            .ok_or_else(|| Error::delete(format!("Row has no value for primary key column '{}'", pk.name())))?;
        let revision = match self.meta.revision_column() {
            Some(rev) => Some(
                row.get(rev.name())
                    .filter(|v| !v.is_null())
                    .cloned()
                    .ok_or_else(|| Error::invalid_state("Row must contain a revision."))?,
            ),
            None => None,
        };
        Ok((id, revision))
    }

    fn try_delete(&mut self, id: &Value, revision: Option<&Value>) -> Result<()> {
        let meta = Arc::clone(&self.meta);
        let pk = require_primary_key(&meta, "delete")?;
        let rev_column = meta.revision_column();
        let mut params = vec![(pk, id)];
        match (rev_column, revision) {
            (Some(rev), Some(value)) => params.push((rev, value)),
            (Some(_), None) => {
                return Err(Error::invalid_state(
                    "Row must contain a revision. Delete the row instead of its id.",
                ))
            }
            (None, _) => {}
        }
        let text = sql::delete(&meta, pk.name(), rev_column.map(Column::name));
        let bound = bind(text, StatementKind::Command, &params)?;
        let affected = self.run(&bound)?;
        if affected != 1 {
            return Err(Error::delete(affected_rows_message("delete", affected)));
        }
        Ok(())
    }

    /// Load a row by primary key.
    pub fn load(&mut self, id: impl Into<Value>) -> Result<Option<LinkedRow>> {
        let id = id.into();
        let meta = Arc::clone(&self.meta);
        let pk = require_primary_key(&meta, "load")?;
        let columns: Vec<&Column> = meta.columns().iter().filter(|c| !c.is_ignored()).collect();
        let names: Vec<&str> = columns.iter().map(|c| c.name()).collect();
        let bound = bind(sql::select_where(&meta, &names, &[pk.name()]), StatementKind::Query, &[(pk, &id)])?;
        let outputs = columns
            .iter()
            .map(|c| OutputColumn {
                key: Some(c.name().to_string()),
                converter: Some(Arc::clone(c.converter())),
            })
            .collect();

        debug!(sql = %bound.sql(), params = bound.params().len(), "Executing query");
        let raw = self
            .conn
            .query(bound.sql(), bound.params())
            .map_err(Error::into_access)?;
        let row = RowCursor::new(raw, outputs).first()?;
        Ok(row.map(|row| LinkedRow::new(Arc::clone(&meta), row)))
    }

    fn run(&mut self, bound: &BoundStatement) -> Result<u64> {
        debug!(sql = %bound.sql(), params = bound.params().len(), "Executing statement");
        self.conn
            .execute(bound.sql(), bound.params())
            .map_err(Error::into_access)
    }

    fn fetch_revision(&mut self, revision: &Column, conditions: &[(&Column, &Value)]) -> Result<Value> {
        let names: Vec<&str> = conditions.iter().map(|(c, _)| c.name()).collect();
        let bound = bind(
            sql::select_where(&self.meta, &[revision.name()], &names),
            StatementKind::Query,
            conditions,
        )?;
        let raw = self
            .conn
            .query(bound.sql(), bound.params())
            .map_err(Error::into_access)?;
        let output = OutputColumn {
            key: Some(revision.name().to_string()),
            converter: Some(Arc::clone(revision.converter())),
        };
        let value = RowCursor::new(raw, vec![output])
            .first()?
            .and_then(|row| row.get(revision.name()).cloned())
            .ok_or_else(|| Error::database(format!("Could not re-read revision of table '{}'", self.meta.name())))?;
        trace!(table = %self.meta.name(), revision = %value, "Refreshed revision");
        Ok(value)
    }
}

/// Conditions to re-read a revision by: the id when the row has one, else
/// the caller's where clause.
fn revision_lookup<'r>(
    pk: Option<&'r Column>,
    values: &'r Row,
    conditions: Vec<(&'r Column, &'r Value)>,
) -> Vec<(&'r Column, &'r Value)> {
    match pk.and_then(|pk| values.get(pk.name()).map(|id| (pk, id))) {
        Some((pk, id)) if !id.is_null() => vec![(pk, id)],
        _ => conditions,
    }
}

fn require_primary_key<'m>(meta: &'m TableMetadata, operation: &str) -> Result<&'m Column> {
    meta.primary_key()
        .ok_or_else(|| Error::database(format!("{}() requires a primary key column.", operation)))
}

/// Bind `(column, value)` pairs in order through each column's converter.
fn bind(sql: String, kind: StatementKind, params: &[(&Column, &Value)]) -> Result<BoundStatement> {
    let mut bound = BoundStatement::new(sql, kind);
    for (position, (column, value)) in params.iter().enumerate() {
        column.converter().set_value(&mut bound, position, value)?;
    }
    Ok(bound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::connection::{BufferedCursor, ColumnDescriptor, CursorColumn, RawCursor, TableName};
    use crate::row;
    use crate::table::metadata::tests::{load_person, CatalogConnection};
    use crate::types::SqlType;

    /// Scripted connection: records statements, answers with queued results.
    struct ScriptedConnection {
        catalog: CatalogConnection,
        executed: Vec<(String, Vec<Value>)>,
        affected: Vec<u64>,
        results: Vec<Vec<Vec<Value>>>,
        generated: Option<Value>,
    }

    impl ScriptedConnection {
        fn new() -> Self {
            Self {
                catalog: CatalogConnection::person(),
                executed: Vec::new(),
                affected: Vec::new(),
                results: Vec::new(),
                generated: None,
            }
        }
    }

    impl Connection for ScriptedConnection {
        fn find_tables(&mut self, schema: Option<&str>, table: &str) -> Result<Vec<TableName>> {
            self.catalog.find_tables(schema, table)
        }

        fn primary_key_columns(&mut self, table: &TableName) -> Result<Vec<String>> {
            self.catalog.primary_key_columns(table)
        }

        fn columns(&mut self, table: &TableName) -> Result<Vec<ColumnDescriptor>> {
            self.catalog.columns(table)
        }

        fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64> {
            self.executed.push((sql.to_string(), params.to_vec()));
            Ok(if self.affected.is_empty() { 1 } else { self.affected.remove(0) })
        }

        fn generated_key(&mut self) -> Result<Option<Value>> {
            Ok(self.generated.take())
        }

        fn query<'c>(&'c mut self, sql: &str, params: &[Value]) -> Result<Box<dyn RawCursor + 'c>> {
            self.executed.push((sql.to_string(), params.to_vec()));
            let rows = if self.results.is_empty() { Vec::new() } else { self.results.remove(0) };
            let width = rows.first().map_or(0, Vec::len);
            let columns = (0..width)
                .map(|i| CursorColumn::new(format!("c{}", i), Some(SqlType::Integer)))
                .collect();
            Ok(Box::new(BufferedCursor::new(columns, rows)))
        }
    }

    fn person(config: &Config) -> Arc<TableMetadata> {
        Arc::new(load_person(config))
    }

    #[test]
    fn test_insert_writes_back_generated_key() {
        let mut conn = ScriptedConnection::new();
        conn.generated = Some(Value::Integer(42));
        let meta = person(&Config::default());
        let mut row = row! { "id" => Value::Null, "first_name" => "Ann" };

        let id = Table::new(meta, &mut conn).insert(&mut row).unwrap();
        assert_eq!(id, Some(Value::Integer(42)));
        assert_eq!(row.get_long("id").unwrap(), 42);
        assert_eq!(
            conn.executed[0],
            (
                r#"INSERT INTO "main"."person" ("first_name") VALUES (?)"#.to_string(),
                vec![Value::Text("Ann".into())]
            )
        );
    }

    #[test]
    fn test_insert_reads_revision() {
        let mut conn = ScriptedConnection::new();
        conn.generated = Some(Value::Integer(1));
        conn.results.push(vec![vec![Value::Integer(0)]]);
        let meta = person(&Config::new().with_revision_support("person"));
        let mut row = row! { "first_name" => "Ann" };

        Table::new(meta, &mut conn).insert(&mut row).unwrap();
        assert_eq!(row.get_long("revision").unwrap(), 0);
        assert_eq!(
            conn.executed[1].0,
            r#"SELECT "revision" FROM "main"."person" WHERE "id" = ?"#
        );
    }

    #[test]
    fn test_insert_rejects_unknown_column_and_bad_count() {
        let mut conn = ScriptedConnection::new();
        let meta = person(&Config::default());
        let err = Table::new(Arc::clone(&meta), &mut conn)
            .insert(&mut row! { "nickname" => "A" })
            .unwrap_err();
        assert!(matches!(err, Error::Insert { source: Some(_), .. }));

        conn.affected.push(0);
        let err = Table::new(meta, &mut conn)
            .insert(&mut row! { "id" => 1 })
            .unwrap_err();
        assert!(err
            .to_string()
            .contains("0 rows were affected by insert operation. Expected: 1"));
    }

    #[test]
    fn test_update_with_revision() {
        let mut conn = ScriptedConnection::new();
        conn.results.push(vec![vec![Value::Integer(4)]]);
        let meta = person(&Config::new().with_revision_support("person"));
        let mut row = row! { "id" => 7, "first_name" => "Bo", "revision" => 3 };

        Table::new(meta, &mut conn).update(&mut row).unwrap();
        assert_eq!(
            conn.executed[0],
            (
                r#"UPDATE "main"."person" SET "first_name" = ?, "revision" = "revision" + 1 WHERE "id" = ? AND "revision" = ?"#
                    .to_string(),
                vec![Value::Text("Bo".into()), Value::Integer(7), Value::Integer(3)]
            )
        );
        assert_eq!(row.get_long("revision").unwrap(), 4);
    }

    #[test]
    fn test_update_failures() {
        let mut conn = ScriptedConnection::new();
        let meta = person(&Config::new().with_revision_support("person"));

        let err = Table::new(Arc::clone(&meta), &mut conn)
            .update(&mut row! { "first_name" => "Bo" })
            .unwrap_err();
        assert!(matches!(err, Error::Update { .. }));

        let err = Table::new(Arc::clone(&meta), &mut conn)
            .update(&mut row! { "id" => 7, "first_name" => "Bo" })
            .unwrap_err();
        assert!(err.to_string().contains("Row must contain a revision."));

        conn.affected.push(0);
        let err = Table::new(Arc::clone(&meta), &mut conn)
            .update(&mut row! { "id" => 7, "first_name" => "Bo", "revision" => 1 })
            .unwrap_err();
        assert!(err.to_string().contains("0 rows were affected by update operation"));

        let err = Table::new(meta, &mut conn)
            .update_where(&mut row! { "first_name" => "Bo" }, &Row::new())
            .unwrap_err();
        assert!(matches!(err, Error::Update { .. }));
    }

    #[test]
    fn test_update_with_nothing_to_set_is_a_no_op() {
        let mut conn = ScriptedConnection::new();
        let meta = person(&Config::new().with_ignore_on_update("person", "first_name"));
        Table::new(meta, &mut conn)
            .update(&mut row! { "id" => 1, "first_name" => "Bo" })
            .unwrap();
        assert!(conn.executed.is_empty());

        // With revision support the stored revision is still read back
        conn.results.push(vec![vec![Value::Integer(6)]]);
        let meta = person(&Config::new().with_revision_support("person"));
        let mut row = row! { "id" => 1 };
        Table::new(meta, &mut conn).update(&mut row).unwrap();
        assert_eq!(conn.executed.len(), 1);
        assert!(conn.executed[0].0.starts_with(r#"SELECT "revision""#));
        assert_eq!(row.get_long("revision").unwrap(), 6);
    }

    #[test]
    fn test_revision_key_matches_exactly() {
        let mut conn = ScriptedConnection::new();
        let meta = person(&Config::new().with_revision_support("person"));
        let err = Table::new(meta, &mut conn)
            .update(&mut row! { "id" => 1, "REVISION" => 2 })
            .unwrap_err();
        assert!(matches!(err, Error::Update { source: Some(_), .. }));
        assert!(conn.executed.is_empty());
    }

    #[test]
    fn test_save_probes_existence() {
        let mut conn = ScriptedConnection::new();
        conn.results.push(vec![vec![Value::Integer(0)]]);
        let meta = person(&Config::default());
        let mut row = row! { "id" => 5, "first_name" => "Cy" };
        Table::new(Arc::clone(&meta), &mut conn).save(&mut row).unwrap();
        assert!(conn.executed[1].0.starts_with("INSERT"));

        conn.executed.clear();
        conn.results.push(vec![vec![Value::Integer(1)]]);
        Table::new(meta, &mut conn).save(&mut row).unwrap();
        assert!(conn.executed[1].0.starts_with("UPDATE"));
    }

    #[test]
    fn test_delete() {
        let mut conn = ScriptedConnection::new();
        let meta = person(&Config::new().with_revision_support("person"));

        let err = Table::new(Arc::clone(&meta), &mut conn).delete_by_id(1).unwrap_err();
        assert!(matches!(err, Error::InvalidState { .. }));

        let err = Table::new(Arc::clone(&meta), &mut conn)
            .delete(&row! { "id" => 1 })
            .unwrap_err();
        assert!(matches!(err, Error::InvalidState { .. }));

        Table::new(Arc::clone(&meta), &mut conn)
            .delete(&row! { "id" => 1, "revision" => 2 })
            .unwrap();
        assert_eq!(conn.executed[0].1, vec![Value::Integer(1), Value::Integer(2)]);

        conn.affected.push(0);
        let err = Table::new(meta, &mut conn)
            .delete(&row! { "id" => 1, "revision" => 2 })
            .unwrap_err();
        assert!(matches!(err, Error::Delete { .. }));
    }

    #[test]
    fn test_load() {
        let mut conn = ScriptedConnection::new();
        conn.results.push(vec![vec![
            Value::Integer(3),
            Value::Text("Di".into()),
            Value::Integer(0),
        ]]);
        let meta = person(&Config::default());
        let loaded = Table::new(Arc::clone(&meta), &mut conn).load(3).unwrap().unwrap();
        assert_eq!(loaded.id(), Some(&Value::Integer(3)));
        assert_eq!(loaded.get_string("first_name").unwrap(), "Di");

        assert!(Table::new(meta, &mut conn).load(4).unwrap().is_none());
    }
}
