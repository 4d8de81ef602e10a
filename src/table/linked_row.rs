//! Rows bound to the table they were loaded from.

use std::collections::BTreeMap;
use std::ops::Deref;
use std::sync::Arc;

use super::metadata::TableMetadata;
use crate::row::Row;
use crate::types::Value;
use crate::validation::ValidationError;

/// A row that validates every write against its table.
#[derive(Debug, Clone)]
pub struct LinkedRow {
    table: Arc<TableMetadata>,
    row: Row,
}

impl LinkedRow {
    pub fn new(table: Arc<TableMetadata>, row: Row) -> Self {
        Self { table, row }
    }

    pub fn table(&self) -> &TableMetadata {
        &self.table
    }

    /// Set a value. An invalid value is rejected and the row left unchanged.
    pub fn put(&mut self, key: &str, value: impl Into<Value>) -> Result<(), ValidationError> {
        let value = value.into();
        if let Some(err) = self.table.validate_value(key, &value) {
            return Err(err);
        }
        self.row.insert(key, value);
        Ok(())
    }

    /// Primary-key value, if the table has a key and the row holds it.
    pub fn id(&self) -> Option<&Value> {
        self.table
            .primary_key_name()
            .and_then(|pk| self.row.get(pk))
    }

    pub fn revision(&self) -> Option<&Value> {
        self.table
            .revision_column()
            .and_then(|c| self.row.get(c.name()))
    }

    pub fn validate(&self) -> BTreeMap<String, ValidationError> {
        self.table.validate(&self.row)
    }

    pub fn as_row(&self) -> &Row {
        &self.row
    }

    pub fn into_row(self) -> Row {
        self.row
    }
}

impl Deref for LinkedRow {
    type Target = Row;

    fn deref(&self) -> &Row {
        &self.row
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::row;
    use crate::table::metadata::tests::load_person;

    #[test]
    fn test_put_validates() {
        let meta = Arc::new(load_person(&Config::new().with_revision_support("person")));
        let mut linked = LinkedRow::new(meta, row! { "id" => 7, "revision" => 0 });
        assert_eq!(linked.id(), Some(&Value::Integer(7)));
        assert_eq!(linked.revision(), Some(&Value::Integer(0)));

        linked.put("first_name", "Ann").unwrap();
        assert_eq!(linked.get_string("first_name").unwrap(), "Ann");

        let err = linked.put("first_name", "Annabel").unwrap_err();
        assert!(matches!(err, ValidationError::StringTooLong { .. }));
        assert_eq!(linked.get_string("first_name").unwrap(), "Ann");

        assert!(matches!(
            linked.put("nickname", "A"),
            Err(ValidationError::Key { .. })
        ));
        assert!(linked.validate().is_empty());
        assert_eq!(linked.into_row().len(), 3);
    }
}
