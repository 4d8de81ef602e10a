//! Grouping of joined query rows into parent/child trees.
//!
//! A query joining `person` and `address` returns one flat row per address.
//! Given the root id column and a marker column per joined level, each flat
//! row is split at the markers (in column order) and the pieces are nested:
//!
//! ```text
//! id | name    | address_id | city        person 1
//! 1  | person1 | 1          | city1   =>    address_ids: [1 city1, 2 city2]
//! 1  | person1 | 2          | city2
//! ```
//!
//! Joined rows are stored under `<marker>s` (`address_ids`), or under an
//! explicit name given as `"address_id as addresses"`.

use crate::cursor::RowCursor;
use crate::error::{Error, Result};
use crate::row::Row;
use crate::types::Value;

/// A row with the rows joined to it.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeRow {
    pub row: Row,
    joined: Vec<(String, Vec<TreeRow>)>,
}

impl TreeRow {
    fn new(row: Row) -> Self {
        Self {
            row,
            joined: Vec::new(),
        }
    }

    /// Rows joined under `key`. Empty when there are none.
    pub fn joined(&self, key: &str) -> &[TreeRow] {
        self.joined
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, rows)| rows.as_slice())
            .unwrap_or(&[])
    }

    pub fn joined_keys(&self) -> impl Iterator<Item = &str> {
        self.joined.iter().map(|(k, _)| k.as_str())
    }

    /// Child under `key` with `id_column == id`, created from `row` if absent.
    fn child(&mut self, key: &str, id_column: &str, id: &Value, row: Row) -> &mut TreeRow {
        let idx = match self.joined.iter().position(|(k, _)| k == key) {
            Some(idx) => idx,
            None => {
                self.joined.push((key.to_string(), Vec::new()));
                self.joined.len() - 1
            }
        };
        let children = &mut self.joined[idx].1;
        let pos = match children.iter().position(|c| c.row.get(id_column) == Some(id)) {
            Some(pos) => pos,
            None => {
                children.push(TreeRow::new(row));
                children.len() - 1
            }
        };
        &mut children[pos]
    }
}

/// One joined level: the marker column and the key children are stored under.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Marker {
    column: String,
    key: String,
}

impl Marker {
    fn parse(spec: &str) -> Self {
        let words: Vec<&str> = spec.split_whitespace().collect();
        match words.as_slice() {
            [column, as_kw, alias] if as_kw.eq_ignore_ascii_case("as") => Self {
                column: column.to_string(),
                key: alias.to_string(),
            },
            _ => {
                let column = spec.trim().to_string();
                Self {
                    key: format!("{}s", column),
                    column,
                }
            }
        }
    }
}

/// Nest flat joined rows below their root rows.
///
/// Root rows are grouped by `id_column`, children by their marker column.
/// A null marker value means the row has no child on that level.
pub fn rows_to_tree<I>(rows: I, id_column: &str, markers: &[&str]) -> Result<Vec<TreeRow>>
where
    I: IntoIterator<Item = Result<Row>>,
{
    let markers: Vec<Marker> = markers.iter().map(|m| Marker::parse(m)).collect();
    let mut roots: Vec<TreeRow> = Vec::new();

    for row in rows {
        let row = row?;
        for marker in &markers {
            if !row.contains_key(&marker.column) {
                return Err(Error::invalid_state(format!(
                    "Marker column '{}' is not part of the result",
                    marker.column
                )));
            }
        }
        let mut segments = split(row, &markers);
        let root_row = std::mem::take(&mut segments[0]);
        let id = root_row
            .get(id_column)
            .cloned()
            .ok_or_else(|| Error::invalid_state(format!("Id column '{}' is not part of the result", id_column)))?;

        let root_idx = match roots.iter().position(|r| r.row.get(id_column) == Some(&id)) {
            Some(idx) => idx,
            None => {
                roots.push(TreeRow::new(root_row));
                roots.len() - 1
            }
        };

        let mut node = &mut roots[root_idx];
        for (marker, segment) in markers.iter().zip(segments.into_iter().skip(1)) {
            let child_id = match segment.get(&marker.column) {
                Some(v) if !v.is_null() => v.clone(),
                _ => break,
            };
            node = node.child(&marker.key, &marker.column, &child_id, segment);
        }
    }
    Ok(roots)
}

/// Split a row at the marker columns. Segment 0 holds the root columns.
fn split(row: Row, markers: &[Marker]) -> Vec<Row> {
    let mut segments = vec![Row::new(); markers.len() + 1];
    let mut current = 0;
    for (key, value) in row {
        if let Some(level) = markers.iter().position(|m| m.column == key) {
            current = level + 1;
        }
        segments[current].insert(key, value);
    }
    segments
}

impl RowCursor<'_> {
    /// Read all rows and nest them; see [`rows_to_tree`].
    pub fn into_tree(self, id_column: &str, markers: &[&str]) -> Result<Vec<TreeRow>> {
        rows_to_tree(self, id_column, markers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row;

    fn person_addresses() -> Vec<Result<Row>> {
        let data = [
            (1, "person1", 1, "city1"),
            (1, "person1", 2, "city2"),
            (2, "person2", 3, "city3"),
            (2, "person2", 4, "city4"),
        ];
        data.iter()
            .map(|&(id, name, address_id, city)| {
                Ok(row! {
                    "id" => id,
                    "name" => name,
                    "address_id" => address_id,
                    "person_id" => id,
                    "city" => city,
                })
            })
            .collect()
    }

    #[test]
    fn test_splits_columns_by_marker() {
        let persons = rows_to_tree(person_addresses(), "id", &["address_id"]).unwrap();
        assert_eq!(persons.len(), 2);
        for person in &persons {
            assert!(person.row.contains_key("id"));
            assert!(person.row.contains_key("name"));
            assert!(!person.row.contains_key("address_id"));
            assert!(!person.row.contains_key("city"));

            let addresses = person.joined("address_ids");
            assert_eq!(addresses.len(), 2);
            for address in addresses {
                assert!(address.row.contains_key("address_id"));
                assert!(address.row.contains_key("person_id"));
                assert!(address.row.contains_key("city"));
                assert!(!address.row.contains_key("name"));
            }
        }
    }

    #[test]
    fn test_alias() {
        let persons = rows_to_tree(person_addresses(), "id", &["address_id as addresses"]).unwrap();
        let ids: Vec<i32> = persons
            .iter()
            .flat_map(|p| p.joined("addresses"))
            .map(|a| a.row.get_int("address_id").unwrap())
            .collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
        assert!(persons[0].joined("address_ids").is_empty());
    }

    #[test]
    fn test_null_marker_and_duplicates() {
        let rows = vec![
            Ok(row! { "id" => 1, "address_id" => Value::Null }),
            Ok(row! { "id" => 2, "address_id" => 5 }),
            Ok(row! { "id" => 2, "address_id" => 5 }),
        ];
        let persons = rows_to_tree(rows, "id", &["address_id"]).unwrap();
        assert_eq!(persons.len(), 2);
        assert!(persons[0].joined("address_ids").is_empty());
        assert_eq!(persons[1].joined("address_ids").len(), 1);
    }

    #[test]
    fn test_nested_levels() {
        let rows = vec![
            Ok(row! { "id" => 1, "address_id" => 1, "phone_id" => 10 }),
            Ok(row! { "id" => 1, "address_id" => 1, "phone_id" => 11 }),
            Ok(row! { "id" => 1, "address_id" => 2, "phone_id" => 12 }),
        ];
        let persons = rows_to_tree(rows, "id", &["address_id", "phone_id as phones"]).unwrap();
        let addresses = persons[0].joined("address_ids");
        assert_eq!(addresses.len(), 2);
        assert_eq!(addresses[0].joined("phones").len(), 2);
        assert_eq!(addresses[1].joined("phones").len(), 1);
    }

    #[test]
    fn test_missing_marker() {
        let rows = vec![Ok(row! { "id" => 1 })];
        assert!(rows_to_tree(rows, "id", &["address_id"]).is_err());
    }
}
