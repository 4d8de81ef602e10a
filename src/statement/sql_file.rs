//! Named statements loaded from `.sql` files.
//!
//! A file holds any number of blocks:
//!
//! ```sql
//! -- findPersonByName
//! SELECT * FROM person
//!  WHERE name = /*=*/ 'x' /**/;
//! ```
//!
//! A block starts with a `-- name` line and ends with the first line ending
//! in `;`. Lines outside blocks are ignored.

use std::fs;
use std::path::Path;

use tracing::{debug, info};

use super::parser::Parser;
use super::template::StatementTemplate;
use crate::error::{Error, Result};
use crate::naming::NamingConvention;

/// Parsed statements of one SQL file, in file order.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlFile {
    name: String,
    statements: Vec<StatementTemplate>,
}

impl SqlFile {
    /// Read and parse a file. The file stem becomes the file name.
    pub fn load(path: impl AsRef<Path>, naming: NamingConvention) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Reading SQL file");
        let content = fs::read_to_string(path)?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::parse(name, &content, naming)
    }

    /// Parse SQL file content.
    pub fn parse(name: impl Into<String>, content: &str, naming: NamingConvention) -> Result<Self> {
        let name = name.into();
        let parser = Parser::new(naming);
        let mut statements: Vec<StatementTemplate> = Vec::new();

        for (stmt_name, text) in split_blocks(content)? {
            if statements.iter().any(|s| s.name() == Some(stmt_name.as_str())) {
                return Err(Error::malformed(
                    format!("duplicate statement name '{}' in {}", stmt_name, name),
                    format!("-- {}", stmt_name),
                ));
            }
            let template = parser.parse(&text)?.with_name(stmt_name.clone());
            debug!(
                file = %name,
                statement = %stmt_name,
                parameters = template.parameter_list().len(),
                "Found SQL statement"
            );
            statements.push(template);
        }

        Ok(Self { name, statements })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, name: &str) -> Option<&StatementTemplate> {
        self.statements.iter().find(|s| s.name() == Some(name))
    }

    /// Statement by name, failing when absent.
    pub fn statement(&self, name: &str) -> Result<&StatementTemplate> {
        self.get(name).ok_or_else(|| {
            Error::invalid_state(format!("no statement '{}' in SQL file '{}'", name, self.name))
        })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.statements.iter().filter_map(|s| s.name())
    }

    pub fn iter(&self) -> impl Iterator<Item = &StatementTemplate> {
        self.statements.iter()
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

/// Block name if `line` is a `-- name` header.
fn block_header(line: &str) -> Option<&str> {
    let name = line.trim().strip_prefix("--")?.trim();
    let valid = !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_');
    valid.then_some(name)
}

/// Split content into `(name, sql text)` blocks.
fn split_blocks(content: &str) -> Result<Vec<(String, String)>> {
    let mut blocks = Vec::new();
    let mut current: Option<(String, String)> = None;

    for line in content.lines() {
        match current.as_mut() {
            None => {
                if let Some(name) = block_header(line) {
                    current = Some((name.to_string(), String::new()));
                }
            }
            Some((_, text)) => {
                text.push_str(line);
                text.push('\n');
                if line.trim_end().ends_with(';') {
                    blocks.extend(current.take());
                }
            }
        }
    }

    if let Some((name, _)) = current {
        return Err(Error::malformed(
            format!(
                "Could not find the end of the SQL expression '{}'. Did you add ';' at the end?",
                name
            ),
            format!("-- {}", name),
        ));
    }
    Ok(blocks)
}
