//! Identifier normalization and display names.
//!
//! A SQL identifier is kept in two forms: the canonical row key (the
//! identifier as the database reports it, after case folding of unquoted
//! names) and a display name in host naming style (camelCase by default).
//! The display name is always derived from the key, never stored instead of it.

/// Case folding applied to unquoted identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FoldCase {
    /// Fold to lower case (PostgreSQL, SQLite convention).
    #[default]
    Lower,
    /// Fold to upper case (Oracle, H2 convention).
    Upper,
    /// Keep identifiers as written.
    Preserve,
}

/// How display names are derived from row keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayStyle {
    /// `first_name` -> `firstName`, `person1.id` -> `person1Id`.
    #[default]
    CamelCase,
    /// Display names equal the keys.
    Verbatim,
}

/// A SQL identifier as written in statement text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifier {
    /// Identifier text without surrounding quotes.
    pub text: String,
    /// Whether it was written in double quotes.
    pub quoted: bool,
}

impl Identifier {
    /// Unquoted identifier.
    pub fn bare(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            quoted: false,
        }
    }

    /// Quoted identifier.
    pub fn quoted(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            quoted: true,
        }
    }
}

/// Naming convention translating SQL identifiers to host names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NamingConvention {
    pub fold: FoldCase,
    pub display: DisplayStyle,
}

impl NamingConvention {
    pub fn new(fold: FoldCase, display: DisplayStyle) -> Self {
        Self { fold, display }
    }

    /// Canonical key for an identifier: quoted text verbatim, unquoted text folded.
    pub fn key(&self, ident: &Identifier) -> String {
        if ident.quoted {
            return ident.text.clone();
        }
        match self.fold {
            FoldCase::Lower => ident.text.to_lowercase(),
            FoldCase::Upper => ident.text.to_uppercase(),
            FoldCase::Preserve => ident.text.clone(),
        }
    }

    /// Display name for an identifier. Quoted identifiers are never re-cased.
    pub fn display_name(&self, ident: &Identifier) -> String {
        let key = self.key(ident);
        if ident.quoted {
            key
        } else {
            self.display_key(&key)
        }
    }

    /// Display name for an already canonical key.
    pub fn display_key(&self, key: &str) -> String {
        match self.display {
            DisplayStyle::CamelCase => to_camel_case(key),
            DisplayStyle::Verbatim => key.to_string(),
        }
    }
}

/// Convert a separated identifier to camelCase.
///
/// Separators are `_`, `.`, `-` and spaces. The first segment keeps its case,
/// later segments get an upper-case first letter. Identifiers without
/// separators are returned unchanged.
pub fn to_camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = false;
    for c in name.chars() {
        if matches!(c, '_' | '.' | '-' | ' ') {
            upper_next = !out.is_empty();
            continue;
        }
        if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Quote an identifier for use in generated SQL.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camel_case() {
        assert_eq!(to_camel_case("first_name"), "firstName");
        assert_eq!(to_camel_case("person1.id"), "person1Id");
        assert_eq!(to_camel_case("theId"), "theId");
        assert_eq!(to_camel_case("a__b"), "aB");
        assert_eq!(to_camel_case("_leading"), "leading");
    }

    #[test]
    fn test_key_folds_unquoted_only() {
        let naming = NamingConvention::default();
        assert_eq!(naming.key(&Identifier::bare("theId")), "theid");
        assert_eq!(naming.key(&Identifier::quoted("theId")), "theId");

        let upper = NamingConvention::new(FoldCase::Upper, DisplayStyle::CamelCase);
        assert_eq!(upper.key(&Identifier::bare("name")), "NAME");
    }

    #[test]
    fn test_display_name_keeps_quoted_underscores() {
        let naming = NamingConvention::default();
        assert_eq!(naming.display_name(&Identifier::quoted("a_field")), "a_field");
        assert_eq!(naming.display_name(&Identifier::bare("a_field")), "aField");
        assert_eq!(naming.display_name(&Identifier::bare("person1.id")), "person1Id");
    }

    #[test]
    fn test_verbatim_display() {
        let naming = NamingConvention::new(FoldCase::Preserve, DisplayStyle::Verbatim);
        assert_eq!(naming.display_name(&Identifier::bare("first_name")), "first_name");
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("name"), "\"name\"");
        assert_eq!(quote_identifier("we\"ird"), "\"we\"\"ird\"");
    }
}
