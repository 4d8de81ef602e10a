//! Directive parser.
//!
//! SQL bodies stay opaque; only these comment directives are interpreted:
//!
//! * `/*=*/ literal /**/` - bind parameter named after the column on the left
//!   of the nearest comparison, typed from the literal when unambiguous
//! * `/*name=*/`, `/*=:kind*/`, `/*name=:kind*/` - explicit name and/or type
//! * `column /*:kind*/` - typed result column
//!
//! Everything between a parameter directive and its closing `/**/` is
//! replaced by a single `?`.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use std::str::FromStr;

use super::lexer::{snippet, tokenize, unquote, Token, TokenKind};
use super::template::{
    Parameter, ParameterConverters, ResultColumn, StatementKind, StatementTemplate,
};
use crate::error::{Error, Result};
use crate::naming::{Identifier, NamingConvention};
use crate::types::{HostKind, Value};

const COMPARISON_OPS: [&str; 7] = ["=", "<>", "!=", "<", "<=", ">", ">="];
const COMPARISON_WORDS: [&str; 3] = ["LIKE", "ILIKE", "IN"];
const SELECT_LIST_STARTS: [&str; 3] = ["SELECT", "DISTINCT", "ALL"];
const QUERY_STARTS: [&str; 3] = ["SELECT", "WITH", "VALUES"];
const TABLE_KEYWORDS: [&str; 3] = ["FROM", "UPDATE", "INTO"];

enum Directive {
    Parameter {
        name: Option<Vec<Identifier>>,
        kind: Option<HostKind>,
    },
    ResultType(HostKind),
    None,
}

struct OpenParameter {
    chain: Vec<Identifier>,
    kind: Option<HostKind>,
    /// Index of the first token after the opening directive.
    first: usize,
    /// Byte offset of the opening directive.
    start: usize,
}

pub(crate) struct Parser {
    naming: NamingConvention,
}

impl Parser {
    pub fn new(naming: NamingConvention) -> Self {
        Self { naming }
    }

    pub fn parse(&self, sql: &str) -> Result<StatementTemplate> {
        let tokens = tokenize(sql)?;

        let Some(term) = tokens.iter().position(|t| t.is_punct(";")) else {
            let trimmed = sql.trim_end();
            let tail_start = trimmed
                .char_indices()
                .rev()
                .nth(39)
                .map_or(0, |(i, _)| i);
            return Err(Error::malformed(
                "statement has no terminating ';'",
                snippet(trimmed, tail_start),
            ));
        };
        if let Some(extra) = tokens[term + 1..].iter().find(|t| !t.is_trivia()) {
            return Err(Error::malformed(
                "unexpected text after ';'",
                snippet(sql, extra.start),
            ));
        }
        let body = &tokens[..term];

        let mut out = String::with_capacity(sql.len());
        let mut placeholders = Vec::new();
        let mut parameters: Vec<Parameter> = Vec::new();
        let mut result_columns = Vec::new();
        let mut open: Option<OpenParameter> = None;

        for (i, tok) in body.iter().enumerate() {
            if let Some(param) = &open {
                match tok.comment_body() {
                    Some("") => {
                        let (inferred, default) = infer_literal(&body[param.first..i]);
                        let kind = param.kind.or(inferred);
                        let key = self.chain_key(&param.chain);
                        merge_parameter(
                            &mut parameters,
                            Parameter {
                                key: key.clone(),
                                display_name: self.chain_display(&param.chain),
                                host_kind: kind,
                                default,
                            },
                            snippet(sql, param.start),
                        )?;
                        placeholders.push(key);
                        open = None;
                    }
                    Some(_) if matches!(classify(tok)?, Directive::Parameter { .. }) => {
                        return Err(unclosed(sql, param.start));
                    }
                    _ => {}
                }
                continue;
            }

            match classify(tok)? {
                Directive::Parameter { name, kind } => {
                    let chain = match name {
                        Some(chain) => chain,
                        None => infer_parameter_name(&body[..i]).ok_or_else(|| {
                            Error::malformed(
                                "cannot infer parameter name; use /*name=*/",
                                snippet(sql, tok.start),
                            )
                        })?,
                    };
                    out.push('?');
                    open = Some(OpenParameter {
                        chain,
                        kind,
                        first: i + 1,
                        start: tok.start,
                    });
                }
                Directive::ResultType(kind) => {
                    let column = self
                        .result_column(&body[..i], kind)
                        .ok_or_else(|| {
                            Error::malformed(
                                "type annotation must follow a column",
                                snippet(sql, tok.start),
                            )
                        })?;
                    result_columns.push(column);
                }
                Directive::None => out.push_str(tok.text),
            }
        }

        if let Some(param) = open {
            return Err(unclosed(sql, param.start));
        }

        let sql_text = out.trim().to_string();
        Ok(StatementTemplate {
            name: None,
            sql: sql_text,
            placeholders,
            parameters,
            result_columns,
            kind: statement_kind(body),
            primary_table: self.primary_table(body),
            naming: self.naming,
            converters: ParameterConverters::default(),
        })
    }

    fn chain_key(&self, chain: &[Identifier]) -> String {
        chain
            .iter()
            .map(|ident| self.naming.key(ident))
            .collect::<Vec<_>>()
            .join(".")
    }

    fn chain_display(&self, chain: &[Identifier]) -> String {
        match chain {
            [single] => self.naming.display_name(single),
            _ => self.naming.display_key(&self.chain_key(chain)),
        }
    }

    /// Typed result column ending right before token `before.len()`.
    fn result_column(&self, before: &[Token<'_>], host_kind: HostKind) -> Option<ResultColumn> {
        let last = previous_significant(before, before.len())?;
        let (last_chain, first) = chain_ending_at(before, last)?;

        let (source, alias) = match previous_significant(before, first) {
            Some(k) if before[k].is_word("AS") => {
                let source = previous_significant(before, k)
                    .and_then(|s| chain_ending_at(before, s))
                    .map(|(chain, _)| chain);
                (source, last_chain.last().cloned())
            }
            Some(k) if is_implicit_alias_anchor(&before[k]) => {
                let source = if is_identifier(&before[k]) {
                    chain_ending_at(before, k).map(|(chain, _)| chain)
                } else {
                    None
                };
                (source, last_chain.last().cloned())
            }
            _ => (Some(last_chain), None),
        };

        let key = match (&source, &alias) {
            (Some(chain), _) => self.chain_key(chain),
            (None, Some(alias)) => self.naming.key(alias),
            (None, None) => return None,
        };
        let label = match (&alias, &source) {
            (Some(alias), _) => self.naming.key(alias),
            (None, Some(chain)) => self.naming.key(chain.last()?),
            (None, None) => return None,
        };
        let display_name = match (&alias, &source) {
            (Some(alias), _) => self.naming.display_name(alias),
            (None, Some(chain)) => self.chain_display(chain),
            (None, None) => return None,
        };
        Some(ResultColumn {
            key,
            label,
            display_name,
            host_kind,
        })
    }

    fn primary_table(&self, body: &[Token<'_>]) -> Option<String> {
        for (i, tok) in body.iter().enumerate() {
            if !TABLE_KEYWORDS.iter().any(|k| tok.is_word(k)) {
                continue;
            }
            let Some(next) = (i + 1..body.len()).find(|&j| !body[j].is_trivia()) else {
                continue;
            };
            if let Some(chain) = chain_starting_at(body, next) {
                return Some(self.chain_key(&chain));
            }
        }
        None
    }
}

fn unclosed(sql: &str, start: usize) -> Error {
    Error::malformed(
        "parameter directive is never closed; add /**/ after the value",
        snippet(sql, start),
    )
}

fn classify(tok: &Token<'_>) -> Result<Directive> {
    let Some(body) = tok.comment_body() else {
        return Ok(Directive::None);
    };
    if let Some(kind) = body.strip_prefix(':') {
        return parse_kind(kind, tok).map(Directive::ResultType);
    }
    let Some((left, right)) = body.split_once('=') else {
        return Ok(Directive::None);
    };
    let (left, right) = (left.trim(), right.trim());
    let name = if left.is_empty() {
        None
    } else {
        match parse_name(left) {
            Some(chain) => Some(chain),
            None => return Ok(Directive::None),
        }
    };
    let kind = if right.is_empty() {
        None
    } else if let Some(kind) = right.strip_prefix(':') {
        Some(parse_kind(kind, tok)?)
    } else {
        return Ok(Directive::None);
    };
    Ok(Directive::Parameter { name, kind })
}

fn parse_kind(text: &str, tok: &Token<'_>) -> Result<HostKind> {
    HostKind::from_name(text).ok_or_else(|| {
        Error::malformed(format!("unknown type '{}'", text.trim()), tok.text)
    })
}

/// Explicit parameter name: dot-separated, optionally quoted segments.
fn parse_name(text: &str) -> Option<Vec<Identifier>> {
    text.split('.')
        .map(|segment| {
            if segment.len() >= 2 && segment.starts_with('"') && segment.ends_with('"') {
                Some(Identifier::quoted(unquote(segment, '"')))
            } else if !segment.is_empty()
                && segment
                    .chars()
                    .all(|c| c.is_alphanumeric() || c == '_' || c == '$')
            {
                Some(Identifier::bare(segment))
            } else {
                None
            }
        })
        .collect()
}

fn previous_significant(tokens: &[Token<'_>], before: usize) -> Option<usize> {
    (0..before).rev().find(|&j| !tokens[j].is_trivia())
}

fn is_identifier(tok: &Token<'_>) -> bool {
    matches!(tok.kind, TokenKind::Word | TokenKind::QuotedIdent)
}

fn to_identifier(tok: &Token<'_>) -> Identifier {
    match tok.kind {
        TokenKind::QuotedIdent => Identifier::quoted(tok.identifier_text()),
        _ => Identifier::bare(tok.text),
    }
}

/// Token before a trailing identifier that makes that identifier an alias.
fn is_implicit_alias_anchor(tok: &Token<'_>) -> bool {
    if SELECT_LIST_STARTS.iter().any(|w| tok.is_word(w)) {
        return false;
    }
    is_identifier(tok)
        || tok.is_punct(")")
        || matches!(tok.kind, TokenKind::StringLit | TokenKind::Number)
}

/// Identifier chain (`a.b."c"`) whose last token is at `end`.
/// Returns the chain and the index of its first token.
fn chain_ending_at(tokens: &[Token<'_>], end: usize) -> Option<(Vec<Identifier>, usize)> {
    if !is_identifier(&tokens[end]) {
        return None;
    }
    let mut chain = vec![to_identifier(&tokens[end])];
    let mut first = end;
    while first >= 2 && tokens[first - 1].is_punct(".") && is_identifier(&tokens[first - 2]) {
        chain.insert(0, to_identifier(&tokens[first - 2]));
        first -= 2;
    }
    Some((chain, first))
}

/// Identifier chain starting at `start`.
fn chain_starting_at(tokens: &[Token<'_>], start: usize) -> Option<Vec<Identifier>> {
    if !is_identifier(&tokens[start]) {
        return None;
    }
    let mut chain = vec![to_identifier(&tokens[start])];
    let mut next = start + 1;
    while next + 1 < tokens.len() && tokens[next].is_punct(".") && is_identifier(&tokens[next + 1])
    {
        chain.push(to_identifier(&tokens[next + 1]));
        next += 2;
    }
    Some(chain)
}

/// Column on the left of the comparison preceding a parameter directive.
fn infer_parameter_name(before: &[Token<'_>]) -> Option<Vec<Identifier>> {
    let mut j = previous_significant(before, before.len())?;
    while before[j].is_punct("(") {
        j = previous_significant(before, j)?;
    }
    let op = &before[j];
    let is_comparison = COMPARISON_OPS.iter().any(|p| op.is_punct(p))
        || COMPARISON_WORDS.iter().any(|w| op.is_word(w));
    if !is_comparison {
        return None;
    }
    j = previous_significant(before, j)?;
    if before[j].is_word("NOT") {
        j = previous_significant(before, j)?;
    }
    chain_ending_at(before, j).map(|(chain, _)| chain)
}

/// Host kind and default value of the literal a parameter directive replaces.
///
/// Only string, boolean and typed date/time literals determine a type.
/// Numbers and NULL are ambiguous and leave it unresolved.
fn infer_literal(tokens: &[Token<'_>]) -> (Option<HostKind>, Option<Value>) {
    let significant: Vec<&Token<'_>> = tokens.iter().filter(|t| !t.is_trivia()).collect();
    match significant.as_slice() {
        [lit] if lit.kind == TokenKind::StringLit => (
            Some(HostKind::String),
            Some(Value::Text(unquote(lit.text, '\''))),
        ),
        [lit] if lit.is_word("TRUE") => (Some(HostKind::Bool), Some(Value::Bool(true))),
        [lit] if lit.is_word("FALSE") => (Some(HostKind::Bool), Some(Value::Bool(false))),
        [lit] if lit.is_word("NULL") => (None, Some(Value::Null)),
        [lit] if lit.kind == TokenKind::Number => (None, parse_number(lit.text, false)),
        [sign, lit] if sign.is_punct("-") && lit.kind == TokenKind::Number => {
            (None, parse_number(lit.text, true))
        }
        [kw, lit] if lit.kind == TokenKind::StringLit => {
            let text = unquote(lit.text, '\'');
            if kw.is_word("DATE") {
                let value = NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d").ok();
                (Some(HostKind::Date), value.map(Value::Date))
            } else if kw.is_word("TIMESTAMP") {
                let value = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
                    .iter()
                    .find_map(|fmt| NaiveDateTime::parse_from_str(text.trim(), fmt).ok());
                (Some(HostKind::Timestamp), value.map(Value::Timestamp))
            } else if kw.is_word("TIME") {
                let value = NaiveTime::parse_from_str(text.trim(), "%H:%M:%S%.f").ok();
                (Some(HostKind::Time), value.map(Value::Time))
            } else {
                (None, None)
            }
        }
        _ => (None, None),
    }
}

fn parse_number(text: &str, negative: bool) -> Option<Value> {
    let text = if negative {
        format!("-{}", text)
    } else {
        text.to_string()
    };
    if let Ok(v) = text.parse::<i64>() {
        return Some(Value::Integer(v));
    }
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
        .map(Value::Decimal)
}

fn merge_parameter(parameters: &mut Vec<Parameter>, param: Parameter, at: String) -> Result<()> {
    let Some(existing) = parameters.iter_mut().find(|p| p.key == param.key) else {
        parameters.push(param);
        return Ok(());
    };
    match (existing.host_kind, param.host_kind) {
        (Some(a), Some(b)) if !(a.accepts(b) && b.accepts(a)) => Err(Error::malformed(
            format!("parameter '{}' is used as both {} and {}", param.key, a, b),
            at,
        )),
        (None, Some(b)) => {
            existing.host_kind = Some(b);
            Ok(())
        }
        _ => Ok(()),
    }
}

fn statement_kind(body: &[Token<'_>]) -> StatementKind {
    match body.iter().find(|t| !t.is_trivia()) {
        Some(first) if QUERY_STARTS.iter().any(|w| first.is_word(w)) => StatementKind::Query,
        _ => StatementKind::Command,
    }
}
