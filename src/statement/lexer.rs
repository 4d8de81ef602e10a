//! SQL tokenizer.
//!
//! Only distinguishes what the directive parser needs: string literals,
//! quoted identifiers and comments must be recognised so that comment-like
//! text inside a literal is never taken for a directive.

use crate::error::{Error, Result};

/// Maximum snippet length in error messages.
const SNIPPET_LEN: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TokenKind {
    Whitespace,
    /// Unquoted identifier or keyword.
    Word,
    /// `"identifier"`
    QuotedIdent,
    /// `'literal'`
    StringLit,
    Number,
    /// `-- ...` up to (not including) the line break.
    LineComment,
    /// `/* ... */`
    BlockComment,
    /// Operator or punctuation, one or two characters.
    Punct,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    /// Byte offset in the source.
    pub start: usize,
}

impl<'a> Token<'a> {
    /// Whitespace and comments.
    pub fn is_trivia(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::Whitespace | TokenKind::LineComment | TokenKind::BlockComment
        )
    }

    pub fn is_punct(&self, p: &str) -> bool {
        self.kind == TokenKind::Punct && self.text == p
    }

    /// Case-insensitive keyword match.
    pub fn is_word(&self, word: &str) -> bool {
        self.kind == TokenKind::Word && self.text.eq_ignore_ascii_case(word)
    }

    /// Identifier text without quotes, unescaped.
    pub fn identifier_text(&self) -> String {
        match self.kind {
            TokenKind::QuotedIdent => unquote(self.text, '"'),
            _ => self.text.to_string(),
        }
    }

    /// Block comment body between `/*` and `*/`.
    pub fn comment_body(&self) -> Option<&'a str> {
        match self.kind {
            TokenKind::BlockComment => Some(&self.text[2..self.text.len() - 2]),
            _ => None,
        }
    }
}

/// Strip surrounding quotes and collapse doubled quote characters.
pub(crate) fn unquote(text: &str, quote: char) -> String {
    let inner = &text[1..text.len() - 1];
    let doubled: String = [quote, quote].iter().collect();
    inner.replace(&doubled, &quote.to_string())
}

/// Up to `SNIPPET_LEN` characters of `sql` starting at byte `start`.
pub(crate) fn snippet(sql: &str, start: usize) -> String {
    sql[start..].chars().take(SNIPPET_LEN).collect()
}

const TWO_CHAR_OPS: [&str; 6] = ["<>", "!=", "<=", ">=", "||", "::"];

/// Split SQL text into tokens. Concatenating all token texts yields the input.
pub(crate) fn tokenize(sql: &str) -> Result<Vec<Token<'_>>> {
    let bytes = sql.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < sql.len() {
        let start = pos;
        let c = sql[pos..].chars().next().unwrap_or(' ');
        let kind = if c.is_whitespace() {
            pos += sql[pos..]
                .find(|ch: char| !ch.is_whitespace())
                .unwrap_or(sql.len() - pos);
            TokenKind::Whitespace
        } else if sql[pos..].starts_with("--") {
            pos += sql[pos..].find('\n').unwrap_or(sql.len() - pos);
            TokenKind::LineComment
        } else if sql[pos..].starts_with("/*") {
            match sql[pos + 2..].find("*/") {
                Some(end) => pos += 2 + end + 2,
                None => {
                    return Err(Error::malformed(
                        "unterminated comment",
                        snippet(sql, start),
                    ))
                }
            }
            TokenKind::BlockComment
        } else if c == '\'' || c == '"' {
            pos = scan_quoted(bytes, pos, c as u8).ok_or_else(|| {
                let what = if c == '\'' { "string literal" } else { "quoted identifier" };
                Error::malformed(format!("unterminated {}", what), snippet(sql, start))
            })?;
            if c == '\'' {
                TokenKind::StringLit
            } else {
                TokenKind::QuotedIdent
            }
        } else if c.is_alphabetic() || c == '_' {
            pos += sql[pos..]
                .find(|ch: char| !(ch.is_alphanumeric() || ch == '_' || ch == '$'))
                .unwrap_or(sql.len() - pos);
            TokenKind::Word
        } else if c.is_ascii_digit() {
            pos = scan_number(bytes, pos);
            TokenKind::Number
        } else {
            let two = sql.get(pos..pos + 2);
            pos += match two {
                Some(op) if TWO_CHAR_OPS.contains(&op) => 2,
                _ => c.len_utf8(),
            };
            TokenKind::Punct
        };
        tokens.push(Token {
            kind,
            text: &sql[start..pos],
            start,
        });
    }

    Ok(tokens)
}

/// End offset of a quoted run starting at `pos`, or `None` if unterminated.
/// A doubled quote character is an escaped quote.
fn scan_quoted(bytes: &[u8], pos: usize, quote: u8) -> Option<usize> {
    let mut i = pos + 1;
    while i < bytes.len() {
        if bytes[i] == quote {
            if bytes.get(i + 1) == Some(&quote) {
                i += 2;
                continue;
            }
            return Some(i + 1);
        }
        i += 1;
    }
    None
}

fn scan_number(bytes: &[u8], pos: usize) -> usize {
    let mut i = pos;
    let mut seen_dot = false;
    let mut seen_exp = false;
    while i < bytes.len() {
        match bytes[i] {
            b'0'..=b'9' => {}
            b'.' if !seen_dot && !seen_exp => seen_dot = true,
            b'e' | b'E' if !seen_exp => {
                seen_exp = true;
                if matches!(bytes.get(i + 1), Some(b'+') | Some(b'-')) {
                    i += 1;
                }
            }
            _ => break,
        }
        i += 1;
    }
    i
}
