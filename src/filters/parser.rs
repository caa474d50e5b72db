//! Inline filter parser for search queries.
//!
//! Splits a raw query into search text and [`SearchFilters`]. Any word that is not a
//! recognized `field:value` pair is part of the search text.
//!
//! # Syntax
//!
//! ```text
//! query        := (word | field_filter)*
//! field_filter := field_name:value | field_name:"quoted value"
//! field_name   := type | kind | path | since (case-insensitive)
//! ```
//!
//! # Supported Fields
//!
//! - `type:rs` - File extension, with or without the dot
//! - `kind:file|dir` - Only files or only directories
//! - `path:src` - Case-insensitive substring of the full path (supports ~)
//! - `since:YYYY-MM-DD` - Modified on or after the date
//!
//! # Examples
//!
//! ```rust
//! # use findex::filters::parse_query;
//! // Text only
//! let parsed = parse_query("readme").unwrap();
//! assert_eq!(parsed.text, "readme");
//!
//! // Same field gets implicit OR
//! let parsed = parse_query("report type:pdf type:docx").unwrap();
//! assert_eq!(parsed.filters.file_types.len(), 2);
//!
//! // Quoted values for spaces
//! let parsed = parse_query("notes path:\"My Documents\"").unwrap();
//! assert_eq!(parsed.filters.path_contains, vec!["My Documents".to_string()]);
//! ```
//!
//! # Validation
//!
//! - `kind` values must be file(s) or dir(s)/directory
//! - `since` dates must be YYYY-MM-DD format and semantically valid
//! - Empty values and unterminated quotes are rejected

use std::iter::Peekable;
use std::str::Chars;

use chrono::NaiveDate;

use super::ast::{EntryKind, FilterField, ParsedQuery, SearchFilters};
use crate::error::{LocatorError, Result};

/// Token types produced by the tokenizer
#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    /// field:value or field:"quoted value" with a known field
    FieldValue { field: FilterField, value: String },
    /// Anything else, contributes to the search text
    Text(String),
}

/// Tokenize query input into text words and field filters
fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&ch) = chars.peek() {
        if ch.is_whitespace() {
            chars.next();
            continue;
        }

        let word = read_word(&mut chars);

        if word.starts_with('"') {
            tokens.push(Token::Text(read_quoted_value(&mut chars, &word)?));
            continue;
        }

        let field = word.find(':').and_then(|pos| parse_field(&word[..pos]).map(|f| (f, pos)));
        match field {
            Some((field, colon_pos)) => {
                let mut value = word[colon_pos + 1..].to_string();
                if value.starts_with('"') {
                    value = read_quoted_value(&mut chars, &value)?;
                }
                if value.is_empty() {
                    return Err(LocatorError::Validation(format!(
                        "Invalid field:value format: {}",
                        word
                    )));
                }
                tokens.push(Token::FieldValue { field, value });
            }
            None => tokens.push(Token::Text(word)),
        }
    }

    Ok(tokens)
}

/// Read a word (until whitespace or end)
fn read_word(chars: &mut Peekable<Chars>) -> String {
    let mut word = String::new();

    while let Some(&ch) = chars.peek() {
        if ch.is_whitespace() {
            break;
        }
        word.push(ch);
        chars.next();
    }

    word
}

/// Read a quoted value, handling the case where word already contains the opening quote
fn read_quoted_value(chars: &mut Peekable<Chars>, initial: &str) -> Result<String> {
    let mut value = initial[1..].to_string(); // Remove opening quote

    if let Some(quote_pos) = value.find('"') {
        return Ok(value[..quote_pos].to_string());
    }

    for ch in chars.by_ref() {
        if ch == '"' {
            return Ok(value);
        }
        value.push(ch);
    }

    Err(LocatorError::Validation("Unterminated quoted string".to_string()))
}

fn parse_field(field: &str) -> Option<FilterField> {
    match field.to_lowercase().as_str() {
        "type" | "ext" => Some(FilterField::Type),
        "kind" => Some(FilterField::Kind),
        "path" | "in" => Some(FilterField::Path),
        "since" => Some(FilterField::Since),
        _ => None,
    }
}

/// Split a raw query into search text and filters
///
/// Examples:
/// - "readme" → text only
/// - "main type:rs" → text "main", types {rs}
/// - "type:rs type:toml" → types {rs, toml} (same field OR'd)
/// - "kind:dir src" → directories named like "src"
pub fn parse_query(input: &str) -> Result<ParsedQuery> {
    let mut filters = SearchFilters::new();
    let mut words = Vec::new();

    for token in tokenize(input)? {
        match token {
            Token::Text(word) => words.push(word),
            Token::FieldValue { field, value } => apply_field(&mut filters, field, &value)?,
        }
    }

    Ok(ParsedQuery { text: words.join(" "), filters })
}

fn apply_field(filters: &mut SearchFilters, field: FilterField, value: &str) -> Result<()> {
    match field {
        FilterField::Type => {
            for extension in value.split(',') {
                filters.add_type(extension);
            }
        }
        FilterField::Kind => {
            let kind = parse_kind(value)?;
            *filters = std::mem::take(filters)
                .merge(SearchFilters { kind, ..SearchFilters::default() })?;
        }
        FilterField::Path => filters.path_contains.push(value.to_string()),
        FilterField::Since => {
            let date = parse_date(value)?;
            *filters = std::mem::take(filters)
                .merge(SearchFilters { modified_since: Some(date), ..SearchFilters::default() })?;
        }
    }
    Ok(())
}

fn parse_kind(value: &str) -> Result<EntryKind> {
    match value.to_lowercase().as_str() {
        "file" | "files" | "f" => Ok(EntryKind::FilesOnly),
        "dir" | "dirs" | "directory" | "d" => Ok(EntryKind::DirectoriesOnly),
        _ => Err(LocatorError::Validation(format!(
            "Invalid kind value: '{}' (must be 'file' or 'dir')",
            value
        ))),
    }
}

/// Strict YYYY-MM-DD, semantically valid (rejects 2024-02-31)
fn parse_date(value: &str) -> Result<NaiveDate> {
    if value.len() != 10 {
        return Err(invalid_date(value));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| invalid_date(value))
}

fn invalid_date(value: &str) -> LocatorError {
    LocatorError::Validation(format!("Invalid date format: '{}' (expected YYYY-MM-DD)", value))
}
