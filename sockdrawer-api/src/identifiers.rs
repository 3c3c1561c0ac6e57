//! Account identifier parsing
//!
//! Turns the raw `ids` argument (`"18105480,@JesseT_G"`) into an ordered
//! list of [`Identifier`]s. The whole batch is rejected on the first bad
//! segment; nothing is trimmed or skipped.

use std::fmt;
use thiserror::Error;
use unicode_general_category::{get_general_category, GeneralCategory};

/// An account to look up: numeric account ID or handle
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identifier {
    /// All-digit segment without a leading `@`
    Numeric(u64),
    /// Screen name with any single leading `@` removed
    Handle(String),
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Numeric(id) => write!(f, "{}", id),
            Identifier::Handle(name) => f.write_str(name),
        }
    }
}

/// Identifier validation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Missing argument, or an empty segment anywhere in it
    #[error("Usernames must not be empty")]
    EmptyArgument,

    /// Segment contains a non-printable character or surrounding whitespace
    #[error("Usernames must not contain whitespace padding or non-printable characters: {segment:?}")]
    BadCharacter { segment: String },

    /// All-digit segment too large for an account ID
    #[error("Account ID out of range: {segment}")]
    IdOutOfRange { segment: String },
}

/// Parse a comma-separated identifier list, preserving order and duplicates
pub fn parse_ids(raw: Option<&str>) -> Result<Vec<Identifier>, ParseError> {
    let raw = match raw {
        Some(raw) if !raw.is_empty() => raw,
        _ => return Err(ParseError::EmptyArgument),
    };

    raw.split(',').map(parse_id).collect()
}

/// Parse a single identifier segment
pub fn parse_id(segment: &str) -> Result<Identifier, ParseError> {
    if segment.is_empty() {
        return Err(ParseError::EmptyArgument);
    }

    if segment.chars().any(is_non_printable) || has_whitespace_padding(segment) {
        return Err(ParseError::BadCharacter {
            segment: segment.to_string(),
        });
    }

    if segment.bytes().all(|b| b.is_ascii_digit()) {
        return segment
            .parse::<u64>()
            .map(Identifier::Numeric)
            .map_err(|_| ParseError::IdOutOfRange {
                segment: segment.to_string(),
            });
    }

    // Only one '@' is stripped, so "@2048" stays a handle
    let handle = segment.strip_prefix('@').unwrap_or(segment);
    if handle.is_empty() {
        return Err(ParseError::EmptyArgument);
    }
    if has_whitespace_padding(handle) {
        return Err(ParseError::BadCharacter {
            segment: segment.to_string(),
        });
    }

    Ok(Identifier::Handle(handle.to_string()))
}

/// Other (Cc, Cf, Cs, Co, Cn) and separator (Zl, Zp, Zs) characters, except
/// the ASCII space
fn is_non_printable(c: char) -> bool {
    if c == ' ' {
        return false;
    }
    matches!(
        get_general_category(c),
        GeneralCategory::Control
            | GeneralCategory::Format
            | GeneralCategory::Surrogate
            | GeneralCategory::PrivateUse
            | GeneralCategory::Unassigned
            | GeneralCategory::LineSeparator
            | GeneralCategory::ParagraphSeparator
            | GeneralCategory::SpaceSeparator
    )
}

fn has_whitespace_padding(s: &str) -> bool {
    s.starts_with(char::is_whitespace) || s.ends_with(char::is_whitespace)
}
