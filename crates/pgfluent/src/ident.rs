//! SQL identifier validation.
//!
//! Table and column names are embedded into statement text directly, so they
//! must be checked before any SQL is assembled. Only plain unquoted
//! identifiers are accepted: `[A-Za-z_][A-Za-z0-9_$]*`.

use crate::error::{QueryError, QueryResult};

/// Validate a single table or column name.
pub(crate) fn check(name: &str) -> QueryResult<()> {
    let mut chars = name.chars();
    match chars.next() {
        None => return Err(QueryError::validation("Identifier cannot be empty")),
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
        Some(c) => {
            return Err(QueryError::validation(format!(
                "Invalid identifier start character: '{c}'"
            )));
        }
    }
    for c in chars {
        if c == '_' || c == '$' || c.is_ascii_alphanumeric() {
            continue;
        }
        return Err(QueryError::validation(format!(
            "Invalid character in identifier '{name}': '{c}'"
        )));
    }
    Ok(())
}
