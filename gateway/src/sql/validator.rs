//! C8: last line of defense against SQL injection through fragments
//! (table/column names, ORDER BY lists) that get string-concatenated
//! instead of bound as parameters.

use common::err::GatewayError;
use once_cell::sync::Lazy;
use regex::Regex;

static IDENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,127}(\.[A-Za-z_][A-Za-z0-9_]{0,127})?$").unwrap());

/// A bare or `table.column` identifier: letters/digits/underscore, must
/// start with a letter or underscore, at most 128 characters per segment.
pub fn validate_identifier(ident: &str) -> Result<(), GatewayError> {
    if IDENT_RE.is_match(ident) {
        Ok(())
    } else {
        Err(GatewayError::InvalidArgument(format!("not a valid identifier: {ident}")))
    }
}

/// A raw fragment destined for string concatenation into a statement
/// (e.g. an `ORDER BY` list). Rejects statement terminators and comment
/// openers outright; anything else is the caller's responsibility to
/// further validate (e.g. via [`validate_identifier`] per token).
pub fn validate_fragment(fragment: &str) -> Result<(), GatewayError> {
    if fragment.contains(';') || fragment.contains("--") || fragment.contains("/*") {
        return Err(GatewayError::SqlInjectionSuspected(fragment.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn accepts_plain_and_qualified_identifiers() {
        assert!(validate_identifier("id").is_ok());
        assert!(validate_identifier("users.id").is_ok());
        assert!(validate_identifier("_private").is_ok());
    }

    #[test]
    fn rejects_identifiers_starting_with_digit() {
        assert!(validate_identifier("1id").is_err());
    }

    #[test]
    fn rejects_identifiers_with_injected_punctuation() {
        assert!(validate_identifier("id; DROP TABLE users").is_err());
        assert!(validate_identifier("id--").is_err());
    }

    #[test]
    fn fragment_rejects_semicolons_and_comments() {
        assert!(validate_fragment("id ASC; DROP TABLE users").is_err());
        assert!(validate_fragment("id ASC -- comment").is_err());
        assert!(validate_fragment("id ASC /* comment */").is_err());
        assert!(validate_fragment("id ASC, name DESC").is_ok());
    }
}
