use once_cell::sync::Lazy;
use regex::Regex;
use crate::error::{TouchError, TouchResult};

/// Longest identifier accepted (PostgreSQL NAMEDATALEN - 1)
pub const MAX_IDENTIFIER_LEN: usize = 63;

static IDENTIFIER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is valid")
});

/// Check that a table or column name is safe to place in a statement.
pub fn validate_identifier(name: &str) -> TouchResult<()> {
    if name.is_empty() {
        return Err(TouchError::InvalidIdentifier {
            name: name.to_string(),
            reason: "identifier is empty".to_string(),
        });
    }

    if name.len() > MAX_IDENTIFIER_LEN {
        return Err(TouchError::InvalidIdentifier {
            name: name.to_string(),
            reason: format!("longer than {MAX_IDENTIFIER_LEN} bytes"),
        });
    }

    if !IDENTIFIER_RE.is_match(name) {
        return Err(TouchError::InvalidIdentifier {
            name: name.to_string(),
            reason: "only letters, digits and underscores are allowed".to_string(),
        });
    }

    Ok(())
}

/// Double-quote an identifier that already passed `validate_identifier`.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{name}\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::testing::assert_error_contains;

    #[test]
    fn test_accepts_plain_names() {
        assert!(validate_identifier("updated_at").is_ok());
        assert!(validate_identifier("_private").is_ok());
        assert!(validate_identifier("Posts2").is_ok());
    }

    #[test]
    fn test_rejects_injection() {
        assert_error_contains(validate_identifier("a\"; DROP TABLE x; --"), "only letters");
        assert_error_contains(validate_identifier("1abc"), "only letters");
        assert_error_contains(validate_identifier(""), "empty");
    }

    #[test]
    fn test_rejects_long_names() {
        let name = "a".repeat(MAX_IDENTIFIER_LEN + 1);
        assert_error_contains(validate_identifier(&name), "longer than");
        assert!(validate_identifier(&"a".repeat(MAX_IDENTIFIER_LEN)).is_ok());
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("posts"), "\"posts\"");
    }
}
