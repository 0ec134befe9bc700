//! Store key validation and path construction.
//!
//! Keys in the hierarchical store address path segments, so record ids and property names
//! that end up in a path (point reads, `"<id>/<field>"` patch paths) must not contain the
//! characters the store reserves for path syntax.

use crate::error::{ConnectorError, ConnectorResult};

/// Characters the store does not accept inside a key.
const FORBIDDEN: [char; 6] = ['.', '$', '#', '[', ']', '/'];

/// Checks that `key` can be used as a single path segment.
///
/// # Errors
///
/// Returns [`ConnectorError::InvalidArgument`] for empty keys and keys containing
/// `.`, `$`, `#`, `[`, `]`, `/` or ASCII control characters.
pub fn validate_key(key: &str) -> ConnectorResult<()> {
    if key.is_empty() {
        return Err(ConnectorError::InvalidArgument("key must not be empty".into()));
    }

    if let Some(c) = key
        .chars()
        .find(|c| FORBIDDEN.contains(c) || c.is_ascii_control())
    {
        return Err(ConnectorError::InvalidArgument(format!(
            "key {key:?} contains forbidden character {c:?}"
        )));
    }

    Ok(())
}

/// Checks that a collection path is a `/`-separated sequence of valid keys.
pub fn validate_collection_path(path: &str) -> ConnectorResult<()> {
    path.split('/').try_for_each(validate_key)
}

/// Builds the relative path `<id>/<field>` used in multi-path patches.
pub fn field_path(id: &str, field: &str) -> ConnectorResult<String> {
    validate_key(id)?;
    validate_key(field)?;

    Ok(format!("{id}/{field}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_push_ids_and_plain_names() {
        assert!(validate_key("-NxYz09_abcDEF").is_ok());
        assert!(validate_key("emails").is_ok());
        assert!(validate_collection_path("shop/orders").is_ok());
    }

    #[test]
    fn rejects_reserved_characters() {
        for key in ["", "a.b", "a$", "#x", "a[0]", "a/b", "tab\there"] {
            assert!(validate_key(key).is_err(), "{key:?} should be rejected");
        }
        assert!(validate_collection_path("shop//orders").is_err());
    }

    #[test]
    fn builds_patch_paths() {
        assert_eq!(field_path("k1", "name").unwrap(), "k1/name");
        assert!(field_path("k1", "a/b").is_err());
    }
}
