use nanoid::nanoid;

use crate::errors::ValidationError;

/// Canonical alphabet for entity identifiers (no ambiguous glyphs).
const ENTITY_ID_ALPHABET: &[char] = &[
    'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'J', 'K', 'L', 'M', 'N', 'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y',
    'Z', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'j', 'm', 'n', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
];
const ENTITY_ID_LENGTH: usize = 20;
/// Longest identifier accepted from callers.
const MAX_ENTITY_ID_LENGTH: usize = 64;

pub fn generate_entity_id() -> String {
    nanoid!(ENTITY_ID_LENGTH, ENTITY_ID_ALPHABET)
}

/// Identifiers end up inside store keys, so only `[A-Za-z0-9_-]` is accepted.
pub fn is_well_formed_id(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= MAX_ENTITY_ID_LENGTH
        && value.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

/// Rejects identifiers that cannot name a stored document.
pub fn ensure_well_formed_id(field: &str, value: &str) -> Result<(), ValidationError> {
    if is_well_formed_id(value) {
        Ok(())
    } else {
        Err(ValidationError::single(
            field,
            "validation.id",
            "identifier must be 1-64 characters of letters, digits, '_' or '-'",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_has_expected_length_and_charset() {
        let id = generate_entity_id();
        assert_eq!(id.len(), ENTITY_ID_LENGTH);
        assert!(id.chars().all(|c| ENTITY_ID_ALPHABET.contains(&c)));
        assert!(is_well_formed_id(&id));
    }

    #[test]
    fn rejects_key_breaking_ids() {
        assert!(is_well_formed_id("post1"));
        assert!(!is_well_formed_id(""));
        assert!(!is_well_formed_id("a:b"));
        assert!(!is_well_formed_id("users*"));
        assert!(!is_well_formed_id(&"x".repeat(65)));
        assert!(ensure_well_formed_id("post_id", "bad id").is_err());
    }
}
