//! Identifier validation for user-selected containers, images and volumes.
//!
//! Any id or name that ends up on a runtime command line must pass
//! [`is_valid_identifier`] first.

/// Longest accepted identifier.
pub const MAX_IDENTIFIER_LEN: usize = 256;

/// Returns true if `token` is 1 to [`MAX_IDENTIFIER_LEN`] characters drawn
/// from ASCII alphanumerics and `_ - . : /`.
#[must_use]
pub fn is_valid_identifier(token: &str) -> bool {
    !token.is_empty()
        && token.len() <= MAX_IDENTIFIER_LEN
        && token.chars().all(is_identifier_char)
}

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | ':' | '/')
}
