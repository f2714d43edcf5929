//! Shared attribute-value predicates.

/// True if `value` is a non-empty run of ASCII digits.
///
/// Release numbers are stored as strings; signs, whitespace and the empty
/// string are all rejected.
pub fn is_unsigned_integer(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
}

/// Parse a string-encoded release number.
pub fn parse_release_number(value: &str) -> Option<u32> {
    if !is_unsigned_integer(value) {
        return None;
    }
    value.parse().ok()
}

/// Interpret a boolean-like attribute (`allow_pseudo` and friends).
/// Anything other than a recognized false spelling reads as true.
pub fn is_truthy_flag(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "false" | "0" | "no" | "off" | ""
    )
}
