//! Presentation cleanup for generated text.

/// Flatten generated text onto one line for embedding in the envelope.
///
/// Line breaks become spaces, whitespace runs collapse to a single space, and
/// one enclosing pair of double quotes is removed.
pub fn sanitize_insight(text: &str) -> String {
    let flattened = text
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    match flattened
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
    {
        Some(inner) => inner.to_string(),
        None => flattened,
    }
}
