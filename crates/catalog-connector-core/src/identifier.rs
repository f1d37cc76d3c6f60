/// Turn an arbitrary dataset or field name into an identifier the host accepts.
///
/// Surrounding whitespace (including U+FEFF) is trimmed, every character
/// outside `[A-Za-z0-9_]` becomes one `_` per UTF-16 code unit (so an emoji
/// yields `__`), and the result is lowercased.
pub fn sanitize_identifier(value: &str) -> String {
    let trimmed = value.trim_matches(|c: char| c.is_whitespace() || c == '\u{feff}');

    let mut id = String::with_capacity(trimmed.len());
    for c in trimmed.chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            id.push(c.to_ascii_lowercase());
        } else {
            id.extend(std::iter::repeat('_').take(c.len_utf16()));
        }
    }
    id
}
