use std::borrow::Cow;

/// Escapes the characters reserved by the CRF data format.
///
/// Backslash, colon and hash are prefixed with a backslash. The input is
/// returned unchanged (and unallocated) when none of them occur.
///
/// # Example
/// ```
/// use seqfeat::escape::escape;
///
/// assert_eq!(escape(r"a:b#c\d"), r"a\:b\#c\\d");
/// assert_eq!(escape("dog"), "dog");
/// ```
pub fn escape(field: &str) -> Cow<'_, str> {
    if !field.contains(['\\', ':', '#']) {
        return Cow::Borrowed(field);
    }
    let mut escaped = String::with_capacity(field.len() + 4);
    for ch in field.chars() {
        if matches!(ch, '\\' | ':' | '#') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    Cow::Owned(escaped)
}
