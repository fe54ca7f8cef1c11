//! Text normalization shared by training and inference.

/// Filter that converts a string into another string.
pub trait StringFilter<S>
where
    S: AsRef<str>,
{
    /// Filter a specified string.
    ///
    /// # Arguments:
    ///
    /// * `string` - Input string.
    ///
    /// # Returns
    ///
    /// A processed string.
    fn filter(&self, string: S) -> String;
}

/// Normalizer for ingredient and recipe text.
///
/// The output contains only ASCII lowercase letters separated by single spaces. Non-ASCII letters
/// are dropped, which keeps the vocabulary small and deterministic. Filtering twice gives the same
/// result as filtering once.
#[derive(Clone, Copy, Debug, Default)]
pub struct TextNormalizer;

impl TextNormalizer {
    /// Creates a new TextNormalizer.
    ///
    /// # Returns
    ///
    /// A new TextNormalizer.
    pub const fn new() -> Self {
        Self
    }
}

impl<S> StringFilter<S> for TextNormalizer
where
    S: AsRef<str>,
{
    /// Strips tags and keeps lowercase letters only.
    ///
    /// # Arguments:
    ///
    /// * `string` - Input text.
    ///
    /// # Returns
    ///
    /// A normalized text.
    fn filter(&self, string: S) -> String {
        let stripped = strip_tags(string.as_ref());
        let mut result = String::with_capacity(stripped.len());
        let mut pending_space = false;
        for c in stripped.chars().flat_map(char::to_lowercase) {
            if c.is_ascii_lowercase() {
                if pending_space && !result.is_empty() {
                    result.push(' ');
                }
                pending_space = false;
                result.push(c);
            } else {
                pending_space = true;
            }
        }
        result
    }
}

/// Replaces every `<...>` span with a space.
///
/// A span needs at least one character between the brackets, and the closest `>` closes it.
fn strip_tags(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find('<') {
        result.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find('>') {
            Some(end) if end > 0 => {
                result.push(' ');
                rest = &after[end + 1..];
            }
            _ => {
                result.push('<');
                rest = after;
            }
        }
    }
    result.push_str(rest);
    result
}

/// Normalizes a text with [`TextNormalizer`].
pub fn normalize<S>(text: S) -> String
where
    S: AsRef<str>,
{
    TextNormalizer.filter(text)
}

/// Normalizes a document that may be absent. An absent document is the empty text.
pub fn normalize_document(document: Option<&str>) -> String {
    normalize(document.unwrap_or(""))
}
