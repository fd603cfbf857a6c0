//! Secret text classification.

use serde_json::Value;

/// A secret's text, classified as structured JSON or an opaque value.
#[derive(Debug, Clone, PartialEq)]
pub enum SecretPayload {
    /// A JSON object or array, flattened into one key per leaf
    Structured(Value),
    /// Anything else, stored verbatim under the secret's own key
    Opaque,
}

impl SecretPayload {
    /// Classify secret text.
    ///
    /// Only text whose first non-whitespace character is `{` or `[` is parsed.
    /// Text that looks like JSON but fails to parse is treated as opaque; the
    /// caller keeps the original text either way.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim_start();
        if !(trimmed.starts_with('{') || trimmed.starts_with('[')) {
            return Self::Opaque;
        }

        match serde_json::from_str::<Value>(trimmed) {
            Ok(value) => Self::Structured(value),
            Err(_) => Self::Opaque,
        }
    }

    pub fn is_structured(&self) -> bool {
        matches!(self, Self::Structured(_))
    }
}
