//! JSON flattening into delimited configuration paths.
//!
//! A structured secret `{"host":"h","port":5432}` stored as `db` becomes the
//! pairs `db:host = h` and `db:port = 5432`. Arrays use 0-based indices as
//! segments.

use serde_json::Value;

use crate::errors::{Result, SecretsError};

/// Configuration path segment delimiter.
pub const KEY_DELIMITER: &str = ":";

/// Join a path and a child segment.
pub fn join_path(prefix: &str, segment: &str) -> String {
    let mut path = String::with_capacity(prefix.len() + KEY_DELIMITER.len() + segment.len());
    path.push_str(prefix);
    path.push_str(KEY_DELIMITER);
    path.push_str(segment);
    path
}

/// Flatten `value` under `prefix`.
///
/// The returned iterator is lazy and walks the tree once. Leaves are produced
/// in document order:
/// - strings as-is
/// - numbers in their exact source text
/// - booleans as `True` / `False`
///
/// A `null` anywhere yields [`SecretsError::Format`] for its path, after which
/// the iterator is exhausted.
pub fn flatten<'a>(value: &'a Value, prefix: &str) -> Flatten<'a> {
    Flatten { stack: vec![(prefix.to_string(), value)], failed: false }
}

/// Iterator returned by [`flatten`].
#[derive(Debug)]
pub struct Flatten<'a> {
    stack: Vec<(String, &'a Value)>,
    failed: bool,
}

impl<'a> Iterator for Flatten<'a> {
    type Item = Result<(String, String)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        while let Some((path, value)) = self.stack.pop() {
            match value {
                Value::Object(members) => {
                    // Reversed so the first member is popped first
                    for (name, child) in members.iter().rev() {
                        self.stack.push((join_path(&path, name), child));
                    }
                }
                Value::Array(elements) => {
                    for (index, child) in elements.iter().enumerate().rev() {
                        self.stack.push((join_path(&path, &index.to_string()), child));
                    }
                }
                Value::String(text) => return Some(Ok((path, text.clone()))),
                Value::Number(number) => return Some(Ok((path, number.to_string()))),
                Value::Bool(flag) => {
                    let rendered = if *flag { "True" } else { "False" };
                    return Some(Ok((path, rendered.to_string())));
                }
                Value::Null => {
                    self.failed = true;
                    self.stack.clear();
                    return Some(Err(SecretsError::Format { path }));
                }
            }
        }
        None
    }
}

impl std::iter::FusedIterator for Flatten<'_> {}
