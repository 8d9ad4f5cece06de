//! Untyped value model of the legacy array grammar

use std::fmt;

/// Array key: the grammar only admits integer and string keys
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Int(i64),
    Str(String),
}

impl Key {
    /// True when this key names `field`, comparing integer keys by their decimal text
    pub fn matches(&self, field: &str) -> bool {
        match self {
            Key::Str(s) => s == field,
            Key::Int(i) => field.parse::<i64>().map(|f| f == *i).unwrap_or(false),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Int(i) => write!(f, "{}", i),
            Key::Str(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::Str(s.to_string())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::Str(s)
    }
}

impl From<i64> for Key {
    fn from(i: i64) -> Self {
        Key::Int(i)
    }
}

/// A decoded grammar value
///
/// Arrays keep their pairs in declared order; encoding writes them back in
/// the same order, never sorted.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// Byte string that is valid UTF-8
    Str(String),
    /// Byte string that is not valid UTF-8
    Bytes(Vec<u8>),
    Array(Vec<(Key, Value)>),
}

impl Value {
    /// Build a string value from raw bytes, keeping UTF-8 text as `Str`
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        match String::from_utf8(bytes) {
            Ok(s) => Value::Str(s),
            Err(e) => Value::Bytes(e.into_bytes()),
        }
    }

    pub fn as_array(&self) -> Option<&[(Key, Value)]> {
        match self {
            Value::Array(pairs) => Some(pairs),
            _ => None,
        }
    }

    /// Look up a field of an array value by name (first match wins)
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.as_array()?
            .iter()
            .find(|(k, _)| k.matches(field))
            .map(|(_, v)| v)
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    /// Short tag name used in diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Array(_) => "array",
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_matches_string_and_numeric_keys() {
        assert!(Key::from("subject_id").matches("subject_id"));
        assert!(Key::Int(100).matches("100"));
        assert!(!Key::Int(100).matches("1000"));
        assert!(!Key::Int(1).matches("one"));
    }

    #[test]
    fn test_get_returns_first_matching_field() {
        let v = Value::Array(vec![
            (Key::from("a"), Value::Int(1)),
            (Key::from("a"), Value::Int(2)),
        ]);
        assert_eq!(v.get("a"), Some(&Value::Int(1)));
        assert_eq!(v.get("b"), None);
        assert_eq!(Value::Null.get("a"), None);
    }

    #[test]
    fn test_from_bytes_splits_utf8_and_binary() {
        assert_eq!(Value::from_bytes(b"abc".to_vec()), Value::Str("abc".into()));
        assert_eq!(
            Value::from_bytes(vec![0xff, 0xfe]),
            Value::Bytes(vec![0xff, 0xfe])
        );
    }
}
