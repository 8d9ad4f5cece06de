//! Field-level reading and writing shared by every variant schema
//!
//! Reads go through [`crate::coerce`] so each schema gets the same leniency;
//! writes omit absent fields and keep the order in which they are declared.

use crate::coerce;
use crate::error::CodecError;
use crate::legacy::{Key, Value};

/// Read-only view over a decoded record array
pub(crate) struct Fields<'a> {
    value: &'a Value,
}

impl<'a> Fields<'a> {
    pub(crate) fn new(value: &'a Value, what: &str) -> Result<Self, CodecError> {
        if !value.is_array() {
            return Err(CodecError::UnexpectedShape(format!(
                "{} is a {}, expected array",
                what,
                value.kind()
            )));
        }
        Ok(Self { value })
    }

    pub(crate) fn string(&self, name: &str) -> Option<String> {
        self.value.get(name).and_then(coerce::as_string)
    }

    pub(crate) fn int<T: TryFrom<i64>>(&self, name: &str) -> Option<T> {
        self.value.get(name).and_then(coerce::as_int_in)
    }

    pub(crate) fn flag(&self, name: &str) -> Option<bool> {
        self.value.get(name).and_then(coerce::as_bool)
    }
}

/// Builds a record array field by field
#[derive(Default)]
pub(crate) struct FieldWriter {
    pairs: Vec<(Key, Value)>,
}

impl FieldWriter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, name: &str, value: Value) {
        self.pairs.push((Key::from(name), value));
    }

    pub(crate) fn str(&mut self, name: &str, value: &Option<String>) -> &mut Self {
        if let Some(v) = value {
            self.push(name, Value::Str(v.clone()));
        }
        self
    }

    pub(crate) fn int<T: Into<i64> + Copy>(&mut self, name: &str, value: Option<T>) -> &mut Self {
        if let Some(v) = value {
            self.push(name, Value::Int(v.into()));
        }
        self
    }

    /// Numeric field the producer stores as its decimal string
    pub(crate) fn int_text<T: Into<i64> + Copy>(&mut self, name: &str, value: Option<T>) -> &mut Self {
        if let Some(v) = value {
            self.push(name, Value::Str(v.into().to_string()));
        }
        self
    }

    /// Boolean stored as `"1"` / `"0"`
    pub(crate) fn flag_text(&mut self, name: &str, value: Option<bool>) -> &mut Self {
        if let Some(v) = value {
            self.push(name, Value::from(if v { "1" } else { "0" }));
        }
        self
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub(crate) fn finish(self) -> Value {
        Value::Array(self.pairs)
    }
}
