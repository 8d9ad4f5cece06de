//! Lenient scalar extraction
//!
//! Historical producers wrote numeric fields inconsistently, sometimes as
//! integers and sometimes as their decimal string. Every helper accepts both
//! the natural tag and the string spelling; anything unconvertible is `None`
//! and callers treat it as an omitted field.

use crate::legacy::Value;

/// Integer from `i:`, a decimal string, or an integral float
pub fn as_int(value: &Value) -> Option<i64> {
    match value {
        Value::Int(i) => Some(*i),
        Value::Str(s) => s.trim().parse::<i64>().ok(),
        Value::Float(f) if f.is_finite() && f.fract() == 0.0 => {
            let i = *f as i64;
            (i as f64 == *f).then_some(i)
        }
        _ => None,
    }
}

/// Integer narrowed to `T`; out-of-range values count as absent
pub fn as_int_in<T: TryFrom<i64>>(value: &Value) -> Option<T> {
    as_int(value).and_then(|i| T::try_from(i).ok())
}

pub fn as_float(value: &Value) -> Option<f64> {
    match value {
        Value::Float(f) => Some(*f),
        Value::Int(i) => Some(*i as f64),
        Value::Str(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Text from a string, or the decimal spelling of a number
pub fn as_string(value: &Value) -> Option<String> {
    match value {
        Value::Str(s) => Some(s.clone()),
        Value::Int(i) => Some(i.to_string()),
        Value::Float(f) if f.is_finite() => Some(f.to_string()),
        _ => None,
    }
}

/// Boolean from `b:`, `0`/`1` integers, or their string forms
pub fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Int(0) => Some(false),
        Value::Int(1) => Some(true),
        Value::Str(s) => match s.trim() {
            "0" | "" | "false" => Some(false),
            "1" | "true" => Some(true),
            _ => None,
        },
        _ => None,
    }
}
