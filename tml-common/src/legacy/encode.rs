//! Grammar writer

use super::value::{Key, Value};

/// Encode a value; array pairs are written in their stored order
pub fn encode(value: &Value) -> Vec<u8> {
    let mut out = Vec::with_capacity(64);
    write_value(&mut out, value);
    out
}

fn write_value(out: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Null => out.extend_from_slice(b"N;"),
        Value::Bool(b) => out.extend_from_slice(if *b { b"b:1;" } else { b"b:0;" }),
        Value::Int(i) => write_int(out, *i),
        Value::Float(f) => {
            out.extend_from_slice(b"d:");
            out.extend_from_slice(format_float(*f).as_bytes());
            out.push(b';');
        }
        Value::Str(s) => write_string(out, s.as_bytes()),
        Value::Bytes(b) => write_string(out, b),
        Value::Array(pairs) => {
            out.extend_from_slice(format!("a:{}:{{", pairs.len()).as_bytes());
            for (key, value) in pairs {
                match key {
                    Key::Int(i) => write_int(out, *i),
                    Key::Str(s) => write_string(out, s.as_bytes()),
                }
                write_value(out, value);
            }
            out.push(b'}');
        }
    }
}

fn write_int(out: &mut Vec<u8>, i: i64) {
    out.extend_from_slice(format!("i:{};", i).as_bytes());
}

fn write_string(out: &mut Vec<u8>, bytes: &[u8]) {
    out.extend_from_slice(format!("s:{}:\"", bytes.len()).as_bytes());
    out.extend_from_slice(bytes);
    out.extend_from_slice(b"\";");
}

/// Shortest text that reads back to the same f64
fn format_float(f: f64) -> String {
    if f.is_nan() {
        "NAN".to_string()
    } else if f.is_infinite() {
        let text = if f > 0.0 { "INF" } else { "-INF" };
        text.to_string()
    } else if f != 0.0 && (f.abs() >= 1e15 || f.abs() < 1e-5) {
        format!("{:e}", f)
    } else {
        format!("{}", f)
    }
}
