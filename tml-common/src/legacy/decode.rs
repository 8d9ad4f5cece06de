//! Grammar reader
//!
//! Strictly bounds-checked: every length prefix is validated against the
//! remaining input before any slice is taken, and nesting is capped so a
//! hostile blob cannot exhaust the stack.

use super::value::{Key, Value};
use crate::error::CodecError;

/// Maximum array nesting accepted on decode
pub const MAX_DEPTH: usize = 64;

/// Decode one value; the whole input must be consumed
pub fn decode(input: &[u8]) -> Result<Value, CodecError> {
    let mut reader = Reader::new(input);
    let value = reader.value(0)?;
    if reader.pos != input.len() {
        return Err(CodecError::malformed(
            reader.pos,
            format!("{} trailing bytes after value", input.len() - reader.pos),
        ));
    }
    Ok(value)
}

struct Reader<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(input: &'a [u8]) -> Self {
        Self { input, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.input.len() - self.pos
    }

    fn next(&mut self) -> Result<u8, CodecError> {
        let b = *self
            .input
            .get(self.pos)
            .ok_or_else(|| CodecError::malformed(self.pos, "unexpected end of input"))?;
        self.pos += 1;
        Ok(b)
    }

    fn expect(&mut self, wanted: u8) -> Result<(), CodecError> {
        let at = self.pos;
        let got = self.next()?;
        if got != wanted {
            return Err(CodecError::malformed(
                at,
                format!("expected '{}', found '{}'", wanted as char, got.escape_ascii()),
            ));
        }
        Ok(())
    }

    /// Consume up to (and including) `delim`, returning the bytes before it
    fn read_until(&mut self, delim: u8) -> Result<&'a [u8], CodecError> {
        let start = self.pos;
        let rest = &self.input[start..];
        let len = rest.iter().position(|&b| b == delim).ok_or_else(|| {
            CodecError::malformed(start, format!("missing '{}' terminator", delim as char))
        })?;
        self.pos = start + len + 1;
        Ok(&rest[..len])
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], CodecError> {
        let start = self.pos;
        let end = start
            .checked_add(len)
            .filter(|&end| end <= self.input.len())
            .ok_or_else(|| {
                CodecError::malformed(
                    start,
                    format!("length {} exceeds remaining {} bytes", len, self.remaining()),
                )
            })?;
        self.pos = end;
        Ok(&self.input[start..end])
    }

    /// Unsigned decimal length prefix terminated by ':'
    fn length(&mut self) -> Result<usize, CodecError> {
        let start = self.pos;
        let raw = self.read_until(b':')?;
        if raw.is_empty() || !raw.iter().all(u8::is_ascii_digit) {
            return Err(CodecError::malformed(start, "invalid length prefix"));
        }
        std::str::from_utf8(raw)
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .ok_or_else(|| CodecError::malformed(start, "length prefix out of range"))
    }

    fn scalar_text(&mut self) -> Result<(usize, &'a str), CodecError> {
        self.expect(b':')?;
        let start = self.pos;
        let raw = self.read_until(b';')?;
        let text = std::str::from_utf8(raw)
            .map_err(|_| CodecError::malformed(start, "non-ASCII scalar"))?;
        Ok((start, text))
    }

    fn int(&mut self) -> Result<i64, CodecError> {
        let (start, text) = self.scalar_text()?;
        text.parse::<i64>()
            .map_err(|_| CodecError::malformed(start, format!("invalid integer '{}'", text)))
    }

    fn string_bytes(&mut self) -> Result<&'a [u8], CodecError> {
        self.expect(b':')?;
        let len = self.length()?;
        self.expect(b'"')?;
        let bytes = self.take(len)?;
        self.expect(b'"')?;
        self.expect(b';')?;
        Ok(bytes)
    }

    fn key(&mut self) -> Result<Key, CodecError> {
        let at = self.pos;
        match self.next()? {
            b'i' => Ok(Key::Int(self.int()?)),
            b's' => {
                let bytes = self.string_bytes()?;
                String::from_utf8(bytes.to_vec())
                    .map(Key::Str)
                    .map_err(|_| CodecError::malformed(at, "array key is not valid UTF-8"))
            }
            other => Err(CodecError::malformed(
                at,
                format!("invalid array key tag '{}'", other.escape_ascii()),
            )),
        }
    }

    fn value(&mut self, depth: usize) -> Result<Value, CodecError> {
        let at = self.pos;
        match self.next()? {
            b'N' => {
                self.expect(b';')?;
                Ok(Value::Null)
            }
            b'b' => {
                let (start, text) = self.scalar_text()?;
                match text {
                    "0" => Ok(Value::Bool(false)),
                    "1" => Ok(Value::Bool(true)),
                    _ => Err(CodecError::malformed(start, format!("invalid boolean '{}'", text))),
                }
            }
            b'i' => Ok(Value::Int(self.int()?)),
            b'd' => {
                let (start, text) = self.scalar_text()?;
                parse_float(text)
                    .map(Value::Float)
                    .ok_or_else(|| CodecError::malformed(start, format!("invalid float '{}'", text)))
            }
            b's' => Ok(Value::from_bytes(self.string_bytes()?.to_vec())),
            b'a' => {
                if depth >= MAX_DEPTH {
                    return Err(CodecError::malformed(at, "array nesting too deep"));
                }
                self.expect(b':')?;
                let count = self.length()?;
                self.expect(b'{')?;
                // smallest pair is "i:0;N;"
                let mut pairs = Vec::with_capacity(count.min(self.remaining() / 6));
                for _ in 0..count {
                    let key = self.key()?;
                    let value = self.value(depth + 1)?;
                    pairs.push((key, value));
                }
                self.expect(b'}')?;
                Ok(Value::Array(pairs))
            }
            other => Err(CodecError::malformed(
                at,
                format!("unrecognized type tag '{}'", other.escape_ascii()),
            )),
        }
    }
}

fn parse_float(text: &str) -> Option<f64> {
    match text {
        "INF" => Some(f64::INFINITY),
        "-INF" => Some(f64::NEG_INFINITY),
        "NAN" => Some(f64::NAN),
        _ if text.is_empty() => None,
        _ => text.parse::<f64>().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn malformed(input: &[u8]) -> bool {
        matches!(decode(input), Err(CodecError::Malformed { .. }))
    }

    #[test]
    fn test_decode_scalars() {
        assert_eq!(decode(b"N;").unwrap(), Value::Null);
        assert_eq!(decode(b"b:1;").unwrap(), Value::Bool(true));
        assert_eq!(decode(b"b:0;").unwrap(), Value::Bool(false));
        assert_eq!(decode(b"i:-42;").unwrap(), Value::Int(-42));
        assert_eq!(decode(b"d:1.5;").unwrap(), Value::Float(1.5));
        assert_eq!(decode(b"d:1.0E+25;").unwrap(), Value::Float(1.0e25));
        assert_eq!(decode(b"d:-INF;").unwrap(), Value::Float(f64::NEG_INFINITY));
        assert_eq!(decode(b"s:5:\"hello\";").unwrap(), Value::Str("hello".into()));
    }

    #[test]
    fn test_decode_string_uses_byte_length_not_terminator() {
        // embedded quote and semicolon inside the declared length
        let v = decode(b"s:4:\"a\";b\";").unwrap();
        assert_eq!(v, Value::Str("a\";b".into()));

        // multi-byte UTF-8: "番组" is 6 bytes
        let v = decode("s:6:\"番组\";".as_bytes()).unwrap();
        assert_eq!(v, Value::Str("番组".into()));
    }

    #[test]
    fn test_decode_array_preserves_declared_order() {
        let v = decode(b"a:3:{s:1:\"z\";i:1;i:7;s:1:\"x\";s:1:\"a\";N;}").unwrap();
        assert_eq!(
            v,
            Value::Array(vec![
                (Key::from("z"), Value::Int(1)),
                (Key::Int(7), Value::Str("x".into())),
                (Key::from("a"), Value::Null),
            ])
        );
    }

    #[test]
    fn test_decode_nested_array() {
        let v = decode(b"a:1:{i:0;a:1:{s:2:\"id\";i:5;}}").unwrap();
        let inner = v.get("0").unwrap();
        assert_eq!(inner.get("id"), Some(&Value::Int(5)));
    }

    #[test]
    fn test_decode_rejects_truncated_input() {
        assert!(malformed(b""));
        assert!(malformed(b"i:12"));
        assert!(malformed(b"s:10:\"short\";"));
        assert!(malformed(b"a:2:{i:0;N;}"));
        assert!(malformed(b"a:1:{i:0;N;"));
    }

    #[test]
    fn test_decode_rejects_bad_length_prefix() {
        assert!(malformed(b"s:-1:\"\";"));
        assert!(malformed(b"s::\"\";"));
        assert!(malformed(b"s:99999999999999999999999:\"\";"));
        assert!(malformed(b"a:x:{}"));
    }

    #[test]
    fn test_decode_rejects_unknown_tags_and_keys() {
        assert!(malformed(b"O:8:\"stdClass\":0:{}"));
        assert!(malformed(b"r:1;"));
        assert!(malformed(b"a:1:{d:1.5;N;}"));
        assert!(malformed(b"b:2;"));
    }

    #[test]
    fn test_decode_rejects_trailing_bytes() {
        assert!(malformed(b"N;N;"));
        assert!(malformed(b"i:1;x"));
    }

    #[test]
    fn test_decode_huge_count_does_not_allocate_or_panic() {
        assert!(malformed(b"a:18446744073709551615:{}"));
        assert!(malformed(b"a:4294967295:{i:0;N;}"));
    }

    #[test]
    fn test_decode_caps_nesting_depth() {
        let mut deep = Vec::new();
        for _ in 0..(MAX_DEPTH + 1) {
            deep.extend_from_slice(b"a:1:{i:0;");
        }
        deep.extend_from_slice(b"N;");
        for _ in 0..(MAX_DEPTH + 1) {
            deep.push(b'}');
        }
        assert!(malformed(&deep));
    }

    #[test]
    fn test_decode_error_reports_offset() {
        match decode(b"a:1:{s:1:\"k\";q:1;}") {
            Err(CodecError::Malformed { offset, .. }) => assert_eq!(offset, 13),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
