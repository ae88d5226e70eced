//! Decoding of [`Value`]s from their binary encoding.
//!
//! Decoding is strict: every element must use its shortest form, map keys must be strings in
//! ascending order with no repeats, and the value must consume the entire input.

use crate::element::{Element, Parser};
use crate::error::{Error, Result};
use crate::value::{Document, Value};

/// Decode exactly one value from the byte slice.
pub fn decode_value(data: &[u8]) -> Result<Value> {
    let mut parser = Parser::new(data);
    let val = parse_value(&mut parser)?;
    let rest = parser.remaining();
    if !rest.is_empty() {
        return Err(Error::BadEncode(format!(
            "{} unexpected bytes after the encoded value",
            rest.len()
        )));
    }
    Ok(val)
}

/// Decode exactly one value from the byte slice, requiring it to be a map.
pub fn decode_document(data: &[u8]) -> Result<Document> {
    match decode_value(data)? {
        Value::Map(doc) => Ok(doc),
        other => Err(Error::BadEncode(format!(
            "Expected a Map at the top level, got {}",
            other.kind()
        ))),
    }
}

fn next_elem<'a>(parser: &mut Parser<'a>) -> Result<Element<'a>> {
    parser.next().unwrap_or(Err(Error::LengthTooShort {
        step: "get next element",
        actual: 0,
        expected: 1,
    }))
}

fn parse_value(parser: &mut Parser) -> Result<Value> {
    let val = match next_elem(parser)? {
        Element::Null => Value::Null,
        Element::Bool(v) => Value::Bool(v),
        Element::Int(v) => Value::Int(v),
        Element::F64(v) => Value::F64(v),
        Element::Str(v) => Value::Str(v.to_owned()),
        Element::Bin(v) => Value::Bin(v.to_vec()),
        Element::Array(len) => {
            let mut array = Vec::with_capacity(len);
            for _ in 0..len {
                array.push(parse_value(parser)?);
            }
            Value::Array(array)
        }
        Element::Map(len) => {
            let mut map = Document::new();
            let mut last_key: Option<String> = None;
            for _ in 0..len {
                let key = match next_elem(parser)? {
                    Element::Str(key) => key.to_owned(),
                    other => {
                        return Err(Error::BadEncode(format!(
                            "Map keys must be strings, got {}",
                            other.name()
                        )))
                    }
                };
                if let Some(last) = last_key.as_ref() {
                    if last >= &key {
                        return Err(Error::BadEncode(format!(
                            "Map keys out of order or repeated: {:?} then {:?}",
                            last, key
                        )));
                    }
                }
                let item = parse_value(parser)?;
                map.insert(key.clone(), item);
                last_key = Some(key);
            }
            Value::Map(map)
        }
    };
    Ok(val)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::encode::{encode_document, encode_value};
    use crate::MAX_DEPTH;
    use rand::prelude::*;

    fn random_value(rng: &mut impl Rng, depth: usize) -> Value {
        let pick = if depth == 0 { rng.gen_range(0..6) } else { rng.gen_range(0..8) };
        match pick {
            0 => Value::Null,
            1 => Value::Bool(rng.gen()),
            2 => Value::Int(rng.gen()),
            3 => Value::F64(rng.gen()),
            4 => {
                let len = rng.gen_range(0..40);
                Value::Str((0..len).map(|_| rng.gen_range('a'..='z')).collect())
            }
            5 => {
                let len = rng.gen_range(0..300);
                Value::Bin((0..len).map(|_| rng.gen()).collect())
            }
            6 => {
                let len = rng.gen_range(0..20);
                Value::Array((0..len).map(|_| random_value(rng, depth - 1)).collect())
            }
            _ => {
                let len = rng.gen_range(0..20);
                Value::Map(
                    (0..len)
                        .map(|i| (format!("key{}", i), random_value(rng, depth - 1)))
                        .collect(),
                )
            }
        }
    }

    #[test]
    fn random_roundtrip() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        for _ in 0..200 {
            let val = random_value(&mut rng, 4);
            let enc = encode_value(&val);
            assert_eq!(decode_value(&enc).unwrap(), val);
        }
    }

    #[test]
    fn trailing_bytes() {
        let mut enc = encode_value(&Value::from("hello"));
        enc.push(0xc0);
        assert!(decode_value(&enc).is_err());
    }

    #[test]
    fn empty_input() {
        assert!(matches!(
            decode_value(&[]),
            Err(Error::LengthTooShort { .. })
        ));
    }

    #[test]
    fn document_requires_map() {
        let enc = encode_value(&Value::Int(4));
        assert!(decode_document(&enc).is_err());
        let mut doc = Document::new();
        doc.insert("node_id".into(), Value::from("abc"));
        assert_eq!(decode_document(&encode_document(&doc)).unwrap(), doc);
    }

    #[test]
    fn unordered_keys() {
        // {"b": null, "a": null}
        let data = [0x82, 0xa1, b'b', 0xc0, 0xa1, b'a', 0xc0];
        assert!(decode_value(&data).is_err());
        // {"a": null, "a": null}
        let data = [0x82, 0xa1, b'a', 0xc0, 0xa1, b'a', 0xc0];
        assert!(decode_value(&data).is_err());
    }

    #[test]
    fn non_string_key() {
        let data = [0x81, 0x01, 0xc0];
        assert!(decode_value(&data).is_err());
    }

    #[test]
    fn depth_limit() {
        let mut val = Value::Null;
        for _ in 0..(MAX_DEPTH + 1) {
            val = Value::Array(vec![val]);
        }
        let enc = encode_value(&val);
        assert!(matches!(decode_value(&enc), Err(Error::ParseLimit(_))));
    }
}
