//! Binary encoding of [`Value`]s.
//!
//! Values are written depth-first as a stream of elements. Maps are written in key order, so a
//! given value always encodes to the same bytes.

use crate::element::{serialize_elem, Element};
use crate::value::{Document, Value};

/// Encode a value into a new byte vector.
pub fn encode_value(val: &Value) -> Vec<u8> {
    let mut buf = Vec::new();
    encode_value_into(&mut buf, val);
    buf
}

/// Encode a document as a map value, without needing to wrap it in a [`Value`] first.
pub fn encode_document(doc: &Document) -> Vec<u8> {
    let mut buf = Vec::new();
    encode_map(&mut buf, doc);
    buf
}

/// Append the encoding of a value to an existing buffer.
pub fn encode_value_into(buf: &mut Vec<u8>, val: &Value) {
    match val {
        Value::Null => serialize_elem(buf, Element::Null),
        Value::Bool(v) => serialize_elem(buf, Element::Bool(*v)),
        Value::Int(v) => serialize_elem(buf, Element::Int(*v)),
        Value::F64(v) => serialize_elem(buf, Element::F64(*v)),
        Value::Str(v) => serialize_elem(buf, Element::Str(v)),
        Value::Bin(v) => serialize_elem(buf, Element::Bin(v)),
        Value::Array(v) => {
            serialize_elem(buf, Element::Array(v.len()));
            for item in v {
                encode_value_into(buf, item);
            }
        }
        Value::Map(v) => encode_map(buf, v),
    }
}

fn encode_map(buf: &mut Vec<u8>, map: &Document) {
    serialize_elem(buf, Element::Map(map.len()));
    for (key, item) in map {
        serialize_elem(buf, Element::Str(key));
        encode_value_into(buf, item);
    }
}
