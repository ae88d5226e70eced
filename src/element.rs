use crate::error::{Error, Result};
use crate::{depth_tracking::DepthTracker, marker::Marker};

use byteorder::{LittleEndian, ReadBytesExt};

/// A single encoded item. Arrays & maps only carry their length; their contents are the
/// elements that follow.
#[derive(Clone, Debug, PartialEq)]
pub enum Element<'a> {
    Null,
    Bool(bool),
    Int(i64),
    F64(f64),
    Str(&'a str),
    Bin(&'a [u8]),
    Array(usize),
    Map(usize),
}

impl<'a> Element<'a> {
    pub fn name(&self) -> &'static str {
        use self::Element::*;
        match self {
            Null => "Null",
            Bool(_) => "Bool",
            Int(_) => "Int",
            F64(_) => "F64",
            Str(_) => "Str",
            Bin(_) => "Bin",
            Array(_) => "Array",
            Map(_) => "Map",
        }
    }
}

fn write_len(buf: &mut Vec<u8>, len: usize, markers: [Marker; 3]) {
    assert!(len <= (u32::MAX as usize));
    if len <= u8::MAX as usize {
        buf.push(markers[0].into());
        buf.push(len as u8);
    } else if len <= u16::MAX as usize {
        buf.push(markers[1].into());
        buf.extend_from_slice(&(len as u16).to_le_bytes());
    } else {
        buf.push(markers[2].into());
        buf.extend_from_slice(&(len as u32).to_le_bytes());
    }
}

/// Serialize an element onto a byte vector. Doesn't check if Array & Map structures make
/// sense, just writes elements out.
pub fn serialize_elem(buf: &mut Vec<u8>, elem: Element) {
    use self::Element::*;
    match elem {
        Null => buf.push(Marker::Null.into()),
        Bool(v) => buf.push(if v { Marker::True } else { Marker::False }.into()),
        Int(v) if v >= 0 => {
            let v = v as u64;
            if v <= 127 {
                buf.push(Marker::PosFixInt(v as u8).into());
            } else if v <= u8::MAX as u64 {
                buf.push(Marker::UInt8.into());
                buf.push(v as u8);
            } else if v <= u16::MAX as u64 {
                buf.push(Marker::UInt16.into());
                buf.extend_from_slice(&(v as u16).to_le_bytes());
            } else if v <= u32::MAX as u64 {
                buf.push(Marker::UInt32.into());
                buf.extend_from_slice(&(v as u32).to_le_bytes());
            } else {
                buf.push(Marker::UInt64.into());
                buf.extend_from_slice(&v.to_le_bytes());
            }
        }
        Int(v) => {
            if v >= -32 {
                buf.push(Marker::NegFixInt(v as i8).into());
            } else if v >= i8::MIN as i64 {
                buf.push(Marker::Int8.into());
                buf.push(v as u8);
            } else if v >= i16::MIN as i64 {
                buf.push(Marker::Int16.into());
                buf.extend_from_slice(&(v as i16).to_le_bytes());
            } else if v >= i32::MIN as i64 {
                buf.push(Marker::Int32.into());
                buf.extend_from_slice(&(v as i32).to_le_bytes());
            } else {
                buf.push(Marker::Int64.into());
                buf.extend_from_slice(&v.to_le_bytes());
            }
        }
        F64(v) => {
            buf.push(Marker::F64.into());
            buf.extend_from_slice(&v.to_bits().to_le_bytes());
        }
        Str(v) => {
            let len = v.len();
            if len <= 31 {
                buf.push(Marker::FixStr(len as u8).into());
            } else {
                write_len(buf, len, [Marker::Str8, Marker::Str16, Marker::Str32]);
            }
            buf.extend_from_slice(v.as_bytes());
        }
        Bin(v) => {
            write_len(buf, v.len(), [Marker::Bin8, Marker::Bin16, Marker::Bin32]);
            buf.extend_from_slice(v);
        }
        Array(len) => {
            if len <= 15 {
                buf.push(Marker::FixArray(len as u8).into());
            } else {
                write_len(buf, len, [Marker::Array8, Marker::Array16, Marker::Array32]);
            }
        }
        Map(len) => {
            if len <= 15 {
                buf.push(Marker::FixMap(len as u8).into());
            } else {
                write_len(buf, len, [Marker::Map8, Marker::Map16, Marker::Map32]);
            }
        }
    }
}

/// Iterator over the elements in a byte slice. Stops at the first error.
#[derive(Clone, Debug)]
pub struct Parser<'a> {
    data: &'a [u8],
    depth_tracking: DepthTracker,
    errored: bool,
}

impl<'a> Parser<'a> {
    pub fn new(data: &'a [u8]) -> Parser<'a> {
        Self {
            data,
            depth_tracking: DepthTracker::new(),
            errored: false,
        }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> &'a [u8] {
        self.data
    }

    fn read_u8(&mut self, step: &'static str) -> Result<u8> {
        self.data.read_u8().map_err(|_| Error::LengthTooShort {
            step,
            actual: 0,
            expected: 1,
        })
    }

    fn read_u16(&mut self, step: &'static str) -> Result<u16> {
        let actual = self.data.len();
        self.data
            .read_u16::<LittleEndian>()
            .map_err(|_| Error::LengthTooShort {
                step,
                actual,
                expected: 2,
            })
    }

    fn read_u32(&mut self, step: &'static str) -> Result<u32> {
        let actual = self.data.len();
        self.data
            .read_u32::<LittleEndian>()
            .map_err(|_| Error::LengthTooShort {
                step,
                actual,
                expected: 4,
            })
    }

    fn read_u64(&mut self, step: &'static str) -> Result<u64> {
        let actual = self.data.len();
        self.data
            .read_u64::<LittleEndian>()
            .map_err(|_| Error::LengthTooShort {
                step,
                actual,
                expected: 8,
            })
    }

    // Read a variable-width length, rejecting any length that should have used a shorter form.
    fn read_len(&mut self, width: u8, min: usize, step: &'static str) -> Result<usize> {
        let len = match width {
            1 => self.read_u8(step)? as usize,
            2 => self.read_u16(step)? as usize,
            _ => self.read_u32(step)? as usize,
        };
        if len < min {
            return Err(Error::BadEncode(format!(
                "Got length = {} on step [{}]. This is not the shortest encoding.",
                len, step
            )));
        }
        Ok(len)
    }

    fn take(&mut self, len: usize, step: &'static str) -> Result<&'a [u8]> {
        if len > self.data.len() {
            return Err(Error::LengthTooShort {
                step,
                actual: self.data.len(),
                expected: len,
            });
        }
        let (bytes, data) = self.data.split_at(len);
        self.data = data;
        Ok(bytes)
    }

    fn take_str(&mut self, len: usize, step: &'static str) -> Result<&'a str> {
        let bytes = self.take(len, step)?;
        std::str::from_utf8(bytes)
            .map_err(|e| Error::BadEncode(format!("String is not valid UTF-8: {}", e)))
    }

    // Each item in a container takes at least one byte, so a container can't claim more items
    // than there are bytes left.
    fn check_items(&self, items: usize, step: &'static str) -> Result<usize> {
        if items > self.data.len() {
            return Err(Error::LengthTooShort {
                step,
                actual: self.data.len(),
                expected: items,
            });
        }
        Ok(items)
    }

    fn not_shortest(name: &str, v: i128) -> Error {
        Error::BadEncode(format!(
            "Got {} with value = {}. This is not the shortest encoding.",
            name, v
        ))
    }

    // Given a retrieved marker, try to turn it into the next element, which may move through the
    // data. This function *does not* set the the errored flag. That's up to the caller.
    fn parse_element(&mut self, marker: Marker) -> Result<Element<'a>> {
        use self::Marker::*;
        let elem = match marker {
            Reserved => return Err(Error::BadEncode(String::from("Reserved marker found"))),
            Null => Element::Null,
            False => Element::Bool(false),
            True => Element::Bool(true),
            PosFixInt(v) => Element::Int(v.into()),
            NegFixInt(v) => Element::Int(v.into()),
            UInt8 => {
                let v = self.read_u8("decode UInt8")?;
                if v < 128 {
                    return Err(Self::not_shortest("UInt8", v.into()));
                }
                Element::Int(v.into())
            }
            UInt16 => {
                let v = self.read_u16("decode UInt16")?;
                if v <= u8::MAX as u16 {
                    return Err(Self::not_shortest("UInt16", v.into()));
                }
                Element::Int(v.into())
            }
            UInt32 => {
                let v = self.read_u32("decode UInt32")?;
                if v <= u16::MAX as u32 {
                    return Err(Self::not_shortest("UInt32", v.into()));
                }
                Element::Int(v.into())
            }
            UInt64 => {
                let v = self.read_u64("decode UInt64")?;
                if v <= u32::MAX as u64 {
                    return Err(Self::not_shortest("UInt64", v.into()));
                }
                let v = i64::try_from(v).map_err(|_| {
                    Error::BadEncode(format!("Got UInt64 with value = {}, out of range", v))
                })?;
                Element::Int(v)
            }
            Int8 => {
                let v = self.read_u8("decode Int8")? as i8;
                if v >= -32 {
                    return Err(Self::not_shortest("Int8", v.into()));
                }
                Element::Int(v.into())
            }
            Int16 => {
                let v = self.read_u16("decode Int16")? as i16;
                if v >= i8::MIN as i16 {
                    return Err(Self::not_shortest("Int16", v.into()));
                }
                Element::Int(v.into())
            }
            Int32 => {
                let v = self.read_u32("decode Int32")? as i32;
                if v >= i16::MIN as i32 {
                    return Err(Self::not_shortest("Int32", v.into()));
                }
                Element::Int(v.into())
            }
            Int64 => {
                let v = self.read_u64("decode Int64")? as i64;
                if v >= i32::MIN as i64 {
                    return Err(Self::not_shortest("Int64", v.into()));
                }
                Element::Int(v)
            }
            F64 => Element::F64(f64::from_bits(self.read_u64("decode F64")?)),
            Bin8 => {
                let len = self.read_len(1, 0, "decode Bin8 length")?;
                Element::Bin(self.take(len, "get Bin8 content")?)
            }
            Bin16 => {
                let len = self.read_len(2, 1 << 8, "decode Bin16 length")?;
                Element::Bin(self.take(len, "get Bin16 content")?)
            }
            Bin32 => {
                let len = self.read_len(4, 1 << 16, "decode Bin32 length")?;
                Element::Bin(self.take(len, "get Bin32 content")?)
            }
            FixStr(len) => Element::Str(self.take_str(len as usize, "get FixStr content")?),
            Str8 => {
                let len = self.read_len(1, 32, "decode Str8 length")?;
                Element::Str(self.take_str(len, "get Str8 content")?)
            }
            Str16 => {
                let len = self.read_len(2, 1 << 8, "decode Str16 length")?;
                Element::Str(self.take_str(len, "get Str16 content")?)
            }
            Str32 => {
                let len = self.read_len(4, 1 << 16, "decode Str32 length")?;
                Element::Str(self.take_str(len, "get Str32 content")?)
            }
            FixArray(len) => Element::Array(self.check_items(len as usize, "FixArray items")?),
            Array8 => {
                let len = self.read_len(1, 16, "decode Array8 length")?;
                Element::Array(self.check_items(len, "Array8 items")?)
            }
            Array16 => {
                let len = self.read_len(2, 1 << 8, "decode Array16 length")?;
                Element::Array(self.check_items(len, "Array16 items")?)
            }
            Array32 => {
                let len = self.read_len(4, 1 << 16, "decode Array32 length")?;
                Element::Array(self.check_items(len, "Array32 items")?)
            }
            FixMap(len) => Element::Map(self.check_items(2 * len as usize, "FixMap items")? / 2),
            Map8 => {
                let len = self.read_len(1, 16, "decode Map8 length")?;
                Element::Map(self.check_items(2 * len, "Map8 items")? / 2)
            }
            Map16 => {
                let len = self.read_len(2, 1 << 8, "decode Map16 length")?;
                Element::Map(self.check_items(2 * len, "Map16 items")? / 2)
            }
            Map32 => {
                let len = self.read_len(4, 1 << 16, "decode Map32 length")?;
                Element::Map(self.check_items(2 * len, "Map32 items")? / 2)
            }
        };
        Ok(elem)
    }
}

impl<'a> std::iter::Iterator for Parser<'a> {
    type Item = Result<Element<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.errored {
            return None;
        }
        let (&marker, data) = self.data.split_first()?;
        self.data = data;
        let result = self
            .parse_element(Marker::from_u8(marker))
            .and_then(|elem| self.depth_tracking.update_elem(&elem).map(|_| elem));
        if result.is_err() {
            self.errored = true;
        }
        Some(result)
    }
}
