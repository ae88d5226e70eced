use crate::{compress::CompressionError, store::NodeId, value::Value};
use std::fmt;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Boxed error returned by a [`NodeStore`][crate::NodeStore] implementation.
pub type StoreError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug)]
pub enum Error {
    /// Occurs in strict mode when a node that has an id is read before its data was populated
    /// through [`NodeData::bind`][crate::NodeData::bind].
    NodeUnpopulated(NodeId),
    /// Occurs when a bound document carries a reference token from the field's current reference
    /// version, but the token doesn't match the one expected by the owning record.
    NodeIntegrityFailure {
        id: Option<NodeId>,
        expected: Value,
        actual: Option<Value>,
    },
    /// The node store failed to complete a request.
    Store(StoreError),
    /// Occurs when the header (compression marker) failed to parse correctly.
    BadHeader(String),
    /// Occurs when zstd compression or decompression fails.
    FailDecompress(CompressionError),
    /// Encoded data was greater than maximum allowed size on decode
    LengthTooLong { max: usize, actual: usize },
    /// Encoded data ended too early.
    LengthTooShort {
        step: &'static str,
        actual: usize,
        expected: usize,
    },
    /// Basic encoding failure
    BadEncode(String),
    /// Decoding hit some parsing limit.
    ParseLimit(String),
}

impl Error {
    /// Wrap any error raised by a node store.
    pub fn store<E>(err: E) -> Self
    where
        E: Into<StoreError>,
    {
        Error::Store(err.into())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::NodeUnpopulated(ref id) => write!(
                f,
                "Node {} was accessed before its data was populated",
                id
            ),
            Error::NodeIntegrityFailure {
                ref id,
                ref expected,
                ref actual,
            } => {
                let id = id.as_ref().map_or("<unsaved>", |id| id.as_str());
                match actual {
                    Some(actual) => write!(
                        f,
                        "Node reference for {} is invalid: {:?} != {:?}",
                        id, expected, actual
                    ),
                    None => write!(
                        f,
                        "Node reference for {} is invalid: expected {:?}, node has none",
                        id, expected
                    ),
                }
            }
            Error::Store(ref err) => write!(f, "Node store failure: {}", err),
            Error::BadHeader(ref err) => write!(f, "Data has bad header format: {}", err),
            Error::FailDecompress(ref err) => write!(f, "Failed decompression step: {}", err),
            Error::LengthTooLong { max, actual } => write!(
                f,
                "Data too long: was {} bytes, maximum allowed is {}",
                actual, max
            ),
            Error::LengthTooShort {
                step,
                actual,
                expected,
            } => write!(
                f,
                "Expected data length {}, but got {} on step [{}]",
                expected, actual, step
            ),
            Error::BadEncode(ref err) => write!(f, "Basic data encoding failure: {}", err),
            Error::ParseLimit(ref err) => write!(f, "Hit parsing limit: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match *self {
            Error::Store(ref err) => Some(&**err),
            Error::FailDecompress(ref err) => Some(err),
            _ => None,
        }
    }
}

impl std::convert::From<CompressionError> for Error {
    fn from(e: CompressionError) -> Self {
        Self::FailDecompress(e)
    }
}
