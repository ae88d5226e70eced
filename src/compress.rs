//! Byte-level compression of encoded values.
//!
//! Compressed output starts with a single [`CompressType`] byte. With no compression, the
//! encoded bytes follow as-is. With general compression, a standard zstd frame follows, always
//! carrying its content size and a checksum so that corrupted input is caught on decompression.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{cell::RefCell, convert::TryFrom, fmt};

thread_local! {
    static ZSTD_CCTX: RefCell<zstd_safe::CCtx<'static>> = RefCell::new(zstd_safe::CCtx::create());
    static ZSTD_DCTX: RefCell<zstd_safe::DCtx<'static>> = RefCell::new(zstd_safe::DCtx::create());
}

#[derive(Debug, Clone)]
pub enum CompressionError {
    ExceededSize { max: usize, actual: usize },
    ZstdInner(usize),
    Parsing(&'static str),
}

impl fmt::Display for CompressionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompressionError::ExceededSize { max, actual } => write!(
                f,
                "Decompressed size is {} bytes, larger than max of {} kiB",
                actual,
                (max + 1) >> 10
            ),
            CompressionError::ZstdInner(v) => {
                write!(f, "zstd failure, code {} ({})", v, zstd_safe::get_error_name(*v))
            }
            CompressionError::Parsing(s) => f.write_str(s),
        }
    }
}

impl std::error::Error for CompressionError {}

impl From<zstd_safe::ErrorCode> for CompressionError {
    fn from(value: zstd_safe::ErrorCode) -> Self {
        CompressionError::ZstdInner(value)
    }
}

/// The compression algorithm identifier for `zstandard`.
pub const ALGORITHM_ZSTD: u8 = 0;

/// Marker byte at the front of all compressed output.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum CompressType {
    /// No compression
    None,
    /// Standard Compression
    General,
}

impl From<CompressType> for u8 {
    fn from(val: CompressType) -> u8 {
        match val {
            CompressType::None => 0,
            CompressType::General => 1,
        }
    }
}

impl TryFrom<u8> for CompressType {
    type Error = u8;
    fn try_from(val: u8) -> Result<CompressType, u8> {
        match val {
            0 => Ok(CompressType::None),
            1 => Ok(CompressType::General),
            _ => Err(val),
        }
    }
}

/// Compression settings for pointer records.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub enum Compress {
    /// Don't compress.
    None,
    /// Compress using the given algorithm identifier and compression level.
    General {
        /// The algorithm's identifier
        algorithm: u8,
        /// The compression level
        level: u8,
    },
}

impl Compress {
    /// Create a new general Zstd Compression setting.
    pub fn new_zstd_general(level: u8) -> Self {
        Compress::General {
            algorithm: ALGORITHM_ZSTD,
            level,
        }
    }

    /// Compress the data, prefixed with the compression marker byte. If compression is disabled,
    /// or doesn't make the data any smaller, the data is stored uncompressed instead.
    pub fn compress(&self, src: &[u8]) -> Result<Vec<u8>> {
        if let Compress::General { level, .. } = self {
            let mut dst = Vec::with_capacity(zstd_safe::compress_bound(src.len()) + 1);
            dst.push(CompressType::General.into());
            zstd_compress(src, &mut dst, *level as i32)?;
            if dst.len() < src.len() + 1 {
                return Ok(dst);
            }
        }
        let mut dst = Vec::with_capacity(src.len() + 1);
        dst.push(CompressType::None.into());
        dst.extend_from_slice(src);
        Ok(dst)
    }
}

impl std::default::Default for Compress {
    fn default() -> Self {
        Compress::General {
            algorithm: ALGORITHM_ZSTD,
            level: 3,
        }
    }
}

/// Undo [`Compress::compress`]. Fails if the marker byte is unrecognized, the zstd frame is
/// damaged, or the result would be larger than `max_size`.
pub fn decompress(src: &[u8], max_size: usize) -> Result<Vec<u8>> {
    let (&marker, data) = src.split_first().ok_or(Error::LengthTooShort {
        step: "get compress type",
        actual: 0,
        expected: 1,
    })?;
    let marker = CompressType::try_from(marker)
        .map_err(|v| Error::BadHeader(format!("Unrecognized compression type {}", v)))?;
    match marker {
        CompressType::None => {
            if data.len() > max_size {
                return Err(Error::LengthTooLong {
                    max: max_size,
                    actual: data.len(),
                });
            }
            Ok(data.to_vec())
        }
        CompressType::General => {
            let mut dst = Vec::new();
            zstd_decompress(data, &mut dst, max_size)?;
            Ok(dst)
        }
    }
}

fn zstd_compress(input: &[u8], output: &mut Vec<u8>, level: i32) -> Result<usize, CompressionError> {
    use zstd_safe::*;
    ZSTD_CCTX.with_borrow_mut(|ctx| {
        ctx.reset(ResetDirective::SessionAndParameters)?;
        ctx.set_parameter(CParameter::CompressionLevel(level))?;
        ctx.set_parameter(CParameter::ChecksumFlag(true))?;
        ctx.set_parameter(CParameter::ContentSizeFlag(true))?;
        ctx.set_pledged_src_size(Some(input.len() as u64))?;

        let mut frame = Vec::with_capacity(compress_bound(input.len()));
        let used_len = ctx.compress2(&mut frame, input)?;
        output.extend_from_slice(&frame);
        Ok(used_len)
    })
}

fn zstd_decompress(
    input: &[u8],
    output: &mut Vec<u8>,
    max_size: usize,
) -> Result<usize, CompressionError> {
    use zstd_safe::*;

    let out_size = match get_frame_content_size(input) {
        Ok(Some(size)) => size,
        Ok(None) => return Err(CompressionError::Parsing("Missing frame content size")),
        Err(_) => return Err(CompressionError::Parsing("Not a valid zstd frame header")),
    };
    if out_size > max_size as u64 {
        return Err(CompressionError::ExceededSize {
            max: max_size,
            actual: out_size as usize,
        });
    }
    let out_size = out_size as usize;
    output.reserve(out_size);

    ZSTD_DCTX.with_borrow_mut(|dtx| {
        dtx.reset(ResetDirective::SessionAndParameters)?;
        dtx.set_parameter(DParameter::WindowLogMax(27))?;

        let mut frame = Vec::with_capacity(out_size);
        let used_len = dtx.decompress(&mut frame, input)?;
        if used_len != out_size {
            return Err(CompressionError::Parsing(
                "Decompressed size doesn't match promised size",
            ));
        }
        output.extend_from_slice(&frame);
        Ok(used_len)
    })
}
