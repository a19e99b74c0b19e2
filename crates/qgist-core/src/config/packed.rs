//! Packed values: compact string encoding for large settings such as the
//! plugin release cache.
//!
//! ```text
//! REPO_V001 <16-digit length> <base64(zlib(json))>
//! ```
//!
//! The length counts the base64 payload only and is zero-padded, so a
//! truncated or concatenated value is caught before decoding.

use std::io::{Read, Write};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use serde_json::Value;
use thiserror::Error;

use crate::error::ConfigError;

/// Format tag at the start of every packed value.
pub const PACKING_VERSION: &str = "REPO_V001";

/// Width of the zero-padded length field.
const LENGTH_WIDTH: usize = 16;

/// Why a packed value could not be produced or read back.
#[derive(Debug, Error)]
pub enum PackError {
    #[error("data must start with REPO_V001")]
    Version,

    #[error("data does not have a numeric length field")]
    Length,

    #[error("length field says {declared} but payload has {actual} characters")]
    LengthMismatch { declared: usize, actual: usize },

    #[error("payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("payload could not be (de)compressed: {0}")]
    Compression(#[from] std::io::Error),

    #[error("payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl PackError {
    /// Report this failure as an invalid value of `key`.
    pub fn for_key(self, key: &str) -> ConfigError {
        ConfigError::validation(key, self.to_string())
    }
}

/// Encode `value` as a packed string.
pub fn pack_value(value: &Value) -> Result<String, PackError> {
    let json = serde_json::to_vec(value)?;
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&json)?;
    let payload = STANDARD.encode(encoder.finish()?);
    Ok(format!("{PACKING_VERSION}{:0width$}{payload}", payload.len(), width = LENGTH_WIDTH))
}

/// Decode a string produced by [`pack_value`].
pub fn unpack_value(data: &str) -> Result<Value, PackError> {
    let rest = data.strip_prefix(PACKING_VERSION).ok_or(PackError::Version)?;
    let length = rest
        .get(..LENGTH_WIDTH)
        .filter(|digits| digits.bytes().all(|b| b.is_ascii_digit()))
        .ok_or(PackError::Length)?;
    let declared: usize = length.parse().map_err(|_| PackError::Length)?;

    let payload = &rest[LENGTH_WIDTH..];
    let actual = payload.chars().count();
    if declared != actual {
        return Err(PackError::LengthMismatch { declared, actual });
    }

    let compressed = STANDARD.decode(payload)?;
    let mut json = String::new();
    ZlibDecoder::new(compressed.as_slice()).read_to_string(&mut json)?;
    Ok(serde_json::from_str(&json)?)
}
