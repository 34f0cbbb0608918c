//! Binary vector format shared with collaborators.
//!
//! Dense vectors cross process boundaries as contiguous little-endian
//! IEEE-754 float32 arrays. Endianness is fixed by contract, not by host.

use thiserror::Error;

/// Errors raised while decoding wire-format vectors.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum WireError {
    /// The payload length is not a multiple of four bytes.
    #[error("payload of {len} bytes is not a whole number of f32 values")]
    TruncatedPayload {
        /// Observed payload length.
        len: usize,
    },
}

/// Encodes a vector as contiguous little-endian f32 bytes.
///
/// # Examples
/// ```
/// use kiji_core::wire::{decode_f32_le, encode_f32_le};
///
/// let bytes = encode_f32_le(&[1.0, -2.5]);
/// assert_eq!(bytes.len(), 8);
/// assert_eq!(decode_f32_le(&bytes).expect("payload is aligned"), vec![1.0, -2.5]);
/// ```
#[must_use]
pub fn encode_f32_le(values: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(values.len() * 4);
    for value in values {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Decodes contiguous little-endian f32 bytes.
///
/// # Errors
/// Returns [`WireError::TruncatedPayload`] when `bytes` is not a multiple of
/// four bytes long.
pub fn decode_f32_le(bytes: &[u8]) -> Result<Vec<f32>, WireError> {
    if bytes.len() % 4 != 0 {
        return Err(WireError::TruncatedPayload { len: bytes.len() });
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}
