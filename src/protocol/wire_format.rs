//! Wire format constants and the length prefix.
//!
//! Every frame starts with a 5-byte length prefix:
//! ```text
//! ┌────────┬──────────────┬───────────────────────┐
//! │ Marker │ Body length  │ Body                  │
//! │ 0xCE   │ uint32 BE    │ header map + payload  │
//! └────────┴──────────────┴───────────────────────┘
//! ```
//!
//! Requests carry a fixed-shape 2-entry header map right after the prefix:
//! ```text
//! 0x82 | 0x00 <code> | 0x01 0xCE <sync uint32 BE>
//! ```

use crate::error::{IprotoError, Result};

/// msgpack `uint32` marker, used as the frame length marker.
pub const LENGTH_MARKER: u8 = 0xce;

/// Size of the length prefix (marker + u32).
pub const LENGTH_PREFIX_SIZE: usize = 5;

/// Size of the request header map written after the prefix.
pub const REQUEST_HEADER_SIZE: usize = 9;

/// Largest body the reader accepts (1 GiB).
pub const MAX_BODY_SIZE: u32 = 1 << 30;

/// Greeting banner size.
pub const GREETING_SIZE: usize = 128;

/// Version line occupies the first half of the greeting.
pub const GREETING_VERSION_SIZE: usize = 64;

/// Base64 salt length inside the greeting.
pub const GREETING_SALT_SIZE: usize = 44;

/// Header and body map keys.
pub mod keys {
    pub const CODE: u8 = 0x00;
    pub const SYNC: u8 = 0x01;
    pub const SCHEMA_VERSION: u8 = 0x05;
    pub const TUPLE: u8 = 0x21;
    pub const FUNCTION_NAME: u8 = 0x22;
    pub const USER_NAME: u8 = 0x23;
    pub const EXPR: u8 = 0x27;
    pub const DATA: u8 = 0x30;
    pub const ERROR: u8 = 0x31;
}

/// Request type codes.
pub mod codes {
    pub const SELECT: u8 = 1;
    pub const INSERT: u8 = 2;
    pub const REPLACE: u8 = 3;
    pub const UPDATE: u8 = 4;
    pub const DELETE: u8 = 5;
    pub const CALL_16: u8 = 6;
    pub const AUTH: u8 = 7;
    pub const EVAL: u8 = 8;
    pub const UPSERT: u8 = 9;
    pub const CALL: u8 = 10;
    pub const PING: u8 = 64;

    /// Response code bit marking an error reply.
    pub const ERROR_FLAG: u32 = 0x8000;
}

/// Encode the length prefix for a body of `body_len` bytes.
#[inline]
pub fn encode_length_prefix(body_len: u32) -> [u8; LENGTH_PREFIX_SIZE] {
    let len = body_len.to_be_bytes();
    [LENGTH_MARKER, len[0], len[1], len[2], len[3]]
}

/// Decode and validate a length prefix, returning the body length.
///
/// Rejects a wrong marker byte, a zero length and anything above
/// [`MAX_BODY_SIZE`].
pub fn decode_length_prefix(prefix: &[u8; LENGTH_PREFIX_SIZE]) -> Result<u32> {
    if prefix[0] != LENGTH_MARKER {
        return Err(IprotoError::Protocol(format!(
            "Wrong length marker 0x{:02x}",
            prefix[0]
        )));
    }

    let body_len = u32::from_be_bytes([prefix[1], prefix[2], prefix[3], prefix[4]]);

    if body_len == 0 {
        return Err(IprotoError::Protocol(
            "Frame body should not be 0 length".to_string(),
        ));
    }

    if body_len > MAX_BODY_SIZE {
        return Err(IprotoError::Protocol(format!(
            "Frame body size {} exceeds maximum {}",
            body_len, MAX_BODY_SIZE
        )));
    }

    Ok(body_len)
}

/// Encode the fixed request header map `{code, sync}`.
#[inline]
pub fn encode_request_header(code: u8, sync: u32) -> [u8; REQUEST_HEADER_SIZE] {
    let id = sync.to_be_bytes();
    [
        0x82, // 2 element map
        keys::CODE,
        code,
        keys::SYNC,
        LENGTH_MARKER,
        id[0],
        id[1],
        id[2],
        id[3],
    ]
}
