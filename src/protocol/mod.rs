//! Protocol module - wire format, framing, greeting and response decoding.
//!
//! This module implements the binary protocol spoken on the socket:
//! - 5-byte length prefix (`0xCE` + u32 BE) and the fixed request header
//! - Frame building and frame reading
//! - The 128-byte server greeting
//! - Decoding reply bodies into correlated [`Response`]s

mod frame;
mod greeting;
mod response;
mod wire_format;

pub use frame::{build_frame, read_frame, write_frame};
pub use greeting::Greeting;
pub use response::{decode_response, Response, ServerError};
pub use wire_format::{
    codes, decode_length_prefix, encode_length_prefix, encode_request_header, keys,
    GREETING_SALT_SIZE, GREETING_SIZE, GREETING_VERSION_SIZE, LENGTH_MARKER, LENGTH_PREFIX_SIZE,
    MAX_BODY_SIZE, REQUEST_HEADER_SIZE,
};

#[cfg(test)]
pub(crate) use greeting::tests::{raw_greeting, TEST_SALT};
#[cfg(test)]
pub(crate) use response::tests::{error_body, ok_body};
