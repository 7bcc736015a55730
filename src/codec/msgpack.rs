//! MsgPack codec using `rmp-serde` and `rmpv`.
//!
//! Uses positional encoding (`rmp_serde::to_vec`): structs and tuples become
//! msgpack arrays, which is how the server represents tuples and argument
//! lists. Map-shaped structs are never what the server expects.
//!
//! # Example
//!
//! ```
//! use iproto_client::codec::MsgPackCodec;
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Serialize, Deserialize, PartialEq, Debug)]
//! struct User {
//!     id: u32,
//!     name: String,
//! }
//!
//! let user = User { id: 42, name: "alice".to_string() };
//! let encoded = MsgPackCodec::encode(&user).unwrap();
//! assert_eq!(encoded[0], 0x92); // fixarray, 2 elements
//! let decoded: User = MsgPackCodec::decode(&encoded).unwrap();
//! assert_eq!(decoded, user);
//! ```

use rmpv::Value;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{IprotoError, Result};

/// MessagePack codec for structured data.
pub struct MsgPackCodec;

impl MsgPackCodec {
    /// Encode a value to MsgPack bytes (positional, struct-as-array).
    ///
    /// # Errors
    ///
    /// Returns error if the value cannot be serialized.
    #[inline]
    pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec(value)?)
    }

    /// Encode a value that must come out as a msgpack array (a tuple or an
    /// argument list).
    ///
    /// `()` and other zero-sized values encode as nil; they stand for an
    /// empty argument list and come out as an empty array.
    pub fn encode_array<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
        let encoded = Self::encode(value)?;
        match encoded.first() {
            Some(0xc0) if std::mem::size_of_val(value) == 0 => Ok(vec![0x90]),
            Some(0x90..=0x9f) | Some(0xdc) | Some(0xdd) => Ok(encoded),
            Some(marker) => Err(IprotoError::Query(format!(
                "expected a msgpack array, got marker 0x{:02x}",
                marker
            ))),
            None => Err(IprotoError::Query("empty msgpack encoding".to_string())),
        }
    }

    /// Decode MsgPack bytes to a value.
    ///
    /// # Errors
    ///
    /// Returns error if the bytes cannot be deserialized to type T.
    #[inline]
    pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
        Ok(rmp_serde::from_slice(bytes)?)
    }

    /// Convert an already decoded dynamic value into a typed one.
    #[inline]
    pub fn from_value<T: DeserializeOwned>(value: Value) -> Result<T> {
        Ok(rmpv::ext::from_value(value)?)
    }
}
