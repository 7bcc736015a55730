//! Codec module - serialization of query arguments and response data.
//!
//! - [`MsgPackCodec`] - MessagePack using `rmp-serde` for typed values and
//!   `rmpv` for dynamic ones
//!
//! # Design
//!
//! Codecs are marker structs with static methods rather than trait objects,
//! so the codec is picked at compile time.

mod msgpack;

pub use msgpack::MsgPackCodec;
