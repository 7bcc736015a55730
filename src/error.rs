//! Error types for iproto-client.

use std::time::Duration;

use thiserror::Error;

use crate::protocol::ServerError;

/// Main error type for all client operations.
#[derive(Debug, Error)]
pub enum IprotoError {
    /// I/O error on the TCP socket.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Connect + handshake did not finish before the deadline.
    #[error("Connect timed out after {0:?}")]
    ConnectTimeout(Duration),

    /// Malformed `host:port[/space]` address.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Protocol error (bad frame marker, zero length, undecodable body, etc.).
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Authentication failed during the handshake.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Server reported an error for a request.
    #[error(transparent)]
    Server(#[from] ServerError),

    /// A query could not produce valid wire bytes.
    #[error("Query error: {0}")]
    Query(String),

    /// The request was failed by the connection itself (e.g. its ID was reissued).
    #[error("Connection error: {0}")]
    Connection(String),

    /// Connection closed before a reply arrived.
    #[error("Connection closed")]
    ConnectionClosed,

    /// No reply within the query timeout.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// MsgPack serialization error.
    #[error("MsgPack encode error: {0}")]
    MsgPackEncode(#[from] rmp_serde::encode::Error),

    /// MsgPack deserialization error.
    #[error("MsgPack decode error: {0}")]
    MsgPackDecode(#[from] rmp_serde::decode::Error),

    /// Error writing a dynamic MsgPack value.
    #[error("MsgPack value encode error: {0}")]
    ValueEncode(#[from] rmpv::encode::Error),

    /// Error reading a dynamic MsgPack value.
    #[error("MsgPack value decode error: {0}")]
    ValueDecode(#[from] rmpv::decode::Error),

    /// Error converting a dynamic MsgPack value into a typed one.
    #[error("MsgPack value conversion error: {0}")]
    ValueConvert(#[from] rmpv::ext::Error),

    /// Greeting salt was not valid base64.
    #[error("Invalid greeting salt: {0}")]
    Salt(#[from] base64::DecodeError),
}

/// Result type alias using IprotoError.
pub type Result<T> = std::result::Result<T, IprotoError>;
