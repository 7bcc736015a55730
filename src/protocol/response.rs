//! Decoding inbound frame bodies into correlated responses.
//!
//! A body is two consecutive msgpack maps: the header (`code`, `sync`,
//! `schema_version`) and an optional body map holding either `data` or an
//! error message. Server-side failures are returned as data in
//! [`Response::error`], never as a decode error.

use rmpv::Value;
use serde::de::DeserializeOwned;
use thiserror::Error;

use super::wire_format::{codes, keys};
use crate::codec::MsgPackCodec;
use crate::error::{IprotoError, Result};

/// Error reported by the server for a single request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Server error {code}: {message}")]
pub struct ServerError {
    /// Server error code (response code without the error bit).
    pub code: u32,
    /// Human readable message.
    pub message: String,
}

/// One decoded reply.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// Correlation ID copied from the request.
    pub sync: u32,
    /// Raw response code (0 = OK).
    pub code: u32,
    /// Schema version reported by the server, if any.
    pub schema_version: Option<u64>,
    /// Result payload (usually an array of tuples).
    pub data: Option<Value>,
    /// Inline server error.
    pub error: Option<ServerError>,
}

impl Response {
    /// Check if the server reported an error.
    #[inline]
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Turn an inline server error into `Err(IprotoError::Server)`.
    pub fn into_result(self) -> Result<Self> {
        match self.error {
            Some(err) => Err(IprotoError::Server(err)),
            None => Ok(self),
        }
    }

    /// Deserialize the data field. A missing data field decodes from nil.
    pub fn decode_data<T: DeserializeOwned>(&self) -> Result<T> {
        MsgPackCodec::from_value(self.data.clone().unwrap_or(Value::Nil))
    }
}

/// Decode a frame body (everything after the length prefix).
pub fn decode_response(body: &[u8]) -> Result<Response> {
    let mut cursor = body;

    let header = rmpv::decode::read_value(&mut cursor)?;
    let payload = if cursor.is_empty() {
        None
    } else {
        Some(rmpv::decode::read_value(&mut cursor)?)
    };

    let code = map_get(&header, keys::CODE)
        .and_then(Value::as_u64)
        .ok_or_else(|| IprotoError::Protocol("Response header has no code".to_string()))?;

    let sync = map_get(&header, keys::SYNC)
        .and_then(Value::as_u64)
        .ok_or_else(|| IprotoError::Protocol("Response header has no sync".to_string()))?;

    let sync = u32::try_from(sync)
        .map_err(|_| IprotoError::Protocol(format!("Response sync {} out of range", sync)))?;

    let code = u32::try_from(code)
        .map_err(|_| IprotoError::Protocol(format!("Response code {} out of range", code)))?;

    let schema_version = map_get(&header, keys::SCHEMA_VERSION).and_then(Value::as_u64);

    let mut response = Response {
        sync,
        code,
        schema_version,
        data: None,
        error: None,
    };

    if code & codes::ERROR_FLAG != 0 {
        let message = payload
            .as_ref()
            .and_then(|p| map_get(p, keys::ERROR))
            .and_then(Value::as_str)
            .unwrap_or("unknown error")
            .to_string();
        response.error = Some(ServerError {
            code: code & !codes::ERROR_FLAG,
            message,
        });
    } else {
        response.data = payload.as_ref().and_then(|p| map_get(p, keys::DATA)).cloned();
    }

    Ok(response)
}

/// Look up an integer key in a msgpack map.
fn map_get(map: &Value, key: u8) -> Option<&Value> {
    map.as_map()?
        .iter()
        .find(|(k, _)| k.as_u64() == Some(key as u64))
        .map(|(_, v)| v)
}
