//! Query collaborators - anything that can pack itself into a request frame.
//!
//! The connection never looks inside a query. It hands over the assigned
//! correlation ID and the connection's default space and gets wire bytes
//! back, or an encoding error that is delivered to that one caller only.
//!
//! # Example
//!
//! ```
//! use iproto_client::query::{Call, Query};
//!
//! let call = Call::new("box.info", ());
//! let frame = call.pack(1, "").unwrap();
//! assert_eq!(frame[0], 0xce);
//! ```

mod auth;

use bytes::Bytes;
use rmpv::Value;
use serde::Serialize;

use crate::codec::MsgPackCodec;
use crate::error::{IprotoError, Result};
use crate::protocol::{build_frame, codes, keys};

pub use auth::{scramble, Auth, AUTH_MECHANISM, SCRAMBLE_SIZE};

/// A request that can serialize itself.
pub trait Query: Send + 'static {
    /// Request type code written into the header.
    fn request_code(&self) -> u8;

    /// Append the request body (after the `{code, sync}` header) to `buf`.
    fn pack_body(&self, default_space: &str, buf: &mut Vec<u8>) -> Result<()>;

    /// Serialize the whole frame for the given correlation ID.
    ///
    /// Any failure is reported as [`IprotoError::Query`].
    fn pack(&self, request_id: u32, default_space: &str) -> Result<Bytes> {
        let mut body = Vec::new();
        self.pack_body(default_space, &mut body)
            .and_then(|()| build_frame(self.request_code(), request_id, &body))
            .map_err(|e| match e {
                IprotoError::Query(msg) => IprotoError::Query(msg),
                other => IprotoError::Query(other.to_string()),
            })
    }
}

impl Query for Box<dyn Query> {
    fn request_code(&self) -> u8 {
        (**self).request_code()
    }

    fn pack_body(&self, default_space: &str, buf: &mut Vec<u8>) -> Result<()> {
        (**self).pack_body(default_space, buf)
    }

    fn pack(&self, request_id: u32, default_space: &str) -> Result<Bytes> {
        (**self).pack(request_id, default_space)
    }
}

/// Liveness check with an empty body.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ping;

impl Query for Ping {
    fn request_code(&self) -> u8 {
        codes::PING
    }

    fn pack_body(&self, _default_space: &str, _buf: &mut Vec<u8>) -> Result<()> {
        Ok(())
    }
}

/// Call a stored function with positional arguments.
///
/// `args` must serialize to a msgpack array (a tuple, a `Vec`, or `()`).
#[derive(Debug, Clone)]
pub struct Call<A> {
    function: String,
    args: A,
}

impl<A: Serialize + Send + 'static> Call<A> {
    pub fn new(function: impl Into<String>, args: A) -> Self {
        Self {
            function: function.into(),
            args,
        }
    }
}

impl<A: Serialize + Send + 'static> Query for Call<A> {
    fn request_code(&self) -> u8 {
        codes::CALL
    }

    fn pack_body(&self, _default_space: &str, buf: &mut Vec<u8>) -> Result<()> {
        pack_named_with_args(buf, keys::FUNCTION_NAME, &self.function, &self.args)
    }
}

/// Evaluate an expression on the server with positional arguments.
#[derive(Debug, Clone)]
pub struct Eval<A> {
    expr: String,
    args: A,
}

impl<A: Serialize + Send + 'static> Eval<A> {
    pub fn new(expr: impl Into<String>, args: A) -> Self {
        Self {
            expr: expr.into(),
            args,
        }
    }
}

impl<A: Serialize + Send + 'static> Query for Eval<A> {
    fn request_code(&self) -> u8 {
        codes::EVAL
    }

    fn pack_body(&self, _default_space: &str, buf: &mut Vec<u8>) -> Result<()> {
        pack_named_with_args(buf, keys::EXPR, &self.expr, &self.args)
    }
}

/// `{name_key: name, TUPLE: args}`
fn pack_named_with_args<A: Serialize>(
    buf: &mut Vec<u8>,
    name_key: u8,
    name: &str,
    args: &A,
) -> Result<()> {
    let args = MsgPackCodec::encode_array(args)?;

    buf.push(0x82);
    buf.push(name_key);
    rmpv::encode::write_value(buf, &Value::from(name))?;
    buf.push(keys::TUPLE);
    buf.extend_from_slice(&args);
    Ok(())
}
