//! # iproto-client
//!
//! Async client for the iproto binary protocol, multiplexing any number of
//! concurrent requests over one TCP connection.
//!
//! ## Architecture
//!
//! - **Handshake** (caller task): TCP connect, 128-byte greeting, optional
//!   `chap-sha1` authentication, all under one deadline
//! - **Pipeline** (background tasks): router (IDs, pending registry,
//!   backpressure), writer (outbound frames) and reader (inbound frames),
//!   joined by bounded channels and torn down by a one-time shutdown signal
//!
//! Every submitted request gets exactly one reply: the server's response, a
//! request-local error, or `ConnectionClosed`.
//!
//! ## Example
//!
//! ```no_run
//! use iproto_client::query::Eval;
//! use iproto_client::{Connection, Options};
//!
//! #[tokio::main]
//! async fn main() -> iproto_client::Result<()> {
//!     let conn = Connection::connect("127.0.0.1:3301", Options::default()).await?;
//!
//!     let reply = conn.execute(Eval::new("return 1 + 1", ())).await?.into_result()?;
//!     let (sum,): (u32,) = reply.decode_data()?;
//!     assert_eq!(sum, 2);
//!
//!     conn.close().await;
//!     Ok(())
//! }
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod protocol;
pub mod query;

mod backpressure;
mod connection;
mod reader;
mod router;
mod shutdown;
mod writer;

pub use config::{Options, PipelineConfig};
pub use connection::{Connection, ConnectionBuilder, ConnectionState};
pub use error::{IprotoError, Result};
pub use protocol::{Response, ServerError};
pub use router::PendingReply;
