//! Building outgoing frames and reading incoming ones.
//!
//! Frames are plain `bytes::Bytes` so the writer can hand them to the socket
//! without copying.
//!
//! # Example
//!
//! ```
//! use iproto_client::protocol::{build_frame, codes, LENGTH_PREFIX_SIZE, REQUEST_HEADER_SIZE};
//!
//! let frame = build_frame(codes::PING, 1, &[]).unwrap();
//! assert_eq!(frame.len(), LENGTH_PREFIX_SIZE + REQUEST_HEADER_SIZE);
//! assert_eq!(frame[0], 0xce);
//! ```

use std::io::ErrorKind;

use bytes::{BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::wire_format::{
    decode_length_prefix, encode_length_prefix, encode_request_header, LENGTH_PREFIX_SIZE,
    MAX_BODY_SIZE, REQUEST_HEADER_SIZE,
};
use crate::error::{IprotoError, Result};

/// Build a complete request frame: length prefix, `{code, sync}` header, body.
///
/// # Errors
///
/// `Protocol` if header plus body exceed [`MAX_BODY_SIZE`].
pub fn build_frame(code: u8, sync: u32, body: &[u8]) -> Result<Bytes> {
    let body_len = frame_body_len(body.len())?;

    let mut buf = BytesMut::with_capacity(LENGTH_PREFIX_SIZE + body_len as usize);
    buf.put_slice(&encode_length_prefix(body_len));
    buf.put_slice(&encode_request_header(code, sync));
    buf.put_slice(body);
    Ok(buf.freeze())
}

/// Length announced in the prefix for a request body of `body_len` bytes.
fn frame_body_len(body_len: usize) -> Result<u32> {
    REQUEST_HEADER_SIZE
        .checked_add(body_len)
        .and_then(|len| u32::try_from(len).ok())
        .filter(|len| *len <= MAX_BODY_SIZE)
        .ok_or_else(|| {
            IprotoError::Protocol(format!("request body of {} bytes is too large", body_len))
        })
}

/// Read one length-prefixed frame and return its body (header map + payload).
///
/// # Errors
///
/// Returns an error if:
/// - The stream ends (`ConnectionClosed`)
/// - The marker byte is not `0xCE`, the length is zero or too large (`Protocol`)
/// - The body cannot be read completely (`Io` / `ConnectionClosed`)
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Bytes> {
    let mut prefix = [0u8; LENGTH_PREFIX_SIZE];
    reader.read_exact(&mut prefix).await.map_err(eof_as_closed)?;

    let body_len = decode_length_prefix(&prefix)?;

    let mut body = vec![0u8; body_len as usize];
    reader.read_exact(&mut body).await.map_err(eof_as_closed)?;

    Ok(Bytes::from(body))
}

/// Write one frame and flush.
pub async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, frame: &[u8]) -> Result<()> {
    writer.write_all(frame).await?;
    writer.flush().await?;
    Ok(())
}

fn eof_as_closed(err: std::io::Error) -> IprotoError {
    if err.kind() == ErrorKind::UnexpectedEof {
        IprotoError::ConnectionClosed
    } else {
        IprotoError::Io(err)
    }
}
