//! Reader stage - turns socket bytes into correlated responses.

use bytes::Bytes;
use tokio::io::{AsyncRead, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::error::{IprotoError, Result};
use crate::protocol::{decode_response, read_frame, Response};
use crate::shutdown::Shutdown;

/// Read frames and push decoded responses to the router.
///
/// Stops cleanly on shutdown, on end of stream, or when the router is gone.
/// A framing or decode failure is returned as an error: the stream position
/// can no longer be trusted after one.
pub(crate) async fn read_loop<R>(
    reader: R,
    responses: mpsc::Sender<Response>,
    shutdown: Shutdown,
) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);

    loop {
        let body: Bytes = tokio::select! {
            _ = shutdown.wait() => break,
            frame = read_frame(&mut reader) => match frame {
                Ok(body) => body,
                Err(IprotoError::ConnectionClosed) => {
                    debug!("server closed the connection");
                    break;
                }
                Err(e) => return Err(e),
            },
        };

        let response = decode_response(&body)?;
        trace!(
            request_id = response.sync,
            code = response.code,
            "response decoded"
        );

        tokio::select! {
            _ = shutdown.wait() => break,
            sent = responses.send(response) => {
                if sent.is_err() {
                    break;
                }
            }
        }
    }

    debug!("reader stopped");
    Ok(())
}
