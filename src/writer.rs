//! Writer stage - drains the outbound queue onto the socket.
//!
//! Frames arrive already encoded from the router and are written whole, one
//! at a time, in queue order. Each frame is flushed before the next is taken,
//! so a request never sits in a user-space buffer while its caller waits.
//!
//! ```text
//! Router ─► mpsc::Receiver<Bytes> ─► Writer ─► socket write half
//! ```

use bytes::Bytes;
use tokio::io::AsyncWrite;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::error::Result;
use crate::protocol::write_frame;
use crate::shutdown::Shutdown;

/// Write frames until the queue closes, shutdown fires, or a write fails.
///
/// A write in progress is abandoned when shutdown fires. Write errors are
/// returned without retry.
pub(crate) async fn write_loop<W>(
    mut writer: W,
    mut outbound: mpsc::Receiver<Bytes>,
    shutdown: Shutdown,
) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    loop {
        let frame = tokio::select! {
            _ = shutdown.wait() => break,
            frame = outbound.recv() => match frame {
                Some(frame) => frame,
                None => break,
            },
        };

        tokio::select! {
            _ = shutdown.wait() => break,
            written = write_frame(&mut writer, &frame) => {
                written?;
                trace!(len = frame.len(), "frame written");
            }
        }
    }

    debug!("writer stopped");
    Ok(())
}
