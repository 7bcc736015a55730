//! Submitted requests and their single-use reply slots.

use tokio::sync::oneshot;

use crate::error::{IprotoError, Result};
use crate::protocol::Response;
use crate::query::Query;

/// Sending half of a reply slot. `send` consumes it, so a slot can be filled
/// at most once.
pub(crate) type ReplySender = oneshot::Sender<Result<Response>>;

/// Fill a reply slot. The caller may have stopped waiting (e.g. timed out),
/// in which case the value is dropped.
#[inline]
pub(crate) fn deliver(reply: ReplySender, value: Result<Response>) {
    let _ = reply.send(value);
}

/// One caller-submitted unit of work, not yet seen by the router.
pub(crate) struct Request {
    pub query: Box<dyn Query>,
    pub reply: ReplySender,
}

impl Request {
    /// Create a request and the handle its caller waits on.
    pub fn new(query: Box<dyn Query>) -> (Self, PendingReply) {
        let (tx, rx) = oneshot::channel();
        (Self { query, reply: tx }, PendingReply { rx })
    }

    /// Answer this request with an error without routing it.
    pub fn fail(self, err: IprotoError) {
        deliver(self.reply, Err(err));
    }
}

/// Handle to the single reply of a submitted request.
#[derive(Debug)]
pub struct PendingReply {
    rx: oneshot::Receiver<Result<Response>>,
}

impl PendingReply {
    /// Wait for the reply.
    ///
    /// Resolves exactly once: with the server's response, a request-local
    /// error, or `ConnectionClosed` if the connection went away first.
    pub async fn wait(self) -> Result<Response> {
        self.rx.await.unwrap_or(Err(IprotoError::ConnectionClosed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Ping;

    fn response(sync: u32) -> Response {
        Response {
            sync,
            code: 0,
            schema_version: None,
            data: None,
            error: None,
        }
    }

    #[tokio::test]
    async fn test_deliver_value() {
        let (request, pending) = Request::new(Box::new(Ping));
        deliver(request.reply, Ok(response(4)));

        assert_eq!(pending.wait().await.unwrap().sync, 4);
    }

    #[tokio::test]
    async fn test_fail() {
        let (request, pending) = Request::new(Box::new(Ping));
        request.fail(IprotoError::Query("bad".to_string()));

        assert!(matches!(pending.wait().await, Err(IprotoError::Query(_))));
    }

    #[tokio::test]
    async fn test_dropped_request_reads_as_closed() {
        let (request, pending) = Request::new(Box::new(Ping));
        drop(request);

        assert!(matches!(
            pending.wait().await,
            Err(IprotoError::ConnectionClosed)
        ));
    }

    #[test]
    fn test_deliver_to_gone_caller_is_silent() {
        let (request, pending) = Request::new(Box::new(Ping));
        drop(pending);
        deliver(request.reply, Ok(response(1)));
    }
}
