//! Router stage - the request multiplexer.
//!
//! The router is the only task that issues correlation IDs and touches the
//! pending-request registry. Everything else talks to it through bounded
//! channels:
//!
//! ```text
//! callers ──► submissions ──┐
//!                           ├─► Router ──► outbound ──► Writer ──► socket
//! Reader ───► responses  ───┘     │
//!                                 └──► reply slots ──► callers
//! ```
//!
//! When the response queue holds more than its backpressure threshold, the
//! submission branch is switched off until the backlog drains.

mod registry;
mod request;
mod request_id;

use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::{trace, warn};

use crate::backpressure::IntakeGate;
use crate::error::IprotoError;
use crate::protocol::Response;
use crate::shutdown::Shutdown;
use request::deliver;

pub(crate) use registry::RequestRegistry;
pub(crate) use request::Request;
pub use request::PendingReply;
pub(crate) use request_id::RequestIdAllocator;

/// What the router hands back when it stops, for final cleanup.
pub(crate) struct RouterRemains {
    /// Requests that were routed but never answered.
    pub registry: RequestRegistry,
    /// Submission queue, possibly still holding unrouted requests.
    pub submissions: mpsc::Receiver<Request>,
}

impl RouterRemains {
    /// Fail everything left over with `ConnectionClosed`.
    ///
    /// The submission queue is closed first so nothing can slip in after
    /// the drain. Returns the number of requests failed.
    pub fn fail_all(mut self) -> usize {
        let mut failed = self.registry.fail_all(|| IprotoError::ConnectionClosed);

        self.submissions.close();
        while let Ok(request) = self.submissions.try_recv() {
            request.fail(IprotoError::ConnectionClosed);
            failed += 1;
        }
        failed
    }
}

pub(crate) struct Router {
    submissions: mpsc::Receiver<Request>,
    responses: mpsc::Receiver<Response>,
    outbound: mpsc::Sender<Bytes>,
    shutdown: Shutdown,
    registry: RequestRegistry,
    ids: RequestIdAllocator,
    intake: IntakeGate,
    default_space: String,
}

impl Router {
    pub fn new(
        submissions: mpsc::Receiver<Request>,
        responses: mpsc::Receiver<Response>,
        outbound: mpsc::Sender<Bytes>,
        shutdown: Shutdown,
        ids: RequestIdAllocator,
        intake: IntakeGate,
        default_space: String,
    ) -> Self {
        Self {
            submissions,
            responses,
            outbound,
            shutdown,
            registry: RequestRegistry::new(),
            ids,
            intake,
            default_space,
        }
    }

    /// Main loop. Runs until shutdown fires or an input channel closes.
    pub async fn run(mut self) -> RouterRemains {
        trace!(threshold = self.intake.threshold(), "router started");

        loop {
            // force reading replies while the response backlog is high
            let accepting = self.intake.is_open(self.responses.len());

            tokio::select! {
                _ = self.shutdown.wait() => break,

                request = self.submissions.recv(), if accepting => match request {
                    Some(request) => {
                        if !self.accept(request).await {
                            break;
                        }
                    }
                    None => break,
                },

                response = self.responses.recv() => match response {
                    Some(response) => self.route_reply(response),
                    None => break,
                },
            }
        }

        trace!(pending = self.registry.len(), "router stopped");

        RouterRemains {
            registry: self.registry,
            submissions: self.submissions,
        }
    }

    /// Assign an ID, register and forward one request.
    ///
    /// Returns `false` if the loop must stop (shutdown while forwarding, or
    /// the writer is gone). The request then stays registered for the drain.
    async fn accept(&mut self, request: Request) -> bool {
        let id = self.ids.next_id();

        if self.registry.evict(
            id,
            IprotoError::Connection(format!("request id {} reissued while pending", id)),
        ) {
            warn!(request_id = id, "evicted stale request after id wraparound");
        }

        let Request { query, reply } = request;

        let frame = match query.pack(id, &self.default_space) {
            Ok(frame) => frame,
            Err(e) => {
                trace!(request_id = id, error = %e, "query failed to pack");
                deliver(reply, Err(e));
                return true;
            }
        };

        self.registry.insert(id, reply);
        trace!(request_id = id, len = frame.len(), "request routed");

        tokio::select! {
            sent = self.outbound.send(frame) => sent.is_ok(),
            _ = self.shutdown.wait() => false,
        }
    }

    fn route_reply(&mut self, response: Response) {
        let sync = response.sync;
        if self.registry.complete(response) {
            trace!(request_id = sync, "reply delivered");
        } else {
            trace!(request_id = sync, "reply for unknown request dropped");
        }
    }
}
