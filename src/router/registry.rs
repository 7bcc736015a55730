//! Pending-request registry: correlation ID → waiting caller.
//!
//! Owned by the router task and never shared, so it needs no locking.

use std::collections::HashMap;

use super::request::{deliver, ReplySender};
use crate::error::IprotoError;
use crate::protocol::Response;

/// In-flight requests keyed by correlation ID.
#[derive(Debug, Default)]
pub(crate) struct RequestRegistry {
    pending: HashMap<u32, ReplySender>,
}

impl RequestRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a reply slot. The ID must not be live (see [`Self::evict`]).
    pub fn insert(&mut self, id: u32, reply: ReplySender) {
        let previous = self.pending.insert(id, reply);
        debug_assert!(previous.is_none(), "request id {} registered twice", id);
    }

    /// Fail and remove a still-live entry. Returns whether one existed.
    pub fn evict(&mut self, id: u32, err: IprotoError) -> bool {
        match self.pending.remove(&id) {
            Some(reply) => {
                deliver(reply, Err(err));
                true
            }
            None => false,
        }
    }

    /// Deliver a response to its caller and remove the entry.
    ///
    /// Returns `false` if no request with that ID is pending.
    pub fn complete(&mut self, response: Response) -> bool {
        match self.pending.remove(&response.sync) {
            Some(reply) => {
                deliver(reply, Ok(response));
                true
            }
            None => false,
        }
    }

    /// Fail every pending request. Returns how many were failed.
    pub fn fail_all(&mut self, err: impl Fn() -> IprotoError) -> usize {
        let count = self.pending.len();
        for (_, reply) in self.pending.drain() {
            deliver(reply, Err(err()));
        }
        count
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    #[cfg(test)]
    pub fn contains(&self, id: u32) -> bool {
        self.pending.contains_key(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use tokio::sync::oneshot;

    fn slot() -> (ReplySender, oneshot::Receiver<Result<Response>>) {
        oneshot::channel()
    }

    fn response(sync: u32) -> Response {
        Response {
            sync,
            code: 0,
            schema_version: None,
            data: Some(rmpv::Value::from(sync)),
            error: None,
        }
    }

    #[test]
    fn test_complete_delivers_and_removes() {
        let mut registry = RequestRegistry::new();
        let (tx, mut rx) = slot();
        registry.insert(7, tx);
        assert!(registry.contains(7));

        assert!(registry.complete(response(7)));

        assert!(registry.is_empty());
        assert_eq!(rx.try_recv().unwrap().unwrap().sync, 7);
    }

    #[test]
    fn test_complete_unknown_id_is_noop() {
        let mut registry = RequestRegistry::new();
        let (tx, mut rx) = slot();
        registry.insert(1, tx);

        assert!(!registry.complete(response(2)));

        assert_eq!(registry.len(), 1);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_duplicate_response_is_dropped() {
        let mut registry = RequestRegistry::new();
        let (tx, _rx) = slot();
        registry.insert(3, tx);

        assert!(registry.complete(response(3)));
        assert!(!registry.complete(response(3)));
    }

    #[test]
    fn test_evict_fails_entry() {
        let mut registry = RequestRegistry::new();
        let (tx, mut rx) = slot();
        registry.insert(9, tx);

        assert!(registry.evict(9, IprotoError::Connection("reused".to_string())));
        assert!(!registry.evict(9, IprotoError::ConnectionClosed));

        assert!(matches!(
            rx.try_recv().unwrap(),
            Err(IprotoError::Connection(_))
        ));
    }

    #[test]
    fn test_fail_all() {
        let mut registry = RequestRegistry::new();
        let mut receivers = Vec::new();
        for id in 1..=5 {
            let (tx, rx) = slot();
            registry.insert(id, tx);
            receivers.push(rx);
        }

        assert_eq!(registry.fail_all(|| IprotoError::ConnectionClosed), 5);
        assert!(registry.is_empty());

        for mut rx in receivers {
            assert!(matches!(
                rx.try_recv().unwrap(),
                Err(IprotoError::ConnectionClosed)
            ));
        }
    }
}
