//! Table of in-flight calls.
//!
//! Every entry is resolved at most once: whichever of response, timeout,
//! a dropped handle or disconnect removes the entry first delivers the
//! outcome, and the others find nothing to do.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::oneshot;

use crate::error::{ChatwireError, Result};
use crate::message::{RpcOutcome, RpcResponse};

/// What a finished call resolves to.
pub type CallOutcome = Result<Value>;

/// Outstanding calls keyed by call id.
#[derive(Debug, Default)]
pub struct PendingCalls {
    calls: Mutex<HashMap<i32, oneshot::Sender<CallOutcome>>>,
}

impl PendingCalls {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new outstanding call and return the handle to wait on.
    ///
    /// Must happen before the request is sent, so a fast response always
    /// finds its entry.
    pub fn register(self: &Arc<Self>, call_id: i32) -> Result<CallHandle> {
        let (tx, rx) = oneshot::channel();
        {
            let mut calls = self.calls.lock();
            if calls.contains_key(&call_id) {
                return Err(ChatwireError::DuplicateCallId(call_id));
            }
            calls.insert(call_id, tx);
        }
        Ok(CallHandle {
            call_id,
            rx,
            pending: Arc::clone(self),
        })
    }

    /// Resolve the call a response belongs to.
    ///
    /// Returns false, changing nothing, when no call with that id is
    /// pending (already resolved, timed out, or never sent).
    pub fn complete(&self, response: RpcResponse) -> bool {
        let tx = self.calls.lock().remove(&response.call_id);
        let Some(tx) = tx else {
            tracing::debug!("discarding response for unknown call {}", response.call_id);
            return false;
        };

        let outcome = match response.outcome {
            RpcOutcome::Value(value) => Ok(value),
            RpcOutcome::Exception(description) => Err(ChatwireError::Remote(description)),
        };
        // Waiter may have given up already
        let _ = tx.send(outcome);
        true
    }

    /// Fail every outstanding call, typically on disconnect.
    ///
    /// `error` builds one error per waiter. Returns how many were failed.
    pub fn fail_all(&self, error: impl Fn() -> ChatwireError) -> usize {
        let drained: Vec<_> = self.calls.lock().drain().collect();
        let count = drained.len();
        for (_, tx) in drained {
            let _ = tx.send(Err(error()));
        }
        count
    }

    /// Drop an entry without resolving it.
    pub fn remove(&self, call_id: i32) -> bool {
        self.calls.lock().remove(&call_id).is_some()
    }

    pub fn contains(&self, call_id: i32) -> bool {
        self.calls.lock().contains_key(&call_id)
    }

    /// Calls still waiting for a response.
    pub fn len(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.lock().is_empty()
    }
}

/// Waiting side of one pending call.
///
/// Dropping the handle without waiting removes the call from the table.
#[derive(Debug)]
pub struct CallHandle {
    call_id: i32,
    rx: oneshot::Receiver<CallOutcome>,
    pending: Arc<PendingCalls>,
}

impl CallHandle {
    /// Id the request went out with.
    #[inline]
    pub fn call_id(&self) -> i32 {
        self.call_id
    }

    /// Wait for the outcome with no deadline.
    pub async fn wait(mut self) -> Result<Value> {
        flatten((&mut self.rx).await)
    }

    /// Wait for the outcome for at most `timeout`.
    ///
    /// On expiry the entry is removed and `RpcTimeout` returned, unless a
    /// response claimed the entry first, in which case that outcome wins.
    pub async fn wait_timeout(mut self, timeout: Duration) -> Result<Value> {
        match tokio::time::timeout(timeout, &mut self.rx).await {
            Ok(received) => flatten(received),
            Err(_) => {
                if self.pending.remove(self.call_id) {
                    Err(ChatwireError::RpcTimeout(self.call_id))
                } else {
                    flatten((&mut self.rx).await)
                }
            }
        }
    }

    /// Block the current thread until the outcome arrives.
    ///
    /// For synchronous callers only; panics when called from inside an
    /// async runtime.
    pub fn wait_blocking(mut self) -> Result<Value> {
        // `blocking_recv` consumes the receiver; leave a closed one behind for Drop
        let (_closed, placeholder) = oneshot::channel();
        let rx = std::mem::replace(&mut self.rx, placeholder);
        flatten(rx.blocking_recv())
    }
}

impl Drop for CallHandle {
    fn drop(&mut self) {
        self.pending.remove(self.call_id);
    }
}

fn flatten(received: std::result::Result<CallOutcome, oneshot::error::RecvError>) -> Result<Value> {
    received.map_err(|_| ChatwireError::ConnectionClosed)?
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_complete_resolves_waiter() {
        let pending = Arc::new(PendingCalls::new());
        let handle = pending.register(1).unwrap();
        assert_eq!(pending.len(), 1);

        assert!(pending.complete(RpcResponse::value(1, json!("hello"))));
        assert!(pending.is_empty());
        assert_eq!(handle.wait().await.unwrap(), json!("hello"));
    }

    #[tokio::test]
    async fn test_exception_becomes_remote_error() {
        let pending = Arc::new(PendingCalls::new());
        let handle = pending.register(4).unwrap();

        pending.complete(RpcResponse::exception(4, "no such method: nope"));

        match handle.wait().await {
            Err(ChatwireError::Remote(text)) => assert_eq!(text, "no such method: nope"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_second_response_is_discarded() {
        let pending = Arc::new(PendingCalls::new());
        let handle = pending.register(2).unwrap();

        assert!(pending.complete(RpcResponse::value(2, json!(1))));
        assert!(!pending.complete(RpcResponse::value(2, json!(2))));

        assert_eq!(handle.wait().await.unwrap(), json!(1));
    }

    #[tokio::test]
    async fn test_unknown_id_changes_nothing() {
        let pending = Arc::new(PendingCalls::new());
        let _handle = pending.register(1).unwrap();

        assert!(!pending.complete(RpcResponse::value(99, json!(null))));
        assert_eq!(pending.len(), 1);
        assert!(pending.contains(1));
    }

    #[tokio::test]
    async fn test_duplicate_register_rejected() {
        let pending = Arc::new(PendingCalls::new());
        let _handle = pending.register(5).unwrap();

        assert!(matches!(
            pending.register(5),
            Err(ChatwireError::DuplicateCallId(5))
        ));
    }

    #[tokio::test]
    async fn test_timeout_removes_entry() {
        let pending = Arc::new(PendingCalls::new());
        let handle = pending.register(3).unwrap();

        let result = handle.wait_timeout(Duration::from_millis(20)).await;
        assert!(matches!(result, Err(ChatwireError::RpcTimeout(3))));
        assert!(pending.is_empty());

        // Late response is dropped
        assert!(!pending.complete(RpcResponse::value(3, json!(0))));
    }

    #[tokio::test]
    async fn test_fail_all_resolves_every_waiter() {
        let pending = Arc::new(PendingCalls::new());
        let handles: Vec<_> = (1..=5).map(|id| pending.register(id).unwrap()).collect();

        assert_eq!(pending.fail_all(|| ChatwireError::ConnectionClosed), 5);
        assert!(pending.is_empty());

        for handle in handles {
            assert!(matches!(
                handle.wait().await,
                Err(ChatwireError::ConnectionClosed)
            ));
        }
    }

    #[tokio::test]
    async fn test_dropped_handle_frees_entry() {
        let pending = Arc::new(PendingCalls::new());
        drop(pending.register(6).unwrap());
        assert!(pending.is_empty());
    }

    #[tokio::test]
    async fn test_out_of_order_completion() {
        let pending = Arc::new(PendingCalls::new());
        let waiters: Vec<_> = (1..=3)
            .map(|id| {
                let handle = pending.register(id).unwrap();
                tokio::spawn(handle.wait())
            })
            .collect();

        for id in [3, 1, 2] {
            pending.complete(RpcResponse::value(id, json!(id * 10)));
        }

        for (i, waiter) in waiters.into_iter().enumerate() {
            let expected = (i as i32 + 1) * 10;
            assert_eq!(waiter.await.unwrap().unwrap(), json!(expected));
        }
    }

    #[tokio::test]
    async fn test_wait_blocking_from_plain_thread() {
        let pending = Arc::new(PendingCalls::new());
        let handle = pending.register(11).unwrap();

        let waiter = std::thread::spawn(move || handle.wait_blocking());
        tokio::time::sleep(Duration::from_millis(10)).await;
        pending.complete(RpcResponse::value(11, json!("done")));

        assert_eq!(waiter.join().unwrap().unwrap(), json!("done"));
    }
}
