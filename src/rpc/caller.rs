//! Client side of RPC: send a request, wait for its response.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use super::{CallHandle, CallIdGenerator, MethodInvocation, PendingCalls};
use crate::error::Result;
use crate::message::Message;
use crate::session::ConnectionHandle;

/// Issues calls over one connection.
///
/// Clones share the id generator and the pending table, so calls from many
/// tasks can be in flight at once and complete in any order. Whoever reads
/// the connection must feed responses to [`PendingCalls::complete`].
#[derive(Clone)]
pub struct RpcCaller {
    connection: ConnectionHandle,
    ids: Arc<CallIdGenerator>,
    pending: Arc<PendingCalls>,
    timeout: Option<Duration>,
}

impl RpcCaller {
    pub fn new(
        connection: ConnectionHandle,
        pending: Arc<PendingCalls>,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            connection,
            ids: Arc::new(CallIdGenerator::new()),
            pending,
            timeout,
        }
    }

    /// Table of calls awaiting a response on this connection.
    pub fn pending(&self) -> &Arc<PendingCalls> {
        &self.pending
    }

    /// Deadline applied by [`RpcCaller::call`]; `None` waits forever.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Send a request and return the handle to wait on.
    ///
    /// The call is registered before the request leaves, so a response can
    /// never beat its entry. If sending fails the entry is removed.
    pub async fn start(&self, invocation: MethodInvocation) -> Result<CallHandle> {
        let call_id = self.ids.next_id();
        let handle = self.pending.register(call_id)?;

        let request = Message::RpcRequest(invocation.into_request(call_id));
        if let Err(e) = self.connection.send(&request).await {
            self.pending.remove(call_id);
            return Err(e);
        }

        tracing::debug!("rpc call {} sent", call_id);
        Ok(handle)
    }

    /// Invoke a remote method and wait for its result.
    pub async fn call(&self, invocation: MethodInvocation) -> Result<Value> {
        let handle = self.start(invocation).await?;
        match self.timeout {
            Some(timeout) => handle.wait_timeout(timeout).await,
            None => handle.wait().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::MessageCodec;
    use crate::error::ChatwireError;
    use crate::message::RpcResponse;
    use crate::protocol::FrameBuffer;
    use crate::session::ConnectionId;
    use crate::writer::spawn_writer_task_default;
    use serde_json::json;
    use tokio::io::{duplex, AsyncReadExt, DuplexStream};

    fn caller(timeout: Option<Duration>) -> (RpcCaller, DuplexStream) {
        let (client, server) = duplex(64 * 1024);
        let (writer, _task) = spawn_writer_task_default(client);
        let connection = ConnectionHandle::new(ConnectionId::next(), writer, MessageCodec::default());
        (
            RpcCaller::new(connection, Arc::new(PendingCalls::new()), timeout),
            server,
        )
    }

    async fn next_request(peer: &mut DuplexStream, buffer: &mut FrameBuffer) -> Message {
        let mut buf = [0u8; 1024];
        loop {
            let n = peer.read(&mut buf).await.unwrap();
            if let Some(frame) = buffer.push(&buf[..n]).unwrap().into_iter().next() {
                return MessageCodec::default().decode(&frame).unwrap();
            }
        }
    }

    #[tokio::test]
    async fn test_request_carries_fresh_call_id() {
        let (caller, mut peer) = caller(None);
        let mut buffer = FrameBuffer::new();

        let first = caller.start(MethodInvocation::new("A", "x")).await.unwrap();
        let second = caller.start(MethodInvocation::new("A", "y")).await.unwrap();
        assert_eq!(first.call_id(), 1);
        assert_eq!(second.call_id(), 2);
        assert_eq!(caller.pending().len(), 2);

        match next_request(&mut peer, &mut buffer).await {
            Message::RpcRequest(req) => {
                assert_eq!(req.call_id, 1);
                assert_eq!(req.method_name, "x");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_call_resolves_from_pending_table() {
        let (caller, _peer) = caller(Some(Duration::from_secs(5)));
        let pending = caller.pending().clone();

        let call = tokio::spawn({
            let caller = caller.clone();
            async move { caller.call(MethodInvocation::new("A", "x")).await }
        });

        while pending.is_empty() {
            tokio::task::yield_now().await;
        }
        pending.complete(RpcResponse::value(1, json!(42)));

        assert_eq!(call.await.unwrap().unwrap(), json!(42));
    }

    #[tokio::test]
    async fn test_call_times_out() {
        let (caller, _peer) = caller(Some(Duration::from_millis(20)));

        let result = caller.call(MethodInvocation::new("A", "x")).await;
        assert!(matches!(result, Err(ChatwireError::RpcTimeout(1))));
        assert!(caller.pending().is_empty());
    }

    #[tokio::test]
    async fn test_failed_send_removes_entry() {
        let (caller, peer) = caller(None);
        drop(peer);

        // Writer notices the closed peer on its first write
        let _ = caller.start(MethodInvocation::new("A", "x")).await;
        while !caller.connection.is_closed() {
            tokio::task::yield_now().await;
        }

        let result = caller.start(MethodInvocation::new("A", "y")).await;
        assert!(matches!(result, Err(ChatwireError::ConnectionClosed)));
        assert!(caller.pending().is_empty());
    }
}
