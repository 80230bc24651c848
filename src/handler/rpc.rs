//! Server side RPC dispatch.

use super::registry::unexpected;
use super::{ConnectionContext, HandlerResult};
use crate::message::Message;

pub(super) async fn invoke(message: Message, ctx: ConnectionContext) -> HandlerResult {
    let request = match message {
        Message::RpcRequest(request) => request,
        other => return Err(unexpected(other.kind())),
    };

    tracing::debug!(
        "{}: rpc {} {}.{}",
        ctx.connection_id(),
        request.call_id,
        request.interface_name,
        request.method_name
    );
    let response = ctx.services().dispatch(&request);
    ctx.respond(&Message::RpcResponse(response)).await
}
