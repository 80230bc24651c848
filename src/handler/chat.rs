//! Direct and group messages.
//!
//! The sender is always the identity bound to the connection; the `from`
//! field a client writes is not trusted.

use super::reasons::{NOT_LOGGED_IN, NO_SUCH_GROUP, TARGET_OFFLINE};
use super::registry::unexpected;
use super::{ConnectionContext, HandlerResult};
use crate::message::{ChatResponse, GroupChatResponse, Message};

/// Forward a direct message to its recipient.
pub(super) async fn direct(message: Message, ctx: ConnectionContext) -> HandlerResult {
    let request = match message {
        Message::ChatRequest(request) => request,
        other => return Err(unexpected(other.kind())),
    };
    let Some(from) = ctx.identity() else {
        return ctx
            .respond(&Message::ChatResponse(ChatResponse::failed(NOT_LOGGED_IN)))
            .await;
    };

    let offline = Message::ChatResponse(ChatResponse::failed(TARGET_OFFLINE));
    let Some(target) = ctx.registry().lookup(&request.to) else {
        return ctx.respond(&offline).await;
    };

    let forwarded = Message::ChatResponse(ChatResponse::delivered(from, request.content));
    if let Err(e) = ctx.send_to(&target, &forwarded).await {
        // Bound but its writer already stopped
        tracing::debug!("{}: delivery to {} failed: {}", ctx.connection_id(), request.to, e);
        return ctx.respond(&offline).await;
    }
    Ok(())
}

/// Fan a message out to every online member of a group but the sender.
pub(super) async fn group(message: Message, ctx: ConnectionContext) -> HandlerResult {
    let request = match message {
        Message::GroupChatRequest(request) => request,
        other => return Err(unexpected(other.kind())),
    };
    let Some(from) = ctx.identity() else {
        return ctx
            .respond(&Message::GroupChatResponse(GroupChatResponse::failed(
                NOT_LOGGED_IN,
            )))
            .await;
    };

    let Some(members) = ctx.registry().member_connections(&request.group) else {
        return ctx
            .respond(&Message::GroupChatResponse(GroupChatResponse::failed(
                NO_SUCH_GROUP,
            )))
            .await;
    };

    let forwarded = Message::GroupChatResponse(GroupChatResponse::delivered(
        from.as_str(),
        request.group.as_str(),
        request.content.as_str(),
    ));
    for (member, connection) in members {
        let Some(connection) = connection else {
            continue;
        };
        if member == from || connection.id() == ctx.connection_id() {
            continue;
        }
        if let Err(e) = ctx.send_to(&connection, &forwarded).await {
            tracing::debug!("group {}: delivery to {} failed: {}", request.group, member, e);
        }
    }
    Ok(())
}
