//! Group creation and membership.

use super::reasons::{added_to_group, GROUP_EXISTS, NOT_LOGGED_IN, NO_SUCH_GROUP};
use super::registry::unexpected;
use super::{ConnectionContext, HandlerResult};
use crate::message::{GroupMembersResponse, Message, Status};

pub(super) async fn create(message: Message, ctx: ConnectionContext) -> HandlerResult {
    let request = match message {
        Message::GroupCreateRequest(request) => request,
        other => return Err(unexpected(other.kind())),
    };

    if !ctx
        .registry()
        .create_group(request.group.as_str(), request.members.iter().cloned())
    {
        return ctx
            .respond(&Message::GroupCreateResponse(Status::fail(GROUP_EXISTS)))
            .await;
    }
    tracing::info!(
        "{}: group {} created with {} members",
        ctx.connection_id(),
        request.group,
        request.members.len()
    );

    ctx.respond(&Message::GroupCreateResponse(Status::ok(format!(
        "group {} created",
        request.group
    ))))
    .await?;

    let notice = Message::GroupCreateResponse(Status::ok(added_to_group(&request.group)));
    let members = ctx
        .registry()
        .member_connections(&request.group)
        .unwrap_or_default();
    for (member, connection) in members {
        let Some(connection) = connection else {
            continue;
        };
        if connection.id() == ctx.connection_id() {
            continue;
        }
        if let Err(e) = ctx.send_to(&connection, &notice).await {
            tracing::debug!("group {}: notice to {} failed: {}", request.group, member, e);
        }
    }
    Ok(())
}

pub(super) async fn join(message: Message, ctx: ConnectionContext) -> HandlerResult {
    let request = match message {
        Message::GroupJoinRequest(request) => request,
        other => return Err(unexpected(other.kind())),
    };
    let Some(username) = ctx.identity() else {
        return ctx
            .respond(&Message::GroupJoinResponse(Status::fail(NOT_LOGGED_IN)))
            .await;
    };

    let status = if ctx.registry().join_group(&request.group, username) {
        Status::ok(format!("joined group {}", request.group))
    } else {
        Status::fail(NO_SUCH_GROUP)
    };
    ctx.respond(&Message::GroupJoinResponse(status)).await
}

pub(super) async fn quit(message: Message, ctx: ConnectionContext) -> HandlerResult {
    let request = match message {
        Message::GroupQuitRequest(request) => request,
        other => return Err(unexpected(other.kind())),
    };
    let Some(username) = ctx.identity() else {
        return ctx
            .respond(&Message::GroupQuitResponse(Status::fail(NOT_LOGGED_IN)))
            .await;
    };

    let status = if ctx.registry().quit_group(&request.group, &username) {
        Status::ok(format!("left group {}", request.group))
    } else {
        Status::fail(NO_SUCH_GROUP)
    };
    ctx.respond(&Message::GroupQuitResponse(status)).await
}

pub(super) async fn members(message: Message, ctx: ConnectionContext) -> HandlerResult {
    let request = match message {
        Message::GroupMembersRequest(request) => request,
        other => return Err(unexpected(other.kind())),
    };

    let response = match ctx.registry().members_of(&request.group) {
        Some(members) => GroupMembersResponse {
            success: true,
            reason: String::new(),
            members,
        },
        None => GroupMembersResponse {
            success: false,
            reason: NO_SUCH_GROUP.to_string(),
            members: Default::default(),
        },
    };
    ctx.respond(&Message::GroupMembersResponse(response)).await
}
