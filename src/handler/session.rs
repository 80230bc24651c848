//! Login, heartbeat and disconnect.

use super::reasons::{LOGIN_FAILED, LOGIN_SUCCEEDED};
use super::registry::unexpected;
use super::{ConnectionContext, HandlerResult};
use crate::message::{Message, Status};

pub(super) async fn login(message: Message, ctx: ConnectionContext) -> HandlerResult {
    let request = match message {
        Message::LoginRequest(request) => request,
        other => return Err(unexpected(other.kind())),
    };

    if !ctx.users().authenticate(&request.username, &request.password) {
        tracing::info!("{}: login rejected for {}", ctx.connection_id(), request.username);
        return ctx
            .respond(&Message::LoginResponse(Status::fail(LOGIN_FAILED)))
            .await;
    }

    let superseded = ctx
        .registry()
        .bind(ctx.connection().clone(), request.username.as_str());
    if let Some(previous) = superseded {
        tracing::info!(
            "{} logged in again, {} no longer receives their messages",
            request.username,
            previous.id()
        );
    }
    tracing::info!("{}: {} logged in", ctx.connection_id(), request.username);

    ctx.respond(&Message::LoginResponse(Status::ok(LOGIN_SUCCEEDED)))
        .await
}

/// The ping already counted as traffic for the idle watchdog.
pub(super) async fn ping(_message: Message, ctx: ConnectionContext) -> HandlerResult {
    tracing::trace!("{}: ping", ctx.connection_id());
    Ok(())
}

pub(super) async fn pong(_message: Message, _ctx: ConnectionContext) -> HandlerResult {
    Ok(())
}

/// Cleanup once a connection is gone, whatever the reason.
///
/// Returns the identity that was unbound, if the connection was logged in.
pub fn on_disconnect(ctx: &ConnectionContext, reason: &str) -> Option<String> {
    let identity = ctx.registry().unbind(ctx.connection_id());
    match &identity {
        Some(name) => tracing::info!("{}: {} disconnected ({})", ctx.connection_id(), name, reason),
        None => tracing::info!("{}: disconnected ({})", ctx.connection_id(), reason),
    }
    identity
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::test_support::TestPeer;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_login_success_binds() {
        let mut peer = TestPeer::new();

        login(Message::login("zhangsan", "123"), peer.ctx.clone())
            .await
            .unwrap();

        assert_eq!(
            peer.recv().await,
            Message::LoginResponse(Status::ok("login succeeded"))
        );
        assert_eq!(peer.ctx.identity().as_deref(), Some("zhangsan"));
    }

    #[tokio::test]
    async fn test_login_failure_keeps_connection_unbound() {
        let mut peer = TestPeer::new();

        login(Message::login("zhangsan", "wrong"), peer.ctx.clone())
            .await
            .unwrap();

        assert_eq!(
            peer.recv().await,
            Message::LoginResponse(Status::fail("incorrect username or password"))
        );
        assert!(peer.ctx.identity().is_none());
        assert!(peer.ctx.registry().lookup("zhangsan").is_none());
    }

    #[tokio::test]
    async fn test_second_login_takes_over_identity() {
        let mut first = TestPeer::new();
        let mut second = TestPeer::sharing(Arc::clone(&first.registry));

        login(Message::login("lisi", "123"), first.ctx.clone()).await.unwrap();
        login(Message::login("lisi", "123"), second.ctx.clone()).await.unwrap();
        first.recv().await;
        second.recv().await;

        let bound = first.ctx.registry().lookup("lisi").unwrap();
        assert_eq!(bound.id(), second.ctx.connection_id());

        // The superseded connection closing leaves the new session alone
        assert_eq!(on_disconnect(&first.ctx, "eof"), None);
        assert!(second.ctx.registry().lookup("lisi").is_some());
    }

    #[tokio::test]
    async fn test_ping_gets_no_reply() {
        let mut peer = TestPeer::new();
        ping(Message::Ping, peer.ctx.clone()).await.unwrap();
        pong(Message::Pong, peer.ctx.clone()).await.unwrap();
        peer.assert_silent().await;
    }

    #[tokio::test]
    async fn test_disconnect_unbinds() {
        let peer = TestPeer::new();
        peer.login_as("wangwu");

        assert_eq!(on_disconnect(&peer.ctx, "idle").as_deref(), Some("wangwu"));
        assert!(peer.ctx.registry().lookup("wangwu").is_none());
        assert_eq!(on_disconnect(&peer.ctx, "idle"), None);
    }
}
