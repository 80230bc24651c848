//! Typed protocol messages.
//!
//! Every frame carries exactly one [`Message`]. The variant is identified on
//! the wire by its [`MessageKind`] tag; the payload holds the variant's body
//! serialized with whichever strategy the frame names.
//!
//! ```
//! use chatwire::message::{Message, MessageKind};
//!
//! let msg = Message::chat("alice", "bob", "hi");
//! assert_eq!(msg.kind(), MessageKind::ChatRequest);
//! assert_eq!(msg.kind().tag(), 2);
//! assert_eq!(msg.call_id(), 0);
//! ```

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::protocol::NO_CALL_ID;

/// Stable kind tags of every message variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum MessageKind {
    LoginRequest = 0,
    LoginResponse = 1,
    ChatRequest = 2,
    ChatResponse = 3,
    GroupCreateRequest = 4,
    GroupCreateResponse = 5,
    GroupJoinRequest = 6,
    GroupJoinResponse = 7,
    GroupQuitRequest = 8,
    GroupQuitResponse = 9,
    GroupChatRequest = 10,
    GroupChatResponse = 11,
    GroupMembersRequest = 12,
    GroupMembersResponse = 13,
    Ping = 14,
    Pong = 15,
    RpcRequest = 101,
    RpcResponse = 102,
}

impl MessageKind {
    /// Every kind, in tag order.
    pub const ALL: [MessageKind; 18] = [
        MessageKind::LoginRequest,
        MessageKind::LoginResponse,
        MessageKind::ChatRequest,
        MessageKind::ChatResponse,
        MessageKind::GroupCreateRequest,
        MessageKind::GroupCreateResponse,
        MessageKind::GroupJoinRequest,
        MessageKind::GroupJoinResponse,
        MessageKind::GroupQuitRequest,
        MessageKind::GroupQuitResponse,
        MessageKind::GroupChatRequest,
        MessageKind::GroupChatResponse,
        MessageKind::GroupMembersRequest,
        MessageKind::GroupMembersResponse,
        MessageKind::Ping,
        MessageKind::Pong,
        MessageKind::RpcRequest,
        MessageKind::RpcResponse,
    ];

    /// Wire tag of this kind.
    #[inline]
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Look a kind up by its wire tag.
    pub fn from_tag(tag: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.tag() == tag)
    }

    /// Whether a peer sends this kind to ask for something.
    pub fn is_request(self) -> bool {
        matches!(
            self,
            MessageKind::LoginRequest
                | MessageKind::ChatRequest
                | MessageKind::GroupCreateRequest
                | MessageKind::GroupJoinRequest
                | MessageKind::GroupQuitRequest
                | MessageKind::GroupChatRequest
                | MessageKind::GroupMembersRequest
                | MessageKind::Ping
                | MessageKind::RpcRequest
        )
    }

    /// Whether the payload of this kind is always empty.
    #[inline]
    pub fn is_heartbeat(self) -> bool {
        matches!(self, MessageKind::Ping | MessageKind::Pong)
    }
}

/// Success flag plus a human readable reason.
///
/// Body of login, group create, group join and group quit responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub success: bool,
    /// Shown to the user as is; set on success too.
    pub reason: String,
}

impl Status {
    /// Successful outcome with an explanatory `reason`.
    pub fn ok(reason: impl Into<String>) -> Self {
        Self {
            success: true,
            reason: reason.into(),
        }
    }

    /// Refusal carrying the reason it was refused.
    pub fn fail(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            reason: reason.into(),
        }
    }
}

/// Credentials checked against the server's user store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Direct message from one user to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Informational; the server forwards under the sender's bound identity.
    pub from: String,
    pub to: String,
    pub content: String,
}

/// Either a delivered direct message or a delivery failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub success: bool,
    #[serde(default)]
    pub reason: String,
    /// Sender, set on delivery only.
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatResponse {
    /// A message forwarded to its recipient.
    pub fn delivered(from: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            success: true,
            reason: String::new(),
            from: Some(from.into()),
            content: Some(content.into()),
        }
    }

    /// Delivery refused, e.g. recipient offline.
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            reason: reason.into(),
            from: None,
            content: None,
        }
    }
}

/// New group with its initial members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupCreateRequest {
    pub group: String,
    pub members: BTreeSet<String>,
}

/// Body of join and quit requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMembership {
    pub username: String,
    pub group: String,
}

/// Message to every online member of a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupChatRequest {
    pub from: String,
    pub group: String,
    pub content: String,
}

/// A delivered group message or a failure to send one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupChatResponse {
    pub success: bool,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

impl GroupChatResponse {
    /// A message fanned out to one member.
    pub fn delivered(
        from: impl Into<String>,
        group: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            success: true,
            reason: String::new(),
            from: Some(from.into()),
            group: Some(group.into()),
            content: Some(content.into()),
        }
    }

    /// The group message could not be sent.
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            reason: reason.into(),
            from: None,
            group: None,
            content: None,
        }
    }
}

/// Ask for a group's member list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMembersRequest {
    pub group: String,
}

/// Sorted member list, empty when the group does not exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMembersResponse {
    pub success: bool,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub members: BTreeSet<String>,
}

/// A remote method invocation.
///
/// The call id lives in the frame header; it is restored on decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    #[serde(skip)]
    pub call_id: i32,
    /// Service name the server looks the method up under.
    pub interface_name: String,
    pub method_name: String,
    /// Type names, informational only.
    pub return_type: String,
    pub param_types: Vec<String>,
    /// Arguments in declaration order.
    pub param_values: Vec<Value>,
}

/// What a remote method produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RpcOutcome {
    /// The method returned normally.
    Value(Value),
    /// The method failed; carries the remote error description.
    Exception(String),
}

/// Answer to the [`RpcRequest`] with the same call id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
    #[serde(skip)]
    pub call_id: i32,
    pub outcome: RpcOutcome,
}

impl RpcResponse {
    /// Normal return.
    pub fn value(call_id: i32, value: Value) -> Self {
        Self {
            call_id,
            outcome: RpcOutcome::Value(value),
        }
    }

    /// The remote method failed with `description`.
    pub fn exception(call_id: i32, description: impl Into<String>) -> Self {
        Self {
            call_id,
            outcome: RpcOutcome::Exception(description.into()),
        }
    }
}

/// Every message the protocol can carry.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    LoginRequest(LoginRequest),
    LoginResponse(Status),
    ChatRequest(ChatRequest),
    ChatResponse(ChatResponse),
    GroupCreateRequest(GroupCreateRequest),
    GroupCreateResponse(Status),
    GroupJoinRequest(GroupMembership),
    GroupJoinResponse(Status),
    GroupQuitRequest(GroupMembership),
    GroupQuitResponse(Status),
    GroupChatRequest(GroupChatRequest),
    GroupChatResponse(GroupChatResponse),
    GroupMembersRequest(GroupMembersRequest),
    GroupMembersResponse(GroupMembersResponse),
    Ping,
    Pong,
    RpcRequest(RpcRequest),
    RpcResponse(RpcResponse),
}

impl Message {
    /// Kind tag of this message.
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::LoginRequest(_) => MessageKind::LoginRequest,
            Message::LoginResponse(_) => MessageKind::LoginResponse,
            Message::ChatRequest(_) => MessageKind::ChatRequest,
            Message::ChatResponse(_) => MessageKind::ChatResponse,
            Message::GroupCreateRequest(_) => MessageKind::GroupCreateRequest,
            Message::GroupCreateResponse(_) => MessageKind::GroupCreateResponse,
            Message::GroupJoinRequest(_) => MessageKind::GroupJoinRequest,
            Message::GroupJoinResponse(_) => MessageKind::GroupJoinResponse,
            Message::GroupQuitRequest(_) => MessageKind::GroupQuitRequest,
            Message::GroupQuitResponse(_) => MessageKind::GroupQuitResponse,
            Message::GroupChatRequest(_) => MessageKind::GroupChatRequest,
            Message::GroupChatResponse(_) => MessageKind::GroupChatResponse,
            Message::GroupMembersRequest(_) => MessageKind::GroupMembersRequest,
            Message::GroupMembersResponse(_) => MessageKind::GroupMembersResponse,
            Message::Ping => MessageKind::Ping,
            Message::Pong => MessageKind::Pong,
            Message::RpcRequest(_) => MessageKind::RpcRequest,
            Message::RpcResponse(_) => MessageKind::RpcResponse,
        }
    }

    /// Correlation id (0 for everything but RPC messages).
    pub fn call_id(&self) -> i32 {
        match self {
            Message::RpcRequest(req) => req.call_id,
            Message::RpcResponse(resp) => resp.call_id,
            _ => NO_CALL_ID,
        }
    }

    /// Login request for `username`.
    pub fn login(username: impl Into<String>, password: impl Into<String>) -> Self {
        Message::LoginRequest(LoginRequest {
            username: username.into(),
            password: password.into(),
        })
    }

    /// Direct message request.
    pub fn chat(
        from: impl Into<String>,
        to: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Message::ChatRequest(ChatRequest {
            from: from.into(),
            to: to.into(),
            content: content.into(),
        })
    }

    /// Group creation request; `members` may repeat names.
    pub fn group_create<I, S>(group: impl Into<String>, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Message::GroupCreateRequest(GroupCreateRequest {
            group: group.into(),
            members: members.into_iter().map(Into::into).collect(),
        })
    }

    /// Request adding `username` to `group`.
    pub fn group_join(username: impl Into<String>, group: impl Into<String>) -> Self {
        Message::GroupJoinRequest(GroupMembership {
            username: username.into(),
            group: group.into(),
        })
    }

    /// Request removing `username` from `group`.
    pub fn group_quit(username: impl Into<String>, group: impl Into<String>) -> Self {
        Message::GroupQuitRequest(GroupMembership {
            username: username.into(),
            group: group.into(),
        })
    }

    /// Message to everyone in `group`.
    pub fn group_chat(
        from: impl Into<String>,
        group: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Message::GroupChatRequest(GroupChatRequest {
            from: from.into(),
            group: group.into(),
            content: content.into(),
        })
    }

    pub fn group_members(group: impl Into<String>) -> Self {
        Message::GroupMembersRequest(GroupMembersRequest {
            group: group.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_tags_are_stable() {
        assert_eq!(MessageKind::LoginRequest.tag(), 0);
        assert_eq!(MessageKind::GroupMembersResponse.tag(), 13);
        assert_eq!(MessageKind::Ping.tag(), 14);
        assert_eq!(MessageKind::Pong.tag(), 15);
        assert_eq!(MessageKind::RpcRequest.tag(), 101);
        assert_eq!(MessageKind::RpcResponse.tag(), 102);
    }

    #[test]
    fn test_from_tag_covers_every_kind() {
        for kind in MessageKind::ALL {
            assert_eq!(MessageKind::from_tag(kind.tag()), Some(kind));
        }
        assert_eq!(MessageKind::from_tag(16), None);
        assert_eq!(MessageKind::from_tag(100), None);
        assert_eq!(MessageKind::from_tag(255), None);
    }

    #[test]
    fn test_call_id_only_for_rpc() {
        assert_eq!(Message::Ping.call_id(), 0);
        assert_eq!(Message::login("a", "b").call_id(), 0);

        let resp = Message::RpcResponse(RpcResponse::value(17, Value::Null));
        assert_eq!(resp.call_id(), 17);
    }

    #[test]
    fn test_group_create_dedups_members() {
        let msg = Message::group_create("team", ["a", "b", "a"]);
        match msg {
            Message::GroupCreateRequest(req) => {
                assert_eq!(req.members.len(), 2);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_request_classification() {
        assert!(MessageKind::RpcRequest.is_request());
        assert!(MessageKind::Ping.is_request());
        assert!(!MessageKind::ChatResponse.is_request());
        assert!(MessageKind::Pong.is_heartbeat());
    }
}
