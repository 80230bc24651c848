//! Console commands of the interactive client.
//!
//! ```
//! use chatwire::console::Command;
//!
//! let command = Command::parse("send lisi see you at  noon").unwrap();
//! assert_eq!(
//!     command,
//!     Command::Send { to: "lisi".into(), content: "see you at  noon".into() }
//! );
//! ```

use crate::error::{ChatwireError, Result};
use crate::message::{Message, RpcOutcome};

/// Help text printed by the client.
pub const USAGE: &str = "\
commands:
  send <user> <text>
  gsend <group> <text>
  gcreate <group> <m1,m2,...>
  gmembers <group>
  gjoin <group>
  gquit <group>
  quit";

/// One parsed console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Send { to: String, content: String },
    GroupSend { group: String, content: String },
    GroupCreate { group: String, members: Vec<String> },
    GroupMembers { group: String },
    GroupJoin { group: String },
    GroupQuit { group: String },
    Quit,
}

impl Command {
    /// Parse a console line. Text after the target is kept verbatim.
    pub fn parse(line: &str) -> Result<Self> {
        let (verb, rest) = split_word(line);
        match verb {
            "send" => {
                let (to, content) = target_and_text(rest, "send <user> <text>")?;
                Ok(Command::Send { to, content })
            }
            "gsend" => {
                let (group, content) = target_and_text(rest, "gsend <group> <text>")?;
                Ok(Command::GroupSend { group, content })
            }
            "gcreate" => {
                let (group, members) = split_word(rest);
                if group.is_empty() {
                    return Err(usage("gcreate <group> <m1,m2,...>"));
                }
                let members = members
                    .split(',')
                    .map(str::trim)
                    .filter(|m| !m.is_empty())
                    .map(String::from)
                    .collect();
                Ok(Command::GroupCreate {
                    group: group.to_string(),
                    members,
                })
            }
            "gmembers" => Ok(Command::GroupMembers {
                group: single_target(rest, "gmembers <group>")?,
            }),
            "gjoin" => Ok(Command::GroupJoin {
                group: single_target(rest, "gjoin <group>")?,
            }),
            "gquit" => Ok(Command::GroupQuit {
                group: single_target(rest, "gquit <group>")?,
            }),
            "quit" => Ok(Command::Quit),
            "" => Err(ChatwireError::Command("empty line".to_string())),
            other => Err(ChatwireError::Command(format!("unknown command '{}'", other))),
        }
    }

    /// Message this command sends on behalf of `identity`.
    ///
    /// `None` for `quit`. Group creation always includes `identity`.
    pub fn into_message(self, identity: &str) -> Option<Message> {
        let message = match self {
            Command::Send { to, content } => Message::chat(identity, to, content),
            Command::GroupSend { group, content } => Message::group_chat(identity, group, content),
            Command::GroupCreate { group, mut members } => {
                members.push(identity.to_string());
                Message::group_create(group, members)
            }
            Command::GroupMembers { group } => Message::group_members(group),
            Command::GroupJoin { group } => Message::group_join(identity, group),
            Command::GroupQuit { group } => Message::group_quit(identity, group),
            Command::Quit => return None,
        };
        Some(message)
    }
}

fn usage(form: &str) -> ChatwireError {
    ChatwireError::Command(format!("usage: {}", form))
}

/// First whitespace separated word and the remainder.
fn split_word(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    match s.find(char::is_whitespace) {
        Some(i) => (&s[..i], s[i..].trim_start()),
        None => (s, ""),
    }
}

fn target_and_text(rest: &str, form: &str) -> Result<(String, String)> {
    let (target, text) = split_word(rest);
    let text = text.trim_end_matches(|c: char| c == '\r' || c == '\n');
    if target.is_empty() || text.is_empty() {
        return Err(usage(form));
    }
    Ok((target.to_string(), text.to_string()))
}

fn single_target(rest: &str, form: &str) -> Result<String> {
    match split_word(rest) {
        (target, "") if !target.is_empty() => Ok(target.to_string()),
        _ => Err(usage(form)),
    }
}

/// One line describing a message received from the server.
pub fn render(message: &Message) -> String {
    match message {
        Message::LoginResponse(status)
        | Message::GroupCreateResponse(status)
        | Message::GroupJoinResponse(status)
        | Message::GroupQuitResponse(status) => status.reason.clone(),
        Message::ChatResponse(resp) if resp.success => format!(
            "{}: {}",
            resp.from.as_deref().unwrap_or("?"),
            resp.content.as_deref().unwrap_or_default()
        ),
        Message::ChatResponse(resp) => resp.reason.clone(),
        Message::GroupChatResponse(resp) if resp.success => format!(
            "[{}] {}: {}",
            resp.group.as_deref().unwrap_or("?"),
            resp.from.as_deref().unwrap_or("?"),
            resp.content.as_deref().unwrap_or_default()
        ),
        Message::GroupChatResponse(resp) => resp.reason.clone(),
        Message::GroupMembersResponse(resp) if resp.success => {
            let names: Vec<&str> = resp.members.iter().map(String::as_str).collect();
            format!("members: {}", names.join(", "))
        }
        Message::GroupMembersResponse(resp) => resp.reason.clone(),
        Message::RpcResponse(resp) => match &resp.outcome {
            RpcOutcome::Value(value) => format!("call {} returned {}", resp.call_id, value),
            RpcOutcome::Exception(text) => format!("call {} failed: {}", resp.call_id, text),
        },
        other => format!("{:?}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{ChatResponse, GroupChatResponse, GroupMembersResponse, Status};

    #[test]
    fn test_parse_send_keeps_text_whole() {
        assert_eq!(
            Command::parse("send  lisi   hello there  world").unwrap(),
            Command::Send {
                to: "lisi".to_string(),
                content: "hello there  world".to_string()
            }
        );
        assert_eq!(
            Command::parse("gsend team lunch?\n").unwrap(),
            Command::GroupSend {
                group: "team".to_string(),
                content: "lunch?".to_string()
            }
        );
    }

    #[test]
    fn test_parse_gcreate_members() {
        assert_eq!(
            Command::parse("gcreate team lisi, wangwu,,zhaoliu").unwrap(),
            Command::GroupCreate {
                group: "team".to_string(),
                members: vec!["lisi".into(), "wangwu".into(), "zhaoliu".into()]
            }
        );
        assert_eq!(
            Command::parse("gcreate solo").unwrap(),
            Command::GroupCreate {
                group: "solo".to_string(),
                members: vec![]
            }
        );
    }

    #[test]
    fn test_parse_single_target_commands() {
        assert_eq!(
            Command::parse("gmembers team").unwrap(),
            Command::GroupMembers { group: "team".into() }
        );
        assert_eq!(
            Command::parse("gjoin team").unwrap(),
            Command::GroupJoin { group: "team".into() }
        );
        assert_eq!(
            Command::parse("gquit team").unwrap(),
            Command::GroupQuit { group: "team".into() }
        );
        assert_eq!(Command::parse("quit").unwrap(), Command::Quit);
    }

    #[test]
    fn test_parse_errors() {
        for line in ["", "   ", "send", "send lisi", "gjoin", "gjoin a b", "dance"] {
            assert!(
                matches!(Command::parse(line), Err(ChatwireError::Command(_))),
                "{:?}",
                line
            );
        }
    }

    #[test]
    fn test_into_message_uses_identity() {
        let message = Command::parse("send lisi hi").unwrap().into_message("zhangsan");
        assert_eq!(message, Some(Message::chat("zhangsan", "lisi", "hi")));

        let message = Command::parse("gcreate team lisi")
            .unwrap()
            .into_message("zhangsan");
        assert_eq!(
            message,
            Some(Message::group_create("team", ["lisi", "zhangsan"]))
        );

        assert_eq!(Command::Quit.into_message("zhangsan"), None);
    }

    #[test]
    fn test_render() {
        assert_eq!(
            render(&Message::ChatResponse(ChatResponse::delivered("lisi", "hi"))),
            "lisi: hi"
        );
        assert_eq!(
            render(&Message::GroupChatResponse(GroupChatResponse::delivered(
                "lisi", "team", "hi"
            ))),
            "[team] lisi: hi"
        );
        assert_eq!(
            render(&Message::LoginResponse(Status::fail("incorrect username or password"))),
            "incorrect username or password"
        );
        let members = GroupMembersResponse {
            success: true,
            reason: String::new(),
            members: ["b", "a"].into_iter().map(String::from).collect(),
        };
        assert_eq!(
            render(&Message::GroupMembersResponse(members)),
            "members: a, b"
        );
    }
}
