//! Presence and group membership directory.
//!
//! Shared by every connection of a server as `Arc<SessionRegistry>`. Each
//! method takes its lock for its own duration only and hands back owned
//! snapshots, so callers never hold a lock across an await.

use std::collections::{BTreeSet, HashMap};

use parking_lot::RwLock;

use super::{ConnectionHandle, ConnectionId};

#[derive(Default)]
struct Sessions {
    by_identity: HashMap<String, ConnectionHandle>,
    by_connection: HashMap<ConnectionId, String>,
}

/// Identity to connection bindings plus named groups.
///
/// # Example
///
/// ```
/// use chatwire::session::SessionRegistry;
///
/// let registry = SessionRegistry::new();
/// assert!(registry.create_group("team", ["alice", "bob"]));
/// assert!(!registry.create_group("team", ["carol"]));
/// assert!(registry.join_group("team", "carol"));
/// assert_eq!(registry.members_of("team").unwrap().len(), 3);
/// ```
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<Sessions>,
    groups: RwLock<HashMap<String, BTreeSet<String>>>,
}

impl SessionRegistry {
    /// Empty registry: nobody online, no groups.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `identity` to `connection`.
    ///
    /// Last writer wins: an older connection of the same identity loses its
    /// binding (the socket stays open) and is returned. If `connection` was
    /// bound to another identity, that binding is dropped.
    pub fn bind(
        &self,
        connection: ConnectionHandle,
        identity: impl Into<String>,
    ) -> Option<ConnectionHandle> {
        let identity = identity.into();
        let id = connection.id();
        let mut sessions = self.sessions.write();

        if let Some(old_identity) = sessions.by_connection.remove(&id) {
            if old_identity != identity
                && sessions
                    .by_identity
                    .get(&old_identity)
                    .is_some_and(|h| h.id() == id)
            {
                sessions.by_identity.remove(&old_identity);
            }
        }

        let superseded = sessions.by_identity.insert(identity.clone(), connection);
        sessions.by_connection.insert(id, identity);

        match superseded {
            Some(previous) if previous.id() != id => {
                sessions.by_connection.remove(&previous.id());
                Some(previous)
            }
            _ => None,
        }
    }

    /// Remove whatever identity is bound to `connection`.
    ///
    /// The identity entry is only dropped if it still points at this
    /// connection, so a superseded connection closing late cannot evict
    /// the newer login.
    pub fn unbind(&self, connection: ConnectionId) -> Option<String> {
        let mut sessions = self.sessions.write();
        let identity = sessions.by_connection.remove(&connection)?;
        if sessions
            .by_identity
            .get(&identity)
            .is_some_and(|h| h.id() == connection)
        {
            sessions.by_identity.remove(&identity);
        }
        Some(identity)
    }

    /// Connection currently bound to `identity`, if that user is online.
    pub fn lookup(&self, identity: &str) -> Option<ConnectionHandle> {
        self.sessions.read().by_identity.get(identity).cloned()
    }

    /// Identity a connection logged in as.
    pub fn identity_of(&self, connection: ConnectionId) -> Option<String> {
        self.sessions.read().by_connection.get(&connection).cloned()
    }

    /// Whether `identity` has a bound connection.
    pub fn is_online(&self, identity: &str) -> bool {
        self.sessions.read().by_identity.contains_key(identity)
    }

    /// Number of bound identities.
    pub fn online_count(&self) -> usize {
        self.sessions.read().by_identity.len()
    }

    /// Create a group. Returns false if the name is taken.
    pub fn create_group<I, S>(&self, name: impl Into<String>, members: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut groups = self.groups.write();
        match groups.entry(name.into()) {
            std::collections::hash_map::Entry::Occupied(_) => false,
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(members.into_iter().map(Into::into).collect());
                true
            }
        }
    }

    /// Add `identity` to an existing group. Idempotent.
    pub fn join_group(&self, name: &str, identity: impl Into<String>) -> bool {
        match self.groups.write().get_mut(name) {
            Some(members) => {
                members.insert(identity.into());
                true
            }
            None => false,
        }
    }

    /// Remove `identity` from an existing group. Idempotent.
    ///
    /// The group survives even when its last member leaves.
    pub fn quit_group(&self, name: &str, identity: &str) -> bool {
        match self.groups.write().get_mut(name) {
            Some(members) => {
                members.remove(identity);
                true
            }
            None => false,
        }
    }

    /// Snapshot of a group's members, sorted.
    pub fn members_of(&self, name: &str) -> Option<BTreeSet<String>> {
        self.groups.read().get(name).cloned()
    }

    /// Members of a group paired with their live connection, if any.
    pub fn member_connections(
        &self,
        name: &str,
    ) -> Option<Vec<(String, Option<ConnectionHandle>)>> {
        let members = self.members_of(name)?;
        let sessions = self.sessions.read();
        Some(
            members
                .into_iter()
                .map(|member| {
                    let handle = sessions.by_identity.get(&member).cloned();
                    (member, handle)
                })
                .collect(),
        )
    }

    /// Number of groups, empty ones included.
    pub fn group_count(&self) -> usize {
        self.groups.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::codec::MessageCodec;
    use crate::writer::spawn_writer_task_default;

    fn handle() -> ConnectionHandle {
        let (client, _server) = tokio::io::duplex(1024);
        let (writer, _task) = spawn_writer_task_default(client);
        ConnectionHandle::new(ConnectionId::next(), writer, MessageCodec::default())
    }

    #[tokio::test]
    async fn test_bind_lookup_unbind() {
        let registry = SessionRegistry::new();
        let conn = handle();
        let id = conn.id();

        assert!(registry.bind(conn, "alice").is_none());
        assert_eq!(registry.lookup("alice").unwrap().id(), id);
        assert_eq!(registry.identity_of(id).as_deref(), Some("alice"));
        assert!(registry.is_online("alice"));

        assert_eq!(registry.unbind(id).as_deref(), Some("alice"));
        assert!(registry.lookup("alice").is_none());
        assert!(registry.identity_of(id).is_none());
        assert_eq!(registry.unbind(id), None);
    }

    #[tokio::test]
    async fn test_duplicate_login_last_writer_wins() {
        let registry = SessionRegistry::new();
        let first = handle();
        let second = handle();
        let (first_id, second_id) = (first.id(), second.id());

        registry.bind(first, "alice");
        let superseded = registry.bind(second, "alice").unwrap();

        assert_eq!(superseded.id(), first_id);
        assert_eq!(registry.lookup("alice").unwrap().id(), second_id);
        assert!(registry.identity_of(first_id).is_none());

        // The old connection closing must not evict the new binding
        assert_eq!(registry.unbind(first_id), None);
        assert_eq!(registry.lookup("alice").unwrap().id(), second_id);
        assert_eq!(registry.online_count(), 1);
    }

    #[tokio::test]
    async fn test_rebind_connection_to_new_identity() {
        let registry = SessionRegistry::new();
        let conn = handle();
        let id = conn.id();

        registry.bind(conn.clone(), "alice");
        registry.bind(conn, "bob");

        assert!(registry.lookup("alice").is_none());
        assert_eq!(registry.lookup("bob").unwrap().id(), id);
        assert_eq!(registry.identity_of(id).as_deref(), Some("bob"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_binds_all_visible() {
        let registry = Arc::new(SessionRegistry::new());
        let mut tasks = Vec::new();

        for i in 0..64 {
            let registry = registry.clone();
            let conn = handle();
            tasks.push(tokio::spawn(async move {
                registry.bind(conn, format!("user{}", i));
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(registry.online_count(), 64);
        for i in 0..64 {
            assert!(registry.is_online(&format!("user{}", i)));
        }
    }

    #[test]
    fn test_group_lifecycle() {
        let registry = SessionRegistry::new();

        assert!(registry.create_group("team", ["alice", "bob"]));
        assert!(!registry.create_group("team", Vec::<String>::new()));

        assert!(registry.join_group("team", "carol"));
        assert!(registry.join_group("team", "carol"));
        assert!(!registry.join_group("nope", "carol"));

        assert!(registry.quit_group("team", "alice"));
        assert!(registry.quit_group("team", "alice"));
        assert!(!registry.quit_group("nope", "alice"));

        let members: Vec<_> = registry.members_of("team").unwrap().into_iter().collect();
        assert_eq!(members, vec!["bob".to_string(), "carol".to_string()]);
        assert!(registry.members_of("nope").is_none());
    }

    #[test]
    fn test_empty_group_survives() {
        let registry = SessionRegistry::new();
        registry.create_group("solo", ["alice"]);
        registry.quit_group("solo", "alice");

        assert_eq!(registry.members_of("solo"), Some(BTreeSet::new()));
        assert_eq!(registry.group_count(), 1);
    }

    #[tokio::test]
    async fn test_member_connections_marks_offline() {
        let registry = SessionRegistry::new();
        let conn = handle();
        let id = conn.id();
        registry.bind(conn, "alice");
        registry.create_group("team", ["alice", "bob"]);

        let members = registry.member_connections("team").unwrap();
        assert_eq!(members.len(), 2);
        assert_eq!(members[0].0, "alice");
        assert_eq!(members[0].1.as_ref().map(|h| h.id()), Some(id));
        assert_eq!(members[1].0, "bob");
        assert!(members[1].1.is_none());

        assert!(registry.member_connections("nope").is_none());
    }
}
