//! Credential checking.

use std::collections::HashMap;

/// Source of truth for usernames and passwords.
pub trait UserStore: Send + Sync + 'static {
    /// Whether `password` is correct for `username`.
    fn authenticate(&self, username: &str, password: &str) -> bool;
}

/// Fixed in-memory credential table.
#[derive(Debug, Clone)]
pub struct InMemoryUserStore {
    users: HashMap<String, String>,
}

impl InMemoryUserStore {
    /// An empty store; every login fails.
    pub fn empty() -> Self {
        Self {
            users: HashMap::new(),
        }
    }

    /// Add or replace a user.
    pub fn with_user(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.users.insert(username.into(), password.into());
        self
    }
}

impl Default for InMemoryUserStore {
    /// The demo accounts, all with password `123`.
    fn default() -> Self {
        ["zhangsan", "lisi", "wangwu", "zhaoliu", "qianqi"]
            .into_iter()
            .fold(Self::empty(), |store, name| store.with_user(name, "123"))
    }
}

impl UserStore for InMemoryUserStore {
    fn authenticate(&self, username: &str, password: &str) -> bool {
        self.users.get(username).is_some_and(|p| p == password)
    }
}
