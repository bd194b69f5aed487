use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

/// SessionStore
///
/// Bearer tokens handed out at login, mapped to the username they were issued
/// for. Tokens live until the process exits or the holder logs out; a deleted
/// account simply stops resolving in the `AuthUser` extractor.
#[derive(Debug, Default)]
pub struct SessionStore {
    tokens: DashMap<String, String>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a fresh 48-hex-character token for `username`.
    pub fn issue(&self, username: &str) -> String {
        let token = generate_token();
        self.tokens.insert(token.clone(), username.to_string());
        token
    }

    pub fn resolve(&self, token: &str) -> Option<String> {
        self.tokens.get(token).map(|entry| entry.value().clone())
    }

    /// Returns `true` if the token was live.
    pub fn revoke(&self, token: &str) -> bool {
        self.tokens.remove(token).is_some()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

fn generate_token() -> String {
    let mut token = String::with_capacity(64);
    token.push_str(&Uuid::new_v4().simple().to_string());
    token.push_str(&Uuid::new_v4().simple().to_string());
    token.truncate(48);
    token
}

/// SessionState
///
/// The shared handle stored in `AppState`.
pub type SessionState = Arc<SessionStore>;
