//! # Session lookup
//!
//! Account management lives outside this service. Clients present a
//! bearer token with their `init` command and the token table loaded
//! from the configuration resolves it to an opaque user id, the same
//! contract a cookie-backed session provider would offer.
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Opaque id of a note owner
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> UserId {
        UserId(id.to_owned())
    }
}

impl From<String> for UserId {
    fn from(id: String) -> UserId {
        UserId(id)
    }
}

/// A resolved session
#[derive(Debug, Clone)]
pub struct Session {
    pub user: UserId,
}

/// The token table
#[derive(Debug, Default)]
pub struct Sessions {
    tokens: HashMap<String, UserId>,
}

impl Sessions {
    pub fn from_tokens(tokens: HashMap<String, String>) -> Self {
        Self {
            tokens: tokens
                .into_iter()
                .map(|(token, user)| (token, UserId::from(user)))
                .collect(),
        }
    }

    /// Resolve a bearer token. `None` means the caller is not
    /// authenticated; no distinction is made between unknown and
    /// expired tokens.
    pub fn get_session(&self, token: &str) -> Option<Session> {
        self.tokens.get(token).map(|user| Session {
            user: user.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::Sessions;
    use std::collections::HashMap;

    fn sessions() -> Sessions {
        let mut tokens = HashMap::new();
        tokens.insert(String::from("alpha-token"), String::from("user-1"));
        Sessions::from_tokens(tokens)
    }

    #[test]
    fn known_token_resolves() {
        let session = sessions().get_session("alpha-token").unwrap();
        assert_eq!(session.user.as_str(), "user-1");
    }

    #[test]
    fn unknown_token_does_not() {
        assert!(sessions().get_session("beta-token").is_none());
    }
}
