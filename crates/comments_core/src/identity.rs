use crate::types::{User, UserId};

/// The authenticated actor making a request.
///
/// Built by the server from a verified token plus a fresh user lookup. Core
/// logic never reads raw tokens and there is no implicit or thread-local
/// identity anywhere in the codebase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: UserId,
    pub username: String,
    pub group: String,
}

impl Identity {
    pub fn new(id: UserId, username: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            group: group.into(),
        }
    }
}

impl From<&User> for Identity {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            group: user.group.clone(),
        }
    }
}

impl From<User> for Identity {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            group: user.group,
        }
    }
}
