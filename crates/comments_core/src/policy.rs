//! Permission policy for comments and user accounts.
//!
//! `decide` is a pure function; `ensure` turns a deny into
//! `CommentsError::PermissionDenied`. Every comment read or mutation in the
//! lifecycle goes through `ensure` and nothing else checks group or ownership.
//!
//! The policy never loads anything. Callers pass an `OwnedComment` whose owner
//! has already been fetched; a failed owner fetch is reported by the caller as
//! a persistence failure, not as a denial.

use crate::error::{CommentsError, DenialReason};
use crate::identity::Identity;
use crate::types::{OwnedComment, UserId};

/// Operation being authorized against a comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Read,
    Update,
    Delete,
    /// Anything else. Always denied.
    Other(String),
}

impl Action {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Other(name) => name,
        }
    }
}

impl From<&str> for Action {
    fn from(name: &str) -> Self {
        match name {
            "read" => Self::Read,
            "update" => Self::Update,
            "delete" => Self::Delete,
            other => Self::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pure decision: may `actor` perform `action` on `target`?
pub fn decide(actor: &Identity, target: &OwnedComment, action: &Action) -> bool {
    match action {
        Action::Read => actor.group == target.owner.group,
        Action::Update | Action::Delete => actor.id == target.comment.owner_user_id,
        Action::Other(_) => false,
    }
}

/// Enforce `decide`, reporting which rule failed.
pub fn ensure(
    actor: &Identity,
    target: &OwnedComment,
    action: &Action,
) -> Result<(), CommentsError> {
    if decide(actor, target, action) {
        return Ok(());
    }
    let reason = match action {
        Action::Read => DenialReason::GroupMismatch,
        Action::Update | Action::Delete => DenialReason::NotOwner,
        Action::Other(name) => DenialReason::UnsupportedAction(name.clone()),
    };
    tracing::debug!(
        actor = %actor.id,
        comment = %target.comment.id,
        action = %action,
        "comment access denied"
    );
    Err(CommentsError::PermissionDenied(reason))
}

/// Accounts may only be modified by their holder. Reads are open to any
/// authenticated actor and need no check.
pub fn ensure_account(
    actor: &Identity,
    target: UserId,
    action: &Action,
) -> Result<(), CommentsError> {
    let allowed = match action {
        Action::Update | Action::Delete => actor.id == target,
        Action::Read => true,
        Action::Other(_) => false,
    };
    if allowed {
        return Ok(());
    }
    tracing::debug!(actor = %actor.id, target = %target, action = %action, "account access denied");
    Err(CommentsError::PermissionDenied(match action {
        Action::Other(name) => DenialReason::UnsupportedAction(name.clone()),
        _ => DenialReason::NotAccountHolder,
    }))
}
