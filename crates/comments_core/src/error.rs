use thiserror::Error;

/// Which policy rule rejected an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenialReason {
    /// Read attempted by an actor outside the owner's group.
    GroupMismatch,
    /// Update/delete attempted by someone other than the owner.
    NotOwner,
    /// Action name the policy does not know. Always denied.
    UnsupportedAction(String),
    /// Account modification attempted by someone other than the account holder.
    NotAccountHolder,
}

impl std::fmt::Display for DenialReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GroupMismatch => write!(
                f,
                "Not enough permissions. You can only access comments from users in your group."
            ),
            Self::NotOwner => write!(
                f,
                "Not enough permissions. You can only modify your own comments."
            ),
            Self::UnsupportedAction(action) => write!(
                f,
                "Not enough permissions. Action '{action}' is not supported."
            ),
            Self::NotAccountHolder => write!(
                f,
                "Not enough permissions. You can only modify your own account."
            ),
        }
    }
}

#[derive(Debug, Error)]
pub enum CommentsError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    PermissionDenied(DenialReason),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("persistence: {0}")]
    Persistence(#[from] anyhow::Error),
}

impl CommentsError {
    pub fn http_status(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::PermissionDenied(_) => 403,
            Self::InvalidInput(_) => 422,
            Self::Conflict(_) => 409,
            Self::Unauthenticated(_) => 401,
            Self::Persistence(_) => 500,
        }
    }

    /// Stable machine-readable code, used by the graph adapter's error extensions.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::PermissionDenied(_) => "PERMISSION_DENIED",
            Self::InvalidInput(_) => "VALIDATION_FAILED",
            Self::Conflict(_) => "CONFLICT",
            Self::Unauthenticated(_) => "UNAUTHENTICATED",
            Self::Persistence(_) => "INTERNAL",
        }
    }

    pub fn denial_reason(&self) -> Option<&DenialReason> {
        match self {
            Self::PermissionDenied(reason) => Some(reason),
            _ => None,
        }
    }
}
