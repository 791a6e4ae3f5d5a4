use thiserror::Error;

/// Failure taxonomy for the credential store and message directory. Every
/// operation resolves to a value or exactly one of these; nothing in this
/// layer retries.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Duplicate username on registration.
    #[error("username already taken")]
    Conflict,

    /// Credential mismatch, unknown account during authentication, or a
    /// login-timestamp update against a vanished account. Deliberately does
    /// not say which, to keep usernames unenumerable.
    #[error("invalid username or password")]
    Authentication,

    /// Lookup of an account or message that does not exist.
    #[error("no such record")]
    NotFound,

    /// A message endpoint that references no existing account.
    #[error("message references an unknown account")]
    Integrity,

    /// A message operation attempted by an account that is not the required
    /// endpoint (e.g. a sender stamping the read receipt).
    #[error("operation reserved to the message recipient")]
    Forbidden,

    /// Storage, hashing, or token plumbing failure.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;
