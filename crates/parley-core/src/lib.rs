pub mod credentials;
pub mod directory;
pub mod error;
pub mod gate;

pub use credentials::{CredentialStore, NewAccount};
pub use directory::MessageDirectory;
pub use error::{Result, StoreError};
pub use gate::{AuthGate, TokenIssuer};

use chrono::{DateTime, Utc};

/// Timestamps live in SQLite as RFC 3339 text; anything unparseable is
/// corruption, not caller error.
pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Internal(anyhow::anyhow!("malformed timestamp '{}': {}", raw, e)))
}

pub(crate) fn parse_timestamp_opt(raw: Option<&str>) -> Result<Option<DateTime<Utc>>> {
    raw.map(parse_timestamp).transpose()
}
