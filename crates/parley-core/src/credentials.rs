use std::sync::Arc;

use anyhow::anyhow;
use argon2::{
    Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version,
    password_hash::{SaltString, rand_core::OsRng},
};
use chrono::Utc;
use tracing::debug;

use parley_db::{ConstraintKind, Database, constraint_kind};
use parley_types::models::{Account, AccountSummary};

use crate::error::{Result, StoreError};
use crate::{parse_timestamp, parse_timestamp_opt};

/// Registration input. The plaintext password is consumed here and never
/// stored or returned.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
}

/// Owns account creation, verification, and lookup. The stored Argon2id
/// digest never crosses this boundary; callers only ever see public fields.
#[derive(Clone)]
pub struct CredentialStore {
    db: Arc<Database>,
    hasher: Argon2<'static>,
}

impl CredentialStore {
    /// `cost` is the externally configured Argon2 work factor — higher means
    /// slower hashing and stronger brute-force resistance.
    pub fn new(db: Arc<Database>, cost: Params) -> Self {
        Self {
            db,
            hasher: Argon2::new(Algorithm::Argon2id, Version::V0x13, cost),
        }
    }

    /// Creates an account with a fresh salted hash. Relies on the primary-key
    /// constraint for uniqueness rather than check-then-insert, so concurrent
    /// duplicate registrations fail cleanly for exactly one caller.
    pub fn register(&self, new: NewAccount) -> Result<Account> {
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = self
            .hasher
            .hash_password(new.password.as_bytes(), &salt)
            .map_err(|e| anyhow!("password hashing failed: {}", e))?
            .to_string();

        let join_at = Utc::now();

        if let Err(e) = self.db.create_user(
            &new.username,
            &password_hash,
            &new.first_name,
            &new.last_name,
            &new.phone,
            &join_at.to_rfc3339(),
        ) {
            return match constraint_kind(&e) {
                Some(ConstraintKind::Unique) => Err(StoreError::Conflict),
                _ => Err(e.into()),
            };
        }

        debug!("registered account {}", new.username);

        Ok(Account {
            username: new.username,
            first_name: new.first_name,
            last_name: new.last_name,
            phone: new.phone,
            join_at,
            last_login_at: None,
        })
    }

    /// Verifies a username/password pair. An unknown username and a wrong
    /// password fail identically, so the error carries no enumeration signal.
    /// Comparison happens inside the Argon2 verifier, which is constant-time.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<()> {
        let Some(row) = self.db.get_user_by_username(username)? else {
            return Err(StoreError::Authentication);
        };

        let parsed_hash = PasswordHash::new(&row.password)
            .map_err(|e| anyhow!("stored hash for {} is unparsable: {}", username, e))?;

        self.hasher
            .verify_password(password.as_bytes(), &parsed_hash)
            .map_err(|_| StoreError::Authentication)
    }

    /// Advances last_login_at to now. Repeated calls simply move it forward.
    pub fn update_login_timestamp(&self, username: &str) -> Result<()> {
        let now = Utc::now();
        let touched = self.db.touch_last_login(username, &now.to_rfc3339())?;
        if touched == 0 {
            return Err(StoreError::Authentication);
        }
        Ok(())
    }

    /// Roster of all accounts, ordered by last name then first name.
    pub fn list(&self) -> Result<Vec<AccountSummary>> {
        let rows = self.db.list_users()?;
        Ok(rows
            .into_iter()
            .map(|r| AccountSummary {
                username: r.username,
                first_name: r.first_name,
                last_name: r.last_name,
            })
            .collect())
    }

    pub fn get(&self, username: &str) -> Result<Account> {
        let row = self
            .db
            .get_user_by_username(username)?
            .ok_or(StoreError::NotFound)?;

        Ok(Account {
            username: row.username,
            first_name: row.first_name,
            last_name: row.last_name,
            phone: row.phone,
            join_at: parse_timestamp(&row.join_at)?,
            last_login_at: parse_timestamp_opt(row.last_login_at.as_deref())?,
        })
    }
}
