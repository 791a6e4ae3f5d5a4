use tracing::info;

use parley_types::models::Account;

use crate::credentials::{CredentialStore, NewAccount};
use crate::error::Result;

/// Token issuance is an injected capability; the core never constructs or
/// inspects tokens itself. The JWT implementation lives at the HTTP edge.
pub trait TokenIssuer: Send + Sync {
    fn issue(&self, username: &str) -> anyhow::Result<String>;
}

/// Thin orchestration over the credential store for the routing layer:
/// verify, touch the login timestamp, hand out a token.
pub struct AuthGate<T> {
    store: CredentialStore,
    issuer: T,
}

impl<T: TokenIssuer> AuthGate<T> {
    pub fn new(store: CredentialStore, issuer: T) -> Self {
        Self { store, issuer }
    }

    pub fn login(&self, username: &str, password: &str) -> Result<String> {
        self.store.authenticate(username, password)?;
        self.store.update_login_timestamp(username)?;
        let token = self.issuer.issue(username)?;
        info!("user logged in: {}", username);
        Ok(token)
    }

    /// Registration doubles as a first login, so it returns a token too.
    pub fn register(&self, new: NewAccount) -> Result<(Account, String)> {
        let account = self.store.register(new)?;
        let token = self.issuer.issue(&account.username)?;
        info!("user registered: {}", account.username);
        Ok((account, token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use argon2::Params;
    use parley_db::Database;
    use std::sync::Arc;

    struct StaticIssuer;

    impl TokenIssuer for StaticIssuer {
        fn issue(&self, username: &str) -> anyhow::Result<String> {
            Ok(format!("token-for-{}", username))
        }
    }

    fn gate() -> (CredentialStore, AuthGate<StaticIssuer>) {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let store = CredentialStore::new(db, Params::new(8, 1, 1, None).unwrap());
        (store.clone(), AuthGate::new(store, StaticIssuer))
    }

    fn new_account(username: &str) -> NewAccount {
        NewAccount {
            username: username.into(),
            password: "hunter2hunter2".into(),
            first_name: "Alice".into(),
            last_name: "Ames".into(),
            phone: "555-0100".into(),
        }
    }

    #[test]
    fn login_issues_a_token_and_touches_the_timestamp() {
        let (store, gate) = gate();
        gate.register(new_account("alice")).unwrap();
        assert!(store.get("alice").unwrap().last_login_at.is_none());

        let token = gate.login("alice", "hunter2hunter2").unwrap();
        assert_eq!(token, "token-for-alice");
        assert!(store.get("alice").unwrap().last_login_at.is_some());
    }

    #[test]
    fn failed_login_issues_nothing() {
        let (store, gate) = gate();
        gate.register(new_account("alice")).unwrap();

        let err = gate.login("alice", "bad-password").unwrap_err();
        assert!(matches!(err, StoreError::Authentication));
        assert!(store.get("alice").unwrap().last_login_at.is_none());
    }

    #[test]
    fn register_returns_account_and_token() {
        let (_store, gate) = gate();
        let (account, token) = gate.register(new_account("alice")).unwrap();
        assert_eq!(account.username, "alice");
        assert_eq!(token, "token-for-alice");
    }
}
