use std::sync::Arc;

use anyhow::anyhow;
use chrono::{DateTime, Utc};

use parley_db::{ConstraintKind, Database, constraint_kind};
use parley_db::models::DirectedMessageRow;
use parley_types::models::{
    InboundMessage, MessageRecord, OutboundMessage, PostedMessage, Profile,
};

use crate::error::{Result, StoreError};
use crate::{parse_timestamp, parse_timestamp_opt};

/// Read (and create) access to messages, always shaped with the counterpart
/// account's profile attached. Callers are expected to pass an
/// already-authenticated username.
#[derive(Clone)]
pub struct MessageDirectory {
    db: Arc<Database>,
}

impl MessageDirectory {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Messages this user sent, each carrying the recipient's profile.
    pub fn messages_from(&self, username: &str) -> Result<Vec<OutboundMessage>> {
        let rows = self.db.messages_from(username)?;
        rows.into_iter()
            .map(|row| {
                let (sent_at, read_at, to_user) = split_directed(&row)?;
                Ok(OutboundMessage {
                    id: row.id,
                    body: row.body,
                    sent_at,
                    read_at,
                    to_user,
                })
            })
            .collect()
    }

    /// Messages this user received, each carrying the sender's profile.
    pub fn messages_to(&self, username: &str) -> Result<Vec<InboundMessage>> {
        let rows = self.db.messages_to(username)?;
        rows.into_iter()
            .map(|row| {
                let (sent_at, read_at, from_user) = split_directed(&row)?;
                Ok(InboundMessage {
                    id: row.id,
                    body: row.body,
                    sent_at,
                    read_at,
                    from_user,
                })
            })
            .collect()
    }

    /// Stores a new message. Both endpoints must already exist; the foreign
    /// key constraint catches a dangling sender or recipient.
    pub fn send(&self, from_username: &str, to_username: &str, body: &str) -> Result<PostedMessage> {
        let sent_at = Utc::now();
        let id = match self
            .db
            .insert_message(from_username, to_username, body, &sent_at.to_rfc3339())
        {
            Ok(id) => id,
            Err(e) => {
                return match constraint_kind(&e) {
                    Some(ConstraintKind::ForeignKey) => Err(StoreError::Integrity),
                    _ => Err(e.into()),
                };
            }
        };

        Ok(PostedMessage {
            id,
            from_username: from_username.to_string(),
            to_username: to_username.to_string(),
            body: body.to_string(),
            sent_at,
        })
    }

    /// Single message with both endpoint profiles resolved.
    pub fn get(&self, id: i64) -> Result<MessageRecord> {
        let row = self.db.get_message(id)?.ok_or(StoreError::NotFound)?;

        Ok(MessageRecord {
            id: row.id,
            body: row.body,
            sent_at: parse_timestamp(&row.sent_at)?,
            read_at: parse_timestamp_opt(row.read_at.as_deref())?,
            from_user: Profile {
                username: row.from_username,
                first_name: row.from_first_name,
                last_name: row.from_last_name,
                phone: row.from_phone,
            },
            to_user: Profile {
                username: row.to_username,
                first_name: row.to_first_name,
                last_name: row.to_last_name,
                phone: row.to_phone,
            },
        })
    }

    /// Stamps the read receipt on behalf of `reader`, who must be the
    /// recipient. Set at most once: repeated calls return the original
    /// receipt time.
    pub fn mark_read_as(&self, id: i64, reader: &str) -> Result<DateTime<Utc>> {
        let row = self.db.get_message(id)?.ok_or(StoreError::NotFound)?;
        if row.to_username != reader {
            return Err(StoreError::Forbidden);
        }

        let now = Utc::now();
        if self.db.mark_message_read(id, &now.to_rfc3339())? > 0 {
            return Ok(now);
        }

        // Nothing touched, so the receipt was already set; re-read it.
        let row = self.db.get_message(id)?.ok_or(StoreError::NotFound)?;
        parse_timestamp_opt(row.read_at.as_deref())?
            .ok_or_else(|| StoreError::Internal(anyhow!("read_at unset after no-op mark for {}", id)))
    }
}

fn split_directed(row: &DirectedMessageRow) -> Result<(DateTime<Utc>, Option<DateTime<Utc>>, Profile)> {
    Ok((
        parse_timestamp(&row.sent_at)?,
        parse_timestamp_opt(row.read_at.as_deref())?,
        Profile {
            username: row.counterpart_username.clone(),
            first_name: row.counterpart_first_name.clone(),
            last_name: row.counterpart_last_name.clone(),
            phone: row.counterpart_phone.clone(),
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::{CredentialStore, NewAccount};
    use argon2::Params;

    fn fixture() -> (Arc<Database>, CredentialStore, MessageDirectory) {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let creds = CredentialStore::new(db.clone(), Params::new(8, 1, 1, None).unwrap());
        let dir = MessageDirectory::new(db.clone());
        (db, creds, dir)
    }

    fn register(creds: &CredentialStore, username: &str, first: &str, last: &str) {
        creds
            .register(NewAccount {
                username: username.into(),
                password: "hunter2hunter2".into(),
                first_name: first.into(),
                last_name: last.into(),
                phone: "555-0100".into(),
            })
            .unwrap();
    }

    #[test]
    fn directed_queries_attach_the_counterpart_profile() {
        let (_db, creds, dir) = fixture();
        register(&creds, "alice", "Alice", "Ames");
        register(&creds, "bob", "Bob", "Burke");

        dir.send("alice", "bob", "hi").unwrap();

        let from_alice = dir.messages_from("alice").unwrap();
        assert_eq!(from_alice.len(), 1);
        assert_eq!(from_alice[0].body, "hi");
        assert_eq!(from_alice[0].to_user.username, "bob");
        assert_eq!(from_alice[0].to_user.first_name, "Bob");

        let to_bob = dir.messages_to("bob").unwrap();
        assert_eq!(to_bob.len(), 1);
        assert_eq!(to_bob[0].from_user.username, "alice");

        // The message belongs to neither of the opposite boxes.
        assert!(dir.messages_from("bob").unwrap().is_empty());
        assert!(dir.messages_to("alice").unwrap().is_empty());
    }

    #[test]
    fn counterpart_join_survives_cross_traffic() {
        // Three accounts messaging each other; a join keyed on the wrong
        // column would mix profiles here.
        let (_db, creds, dir) = fixture();
        register(&creds, "alice", "Alice", "Ames");
        register(&creds, "bob", "Bob", "Burke");
        register(&creds, "carol", "Carol", "Cole");

        dir.send("alice", "bob", "to bob").unwrap();
        dir.send("alice", "carol", "to carol").unwrap();
        dir.send("carol", "alice", "to alice").unwrap();

        let from_alice = dir.messages_from("alice").unwrap();
        assert_eq!(from_alice.len(), 2);
        assert_eq!(from_alice[0].to_user.username, "bob");
        assert_eq!(from_alice[1].to_user.username, "carol");

        let to_alice = dir.messages_to("alice").unwrap();
        assert_eq!(to_alice.len(), 1);
        assert_eq!(to_alice[0].from_user.username, "carol");
        assert_eq!(to_alice[0].body, "to alice");
    }

    #[test]
    fn repeated_queries_are_deterministic() {
        let (_db, creds, dir) = fixture();
        register(&creds, "alice", "Alice", "Ames");
        register(&creds, "bob", "Bob", "Burke");
        dir.send("alice", "bob", "one").unwrap();
        dir.send("alice", "bob", "two").unwrap();

        let first: Vec<i64> = dir.messages_from("alice").unwrap().iter().map(|m| m.id).collect();
        let second: Vec<i64> = dir.messages_from("alice").unwrap().iter().map(|m| m.id).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn send_to_unknown_account_breaks_integrity() {
        let (_db, creds, dir) = fixture();
        register(&creds, "alice", "Alice", "Ames");

        let err = dir.send("alice", "nobody", "hello?").unwrap_err();
        assert!(matches!(err, StoreError::Integrity));

        let err = dir.send("nobody", "alice", "hello?").unwrap_err();
        assert!(matches!(err, StoreError::Integrity));
    }

    #[test]
    fn get_resolves_both_profiles() {
        let (_db, creds, dir) = fixture();
        register(&creds, "alice", "Alice", "Ames");
        register(&creds, "bob", "Bob", "Burke");

        let posted = dir.send("alice", "bob", "hi").unwrap();
        let record = dir.get(posted.id).unwrap();
        assert_eq!(record.from_user.username, "alice");
        assert_eq!(record.to_user.username, "bob");
        assert!(record.read_at.is_none());

        let err = dir.get(posted.id + 100).unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[test]
    fn mark_read_sets_the_receipt_once() {
        let (_db, creds, dir) = fixture();
        register(&creds, "alice", "Alice", "Ames");
        register(&creds, "bob", "Bob", "Burke");

        let posted = dir.send("alice", "bob", "hi").unwrap();
        let first = dir.mark_read_as(posted.id, "bob").unwrap();
        assert!(first >= posted.sent_at);

        let second = dir.mark_read_as(posted.id, "bob").unwrap();
        assert_eq!(first, second);

        let err = dir.mark_read_as(posted.id + 100, "bob").unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[test]
    fn only_the_recipient_marks_read() {
        let (_db, creds, dir) = fixture();
        register(&creds, "alice", "Alice", "Ames");
        register(&creds, "bob", "Bob", "Burke");

        let posted = dir.send("alice", "bob", "hi").unwrap();
        let err = dir.mark_read_as(posted.id, "alice").unwrap_err();
        assert!(matches!(err, StoreError::Forbidden));
        assert!(dir.get(posted.id).unwrap().read_at.is_none());
    }
}
