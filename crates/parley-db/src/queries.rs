use crate::Database;
use crate::models::{DirectedMessageRow, MessageDetailRow, SummaryRow, UserRow};
use anyhow::Result;
use rusqlite::Connection;

/// Messages sent by ?1: filter on from_username, join the *recipient's*
/// profile. The join keys on the message's counterpart column, never on the
/// query parameter itself.
const MESSAGES_FROM_SQL: &str = "SELECT m.id, m.body, m.sent_at, m.read_at,
        u.username, u.first_name, u.last_name, u.phone
     FROM messages m
     JOIN users u ON m.to_username = u.username
     WHERE m.from_username = ?1
     ORDER BY m.id";

/// Messages received by ?1: filter on to_username, join the *sender's* profile.
const MESSAGES_TO_SQL: &str = "SELECT m.id, m.body, m.sent_at, m.read_at,
        u.username, u.first_name, u.last_name, u.phone
     FROM messages m
     JOIN users u ON m.from_username = u.username
     WHERE m.to_username = ?1
     ORDER BY m.id";

impl Database {
    // -- Users --

    pub fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        first_name: &str,
        last_name: &str,
        phone: &str,
        join_at: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (username, password, first_name, last_name, phone, join_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![username, password_hash, first_name, last_name, phone, join_at],
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_username(conn, username))
    }

    /// Returns the number of rows touched; zero means the account is gone.
    pub fn touch_last_login(&self, username: &str, at: &str) -> Result<usize> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "UPDATE users SET last_login_at = ?1 WHERE username = ?2",
                rusqlite::params![at, username],
            )?;
            Ok(n)
        })
    }

    pub fn list_users(&self) -> Result<Vec<SummaryRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT username, first_name, last_name
                 FROM users
                 ORDER BY last_name, first_name",
            )?;

            let rows = stmt
                .query_map([], |row| {
                    Ok(SummaryRow {
                        username: row.get(0)?,
                        first_name: row.get(1)?,
                        last_name: row.get(2)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    // -- Messages --

    pub fn insert_message(
        &self,
        from_username: &str,
        to_username: &str,
        body: &str,
        sent_at: &str,
    ) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (from_username, to_username, body, sent_at)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![from_username, to_username, body, sent_at],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn messages_from(&self, username: &str) -> Result<Vec<DirectedMessageRow>> {
        self.with_conn(|conn| query_directed(conn, MESSAGES_FROM_SQL, username))
    }

    pub fn messages_to(&self, username: &str) -> Result<Vec<DirectedMessageRow>> {
        self.with_conn(|conn| query_directed(conn, MESSAGES_TO_SQL, username))
    }

    pub fn get_message(&self, id: i64) -> Result<Option<MessageDetailRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT m.id, m.body, m.sent_at, m.read_at,
                    f.username, f.first_name, f.last_name, f.phone,
                    t.username, t.first_name, t.last_name, t.phone
                 FROM messages m
                 JOIN users f ON m.from_username = f.username
                 JOIN users t ON m.to_username = t.username
                 WHERE m.id = ?1",
            )?;

            let row = stmt
                .query_row([id], |row| {
                    Ok(MessageDetailRow {
                        id: row.get(0)?,
                        body: row.get(1)?,
                        sent_at: row.get(2)?,
                        read_at: row.get(3)?,
                        from_username: row.get(4)?,
                        from_first_name: row.get(5)?,
                        from_last_name: row.get(6)?,
                        from_phone: row.get(7)?,
                        to_username: row.get(8)?,
                        to_first_name: row.get(9)?,
                        to_last_name: row.get(10)?,
                        to_phone: row.get(11)?,
                    })
                })
                .optional()?;

            Ok(row)
        })
    }

    /// Stamps read_at only if it is still unset. Returns the number of rows
    /// touched; zero means the message is missing or already read.
    pub fn mark_message_read(&self, id: i64, at: &str) -> Result<usize> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "UPDATE messages SET read_at = ?1 WHERE id = ?2 AND read_at IS NULL",
                rusqlite::params![at, id],
            )?;
            Ok(n)
        })
    }
}

fn query_user_by_username(conn: &Connection, username: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(
        "SELECT username, password, first_name, last_name, phone, join_at, last_login_at
         FROM users
         WHERE username = ?1",
    )?;

    let row = stmt
        .query_row([username], |row| {
            Ok(UserRow {
                username: row.get(0)?,
                password: row.get(1)?,
                first_name: row.get(2)?,
                last_name: row.get(3)?,
                phone: row.get(4)?,
                join_at: row.get(5)?,
                last_login_at: row.get(6)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn query_directed(conn: &Connection, sql: &str, username: &str) -> Result<Vec<DirectedMessageRow>> {
    let mut stmt = conn.prepare(sql)?;

    let rows = stmt
        .query_map([username], |row| {
            Ok(DirectedMessageRow {
                id: row.get(0)?,
                body: row.get(1)?,
                sent_at: row.get(2)?,
                read_at: row.get(3)?,
                counterpart_username: row.get(4)?,
                counterpart_first_name: row.get(5)?,
                counterpart_last_name: row.get(6)?,
                counterpart_phone: row.get(7)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
