/// Database row types — these map directly to SQLite rows. Timestamps stay as
/// the stored RFC 3339 text here; the service layer parses them. Distinct from
/// the parley-types API models to keep the DB layer independent.

pub struct UserRow {
    pub username: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub join_at: String,
    pub last_login_at: Option<String>,
}

pub struct SummaryRow {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

/// One side of a directed message query: the message columns plus the joined
/// counterpart profile (the recipient when querying by sender, the sender when
/// querying by recipient).
pub struct DirectedMessageRow {
    pub id: i64,
    pub body: String,
    pub sent_at: String,
    pub read_at: Option<String>,
    pub counterpart_username: String,
    pub counterpart_first_name: String,
    pub counterpart_last_name: String,
    pub counterpart_phone: String,
}

/// A single message with both endpoint profiles joined in.
pub struct MessageDetailRow {
    pub id: i64,
    pub body: String,
    pub sent_at: String,
    pub read_at: Option<String>,
    pub from_username: String,
    pub from_first_name: String,
    pub from_last_name: String,
    pub from_phone: String,
    pub to_username: String,
    pub to_first_name: String,
    pub to_last_name: String,
    pub to_phone: String,
}
