use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};

use crate::db::{timestamp, DatabaseError};
use crate::models::enums::TokenKind;

/// A persisted token, looked up by the SHA-256 of its plaintext.
#[derive(Debug, Clone)]
pub struct StoredToken {
    pub user_id: i64,
    pub kind: TokenKind,
    pub expires_at: NaiveDateTime,
}

impl StoredToken {
    pub fn is_expired(&self, now: NaiveDateTime) -> bool {
        self.expires_at <= now
    }
}

pub fn insert_token(
    conn: &Connection,
    user_id: i64,
    token_hash: &[u8; 32],
    kind: TokenKind,
    expires_at: NaiveDateTime,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO access_tokens (user_id, token_hash, kind, created_at, expires_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![user_id, &token_hash[..], kind, timestamp(), expires_at],
    )?;
    Ok(())
}

pub fn find_token(
    conn: &Connection,
    token_hash: &[u8; 32],
    kind: TokenKind,
) -> Result<Option<StoredToken>, DatabaseError> {
    conn.query_row(
        "SELECT user_id, kind, expires_at FROM access_tokens
         WHERE token_hash = ?1 AND kind = ?2",
        params![&token_hash[..], kind],
        |row| {
            Ok(StoredToken {
                user_id: row.get(0)?,
                kind: row.get(1)?,
                expires_at: row.get(2)?,
            })
        },
    )
    .optional()
    .map_err(DatabaseError::from)
}

/// Returns `true` when a token was removed.
pub fn delete_token(conn: &Connection, token_hash: &[u8; 32]) -> Result<bool, DatabaseError> {
    let deleted = conn.execute(
        "DELETE FROM access_tokens WHERE token_hash = ?1",
        params![&token_hash[..]],
    )?;
    Ok(deleted > 0)
}

/// Revoke every session of a user (logout, password change).
pub fn delete_user_tokens(conn: &Connection, user_id: i64) -> Result<usize, DatabaseError> {
    let deleted = conn.execute(
        "DELETE FROM access_tokens WHERE user_id = ?1",
        params![user_id],
    )?;
    Ok(deleted)
}

pub fn purge_expired_tokens(conn: &Connection, now: NaiveDateTime) -> Result<usize, DatabaseError> {
    let deleted = conn.execute(
        "DELETE FROM access_tokens WHERE expires_at <= ?1",
        params![now],
    )?;
    Ok(deleted)
}
