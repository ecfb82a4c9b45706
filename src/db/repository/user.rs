use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::{timestamp, DatabaseError};
use crate::models::enums::Role;
use crate::models::*;

const USER_COLUMNS: &str =
    "id, first_name, last_name, email, contact, role, created_at, updated_at, password_hash";

pub(crate) fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        email: row.get(3)?,
        contact: row.get(4)?,
        role: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

fn credentials_from_row(row: &Row<'_>) -> rusqlite::Result<UserCredentials> {
    Ok(UserCredentials {
        user: user_from_row(row)?,
        password_hash: row.get(8)?,
    })
}

/// Insert an account. A duplicate email surfaces as a UNIQUE violation
/// (see [`DatabaseError::is_unique_violation`]).
pub fn insert_user(conn: &Connection, user: &NewUser) -> Result<i64, DatabaseError> {
    let now = timestamp();
    conn.execute(
        "INSERT INTO users (first_name, last_name, email, contact, password_hash, role,
                            created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
        params![
            user.first_name,
            user.last_name,
            user.email,
            user.contact,
            user.password_hash,
            user.role,
            now,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_user(conn: &Connection, id: i64) -> Result<Option<User>, DatabaseError> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
    conn.query_row(&sql, params![id], user_from_row)
        .optional()
        .map_err(DatabaseError::from)
}

pub fn user_exists(conn: &Connection, id: i64) -> Result<bool, DatabaseError> {
    let found: Option<i64> = conn
        .query_row("SELECT 1 FROM users WHERE id = ?1", params![id], |row| row.get(0))
        .optional()?;
    Ok(found.is_some())
}

/// Case-insensitive lookup by email.
pub fn find_credentials_by_email(
    conn: &Connection,
    email: &str,
) -> Result<Option<UserCredentials>, DatabaseError> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1 COLLATE NOCASE");
    conn.query_row(&sql, params![email.trim()], credentials_from_row)
        .optional()
        .map_err(DatabaseError::from)
}

pub fn get_credentials(
    conn: &Connection,
    id: i64,
) -> Result<Option<UserCredentials>, DatabaseError> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
    conn.query_row(&sql, params![id], credentials_from_row)
        .optional()
        .map_err(DatabaseError::from)
}

/// True when an account other than `except_user` already uses `email`.
pub fn email_taken(
    conn: &Connection,
    email: &str,
    except_user: Option<i64>,
) -> Result<bool, DatabaseError> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT id FROM users WHERE email = ?1 COLLATE NOCASE AND id != COALESCE(?2, -1)",
            params![email.trim(), except_user],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

pub fn list_users_by_role(conn: &Connection, role: Role) -> Result<Vec<User>, DatabaseError> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE role = ?1 ORDER BY id");
    let mut stmt = conn.prepare(&sql)?;
    let users = stmt
        .query_map(params![role], user_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(users)
}

pub fn count_users_by_role(conn: &Connection, role: Role) -> Result<i64, DatabaseError> {
    conn.query_row(
        "SELECT COUNT(*) FROM users WHERE role = ?1",
        params![role],
        |row| row.get(0),
    )
    .map_err(DatabaseError::from)
}

pub fn update_email(conn: &Connection, id: i64, email: &str) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE users SET email = ?2, updated_at = ?3 WHERE id = ?1",
        params![id, email, timestamp()],
    )?;
    if updated == 0 {
        return Err(DatabaseError::not_found("User", id));
    }
    Ok(())
}

pub fn update_password_hash(
    conn: &Connection,
    id: i64,
    password_hash: &str,
) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE users SET password_hash = ?2, updated_at = ?3 WHERE id = ?1",
        params![id, password_hash, timestamp()],
    )?;
    if updated == 0 {
        return Err(DatabaseError::not_found("User", id));
    }
    Ok(())
}
