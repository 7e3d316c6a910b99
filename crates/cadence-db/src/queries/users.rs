use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::uuid_at;
use crate::Database;
use crate::models::{ResetTicketRow, UserRow};

const USER_COLUMNS: &str =
    "id, email, password_hash, full_name, timezone, google_id, avatar_url, created_at";

impl Database {
    pub fn create_user(&self, user: &UserRow) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, email, password_hash, full_name, timezone, google_id, avatar_url, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                rusqlite::params![
                    user.id.to_string(),
                    user.email.to_lowercase(),
                    user.password_hash,
                    user.full_name,
                    user.timezone,
                    user.google_id,
                    user.avatar_url,
                    user.created_at,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", &email.to_lowercase()))
    }

    pub fn get_user_by_id(&self, id: Uuid) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", &id.to_string()))
    }

    pub fn get_user_by_google_id(&self, google_id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "google_id", google_id))
    }

    /// Attach a federated identity to an existing account. The avatar is only
    /// filled in when the account has none.
    pub fn link_google_identity(
        &self,
        user_id: Uuid,
        google_id: &str,
        avatar_url: Option<&str>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET google_id = ?2, avatar_url = COALESCE(avatar_url, ?3) WHERE id = ?1",
                rusqlite::params![user_id.to_string(), google_id, avatar_url],
            )?;
            Ok(())
        })
    }

    // -- Password reset --

    pub fn set_reset_token(
        &self,
        user_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET reset_token_hash = ?2, reset_expires_at = ?3 WHERE id = ?1",
                rusqlite::params![user_id.to_string(), token_hash, expires_at],
            )?;
            Ok(())
        })
    }

    pub fn find_reset_ticket(&self, token_hash: &str) -> Result<Option<ResetTicketRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, email, reset_expires_at FROM users WHERE reset_token_hash = ?1",
                    [token_hash],
                    |row| {
                        Ok(ResetTicketRow {
                            user_id: uuid_at(row, 0)?,
                            email: row.get(1)?,
                            expires_at: row.get(2)?,
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })
    }

    /// Store a new password hash and burn the reset token in one statement.
    pub fn reset_password(&self, user_id: Uuid, password_hash: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET password_hash = ?2, reset_token_hash = NULL, reset_expires_at = NULL
                 WHERE id = ?1",
                rusqlite::params![user_id.to_string(), password_hash],
            )?;
            Ok(())
        })
    }

    pub fn clear_reset_token(&self, user_id: Uuid) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET reset_token_hash = NULL, reset_expires_at = NULL WHERE id = ?1",
                [user_id.to_string()],
            )?;
            Ok(())
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = ?1");
    let row = conn.query_row(&sql, [value], map_user).optional()?;
    Ok(row)
}

fn map_user(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: uuid_at(row, 0)?,
        email: row.get(1)?,
        password_hash: row.get(2)?,
        full_name: row.get(3)?,
        timezone: row.get(4)?,
        google_id: row.get(5)?,
        avatar_url: row.get(6)?,
        created_at: row.get(7)?,
    })
}
