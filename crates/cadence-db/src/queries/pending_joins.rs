use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Row};
use uuid::Uuid;

use super::opt_uuid_at;
use crate::Database;
use crate::models::PendingJoinRow;

impl Database {
    pub fn insert_pending_join(&self, pending: &PendingJoinRow) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO pending_joins (ticket, context_id, invite_code, created_at, expires_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    pending.ticket,
                    pending.context_id.map(|id| id.to_string()),
                    pending.invite_code,
                    pending.created_at,
                    pending.expires_at,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_pending_join(&self, ticket: &str) -> Result<Option<PendingJoinRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT ticket, context_id, invite_code, created_at, expires_at
                     FROM pending_joins WHERE ticket = ?1",
                    [ticket],
                    map_pending_join,
                )
                .optional()?;
            Ok(row)
        })
    }

    pub fn update_pending_join(
        &self,
        ticket: &str,
        context_id: Option<Uuid>,
        invite_code: Option<&str>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE pending_joins SET context_id = ?2, invite_code = ?3 WHERE ticket = ?1",
                rusqlite::params![ticket, context_id.map(|id| id.to_string()), invite_code],
            )?;
            Ok(())
        })
    }

    /// Delete and return the ticket in one statement; a second take sees nothing.
    pub fn take_pending_join(&self, ticket: &str) -> Result<Option<PendingJoinRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "DELETE FROM pending_joins WHERE ticket = ?1
                     RETURNING ticket, context_id, invite_code, created_at, expires_at",
                    [ticket],
                    map_pending_join,
                )
                .optional()?;
            Ok(row)
        })
    }

    pub fn purge_expired_pending_joins(&self, now: DateTime<Utc>) -> Result<usize> {
        self.with_conn(|conn| {
            let purged = conn.execute("DELETE FROM pending_joins WHERE expires_at <= ?1", [now])?;
            Ok(purged)
        })
    }
}

fn map_pending_join(row: &Row<'_>) -> rusqlite::Result<PendingJoinRow> {
    Ok(PendingJoinRow {
        ticket: row.get(0)?,
        context_id: opt_uuid_at(row, 1)?,
        invite_code: row.get(2)?,
        created_at: row.get(3)?,
        expires_at: row.get(4)?,
    })
}

#[cfg(test)]
mod tests {
    use crate::Database;
    use crate::models::PendingJoinRow;
    use crate::queries::fixtures;

    #[test]
    fn tickets_are_taken_once() {
        let db = Database::open_in_memory().unwrap();
        db.insert_pending_join(&PendingJoinRow {
            ticket: "t1".to_string(),
            context_id: None,
            invite_code: Some("ABCDEFGH".to_string()),
            created_at: fixtures::ts(1),
            expires_at: fixtures::ts(2),
        })
        .unwrap();

        let taken = db.take_pending_join("t1").unwrap().unwrap();
        assert_eq!(taken.invite_code.as_deref(), Some("ABCDEFGH"));
        assert!(db.take_pending_join("t1").unwrap().is_none());
    }

    #[test]
    fn purge_drops_only_expired_tickets() {
        let db = Database::open_in_memory().unwrap();
        for (ticket, day) in [("old", 2), ("fresh", 9)] {
            db.insert_pending_join(&PendingJoinRow {
                ticket: ticket.to_string(),
                context_id: Some(uuid::Uuid::new_v4()),
                invite_code: None,
                created_at: fixtures::ts(1),
                expires_at: fixtures::ts(day),
            })
            .unwrap();
        }

        assert_eq!(db.purge_expired_pending_joins(fixtures::ts(5)).unwrap(), 1);
        assert!(db.get_pending_join("fresh").unwrap().is_some());
    }
}
