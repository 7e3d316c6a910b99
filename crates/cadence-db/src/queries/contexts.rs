use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::uuid_at;
use crate::Database;
use crate::models::{ContextRow, MemberContextRow, MemberRow, MembershipRow};

const CONTEXT_COLUMNS: &str =
    "c.id, c.name, c.description, c.owner_user_id, c.invite_code, c.is_hidden, c.created_at";

impl Database {
    // -- Contexts --

    /// Insert a context together with its owner's admin membership. Both rows
    /// land or neither does.
    pub fn create_context_with_owner(
        &self,
        context: &ContextRow,
        joined_at: DateTime<Utc>,
    ) -> Result<()> {
        self.with_tx(|conn| {
            conn.execute(
                "INSERT INTO contexts (id, name, description, owner_user_id, invite_code, is_hidden, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    context.id.to_string(),
                    context.name,
                    context.description,
                    context.owner_user_id.to_string(),
                    context.invite_code,
                    context.is_hidden,
                    context.created_at,
                ],
            )?;
            insert_membership(conn, context.id, context.owner_user_id, "admin", joined_at)
        })
    }

    /// Visible contexts only; hidden ones read as absent.
    pub fn get_context(&self, id: Uuid) -> Result<Option<ContextRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {CONTEXT_COLUMNS} FROM contexts c WHERE c.id = ?1 AND c.is_hidden = 0");
            let row = conn.query_row(&sql, [id.to_string()], map_context).optional()?;
            Ok(row)
        })
    }

    /// Exact match on the stored (upper-case) code, visible contexts only.
    pub fn find_context_by_invite_code(&self, code: &str) -> Result<Option<ContextRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {CONTEXT_COLUMNS} FROM contexts c WHERE c.invite_code = ?1 AND c.is_hidden = 0"
            );
            let row = conn.query_row(&sql, [code], map_context).optional()?;
            Ok(row)
        })
    }

    pub fn list_contexts_for_user(&self, user_id: Uuid) -> Result<Vec<MemberContextRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {CONTEXT_COLUMNS}, m.role
                 FROM context_members m
                 JOIN contexts c ON c.id = m.context_id
                 WHERE m.user_id = ?1 AND c.is_hidden = 0
                 ORDER BY c.created_at ASC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id.to_string()], |row| {
                    Ok(MemberContextRow {
                        context: map_context(row)?,
                        role: row.get(7)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn update_context(&self, id: Uuid, name: &str, description: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE contexts SET name = ?2, description = ?3 WHERE id = ?1",
                rusqlite::params![id.to_string(), name, description],
            )?;
            Ok(())
        })
    }

    pub fn set_invite_code(&self, id: Uuid, code: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE contexts SET invite_code = ?2 WHERE id = ?1",
                rusqlite::params![id.to_string(), code],
            )?;
            Ok(())
        })
    }

    // -- Memberships --

    pub fn get_membership(&self, context_id: Uuid, user_id: Uuid) -> Result<Option<MembershipRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT context_id, user_id, role, created_at FROM context_members
                     WHERE context_id = ?1 AND user_id = ?2",
                    [context_id.to_string(), user_id.to_string()],
                    |row| {
                        Ok(MembershipRow {
                            context_id: uuid_at(row, 0)?,
                            user_id: uuid_at(row, 1)?,
                            role: row.get(2)?,
                            created_at: row.get(3)?,
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })
    }

    pub fn insert_membership(
        &self,
        context_id: Uuid,
        user_id: Uuid,
        role: &str,
        at: DateTime<Utc>,
    ) -> Result<()> {
        self.with_conn(|conn| insert_membership(conn, context_id, user_id, role, at))
    }

    /// Returns false when there was no such membership.
    pub fn update_member_role(&self, context_id: Uuid, user_id: Uuid, role: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE context_members SET role = ?3 WHERE context_id = ?1 AND user_id = ?2",
                rusqlite::params![context_id.to_string(), user_id.to_string(), role],
            )?;
            Ok(changed > 0)
        })
    }

    /// Remove a context membership along with the user's project assignments
    /// inside that context. Returns false when there was no such membership.
    pub fn remove_context_member(&self, context_id: Uuid, user_id: Uuid) -> Result<bool> {
        self.with_tx(|conn| {
            let cid = context_id.to_string();
            let uid = user_id.to_string();
            conn.execute(
                "DELETE FROM project_members
                 WHERE user_id = ?2
                   AND project_id IN (SELECT id FROM projects WHERE context_id = ?1)",
                [&cid, &uid],
            )?;
            let removed = conn.execute(
                "DELETE FROM context_members WHERE context_id = ?1 AND user_id = ?2",
                [&cid, &uid],
            )?;
            Ok(removed > 0)
        })
    }

    pub fn list_context_members(&self, context_id: Uuid) -> Result<Vec<MemberRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT u.id, u.email, u.full_name, m.role, m.created_at
                 FROM context_members m
                 JOIN users u ON u.id = m.user_id
                 WHERE m.context_id = ?1
                 ORDER BY m.created_at ASC, u.email ASC",
            )?;
            let rows = stmt
                .query_map([context_id.to_string()], |row| {
                    Ok(MemberRow {
                        user_id: uuid_at(row, 0)?,
                        email: row.get(1)?,
                        full_name: row.get(2)?,
                        role: row.get(3)?,
                        joined_at: row.get(4)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn insert_membership(
    conn: &Connection,
    context_id: Uuid,
    user_id: Uuid,
    role: &str,
    at: DateTime<Utc>,
) -> Result<()> {
    conn.execute(
        "INSERT INTO context_members (context_id, user_id, role, created_at) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![context_id.to_string(), user_id.to_string(), role, at],
    )?;
    Ok(())
}

fn map_context(row: &Row<'_>) -> rusqlite::Result<ContextRow> {
    Ok(ContextRow {
        id: uuid_at(row, 0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        owner_user_id: uuid_at(row, 3)?,
        invite_code: row.get(4)?,
        is_hidden: row.get(5)?,
        created_at: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use crate::queries::fixtures;
    use crate::{Database, is_unique_violation};

    #[test]
    fn creating_a_context_makes_the_owner_admin() {
        let db = Database::open_in_memory().unwrap();
        let alice = fixtures::user(&db, "alice@example.com");
        let acme = fixtures::context(&db, &alice, "ABCDEFGH");

        let membership = db.get_membership(acme.id, alice.id).unwrap().unwrap();
        assert_eq!(membership.role, "admin");
        assert_eq!(db.list_contexts_for_user(alice.id).unwrap().len(), 1);
    }

    #[test]
    fn rejected_context_leaves_nothing_behind() {
        let db = Database::open_in_memory().unwrap();
        let alice = fixtures::user(&db, "alice@example.com");
        let mut ghost = fixtures::context(&db, &alice, "ABCDEFGH");
        ghost.id = uuid::Uuid::new_v4();
        ghost.invite_code = "HGFEDCBA".to_string();
        // Unknown owner trips the foreign key.
        ghost.owner_user_id = uuid::Uuid::new_v4();

        assert!(db.create_context_with_owner(&ghost, fixtures::ts(1)).is_err());
        assert!(db.get_context(ghost.id).unwrap().is_none());
    }

    #[test]
    fn duplicate_membership_is_a_unique_violation() {
        let db = Database::open_in_memory().unwrap();
        let alice = fixtures::user(&db, "alice@example.com");
        let acme = fixtures::context(&db, &alice, "ABCDEFGH");

        let err = db.insert_membership(acme.id, alice.id, "member", fixtures::ts(2)).unwrap_err();
        assert!(is_unique_violation(&err));
    }

    #[test]
    fn removing_a_member_drops_their_project_assignments() {
        let db = Database::open_in_memory().unwrap();
        let alice = fixtures::user(&db, "alice@example.com");
        let bob = fixtures::user(&db, "bob@example.com");
        let acme = fixtures::context(&db, &alice, "ABCDEFGH");
        let launch = fixtures::project(&db, &acme, "Launch");

        db.insert_membership(acme.id, bob.id, "member", fixtures::ts(2)).unwrap();
        db.insert_project_member(launch.id, bob.id, fixtures::ts(2)).unwrap();

        assert!(db.remove_context_member(acme.id, bob.id).unwrap());
        assert!(!db.is_project_member(launch.id, bob.id).unwrap());
        assert!(!db.remove_context_member(acme.id, bob.id).unwrap());
    }
}
