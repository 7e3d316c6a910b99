use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Row};
use uuid::Uuid;

use super::uuid_at;
use crate::Database;
use crate::models::{ProjectMemberRow, ProjectRow};

const PROJECT_COLUMNS: &str =
    "p.id, p.context_id, p.name, p.description, p.color_code, p.is_hidden, p.created_at";

impl Database {
    pub fn insert_project(&self, project: &ProjectRow) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO projects (id, context_id, name, description, color_code, is_hidden, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    project.id.to_string(),
                    project.context_id.to_string(),
                    project.name,
                    project.description,
                    project.color_code,
                    project.is_hidden,
                    project.created_at,
                ],
            )?;
            Ok(())
        })
    }

    /// A project is visible only while neither it nor its context is hidden.
    pub fn get_project(&self, id: Uuid) -> Result<Option<ProjectRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {PROJECT_COLUMNS}
                 FROM projects p
                 JOIN contexts c ON c.id = p.context_id
                 WHERE p.id = ?1 AND p.is_hidden = 0 AND c.is_hidden = 0"
            );
            let row = conn.query_row(&sql, [id.to_string()], map_project).optional()?;
            Ok(row)
        })
    }

    /// Visible projects of a context, newest first.
    pub fn list_projects(&self, context_id: Uuid) -> Result<Vec<ProjectRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {PROJECT_COLUMNS}
                 FROM projects p
                 WHERE p.context_id = ?1 AND p.is_hidden = 0
                 ORDER BY p.created_at DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([context_id.to_string()], map_project)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn update_project(
        &self,
        id: Uuid,
        name: &str,
        description: Option<&str>,
        color_code: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE projects SET name = ?2, description = ?3, color_code = ?4 WHERE id = ?1",
                rusqlite::params![id.to_string(), name, description, color_code],
            )?;
            Ok(())
        })
    }

    /// Soft delete. Child rows are untouched.
    pub fn hide_project(&self, id: Uuid) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("UPDATE projects SET is_hidden = 1 WHERE id = ?1", [id.to_string()])?;
            Ok(())
        })
    }

    // -- Project members --

    pub fn is_project_member(&self, project_id: Uuid, user_id: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let found = conn
                .query_row(
                    "SELECT 1 FROM project_members WHERE project_id = ?1 AND user_id = ?2",
                    [project_id.to_string(), user_id.to_string()],
                    |_| Ok(()),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }

    pub fn insert_project_member(
        &self,
        project_id: Uuid,
        user_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO project_members (project_id, user_id, created_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![project_id.to_string(), user_id.to_string(), at],
            )?;
            Ok(())
        })
    }

    /// Returns false when the user was not assigned.
    pub fn remove_project_member(&self, project_id: Uuid, user_id: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM project_members WHERE project_id = ?1 AND user_id = ?2",
                [project_id.to_string(), user_id.to_string()],
            )?;
            Ok(removed > 0)
        })
    }

    pub fn list_project_members(&self, project_id: Uuid) -> Result<Vec<ProjectMemberRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT u.id, u.email, u.full_name, pm.created_at
                 FROM project_members pm
                 JOIN users u ON u.id = pm.user_id
                 WHERE pm.project_id = ?1
                 ORDER BY pm.created_at ASC, u.email ASC",
            )?;
            let rows = stmt
                .query_map([project_id.to_string()], |row| {
                    Ok(ProjectMemberRow {
                        user_id: uuid_at(row, 0)?,
                        email: row.get(1)?,
                        full_name: row.get(2)?,
                        created_at: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn map_project(row: &Row<'_>) -> rusqlite::Result<ProjectRow> {
    Ok(ProjectRow {
        id: uuid_at(row, 0)?,
        context_id: uuid_at(row, 1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        color_code: row.get(4)?,
        is_hidden: row.get(5)?,
        created_at: row.get(6)?,
    })
}
