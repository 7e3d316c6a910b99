use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::{opt_uuid_at, uuid_at};
use crate::Database;
use crate::models::{PostListRow, PostRow};

// Posts are only reachable through a visible project in a visible context.
const POST_LIST_SELECT: &str = "
    SELECT po.id, po.project_id, po.title, po.publish_date, po.publish_time_slot,
           po.specific_time, po.status, po.created_by, po.approved_by, po.approved_at,
           po.created_at, po.updated_at,
           p.context_id, p.name, p.color_code, cu.full_name, au.full_name
    FROM posts po
    JOIN projects p ON p.id = po.project_id
    JOIN contexts c ON c.id = p.context_id
    LEFT JOIN users cu ON cu.id = po.created_by
    LEFT JOIN users au ON au.id = po.approved_by
    WHERE p.is_hidden = 0 AND c.is_hidden = 0";

impl Database {
    pub fn insert_post(&self, post: &PostRow) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO posts (id, project_id, title, publish_date, publish_time_slot, specific_time,
                                    status, created_by, approved_by, approved_at, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                rusqlite::params![
                    post.id.to_string(),
                    post.project_id.to_string(),
                    post.title,
                    post.publish_date,
                    post.publish_time_slot,
                    post.specific_time,
                    post.status,
                    post.created_by.to_string(),
                    post.approved_by.map(|id| id.to_string()),
                    post.approved_at,
                    post.created_at,
                    post.updated_at,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_post(&self, id: Uuid) -> Result<Option<PostListRow>> {
        self.with_conn(|conn| {
            let sql = format!("{POST_LIST_SELECT} AND po.id = ?1");
            let row = conn.query_row(&sql, [id.to_string()], map_post_list).optional()?;
            Ok(row)
        })
    }

    /// Main grid: every visible post of a context, soonest first.
    pub fn list_posts_for_context(&self, context_id: Uuid) -> Result<Vec<PostListRow>> {
        self.with_conn(|conn| query_post_list(conn, "p.context_id", context_id))
    }

    pub fn list_posts_for_project(&self, project_id: Uuid) -> Result<Vec<PostListRow>> {
        self.with_conn(|conn| query_post_list(conn, "po.project_id", project_id))
    }

    /// Write back the editable fields. Status and approval stamps are left alone.
    pub fn update_post(&self, post: &PostRow) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE posts
                 SET title = ?2, publish_date = ?3, publish_time_slot = ?4, specific_time = ?5, updated_at = ?6
                 WHERE id = ?1",
                rusqlite::params![
                    post.id.to_string(),
                    post.title,
                    post.publish_date,
                    post.publish_time_slot,
                    post.specific_time,
                    post.updated_at,
                ],
            )?;
            Ok(())
        })
    }

    pub fn delete_post(&self, id: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let removed = conn.execute("DELETE FROM posts WHERE id = ?1", [id.to_string()])?;
            Ok(removed > 0)
        })
    }

    /// pending -> approved. Returns false when the post was not pending, so
    /// two racing approvals cannot both win.
    pub fn approve_post(&self, id: Uuid, approved_by: Uuid, at: DateTime<Utc>) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE posts SET status = 'approved', approved_by = ?2, approved_at = ?3, updated_at = ?3
                 WHERE id = ?1 AND status = 'pending'",
                rusqlite::params![id.to_string(), approved_by.to_string(), at],
            )?;
            Ok(changed > 0)
        })
    }
}

fn query_post_list(conn: &Connection, column: &str, id: Uuid) -> Result<Vec<PostListRow>> {
    let sql = format!("{POST_LIST_SELECT} AND {column} = ?1 ORDER BY po.publish_date ASC, po.created_at ASC");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([id.to_string()], map_post_list)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn map_post_list(row: &Row<'_>) -> rusqlite::Result<PostListRow> {
    Ok(PostListRow {
        post: PostRow {
            id: uuid_at(row, 0)?,
            project_id: uuid_at(row, 1)?,
            title: row.get(2)?,
            publish_date: row.get(3)?,
            publish_time_slot: row.get(4)?,
            specific_time: row.get(5)?,
            status: row.get(6)?,
            created_by: uuid_at(row, 7)?,
            approved_by: opt_uuid_at(row, 8)?,
            approved_at: row.get(9)?,
            created_at: row.get(10)?,
            updated_at: row.get(11)?,
        },
        context_id: uuid_at(row, 12)?,
        project_name: row.get(13)?,
        project_color: row.get(14)?,
        created_by_name: row.get(15)?,
        approved_by_name: row.get(16)?,
    })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use uuid::Uuid;

    use crate::Database;
    use crate::models::PostRow;
    use crate::queries::fixtures;

    fn post(project_id: Uuid, created_by: Uuid, day: u32) -> PostRow {
        PostRow {
            id: Uuid::new_v4(),
            project_id,
            title: format!("Post {day}"),
            publish_date: NaiveDate::from_ymd_opt(2026, 3, day).unwrap(),
            publish_time_slot: Some("morning".to_string()),
            specific_time: None,
            status: "pending".to_string(),
            created_by,
            approved_by: None,
            approved_at: None,
            created_at: fixtures::ts(1),
            updated_at: fixtures::ts(1),
        }
    }

    #[test]
    fn approval_only_moves_pending_posts() {
        let db = Database::open_in_memory().unwrap();
        let alice = fixtures::user(&db, "alice@example.com");
        let acme = fixtures::context(&db, &alice, "ABCDEFGH");
        let launch = fixtures::project(&db, &acme, "Launch");
        let row = post(launch.id, alice.id, 10);
        db.insert_post(&row).unwrap();

        assert!(db.approve_post(row.id, alice.id, fixtures::ts(5)).unwrap());
        assert!(!db.approve_post(row.id, alice.id, fixtures::ts(6)).unwrap());

        let stored = db.get_post(row.id).unwrap().unwrap();
        assert_eq!(stored.post.status, "approved");
        assert_eq!(stored.post.approved_by, Some(alice.id));
        assert_eq!(stored.post.approved_at, Some(fixtures::ts(5)));
        assert_eq!(stored.approved_by_name.as_deref(), Some("alice"));
    }

    #[test]
    fn posts_of_hidden_projects_are_filtered() {
        let db = Database::open_in_memory().unwrap();
        let alice = fixtures::user(&db, "alice@example.com");
        let acme = fixtures::context(&db, &alice, "ABCDEFGH");
        let launch = fixtures::project(&db, &acme, "Launch");
        let ops = fixtures::project(&db, &acme, "Ops");
        let hidden = post(launch.id, alice.id, 10);
        let kept = post(ops.id, alice.id, 12);
        db.insert_post(&hidden).unwrap();
        db.insert_post(&kept).unwrap();

        db.hide_project(launch.id).unwrap();

        assert!(db.get_post(hidden.id).unwrap().is_none());
        let listed: Vec<_> =
            db.list_posts_for_context(acme.id).unwrap().into_iter().map(|r| r.post.id).collect();
        assert_eq!(listed, vec![kept.id]);
    }

    #[test]
    fn context_listing_is_sorted_by_date() {
        let db = Database::open_in_memory().unwrap();
        let alice = fixtures::user(&db, "alice@example.com");
        let acme = fixtures::context(&db, &alice, "ABCDEFGH");
        let launch = fixtures::project(&db, &acme, "Launch");
        for day in [20, 5, 12] {
            db.insert_post(&post(launch.id, alice.id, day)).unwrap();
        }

        let days: Vec<_> = db
            .list_posts_for_project(launch.id)
            .unwrap()
            .into_iter()
            .map(|r| r.post.title)
            .collect();
        assert_eq!(days, vec!["Post 5", "Post 12", "Post 20"]);
    }
}
