mod contexts;
mod pending_joins;
mod posts;
mod projects;
mod users;

use rusqlite::Row;
use rusqlite::types::Type;
use uuid::Uuid;

/// Ids are stored as hyphenated TEXT.
fn uuid_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let text: String = row.get(idx)?;
    Uuid::parse_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn opt_uuid_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Uuid>> {
    match row.get::<_, Option<String>>(idx)? {
        Some(text) => Uuid::parse_str(&text)
            .map(Some)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))),
        None => Ok(None),
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::{DateTime, TimeZone, Utc};
    use uuid::Uuid;

    use crate::Database;
    use crate::models::{ContextRow, ProjectRow, UserRow};

    pub fn ts(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, 9, 0, 0).unwrap()
    }

    pub fn user(db: &Database, email: &str) -> UserRow {
        let row = UserRow {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: Some("hash".to_string()),
            full_name: email.split('@').next().unwrap_or("user").to_string(),
            timezone: "UTC".to_string(),
            google_id: None,
            avatar_url: None,
            created_at: ts(1),
        };
        db.create_user(&row).unwrap();
        row
    }

    pub fn context(db: &Database, owner: &UserRow, code: &str) -> ContextRow {
        let row = ContextRow {
            id: Uuid::new_v4(),
            name: "Acme".to_string(),
            description: String::new(),
            owner_user_id: owner.id,
            invite_code: code.to_string(),
            is_hidden: false,
            created_at: ts(1),
        };
        db.create_context_with_owner(&row, ts(1)).unwrap();
        row
    }

    pub fn project(db: &Database, context: &ContextRow, name: &str) -> ProjectRow {
        let row = ProjectRow {
            id: Uuid::new_v4(),
            context_id: context.id,
            name: name.to_string(),
            description: None,
            color_code: "#3B82F6".to_string(),
            is_hidden: false,
            created_at: ts(2),
        };
        db.insert_project(&row).unwrap();
        row
    }
}
