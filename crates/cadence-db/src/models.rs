/// Database row types, mapped one-to-one onto SQLite rows.
/// Distinct from cadence-types models to keep the DB layer independent;
/// enum columns stay as text and are parsed by the planner.
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub password_hash: Option<String>,
    pub full_name: String,
    pub timezone: String,
    pub google_id: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// The user a reset-token hash belongs to, with the token's deadline.
#[derive(Debug, Clone)]
pub struct ResetTicketRow {
    pub user_id: Uuid,
    pub email: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ContextRow {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub owner_user_id: Uuid,
    pub invite_code: String,
    pub is_hidden: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct MembershipRow {
    pub context_id: Uuid,
    pub user_id: Uuid,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

/// A membership joined with the member's identity.
#[derive(Debug, Clone)]
pub struct MemberRow {
    pub user_id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: String,
    pub joined_at: DateTime<Utc>,
}

/// A context listed for one user, with that user's role.
#[derive(Debug, Clone)]
pub struct MemberContextRow {
    pub context: ContextRow,
    pub role: String,
}

#[derive(Debug, Clone)]
pub struct ProjectRow {
    pub id: Uuid,
    pub context_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub color_code: String,
    pub is_hidden: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ProjectMemberRow {
    pub user_id: Uuid,
    pub email: String,
    pub full_name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct PostRow {
    pub id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    pub publish_date: NaiveDate,
    pub publish_time_slot: Option<String>,
    pub specific_time: Option<NaiveTime>,
    pub status: String,
    pub created_by: Uuid,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A visible post joined with its project and the people involved.
#[derive(Debug, Clone)]
pub struct PostListRow {
    pub post: PostRow,
    pub context_id: Uuid,
    pub project_name: String,
    pub project_color: String,
    pub created_by_name: Option<String>,
    pub approved_by_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PendingJoinRow {
    pub ticket: String,
    pub context_id: Option<Uuid>,
    pub invite_code: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}
