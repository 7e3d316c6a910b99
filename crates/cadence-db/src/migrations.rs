use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id                TEXT PRIMARY KEY,
                email             TEXT NOT NULL UNIQUE COLLATE NOCASE,
                password_hash     TEXT,
                full_name         TEXT NOT NULL,
                timezone          TEXT NOT NULL DEFAULT 'UTC',
                google_id         TEXT UNIQUE,
                avatar_url        TEXT,
                reset_token_hash  TEXT,
                reset_expires_at  TEXT,
                created_at        TEXT NOT NULL
            );

            CREATE UNIQUE INDEX idx_users_reset_token
                ON users(reset_token_hash) WHERE reset_token_hash IS NOT NULL;

            CREATE TABLE contexts (
                id             TEXT PRIMARY KEY,
                name           TEXT NOT NULL,
                description    TEXT NOT NULL DEFAULT '',
                owner_user_id  TEXT NOT NULL REFERENCES users(id),
                invite_code    TEXT NOT NULL UNIQUE,
                is_hidden      INTEGER NOT NULL DEFAULT 0,
                created_at     TEXT NOT NULL
            );

            CREATE TABLE context_members (
                context_id  TEXT NOT NULL REFERENCES contexts(id),
                user_id     TEXT NOT NULL REFERENCES users(id),
                role        TEXT NOT NULL CHECK (role IN ('admin', 'member')),
                created_at  TEXT NOT NULL,
                PRIMARY KEY (context_id, user_id)
            );

            CREATE INDEX idx_context_members_user ON context_members(user_id);

            CREATE TABLE projects (
                id           TEXT PRIMARY KEY,
                context_id   TEXT NOT NULL REFERENCES contexts(id),
                name         TEXT NOT NULL,
                description  TEXT,
                color_code   TEXT NOT NULL DEFAULT '#3B82F6',
                is_hidden    INTEGER NOT NULL DEFAULT 0,
                created_at   TEXT NOT NULL
            );

            CREATE INDEX idx_projects_context ON projects(context_id, created_at);

            CREATE TABLE project_members (
                project_id  TEXT NOT NULL REFERENCES projects(id),
                user_id     TEXT NOT NULL REFERENCES users(id),
                created_at  TEXT NOT NULL,
                PRIMARY KEY (project_id, user_id)
            );

            CREATE TABLE posts (
                id                 TEXT PRIMARY KEY,
                project_id         TEXT NOT NULL REFERENCES projects(id),
                title              TEXT NOT NULL,
                publish_date       TEXT NOT NULL,
                publish_time_slot  TEXT CHECK (publish_time_slot IN ('morning', 'noon', 'evening')),
                specific_time      TEXT,
                status             TEXT NOT NULL DEFAULT 'pending'
                                   CHECK (status IN ('pending', 'approved')),
                created_by         TEXT NOT NULL REFERENCES users(id),
                approved_by        TEXT REFERENCES users(id),
                approved_at        TEXT,
                created_at         TEXT NOT NULL,
                updated_at         TEXT NOT NULL,
                CHECK (publish_time_slot IS NULL OR specific_time IS NULL)
            );

            CREATE INDEX idx_posts_project_date ON posts(project_id, publish_date);

            CREATE TABLE pending_joins (
                ticket       TEXT PRIMARY KEY,
                context_id   TEXT,
                invite_code  TEXT,
                created_at   TEXT NOT NULL,
                expires_at   TEXT NOT NULL
            );

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
