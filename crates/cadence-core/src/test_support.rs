use std::sync::{Arc, Mutex};

use cadence_db::Database;
use cadence_db::models::UserRow;
use cadence_types::api::CreateContextRequest;
use chrono::{DateTime, Duration, Local, TimeZone, Utc};
use mockable::Clock;
use uuid::Uuid;

use crate::Planner;

/// Wall clock pinned to 2026-03-10 09:00 UTC until advanced.
pub(crate) struct TestClock(Mutex<DateTime<Utc>>);

impl TestClock {
    pub fn advance(&self, delta: Duration) {
        let mut now = self.0.lock().unwrap();
        *now += delta;
    }
}

impl Clock for TestClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

pub(crate) struct Harness {
    pub planner: Planner,
    pub clock: Arc<TestClock>,
}

pub(crate) fn harness() -> Harness {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let clock = Arc::new(TestClock(Mutex::new(
        Utc.with_ymd_and_hms(2026, 3, 10, 9, 0, 0).unwrap(),
    )));
    Harness {
        planner: Planner::new(db, clock.clone()),
        clock,
    }
}

/// Insert a password user straight into storage, skipping argon2.
pub(crate) fn user(planner: &Planner, email: &str) -> Uuid {
    let row = UserRow {
        id: Uuid::new_v4(),
        email: email.to_string(),
        password_hash: Some("not-a-real-hash".to_string()),
        full_name: email.split('@').next().unwrap_or("user").to_string(),
        timezone: "UTC".to_string(),
        google_id: None,
        avatar_url: None,
        created_at: planner.now(),
    };
    planner.db().create_user(&row).unwrap();
    row.id
}

pub(crate) fn context(planner: &Planner, owner: Uuid, name: &str) -> Uuid {
    let request = CreateContextRequest {
        name: name.to_string(),
        description: None,
    };
    planner.create_context(&request, owner).unwrap().context.id
}

/// Add `user` to `context_id` as a plain member.
pub(crate) fn join(planner: &Planner, context_id: Uuid, user: Uuid) {
    planner.join_by_id(context_id, user).unwrap();
}
