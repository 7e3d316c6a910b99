//! Cadence planner core.
//!
//! Every operation takes the acting user's id (already authenticated by the
//! HTTP layer) and runs the single authorization gate in [`access`] before
//! touching storage. Operations are blocking; callers on an async runtime
//! should run them on the blocking pool.

pub mod access;
pub mod contexts;
pub mod error;
pub mod identity;
pub mod invites;
pub mod membership;
pub mod posts;
pub mod projects;
pub mod public;
pub mod validate;

mod convert;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use cadence_db::Database;
use chrono::{DateTime, NaiveDate, Utc};
use mockable::Clock;

pub use error::{PlannerError, PlannerResult};

pub struct Planner {
    db: Arc<Database>,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl Planner {
    pub fn new(db: Arc<Database>, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        Self { db, clock }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.utc()
    }

    /// Calendar day used for publish-date bounds and the public window.
    pub fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}
