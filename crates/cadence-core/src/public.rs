//! Unauthenticated read-only view of a context: public fields, project
//! badges, a short upcoming window and overall counts.

use cadence_db::models::ContextRow;
use cadence_types::models::{
    DashboardStats, Post, PostStatus, PostView, PublicContext, PublicDashboard, PublicPost,
    TimeSlot,
};
use chrono::{Days, NaiveDate, NaiveTime};
use uuid::Uuid;

use crate::{Planner, PlannerError, PlannerResult, convert};

/// Days after today still shown publicly.
pub const UPCOMING_WINDOW_DAYS: u64 = 4;
pub const UPCOMING_LIMIT: usize = 10;

fn public_fields(row: ContextRow) -> PublicContext {
    PublicContext {
        id: row.id,
        name: row.name,
        description: row.description,
        created_at: row.created_at,
    }
}

/// Within a day: slotted posts in slot order, then timed posts, then unscheduled.
fn schedule_key(post: &Post) -> (u8, Option<TimeSlot>, Option<NaiveTime>) {
    match (post.publish_time_slot, post.specific_time) {
        (Some(slot), _) => (0, Some(slot), None),
        (None, Some(time)) => (1, None, Some(time)),
        (None, None) => (2, None, None),
    }
}

fn upcoming(mut posts: Vec<PostView>, today: NaiveDate) -> Vec<PublicPost> {
    let last = today
        .checked_add_days(Days::new(UPCOMING_WINDOW_DAYS))
        .unwrap_or(NaiveDate::MAX);
    posts.retain(|v| (today..=last).contains(&v.post.publish_date));
    posts.sort_by(|a, b| {
        (a.post.publish_date, schedule_key(&a.post), a.post.created_at).cmp(&(
            b.post.publish_date,
            schedule_key(&b.post),
            b.post.created_at,
        ))
    });
    posts
        .into_iter()
        .take(UPCOMING_LIMIT)
        .map(|v| PublicPost {
            id: v.post.id,
            title: v.post.title,
            publish_date: v.post.publish_date,
            publish_time_slot: v.post.publish_time_slot,
            specific_time: v.post.specific_time,
            status: v.post.status,
            project: v.project,
        })
        .collect()
}

impl Planner {
    pub fn public_context(&self, context_id: Uuid) -> PlannerResult<PublicContext> {
        self.db()
            .get_context(context_id)?
            .map(public_fields)
            .ok_or_else(|| PlannerError::not_found("Context not found"))
    }

    /// Stats count every visible post; only the upcoming list is windowed.
    pub fn dashboard(&self, context_id: Uuid) -> PlannerResult<PublicDashboard> {
        let context = self.public_context(context_id)?;
        let db = self.db();

        let projects: Vec<_> = db.list_projects(context_id)?.iter().map(convert::badge).collect();
        let posts = db
            .list_posts_for_context(context_id)?
            .into_iter()
            .map(convert::post_view)
            .collect::<PlannerResult<Vec<_>>>()?;

        let pending_posts = posts.iter().filter(|v| v.post.status == PostStatus::Pending).count();
        let stats = DashboardStats {
            total_projects: projects.len(),
            total_posts: posts.len(),
            pending_posts,
            approved_posts: posts.len() - pending_posts,
        };

        Ok(PublicDashboard {
            context,
            projects,
            stats,
            upcoming_posts: upcoming(posts, self.today()),
        })
    }
}

#[cfg(test)]
mod tests {
    use cadence_types::api::{CreatePostRequest, CreateProjectRequest};

    use super::*;
    use crate::test_support::{self, harness};

    fn post_on(offset: u64, slot: Option<&str>, time: Option<&str>, today: NaiveDate) -> CreatePostRequest {
        CreatePostRequest {
            title: format!("Post +{offset}"),
            publish_date: Some(today.checked_add_days(Days::new(offset)).unwrap().to_string()),
            publish_time_slot: slot.map(str::to_string),
            specific_time: time.map(str::to_string),
        }
    }

    #[test]
    fn window_limits_posts_but_not_stats() {
        let h = harness();
        let p = &h.planner;
        let alice = test_support::user(p, "alice@example.com");
        let acme = test_support::context(p, alice, "Acme");
        let req = CreateProjectRequest { name: "Launch".into(), ..Default::default() };
        let launch = p.create_project(acme, &req, alice).unwrap();
        let today = p.today();

        let mut first = None;
        for offset in [30, 4, 5, 0, 12, 20, 2, 45, 59, 60, 7, 9] {
            let post = p.create_post(launch.id, &post_on(offset, None, None, today), alice).unwrap();
            first.get_or_insert(post.post.id);
        }
        p.approve_post(first.unwrap(), alice).unwrap();

        let dashboard = p.dashboard(acme).unwrap();
        assert_eq!(dashboard.stats.total_posts, 12);
        assert_eq!(dashboard.stats.total_projects, 1);
        assert_eq!(dashboard.stats.approved_posts, 1);
        assert_eq!(dashboard.stats.pending_posts, 11);

        let titles: Vec<_> = dashboard.upcoming_posts.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, ["Post +0", "Post +2", "Post +4"]);
        assert_eq!(dashboard.upcoming_posts[0].project.name, "Launch");
    }

    #[test]
    fn at_most_ten_posts_in_schedule_order() {
        let h = harness();
        let p = &h.planner;
        let alice = test_support::user(p, "alice@example.com");
        let acme = test_support::context(p, alice, "Acme");
        let req = CreateProjectRequest { name: "Launch".into(), ..Default::default() };
        let launch = p.create_project(acme, &req, alice).unwrap();
        let today = p.today();

        p.create_post(launch.id, &post_on(0, None, None, today), alice).unwrap();
        p.create_post(launch.id, &post_on(0, None, Some("08:00"), today), alice).unwrap();
        p.create_post(launch.id, &post_on(0, Some("evening"), None, today), alice).unwrap();
        p.create_post(launch.id, &post_on(0, Some("morning"), None, today), alice).unwrap();
        for _ in 0..8 {
            p.create_post(launch.id, &post_on(1, Some("noon"), None, today), alice).unwrap();
        }

        let upcoming = p.dashboard(acme).unwrap().upcoming_posts;
        assert_eq!(upcoming.len(), UPCOMING_LIMIT);
        assert_eq!(upcoming[0].publish_time_slot, Some(TimeSlot::Morning));
        assert_eq!(upcoming[1].publish_time_slot, Some(TimeSlot::Evening));
        assert!(upcoming[2].specific_time.is_some());
        assert!(upcoming[3].publish_time_slot.is_none() && upcoming[3].specific_time.is_none());
    }

    #[test]
    fn hidden_projects_drop_out_of_the_projection() {
        let h = harness();
        let p = &h.planner;
        let alice = test_support::user(p, "alice@example.com");
        let acme = test_support::context(p, alice, "Acme");
        let req = CreateProjectRequest { name: "Launch".into(), ..Default::default() };
        let launch = p.create_project(acme, &req, alice).unwrap();
        p.create_post(launch.id, &post_on(1, None, None, p.today()), alice).unwrap();

        p.delete_project(launch.id, alice).unwrap();

        let dashboard = p.dashboard(acme).unwrap();
        assert!(dashboard.projects.is_empty());
        assert!(dashboard.upcoming_posts.is_empty());
        assert_eq!(dashboard.stats, DashboardStats::default());
    }

    #[test]
    fn unknown_context_is_not_found() {
        let h = harness();
        assert!(matches!(h.planner.dashboard(Uuid::new_v4()), Err(PlannerError::NotFound(_))));
    }
}
