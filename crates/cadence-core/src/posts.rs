//! Post scheduling and the pending -> approved approval gate.
//!
//! Admins may edit or delete any post. A creator may edit or delete their own
//! post only while it is still pending; approval takes that right away.

use cadence_db::models::{PostListRow, PostRow};
use cadence_types::api::{CreatePostRequest, UpdatePostRequest};
use cadence_types::models::{PostStatus, PostView, TimeSlot};
use chrono::NaiveTime;
use tracing::info;
use uuid::Uuid;

use crate::access::{Access, Target};
use crate::{Planner, PlannerError, PlannerResult, convert, validate};

/// Blank strings count as "not set" for optional form fields.
fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn slot_of(value: Option<&str>) -> PlannerResult<Option<TimeSlot>> {
    present(value).map(validate::time_slot).transpose()
}

fn time_of(value: Option<&str>) -> PlannerResult<Option<NaiveTime>> {
    present(value).map(validate::specific_time).transpose()
}

fn post_of(access: Access) -> PlannerResult<PostListRow> {
    access
        .scope
        .post
        .ok_or_else(|| PlannerError::not_found("Post not found"))
}

/// Admin, or the creator while the post is pending.
fn may_modify(access: &Access, post: &PostRow, acting: Uuid) -> PlannerResult<bool> {
    if access.is_admin() {
        return Ok(true);
    }
    let status: PostStatus = convert::stored(&post.status)?;
    Ok(post.created_by == acting && status == PostStatus::Pending)
}

impl Planner {
    pub fn create_post(
        &self,
        project_id: Uuid,
        req: &CreatePostRequest,
        acting: Uuid,
    ) -> PlannerResult<PostView> {
        let access = self.require_member(Target::Project(project_id), acting)?;
        if !access.is_admin() && !self.db().is_project_member(project_id, acting)? {
            return Err(PlannerError::forbidden(
                "You must be assigned to this project to create posts",
            ));
        }

        let title = validate::post_title(&req.title)?;
        let raw_date = present(req.publish_date.as_deref())
            .ok_or_else(|| PlannerError::validation("Publish date is required"))?;
        let publish_date = validate::parse_publish_date(raw_date)?;
        validate::publish_window(publish_date, self.today())?;
        let slot = slot_of(req.publish_time_slot.as_deref())?;
        let time = time_of(req.specific_time.as_deref())?;
        validate::exclusive_schedule(slot, time)?;

        let now = self.now();
        let row = PostRow {
            id: Uuid::new_v4(),
            project_id,
            title,
            publish_date,
            publish_time_slot: slot.map(|s| s.as_str().to_string()),
            specific_time: time,
            status: PostStatus::Pending.as_str().to_string(),
            created_by: acting,
            approved_by: None,
            approved_at: None,
            created_at: now,
            updated_at: now,
        };
        self.db().insert_post(&row)?;
        info!("Post {} created in project {} by {}", row.id, project_id, acting);

        self.reload_post(row.id)
    }

    pub fn get_post(&self, id: Uuid, acting: Uuid) -> PlannerResult<PostView> {
        let access = self.require_member(Target::Post(id), acting)?;
        convert::post_view(post_of(access)?)
    }

    /// Main grid: every visible post in the context, soonest first.
    pub fn list_context_posts(&self, context_id: Uuid, acting: Uuid) -> PlannerResult<Vec<PostView>> {
        self.require_member(Target::Context(context_id), acting)?;
        self.db()
            .list_posts_for_context(context_id)?
            .into_iter()
            .map(convert::post_view)
            .collect()
    }

    pub fn list_project_posts(&self, project_id: Uuid, acting: Uuid) -> PlannerResult<Vec<PostView>> {
        self.require_member(Target::Project(project_id), acting)?;
        self.db()
            .list_posts_for_project(project_id)?
            .into_iter()
            .map(convert::post_view)
            .collect()
    }

    /// Partial update. Setting a slot clears a stored specific time and the
    /// other way round; an explicit null clears a field.
    pub fn update_post(&self, id: Uuid, req: &UpdatePostRequest, acting: Uuid) -> PlannerResult<PostView> {
        let access = self.require_member(Target::Post(id), acting)?;
        let mut post = post_of(access.clone())?.post;
        if !may_modify(&access, &post, acting)? {
            return Err(PlannerError::forbidden("You can only edit your own pending posts"));
        }

        if let Some(title) = &req.title {
            post.title = validate::post_title(title)?;
        }
        if let Some(raw) = present(req.publish_date.as_deref()) {
            let date = validate::parse_publish_date(raw)?;
            validate::publish_window(date, self.today())?;
            post.publish_date = date;
        }

        let new_slot = req.publish_time_slot.as_ref().map(|v| slot_of(v.as_deref())).transpose()?;
        let new_time = req.specific_time.as_ref().map(|v| time_of(v.as_deref())).transpose()?;
        validate::exclusive_schedule(new_slot.flatten(), new_time.flatten())?;
        let mut slot: Option<TimeSlot> = post.publish_time_slot.as_deref().map(convert::stored).transpose()?;
        let mut time = post.specific_time;
        if let Some(value) = new_slot {
            slot = value;
            if value.is_some() {
                time = None;
            }
        }
        if let Some(value) = new_time {
            time = value;
            if value.is_some() {
                slot = None;
            }
        }

        post.publish_time_slot = slot.map(|s| s.as_str().to_string());
        post.specific_time = time;
        post.updated_at = self.now();
        self.db().update_post(&post)?;

        self.reload_post(id)
    }

    pub fn delete_post(&self, id: Uuid, acting: Uuid) -> PlannerResult<()> {
        let access = self.require_member(Target::Post(id), acting)?;
        let post = post_of(access.clone())?.post;
        if !may_modify(&access, &post, acting)? {
            return Err(PlannerError::forbidden("You can only delete your own pending posts"));
        }
        if !self.db().delete_post(id)? {
            return Err(PlannerError::not_found("Post not found"));
        }
        info!("Post {} deleted by {}", id, acting);
        Ok(())
    }

    pub fn approve_post(&self, id: Uuid, acting: Uuid) -> PlannerResult<PostView> {
        let access = self.require_admin(Target::Post(id), acting, "Only admins can approve posts")?;
        let post = post_of(access)?.post;
        let status: PostStatus = convert::stored(&post.status)?;
        if status == PostStatus::Approved {
            return Err(PlannerError::conflict("Post is already approved"));
        }
        // Another admin may have approved it since the read above.
        if !self.db().approve_post(id, acting, self.now())? {
            return Err(PlannerError::conflict("Post is already approved"));
        }
        info!("Post {} approved by {}", id, acting);

        self.reload_post(id)
    }

    fn reload_post(&self, id: Uuid) -> PlannerResult<PostView> {
        let row = self
            .db()
            .get_post(id)?
            .ok_or_else(|| PlannerError::not_found("Post not found"))?;
        convert::post_view(row)
    }
}
