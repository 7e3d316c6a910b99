//! Row to API model conversions. Enum columns are parsed here; a value the
//! schema CHECKs should have rejected surfaces as `Unexpected`.

use std::str::FromStr;

use cadence_db::models::{
    ContextRow, MemberRow, MembershipRow, PostListRow, PostRow, ProjectMemberRow, ProjectRow,
    UserRow,
};
use cadence_types::models::{
    Context, Member, Membership, Post, PostView, Project, ProjectBadge, ProjectMember, User,
    UnknownVariant,
};

use crate::{PlannerError, PlannerResult};

pub(crate) fn stored<T>(value: &str) -> PlannerResult<T>
where
    T: FromStr<Err = UnknownVariant>,
{
    value.parse().map_err(|e: UnknownVariant| PlannerError::Unexpected(e.into()))
}

pub(crate) fn user(row: UserRow) -> User {
    User {
        id: row.id,
        email: row.email,
        full_name: row.full_name,
        timezone: row.timezone,
        is_google_user: row.google_id.is_some(),
        avatar_url: row.avatar_url,
        created_at: row.created_at,
    }
}

pub(crate) fn context(row: ContextRow, with_invite_code: bool) -> Context {
    Context {
        id: row.id,
        name: row.name,
        description: row.description,
        owner_user_id: row.owner_user_id,
        invite_code: with_invite_code.then_some(row.invite_code),
        created_at: row.created_at,
    }
}

pub(crate) fn membership(row: MembershipRow) -> PlannerResult<Membership> {
    Ok(Membership {
        context_id: row.context_id,
        user_id: row.user_id,
        role: stored(&row.role)?,
        created_at: row.created_at,
    })
}

pub(crate) fn member(row: MemberRow, owner_user_id: uuid::Uuid) -> PlannerResult<Member> {
    Ok(Member {
        is_owner: row.user_id == owner_user_id,
        user_id: row.user_id,
        email: row.email,
        full_name: row.full_name,
        role: stored(&row.role)?,
        joined_at: row.joined_at,
    })
}

pub(crate) fn project(row: ProjectRow) -> Project {
    Project {
        id: row.id,
        context_id: row.context_id,
        name: row.name,
        description: row.description,
        color_code: row.color_code,
        created_at: row.created_at,
    }
}

pub(crate) fn badge(row: &ProjectRow) -> ProjectBadge {
    ProjectBadge {
        id: row.id,
        name: row.name.clone(),
        color_code: row.color_code.clone(),
    }
}

pub(crate) fn project_member(row: ProjectMemberRow) -> ProjectMember {
    ProjectMember {
        user_id: row.user_id,
        email: row.email,
        full_name: row.full_name,
        added_at: row.created_at,
    }
}

pub(crate) fn post(row: PostRow) -> PlannerResult<Post> {
    let publish_time_slot = row.publish_time_slot.as_deref().map(stored).transpose()?;
    Ok(Post {
        id: row.id,
        project_id: row.project_id,
        title: row.title,
        publish_date: row.publish_date,
        publish_time_slot,
        specific_time: row.specific_time,
        status: stored(&row.status)?,
        created_by: row.created_by,
        approved_by: row.approved_by,
        approved_at: row.approved_at,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

pub(crate) fn post_view(row: PostListRow) -> PlannerResult<PostView> {
    let project = ProjectBadge {
        id: row.post.project_id,
        name: row.project_name,
        color_code: row.project_color,
    };
    Ok(PostView {
        post: post(row.post)?,
        project,
        created_by_name: row.created_by_name,
        approved_by_name: row.approved_by_name,
    })
}
