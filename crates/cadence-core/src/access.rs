//! The authorization gate. Every protected operation resolves its target to
//! the owning context and checks the acting user's membership there.

use cadence_db::models::{ContextRow, PostListRow, ProjectRow};
use cadence_types::models::{Membership, Role};
use uuid::Uuid;

use crate::{Planner, PlannerError, PlannerResult, convert};

pub(crate) const NOT_A_MEMBER: &str = "You do not have access to this context";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Context(Uuid),
    Project(Uuid),
    Post(Uuid),
}

/// A target resolved down to its visible ancestors.
#[derive(Debug, Clone)]
pub struct Scope {
    pub context: ContextRow,
    pub project: Option<ProjectRow>,
    pub post: Option<PostListRow>,
}

/// A resolved scope together with the acting user's membership in it.
#[derive(Debug, Clone)]
pub struct Access {
    pub scope: Scope,
    pub membership: Membership,
}

impl Access {
    pub fn is_admin(&self) -> bool {
        self.membership.role == Role::Admin
    }

    pub fn is_owner(&self) -> bool {
        is_owner(&self.scope.context, self.membership.user_id)
    }

    pub fn context_id(&self) -> Uuid {
        self.scope.context.id
    }
}

pub fn is_owner(context: &ContextRow, user_id: Uuid) -> bool {
    context.owner_user_id == user_id
}

impl Planner {
    /// Hidden or missing entities at any level resolve to `NotFound`.
    pub fn resolve_scope(&self, target: Target) -> PlannerResult<Scope> {
        let db = self.db();
        match target {
            Target::Context(id) => {
                let context = db
                    .get_context(id)?
                    .ok_or_else(|| PlannerError::not_found("Context not found"))?;
                Ok(Scope { context, project: None, post: None })
            }
            Target::Project(id) => {
                let project = db
                    .get_project(id)?
                    .ok_or_else(|| PlannerError::not_found("Project not found"))?;
                let context = db
                    .get_context(project.context_id)?
                    .ok_or_else(|| PlannerError::not_found("Project not found"))?;
                Ok(Scope { context, project: Some(project), post: None })
            }
            Target::Post(id) => {
                let post = db
                    .get_post(id)?
                    .ok_or_else(|| PlannerError::not_found("Post not found"))?;
                let project = db
                    .get_project(post.post.project_id)?
                    .ok_or_else(|| PlannerError::not_found("Post not found"))?;
                let context = db
                    .get_context(post.context_id)?
                    .ok_or_else(|| PlannerError::not_found("Post not found"))?;
                Ok(Scope { context, project: Some(project), post: Some(post) })
            }
        }
    }

    /// `None` means "not a member"; callers turn that into a denial.
    pub fn is_member(&self, context_id: Uuid, user_id: Uuid) -> PlannerResult<Option<Membership>> {
        self.db()
            .get_membership(context_id, user_id)?
            .map(convert::membership)
            .transpose()
    }

    pub fn is_admin(&self, context_id: Uuid, user_id: Uuid) -> PlannerResult<bool> {
        Ok(self
            .is_member(context_id, user_id)?
            .is_some_and(|m| m.role == Role::Admin))
    }

    pub fn require_member(&self, target: Target, user_id: Uuid) -> PlannerResult<Access> {
        let scope = self.resolve_scope(target)?;
        let membership = self
            .is_member(scope.context.id, user_id)?
            .ok_or_else(|| PlannerError::forbidden(NOT_A_MEMBER))?;
        Ok(Access { scope, membership })
    }

    /// Like [`Planner::require_member`], but a plain member is refused with `denial`.
    pub fn require_admin(&self, target: Target, user_id: Uuid, denial: &str) -> PlannerResult<Access> {
        let access = self.require_member(target, user_id)?;
        if !access.is_admin() {
            return Err(PlannerError::forbidden(denial));
        }
        Ok(access)
    }
}

#[cfg(test)]
mod tests {
    use cadence_types::api::CreateProjectRequest;

    use super::*;
    use crate::test_support::{self, harness};

    #[test]
    fn outsiders_are_forbidden_and_unknown_ids_not_found() {
        let h = harness();
        let alice = test_support::user(&h.planner, "alice@example.com");
        let mallory = test_support::user(&h.planner, "mallory@example.com");
        let acme = test_support::context(&h.planner, alice, "Acme");

        let err = h.planner.require_member(Target::Context(acme), mallory).unwrap_err();
        assert!(matches!(err, PlannerError::Forbidden(_)));

        let err = h.planner.require_member(Target::Project(Uuid::new_v4()), alice).unwrap_err();
        assert!(matches!(err, PlannerError::NotFound(_)));
    }

    #[test]
    fn project_targets_resolve_to_their_context() {
        let h = harness();
        let alice = test_support::user(&h.planner, "alice@example.com");
        let bob = test_support::user(&h.planner, "bob@example.com");
        let acme = test_support::context(&h.planner, alice, "Acme");
        test_support::join(&h.planner, acme, bob);
        let request = CreateProjectRequest { name: "Launch".into(), ..Default::default() };
        let launch = h.planner.create_project(acme, &request, alice).unwrap();

        let access = h.planner.require_member(Target::Project(launch.id), bob).unwrap();
        assert_eq!(access.context_id(), acme);
        assert!(!access.is_admin());
        assert!(!access.is_owner());

        let err = h
            .planner
            .require_admin(Target::Project(launch.id), bob, "Admins only")
            .unwrap_err();
        assert_eq!(err.to_string(), "Admins only");
    }

    #[test]
    fn owner_is_derived_not_a_role() {
        let h = harness();
        let alice = test_support::user(&h.planner, "alice@example.com");
        let acme = test_support::context(&h.planner, alice, "Acme");

        let access = h.planner.require_member(Target::Context(acme), alice).unwrap();
        assert_eq!(access.membership.role, Role::Admin);
        assert!(access.is_owner());
        assert!(h.planner.is_admin(acme, alice).unwrap());
    }
}
