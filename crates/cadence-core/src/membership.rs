//! Role changes, removals and project assignments. The owner's admin
//! membership can be neither demoted nor removed, and nobody can change or
//! remove their own membership through the admin paths.

use cadence_db::is_unique_violation;
use cadence_types::models::{Member, ProjectMember, Role};
use tracing::info;
use uuid::Uuid;

use crate::access::{Access, Target, is_owner};
use crate::{Planner, PlannerError, PlannerResult, convert};

/// Checks for an admin acting on another member. `access` is the admin's own.
fn guard_member_change(access: &Access, target: Uuid, action: &str) -> PlannerResult<()> {
    if target == access.membership.user_id {
        return Err(PlannerError::forbidden(format!("You cannot {action} for yourself")));
    }
    if is_owner(&access.scope.context, target) {
        return Err(PlannerError::forbidden(format!(
            "You cannot {action} for the context owner"
        )));
    }
    Ok(())
}

impl Planner {
    pub fn update_role(
        &self,
        context_id: Uuid,
        target: Uuid,
        role: &str,
        acting: Uuid,
    ) -> PlannerResult<Member> {
        let access = self.require_admin(
            Target::Context(context_id),
            acting,
            "Only admins can change member roles",
        )?;
        let role: Role = role
            .trim()
            .parse()
            .map_err(|_| PlannerError::validation("Role must be either admin or member"))?;
        guard_member_change(&access, target, "change roles")?;

        if !self.db().update_member_role(context_id, target, role.as_str())? {
            return Err(PlannerError::not_found("Member not found"));
        }
        info!("User {} set role of {} in context {} to {}", acting, target, context_id, role.as_str());

        self.member(&access, target)
    }

    /// Removing a member also drops their project assignments in the context.
    pub fn remove_member(&self, context_id: Uuid, target: Uuid, acting: Uuid) -> PlannerResult<()> {
        let access = self.require_admin(
            Target::Context(context_id),
            acting,
            "Only admins can remove members",
        )?;
        guard_member_change(&access, target, "remove members")?;
        if !self.db().remove_context_member(context_id, target)? {
            return Err(PlannerError::not_found("Member not found"));
        }
        info!("User {} removed {} from context {}", acting, target, context_id);
        Ok(())
    }

    /// A non-owner leaves a context on their own.
    pub fn leave_context(&self, context_id: Uuid, acting: Uuid) -> PlannerResult<()> {
        let access = self.require_member(Target::Context(context_id), acting)?;
        if access.is_owner() {
            return Err(PlannerError::forbidden("The context owner cannot leave the context"));
        }
        self.db().remove_context_member(context_id, acting)?;
        info!("User {} left context {}", acting, context_id);
        Ok(())
    }

    pub fn list_members(&self, context_id: Uuid, acting: Uuid) -> PlannerResult<Vec<Member>> {
        let access = self.require_member(Target::Context(context_id), acting)?;
        let owner = access.scope.context.owner_user_id;
        self.db()
            .list_context_members(context_id)?
            .into_iter()
            .map(|row| convert::member(row, owner))
            .collect()
    }

    fn member(&self, access: &Access, user_id: Uuid) -> PlannerResult<Member> {
        let owner = access.scope.context.owner_user_id;
        self.db()
            .list_context_members(access.context_id())?
            .into_iter()
            .find(|row| row.user_id == user_id)
            .map(|row| convert::member(row, owner))
            .unwrap_or_else(|| Err(PlannerError::not_found("Member not found")))
    }

    // -- Project assignments --

    pub fn add_project_member(
        &self,
        project_id: Uuid,
        user_id: Uuid,
        acting: Uuid,
    ) -> PlannerResult<ProjectMember> {
        let access = self.require_admin(
            Target::Project(project_id),
            acting,
            "Only admins can manage project members",
        )?;
        if self.is_member(access.context_id(), user_id)?.is_none() {
            return Err(PlannerError::PreconditionFailed(
                "User must be a member of the context first".to_string(),
            ));
        }

        match self.db().insert_project_member(project_id, user_id, self.now()) {
            Ok(()) => {}
            Err(e) if is_unique_violation(&e) => {
                return Err(PlannerError::conflict("User is already assigned to this project"));
            }
            Err(e) => return Err(e.into()),
        }
        info!("User {} assigned {} to project {}", acting, user_id, project_id);

        self.db()
            .list_project_members(project_id)?
            .into_iter()
            .find(|row| row.user_id == user_id)
            .map(convert::project_member)
            .ok_or_else(|| PlannerError::not_found("Project member not found"))
    }

    pub fn remove_project_member(
        &self,
        project_id: Uuid,
        user_id: Uuid,
        acting: Uuid,
    ) -> PlannerResult<()> {
        self.require_admin(
            Target::Project(project_id),
            acting,
            "Only admins can manage project members",
        )?;
        if !self.db().remove_project_member(project_id, user_id)? {
            return Err(PlannerError::not_found("User is not assigned to this project"));
        }
        info!("User {} unassigned {} from project {}", acting, user_id, project_id);
        Ok(())
    }

    pub fn list_project_members(
        &self,
        project_id: Uuid,
        acting: Uuid,
    ) -> PlannerResult<Vec<ProjectMember>> {
        self.require_member(Target::Project(project_id), acting)?;
        let rows = self.db().list_project_members(project_id)?;
        Ok(rows.into_iter().map(convert::project_member).collect())
    }
}

#[cfg(test)]
mod tests {
    use cadence_types::api::CreateProjectRequest;

    use super::*;
    use crate::test_support::{self, Harness, harness};

    struct Team {
        h: Harness,
        acme: Uuid,
        alice: Uuid,
        bob: Uuid,
        carol: Uuid,
    }

    /// Alice owns Acme; Bob and Carol joined as members.
    fn team() -> Team {
        let h = harness();
        let alice = test_support::user(&h.planner, "alice@example.com");
        let bob = test_support::user(&h.planner, "bob@example.com");
        let carol = test_support::user(&h.planner, "carol@example.com");
        let acme = test_support::context(&h.planner, alice, "Acme");
        test_support::join(&h.planner, acme, bob);
        test_support::join(&h.planner, acme, carol);
        Team { h, acme, alice, bob, carol }
    }

    #[test]
    fn promoted_admin_still_cannot_touch_the_owner() {
        let t = team();
        let p = &t.h.planner;

        let promoted = p.update_role(t.acme, t.bob, "admin", t.alice).unwrap();
        assert_eq!(promoted.role, Role::Admin);
        assert!(!promoted.is_owner);

        let err = p.update_role(t.acme, t.alice, "member", t.bob).unwrap_err();
        assert!(matches!(err, PlannerError::Forbidden(_)));
        let err = p.remove_member(t.acme, t.alice, t.bob).unwrap_err();
        assert!(matches!(err, PlannerError::Forbidden(_)));
        assert!(p.is_admin(t.acme, t.alice).unwrap());

        // Bob can manage ordinary members now.
        p.remove_member(t.acme, t.carol, t.bob).unwrap();
        assert!(p.is_member(t.acme, t.carol).unwrap().is_none());
    }

    #[test]
    fn nobody_changes_their_own_membership() {
        let t = team();
        let p = &t.h.planner;
        p.update_role(t.acme, t.bob, "admin", t.alice).unwrap();

        let err = p.update_role(t.acme, t.bob, "member", t.bob).unwrap_err();
        assert!(matches!(err, PlannerError::Forbidden(_)));
        let err = p.remove_member(t.acme, t.alice, t.alice).unwrap_err();
        assert!(matches!(err, PlannerError::Forbidden(_)));
    }

    #[test]
    fn members_cannot_manage_roles() {
        let t = team();
        let err = t.h.planner.update_role(t.acme, t.carol, "admin", t.bob).unwrap_err();
        assert!(matches!(err, PlannerError::Forbidden(_)));
    }

    #[test]
    fn unknown_roles_are_validation_errors() {
        let t = team();
        let err = t.h.planner.update_role(t.acme, t.bob, "owner", t.alice).unwrap_err();
        assert!(matches!(err, PlannerError::Validation(_)));
    }

    #[test]
    fn admin_gate_comes_before_role_and_owner_checks() {
        let t = team();
        let p = &t.h.planner;

        // A member naming an unknown role for the owner is refused, not validated.
        let err = p.update_role(t.acme, t.alice, "owner", t.bob).unwrap_err();
        assert_eq!(err.to_string(), "Only admins can change member roles");

        // An admin with an unknown role hears about the role first.
        let err = p.update_role(t.acme, t.alice, "owner", t.alice).unwrap_err();
        assert!(matches!(err, PlannerError::Validation(_)));

        let err = p.remove_member(t.acme, t.alice, t.carol).unwrap_err();
        assert_eq!(err.to_string(), "Only admins can remove members");
    }

    #[test]
    fn role_change_for_a_stranger_is_not_found() {
        let t = team();
        let dave = test_support::user(&t.h.planner, "dave@example.com");
        let err = t.h.planner.update_role(t.acme, dave, "admin", t.alice).unwrap_err();
        assert!(matches!(err, PlannerError::NotFound(_)));
    }

    #[test]
    fn owner_cannot_leave_but_members_can() {
        let t = team();
        let p = &t.h.planner;
        assert!(matches!(p.leave_context(t.acme, t.alice), Err(PlannerError::Forbidden(_))));

        p.leave_context(t.acme, t.bob).unwrap();
        let members = p.list_members(t.acme, t.alice).unwrap();
        assert_eq!(members.len(), 2);
        assert!(members.iter().any(|m| m.user_id == t.alice && m.is_owner));
    }

    #[test]
    fn project_assignment_requires_context_membership() {
        let t = team();
        let p = &t.h.planner;
        let req = CreateProjectRequest { name: "Launch".into(), ..Default::default() };
        let launch = p.create_project(t.acme, &req, t.alice).unwrap();
        let dave = test_support::user(p, "dave@example.com");

        let err = p.add_project_member(launch.id, dave, t.alice).unwrap_err();
        assert!(matches!(err, PlannerError::PreconditionFailed(_)));

        let added = p.add_project_member(launch.id, t.bob, t.alice).unwrap();
        assert_eq!(added.email, "bob@example.com");
        let err = p.add_project_member(launch.id, t.bob, t.alice).unwrap_err();
        assert!(matches!(err, PlannerError::Conflict(_)));

        let err = p.add_project_member(launch.id, t.carol, t.bob).unwrap_err();
        assert!(matches!(err, PlannerError::Forbidden(_)));
        assert_eq!(p.list_project_members(launch.id, t.carol).unwrap().len(), 1);
    }

    #[test]
    fn removal_cascades_to_project_assignments() {
        let t = team();
        let p = &t.h.planner;
        let req = CreateProjectRequest { name: "Launch".into(), ..Default::default() };
        let launch = p.create_project(t.acme, &req, t.alice).unwrap();
        p.add_project_member(launch.id, t.bob, t.alice).unwrap();

        p.remove_member(t.acme, t.bob, t.alice).unwrap();
        assert!(p.list_project_members(launch.id, t.alice).unwrap().is_empty());

        let err = p.remove_project_member(launch.id, t.bob, t.alice).unwrap_err();
        assert!(matches!(err, PlannerError::NotFound(_)));
    }
}
