use cadence_db::models::ProjectRow;
use cadence_types::api::{CreateProjectRequest, UpdateProjectRequest};
use cadence_types::models::Project;
use tracing::info;
use uuid::Uuid;

use crate::access::Target;
use crate::{Planner, PlannerError, PlannerResult, convert, validate};

fn description(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim).filter(|d| !d.is_empty()).map(str::to_string)
}

impl Planner {
    pub fn create_project(
        &self,
        context_id: Uuid,
        req: &CreateProjectRequest,
        acting: Uuid,
    ) -> PlannerResult<Project> {
        self.require_admin(Target::Context(context_id), acting, "Only admins can create projects")?;

        let row = ProjectRow {
            id: Uuid::new_v4(),
            context_id,
            name: validate::entity_name("Project", &req.name)?,
            description: description(req.description.as_deref()),
            color_code: validate::color_code(req.color_code.as_deref())?,
            is_hidden: false,
            created_at: self.now(),
        };
        self.db().insert_project(&row)?;
        info!("Project {} created in context {} by {}", row.id, context_id, acting);
        Ok(convert::project(row))
    }

    /// Visible projects of a context, newest first.
    pub fn list_projects(&self, context_id: Uuid, acting: Uuid) -> PlannerResult<Vec<Project>> {
        self.require_member(Target::Context(context_id), acting)?;
        let rows = self.db().list_projects(context_id)?;
        Ok(rows.into_iter().map(convert::project).collect())
    }

    pub fn get_project(&self, id: Uuid, acting: Uuid) -> PlannerResult<Project> {
        let access = self.require_member(Target::Project(id), acting)?;
        project_of(access.scope.project)
    }

    pub fn update_project(
        &self,
        id: Uuid,
        req: &UpdateProjectRequest,
        acting: Uuid,
    ) -> PlannerResult<Project> {
        let access = self.require_admin(Target::Project(id), acting, "Only admins can update projects")?;
        let mut project = access
            .scope
            .project
            .ok_or_else(|| PlannerError::not_found("Project not found"))?;

        if let Some(name) = &req.name {
            project.name = validate::entity_name("Project", name)?;
        }
        if let Some(raw) = &req.description {
            project.description = description(raw.as_deref());
        }
        if let Some(color) = &req.color_code {
            project.color_code = validate::color_code(Some(color))?;
        }

        self.db().update_project(
            project.id,
            &project.name,
            project.description.as_deref(),
            &project.color_code,
        )?;
        Ok(convert::project(project))
    }

    /// Soft delete: the project and its posts disappear from every listing.
    pub fn delete_project(&self, id: Uuid, acting: Uuid) -> PlannerResult<()> {
        self.require_admin(Target::Project(id), acting, "Only admins can delete projects")?;
        self.db().hide_project(id)?;
        info!("Project {} hidden by {}", id, acting);
        Ok(())
    }
}

fn project_of(row: Option<ProjectRow>) -> PlannerResult<Project> {
    row.map(convert::project)
        .ok_or_else(|| PlannerError::not_found("Project not found"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{self, harness};

    fn launch(name: &str) -> CreateProjectRequest {
        CreateProjectRequest { name: name.into(), ..Default::default() }
    }

    #[test]
    fn members_cannot_create_projects() {
        let h = harness();
        let alice = test_support::user(&h.planner, "alice@example.com");
        let bob = test_support::user(&h.planner, "bob@example.com");
        let acme = test_support::context(&h.planner, alice, "Acme");
        test_support::join(&h.planner, acme, bob);

        let err = h.planner.create_project(acme, &launch("Launch"), bob).unwrap_err();
        assert!(matches!(err, PlannerError::Forbidden(_)));

        let created = h.planner.create_project(acme, &launch("Launch"), alice).unwrap();
        assert_eq!(created.color_code, validate::DEFAULT_COLOR);
        assert_eq!(h.planner.get_project(created.id, bob).unwrap().name, "Launch");
    }

    #[test]
    fn bad_colors_are_rejected() {
        let h = harness();
        let alice = test_support::user(&h.planner, "alice@example.com");
        let acme = test_support::context(&h.planner, alice, "Acme");
        let req = CreateProjectRequest { color_code: Some("#12345".into()), ..launch("Launch") };

        let err = h.planner.create_project(acme, &req, alice).unwrap_err();
        assert!(matches!(err, PlannerError::Validation(_)));
    }

    #[test]
    fn update_can_clear_the_description() {
        let h = harness();
        let alice = test_support::user(&h.planner, "alice@example.com");
        let acme = test_support::context(&h.planner, alice, "Acme");
        let req = CreateProjectRequest { description: Some("Spring".into()), ..launch("Launch") };
        let project = h.planner.create_project(acme, &req, alice).unwrap();

        let patch = UpdateProjectRequest { color_code: Some("#10b981".into()), ..Default::default() };
        let updated = h.planner.update_project(project.id, &patch, alice).unwrap();
        assert_eq!(updated.description.as_deref(), Some("Spring"));
        assert_eq!(updated.color_code, "#10B981");

        let patch = UpdateProjectRequest { description: Some(None), ..Default::default() };
        let updated = h.planner.update_project(project.id, &patch, alice).unwrap();
        assert_eq!(updated.description, None);
    }

    #[test]
    fn deleted_projects_read_as_not_found() {
        let h = harness();
        let alice = test_support::user(&h.planner, "alice@example.com");
        let acme = test_support::context(&h.planner, alice, "Acme");
        let project = h.planner.create_project(acme, &launch("Launch"), alice).unwrap();

        h.planner.delete_project(project.id, alice).unwrap();

        assert!(matches!(h.planner.get_project(project.id, alice), Err(PlannerError::NotFound(_))));
        assert!(h.planner.list_projects(acme, alice).unwrap().is_empty());
        assert!(matches!(
            h.planner.delete_project(project.id, alice),
            Err(PlannerError::NotFound(_))
        ));
    }
}
