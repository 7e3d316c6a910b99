use cadence_db::is_unique_violation;
use cadence_db::models::ContextRow;
use cadence_types::api::{CreateContextRequest, UpdateContextRequest};
use cadence_types::models::{ContextView, Role};
use tracing::{info, warn};
use uuid::Uuid;

use crate::access::{Target, is_owner};
use crate::{Planner, PlannerError, PlannerResult, convert, invites, validate};

/// Fresh invite codes drawn before giving up on a unique one.
const INVITE_CODE_ATTEMPTS: usize = 5;

fn view(row: ContextRow, role: Role, user_id: Uuid) -> ContextView {
    let owner = is_owner(&row, user_id);
    ContextView {
        context: convert::context(row, role == Role::Admin),
        user_role: role,
        is_owner: owner,
    }
}

fn description(raw: Option<&str>) -> String {
    raw.map(str::trim).unwrap_or_default().to_string()
}

impl Planner {
    /// The context row and the creator's admin membership are written in one
    /// transaction.
    pub fn create_context(
        &self,
        req: &CreateContextRequest,
        acting: Uuid,
    ) -> PlannerResult<ContextView> {
        let name = validate::entity_name("Context", &req.name)?;
        let description = description(req.description.as_deref());
        let now = self.now();

        for attempt in 1..=INVITE_CODE_ATTEMPTS {
            let row = ContextRow {
                id: Uuid::new_v4(),
                name: name.clone(),
                description: description.clone(),
                owner_user_id: acting,
                invite_code: invites::generate_invite_code(),
                is_hidden: false,
                created_at: now,
            };
            match self.db().create_context_with_owner(&row, now) {
                Ok(()) => {
                    info!("Context {} created by {}", row.id, acting);
                    return Ok(view(row, Role::Admin, acting));
                }
                Err(e) if is_unique_violation(&e) => {
                    warn!("Invite code collision on attempt {}, retrying", attempt);
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(PlannerError::Unexpected(anyhow::anyhow!(
            "no unique invite code after {} attempts",
            INVITE_CODE_ATTEMPTS
        )))
    }

    /// Visible contexts the user belongs to, oldest first.
    pub fn list_contexts(&self, acting: Uuid) -> PlannerResult<Vec<ContextView>> {
        self.db()
            .list_contexts_for_user(acting)?
            .into_iter()
            .map(|row| {
                let role = convert::stored(&row.role)?;
                Ok(view(row.context, role, acting))
            })
            .collect()
    }

    pub fn get_context(&self, id: Uuid, acting: Uuid) -> PlannerResult<ContextView> {
        let access = self.require_member(Target::Context(id), acting)?;
        Ok(view(access.scope.context, access.membership.role, acting))
    }

    pub fn update_context(
        &self,
        id: Uuid,
        req: &UpdateContextRequest,
        acting: Uuid,
    ) -> PlannerResult<ContextView> {
        let access = self.require_admin(
            Target::Context(id),
            acting,
            "Only admins can update context settings",
        )?;
        let mut context = access.scope.context;

        if let Some(name) = &req.name {
            context.name = validate::entity_name("Context", name)?;
        }
        if let Some(raw) = &req.description {
            context.description = description(Some(raw));
        }

        self.db().update_context(context.id, &context.name, &context.description)?;
        Ok(view(context, access.membership.role, acting))
    }
}
