//! Invite codes, joining, and join intents parked across sign-in.

use cadence_db::is_unique_violation;
use cadence_db::models::{ContextRow, PendingJoinRow};
use cadence_types::api::{PendingJoinRequest, PendingJoinResponse};
use cadence_types::models::{JoinResult, Role};
use chrono::Duration;
use rand::Rng;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::access::Target;
use crate::{Planner, PlannerError, PlannerResult};

/// Upper-case letters and digits minus the look-alikes 0, O, 1, I and L.
pub const INVITE_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";
pub const INVITE_CODE_LEN: usize = 8;
pub const PENDING_JOIN_TTL_MINUTES: i64 = 30;

const REGENERATE_ATTEMPTS: usize = 5;

pub fn generate_invite_code() -> String {
    let mut rng = rand::rng();
    (0..INVITE_CODE_LEN)
        .map(|_| INVITE_ALPHABET[rng.random_range(0..INVITE_ALPHABET.len())] as char)
        .collect()
}

pub fn normalize_invite_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// 32 random bytes, hex encoded.
fn new_ticket() -> String {
    hex::encode(rand::random::<[u8; 32]>())
}

fn joined(context: &ContextRow, already_member: bool) -> JoinResult {
    JoinResult {
        context_id: context.id,
        context_name: context.name.clone(),
        already_member,
    }
}

impl Planner {
    /// Replace the invite code; the old one stops working immediately.
    pub fn regenerate_invite_code(&self, context_id: Uuid, acting: Uuid) -> PlannerResult<String> {
        self.require_admin(
            Target::Context(context_id),
            acting,
            "Only admins can regenerate invite codes",
        )?;

        for attempt in 1..=REGENERATE_ATTEMPTS {
            let code = generate_invite_code();
            match self.db().set_invite_code(context_id, &code) {
                Ok(()) => {
                    info!("Invite code regenerated for context {} by {}", context_id, acting);
                    return Ok(code);
                }
                Err(e) if is_unique_violation(&e) => {
                    warn!("Invite code collision on attempt {}, retrying", attempt);
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(PlannerError::Unexpected(anyhow::anyhow!(
            "no unique invite code after {} attempts",
            REGENERATE_ATTEMPTS
        )))
    }

    /// Join with a shared code. Joining twice is a `Conflict`.
    pub fn join_by_code(&self, code: &str, user_id: Uuid) -> PlannerResult<JoinResult> {
        self.join_with_code(code, user_id, false)
    }

    /// Join by context id. Already being a member is reported, not refused.
    pub fn join_by_id(&self, context_id: Uuid, user_id: Uuid) -> PlannerResult<JoinResult> {
        let context = self
            .db()
            .get_context(context_id)?
            .ok_or_else(|| PlannerError::not_found("Context not found"))?;
        self.enroll(&context, user_id, true)
    }

    fn join_with_code(&self, code: &str, user_id: Uuid, idempotent: bool) -> PlannerResult<JoinResult> {
        let code = normalize_invite_code(code);
        if code.is_empty() {
            return Err(PlannerError::validation("Invite code is required"));
        }
        let context = self
            .db()
            .find_context_by_invite_code(&code)?
            .ok_or_else(|| PlannerError::not_found("Invalid invite code"))?;
        self.enroll(&context, user_id, idempotent)
    }

    fn enroll(&self, context: &ContextRow, user_id: Uuid, idempotent: bool) -> PlannerResult<JoinResult> {
        let already = || {
            if idempotent {
                Ok(joined(context, true))
            } else {
                Err(PlannerError::conflict("You are already a member of this context"))
            }
        };

        if self.is_member(context.id, user_id)?.is_some() {
            return already();
        }

        match self
            .db()
            .insert_membership(context.id, user_id, Role::Member.as_str(), self.now())
        {
            Ok(()) => {
                info!("User {} joined context {}", user_id, context.id);
                Ok(joined(context, false))
            }
            // Lost a race with a concurrent join of the same user.
            Err(e) if is_unique_violation(&e) => already(),
            Err(e) => Err(e.into()),
        }
    }

    /// Park a join intent before the user has signed in. Passing a live
    /// `ticket` merges the new target into it so an id and a code can both
    /// be carried.
    pub fn stage_pending_join(&self, req: &PendingJoinRequest) -> PlannerResult<PendingJoinResponse> {
        let invite_code = req
            .invite_code
            .as_deref()
            .map(normalize_invite_code)
            .filter(|code| !code.is_empty());
        if req.context_id.is_none() && invite_code.is_none() {
            return Err(PlannerError::validation(
                "A context id or an invite code is required",
            ));
        }

        let now = self.now();
        let db = self.db();

        if let Some(ticket) = req.ticket.as_deref() {
            if let Some(existing) = db.get_pending_join(ticket)?.filter(|p| p.expires_at > now) {
                let context_id = req.context_id.or(existing.context_id);
                let invite_code = invite_code.or(existing.invite_code);
                db.update_pending_join(ticket, context_id, invite_code.as_deref())?;
                debug!("Merged join intent into pending ticket");
                return Ok(PendingJoinResponse {
                    ticket: existing.ticket,
                    expires_at: existing.expires_at,
                });
            }
        }

        let purged = db.purge_expired_pending_joins(now)?;
        if purged > 0 {
            debug!("Purged {} expired pending joins", purged);
        }

        let pending = PendingJoinRow {
            ticket: new_ticket(),
            context_id: req.context_id,
            invite_code,
            created_at: now,
            expires_at: now + Duration::minutes(PENDING_JOIN_TTL_MINUTES),
        };
        db.insert_pending_join(&pending)?;
        Ok(PendingJoinResponse {
            ticket: pending.ticket,
            expires_at: pending.expires_at,
        })
    }

    /// Redeem a pending-join ticket for a freshly signed-in user. The ticket
    /// is burned before the join is attempted. Failures are logged and
    /// reported as `None` so sign-in itself never fails here.
    pub fn consume_pending_join(&self, ticket: &str, user_id: Uuid) -> Option<JoinResult> {
        let pending = match self.db().take_pending_join(ticket) {
            Ok(Some(pending)) => pending,
            Ok(None) => {
                debug!("Pending join ticket unknown or already used");
                return None;
            }
            Err(e) => {
                warn!("Failed to take pending join ticket: {}", e);
                return None;
            }
        };
        if pending.expires_at <= self.now() {
            debug!("Pending join ticket expired at {}", pending.expires_at);
            return None;
        }

        if let Some(context_id) = pending.context_id {
            match self.join_by_id(context_id, user_id) {
                Ok(result) => return Some(result),
                Err(e) => warn!("Deferred join of context {} failed: {}", context_id, e),
            }
        }
        if let Some(code) = pending.invite_code.as_deref() {
            match self.join_with_code(code, user_id, true) {
                Ok(result) => return Some(result),
                Err(e) => warn!("Deferred join by invite code failed: {}", e),
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{self, harness};

    fn invite_code(h: &test_support::Harness, context: Uuid, admin: Uuid) -> String {
        h.planner.get_context(context, admin).unwrap().context.invite_code.unwrap()
    }

    #[test]
    fn codes_avoid_ambiguous_glyphs() {
        for _ in 0..200 {
            let code = generate_invite_code();
            assert_eq!(code.len(), INVITE_CODE_LEN);
            assert!(code.bytes().all(|b| INVITE_ALPHABET.contains(&b)));
            assert!(!code.contains(['0', 'O', '1', 'I', 'L']));
        }
    }

    #[test]
    fn join_by_code_normalises_and_refuses_repeat() {
        let h = harness();
        let alice = test_support::user(&h.planner, "alice@example.com");
        let bob = test_support::user(&h.planner, "bob@example.com");
        let acme = test_support::context(&h.planner, alice, "Acme");
        let code = invite_code(&h, acme, alice);

        let typed = format!("  {}  ", code.to_lowercase());
        let result = h.planner.join_by_code(&typed, bob).unwrap();
        assert_eq!(result.context_id, acme);
        assert!(!result.already_member);
        assert_eq!(h.planner.is_member(acme, bob).unwrap().unwrap().role, Role::Member);

        let err = h.planner.join_by_code(&code, bob).unwrap_err();
        assert!(matches!(err, PlannerError::Conflict(_)));

        let err = h.planner.join_by_code("ZZZZZZZZ", bob).unwrap_err();
        assert!(matches!(err, PlannerError::NotFound(_)));
    }

    #[test]
    fn join_by_id_is_idempotent() {
        let h = harness();
        let alice = test_support::user(&h.planner, "alice@example.com");
        let bob = test_support::user(&h.planner, "bob@example.com");
        let acme = test_support::context(&h.planner, alice, "Acme");

        assert!(!h.planner.join_by_id(acme, bob).unwrap().already_member);
        assert_eq!(h.planner.list_members(acme, alice).unwrap().len(), 2);

        assert!(h.planner.join_by_id(acme, bob).unwrap().already_member);
        // The owner keeps their admin role.
        assert!(h.planner.join_by_id(acme, alice).unwrap().already_member);
        assert!(h.planner.is_admin(acme, alice).unwrap());
        assert_eq!(h.planner.list_members(acme, alice).unwrap().len(), 2);
    }

    #[test]
    fn hidden_contexts_cannot_be_joined() {
        let h = harness();
        let alice = test_support::user(&h.planner, "alice@example.com");
        let bob = test_support::user(&h.planner, "bob@example.com");
        let acme = test_support::context(&h.planner, alice, "Acme");
        let code = invite_code(&h, acme, alice);
        h.planner
            .db()
            .with_conn(|conn| {
                conn.execute("UPDATE contexts SET is_hidden = 1 WHERE id = ?1", [acme.to_string()])?;
                Ok(())
            })
            .unwrap();

        assert!(matches!(h.planner.join_by_id(acme, bob), Err(PlannerError::NotFound(_))));
        assert!(matches!(h.planner.join_by_code(&code, bob), Err(PlannerError::NotFound(_))));
    }

    #[test]
    fn regenerated_code_replaces_the_old_one() {
        let h = harness();
        let alice = test_support::user(&h.planner, "alice@example.com");
        let bob = test_support::user(&h.planner, "bob@example.com");
        let carol = test_support::user(&h.planner, "carol@example.com");
        let acme = test_support::context(&h.planner, alice, "Acme");
        test_support::join(&h.planner, acme, bob);
        let old = invite_code(&h, acme, alice);

        let err = h.planner.regenerate_invite_code(acme, bob).unwrap_err();
        assert!(matches!(err, PlannerError::Forbidden(_)));

        let new = h.planner.regenerate_invite_code(acme, alice).unwrap();
        assert_ne!(new, old);
        assert!(matches!(h.planner.join_by_code(&old, carol), Err(PlannerError::NotFound(_))));
        assert!(h.planner.join_by_code(&new, carol).is_ok());
    }

    #[test]
    fn pending_join_is_consumed_once() {
        let h = harness();
        let alice = test_support::user(&h.planner, "alice@example.com");
        let bob = test_support::user(&h.planner, "bob@example.com");
        let acme = test_support::context(&h.planner, alice, "Acme");

        let staged = h
            .planner
            .stage_pending_join(&PendingJoinRequest { context_id: Some(acme), ..Default::default() })
            .unwrap();
        assert_eq!(staged.ticket.len(), 64);

        let joined = h.planner.consume_pending_join(&staged.ticket, bob).unwrap();
        assert_eq!(joined.context_id, acme);
        assert!(h.planner.consume_pending_join(&staged.ticket, bob).is_none());
    }

    #[test]
    fn expired_tickets_do_nothing() {
        let h = harness();
        let alice = test_support::user(&h.planner, "alice@example.com");
        let bob = test_support::user(&h.planner, "bob@example.com");
        let acme = test_support::context(&h.planner, alice, "Acme");

        let staged = h
            .planner
            .stage_pending_join(&PendingJoinRequest { context_id: Some(acme), ..Default::default() })
            .unwrap();
        h.clock.advance(Duration::minutes(PENDING_JOIN_TTL_MINUTES + 1));

        assert!(h.planner.consume_pending_join(&staged.ticket, bob).is_none());
        assert!(h.planner.is_member(acme, bob).unwrap().is_none());
    }

    #[test]
    fn merged_ticket_falls_back_to_the_code() {
        let h = harness();
        let alice = test_support::user(&h.planner, "alice@example.com");
        let bob = test_support::user(&h.planner, "bob@example.com");
        let acme = test_support::context(&h.planner, alice, "Acme");
        let code = invite_code(&h, acme, alice);

        let first = h
            .planner
            .stage_pending_join(&PendingJoinRequest {
                invite_code: Some(code.to_lowercase()),
                ..Default::default()
            })
            .unwrap();
        let merged = h
            .planner
            .stage_pending_join(&PendingJoinRequest {
                context_id: Some(Uuid::new_v4()),
                invite_code: None,
                ticket: Some(first.ticket.clone()),
            })
            .unwrap();
        assert_eq!(merged.ticket, first.ticket);

        // The staged id points nowhere, so the code carries the join.
        let joined = h.planner.consume_pending_join(&first.ticket, bob).unwrap();
        assert_eq!(joined.context_id, acme);
    }

    #[test]
    fn staging_needs_a_target() {
        let h = harness();
        let err = h.planner.stage_pending_join(&PendingJoinRequest::default()).unwrap_err();
        assert!(matches!(err, PlannerError::Validation(_)));
    }
}
