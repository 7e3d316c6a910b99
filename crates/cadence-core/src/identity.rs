//! Accounts: password registration and login, Google sign-in upsert and
//! password reset tokens.

use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use cadence_db::is_unique_violation;
use cadence_db::models::UserRow;
use cadence_types::api::RegisterRequest;
use cadence_types::models::User;
use chrono::{DateTime, Duration, Utc};
use rand_core::OsRng;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{Planner, PlannerError, PlannerResult, convert, validate};

pub const RESET_TOKEN_TTL_HOURS: i64 = 1;

const BAD_CREDENTIALS: &str = "Invalid email or password";
const BAD_RESET_TOKEN: &str = "Invalid or expired reset token";

/// A profile already verified by the identity provider.
#[derive(Debug, Clone)]
pub struct FederatedProfile {
    pub google_id: String,
    pub email: String,
    pub full_name: String,
    pub avatar_url: Option<String>,
}

/// A freshly issued reset token. Only its digest is stored.
#[derive(Debug, Clone)]
pub struct IssuedReset {
    pub user: User,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

fn hash_password(password: &str) -> PlannerResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?
        .to_string();
    Ok(hash)
}

fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            warn!("Stored password hash is unreadable: {}", e);
            false
        }
    }
}

fn token_digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.trim().as_bytes()))
}

impl Planner {
    pub fn register(&self, req: &RegisterRequest) -> PlannerResult<User> {
        let email = validate::email(&req.email)?;
        validate::password(&req.password)?;
        let full_name = validate::full_name(&req.full_name)?;
        let timezone = validate::timezone(req.timezone.as_deref())?;

        if self.db().get_user_by_email(&email)?.is_some() {
            return Err(PlannerError::conflict("Email already registered"));
        }

        let row = UserRow {
            id: Uuid::new_v4(),
            email,
            password_hash: Some(hash_password(&req.password)?),
            full_name,
            timezone,
            google_id: None,
            avatar_url: None,
            created_at: self.now(),
        };
        match self.db().create_user(&row) {
            Ok(()) => {}
            Err(e) if is_unique_violation(&e) => {
                return Err(PlannerError::conflict("Email already registered"));
            }
            Err(e) => return Err(e.into()),
        }
        info!("User registered: {}", row.id);
        Ok(convert::user(row))
    }

    /// Unknown emails, wrong passwords and password-less (Google) accounts all
    /// fail the same way.
    pub fn login(&self, email: &str, password: &str) -> PlannerResult<User> {
        let denied = || PlannerError::Unauthenticated(BAD_CREDENTIALS.to_string());
        let user = self
            .db()
            .get_user_by_email(email.trim())?
            .ok_or_else(denied)?;
        let hash = user.password_hash.as_deref().ok_or_else(denied)?;
        if !verify_password(password, hash) {
            return Err(denied());
        }
        debug!("User {} logged in", user.id);
        Ok(convert::user(user))
    }

    pub fn get_user(&self, id: Uuid) -> PlannerResult<User> {
        self.db()
            .get_user_by_id(id)?
            .map(convert::user)
            .ok_or_else(|| PlannerError::not_found("User not found"))
    }

    /// Find the account for a Google profile: by Google id, then by email
    /// (linking the identity), otherwise create a password-less account.
    pub fn sign_in_federated(&self, profile: &FederatedProfile) -> PlannerResult<User> {
        let db = self.db();
        if let Some(user) = db.get_user_by_google_id(&profile.google_id)? {
            return Ok(convert::user(user));
        }

        let email = validate::email(&profile.email)?;
        if let Some(user) = db.get_user_by_email(&email)? {
            db.link_google_identity(user.id, &profile.google_id, profile.avatar_url.as_deref())?;
            info!("Linked Google identity to user {}", user.id);
            return self.get_user(user.id);
        }

        let full_name = match profile.full_name.trim() {
            "" => email.split('@').next().unwrap_or_default().to_string(),
            name => name.to_string(),
        };
        let row = UserRow {
            id: Uuid::new_v4(),
            email,
            password_hash: None,
            full_name,
            timezone: "UTC".to_string(),
            google_id: Some(profile.google_id.clone()),
            avatar_url: profile.avatar_url.clone(),
            created_at: self.now(),
        };
        db.create_user(&row)?;
        info!("User registered via Google: {}", row.id);
        Ok(convert::user(row))
    }

    /// Issue a one-hour reset token. `None` for unknown emails so callers can
    /// answer identically either way.
    pub fn request_password_reset(&self, email: &str) -> PlannerResult<Option<IssuedReset>> {
        let email = validate::email(email)
            .map_err(|_| PlannerError::validation("Valid email is required"))?;
        let Some(user) = self.db().get_user_by_email(&email)? else {
            debug!("Password reset requested for unknown email");
            return Ok(None);
        };
        if user.password_hash.is_none() {
            return Err(PlannerError::validation(
                "This account uses Google Sign-In. Please sign in with Google.",
            ));
        }

        let token = hex::encode(rand::random::<[u8; 32]>());
        let expires_at = self.now() + Duration::hours(RESET_TOKEN_TTL_HOURS);
        self.db().set_reset_token(user.id, &token_digest(&token), expires_at)?;
        info!("Password reset token issued for user {}", user.id);

        Ok(Some(IssuedReset {
            user: convert::user(user),
            token,
            expires_at,
        }))
    }

    /// Returns the user id the token belongs to.
    pub fn verify_reset_token(&self, token: &str) -> PlannerResult<Uuid> {
        if token.trim().is_empty() {
            return Err(PlannerError::validation("Reset token is required"));
        }
        let ticket = self
            .db()
            .find_reset_ticket(&token_digest(token))?
            .ok_or_else(|| PlannerError::validation(BAD_RESET_TOKEN))?;
        if ticket.expires_at < self.now() {
            self.db().clear_reset_token(ticket.user_id)?;
            return Err(PlannerError::validation(
                "Reset token has expired. Please request a new one.",
            ));
        }
        Ok(ticket.user_id)
    }

    /// Set a new password; the token is burned in the same statement.
    pub fn reset_password(&self, token: &str, password: &str) -> PlannerResult<()> {
        validate::password(password)?;
        let user_id = self.verify_reset_token(token)?;
        self.db().reset_password(user_id, &hash_password(password)?)?;
        info!("Password reset for user {}", user_id);
        Ok(())
    }
}
