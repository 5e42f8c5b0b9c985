use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, info};

use super::google::VerifiedIdentity;
use super::password::{hash_password, verify_password};
use super::repo::UserStore;
use super::repo_types::{NewUser, User};
use crate::error::{AppError, StoreError};

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Find or create the user behind an external identity.
///
/// - unknown email: a new user without password is created
/// - known email without external id: the external id is attached
/// - known email with external id: nothing changes
///
/// Losing a creation race to a concurrent login for the same email falls
/// through to the known-email path.
pub async fn resolve_external_user(
    users: &dyn UserStore,
    identity: VerifiedIdentity,
) -> Result<User, AppError> {
    let user = match users.find_by_email(&identity.email).await? {
        Some(user) => user,
        None => {
            let created = users
                .create(NewUser {
                    name: identity.name.clone(),
                    email: identity.email.clone(),
                    password_hash: None,
                    external_id: Some(identity.subject.clone()),
                })
                .await;
            match created {
                Ok(user) => {
                    info!(user_id = %user.id, "user created from external identity");
                    return Ok(user);
                }
                Err(StoreError::DuplicateEmail) => {
                    debug!("concurrent first login, re-reading user by email");
                    users
                        .find_by_email(&identity.email)
                        .await?
                        .ok_or_else(|| anyhow::anyhow!("user vanished after duplicate create"))?
                }
                Err(e) => return Err(e.into()),
            }
        }
    };

    if user.external_id.is_some() {
        return Ok(user);
    }

    let linked = users
        .link_external_id(&user.id, &identity.subject)
        .await?
        .ok_or_else(|| anyhow::anyhow!("user {} vanished while linking", user.id))?;
    info!(user_id = %linked.id, "external identity linked to existing account");
    Ok(linked)
}

pub async fn register_local(
    users: &dyn UserStore,
    name: &str,
    email: &str,
    password: &str,
) -> Result<User, AppError> {
    let email = normalize_email(email);
    if !is_valid_email(&email) {
        return Err(AppError::Validation("email must be a valid email address".into()));
    }
    let password_hash = hash_password(password)?;
    let user = users
        .create(NewUser {
            name: name.to_string(),
            email,
            password_hash: Some(password_hash),
            external_id: None,
        })
        .await?;
    info!(user_id = %user.id, "user registered");
    Ok(user)
}

/// Unknown email, wrong password and password-less accounts all read the same.
pub async fn authenticate_local(
    users: &dyn UserStore,
    email: &str,
    password: &str,
) -> Result<User, AppError> {
    let invalid = || AppError::Unauthorized("Invalid credentials".into());

    let user = users
        .find_by_email(&normalize_email(email))
        .await?
        .ok_or_else(invalid)?;
    if !verify_password(password, user.password_hash.as_deref())? {
        return Err(invalid());
    }
    Ok(user)
}
