use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use lazy_static::lazy_static;
use rand::Rng;
use regex::Regex;
use tracing::{info, warn};

use crate::db::{find_user_by_email, insert_user, DbPool};
use crate::error::{AppError, ValidationErrors};
use crate::models::{SignupRequest, User};

lazy_static! {
    static ref EMAIL_RE: Regex =
        Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)*$")
            .expect("email regex compiles");

    // Verified against when the email is unknown so both login failures cost the same.
    static ref DUMMY_HASH: String = hash_password("not-a-real-password").unwrap_or_default();
}

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let mut salt_bytes = [0u8; 16];
    rand::rng().fill(&mut salt_bytes);
    let salt =
        SaltString::encode_b64(&salt_bytes).map_err(|e| AppError::Internal(e.to_string()))?;
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(e.to_string()))?
        .to_string();
    Ok(hash)
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Validates a signup request and stores the new user. Every failing field is
/// reported, not only the first.
pub fn register(pool: &DbPool, req: &SignupRequest) -> Result<User, AppError> {
    let name = req.name.trim();
    let email = normalize_email(&req.email);
    let mut errors = ValidationErrors::new();

    if name.is_empty() {
        errors.add("name", "can't be blank");
    }

    if email.is_empty() {
        errors.add("email", "can't be blank");
    } else if !is_valid_email(&email) {
        errors.add("email", "is invalid");
    } else if find_user_by_email(pool, &email)?.is_some() {
        errors.add("email", "has already been taken");
    }

    if req.password.is_empty() {
        errors.add("password", "can't be blank");
    }
    if req.password != req.password_confirmation {
        errors.add("password_confirmation", "doesn't match Password");
    }

    if !errors.is_empty() {
        warn!(email = %email, "signup rejected");
    }
    errors.into_result()?;

    let password_hash = hash_password(&req.password)?;
    let user = insert_user(pool, name, &email, &password_hash)?;
    info!(user_id = user.id, "user signed up");
    Ok(user)
}

/// Resolves a user from login credentials. Unknown email and wrong password
/// produce the same error.
pub fn authenticate(pool: &DbPool, email: &str, password: &str) -> Result<User, AppError> {
    let email = normalize_email(email);

    match find_user_by_email(pool, &email)? {
        Some(user) if verify_password(password, &user.password_hash) => Ok(user),
        Some(_) => {
            warn!("login with wrong password");
            Err(AppError::Unauthorized("Invalid credentials"))
        }
        None => {
            verify_password(password, &DUMMY_HASH);
            warn!("login with unknown email");
            Err(AppError::Unauthorized("Invalid credentials"))
        }
    }
}
