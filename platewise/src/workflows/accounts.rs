//! Password hashing and credential checks.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use serde::Deserialize;

use crate::{
    client::Client,
    errors::{RepoError, ValidationError},
    models::{User, UserProfile},
};

const MIN_PASSWORD_LENGTH: usize = 8;
const MAX_PASSWORD_LENGTH: usize = 128;
const BAD_CREDENTIALS: &str = "invalid username/email or password";

pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    let length = password.chars().count();
    if (MIN_PASSWORD_LENGTH..=MAX_PASSWORD_LENGTH).contains(&length) {
        Ok(())
    } else {
        Err(ValidationError::single(
            "password",
            "validation.length",
            format!("length must be between {MIN_PASSWORD_LENGTH} and {MAX_PASSWORD_LENGTH} characters"),
        ))
    }
}

/// Hashes into a PHC string with a fresh salt.
pub fn hash_password(password: &str) -> Result<String, RepoError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| RepoError::other(format!("failed to hash password: {err}")))
}

/// False for a mismatch and for a hash that does not parse.
pub fn verify_password(password: &str, password_hash: &str) -> bool {
    PasswordHash::new(password_hash)
        .map(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
        .unwrap_or(false)
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    /// Username or email.
    pub identifier: String,
    pub password: String,
}

/// Resolves `identifier` through the username then the email reservation.
pub async fn login(client: &Client, request: &LoginRequest) -> Result<UserProfile, RepoError> {
    let identifier = request.identifier.trim();
    let users = client.collection::<User>();

    let mut user = users.find_by_unique(&["username"], &[identifier]).await?;
    if user.is_none() {
        user = users.find_by_unique(&["email"], &[identifier]).await?;
    }

    let unauthorized = || RepoError::Unauthorized {
        message: BAD_CREDENTIALS.into(),
    };
    let user = user.ok_or_else(unauthorized)?;
    if !verify_password(&request.password, &user.password_hash) {
        log::info!("rejected login for user {}", user.id);
        return Err(unauthorized());
    }
    if !user.active {
        return Err(RepoError::Unauthorized {
            message: "account is disabled".into(),
        });
    }
    Ok(UserProfile::from(user))
}
