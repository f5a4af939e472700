//! Authentication and authorization
//!
//! Bearer tokens carry the user id in `sub` and application role names in
//! `roles`. The request's [`Actor`] takes the most privileged known role.

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use core_kernel::UserId;
use domain_claims::{Actor, AppRole};

use crate::error::ApiError;

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// User's roles
    pub roles: Vec<String>,
    /// Expiration timestamp
    pub exp: i64,
    /// Issued at timestamp
    pub iat: i64,
}

/// Auth errors
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token expired")]
    TokenExpired,
    #[error("Invalid subject: {0}")]
    InvalidSubject(String),
    #[error("Missing permission: {0}")]
    MissingPermission(String),
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingPermission(_) => ApiError::Forbidden(err.to_string()),
            _ => ApiError::Unauthorized,
        }
    }
}

/// Creates a new JWT token
///
/// # Arguments
///
/// * `user_id` - User identifier
/// * `roles` - User's roles
/// * `secret` - JWT secret key
/// * `expiration_secs` - Token validity in seconds
pub fn create_token(
    user_id: &str,
    roles: Vec<String>,
    secret: &str,
    expiration_secs: u64,
) -> Result<String, AuthError> {
    let now = Utc::now();
    let exp = now + Duration::seconds(expiration_secs as i64);

    let claims = Claims {
        sub: user_id.to_string(),
        roles,
        exp: exp.timestamp(),
        iat: now.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|_| AuthError::InvalidToken)
}

/// Validates a JWT token
///
/// # Arguments
///
/// * `token` - The JWT token to validate
/// * `secret` - JWT secret key
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, AuthError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        _ => AuthError::InvalidToken,
    })?;

    Ok(token_data.claims)
}

/// Builds the acting user from validated token claims
///
/// Unknown role names are ignored. A token without a known role acts as
/// a plain `User`.
pub fn actor_from_claims(claims: &Claims) -> Result<Actor, AuthError> {
    let id: UserId = claims
        .sub
        .parse()
        .map_err(|_| AuthError::InvalidSubject(claims.sub.clone()))?;

    let role = claims
        .roles
        .iter()
        .filter_map(|r| r.parse::<AppRole>().ok())
        .max_by_key(role_rank)
        .unwrap_or(AppRole::User);

    Ok(Actor::new(id, role))
}

fn role_rank(role: &AppRole) -> u8 {
    match role {
        AppRole::User => 0,
        AppRole::Steward => 1,
        AppRole::Signator => 2,
        AppRole::Admin => 3,
    }
}

/// Checks if the actor holds one of the allowed roles; admins always pass
pub fn has_role(actor: &Actor, allowed: &[AppRole]) -> bool {
    actor.role == AppRole::Admin || allowed.contains(&actor.role)
}

/// Rejects the request unless the actor holds one of the allowed roles
pub fn require_role(actor: &Actor, allowed: &[AppRole]) -> Result<(), AuthError> {
    if has_role(actor, allowed) {
        Ok(())
    } else {
        Err(AuthError::MissingPermission(format!(
            "role {} may not perform this operation",
            actor.role
        )))
    }
}

/// Role sets per protected operation
pub mod permissions {
    use domain_claims::AppRole;

    /// Request revision, request receipt, approve and deny
    pub const CLAIM_REVIEW: &[AppRole] = &[AppRole::Steward, AppRole::Signator];
    pub const CLAIM_PAY: &[AppRole] = &[AppRole::Signator];
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn test_token_round_trip() {
        let user_id = UserId::new();
        let token = create_token(&user_id.to_string(), vec!["Steward".to_string()], SECRET, 60).unwrap();

        let claims = validate_token(&token, SECRET).unwrap();
        let actor = actor_from_claims(&claims).unwrap();
        assert_eq!(actor.id, user_id);
        assert_eq!(actor.role, AppRole::Steward);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = create_token(&UserId::new().to_string(), vec![], SECRET, 60).unwrap();
        assert!(matches!(validate_token(&token, "other"), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_highest_known_role_wins() {
        let claims = Claims {
            sub: UserId::new().to_string(),
            roles: vec!["Janitor".to_string(), "Steward".to_string(), "Signator".to_string()],
            exp: 0,
            iat: 0,
        };
        assert_eq!(actor_from_claims(&claims).unwrap().role, AppRole::Signator);
    }

    #[test]
    fn test_no_known_role_is_user() {
        let claims = Claims {
            sub: UserId::new().to_string(),
            roles: vec!["guest".to_string()],
            exp: 0,
            iat: 0,
        };
        assert_eq!(actor_from_claims(&claims).unwrap().role, AppRole::User);
    }

    #[test]
    fn test_invalid_subject() {
        let claims = Claims {
            sub: "not-a-uuid".to_string(),
            roles: vec![],
            exp: 0,
            iat: 0,
        };
        assert!(matches!(actor_from_claims(&claims), Err(AuthError::InvalidSubject(_))));
    }

    #[test]
    fn test_require_role() {
        let steward = Actor::new(UserId::new(), AppRole::Steward);
        let member = Actor::new(UserId::new(), AppRole::User);
        let admin = Actor::new(UserId::new(), AppRole::Admin);

        assert!(require_role(&steward, permissions::CLAIM_REVIEW).is_ok());
        assert!(require_role(&member, permissions::CLAIM_REVIEW).is_err());
        assert!(require_role(&steward, permissions::CLAIM_PAY).is_err());
        assert!(require_role(&admin, permissions::CLAIM_PAY).is_ok());
    }
}
