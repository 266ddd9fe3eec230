use axum::extract::State;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::guards::User;
use crate::models::UserRole;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - the user id.
    pub sub: String,
    /// Marketplace role carried by the identity service.
    pub role: String,
    /// Expiration time (unix timestamp).
    pub exp: i64,
}

/// Validate a bearer token and extract the caller identity (HS256; the
/// shared secret comes from config, token issuance belongs to the identity
/// service).
pub fn verify_token(token: &str, secret: &str) -> Result<User, AppError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Unauthorized)?;

    let id = Uuid::parse_str(&data.claims.sub).map_err(|_| AppError::Unauthorized)?;
    let role = UserRole::parse(&data.claims.role).ok_or(AppError::Unauthorized)?;
    Ok(User { id, role })
}

/// Sign a token for `user_id`. Production tokens come from the identity
/// service; this is for tests and local tooling.
pub fn sign_token(
    user_id: Uuid,
    role: UserRole,
    secret: &str,
    ttl_seconds: i64,
) -> Result<String, AppError> {
    let claims = Claims {
        sub: user_id.to_string(),
        role: role.as_str().to_string(),
        exp: chrono::Utc::now().timestamp() + ttl_seconds,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|_| AppError::Internal)
}

/// Middleware: extract the bearer token, verify it, and stash the caller
/// identity in request extensions for the `User` extractor.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: axum::extract::Request,
    next: axum::middleware::Next,
) -> Result<axum::response::Response, AppError> {
    let auth_header = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(AppError::Unauthorized)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(AppError::Unauthorized)?;

    let user = verify_token(token, &state.config.jwt_secret)?;
    req.extensions_mut().insert(user);

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_round_trip() {
        let user_id = Uuid::new_v4();
        let token = sign_token(user_id, UserRole::Farmer, "secret", 3600).unwrap();
        let user = verify_token(&token, "secret").unwrap();
        assert_eq!(user.id, user_id);
        assert_eq!(user.role, UserRole::Farmer);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = sign_token(Uuid::new_v4(), UserRole::Buyer, "secret", 3600).unwrap();
        assert!(matches!(
            verify_token(&token, "other-secret"),
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn test_expired_token_rejected() {
        let token = sign_token(Uuid::new_v4(), UserRole::Buyer, "secret", -120).unwrap();
        assert!(matches!(
            verify_token(&token, "secret"),
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn test_garbage_token_rejected() {
        assert!(verify_token("not-a-token", "secret").is_err());
    }
}
