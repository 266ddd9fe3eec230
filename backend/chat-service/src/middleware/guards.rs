//! Typed extraction of the authenticated caller, so handlers cannot forget
//! the auth check.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::error::AppError;
use crate::models::UserRole;
use uuid::Uuid;

/// The authenticated caller, placed in request extensions by the auth
/// middleware.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub role: UserRole,
}

#[async_trait]
impl<S> FromRequestParts<S> for User
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<User>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}
