use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{UserProfile, UserRole};

/// Read-only seam over the identity-owned users table: recipient existence
/// checks and display enrichment for pushed messages.
pub struct UserService;

impl UserService {
    pub async fn find_profile(db: &Pool<Postgres>, id: Uuid) -> AppResult<Option<UserProfile>> {
        let row = sqlx::query("SELECT id, name, phone, role FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(db)
            .await?;

        row.map(|r| {
            let role: String = r.get("role");
            let role = UserRole::parse(&role).ok_or(AppError::Internal)?;
            Ok(UserProfile {
                id: r.get("id"),
                name: r.get("name"),
                phone: r.get("phone"),
                role,
            })
        })
        .transpose()
    }

    pub async fn get_profile(db: &Pool<Postgres>, id: Uuid) -> AppResult<UserProfile> {
        Self::find_profile(db, id)
            .await?
            .ok_or(AppError::NotFound("user"))
    }
}
