use anyhow::{Context, Result};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use tracing::info;

use crate::entities::users::{self, AuthProvider};

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Option<users::Model>> {
        let user = users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user by id")?;
        Ok(user)
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<users::Model>> {
        let user = users::Entity::find()
            .filter(users::Column::Email.eq(email.to_lowercase()))
            .one(&self.conn)
            .await
            .context("Failed to query user by email")?;
        Ok(user)
    }

    /// Fetches the account for `email` or creates it with the given
    /// provider. An existing account keeps its original provider; both
    /// login paths resolve to the same row by email.
    pub async fn get_or_create(
        &self,
        email: &str,
        provider: AuthProvider,
    ) -> Result<(users::Model, bool)> {
        let normalized = email.to_lowercase();

        if let Some(existing) = self.get_by_email(&normalized).await? {
            return Ok((existing, false));
        }

        let created = users::ActiveModel {
            email: Set(normalized),
            auth_provider: Set(provider),
            is_admin: Set(false),
            created_at: Set(chrono::Utc::now()),
            ..Default::default()
        }
        .insert(&self.conn)
        .await
        .context("Failed to create user")?;

        info!("Created user {} ({})", created.id, created.email);
        Ok((created, true))
    }
}
