use anyhow::{Context, Result};
use chrono::Duration;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

use crate::entities::auth_tokens::{self, TokenKind};
use crate::entities::users;

pub struct TokenRepository {
    conn: DatabaseConnection,
}

impl TokenRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn issue(
        &self,
        user_id: i32,
        kind: TokenKind,
        ttl: Duration,
    ) -> Result<auth_tokens::Model> {
        let now = chrono::Utc::now();
        let model = auth_tokens::ActiveModel {
            user_id: Set(user_id),
            token: Set(generate_token()),
            kind: Set(kind),
            expires_at: Set(now + ttl),
            created_at: Set(now),
            ..Default::default()
        };

        let created = model
            .insert(&self.conn)
            .await
            .context("Failed to issue token")?;
        Ok(created)
    }

    /// Looks up an unexpired token of the given kind together with its
    /// owner. Expired or unknown tokens come back as `None`; the caller
    /// decides how loudly to reject.
    pub async fn find_valid(
        &self,
        token: &str,
        kind: TokenKind,
    ) -> Result<Option<(auth_tokens::Model, users::Model)>> {
        let now = chrono::Utc::now();
        let found = auth_tokens::Entity::find()
            .filter(auth_tokens::Column::Token.eq(token))
            .filter(auth_tokens::Column::Kind.eq(kind))
            .filter(auth_tokens::Column::ExpiresAt.gt(now))
            .find_also_related(users::Entity)
            .one(&self.conn)
            .await
            .context("Failed to look up token")?;

        Ok(found.and_then(|(token, user)| user.map(|u| (token, u))))
    }

    /// Drops expired rows; called opportunistically on issuance so the
    /// table does not grow without bound.
    pub async fn prune_expired(&self) -> Result<u64> {
        let result = auth_tokens::Entity::delete_many()
            .filter(auth_tokens::Column::ExpiresAt.lte(chrono::Utc::now()))
            .exec(&self.conn)
            .await
            .context("Failed to prune expired tokens")?;
        Ok(result.rows_affected)
    }
}

/// Random 64-character hex token.
#[must_use]
pub fn generate_token() -> String {
    use rand::Rng;

    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();

    bytes.iter().fold(String::with_capacity(64), |mut acc, b| {
        use std::fmt::Write;
        let _ = write!(acc, "{b:02x}");
        acc
    })
}
