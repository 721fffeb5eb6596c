use anyhow::{Context, Result};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};

use crate::entities::otp_requests;

pub struct OtpRepository {
    conn: DatabaseConnection,
}

impl OtpRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn create(&self, email: &str, code: &str) -> Result<otp_requests::Model> {
        let model = otp_requests::ActiveModel {
            email: Set(email.to_lowercase()),
            code: Set(code.to_string()),
            created_at: Set(chrono::Utc::now()),
            ..Default::default()
        };

        let created = model
            .insert(&self.conn)
            .await
            .context("Failed to store OTP request")?;
        Ok(created)
    }

    /// Newest row matching the email/code pair. Rows are not deleted on a
    /// successful verification, so the expiry check decides validity.
    pub async fn latest_matching(
        &self,
        email: &str,
        code: &str,
    ) -> Result<Option<otp_requests::Model>> {
        let row = otp_requests::Entity::find()
            .filter(otp_requests::Column::Email.eq(email.to_lowercase()))
            .filter(otp_requests::Column::Code.eq(code))
            .order_by_desc(otp_requests::Column::CreatedAt)
            .one(&self.conn)
            .await
            .context("Failed to look up OTP request")?;
        Ok(row)
    }
}
