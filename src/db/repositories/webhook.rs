use anyhow::{Context, Result};
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set};

use crate::entities::webhook_events;

pub struct WebhookRepository {
    conn: DatabaseConnection,
}

impl WebhookRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Records a gateway delivery id. Returns false when the id was seen
    /// before, letting the webhook handler drop redeliveries without
    /// touching order state.
    pub async fn record_event(&self, event_id: &str, event: &str) -> Result<bool> {
        let model = webhook_events::ActiveModel {
            event_id: Set(event_id.to_string()),
            event: Set(event.to_string()),
            received_at: Set(chrono::Utc::now()),
            ..Default::default()
        };

        let result = webhook_events::Entity::insert(model)
            .on_conflict(
                OnConflict::column(webhook_events::Column::EventId)
                    .do_nothing()
                    .to_owned(),
            )
            .exec(&self.conn)
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(DbErr::RecordNotInserted) => Ok(false),
            Err(e) => Err(e).context("Failed to record webhook event"),
        }
    }

    /// Releases a delivery id after a failed processing attempt. The
    /// gateway retries under the same id, and the retry must not be
    /// mistaken for a replay.
    pub async fn forget_event(&self, event_id: &str) -> Result<()> {
        webhook_events::Entity::delete_many()
            .filter(webhook_events::Column::EventId.eq(event_id))
            .exec(&self.conn)
            .await
            .context("Failed to release webhook event")?;
        Ok(())
    }
}
