use anyhow::Result;
use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration as StdDuration;
use tracing::info;

use crate::entities::users::AuthProvider;
use crate::entities::{auth_tokens, categories, item_images, items, order_items, orders, otp_requests, users};

pub mod migrator;
pub mod repositories;

pub use repositories::catalog::ItemInput;
pub use repositories::order::{ContactInfo, CreateOutcome, NewOrderLine};

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(StdDuration::from_secs(10))
            .acquire_timeout(StdDuration::from_secs(10))
            .idle_timeout(StdDuration::from_secs(300))
            .max_lifetime(StdDuration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn catalog_repo(&self) -> repositories::catalog::CatalogRepository {
        repositories::catalog::CatalogRepository::new(self.conn.clone())
    }

    fn order_repo(&self) -> repositories::order::OrderRepository {
        repositories::order::OrderRepository::new(self.conn.clone())
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn otp_repo(&self) -> repositories::otp::OtpRepository {
        repositories::otp::OtpRepository::new(self.conn.clone())
    }

    fn token_repo(&self) -> repositories::token::TokenRepository {
        repositories::token::TokenRepository::new(self.conn.clone())
    }

    fn webhook_repo(&self) -> repositories::webhook::WebhookRepository {
        repositories::webhook::WebhookRepository::new(self.conn.clone())
    }

    // ========== Categories ==========

    pub async fn list_categories(&self) -> Result<Vec<categories::Model>> {
        self.catalog_repo().list_categories().await
    }

    pub async fn list_subcategories(&self, parent_id: i32) -> Result<Vec<categories::Model>> {
        self.catalog_repo().list_subcategories(parent_id).await
    }

    pub async fn get_category(&self, id: i32) -> Result<Option<categories::Model>> {
        self.catalog_repo().get_category(id).await
    }

    pub async fn category_name_or_slug_taken(&self, name: &str, slug: &str) -> Result<bool> {
        self.catalog_repo()
            .category_name_or_slug_taken(name, slug)
            .await
    }

    pub async fn create_category(
        &self,
        name: &str,
        slug: &str,
        parent_id: Option<i32>,
        image_url: Option<&str>,
    ) -> Result<categories::Model> {
        self.catalog_repo()
            .create_category(name, slug, parent_id, image_url)
            .await
    }

    pub async fn update_category(
        &self,
        id: i32,
        name: &str,
        slug: &str,
        parent_id: Option<i32>,
        image_url: Option<&str>,
    ) -> Result<Option<categories::Model>> {
        self.catalog_repo()
            .update_category(id, name, slug, parent_id, image_url)
            .await
    }

    pub async fn remove_category(&self, id: i32) -> Result<bool> {
        self.catalog_repo().remove_category(id).await
    }

    pub async fn category_parent_chain_contains(
        &self,
        category_id: i32,
        candidate_parent: i32,
    ) -> Result<bool> {
        self.catalog_repo()
            .parent_chain_contains(category_id, candidate_parent)
            .await
    }

    pub async fn category_has_items(&self, id: i32) -> Result<bool> {
        self.catalog_repo().category_has_items(id).await
    }

    // ========== Items ==========

    pub async fn list_items(
        &self,
        category_id: Option<i32>,
        only_available: bool,
    ) -> Result<Vec<items::Model>> {
        self.catalog_repo()
            .list_items(category_id, only_available)
            .await
    }

    pub async fn get_item(&self, id: i32) -> Result<Option<items::Model>> {
        self.catalog_repo().get_item(id).await
    }

    pub async fn get_items_by_ids(&self, ids: &[i32]) -> Result<Vec<items::Model>> {
        self.catalog_repo().get_items_by_ids(ids).await
    }

    pub async fn create_item(&self, input: ItemInput) -> Result<items::Model> {
        self.catalog_repo().create_item(input).await
    }

    pub async fn update_item(&self, id: i32, input: ItemInput) -> Result<Option<items::Model>> {
        self.catalog_repo().update_item(id, input).await
    }

    pub async fn remove_item(&self, id: i32) -> Result<bool> {
        self.catalog_repo().remove_item(id).await
    }

    pub async fn item_in_use(&self, id: i32) -> Result<bool> {
        self.catalog_repo().item_in_use(id).await
    }

    pub async fn add_item_image(
        &self,
        item_id: i32,
        image_url: &str,
        position: i32,
    ) -> Result<item_images::Model> {
        self.catalog_repo()
            .add_item_image(item_id, image_url, position)
            .await
    }

    pub async fn remove_item_image(&self, image_id: i32) -> Result<bool> {
        self.catalog_repo().remove_item_image(image_id).await
    }

    pub async fn images_for_item(&self, item_id: i32) -> Result<Vec<item_images::Model>> {
        self.catalog_repo().images_for_item(item_id).await
    }

    pub async fn images_for_items(
        &self,
        item_ids: &[i32],
    ) -> Result<HashMap<i32, Vec<item_images::Model>>> {
        self.catalog_repo().images_for_items(item_ids).await
    }

    // ========== Orders ==========

    pub async fn booking_conflict_exists(
        &self,
        item_id: i32,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<bool> {
        self.order_repo().has_conflict(item_id, start, end).await
    }

    pub async fn create_order_with_lines(
        &self,
        user_id: i32,
        start: NaiveDate,
        end: NaiveDate,
        total_price: Decimal,
        lines: &[NewOrderLine],
    ) -> Result<CreateOutcome> {
        self.order_repo()
            .create_with_lines(user_id, start, end, total_price, lines)
            .await
    }

    pub async fn get_order(&self, id: i32) -> Result<Option<orders::Model>> {
        self.order_repo().get(id).await
    }

    pub async fn find_order_by_payment_id(
        &self,
        payment_order_id: &str,
    ) -> Result<Option<orders::Model>> {
        self.order_repo()
            .find_by_payment_order_id(payment_order_id)
            .await
    }

    pub async fn list_orders_for_user(&self, user_id: i32) -> Result<Vec<orders::Model>> {
        self.order_repo().list_for_user(user_id).await
    }

    pub async fn list_all_orders(&self) -> Result<Vec<orders::Model>> {
        self.order_repo().list_all().await
    }

    pub async fn order_lines(&self, order_id: i32) -> Result<Vec<order_items::Model>> {
        self.order_repo().lines_for(order_id).await
    }

    pub async fn order_lines_batch(
        &self,
        order_ids: &[i32],
    ) -> Result<HashMap<i32, Vec<order_items::Model>>> {
        self.order_repo().lines_for_orders(order_ids).await
    }

    pub async fn update_order_total(&self, id: i32, total_price: Decimal) -> Result<()> {
        self.order_repo().update_total(id, total_price).await
    }

    pub async fn set_order_payment_initiated(
        &self,
        id: i32,
        payment_order_id: &str,
        contact: &ContactInfo,
        total_price: Decimal,
    ) -> Result<()> {
        self.order_repo()
            .set_payment_initiated(id, payment_order_id, contact, total_price)
            .await
    }

    pub async fn mark_order_active(&self, id: i32) -> Result<bool> {
        self.order_repo().mark_active(id).await
    }

    pub async fn mark_order_completed(&self, id: i32) -> Result<bool> {
        self.order_repo().mark_completed(id).await
    }

    pub async fn set_order_forward_shipment(
        &self,
        id: i32,
        shipping_order_id: &str,
        shipment_id: &str,
    ) -> Result<bool> {
        self.order_repo()
            .set_forward_shipment(id, shipping_order_id, shipment_id)
            .await
    }

    pub async fn set_order_return_shipment(
        &self,
        id: i32,
        return_order_id: &str,
        return_shipment_id: &str,
    ) -> Result<bool> {
        self.order_repo()
            .set_return_shipment(id, return_order_id, return_shipment_id)
            .await
    }

    // ========== Users ==========

    pub async fn get_user(&self, id: i32) -> Result<Option<users::Model>> {
        self.user_repo().get_by_id(id).await
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<users::Model>> {
        self.user_repo().get_by_email(email).await
    }

    pub async fn get_or_create_user(
        &self,
        email: &str,
        provider: AuthProvider,
    ) -> Result<(users::Model, bool)> {
        self.user_repo().get_or_create(email, provider).await
    }

    // ========== OTP ==========

    pub async fn create_otp(&self, email: &str, code: &str) -> Result<otp_requests::Model> {
        self.otp_repo().create(email, code).await
    }

    pub async fn latest_otp_matching(
        &self,
        email: &str,
        code: &str,
    ) -> Result<Option<otp_requests::Model>> {
        self.otp_repo().latest_matching(email, code).await
    }

    // ========== Tokens ==========

    pub async fn issue_token(
        &self,
        user_id: i32,
        kind: crate::entities::auth_tokens::TokenKind,
        ttl: Duration,
    ) -> Result<auth_tokens::Model> {
        self.token_repo().issue(user_id, kind, ttl).await
    }

    pub async fn find_valid_token(
        &self,
        token: &str,
        kind: crate::entities::auth_tokens::TokenKind,
    ) -> Result<Option<(auth_tokens::Model, users::Model)>> {
        self.token_repo().find_valid(token, kind).await
    }

    pub async fn prune_expired_tokens(&self) -> Result<u64> {
        self.token_repo().prune_expired().await
    }

    // ========== Webhook events ==========

    pub async fn record_webhook_event(&self, event_id: &str, event: &str) -> Result<bool> {
        self.webhook_repo().record_event(event_id, event).await
    }

    pub async fn forget_webhook_event(&self, event_id: &str) -> Result<()> {
        self.webhook_repo().forget_event(event_id).await
    }
}
