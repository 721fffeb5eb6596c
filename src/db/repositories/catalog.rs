use anyhow::{Context, Result};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use std::collections::{HashMap, HashSet};
use tracing::info;

use crate::entities::{categories, item_images, items, order_items, prelude::*};

/// Repository for categories, items and their image galleries.
pub struct CatalogRepository {
    conn: DatabaseConnection,
}

/// Field set for creating or replacing a catalog item.
#[derive(Debug, Clone)]
pub struct ItemInput {
    pub category_id: i32,
    pub name: String,
    pub description: Option<String>,
    /// JSON-encoded size array, already validated by the caller.
    pub sizes: String,
    pub daily_rate: Decimal,
    pub security_deposit: Decimal,
    pub available: bool,
}

impl CatalogRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    // ========================================================================
    // Categories
    // ========================================================================

    pub async fn list_categories(&self) -> Result<Vec<categories::Model>> {
        let rows = Categories::find()
            .order_by_asc(categories::Column::Name)
            .all(&self.conn)
            .await
            .context("Failed to list categories")?;
        Ok(rows)
    }

    pub async fn list_subcategories(&self, parent_id: i32) -> Result<Vec<categories::Model>> {
        let rows = Categories::find()
            .filter(categories::Column::ParentId.eq(parent_id))
            .order_by_asc(categories::Column::Name)
            .all(&self.conn)
            .await
            .context("Failed to list subcategories")?;
        Ok(rows)
    }

    pub async fn get_category(&self, id: i32) -> Result<Option<categories::Model>> {
        let row = Categories::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query category")?;
        Ok(row)
    }

    pub async fn category_name_or_slug_taken(&self, name: &str, slug: &str) -> Result<bool> {
        let count = Categories::find()
            .filter(
                categories::Column::Name
                    .eq(name)
                    .or(categories::Column::Slug.eq(slug)),
            )
            .count(&self.conn)
            .await?;
        Ok(count > 0)
    }

    pub async fn create_category(
        &self,
        name: &str,
        slug: &str,
        parent_id: Option<i32>,
        image_url: Option<&str>,
    ) -> Result<categories::Model> {
        let model = categories::ActiveModel {
            name: Set(name.to_string()),
            slug: Set(slug.to_string()),
            parent_id: Set(parent_id),
            image_url: Set(image_url.map(String::from)),
            created_at: Set(chrono::Utc::now()),
            ..Default::default()
        };

        let created = model
            .insert(&self.conn)
            .await
            .context("Failed to create category")?;
        info!("Created category {} ({})", created.id, created.name);
        Ok(created)
    }

    pub async fn update_category(
        &self,
        id: i32,
        name: &str,
        slug: &str,
        parent_id: Option<i32>,
        image_url: Option<&str>,
    ) -> Result<Option<categories::Model>> {
        let Some(existing) = self.get_category(id).await? else {
            return Ok(None);
        };

        let mut active: categories::ActiveModel = existing.into();
        active.name = Set(name.to_string());
        active.slug = Set(slug.to_string());
        active.parent_id = Set(parent_id);
        active.image_url = Set(image_url.map(String::from));

        let updated = active
            .update(&self.conn)
            .await
            .context("Failed to update category")?;
        Ok(Some(updated))
    }

    pub async fn remove_category(&self, id: i32) -> Result<bool> {
        let result = Categories::delete_by_id(id)
            .exec(&self.conn)
            .await
            .context("Failed to delete category")?;
        Ok(result.rows_affected > 0)
    }

    /// Walks the parent chain upward from `candidate_parent` and reports
    /// whether it passes through `category_id`. Attaching a category below
    /// one of its own descendants (or itself) would orphan the subtree from
    /// every root, so such updates are rejected before they persist.
    pub async fn parent_chain_contains(
        &self,
        category_id: i32,
        candidate_parent: i32,
    ) -> Result<bool> {
        let mut visited = HashSet::new();
        let mut cursor = Some(candidate_parent);

        while let Some(current) = cursor {
            if current == category_id {
                return Ok(true);
            }
            // A repeated node means the stored chain is already looped;
            // treat it as a cycle rather than spinning.
            if !visited.insert(current) {
                return Ok(true);
            }
            cursor = Categories::find_by_id(current)
                .one(&self.conn)
                .await
                .context("Failed to walk category parent chain")?
                .and_then(|c| c.parent_id);
        }

        Ok(false)
    }

    // ========================================================================
    // Items
    // ========================================================================

    pub async fn list_items(
        &self,
        category_id: Option<i32>,
        only_available: bool,
    ) -> Result<Vec<items::Model>> {
        let mut query = Items::find().order_by_asc(items::Column::Name);

        if let Some(category_id) = category_id {
            query = query.filter(items::Column::CategoryId.eq(category_id));
        }
        if only_available {
            query = query.filter(items::Column::Available.eq(true));
        }

        let rows = query.all(&self.conn).await.context("Failed to list items")?;
        Ok(rows)
    }

    pub async fn get_item(&self, id: i32) -> Result<Option<items::Model>> {
        let row = Items::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query item")?;
        Ok(row)
    }

    pub async fn get_items_by_ids(&self, ids: &[i32]) -> Result<Vec<items::Model>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = Items::find()
            .filter(items::Column::Id.is_in(ids.iter().copied()))
            .all(&self.conn)
            .await
            .context("Failed to query items by ids")?;
        Ok(rows)
    }

    pub async fn create_item(&self, input: ItemInput) -> Result<items::Model> {
        let model = items::ActiveModel {
            category_id: Set(input.category_id),
            name: Set(input.name),
            description: Set(input.description),
            sizes: Set(input.sizes),
            daily_rate: Set(input.daily_rate),
            security_deposit: Set(input.security_deposit),
            available: Set(input.available),
            created_at: Set(chrono::Utc::now()),
            ..Default::default()
        };

        let created = model
            .insert(&self.conn)
            .await
            .context("Failed to create item")?;
        info!("Created item {} ({})", created.id, created.name);
        Ok(created)
    }

    pub async fn update_item(&self, id: i32, input: ItemInput) -> Result<Option<items::Model>> {
        let Some(existing) = self.get_item(id).await? else {
            return Ok(None);
        };

        let mut active: items::ActiveModel = existing.into();
        active.category_id = Set(input.category_id);
        active.name = Set(input.name);
        active.description = Set(input.description);
        active.sizes = Set(input.sizes);
        active.daily_rate = Set(input.daily_rate);
        active.security_deposit = Set(input.security_deposit);
        active.available = Set(input.available);

        let updated = active
            .update(&self.conn)
            .await
            .context("Failed to update item")?;
        Ok(Some(updated))
    }

    pub async fn remove_item(&self, id: i32) -> Result<bool> {
        let result = Items::delete_by_id(id)
            .exec(&self.conn)
            .await
            .context("Failed to delete item")?;
        Ok(result.rows_affected > 0)
    }

    /// True while any order line still references the item. Deleting such
    /// an item would tear receipts out of order history.
    pub async fn item_in_use(&self, id: i32) -> Result<bool> {
        let count = OrderItems::find()
            .filter(order_items::Column::ItemId.eq(id))
            .count(&self.conn)
            .await?;
        Ok(count > 0)
    }

    pub async fn category_has_items(&self, id: i32) -> Result<bool> {
        let count = Items::find()
            .filter(items::Column::CategoryId.eq(id))
            .count(&self.conn)
            .await?;
        Ok(count > 0)
    }

    // ========================================================================
    // Item images
    // ========================================================================

    pub async fn add_item_image(
        &self,
        item_id: i32,
        image_url: &str,
        position: i32,
    ) -> Result<item_images::Model> {
        let model = item_images::ActiveModel {
            item_id: Set(item_id),
            image_url: Set(image_url.to_string()),
            position: Set(position),
            ..Default::default()
        };

        let created = model
            .insert(&self.conn)
            .await
            .context("Failed to add item image")?;
        Ok(created)
    }

    pub async fn remove_item_image(&self, image_id: i32) -> Result<bool> {
        let result = ItemImages::delete_by_id(image_id)
            .exec(&self.conn)
            .await
            .context("Failed to delete item image")?;
        Ok(result.rows_affected > 0)
    }

    pub async fn images_for_item(&self, item_id: i32) -> Result<Vec<item_images::Model>> {
        let rows = ItemImages::find()
            .filter(item_images::Column::ItemId.eq(item_id))
            .order_by_asc(item_images::Column::Position)
            .all(&self.conn)
            .await
            .context("Failed to list item images")?;
        Ok(rows)
    }

    pub async fn images_for_items(
        &self,
        item_ids: &[i32],
    ) -> Result<HashMap<i32, Vec<item_images::Model>>> {
        if item_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = ItemImages::find()
            .filter(item_images::Column::ItemId.is_in(item_ids.iter().copied()))
            .order_by_asc(item_images::Column::Position)
            .all(&self.conn)
            .await
            .context("Failed to batch-list item images")?;

        let mut map: HashMap<i32, Vec<item_images::Model>> = HashMap::new();
        for row in rows {
            map.entry(row.item_id).or_default().push(row);
        }
        Ok(map)
    }
}
