use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use std::sync::Arc;

use super::auth::CurrentUser;
use super::types::{
    AddItemImageRequest, CategoryDto, CreateCategoryRequest, CreateItemRequest, ItemDto,
    ItemImageDto, ListItemsQuery, MessageResponse, UpdateCategoryRequest, UpdateItemRequest,
};
use super::{ApiError, ApiResponse, AppState, validation};
use crate::db::ItemInput;
use crate::domain::{SizeCode, encode_size_list};

// ============================================================================
// Categories
// ============================================================================

pub async fn list_categories(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<CategoryDto>>>, ApiError> {
    let categories = state.store().list_categories().await?;

    Ok(Json(ApiResponse::success(
        categories.into_iter().map(CategoryDto::from_model).collect(),
    )))
}

pub async fn get_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<CategoryDto>>, ApiError> {
    let id = validation::validate_category_id(id)?;
    let category = state
        .store()
        .get_category(id)
        .await?
        .ok_or_else(|| ApiError::category_not_found(id))?;

    Ok(Json(ApiResponse::success(CategoryDto::from_model(category))))
}

pub async fn list_subcategories(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<Vec<CategoryDto>>>, ApiError> {
    let id = validation::validate_category_id(id)?;
    state
        .store()
        .get_category(id)
        .await?
        .ok_or_else(|| ApiError::category_not_found(id))?;

    let children = state.store().list_subcategories(id).await?;

    Ok(Json(ApiResponse::success(
        children.into_iter().map(CategoryDto::from_model).collect(),
    )))
}

pub async fn create_category(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Json(payload): Json<CreateCategoryRequest>,
) -> Result<Json<ApiResponse<CategoryDto>>, ApiError> {
    user.require_admin()?;

    let name = validation::validate_name(&payload.name, "Category")?.to_string();
    let slug = match &payload.slug {
        Some(slug) => validation::validate_slug(slug)?.to_string(),
        None => validation::slugify(&name),
    };

    if let Some(parent_id) = payload.parent_id {
        state
            .store()
            .get_category(parent_id)
            .await?
            .ok_or_else(|| ApiError::category_not_found(parent_id))?;
    }
    if state.store().category_name_or_slug_taken(&name, &slug).await? {
        return Err(ApiError::Conflict(format!(
            "Category '{name}' or slug '{slug}' already exists"
        )));
    }

    let category = state
        .store()
        .create_category(&name, &slug, payload.parent_id, payload.image_url.as_deref())
        .await?;

    Ok(Json(ApiResponse::success(CategoryDto::from_model(category))))
}

pub async fn update_category(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateCategoryRequest>,
) -> Result<Json<ApiResponse<CategoryDto>>, ApiError> {
    user.require_admin()?;

    let id = validation::validate_category_id(id)?;
    let name = validation::validate_name(&payload.name, "Category")?.to_string();
    let slug = match &payload.slug {
        Some(slug) => validation::validate_slug(slug)?.to_string(),
        None => validation::slugify(&name),
    };

    if let Some(parent_id) = payload.parent_id {
        if parent_id == id {
            return Err(ApiError::validation("Category cannot be its own parent"));
        }
        state
            .store()
            .get_category(parent_id)
            .await?
            .ok_or_else(|| ApiError::category_not_found(parent_id))?;
        // A parent that descends from this category would close a cycle.
        if state
            .store()
            .category_parent_chain_contains(parent_id, id)
            .await?
        {
            return Err(ApiError::validation(
                "Category cannot be moved under one of its own descendants",
            ));
        }
    }

    let category = state
        .store()
        .update_category(id, &name, &slug, payload.parent_id, payload.image_url.as_deref())
        .await?
        .ok_or_else(|| ApiError::category_not_found(id))?;

    Ok(Json(ApiResponse::success(CategoryDto::from_model(category))))
}

pub async fn delete_category(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    user.require_admin()?;

    let id = validation::validate_category_id(id)?;
    if state.store().category_has_items(id).await? {
        return Err(ApiError::Conflict(
            "Category still has items; move or delete them first".to_string(),
        ));
    }

    let removed = state.store().remove_category(id).await?;
    if !removed {
        return Err(ApiError::category_not_found(id));
    }

    Ok(Json(ApiResponse::success(MessageResponse {
        message: format!("Category {id} deleted"),
    })))
}

// ============================================================================
// Items
// ============================================================================

pub async fn list_items(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListItemsQuery>,
) -> Result<Json<ApiResponse<Vec<ItemDto>>>, ApiError> {
    if let Some(category_id) = query.category {
        state
            .store()
            .get_category(category_id)
            .await?
            .ok_or_else(|| ApiError::category_not_found(category_id))?;
    }

    let items = state.store().list_items(query.category, query.available).await?;

    let ids: Vec<i32> = items.iter().map(|i| i.id).collect();
    let mut images = state.store().images_for_items(&ids).await?;

    Ok(Json(ApiResponse::success(
        items
            .into_iter()
            .map(|item| {
                let item_images = images.remove(&item.id).unwrap_or_default();
                ItemDto::from_model(item, item_images)
            })
            .collect(),
    )))
}

pub async fn get_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<ItemDto>>, ApiError> {
    let id = validation::validate_item_id(id)?;
    let item = state
        .store()
        .get_item(id)
        .await?
        .ok_or_else(|| ApiError::item_not_found(id))?;
    let images = state.store().images_for_item(id).await?;

    Ok(Json(ApiResponse::success(ItemDto::from_model(item, images))))
}

fn item_input_from(
    category_id: i32,
    name: String,
    description: Option<String>,
    sizes: &[SizeCode],
    daily_rate: rust_decimal::Decimal,
    security_deposit: rust_decimal::Decimal,
    available: bool,
) -> Result<ItemInput, ApiError> {
    if sizes.is_empty() {
        return Err(ApiError::validation("Item must offer at least one size"));
    }
    let mut deduped: Vec<SizeCode> = Vec::with_capacity(sizes.len());
    for size in sizes {
        if !deduped.contains(size) {
            deduped.push(*size);
        }
    }

    Ok(ItemInput {
        category_id,
        name,
        description,
        sizes: encode_size_list(&deduped),
        daily_rate: validation::validate_money(daily_rate, "Daily rate")?,
        security_deposit: validation::validate_money(security_deposit, "Security deposit")?,
        available,
    })
}

pub async fn create_item(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Json(payload): Json<CreateItemRequest>,
) -> Result<Json<ApiResponse<ItemDto>>, ApiError> {
    user.require_admin()?;

    let name = validation::validate_name(&payload.name, "Item")?.to_string();
    state
        .store()
        .get_category(payload.category_id)
        .await?
        .ok_or_else(|| ApiError::category_not_found(payload.category_id))?;

    let input = item_input_from(
        payload.category_id,
        name,
        payload.description,
        &payload.sizes,
        payload.daily_rate,
        payload.security_deposit,
        payload.available,
    )?;
    let item = state.store().create_item(input).await?;

    Ok(Json(ApiResponse::success(ItemDto::from_model(item, vec![]))))
}

pub async fn update_item(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateItemRequest>,
) -> Result<Json<ApiResponse<ItemDto>>, ApiError> {
    user.require_admin()?;

    let id = validation::validate_item_id(id)?;
    let name = validation::validate_name(&payload.name, "Item")?.to_string();
    state
        .store()
        .get_category(payload.category_id)
        .await?
        .ok_or_else(|| ApiError::category_not_found(payload.category_id))?;

    let input = item_input_from(
        payload.category_id,
        name,
        payload.description,
        &payload.sizes,
        payload.daily_rate,
        payload.security_deposit,
        payload.available,
    )?;
    let item = state
        .store()
        .update_item(id, input)
        .await?
        .ok_or_else(|| ApiError::item_not_found(id))?;
    let images = state.store().images_for_item(id).await?;

    Ok(Json(ApiResponse::success(ItemDto::from_model(item, images))))
}

pub async fn delete_item(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    user.require_admin()?;

    let id = validation::validate_item_id(id)?;
    if state.store().item_in_use(id).await? {
        return Err(ApiError::Conflict(
            "Item is referenced by existing orders and cannot be deleted".to_string(),
        ));
    }

    let removed = state.store().remove_item(id).await?;
    if !removed {
        return Err(ApiError::item_not_found(id));
    }

    Ok(Json(ApiResponse::success(MessageResponse {
        message: format!("Item {id} deleted"),
    })))
}

// ============================================================================
// Item images
// ============================================================================

pub async fn add_item_image(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i32>,
    Json(payload): Json<AddItemImageRequest>,
) -> Result<Json<ApiResponse<ItemImageDto>>, ApiError> {
    user.require_admin()?;

    let id = validation::validate_item_id(id)?;
    if payload.image_url.trim().is_empty() {
        return Err(ApiError::validation("Image URL is required"));
    }
    state
        .store()
        .get_item(id)
        .await?
        .ok_or_else(|| ApiError::item_not_found(id))?;

    let position = match payload.position {
        Some(position) if position >= 0 => position,
        Some(_) => return Err(ApiError::validation("Image position cannot be negative")),
        None => i32::try_from(state.store().images_for_item(id).await?.len())
            .map_err(|_| ApiError::validation("Too many images"))?,
    };

    let image = state
        .store()
        .add_item_image(id, payload.image_url.trim(), position)
        .await?;

    Ok(Json(ApiResponse::success(ItemImageDto::from_model(image))))
}

pub async fn delete_item_image(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path((id, image_id)): Path<(i32, i32)>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    user.require_admin()?;

    let id = validation::validate_item_id(id)?;
    let images = state.store().images_for_item(id).await?;
    if !images.iter().any(|img| img.id == image_id) {
        return Err(ApiError::not_found("Image", image_id));
    }

    state.store().remove_item_image(image_id).await?;

    Ok(Json(ApiResponse::success(MessageResponse {
        message: format!("Image {image_id} deleted"),
    })))
}
