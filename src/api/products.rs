// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    http::{StatusCode, Uri},
    Json,
};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::{
    api::validated::ValidatedJson,
    auth::{normalize_subject, Auth},
    error::ApiError,
    models::{ProductRequest, ProductResponse},
    state::AppState,
    storage::{DocumentStorage, OwnershipEnforcer, ProductRepository, StoredProduct, UserRepository},
};

fn owner_name(storage: &DocumentStorage, product: &StoredProduct) -> Result<Option<String>, ApiError> {
    let Some(owner) = product.owner.as_deref() else {
        return Ok(None);
    };
    let user = UserRepository::new(storage).find_by_email(owner)?;
    Ok(user.map(|u| u.name))
}

fn trimmed_description(description: Option<&str>) -> Option<String> {
    description
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
}

#[utoipa::path(
    get,
    path = "/api/products",
    tag = "Products",
    responses(
        (status = 200, description = "All products", body = Vec<ProductResponse>)
    )
)]
pub async fn list_products(State(state): State<AppState>) -> Result<Json<Vec<ProductResponse>>, ApiError> {
    let storage = state.storage.read().await;
    let names: HashMap<String, String> = UserRepository::new(&storage)
        .list_all()?
        .into_iter()
        .map(|u| (u.email, u.name))
        .collect();

    let products = ProductRepository::new(&storage).list_all()?;
    let response = products
        .iter()
        .map(|p| {
            let name = p
                .owner
                .as_deref()
                .and_then(|owner| names.get(&normalize_subject(owner)));
            ProductResponse::new(p, name.map(String::as_str))
        })
        .collect();

    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/api/products/{id}",
    tag = "Products",
    params(("id" = String, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product", body = ProductResponse),
        (status = 404, description = "Product not found")
    )
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ProductResponse>, ApiError> {
    let storage = state.storage.read().await;
    let product = ProductRepository::new(&storage).get(&id)?;
    let name = owner_name(&storage, &product)?;
    Ok(Json(ProductResponse::new(&product, name.as_deref())))
}

#[utoipa::path(
    post,
    path = "/api/products",
    tag = "Products",
    request_body = ProductRequest,
    responses(
        (status = 201, description = "Product created", body = ProductResponse),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_product(
    State(state): State<AppState>,
    Auth(caller): Auth,
    ValidatedJson(req): ValidatedJson<ProductRequest>,
) -> Result<(StatusCode, Json<ProductResponse>), ApiError> {
    let storage = state.storage.write().await;
    let Some(owner) = UserRepository::new(&storage).find_by_email(&caller.subject)? else {
        return Err(ApiError::not_found(format!("User {} not found", caller.subject)));
    };

    let product = StoredProduct {
        id: Uuid::new_v4().to_string(),
        name: req.name.trim().to_string(),
        description: trimmed_description(req.description.as_deref()),
        price: req.price,
        owner: Some(owner.email.clone()),
        created_at: Utc::now(),
    };
    ProductRepository::new(&storage).create(&product)?;
    info!(product_id = %product.id, owner = %owner.email, "Product created");

    Ok((
        StatusCode::CREATED,
        Json(ProductResponse::new(&product, Some(&owner.name))),
    ))
}

#[utoipa::path(
    put,
    path = "/api/products/{id}",
    tag = "Products",
    params(("id" = String, Path, description = "Product id")),
    request_body = ProductRequest,
    responses(
        (status = 200, description = "Product updated", body = ProductResponse),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Not the product owner or an admin"),
        (status = 404, description = "Product not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_product(
    State(state): State<AppState>,
    Auth(caller): Auth,
    uri: Uri,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<ProductRequest>,
) -> Result<Json<ProductResponse>, ApiError> {
    let storage = state.storage.write().await;
    let repo = ProductRepository::new(&storage);
    let mut product = repo.get(&id)?;
    product
        .verify_ownership(&caller, true)
        .map_err(|e| ApiError::auth(e, uri.path()))?;

    product.name = req.name.trim().to_string();
    product.description = trimmed_description(req.description.as_deref());
    product.price = req.price;
    repo.update(&product)?;

    let name = owner_name(&storage, &product)?;
    Ok(Json(ProductResponse::new(&product, name.as_deref())))
}

#[utoipa::path(
    delete,
    path = "/api/products/{id}",
    tag = "Products",
    params(("id" = String, Path, description = "Product id")),
    responses(
        (status = 204, description = "Product deleted"),
        (status = 403, description = "Not the product owner or an admin"),
        (status = 404, description = "Product not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_product(
    State(state): State<AppState>,
    Auth(caller): Auth,
    uri: Uri,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let storage = state.storage.write().await;
    let repo = ProductRepository::new(&storage);
    let product = repo.get(&id)?;
    product
        .verify_ownership(&caller, true)
        .map_err(|e| ApiError::auth(e, uri.path()))?;

    repo.delete(&id)?;
    info!(product_id = %id, by = %caller.subject, "Product deleted");
    Ok(StatusCode::NO_CONTENT)
}
