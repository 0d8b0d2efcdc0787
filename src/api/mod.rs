// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::{Method, StatusCode, Uri},
    middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    error::ApiError,
    models::{
        CreateUserRequest, LoginRequest, ProductRequest, ProductResponse, TokenResponse,
        UpdateProfileRequest, UpdateUserRequest, UserResponse,
    },
    pipeline,
    state::AppState,
    web,
};

pub mod auth;
pub mod health;
pub mod products;
pub mod users;
pub mod validated;

/// Full application router.
///
/// Routes are registered with their full paths so that handlers and the
/// pipeline see the same request path. CORS applies to `/api` routes only.
pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/api/auth/login", post(auth::login))
        .route(
            "/api/users",
            get(users::list_users).post(users::create_user),
        )
        .route(
            "/api/users/{id}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route("/api/users/{id}/profile", put(users::update_profile))
        .route(
            "/api/products",
            get(products::list_products).post(products::create_product),
        )
        .route(
            "/api/products/{id}",
            get(products::get_product)
                .put(products::update_product)
                .delete(products::delete_product),
        )
        .method_not_allowed_fallback(method_not_allowed)
        .layer(CorsLayer::permissive());

    Router::new()
        .merge(api_routes)
        .merge(web::routes())
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .method_not_allowed_fallback(method_not_allowed)
        .fallback(not_found)
        .with_state(state.clone())
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(middleware::from_fn_with_state(state, pipeline::guard))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

async fn not_found(method: Method, uri: Uri) -> ApiError {
    ApiError::not_found(format!("No handler found for {method} {}", uri.path()))
}

async fn method_not_allowed(method: Method) -> ApiError {
    ApiError::new(
        StatusCode::METHOD_NOT_ALLOWED,
        format!("Request method '{method}' is not supported"),
    )
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::login,
        users::create_user,
        users::list_users,
        users::get_user,
        users::update_user,
        users::update_profile,
        users::delete_user,
        products::list_products,
        products::get_product,
        products::create_product,
        products::update_product,
        products::delete_product,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            LoginRequest,
            TokenResponse,
            CreateUserRequest,
            UpdateUserRequest,
            UpdateProfileRequest,
            UserResponse,
            ProductRequest,
            ProductResponse,
            health::HealthResponse,
            health::ReadyResponse,
            health::HealthChecks
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Token issuance"),
        (name = "Users", description = "User accounts"),
        (name = "Products", description = "Product catalogue"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[tokio::test]
    async fn router_builds_with_all_routes() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::from_config(&Config::for_tests(dir.path().to_string_lossy())).unwrap();
        let app = router(state);
        let _ = app.into_make_service();
    }

    #[test]
    fn openapi_lists_secured_routes() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/users/{id}/profile"));
        assert!(doc
            .components
            .unwrap()
            .security_schemes
            .contains_key("bearer_auth"));
    }
}
