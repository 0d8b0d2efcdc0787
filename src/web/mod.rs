// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Browser-facing routes backed by the `SESSION` cookie.
//!
//! Form login creates a server-side session; everything else on this side
//! of the router reads the identity the pipeline resolved from it. Page
//! rendering is not done here, the page routes only answer with a
//! placeholder so the public allow-list has something to hit.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Redirect,
    routing::{delete, get, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};
use validator::Validate;

use crate::{
    api::{
        auth::verify_credentials, users::register_user, users::remove_user, validated::ValidatedForm,
    },
    auth::{AdminOnly, Auth, Identity, OptionalAuth, SESSION_COOKIE},
    error::ApiError,
    models::{CreateUserRequest, TokenResponse, UserResponse},
    state::AppState,
    storage::UserRepository,
};

#[derive(Debug, Deserialize, Validate)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Field rules are checked in [`register`] so failures can redirect.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/products", get(products_page))
        .route("/login", get(login_page).post(login))
        .route("/register", get(register_page))
        .route("/logout", post(logout))
        .route("/auth/register", post(register))
        .route("/web/token", get(token))
        .route("/web/delete-account", post(delete_account))
        .route("/web/admin/users", get(admin_list_users))
        .route("/web/admin/users/{id}", delete(admin_delete_user))
}

async fn home(OptionalAuth(caller): OptionalAuth) -> String {
    match caller {
        Some(caller) => format!("Signed in as {}", caller.subject),
        None => "lets-play".to_string(),
    }
}

async fn products_page() -> &'static str {
    "products"
}

async fn login_page() -> &'static str {
    "login"
}

async fn register_page() -> &'static str {
    "register"
}

fn session_cookie(id: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, id))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

fn expired_session_cookie() -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE).path("/").build()
}

fn drop_session(state: &AppState, jar: CookieJar) -> CookieJar {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        state.sessions.remove(cookie.value());
    }
    jar.remove(expired_session_cookie())
}

/// Form login. Redirects to `/` with a fresh session cookie on success.
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidatedForm(form): ValidatedForm<LoginForm>,
) -> Result<(CookieJar, Redirect), ApiError> {
    let Some(user) = verify_credentials(&state, &form.email, &form.password).await? else {
        info!("Form login rejected");
        return Ok((jar, Redirect::to("/login?error=true")));
    };

    let jar = drop_session(&state, jar);
    let session = state.sessions.create(&Identity::new(user.email.clone(), user.role, 0));
    info!(user_id = %user.id, "Session opened");
    Ok((jar.add(session_cookie(session)), Redirect::to("/")))
}

pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Redirect) {
    (drop_session(&state, jar), Redirect::to("/login?logout=true"))
}

/// Registration form. Errors come back as a `?error=` code on `/register`.
pub async fn register(
    State(state): State<AppState>,
    ValidatedForm(form): ValidatedForm<RegisterForm>,
) -> Redirect {
    let request = CreateUserRequest {
        name: form.name,
        email: form.email,
        password: form.password,
        role: None,
    };
    if let Err(errors) = request.validate() {
        warn!(?errors, "Registration form rejected");
        return Redirect::to("/register?error=validation");
    }

    match register_user(&state, &request.name, &request.email, &request.password, None).await {
        Ok(_) => Redirect::to("/login?registered"),
        Err(e) if e.status == StatusCode::CONFLICT => Redirect::to("/register?error=exists"),
        Err(e) if e.status.is_client_error() => Redirect::to("/register?error=validation"),
        Err(_) => Redirect::to("/register?error=internal"),
    }
}

/// Issues a bearer token for the session user so pages can call the API.
pub async fn token(
    State(state): State<AppState>,
    Auth(caller): Auth,
) -> Result<Json<TokenResponse>, ApiError> {
    let user = {
        let storage = state.storage.read().await;
        UserRepository::new(&storage).find_by_email(&caller.subject)?
    };
    let Some(user) = user else {
        return Err(ApiError::not_found("User not found"));
    };

    let identity = Identity::new(user.email, user.role, 0);
    let token = state.tokens.issue(&identity, state.token_ttl)?;
    Ok(Json(TokenResponse { token }))
}

/// Deletes the session user's own account, then their session.
///
/// The session survives a failed delete.
pub async fn delete_account(
    State(state): State<AppState>,
    Auth(caller): Auth,
    jar: CookieJar,
) -> Result<(CookieJar, Json<Value>), ApiError> {
    {
        let storage = state.storage.write().await;
        let Some(user) = UserRepository::new(&storage).find_by_email(&caller.subject)? else {
            return Err(ApiError::not_found("User not found"));
        };
        remove_user(&state, &storage, &user.id)?;
    }

    let jar = drop_session(&state, jar);
    Ok((jar, Json(json!({"message": "Account deleted successfully"}))))
}

pub async fn admin_list_users(
    State(state): State<AppState>,
    AdminOnly(_admin): AdminOnly,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let storage = state.storage.read().await;
    let users = UserRepository::new(&storage).list_all()?;
    Ok(Json(users.iter().map(UserResponse::from).collect()))
}

pub async fn admin_delete_user(
    State(state): State<AppState>,
    AdminOnly(_admin): AdminOnly,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let storage = state.storage.write().await;
    remove_user(&state, &storage, &id)?;
    Ok(Json(json!({"message": "User deleted successfully"})))
}
