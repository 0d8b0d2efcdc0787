// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::collections::BTreeMap;

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
    auth::{hash_password_blocking, normalize_subject, AdminOnly, Auth, Identity, Role},
    config::SeedAdmin,
    error::ApiError,
    models::{CreateUserRequest, UpdateProfileRequest, UpdateUserRequest, UserResponse},
    state::AppState,
    storage::{DocumentStorage, OwnershipEnforcer, StoredUser, UserRepository},
};

const MIN_PASSWORD_LEN: usize = 8;

/// Trims a display name, refusing template metacharacters.
pub(crate) fn sanitize_name(name: &str) -> Result<String, ApiError> {
    if name.contains(['$', '{', '}']) {
        return Err(ApiError::bad_request("Illegal characters"));
    }
    Ok(name.trim().to_string())
}

/// Blank means "not requested" and yields `Ok(None)`.
fn parse_requested_role(role: Option<&str>) -> Result<Option<Role>, ApiError> {
    match role.map(str::trim).filter(|r| !r.is_empty()) {
        None => Ok(None),
        Some(raw) => Role::parse(raw)
            .map(Some)
            .ok_or_else(|| ApiError::bad_request("Role must be USER or ADMIN")),
    }
}

/// Creates a user record. Shared by the API and the registration form.
///
/// The password is hashed before the storage write lock is taken.
pub(crate) async fn register_user(
    state: &AppState,
    name: &str,
    email: &str,
    password: &str,
    role: Option<&str>,
) -> Result<StoredUser, ApiError> {
    let role = parse_requested_role(role)?.unwrap_or(Role::User);
    let name = sanitize_name(name)?;
    let email = normalize_subject(email);
    let password_hash = hash_password_blocking(password.to_string()).await?;

    let storage = state.storage.write().await;
    let repo = UserRepository::new(&storage);
    if repo.find_by_email(&email)?.is_some() {
        return Err(ApiError::conflict("Email already in use"));
    }

    let user = StoredUser {
        id: Uuid::new_v4().to_string(),
        name,
        email,
        password_hash,
        role,
        created_at: Utc::now(),
    };
    let user = repo.create(&user)?;
    info!(user_id = %user.id, role = user.role.as_str(), "User registered");
    Ok(user)
}

/// Deletes a user, their products and their sessions.
pub(crate) fn remove_user(state: &AppState, storage: &DocumentStorage, user_id: &str) -> Result<(), ApiError> {
    let (user, products) = UserRepository::new(storage).delete_cascade(user_id)?;
    let sessions = state.sessions.remove_subject(&user.email);
    info!(user_id = %user.id, products, sessions, "User deleted");
    Ok(())
}

/// Creates the configured bootstrap admin unless that email already exists.
pub async fn ensure_seed_admin(state: &AppState, seed: &SeedAdmin) -> Result<bool, ApiError> {
    let exists = {
        let storage = state.storage.read().await;
        UserRepository::new(&storage)
            .find_by_email(&normalize_subject(&seed.email))?
            .is_some()
    };
    if exists {
        return Ok(false);
    }
    register_user(state, "Administrator", &seed.email, &seed.password, Some("ADMIN")).await?;
    Ok(true)
}

#[utoipa::path(
    post,
    path = "/api/users",
    tag = "Users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Email already in use"),
        (status = 429, description = "Rate limit exceeded")
    )
)]
pub async fn create_user(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let user = register_user(&state, &req.name, &req.email, &req.password, req.role.as_deref()).await?;
    Ok((StatusCode::CREATED, Json(UserResponse::from(&user))))
}

#[utoipa::path(
    get,
    path = "/api/users",
    tag = "Users",
    responses(
        (status = 200, description = "All users", body = Vec<UserResponse>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin role required")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_users(
    State(state): State<AppState>,
    AdminOnly(_admin): AdminOnly,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let storage = state.storage.read().await;
    let users = UserRepository::new(&storage).list_all()?;
    Ok(Json(users.iter().map(UserResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/api/users/{id}",
    tag = "Users",
    params(("id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "User", body = UserResponse),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_user(
    State(state): State<AppState>,
    AdminOnly(_admin): AdminOnly,
    Path(id): Path<String>,
) -> Result<Json<UserResponse>, ApiError> {
    let storage = state.storage.read().await;
    let user = UserRepository::new(&storage).get(&id)?;
    Ok(Json(UserResponse::from(&user)))
}

#[utoipa::path(
    put,
    path = "/api/users/{id}",
    tag = "Users",
    params(("id" = String, Path, description = "User id")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = UserResponse),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_user(
    State(state): State<AppState>,
    AdminOnly(_admin): AdminOnly,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<UpdateUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let storage = state.storage.write().await;
    let repo = UserRepository::new(&storage);
    let mut user = repo.get(&id)?;

    user.name = sanitize_name(&req.name)?;
    if let Some(role) = parse_requested_role(req.role.as_deref())? {
        user.role = role;
    }
    repo.update(&user)?;

    Ok(Json(UserResponse::from(&user)))
}

#[utoipa::path(
    put,
    path = "/api/users/{id}/profile",
    tag = "Users",
    params(("id" = String, Path, description = "User id")),
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = UserResponse),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Not the account owner"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_profile(
    State(state): State<AppState>,
    Auth(caller): Auth,
    uri: Uri,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<UpdateProfileRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    {
        let storage = state.storage.read().await;
        let user = UserRepository::new(&storage).get(&id)?;
        authorize_owner(&user, &caller, uri.path())?;
    }

    let name = match req.name.as_deref().filter(|n| !n.trim().is_empty()) {
        Some(name) => Some(sanitize_name(name)?),
        None => None,
    };
    let password_hash = match req.password.filter(|p| !p.trim().is_empty()) {
        Some(password) if password.chars().count() < MIN_PASSWORD_LEN => {
            let mut fields = BTreeMap::new();
            fields.insert("password".to_string(), "size must be at least 8".to_string());
            return Err(ApiError::validation(fields));
        }
        Some(password) => Some(hash_password_blocking(password).await?),
        None => None,
    };

    let storage = state.storage.write().await;
    let repo = UserRepository::new(&storage);
    let mut user = repo.get(&id)?;
    if let Some(name) = name {
        user.name = name;
    }
    if let Some(password_hash) = password_hash {
        user.password_hash = password_hash;
    }
    repo.update(&user)?;

    Ok(Json(UserResponse::from(&user)))
}

#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    tag = "Users",
    params(("id" = String, Path, description = "User id")),
    responses(
        (status = 204, description = "User and their products deleted"),
        (status = 403, description = "Not the account owner or an admin"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_user(
    State(state): State<AppState>,
    Auth(caller): Auth,
    uri: Uri,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let storage = state.storage.write().await;
    let user = UserRepository::new(&storage).get(&id)?;
    authorize_owner(&user, &caller, uri.path())?;

    remove_user(&state, &storage, &id)?;
    Ok(StatusCode::NO_CONTENT)
}

fn authorize_owner(user: &StoredUser, caller: &Identity, path: &str) -> Result<(), ApiError> {
    user.verify_ownership(caller, true)
        .map_err(|e| ApiError::auth(e, path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::auth::verify_credentials;
    use crate::config::Config;
    use crate::storage::{ProductRepository, StoredProduct};

    fn test_state() -> (AppState, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::for_tests(dir.path().to_string_lossy());
        (AppState::from_config(&config).unwrap(), dir)
    }

    fn create_req(email: &str, role: Option<&str>) -> ValidatedJson<CreateUserRequest> {
        ValidatedJson(CreateUserRequest {
            name: "  Ann  ".into(),
            email: email.into(),
            password: "password1".into(),
            role: role.map(str::to_string),
        })
    }

    fn as_user(email: &str) -> Identity {
        Identity::new(email, Role::User, 0)
    }

    fn as_admin() -> Identity {
        Identity::new("root@x.io", Role::Admin, 0)
    }

    #[tokio::test]
    async fn create_user_defaults_to_user_role_and_trims_name() {
        let (state, _dir) = test_state();
        let (status, Json(user)) = create_user(State(state.clone()), create_req("ann@x.io", None))
            .await
            .unwrap();

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(user.name, "Ann");
        assert_eq!(user.role, Role::User);
    }

    #[tokio::test]
    async fn create_user_rejects_duplicate_email_and_bad_role() {
        let (state, _dir) = test_state();
        create_user(State(state.clone()), create_req("ann@x.io", None))
            .await
            .unwrap();

        let dup = create_user(State(state.clone()), create_req("ANN@x.io", None))
            .await
            .unwrap_err();
        assert_eq!(dup.status, StatusCode::CONFLICT);
        assert_eq!(dup.message, "Email already in use");

        let bad = create_user(State(state.clone()), create_req("bob@x.io", Some("ROOT")))
            .await
            .unwrap_err();
        assert_eq!(bad.status, StatusCode::BAD_REQUEST);
        assert_eq!(bad.message, "Role must be USER or ADMIN");
    }

    #[test]
    fn sanitize_name_refuses_template_characters() {
        assert_eq!(sanitize_name("  Ann ").unwrap(), "Ann");
        let err = sanitize_name("${jndi}").unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "Illegal characters");
    }

    #[tokio::test]
    async fn update_user_changes_role() {
        let (state, _dir) = test_state();
        let (_, Json(created)) = create_user(State(state.clone()), create_req("ann@x.io", None))
            .await
            .unwrap();

        let Json(updated) = update_user(
            State(state.clone()),
            AdminOnly(as_admin()),
            Path(created.id.clone()),
            ValidatedJson(UpdateUserRequest {
                name: "Annie".into(),
                role: Some("role_admin".into()),
            }),
        )
        .await
        .unwrap();

        assert_eq!(updated.name, "Annie");
        assert_eq!(updated.role, Role::Admin);
    }

    #[tokio::test]
    async fn profile_update_is_owner_only() {
        let (state, _dir) = test_state();
        let (_, Json(ann)) = create_user(State(state.clone()), create_req("ann@x.io", None))
            .await
            .unwrap();
        let uri = Uri::from_static("/api/users/x/profile");

        let denied = update_profile(
            State(state.clone()),
            Auth(as_user("bob@x.io")),
            uri.clone(),
            Path(ann.id.clone()),
            ValidatedJson(UpdateProfileRequest {
                name: Some("Mallory".into()),
                password: None,
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(denied.status, StatusCode::FORBIDDEN);
        assert_eq!(denied.path.as_deref(), Some("/api/users/x/profile"));

        let Json(updated) = update_profile(
            State(state.clone()),
            Auth(as_user("ann@x.io")),
            uri,
            Path(ann.id.clone()),
            ValidatedJson(UpdateProfileRequest {
                name: Some("Ann B".into()),
                password: Some("   ".into()),
            }),
        )
        .await
        .unwrap();
        assert_eq!(updated.name, "Ann B");
    }

    #[tokio::test]
    async fn profile_update_replaces_password() {
        let (state, _dir) = test_state();
        let (_, Json(ann)) = create_user(State(state.clone()), create_req("ann@x.io", None))
            .await
            .unwrap();

        update_profile(
            State(state.clone()),
            Auth(as_user("ann@x.io")),
            Uri::from_static("/api/users/x/profile"),
            Path(ann.id),
            ValidatedJson(UpdateProfileRequest {
                name: None,
                password: Some("new-password".into()),
            }),
        )
        .await
        .unwrap();

        let old = verify_credentials(&state, "ann@x.io", "password1").await.unwrap();
        assert!(old.is_none());
        let new = verify_credentials(&state, "ann@x.io", "new-password").await.unwrap();
        assert!(new.is_some());
    }

    #[tokio::test]
    async fn profile_update_enforces_password_length() {
        let (state, _dir) = test_state();
        let (_, Json(ann)) = create_user(State(state.clone()), create_req("ann@x.io", None))
            .await
            .unwrap();

        let err = update_profile(
            State(state.clone()),
            Auth(as_user("ann@x.io")),
            Uri::from_static("/api/users/x/profile"),
            Path(ann.id),
            ValidatedJson(UpdateProfileRequest {
                name: None,
                password: Some("short".into()),
            }),
        )
        .await
        .unwrap_err();
        assert!(err.validation_errors.unwrap().contains_key("password"));
    }

    #[tokio::test]
    async fn delete_user_cascades_and_drops_sessions() {
        let (state, _dir) = test_state();
        let (_, Json(ann)) = create_user(State(state.clone()), create_req("ann@x.io", None))
            .await
            .unwrap();
        {
            let storage = state.storage.write().await;
            ProductRepository::new(&storage)
                .create(&StoredProduct {
                    id: "p1".into(),
                    name: "Widget".into(),
                    description: None,
                    price: 1.0,
                    owner: Some("ann@x.io".into()),
                    created_at: Utc::now(),
                })
                .unwrap();
        }
        let session = state.sessions.create(&as_user("ann@x.io"));
        let uri = Uri::from_static("/api/users/x");

        let denied = delete_user(
            State(state.clone()),
            Auth(as_user("bob@x.io")),
            uri.clone(),
            Path(ann.id.clone()),
        )
        .await
        .unwrap_err();
        assert_eq!(denied.status, StatusCode::FORBIDDEN);

        let status = delete_user(State(state.clone()), Auth(as_admin()), uri, Path(ann.id.clone()))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);

        let storage = state.storage.read().await;
        assert!(!UserRepository::new(&storage).exists(&ann.id));
        assert!(!ProductRepository::new(&storage).exists("p1"));
        assert!(state.sessions.get(&session).is_none());
    }

    #[tokio::test]
    async fn seed_admin_is_created_once() {
        let (state, _dir) = test_state();
        let seed = SeedAdmin {
            email: "root@x.io".into(),
            password: "password1".into(),
        };
        assert!(ensure_seed_admin(&state, &seed).await.unwrap());
        assert!(!ensure_seed_admin(&state, &seed).await.unwrap());

        let storage = state.storage.read().await;
        let admin = UserRepository::new(&storage)
            .find_by_email("root@x.io")
            .unwrap()
            .unwrap();
        assert_eq!(admin.role, Role::Admin);
    }
}
