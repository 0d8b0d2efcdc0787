// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, http::Uri, Json};
use tracing::info;

use crate::{
    api::validated::ValidatedJson,
    auth::{dummy_hash, normalize_subject, verify_password_blocking, Identity},
    error::ApiError,
    models::{LoginRequest, TokenResponse},
    state::AppState,
    storage::{StoredUser, UserRepository},
};

const BAD_CREDENTIALS: &str = "Bad credentials";

/// Looks up `email` and checks `password` against the stored hash.
///
/// Returns `None` for an unknown email and for a wrong password alike. An
/// unknown email is still checked against [`dummy_hash`] so both cases take
/// the same time. The storage lock is released before hashing.
pub(crate) async fn verify_credentials(
    state: &AppState,
    email: &str,
    password: &str,
) -> Result<Option<StoredUser>, ApiError> {
    let user = {
        let storage = state.storage.read().await;
        UserRepository::new(&storage).find_by_email(&normalize_subject(email))?
    };

    let stored = user
        .as_ref()
        .map_or_else(|| dummy_hash().to_string(), |u| u.password_hash.clone());
    let matches = verify_password_blocking(password.to_string(), stored).await?;
    Ok(user.filter(|_| matches))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Bearer token issued", body = TokenResponse),
        (status = 400, description = "Malformed credentials"),
        (status = 401, description = "Bad credentials"),
        (status = 429, description = "Rate limit exceeded")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    uri: Uri,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let Some(user) = verify_credentials(&state, &req.email, &req.password).await? else {
        info!(email = %normalize_subject(&req.email), "Login rejected");
        return Err(ApiError::unauthorized(BAD_CREDENTIALS).with_path(uri.path()));
    };

    let identity = Identity::new(user.email.clone(), user.role, 0);
    let token = state.tokens.issue(&identity, state.token_ttl)?;
    info!(user_id = %user.id, "Token issued");

    Ok(Json(TokenResponse { token }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::users::register_user;
    use crate::auth::Role;
    use crate::config::Config;
    use axum::http::StatusCode;

    fn test_state() -> (AppState, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::for_tests(dir.path().to_string_lossy());
        (AppState::from_config(&config).unwrap(), dir)
    }

    fn login_req(email: &str, password: &str) -> ValidatedJson<LoginRequest> {
        ValidatedJson(LoginRequest {
            email: email.into(),
            password: password.into(),
        })
    }

    #[tokio::test]
    async fn login_issues_token_for_valid_credentials() {
        let (state, _dir) = test_state();
        register_user(&state, "Ann", "Ann@X.io", "password1", Some("ADMIN"))
            .await
            .unwrap();

        let Json(body) = login(
            State(state.clone()),
            Uri::from_static("/api/auth/login"),
            login_req("ann@x.io", "password1"),
        )
        .await
        .unwrap();

        let identity = state.tokens.decode(&body.token).unwrap();
        assert_eq!(identity.subject, "ann@x.io");
        assert_eq!(identity.role, Role::Admin);
    }

    #[tokio::test]
    async fn login_rejects_wrong_password_and_unknown_email() {
        let (state, _dir) = test_state();
        register_user(&state, "Ann", "ann@x.io", "password1", None)
            .await
            .unwrap();

        for (email, password) in [("ann@x.io", "wrong-pass"), ("bob@x.io", "password1")] {
            let err = login(
                State(state.clone()),
                Uri::from_static("/api/auth/login"),
                login_req(email, password),
            )
            .await
            .unwrap_err();
            assert_eq!(err.status, StatusCode::UNAUTHORIZED);
            assert_eq!(err.message, BAD_CREDENTIALS);
            assert_eq!(err.path.as_deref(), Some("/api/auth/login"));
        }
    }

    #[tokio::test]
    async fn unknown_email_still_runs_a_verification() {
        let (state, _dir) = test_state();
        let ghost = verify_credentials(&state, "ghost@x.io", "password1").await.unwrap();
        assert!(ghost.is_none());
        assert!(dummy_hash().starts_with("$argon2id$"));
    }
}
