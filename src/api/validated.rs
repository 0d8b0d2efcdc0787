// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Body extractors that also run `validator` rules.

use std::collections::BTreeMap;

use axum::{
    extract::{FromRequest, Request},
    Form, Json,
};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::error::ApiError;

/// Like `Json<T>`, but rejects with the validation envelope.
///
/// A body that is not valid JSON for `T` is reported under the `body` field.
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await.map_err(|rejection| {
            let mut fields = BTreeMap::new();
            fields.insert("body".to_string(), rejection.body_text());
            ApiError::validation(fields)
        })?;

        value.validate()?;
        Ok(ValidatedJson(value))
    }
}

/// `Form<T>` counterpart of [`ValidatedJson`] for the browser routes.
pub struct ValidatedForm<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedForm<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Form(value) = Form::<T>::from_request(req, state).await.map_err(|rejection| {
            let mut fields = BTreeMap::new();
            fields.insert("body".to_string(), rejection.body_text());
            ApiError::validation(fields)
        })?;

        value.validate()?;
        Ok(ValidatedForm(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LoginRequest;
    use axum::{body::Body, http::StatusCode};

    fn json_request(body: &str) -> Request {
        Request::builder()
            .method("POST")
            .uri("/")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn valid_body_passes() {
        let req = json_request(r#"{"email":"a@x.io","password":"pw"}"#);
        let ValidatedJson(login) = ValidatedJson::<LoginRequest>::from_request(req, &())
            .await
            .unwrap();
        assert_eq!(login.email, "a@x.io");
    }

    #[tokio::test]
    async fn malformed_json_is_a_body_validation_error() {
        let req = json_request("{not json");
        let err = ValidatedJson::<LoginRequest>::from_request(req, &())
            .await
            .err()
            .unwrap();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(err.validation_errors.unwrap().contains_key("body"));
    }

    #[tokio::test]
    async fn form_missing_field_is_a_body_validation_error() {
        let req = Request::builder()
            .method("POST")
            .uri("/")
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from("email=a%40x.io"))
            .unwrap();
        let err = ValidatedForm::<LoginRequest>::from_request(req, &())
            .await
            .err()
            .unwrap();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(err.validation_errors.unwrap()["body"].contains("password"));
    }

    #[tokio::test]
    async fn rule_violations_are_reported_per_field() {
        let req = json_request(r#"{"email":"nope","password":""}"#);
        let err = ValidatedJson::<LoginRequest>::from_request(req, &())
            .await
            .err()
            .unwrap();
        let fields = err.validation_errors.unwrap();
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
    }
}
