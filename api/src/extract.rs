//! Custom extractors that convert axum rejections to structured AppError
//! responses. Use `AppJson<T>` in handler signatures instead of `axum::Json<T>`
//! so a malformed body produces a JSON 400 rather than axum's plain-text 422.

use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
};

use crate::error::AppError;

pub struct AppJson<T>(pub T);

impl<S, T> FromRequest<S> for AppJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(AppJson(value)),
            Err(rejection) => Err(AppError::Validation {
                message: format!("Invalid request body: {}", rejection.body_text()),
                field: Some("body".to_string()),
                received: None,
                docs_hint: Some(
                    "Check the request body against the endpoint's schema (GET /api-doc/openapi.json)."
                        .to_string(),
                ),
            }),
        }
    }
}
