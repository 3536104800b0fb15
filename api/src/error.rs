use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use stratagem_core::error::{self, ApiError, CompletionError};

/// Internal error type that converts to structured API responses.
///
/// Diagnostic detail (upstream status bodies, raw/cleaned text excerpts) is
/// logged server-side only; clients get a sanitized message and a
/// machine-readable code.
#[derive(Debug)]
pub enum AppError {
    /// Caller-supplied data failed basic shape checks (400). Detected before
    /// any network call is made.
    Validation {
        message: String,
        field: Option<String>,
        received: Option<serde_json::Value>,
        docs_hint: Option<String>,
    },
    /// The completion client gave up (maps per variant, see `into_response`)
    Upstream(CompletionError),
    /// Unexpected fault anywhere in the pipeline (500)
    Internal(String),
}

impl From<CompletionError> for AppError {
    fn from(err: CompletionError) -> Self {
        AppError::Upstream(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let request_id = uuid::Uuid::now_v7().to_string();

        let (status, api_error) = match self {
            AppError::Validation {
                message,
                field,
                received,
                docs_hint,
            } => (
                StatusCode::BAD_REQUEST,
                ApiError {
                    error: error::codes::VALIDATION_FAILED.to_string(),
                    message,
                    field,
                    received,
                    request_id,
                    docs_hint,
                },
            ),
            AppError::Upstream(err) => upstream_response(err, request_id),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiError {
                        error: error::codes::INTERNAL_ERROR.to_string(),
                        message: "An internal error occurred".to_string(),
                        field: None,
                        received: None,
                        request_id,
                        docs_hint: None,
                    },
                )
            }
        };

        (status, Json(api_error)).into_response()
    }
}

/// Map a completion failure to an outward status + body.
///
/// The upstream's own status is passed through when it is informative (a 429
/// tells the caller exactly what to do); response-shape failures are our 500s
/// because the caller can do nothing about them.
fn upstream_response(err: CompletionError, request_id: String) -> (StatusCode, ApiError) {
    match err {
        CompletionError::ExhaustedRetries {
            attempts,
            last_status,
            detail,
        } => {
            tracing::error!(attempts, last_status = ?last_status, detail = %detail, "upstream unavailable");
            let status = last_status
                .map(|s| StatusCode::from_u16(s.as_u16()).unwrap_or(StatusCode::BAD_GATEWAY))
                .unwrap_or(StatusCode::BAD_GATEWAY);
            (
                status,
                ApiError {
                    error: error::codes::UPSTREAM_UNAVAILABLE.to_string(),
                    message: "The strategy service is overloaded. Please try again shortly."
                        .to_string(),
                    field: None,
                    received: None,
                    request_id,
                    docs_hint: None,
                },
            )
        }
        CompletionError::UpstreamStatus { status, detail } => {
            tracing::error!(status = %status, detail = %detail, "upstream rejected the request");
            (
                StatusCode::from_u16(status.as_u16()).unwrap_or(StatusCode::BAD_GATEWAY),
                ApiError {
                    error: error::codes::UPSTREAM_ERROR.to_string(),
                    message: "The language model rejected the request.".to_string(),
                    field: None,
                    received: None,
                    request_id,
                    docs_hint: None,
                },
            )
        }
        CompletionError::EmptyResponse => (
            StatusCode::INTERNAL_SERVER_ERROR,
            ApiError {
                error: error::codes::UPSTREAM_EMPTY_RESPONSE.to_string(),
                message: "The language model returned no usable content.".to_string(),
                field: None,
                received: None,
                request_id,
                docs_hint: None,
            },
        ),
        CompletionError::UnparsableResponse(failure) => {
            // excerpts already logged at the client boundary
            tracing::error!(reason = %failure.reason, "serving unparsable-response error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError {
                    error: error::codes::UPSTREAM_UNPARSABLE.to_string(),
                    message: "The language model response could not be interpreted.".to_string(),
                    field: None,
                    received: None,
                    request_id,
                    docs_hint: None,
                },
            )
        }
    }
}
