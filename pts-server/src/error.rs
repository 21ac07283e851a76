use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use pts_core::PtsError;
use serde_json::json;

/// A service error on its way out as an HTTP response.
#[derive(Debug)]
pub struct ApiError {
    error: PtsError,
    expose_details: bool,
}

impl ApiError {
    pub fn new(error: PtsError, expose_details: bool) -> Self {
        Self { error, expose_details }
    }

    pub fn status_code(&self) -> StatusCode {
        match &self.error {
            PtsError::NotFound(_) => StatusCode::NOT_FOUND,
            PtsError::Validation(_) | PtsError::BadRequest(_) => StatusCode::BAD_REQUEST,
            PtsError::Conflict(_) => StatusCode::CONFLICT,
            PtsError::Storage(_) | PtsError::Config(_) | PtsError::Io(_) | PtsError::Serde(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Unreadable JSON bodies are client errors and answer with the same JSON shape
/// as every other 400.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(PtsError::BadRequest(rejection.body_text()), false)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self.error {
            PtsError::Validation(errors) => errors.to_json(),
            PtsError::NotFound(msg) | PtsError::BadRequest(msg) | PtsError::Conflict(msg) => {
                json!({ "error": msg })
            }
            other => {
                tracing::error!(error = %other, "request failed");
                if self.expose_details {
                    json!({ "error": other.to_string() })
                } else {
                    json!({ "error": "internal server error" })
                }
            }
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pts_core::ValidationErrors;

    #[test]
    fn test_status_codes() {
        let cases = [
            (PtsError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (PtsError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
            (PtsError::Validation(ValidationErrors::non_field("x")), StatusCode::BAD_REQUEST),
            (PtsError::Conflict("x".into()), StatusCode::CONFLICT),
            (PtsError::Storage("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (error, status) in cases {
            assert_eq!(ApiError::new(error, false).status_code(), status);
        }
    }

    #[tokio::test]
    async fn test_json_rejection_is_a_bad_request() {
        use axum::{body::Body, extract::FromRequest, http::Request};

        let request = Request::builder()
            .method("POST")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let rejection = match Json::<serde_json::Value>::from_request(request, &()).await {
            Err(rejection) => rejection,
            Ok(_) => panic!("malformed body was accepted"),
        };

        let error = ApiError::from(rejection);
        assert_eq!(error.status_code(), StatusCode::BAD_REQUEST);
        assert!(matches!(error.error, PtsError::BadRequest(_)));
    }

    #[test]
    fn test_storage_details_hidden_by_default() {
        let response = ApiError::new(PtsError::Storage("disk full".into()), false).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
