use axum::{http::StatusCode, response::IntoResponse, Json};
use ghostwatch_core::error::CycleError;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    pub request_id: String,
}

#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    NotFound(String),
    /// Credentials were rejected; polling stays stopped until they are replaced.
    ReauthRequired(String),
    /// Nothing to serve yet, or the site could not be reached.
    Unavailable(String),
}

#[derive(Debug)]
pub struct ApiError {
    pub error: AppError,
    pub request_id: String,
}

impl AppError {
    pub fn with_request_id(self, request_id: &str) -> ApiError {
        ApiError {
            error: self,
            request_id: request_id.to_string(),
        }
    }
}

impl From<CycleError> for AppError {
    fn from(err: CycleError) -> Self {
        match err {
            CycleError::AuthFailed(message) => AppError::ReauthRequired(message),
            CycleError::Transient(message) => AppError::Unavailable(message),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, code, message) = match self.error {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "invalid_request", msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            AppError::ReauthRequired(msg) => (StatusCode::UNAUTHORIZED, "reauth_required", msg),
            AppError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, "unavailable", msg),
        };

        (
            status,
            Json(ErrorResponse {
                error: ErrorBody {
                    code: code.to_string(),
                    message,
                    request_id: self.request_id,
                },
            }),
        )
            .into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use axum::response::IntoResponse;

    fn rt() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
    }

    fn render(err: ApiError) -> (StatusCode, serde_json::Value) {
        rt().block_on(async {
            let response = err.into_response();
            let status = response.status();
            let body = to_bytes(response.into_body(), 1024).await.unwrap();
            (status, serde_json::from_slice(&body).unwrap())
        })
    }

    #[test]
    fn test_with_request_id() {
        let err = AppError::Unavailable("no snapshot yet".to_string()).with_request_id("req_123");
        assert_eq!(err.request_id, "req_123");
    }

    #[test]
    fn test_bad_request_response() {
        let (status, json) =
            render(AppError::BadRequest("invalid webhook body".to_string()).with_request_id("req_001"));

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "invalid_request");
        assert_eq!(json["error"]["message"], "invalid webhook body");
        assert_eq!(json["error"]["request_id"], "req_001");
    }

    #[test]
    fn test_not_found_response() {
        let (status, json) =
            render(AppError::NotFound("unknown receiver".to_string()).with_request_id("req_002"));

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"]["code"], "not_found");
    }

    #[test]
    fn test_auth_cycle_error_requires_reauth() {
        let err = AppError::from(CycleError::AuthFailed("HTTP 401".to_string()));
        let (status, json) = render(err.with_request_id("req_003"));

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"]["code"], "reauth_required");
        assert_eq!(json["error"]["message"], "HTTP 401");
    }

    #[test]
    fn test_transient_cycle_error_is_unavailable() {
        let err = AppError::from(CycleError::Transient("HTTP 502".to_string()));
        let (status, json) = render(err.with_request_id("req_004"));

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json["error"]["code"], "unavailable");
    }
}
