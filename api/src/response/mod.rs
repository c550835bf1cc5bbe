use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use db::models::SessionKeyError;
use db::realtime::StoreError;
use serde::Serialize;
use services::AttendanceError;

/// Standardized API response wrapper for all outgoing JSON responses.
///
/// Every endpoint answers with the same shape:
/// ```json
/// {
///   "success": true,
///   "data": { ... },
///   "message": "Some message"
/// }
/// ```
///
/// On failure `success` is `false`, `data` is the payload type's default and
/// `message` carries the error text verbatim, for screens to display as is.
#[derive(Serialize)]
pub struct ApiResponse<T>
where
    T: Serialize,
{
    pub success: bool,
    pub data: T,
    pub message: String,
}

impl<T> ApiResponse<T>
where
    T: Serialize,
{
    /// Constructs a success response with the given data and message.
    pub fn success(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data,
            message: message.into(),
        }
    }

    /// Constructs an error response with a message and default `data`.
    pub fn error(message: impl Into<String>) -> Self
    where
        T: Default,
    {
        Self {
            success: false,
            data: T::default(),
            message: message.into(),
        }
    }
}

/// `200 OK` with `data` wrapped in the envelope.
pub fn ok<T: Serialize>(data: T, message: impl Into<String>) -> Response {
    (StatusCode::OK, Json(ApiResponse::success(data, message))).into_response()
}

/// Error envelope with the given status.
pub fn fail(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ApiResponse::<()>::error(message))).into_response()
}

/// HTTP status for a failed attendance operation.
///
/// - `SessionLocked` → `423 Locked`
/// - bad session keys or store paths → `400 Bad Request`
/// - store offline → `503 Service Unavailable`
/// - anything else → `500 Internal Server Error`
pub fn status_for(err: &AttendanceError) -> StatusCode {
    match err {
        AttendanceError::SessionLocked => StatusCode::LOCKED,
        AttendanceError::InvalidSessionKey(_) => StatusCode::BAD_REQUEST,
        AttendanceError::Store(StoreError::InvalidPath(_)) => StatusCode::BAD_REQUEST,
        AttendanceError::Store(StoreError::Unavailable(_) | StoreError::Disconnected(_)) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        AttendanceError::Store(StoreError::Database(_) | StoreError::Serialization(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Handler error carrying the failed operation's cause.
#[derive(Debug)]
pub struct ApiError(pub AttendanceError);

impl From<AttendanceError> for ApiError {
    fn from(e: AttendanceError) -> Self {
        Self(e)
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        Self(e.into())
    }
}

impl From<SessionKeyError> for ApiError {
    fn from(e: SessionKeyError) -> Self {
        Self(e.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self.0);
        }
        fail(status, self.0.to_string())
    }
}

pub type ApiResult = Result<Response, ApiError>;
