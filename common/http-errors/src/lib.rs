use axum::{http::{HeaderValue, StatusCode}, response::{IntoResponse, Response}, Json};
use serde::Serialize;
use serde_json::Value;

/// Wire shape shared by every response: `{ success, msg, data }`.
#[derive(Serialize, Debug)]
pub struct Envelope<T> {
    pub success: bool,
    pub msg: String,
    pub data: T,
}

/// Successful response body; always rendered with HTTP 200 and `msg = "success"`.
#[derive(Debug)]
pub struct Success<T>(pub T);

pub fn success<T: Serialize>(data: T) -> Success<T> { Success(data) }

impl<T: Serialize> IntoResponse for Success<T> {
    fn into_response(self) -> Response {
        let body = Envelope { success: true, msg: "success".to_string(), data: self.0 };
        (StatusCode::OK, Json(body)).into_response()
    }
}

#[derive(Debug)]
pub enum ApiError {
    /// Rejected input. Rendered with the envelope's default status (200).
    Validation { code: &'static str, message: String },
    Unauthorized { code: &'static str, message: &'static str },
    Internal { message: String, detail: Option<String> },
}

impl ApiError {
    pub fn validation(code: &'static str, message: impl Into<String>) -> Self {
        Self::Validation { code, message: message.into() }
    }

    pub fn unauthorized(code: &'static str, message: &'static str) -> Self {
        Self::Unauthorized { code, message }
    }

    /// `expose_detail` is only set in development builds of the server.
    pub fn internal<E: std::fmt::Display>(e: E, expose_detail: bool) -> Self {
        Self::Internal {
            message: "internal server error".to_string(),
            detail: expose_detail.then(|| e.to_string()),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } => StatusCode::OK,
            ApiError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Validation { code, .. } | ApiError::Unauthorized { code, .. } => code,
            ApiError::Internal { .. } => "internal_error",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ApiError::Validation { message, .. } => message,
            ApiError::Unauthorized { message, .. } => message,
            ApiError::Internal { message, .. } => message,
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message(), self.code())
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_code = self.code();
        let (msg, data) = match self {
            ApiError::Validation { message, .. } => (message, Value::Null),
            ApiError::Unauthorized { message, .. } => (message.to_string(), Value::Null),
            ApiError::Internal { message, detail } => (
                message,
                detail.map(|detail| serde_json::json!({ "detail": detail })).unwrap_or(Value::Null),
            ),
        };
        let body = Envelope { success: false, msg, data };
        let mut resp = (status, Json(body)).into_response();
        if let Ok(val) = HeaderValue::from_str(error_code) {
            resp.headers_mut().insert("X-Error-Code", val);
        }
        resp
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
