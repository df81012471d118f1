//! HTTP mapping of engine errors.
//!
//! [`ApiError`] wraps [`redpacket::Error`] and renders it as a plain-text
//! response with an appropriate status code.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

#[derive(Debug)]
pub enum ApiError {
    /// Query parameters were missing or malformed.
    BadParams(String),
    /// The engine rejected or failed the request.
    Engine(redpacket::Error),
}

impl From<redpacket::Error> for ApiError {
    fn from(err: redpacket::Error) -> Self {
        Self::Engine(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        use redpacket::Error;

        let (status, message) = match self {
            ApiError::BadParams(reason) => {
                (StatusCode::BAD_REQUEST, format!("Malformed parameters: {reason}"))
            }
            ApiError::Engine(err @ Error::InvalidRequest { .. }) => {
                (StatusCode::BAD_REQUEST, err.to_string())
            }
            ApiError::Engine(err @ Error::ServiceShutdown) => {
                (StatusCode::SERVICE_UNAVAILABLE, err.to_string())
            }
            ApiError::Engine(err @ Error::ClaimTimeout { .. }) => {
                (StatusCode::GATEWAY_TIMEOUT, err.to_string())
            }
            ApiError::Engine(err @ Error::ChannelError { .. }) => {
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
        };
        (status, format!("{message}\n")).into_response()
    }
}
