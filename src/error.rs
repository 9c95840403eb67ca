//! Error taxonomy of the coupon service and its HTTP mapping

use std::fmt;

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// A user-correctable reason why a coupon cannot be used for an order
#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
    InvalidCode,
    OutsideWindow,
    UsageLimitExceeded,
    BelowMinimumOrder { min_order_value: f64 },
    AlreadyUsed,
    PaymentMethodNotAllowed { allowed: Vec<String> },
}

impl Rejection {
    /// Unknown codes are reported as 404, every other rule as 400
    pub fn status(&self) -> StatusCode {
        match self {
            Rejection::InvalidCode => StatusCode::NOT_FOUND,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::InvalidCode => write!(f, "Invalid coupon code"),
            Rejection::OutsideWindow => write!(f, "Coupon has expired or not yet valid"),
            Rejection::UsageLimitExceeded => write!(f, "Coupon usage limit exceeded"),
            Rejection::BelowMinimumOrder { min_order_value } => {
                write!(f, "Minimum order value should be {}", min_order_value)
            }
            Rejection::AlreadyUsed => write!(f, "You have already used this coupon"),
            Rejection::PaymentMethodNotAllowed { allowed } => write!(
                f,
                "This coupon is only valid for {} payments",
                allowed.join(", ")
            ),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] redb::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Coupon not found")]
    NotFound,

    #[error("Coupon code already exists: {0}")]
    DuplicateCode(String),

    #[error("{0}")]
    Rejected(Rejection),

    #[error("Invalid coupon: {0}")]
    InvalidInput(#[from] validator::ValidationErrors),

    #[error("{0}")]
    BadRequest(String),

    #[error("Invalid or missing authorization")]
    Unauthorized,

    #[error("Admin key required")]
    Forbidden,
}

// redb reports each stage with its own error type; fold them into one variant.
macro_rules! database_error {
    ($($source:ty),* $(,)?) => {
        $(
            impl From<$source> for Error {
                fn from(err: $source) -> Self {
                    Error::Database(err.into())
                }
            }
        )*
    };
}

database_error!(
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
);

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Error::BadRequest(rejection.body_text())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            Error::Database(_) | Error::Json(_) => {
                tracing::error!(error = %self, "store failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "message": "Server error" }),
                )
            }
            Error::NotFound => (
                StatusCode::NOT_FOUND,
                json!({ "message": "Coupon not found" }),
            ),
            Error::DuplicateCode(_) => (StatusCode::CONFLICT, json!({ "message": self.to_string() })),
            Error::Rejected(rejection) => (
                rejection.status(),
                json!({ "message": rejection.to_string() }),
            ),
            Error::InvalidInput(_) | Error::BadRequest(_) => {
                (StatusCode::BAD_REQUEST, json!({ "message": self.to_string() }))
            }
            Error::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                json!({
                    "error": "Unauthorized",
                    "message": "Not authorized, no valid token"
                }),
            ),
            Error::Forbidden => (
                StatusCode::FORBIDDEN,
                json!({
                    "error": "Forbidden",
                    "message": "Invalid or missing admin key"
                }),
            ),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_messages() {
        assert_eq!(
            Rejection::BelowMinimumOrder { min_order_value: 1000.0 }.to_string(),
            "Minimum order value should be 1000"
        );
        assert_eq!(
            Rejection::PaymentMethodNotAllowed {
                allowed: vec!["card".into(), "upi".into()]
            }
            .to_string(),
            "This coupon is only valid for card, upi payments"
        );
    }

    #[test]
    fn store_failures_are_opaque() {
        let err = Error::Json(serde_json::from_str::<u8>("nope").unwrap_err());
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn unknown_code_is_not_found() {
        assert_eq!(Rejection::InvalidCode.status(), StatusCode::NOT_FOUND);
        assert_eq!(Rejection::AlreadyUsed.status(), StatusCode::BAD_REQUEST);
    }
}
