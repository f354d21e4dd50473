use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;

use crate::domain::{
    RepositoryError,
    cart::CartError,
    orders::{CheckoutError, VerificationError},
};

#[derive(Debug)]
pub enum ClientError {
    Cart(CartError),
    Checkout(CheckoutError),
    Verification(VerificationError),
    NotFound(String),
    Payload(String),
    Internal(anyhow::Error),
}

impl IntoResponse for ClientError {
    fn into_response(self) -> Response {
        #[derive(serde::Serialize)]
        struct ErrorResponse {
            message: String,
        }

        let (status, message) = match self {
            ClientError::Cart(cart_error) => (StatusCode::BAD_REQUEST, cart_error.to_string()),
            ClientError::Checkout(CheckoutError::Repository(e)) => {
                error!("Checkout failed with {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Could not place your order. Please try again.".to_owned(),
                )
            }
            ClientError::Checkout(checkout_error) => {
                (StatusCode::BAD_REQUEST, checkout_error.to_string())
            }
            ClientError::Verification(VerificationError::Repository(e)) => {
                error!("Payment verification failed with {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Please ask your system administrator to check the logs.".to_owned(),
                )
            }
            ClientError::Verification(e @ VerificationError::Timeout { .. }) => {
                (StatusCode::GATEWAY_TIMEOUT, e.to_string())
            }
            ClientError::Verification(e @ VerificationError::NotFound(_)) => {
                (StatusCode::NOT_FOUND, e.to_string())
            }
            ClientError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            ClientError::Payload(message) => (StatusCode::BAD_REQUEST, message),
            ClientError::Internal(e) => {
                error!("Request failed with {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Please ask your system administrator to check the logs.".to_owned(),
                )
            }
        };

        (status, Json(ErrorResponse { message })).into_response()
    }
}

impl From<CartError> for ClientError {
    fn from(cart_error: CartError) -> Self {
        ClientError::Cart(cart_error)
    }
}

impl From<CheckoutError> for ClientError {
    fn from(checkout_error: CheckoutError) -> Self {
        ClientError::Checkout(checkout_error)
    }
}

impl From<VerificationError> for ClientError {
    fn from(verification_error: VerificationError) -> Self {
        ClientError::Verification(verification_error)
    }
}

impl From<RepositoryError> for ClientError {
    fn from(repository_error: RepositoryError) -> Self {
        match repository_error {
            e @ RepositoryError::NotFound(_) => ClientError::NotFound(e.to_string()),
            e => ClientError::Internal(e.into()),
        }
    }
}

impl From<anyhow::Error> for ClientError {
    fn from(value: anyhow::Error) -> Self {
        ClientError::Internal(value)
    }
}

//-------------------------- Tests -------------------------------
