//! Mapping of proxy failures onto HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use ckan::{CatalogError, ErrorKind};
use thiserror::Error;

use crate::api_types::{ErrorBody, FailureEnvelope};

#[derive(Debug, Error)]
pub enum ProxyError {
    /// Bad caller input. Never forwarded upstream.
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

impl ProxyError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProxyError::Validation(_) => ErrorKind::Validation,
            ProxyError::Catalog(err) => err.kind(),
        }
    }

    /// Status code and envelope body for this failure.
    pub fn to_parts(&self) -> (StatusCode, ErrorBody) {
        match self {
            ProxyError::Validation(message) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    message: message.clone(),
                    status: None,
                },
            ),
            ProxyError::Catalog(CatalogError::Timeout) => (
                StatusCode::GATEWAY_TIMEOUT,
                ErrorBody {
                    message: "Request timeout".to_owned(),
                    status: None,
                },
            ),
            ProxyError::Catalog(CatalogError::Remote { status, message }) => {
                match StatusCode::from_u16(*status)
                    .ok()
                    .filter(|s| s.is_client_error() || s.is_server_error())
                {
                    Some(code) => (
                        code,
                        ErrorBody {
                            message: message.clone(),
                            status: Some(*status),
                        },
                    ),
                    // `success: false` inside a 2xx body.
                    None => (
                        StatusCode::BAD_GATEWAY,
                        ErrorBody {
                            message: message.clone(),
                            status: None,
                        },
                    ),
                }
            }
            ProxyError::Catalog(CatalogError::Transport(_) | CatalogError::Shape(_)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody {
                    message: "Internal server error".to_owned(),
                    status: None,
                },
            ),
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let (status, error) = self.to_parts();
        match self.kind() {
            ErrorKind::Validation => log::debug!("rejecting request: {}", &self),
            _ => log::error!("catalog request failed: {}", &self),
        }

        (
            status,
            Json(FailureEnvelope {
                success: false,
                error,
            }),
        )
            .into_response()
    }
}
