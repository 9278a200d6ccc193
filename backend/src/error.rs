use thiserror::Error;

use corelib::assignment::NoTablesAvailable;

use crate::payment::errors::{GatewayError, WebhookError};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("invalid argument: {0}")]
    Validation(String),

    #[error("authentication required")]
    Unauthenticated,

    #[error("not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    NoTablesAvailable(#[from] NoTablesAvailable),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("payment gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("webhook rejected: {0}")]
    WebhookVerification(#[from] WebhookError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("storage error: {0:#}")]
    Storage(#[from] anyhow::Error),
}

impl AppError {
    /// Both flavours of "the tables you wanted are gone".
    pub fn is_conflict(&self) -> bool {
        matches!(self, AppError::Conflict(_) | AppError::NoTablesAvailable(_))
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "invalid_argument",
            AppError::Unauthenticated => "unauthenticated",
            AppError::NotFound(_) => "not_found",
            AppError::NoTablesAvailable(_) => "no_tables_available",
            AppError::Conflict(_) => "conflict",
            AppError::Gateway(_) => "gateway_error",
            AppError::WebhookVerification(_) => "webhook_verification_failed",
            AppError::Config(_) => "config_error",
            AppError::Storage(_) => "internal",
        }
    }
}
