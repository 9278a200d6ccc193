use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::error::AppError;
use crate::payment::errors::WebhookError;

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::NoTablesAvailable(_) | AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Gateway(_) => StatusCode::BAD_GATEWAY,
            AppError::WebhookVerification(WebhookError::MissingSecret) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::WebhookVerification(_) => StatusCode::BAD_REQUEST,
            AppError::Config(_) | AppError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Internal detail stays in the logs.
        let message = if status.is_server_error() {
            tracing::error!(target: "api", error = %self, "request failed");
            "internal error".to_string()
        } else {
            tracing::debug!(target: "api", error = %self, "request rejected");
            self.to_string()
        };

        let body = Json(json!({
            "error": self.code(),
            "message": message,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corelib::assignment::NoTablesAvailable;

    use crate::payment::errors::GatewayError;

    #[test]
    fn statuses_follow_taxonomy() {
        assert_eq!(AppError::Validation("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::Unauthenticated.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::from(NoTablesAvailable { party_size: 9 }).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::Gateway(GatewayError::Timeout(10)).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AppError::WebhookVerification(WebhookError::SignatureMismatch).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::WebhookVerification(WebhookError::MissingSecret).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::Storage(anyhow::anyhow!("disk")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
