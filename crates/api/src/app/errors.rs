use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use craftmart_auth::AuthzError;
use craftmart_infra::handlers::ServiceError;

/// Failure returned by any route, rendered as `{success: false, msg}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthenticated(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Too many requests, please try again later")]
    RateLimited,

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn unauthenticated() -> Self {
        ApiError::Unauthenticated(AuthzError::Unauthenticated.to_string())
    }
}

impl From<AuthzError> for ApiError {
    fn from(value: AuthzError) -> Self {
        match value {
            AuthzError::Unauthenticated => ApiError::Unauthenticated(value.to_string()),
            AuthzError::Forbidden { .. } | AuthzError::RoleNotPermitted { .. } => {
                ApiError::Forbidden(value.to_string())
            }
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(value: ServiceError) -> Self {
        match value {
            ServiceError::Validation(msg) => ApiError::Validation(msg),
            ServiceError::Authz(e) => e.into(),
            ServiceError::InvalidToken(ref reason) => {
                tracing::debug!("rejected bearer token: {reason}");
                ApiError::Unauthenticated(value.to_string())
            }
            ServiceError::InvalidCredentials => ApiError::Unauthenticated(value.to_string()),
            ServiceError::NotFound(msg) => ApiError::NotFound(msg),
            ServiceError::Upstream(msg) => ApiError::Internal(msg),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let msg = match &self {
            ApiError::Internal(detail) => {
                tracing::error!("request failed: {detail}");
                "Server Error".to_string()
            }
            other => other.to_string(),
        };
        json_error(status, msg)
    }
}

pub fn json_error(status: StatusCode, msg: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "success": false,
            "msg": msg.into(),
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use craftmart_core::UserId;

    #[test]
    fn policy_denials_map_to_401_and_403() {
        assert_eq!(
            ApiError::from(AuthzError::Unauthenticated).status(),
            StatusCode::UNAUTHORIZED
        );
        let forbidden = AuthzError::Forbidden {
            caller: UserId::new(),
            action: craftmart_auth::Action::Write,
            kind: "product",
            resource_id: "p1".to_string(),
        };
        assert_eq!(ApiError::from(forbidden).status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn service_errors_keep_their_message() {
        let err = ApiError::from(ServiceError::NotFound("no product with id x".to_string()));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "no product with id x");

        let err = ApiError::from(ServiceError::InvalidToken("expired".to_string()));
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }
}
