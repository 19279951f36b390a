use std::sync::Arc;

use axum::{
    Router,
    extract::Extension,
    response::Response,
    routing::{get, post},
};

use craftmart_auth::{Credentials, NewUser};

use crate::app::services::AppServices;
use crate::app::{dto, errors::ApiError};
use crate::context::CallerContext;
use crate::sanitize::SanitizedJson;

pub fn router() -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/me", get(me))
}

pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    SanitizedJson(body): SanitizedJson<NewUser>,
) -> Result<Response, ApiError> {
    let (_, token) = services.resources.register(body).await?;
    Ok(dto::token(token))
}

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    SanitizedJson(body): SanitizedJson<Credentials>,
) -> Result<Response, ApiError> {
    Ok(dto::token(services.resources.login(body).await?))
}

pub async fn me(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
) -> Result<Response, ApiError> {
    Ok(dto::ok(services.resources.me(caller.identity())?))
}
