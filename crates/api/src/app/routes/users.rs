//! User administration (admin role only).

use std::sync::Arc;

use axum::{
    Router,
    extract::{Extension, Path, Query},
    response::Response,
    routing::get,
};

use craftmart_auth::{NewUser, UserPatch};

use crate::app::services::AppServices;
use crate::app::{dto, errors::ApiError};
use crate::context::CallerContext;
use crate::sanitize::SanitizedJson;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/:id", get(get_user).put(update_user).delete(delete_user))
}

pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Response, ApiError> {
    let query = dto::list_query(&params)?;
    Ok(dto::page(services.resources.list_users(caller.identity(), &query)?))
}

pub async fn get_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    Ok(dto::ok(services.resources.get_user(caller.identity(), &id)?))
}

pub async fn create_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    SanitizedJson(body): SanitizedJson<NewUser>,
) -> Result<Response, ApiError> {
    let user = services.resources.create_user(caller.identity(), body).await?;
    Ok(dto::created(user))
}

pub async fn update_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<String>,
    SanitizedJson(body): SanitizedJson<UserPatch>,
) -> Result<Response, ApiError> {
    let user = services
        .resources
        .update_user(caller.identity(), &id, body)
        .await?;
    Ok(dto::ok(user))
}

pub async fn delete_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    services.resources.delete_user(caller.identity(), &id)?;
    Ok(dto::deleted())
}
