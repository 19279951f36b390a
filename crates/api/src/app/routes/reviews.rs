use std::sync::Arc;

use axum::{
    Router,
    extract::{Extension, Path, Query},
    response::Response,
    routing::get,
};

use craftmart_catalog::{NewReview, ReviewPatch};

use crate::app::services::AppServices;
use crate::app::{dto, errors::ApiError};
use crate::context::CallerContext;
use crate::sanitize::SanitizedJson;

pub fn router() -> Router {
    Router::new().route("/", get(list_reviews)).route(
        "/:id",
        get(get_review).put(update_review).delete(delete_review),
    )
}

pub async fn list_reviews(
    Extension(services): Extension<Arc<AppServices>>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Response, ApiError> {
    let query = dto::list_query(&params)?;
    Ok(dto::page(services.resources.list_reviews(&query)?))
}

/// `GET /products/:id/reviews`
pub async fn list_for_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(product_id): Path<String>,
) -> Result<Response, ApiError> {
    Ok(dto::counted(services.resources.list_product_reviews(&product_id)?))
}

/// `POST /products/:id/reviews`
pub async fn create_for_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Path(product_id): Path<String>,
    SanitizedJson(body): SanitizedJson<NewReview>,
) -> Result<Response, ApiError> {
    let review = services
        .resources
        .create_review(caller.identity(), &product_id, body)?;
    Ok(dto::created(review))
}

pub async fn get_review(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    Ok(dto::ok(services.resources.get_review(&id)?))
}

pub async fn update_review(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<String>,
    SanitizedJson(body): SanitizedJson<ReviewPatch>,
) -> Result<Response, ApiError> {
    let review = services
        .resources
        .update_review(caller.identity(), &id, body)?;
    Ok(dto::ok(review))
}

pub async fn delete_review(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    services.resources.delete_review(caller.identity(), &id)?;
    Ok(dto::deleted())
}
