use std::sync::Arc;

use axum::{
    Router,
    extract::{DefaultBodyLimit, Extension, Multipart, Path, Query, multipart::MultipartRejection},
    response::Response,
    routing::{get, put},
};

use craftmart_catalog::{NewProduct, PhotoError, ProductPatch};
use craftmart_infra::handlers::PhotoUpload;

use crate::app::routes::reviews;
use crate::app::services::AppServices;
use crate::app::{dto, errors::ApiError};
use crate::context::CallerContext;
use crate::sanitize::SanitizedJson;

pub fn router(photo_body_limit: usize) -> Router {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route(
            "/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route(
            "/:id/photo",
            put(upload_photo).layer(DefaultBodyLimit::max(photo_body_limit)),
        )
        .route(
            "/:id/reviews",
            get(reviews::list_for_product).post(reviews::create_for_product),
        )
}

pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Response, ApiError> {
    let query = dto::list_query(&params)?;
    Ok(dto::page(services.resources.list_products(&query)?))
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    Ok(dto::ok(services.resources.get_product(&id)?))
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    SanitizedJson(body): SanitizedJson<NewProduct>,
) -> Result<Response, ApiError> {
    let product = services.resources.create_product(caller.identity(), body)?;
    Ok(dto::created(product))
}

pub async fn update_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<String>,
    SanitizedJson(body): SanitizedJson<ProductPatch>,
) -> Result<Response, ApiError> {
    let product = services
        .resources
        .update_product(caller.identity(), &id, body)?;
    Ok(dto::ok(product))
}

pub async fn delete_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    services.resources.delete_product(caller.identity(), &id)?;
    Ok(dto::deleted())
}

/// `PUT /products/:id/photo` with the image in the multipart field `file`.
pub async fn upload_photo(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    let missing_file = || ApiError::Validation(PhotoError::MissingFile.to_string());
    let mut multipart = multipart.map_err(|_| missing_file())?;

    let mut upload = None;
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        tracing::debug!(error = %e, "failed to read multipart field");
        too_large_or(e.status(), services.resources.max_upload_bytes())
    })? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| too_large_or(e.status(), services.resources.max_upload_bytes()))?;

        upload = Some(PhotoUpload {
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        });
        break;
    }

    let upload = upload.ok_or_else(missing_file)?;
    let product = services
        .resources
        .upload_product_photo(caller.identity(), &id, upload)
        .await?;
    Ok(dto::ok(product))
}

/// Multipart read failures are client errors; a body over the limit is
/// reported the same way as an oversized photo.
fn too_large_or(status: axum::http::StatusCode, max: usize) -> ApiError {
    if status == axum::http::StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::Validation(PhotoError::TooLarge { max }.to_string())
    } else {
        ApiError::Validation("Problem reading the uploaded file".to_string())
    }
}
