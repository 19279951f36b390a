//! Response envelopes.
//!
//! Request bodies deserialize straight into the domain input types
//! (`NewProduct`, `ReviewPatch`, ...), so only the outgoing shapes live here.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::json;

use craftmart_infra::query::{ListPage, ListQuery};

use crate::app::errors::ApiError;

/// `{success: true, data}`
#[derive(Debug, Serialize)]
pub struct DataEnvelope<T> {
    pub success: bool,
    pub data: T,
}

/// `{success: true, count, data}`
#[derive(Debug, Serialize)]
pub struct CountedEnvelope<T> {
    pub success: bool,
    pub count: usize,
    pub data: Vec<T>,
}

/// `{success: true, count, pagination, data}`
#[derive(Debug, Serialize)]
pub struct PageEnvelope {
    pub success: bool,
    #[serde(flatten)]
    pub page: ListPage,
}

/// `{success: true, token}`
#[derive(Debug, Serialize)]
pub struct TokenEnvelope {
    pub success: bool,
    pub token: String,
}

pub fn ok<T: Serialize>(data: T) -> Response {
    Json(DataEnvelope {
        success: true,
        data,
    })
    .into_response()
}

pub fn created<T: Serialize>(data: T) -> Response {
    (
        StatusCode::CREATED,
        Json(DataEnvelope {
            success: true,
            data,
        }),
    )
        .into_response()
}

/// Body returned after a delete: `{success: true, data: {}}`.
pub fn deleted() -> Response {
    ok(json!({}))
}

pub fn counted<T: Serialize>(data: Vec<T>) -> Response {
    Json(CountedEnvelope {
        success: true,
        count: data.len(),
        data,
    })
    .into_response()
}

pub fn page(page: ListPage) -> Response {
    Json(PageEnvelope {
        success: true,
        page,
    })
    .into_response()
}

pub fn token(token: String) -> Response {
    Json(TokenEnvelope {
        success: true,
        token,
    })
    .into_response()
}

/// Parse list options (`select`, `sort`, `page`, `limit`, filters) from the
/// query string.
pub fn list_query(params: &[(String, String)]) -> Result<ListQuery, ApiError> {
    ListQuery::parse(params.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .map_err(|e| ApiError::Validation(e.to_string()))
}
