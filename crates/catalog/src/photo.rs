//! Product photo rules: what counts as an acceptable upload and where it is
//! stored. The bytes themselves are written by the infrastructure layer.

use std::path::Path;

use thiserror::Error;

use craftmart_core::ProductId;

/// Image reference of a product that has no uploaded photo.
pub const DEFAULT_PHOTO: &str = "no-photo.jpg";

const MAX_EXTENSION_LEN: usize = 10;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PhotoError {
    #[error("Please upload a file")]
    MissingFile,

    #[error("Please upload an image file")]
    NotAnImage,

    #[error("Please upload an image less than {max} bytes")]
    TooLarge { max: usize },
}

/// Check the declared content type and the payload size of an upload.
pub fn validate_photo(content_type: Option<&str>, size: usize, max: usize) -> Result<(), PhotoError> {
    if size == 0 {
        return Err(PhotoError::MissingFile);
    }
    let is_image = content_type
        .map(|ct| ct.trim().to_ascii_lowercase().starts_with("image/"))
        .unwrap_or(false);
    if !is_image {
        return Err(PhotoError::NotAnImage);
    }
    if size > max {
        return Err(PhotoError::TooLarge { max });
    }
    Ok(())
}

/// Deterministic storage name for a product photo: `photo_<id><.ext>`.
///
/// Only a short alphanumeric extension survives from the client-supplied
/// name, so the result never contains path separators.
pub fn photo_file_name(product: ProductId, original_name: Option<&str>) -> String {
    let ext = original_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| {
            !ext.is_empty()
                && ext.len() <= MAX_EXTENSION_LEN
                && ext.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default();

    format!("photo_{product}{ext}")
}
