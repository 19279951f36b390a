//! Catalog domain: products, reviews and product photos.
//!
//! This crate contains the business rules for the catalog (field validation,
//! slugs, rating aggregation, ownership metadata) implemented purely as
//! deterministic domain logic (no IO, no HTTP, no storage).

pub mod photo;
pub mod product;
pub mod rating;
pub mod review;
pub mod slug;

pub use photo::{DEFAULT_PHOTO, PhotoError, photo_file_name, validate_photo};
pub use product::{Category, NewProduct, OneOrMany, Product, ProductPatch};
pub use rating::average_rating;
pub use review::{NewReview, Review, ReviewPatch};
pub use slug::slugify;
