//! Resource store: one repository per entity type.

pub mod repository;

use std::sync::Arc;

use craftmart_auth::User;
use craftmart_catalog::{Product, Review};

pub use repository::{
    Change, InMemoryRepository, Repository, StoreError, StoreResult, UniqueField,
};

pub const PRODUCT_NAME_UNIQUE: &[UniqueField<Product>] = &[UniqueField {
    name: "name",
    key: |p| p.name.clone(),
}];

/// Name of the one-review-per-user-and-product key.
pub const REVIEW_AUTHOR_FIELD: &str = "product+user";

pub const REVIEW_AUTHOR_UNIQUE: &[UniqueField<Review>] = &[UniqueField {
    name: REVIEW_AUTHOR_FIELD,
    key: |r| format!("{}:{}", r.product, r.user),
}];

pub const USER_EMAIL_UNIQUE: &[UniqueField<User>] = &[UniqueField {
    name: "email",
    key: |u| u.email.to_lowercase(),
}];

/// Handles to every repository, constructed once at startup and passed in.
#[derive(Clone)]
pub struct Store {
    pub products: Arc<dyn Repository<Product>>,
    pub reviews: Arc<dyn Repository<Review>>,
    pub users: Arc<dyn Repository<User>>,
}

impl Store {
    pub fn in_memory() -> Self {
        Self {
            products: Arc::new(InMemoryRepository::<Product>::new()),
            reviews: Arc::new(InMemoryRepository::<Review>::new()),
            users: Arc::new(InMemoryRepository::<User>::new()),
        }
    }
}
