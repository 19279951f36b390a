use chrono::Utc;

use craftmart_auth::{Action, Identity, Role, authorize, require_role};
use craftmart_catalog::{NewReview, Product, Review, ReviewPatch, average_rating};
use craftmart_core::{DomainError, Entity, ProductId, ReviewId};

use super::{ResourceHandlers, ServiceError, ServiceResult, load, update_existing};
use crate::query::{ListPage, ListQuery};
use crate::store::{
    PRODUCT_NAME_UNIQUE, REVIEW_AUTHOR_FIELD, REVIEW_AUTHOR_UNIQUE, StoreError,
};

const AUTHOR_ROLES: &[Role] = &[Role::Standard, Role::Admin];

impl ResourceHandlers {
    pub fn list_reviews(&self, query: &ListQuery) -> ServiceResult<ListPage> {
        let reviews = self.store.reviews.list()?;
        Ok(query.apply(&reviews)?)
    }

    /// Reviews of one product, oldest first.
    pub fn list_product_reviews(&self, product_id: &str) -> ServiceResult<Vec<Review>> {
        let product = load(&*self.store.products, product_id)?;
        let mut reviews = self.reviews_of(product.id)?;
        reviews.sort_by_key(|r| (r.created_at, r.id));
        Ok(reviews)
    }

    pub fn get_review(&self, id: &str) -> ServiceResult<Review> {
        load(&*self.store.reviews, id)
    }

    /// Add a review to a product. Each user reviews a product at most once.
    pub fn create_review(
        &self,
        caller: Option<&Identity>,
        product_id: &str,
        input: NewReview,
    ) -> ServiceResult<Review> {
        let product = load(&*self.store.products, product_id)?;
        let caller = require_role(caller, AUTHOR_ROLES)?;

        let review = input.into_review(ReviewId::new(), product.id, caller.user_id, Utc::now())?;
        match self.store.reviews.save(review.clone(), REVIEW_AUTHOR_UNIQUE) {
            Err(StoreError::Duplicate {
                field: REVIEW_AUTHOR_FIELD,
            }) => {
                return Err(ServiceError::Validation(
                    "You have already reviewed this product".to_string(),
                ));
            }
            other => other?,
        }
        self.ensure_product_survived(&review)?;

        self.refresh_average_rating(product.id)?;
        tracing::info!(review_id = %review.id, product_id = %product.id, "review created");
        Ok(review)
    }

    pub fn update_review(
        &self,
        caller: Option<&Identity>,
        id: &str,
        patch: ReviewPatch,
    ) -> ServiceResult<Review> {
        let current = load(&*self.store.reviews, id)?;
        authorize(caller, &current, Action::Write).into_result()?;

        let updated = update_existing(
            &*self.store.reviews,
            &current.id,
            REVIEW_AUTHOR_UNIQUE,
            &mut |review: &mut Review| {
                *review = patch.clone().apply(review)?;
                Ok(())
            },
        )?;
        self.ensure_product_survived(&updated)?;
        self.refresh_average_rating(updated.product)?;
        Ok(updated)
    }

    pub fn delete_review(&self, caller: Option<&Identity>, id: &str) -> ServiceResult<()> {
        let review = load(&*self.store.reviews, id)?;
        authorize(caller, &review, Action::Delete).into_result()?;

        self.store.reviews.remove(&review.id)?;
        self.refresh_average_rating(review.product)?;
        tracing::info!(review_id = %review.id, "review deleted");
        Ok(())
    }

    fn reviews_of(&self, product: ProductId) -> ServiceResult<Vec<Review>> {
        Ok(self
            .store
            .reviews
            .list()?
            .into_iter()
            .filter(|r| r.product == product)
            .collect())
    }

    /// A review written while its product was being deleted can outlive the
    /// cascade; remove it again and report the product as missing.
    fn ensure_product_survived(&self, review: &Review) -> ServiceResult<()> {
        if self.store.products.get(&review.product)?.is_some() {
            return Ok(());
        }
        self.store.reviews.remove(&review.id)?;
        Err(DomainError::not_found(Product::KIND, review.product).into())
    }

    /// Recompute `averageRating` from the product's current reviews. A
    /// product that is already gone stays gone.
    pub(super) fn refresh_average_rating(&self, product: ProductId) -> ServiceResult<()> {
        let rating = average_rating(self.reviews_of(product)?.iter().map(|r| r.rating));
        self.store.products.update(
            &product,
            PRODUCT_NAME_UNIQUE,
            &mut |current: &mut Product| {
                current.average_rating = rating;
                Ok(())
            },
        )?;
        Ok(())
    }
}
