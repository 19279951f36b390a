use chrono::Utc;

use craftmart_auth::{Action, Identity, Role, authorize, require_role};
use craftmart_catalog::{NewProduct, Product, ProductPatch, Review, photo_file_name, validate_photo};
use craftmart_core::ProductId;

use super::{ResourceHandlers, ServiceResult, load, update_existing};
use crate::query::{ListPage, ListQuery};
use crate::store::PRODUCT_NAME_UNIQUE;

const CREATOR_ROLES: &[Role] = &[Role::Owner, Role::Admin];

/// A photo received from a client, before validation.
#[derive(Debug, Clone, Default)]
pub struct PhotoUpload {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl ResourceHandlers {
    pub fn list_products(&self, query: &ListQuery) -> ServiceResult<ListPage> {
        let products = self.store.products.list()?;
        Ok(query.apply(&products)?)
    }

    pub fn get_product(&self, id: &str) -> ServiceResult<Product> {
        load(&*self.store.products, id)
    }

    pub fn create_product(
        &self,
        caller: Option<&Identity>,
        input: NewProduct,
    ) -> ServiceResult<Product> {
        let caller = require_role(caller, CREATOR_ROLES)?;
        let product = input.into_product(ProductId::new(), caller.user_id, Utc::now())?;
        self.store.products.save(product.clone(), PRODUCT_NAME_UNIQUE)?;

        tracing::info!(product_id = %product.id, owner = %caller.user_id, "product created");
        Ok(product)
    }

    pub fn update_product(
        &self,
        caller: Option<&Identity>,
        id: &str,
        patch: ProductPatch,
    ) -> ServiceResult<Product> {
        let current = load(&*self.store.products, id)?;
        authorize(caller, &current, Action::Write).into_result()?;

        update_existing(
            &*self.store.products,
            &current.id,
            PRODUCT_NAME_UNIQUE,
            &mut |product: &mut Product| {
                *product = patch.clone().apply(product)?;
                Ok(())
            },
        )
    }

    /// Delete a product together with every review that references it.
    pub fn delete_product(&self, caller: Option<&Identity>, id: &str) -> ServiceResult<()> {
        let product = load(&*self.store.products, id)?;
        authorize(caller, &product, Action::Delete).into_result()?;

        self.store.products.remove(&product.id)?;
        let reviews = self
            .store
            .reviews
            .remove_where(&|review: &Review| review.product == product.id)?;

        tracing::info!(product_id = %product.id, reviews, "product deleted");
        Ok(())
    }

    pub async fn upload_product_photo(
        &self,
        caller: Option<&Identity>,
        id: &str,
        upload: PhotoUpload,
    ) -> ServiceResult<Product> {
        let product = load(&*self.store.products, id)?;
        authorize(caller, &product, Action::Write).into_result()?;

        validate_photo(
            upload.content_type.as_deref(),
            upload.bytes.len(),
            self.max_upload_bytes,
        )?;

        let file_name = photo_file_name(product.id, upload.file_name.as_deref());
        self.photos.store(&file_name, &upload.bytes).await?;

        let latest = update_existing(
            &*self.store.products,
            &product.id,
            PRODUCT_NAME_UNIQUE,
            &mut |current: &mut Product| {
                current.images = file_name.clone();
                Ok(())
            },
        )?;

        tracing::info!(product_id = %latest.id, file = %latest.images, "product photo uploaded");
        Ok(latest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::handlers::ServiceError;
    use crate::handlers::test_support::{HookedRepository, handlers, handlers_with};
    use crate::store::Store;
    use craftmart_auth::AuthzError;
    use craftmart_catalog::{DEFAULT_PHOTO, NewReview, OneOrMany};
    use craftmart_core::UserId;

    fn vase(name: &str) -> NewProduct {
        NewProduct {
            name: name.to_string(),
            description: "Hand-thrown".to_string(),
            category: Some(OneOrMany::Many(vec!["Statue".to_string()])),
            cost: Some(10.0),
            available: None,
        }
    }

    fn owner() -> Identity {
        Identity::new(UserId::new(), Role::Owner)
    }

    fn png(bytes: usize) -> PhotoUpload {
        PhotoUpload {
            file_name: Some("vase.png".to_string()),
            content_type: Some("image/png".to_string()),
            bytes: vec![7; bytes],
        }
    }

    #[test]
    fn create_sets_caller_as_owner() {
        let (h, _) = handlers();
        let x = owner();
        let product = h.create_product(Some(&x), vase("Vase")).unwrap();
        assert_eq!(product.user, x.user_id);
        assert_eq!(h.get_product(&product.id.to_string()).unwrap(), product);
    }

    #[test]
    fn create_requires_owner_or_admin_role() {
        let (h, _) = handlers();
        assert!(matches!(
            h.create_product(None, vase("Vase")),
            Err(ServiceError::Authz(AuthzError::Unauthenticated))
        ));
        let standard = Identity::new(UserId::new(), Role::Standard);
        assert!(matches!(
            h.create_product(Some(&standard), vase("Vase")),
            Err(ServiceError::Authz(AuthzError::RoleNotPermitted { .. }))
        ));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let (h, _) = handlers();
        let x = owner();
        h.create_product(Some(&x), vase("Vase")).unwrap();
        assert!(matches!(
            h.create_product(Some(&x), vase("Vase")),
            Err(ServiceError::Validation(_))
        ));
    }

    #[test]
    fn only_owner_or_admin_may_update() {
        let (h, _) = handlers();
        let x = owner();
        let product = h.create_product(Some(&x), vase("Vase")).unwrap();
        let id = product.id.to_string();

        let y = owner();
        let patch = ProductPatch {
            cost: Some(12.0),
            ..ProductPatch::default()
        };
        assert!(matches!(
            h.update_product(Some(&y), &id, patch.clone()),
            Err(ServiceError::Authz(AuthzError::Forbidden { .. }))
        ));

        let admin = Identity::new(UserId::new(), Role::Admin);
        let updated = h.update_product(Some(&admin), &id, patch).unwrap();
        assert_eq!(updated.cost, Some(12.0));
        assert_eq!(updated.user, x.user_id);
    }

    #[test]
    fn missing_product_is_reported_before_authorization() {
        let (h, _) = handlers();
        let missing = ProductId::new().to_string();
        assert!(matches!(
            h.delete_product(None, &missing),
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            h.get_product("not-an-id"),
            Err(ServiceError::NotFound(msg)) if msg == "no product with id not-an-id"
        ));
    }

    #[test]
    fn delete_cascades_to_reviews() {
        let (h, _) = handlers();
        let x = owner();
        let product = h.create_product(Some(&x), vase("Vase")).unwrap();
        let id = product.id.to_string();

        let reader = Identity::new(UserId::new(), Role::Standard);
        let review = NewReview {
            title: "Nice".to_string(),
            text: "Good".to_string(),
            rating: Some(4.0),
        };
        h.create_review(Some(&reader), &id, review).unwrap();

        h.delete_product(Some(&x), &id).unwrap();
        assert!(h.store().reviews.list().unwrap().is_empty());
        assert!(h.get_product(&id).is_err());
    }

    #[tokio::test]
    async fn photo_upload_stores_file_and_updates_images() {
        let (h, photos) = handlers();
        let x = owner();
        let product = h.create_product(Some(&x), vase("Vase")).unwrap();
        assert_eq!(product.images, DEFAULT_PHOTO);

        let updated = h
            .upload_product_photo(Some(&x), &product.id.to_string(), png(10))
            .await
            .unwrap();
        assert_eq!(updated.images, format!("photo_{}.png", product.id));
        assert_eq!(photos.files.lock().unwrap()[0].0, updated.images);
    }

    #[tokio::test]
    async fn photo_upload_rejects_bad_files_and_strangers() {
        let (h, photos) = handlers();
        let x = owner();
        let product = h.create_product(Some(&x), vase("Vase")).unwrap();
        let id = product.id.to_string();

        let too_big = h.upload_product_photo(Some(&x), &id, png(1_001)).await;
        assert!(matches!(too_big, Err(ServiceError::Validation(_))));

        let text = PhotoUpload {
            content_type: Some("text/plain".to_string()),
            ..png(10)
        };
        let wrong_type = h.upload_product_photo(Some(&x), &id, text).await;
        assert!(matches!(wrong_type, Err(ServiceError::Validation(_))));

        let stranger = h.upload_product_photo(Some(&owner()), &id, png(10)).await;
        assert!(matches!(stranger, Err(ServiceError::Authz(_))));

        assert!(photos.files.lock().unwrap().is_empty());
        assert_eq!(h.get_product(&id).unwrap().images, DEFAULT_PHOTO);
    }

    fn with_hooked_products() -> (ResourceHandlers, Arc<HookedRepository<Product>>) {
        let products = Arc::new(HookedRepository::new());
        let store = Store {
            products: products.clone(),
            ..Store::in_memory()
        };
        let (h, _) = handlers_with(store);
        (h, products)
    }

    #[test]
    fn update_does_not_bring_back_a_product_deleted_mid_request() {
        let (h, products) = with_hooked_products();
        let x = owner();
        let id = h.create_product(Some(&x), vase("Vase")).unwrap().id.to_string();

        let deleter = h.clone();
        let target = id.clone();
        products.after_next_get(move || deleter.delete_product(Some(&x), &target).unwrap());

        let patch = ProductPatch {
            cost: Some(12.0),
            ..ProductPatch::default()
        };
        assert!(matches!(
            h.update_product(Some(&x), &id, patch),
            Err(ServiceError::NotFound(_))
        ));
        assert!(h.store().products.list().unwrap().is_empty());
    }

    #[test]
    fn update_keeps_name_unique() {
        let (h, _) = handlers();
        let x = owner();
        h.create_product(Some(&x), vase("Vase")).unwrap();
        let bowl = h.create_product(Some(&x), vase("Bowl")).unwrap();

        let rename = ProductPatch {
            name: Some("Vase".to_string()),
            ..ProductPatch::default()
        };
        assert!(matches!(
            h.update_product(Some(&x), &bowl.id.to_string(), rename),
            Err(ServiceError::Validation(msg)) if msg == "duplicate field value entered: name"
        ));
        assert_eq!(h.get_product(&bowl.id.to_string()).unwrap().name, "Bowl");
    }

    #[tokio::test]
    async fn photo_for_a_product_deleted_mid_upload_is_not_found() {
        let (h, products) = with_hooked_products();
        let x = owner();
        let id = h.create_product(Some(&x), vase("Vase")).unwrap().id.to_string();

        let deleter = h.clone();
        let target = id.clone();
        products.after_next_get(move || deleter.delete_product(Some(&x), &target).unwrap());

        let result = h.upload_product_photo(Some(&x), &id, png(10)).await;
        assert!(matches!(result, Err(ServiceError::NotFound(_))));
        assert!(h.store().products.list().unwrap().is_empty());
    }
}
