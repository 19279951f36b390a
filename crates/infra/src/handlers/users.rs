use std::collections::HashSet;

use chrono::Utc;

use craftmart_auth::{Identity, NewUser, Role, User, UserPatch, require_role};
use craftmart_catalog::Review;
use craftmart_core::{ProductId, UserId};

use super::{ResourceHandlers, ServiceResult, load, update_existing};
use crate::query::{ListPage, ListQuery};
use crate::store::USER_EMAIL_UNIQUE;

const ADMIN_ONLY: &[Role] = &[Role::Admin];

/// User administration. Every operation requires the admin role.
impl ResourceHandlers {
    pub fn list_users(&self, caller: Option<&Identity>, query: &ListQuery) -> ServiceResult<ListPage> {
        require_role(caller, ADMIN_ONLY)?;
        let users = self.store.users.list()?;
        Ok(query.apply(&users)?)
    }

    pub fn get_user(&self, caller: Option<&Identity>, id: &str) -> ServiceResult<User> {
        require_role(caller, ADMIN_ONLY)?;
        load(&*self.store.users, id)
    }

    pub async fn create_user(&self, caller: Option<&Identity>, input: NewUser) -> ServiceResult<User> {
        require_role(caller, ADMIN_ONLY)?;
        input.validate()?;
        let hash = super::accounts::hash(input.password.clone()).await?;
        let user = input.into_user(UserId::new(), hash, Utc::now());
        self.store.users.save(user.clone(), USER_EMAIL_UNIQUE)?;

        tracing::info!(user_id = %user.id, role = %user.role, "user created by admin");
        Ok(user)
    }

    pub async fn update_user(
        &self,
        caller: Option<&Identity>,
        id: &str,
        patch: UserPatch,
    ) -> ServiceResult<User> {
        require_role(caller, ADMIN_ONLY)?;
        let user = load(&*self.store.users, id)?;
        patch.validate()?;

        let password_hash = match &patch.password {
            Some(password) => Some(super::accounts::hash(password.clone()).await?),
            None => None,
        };
        update_existing(
            &*self.store.users,
            &user.id,
            USER_EMAIL_UNIQUE,
            &mut |stored: &mut User| {
                patch.apply_to(stored);
                if let Some(hash) = &password_hash {
                    stored.password_hash = hash.clone();
                }
                Ok(())
            },
        )
    }

    /// Delete an account along with the products it owns (and their
    /// reviews) and the reviews it wrote.
    pub fn delete_user(&self, caller: Option<&Identity>, id: &str) -> ServiceResult<()> {
        require_role(caller, ADMIN_ONLY)?;
        let user = load(&*self.store.users, id)?;
        self.store.users.remove(&user.id)?;

        let owned: HashSet<ProductId> = self
            .store
            .products
            .list()?
            .into_iter()
            .filter(|p| p.user == user.id)
            .map(|p| p.id)
            .collect();
        for product in &owned {
            self.store.products.remove(product)?;
        }

        let reviewed: HashSet<ProductId> = self
            .store
            .reviews
            .list()?
            .into_iter()
            .filter(|r| r.user == user.id && !owned.contains(&r.product))
            .map(|r| r.product)
            .collect();
        let reviews = self.store.reviews.remove_where(&|review: &Review| {
            owned.contains(&review.product) || review.user == user.id
        })?;
        for product in &reviewed {
            self.refresh_average_rating(*product)?;
        }

        tracing::info!(
            user_id = %user.id,
            products = owned.len(),
            reviews,
            "user deleted"
        );
        Ok(())
    }
}
