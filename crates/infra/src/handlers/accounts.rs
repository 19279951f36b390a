//! Registration, login, and bearer-token resolution.

use chrono::Utc;

use craftmart_auth::{
    Credentials, Identity, JwtIssuer, JwtValidator, NewUser, Role, User, hash_password,
    verify_password,
};
use craftmart_core::UserId;

use super::{ResourceHandlers, ServiceError, ServiceResult};
use crate::config::AdminSeed;
use crate::store::USER_EMAIL_UNIQUE;

/// Password hashing runs on the blocking pool.
pub(super) async fn hash(password: String) -> ServiceResult<String> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| ServiceError::Upstream(e.to_string()))?
        .map_err(ServiceError::from)
}

async fn verify(password: String, hash: String) -> ServiceResult<bool> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| ServiceError::Upstream(e.to_string()))?
        .map_err(ServiceError::from)
}

impl ResourceHandlers {
    /// Create an account and return it with a fresh session token.
    pub async fn register(&self, input: NewUser) -> ServiceResult<(User, String)> {
        input.validate_registration()?;
        let password_hash = hash(input.password.clone()).await?;
        let user = input.into_user(UserId::new(), password_hash, Utc::now());
        self.store.users.save(user.clone(), USER_EMAIL_UNIQUE)?;

        let token = self.tokens.issue(user.id, Utc::now())?;
        tracing::info!(user_id = %user.id, role = %user.role, "user registered");
        Ok((user, token))
    }

    pub async fn login(&self, credentials: Credentials) -> ServiceResult<String> {
        credentials.validate()?;

        let user = self
            .find_user_by_email(&credentials.normalized_email())?
            .ok_or(ServiceError::InvalidCredentials)?;
        if !verify(credentials.password, user.password_hash.clone()).await? {
            tracing::warn!(user_id = %user.id, "login rejected: wrong password");
            return Err(ServiceError::InvalidCredentials);
        }

        Ok(self.tokens.issue(user.id, Utc::now())?)
    }

    /// The stored account of the caller.
    pub fn me(&self, caller: Option<&Identity>) -> ServiceResult<User> {
        let caller = caller.ok_or(craftmart_auth::AuthzError::Unauthenticated)?;
        self.store
            .users
            .get(&caller.user_id)?
            .ok_or_else(|| ServiceError::InvalidToken("account no longer exists".to_string()))
    }

    /// Verify a bearer token and look up the caller's current role.
    pub fn resolve_identity(&self, token: &str) -> ServiceResult<Identity> {
        let claims = self.tokens.validate(token, Utc::now())?;
        let user = self
            .store
            .users
            .get(&claims.sub)?
            .ok_or_else(|| ServiceError::InvalidToken("account no longer exists".to_string()))?;
        Ok(user.identity())
    }

    /// Make sure the configured administrator exists. An existing account
    /// with the same email is left untouched.
    pub async fn seed_admin(&self, seed: &AdminSeed) -> ServiceResult<()> {
        let input = NewUser {
            name: seed.name.clone(),
            email: seed.email.clone(),
            password: seed.password.expose().to_string(),
            role: Some(Role::Admin),
        };
        input.validate()?;

        if self.find_user_by_email(&craftmart_auth::user::normalize_email(&seed.email))?.is_some() {
            tracing::debug!("bootstrap admin already present");
            return Ok(());
        }

        let password_hash = hash(input.password.clone()).await?;
        let user = input.into_user(UserId::new(), password_hash, Utc::now());
        self.store.users.save(user.clone(), USER_EMAIL_UNIQUE)?;
        tracing::info!(user_id = %user.id, "bootstrap admin created");
        Ok(())
    }

    fn find_user_by_email(&self, email: &str) -> ServiceResult<Option<User>> {
        Ok(self
            .store
            .users
            .list()?
            .into_iter()
            .find(|u| u.email == email))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Secret;
    use crate::handlers::test_support::handlers;

    fn signup(email: &str) -> NewUser {
        NewUser {
            name: "Sam".to_string(),
            email: email.to_string(),
            password: "letmein".to_string(),
            role: None,
        }
    }

    #[tokio::test]
    async fn register_then_login_resolves_same_identity() {
        let (h, _) = handlers();
        let (user, token) = h.register(signup("sam@example.com")).await.unwrap();
        assert_eq!(user.role, Role::Standard);
        assert_eq!(h.resolve_identity(&token).unwrap(), user.identity());

        let token = h
            .login(Credentials {
                email: " SAM@example.com".to_string(),
                password: "letmein".to_string(),
            })
            .await
            .unwrap();
        let identity = h.resolve_identity(&token).unwrap();
        assert_eq!(h.me(Some(&identity)).unwrap().email, "sam@example.com");
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_look_the_same() {
        let (h, _) = handlers();
        h.register(signup("sam@example.com")).await.unwrap();

        for (email, password) in [("sam@example.com", "nope!!"), ("who@example.com", "letmein")] {
            let result = h
                .login(Credentials {
                    email: email.to_string(),
                    password: password.to_string(),
                })
                .await;
            assert!(matches!(result, Err(ServiceError::InvalidCredentials)));
        }
    }

    #[tokio::test]
    async fn role_changes_apply_to_existing_tokens() {
        let (h, _) = handlers();
        let (user, token) = h.register(signup("sam@example.com")).await.unwrap();

        let mut stored = h.store().users.get(&user.id).unwrap().unwrap();
        stored.role = Role::Owner;
        h.store().users.save(stored, USER_EMAIL_UNIQUE).unwrap();

        assert_eq!(h.resolve_identity(&token).unwrap().role, Role::Owner);
    }

    #[tokio::test]
    async fn garbage_tokens_and_deleted_accounts_are_rejected() {
        let (h, _) = handlers();
        assert!(matches!(
            h.resolve_identity("not.a.jwt"),
            Err(ServiceError::InvalidToken(_))
        ));

        let (user, token) = h.register(signup("sam@example.com")).await.unwrap();
        h.store().users.remove(&user.id).unwrap();
        assert!(matches!(
            h.resolve_identity(&token),
            Err(ServiceError::InvalidToken(_))
        ));
    }

    #[tokio::test]
    async fn self_registration_cannot_create_admins() {
        let (h, _) = handlers();
        let input = NewUser {
            role: Some(Role::Admin),
            ..signup("sam@example.com")
        };
        assert!(matches!(h.register(input).await, Err(ServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn seeding_the_admin_is_idempotent() {
        let (h, _) = handlers();
        let seed = AdminSeed {
            name: "Root".to_string(),
            email: "root@example.com".to_string(),
            password: Secret::new("rootpass"),
        };
        h.seed_admin(&seed).await.unwrap();
        h.seed_admin(&seed).await.unwrap();

        let users = h.store().users.list().unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].role, Role::Admin);
    }
}
