//! Resource services: validate input, consult the authorization policy, and
//! read or write the store.
//!
//! HTTP concerns (status codes, envelopes, extraction) stay in the api crate;
//! everything here is plain async/sync Rust over [`Store`] and
//! [`PhotoStorage`].

mod accounts;
mod products;
mod reviews;
mod users;

use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;

use craftmart_auth::{AuthzError, Hs256Jwt, PasswordError, TokenError};
use craftmart_catalog::PhotoError;
use craftmart_core::{DomainError, Entity};

use crate::store::{Change, Repository, Store, StoreError, UniqueField};
use crate::uploads::{PhotoStorage, StorageError};

pub use products::PhotoUpload;

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Rejected input (400).
    #[error("{0}")]
    Validation(String),

    /// Missing or insufficient credentials (401 / 403).
    #[error(transparent)]
    Authz(#[from] AuthzError),

    /// Bearer token could not be verified (401).
    #[error("not authorized to access this route")]
    InvalidToken(String),

    /// Login with an unknown email or a wrong password (401).
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("{0}")]
    NotFound(String),

    /// Storage, hashing or signing failed (500).
    #[error("{0}")]
    Upstream(String),
}

impl From<DomainError> for ServiceError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::NotFound(msg) => ServiceError::NotFound(msg),
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => {
                ServiceError::Validation(msg)
            }
            DomainError::Conflict(_) => ServiceError::Validation(value.to_string()),
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Duplicate { field } => DomainError::conflict(field).into(),
            StoreError::Rejected(e) => e.into(),
            StoreError::Unavailable(msg) => ServiceError::Upstream(msg),
        }
    }
}

impl From<PhotoError> for ServiceError {
    fn from(value: PhotoError) -> Self {
        ServiceError::Validation(value.to_string())
    }
}

impl From<StorageError> for ServiceError {
    fn from(value: StorageError) -> Self {
        tracing::error!("photo storage failed: {value}");
        ServiceError::Upstream("Problem with file upload".to_string())
    }
}

impl From<PasswordError> for ServiceError {
    fn from(value: PasswordError) -> Self {
        ServiceError::Upstream(value.to_string())
    }
}

impl From<TokenError> for ServiceError {
    fn from(value: TokenError) -> Self {
        match value {
            TokenError::Signing(msg) => ServiceError::Upstream(msg),
            other => ServiceError::InvalidToken(other.to_string()),
        }
    }
}

/// Shared entry point for every resource operation.
#[derive(Clone)]
pub struct ResourceHandlers {
    store: Store,
    photos: Arc<dyn PhotoStorage>,
    max_upload_bytes: usize,
    tokens: Arc<Hs256Jwt>,
}

impl ResourceHandlers {
    pub fn new(
        store: Store,
        photos: Arc<dyn PhotoStorage>,
        max_upload_bytes: usize,
        tokens: Arc<Hs256Jwt>,
    ) -> Self {
        Self {
            store,
            photos,
            max_upload_bytes,
            tokens,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }
}

/// Parse a path id and load the record. A malformed id is reported the same
/// way as a missing record.
fn load<V>(repo: &dyn Repository<V>, raw_id: &str) -> ServiceResult<V>
where
    V: Entity,
    V::Id: FromStr,
{
    let not_found = || ServiceError::from(DomainError::not_found(V::KIND, raw_id));
    let id = raw_id.parse::<V::Id>().map_err(|_| not_found())?;
    repo.get(&id)?.ok_or_else(not_found)
}

/// Apply `change` to the stored record, failing with NotFound when it was
/// removed after it was first loaded.
fn update_existing<V: Entity>(
    repo: &dyn Repository<V>,
    id: &V::Id,
    unique: &[UniqueField<V>],
    change: Change<'_, V>,
) -> ServiceResult<V>
where
    V::Id: core::fmt::Display,
{
    repo.update(id, unique, change)?
        .ok_or_else(|| ServiceError::from(DomainError::not_found(V::KIND, id)))
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::path::Path;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::store::{InMemoryRepository, StoreResult};

    /// Keeps uploaded photos in memory.
    #[derive(Default)]
    pub struct MemoryPhotos {
        pub files: Mutex<Vec<(String, Vec<u8>)>>,
    }

    #[async_trait]
    impl PhotoStorage for MemoryPhotos {
        async fn store(&self, file_name: &str, bytes: &[u8]) -> Result<(), StorageError> {
            self.files
                .lock()
                .unwrap()
                .push((file_name.to_string(), bytes.to_vec()));
            Ok(())
        }

        fn root(&self) -> &Path {
            Path::new("/memory")
        }
    }

    type Hook = Box<dyn FnOnce() + Send>;

    /// In-memory repository that runs a one-shot hook right after the next
    /// `get`, standing in for a request that lands between a handler's read
    /// and its write.
    pub struct HookedRepository<V: Entity> {
        inner: InMemoryRepository<V>,
        after_get: Mutex<Option<Hook>>,
    }

    impl<V: Entity> HookedRepository<V> {
        pub fn new() -> Self {
            Self {
                inner: InMemoryRepository::new(),
                after_get: Mutex::new(None),
            }
        }

        pub fn after_next_get(&self, hook: impl FnOnce() + Send + 'static) {
            *self.after_get.lock().unwrap() = Some(Box::new(hook));
        }
    }

    impl<V> Repository<V> for HookedRepository<V>
    where
        V: Entity + Clone + Send + Sync + 'static,
        V::Id: Ord + Send + Sync + 'static,
    {
        fn get(&self, id: &V::Id) -> StoreResult<Option<V>> {
            let found = self.inner.get(id)?;
            let hook = self.after_get.lock().unwrap().take();
            if let Some(hook) = hook {
                hook();
            }
            Ok(found)
        }

        fn list(&self) -> StoreResult<Vec<V>> {
            self.inner.list()
        }

        fn save(&self, value: V, unique: &[UniqueField<V>]) -> StoreResult<()> {
            self.inner.save(value, unique)
        }

        fn update(
            &self,
            id: &V::Id,
            unique: &[UniqueField<V>],
            change: Change<'_, V>,
        ) -> StoreResult<Option<V>> {
            self.inner.update(id, unique, change)
        }

        fn remove(&self, id: &V::Id) -> StoreResult<Option<V>> {
            self.inner.remove(id)
        }

        fn remove_where(&self, pred: &dyn Fn(&V) -> bool) -> StoreResult<usize> {
            self.inner.remove_where(pred)
        }
    }

    pub fn handlers() -> (ResourceHandlers, Arc<MemoryPhotos>) {
        handlers_with(Store::in_memory())
    }

    pub fn handlers_with(store: Store) -> (ResourceHandlers, Arc<MemoryPhotos>) {
        let photos = Arc::new(MemoryPhotos::default());
        let handlers = ResourceHandlers::new(
            store,
            photos.clone(),
            1_000,
            Arc::new(Hs256Jwt::new(b"test-secret", chrono::Duration::hours(1))),
        );
        (handlers, photos)
    }
}
