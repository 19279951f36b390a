use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use thiserror::Error;

use craftmart_core::{DomainError, DomainResult, Entity};

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Another record already holds a value that must be unique.
    #[error("duplicate field value entered: {field}")]
    Duplicate { field: &'static str },

    /// An in-place change refused the current record.
    #[error(transparent)]
    Rejected(#[from] DomainError),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// In-place change applied by [`Repository::update`].
pub type Change<'a, V> = &'a mut dyn FnMut(&mut V) -> DomainResult<()>;

/// A field whose value must not repeat across records of one repository.
pub struct UniqueField<V> {
    pub name: &'static str,
    pub key: fn(&V) -> String,
}

/// Keyed record storage for one entity type.
///
/// Every operation is atomic on its own; there are no multi-record
/// transactions.
pub trait Repository<V: Entity>: Send + Sync {
    fn get(&self, id: &V::Id) -> StoreResult<Option<V>>;

    /// All records, ordered by id.
    fn list(&self) -> StoreResult<Vec<V>>;

    /// Insert or replace `value` under its id, unless a *different* record
    /// clashes on one of the `unique` fields.
    fn save(&self, value: V, unique: &[UniqueField<V>]) -> StoreResult<()>;

    /// Apply `change` to the stored record and write it back, all under one
    /// lock. Returns `None` without writing anything when the record is gone.
    fn update(
        &self,
        id: &V::Id,
        unique: &[UniqueField<V>],
        change: Change<'_, V>,
    ) -> StoreResult<Option<V>>;

    fn remove(&self, id: &V::Id) -> StoreResult<Option<V>>;

    /// Remove every record matching `pred`, returning how many were removed.
    fn remove_where(&self, pred: &dyn Fn(&V) -> bool) -> StoreResult<usize>;
}

impl<V, S> Repository<V> for Arc<S>
where
    V: Entity,
    S: Repository<V> + ?Sized,
{
    fn get(&self, id: &V::Id) -> StoreResult<Option<V>> {
        (**self).get(id)
    }

    fn list(&self) -> StoreResult<Vec<V>> {
        (**self).list()
    }

    fn save(&self, value: V, unique: &[UniqueField<V>]) -> StoreResult<()> {
        (**self).save(value, unique)
    }

    fn update(
        &self,
        id: &V::Id,
        unique: &[UniqueField<V>],
        change: Change<'_, V>,
    ) -> StoreResult<Option<V>> {
        (**self).update(id, unique, change)
    }

    fn remove(&self, id: &V::Id) -> StoreResult<Option<V>> {
        (**self).remove(id)
    }

    fn remove_where(&self, pred: &dyn Fn(&V) -> bool) -> StoreResult<usize> {
        (**self).remove_where(pred)
    }
}

/// In-memory repository for tests/dev.
#[derive(Debug)]
pub struct InMemoryRepository<V: Entity> {
    inner: RwLock<HashMap<V::Id, V>>,
}

impl<V: Entity> InMemoryRepository<V> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }
}

impl<V: Entity> Default for InMemoryRepository<V> {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Unavailable("lock poisoned".to_string())
}

fn check_unique<V: Entity>(
    map: &HashMap<V::Id, V>,
    value: &V,
    unique: &[UniqueField<V>],
) -> StoreResult<()> {
    for field in unique {
        let wanted = (field.key)(value);
        let clash = map
            .values()
            .any(|other| other.id() != value.id() && (field.key)(other) == wanted);
        if clash {
            return Err(StoreError::Duplicate { field: field.name });
        }
    }
    Ok(())
}

impl<V> Repository<V> for InMemoryRepository<V>
where
    V: Entity + Clone + Send + Sync + 'static,
    V::Id: Ord + Send + Sync + 'static,
{
    fn get(&self, id: &V::Id) -> StoreResult<Option<V>> {
        let map = self.inner.read().map_err(poisoned)?;
        Ok(map.get(id).cloned())
    }

    fn list(&self) -> StoreResult<Vec<V>> {
        let map = self.inner.read().map_err(poisoned)?;
        let mut out: Vec<V> = map.values().cloned().collect();
        out.sort_by(|a, b| a.id().cmp(b.id()));
        Ok(out)
    }

    fn save(&self, value: V, unique: &[UniqueField<V>]) -> StoreResult<()> {
        let mut map = self.inner.write().map_err(poisoned)?;
        check_unique(&map, &value, unique)?;
        map.insert(value.id().clone(), value);
        Ok(())
    }

    fn update(
        &self,
        id: &V::Id,
        unique: &[UniqueField<V>],
        change: Change<'_, V>,
    ) -> StoreResult<Option<V>> {
        let mut map = self.inner.write().map_err(poisoned)?;
        let Some(current) = map.get(id) else {
            return Ok(None);
        };

        let mut next = current.clone();
        change(&mut next)?;
        if next.id() != id {
            return Err(StoreError::Rejected(DomainError::validation(format!(
                "{} id cannot change",
                V::KIND
            ))));
        }
        check_unique(&map, &next, unique)?;

        map.insert(id.clone(), next.clone());
        Ok(Some(next))
    }

    fn remove(&self, id: &V::Id) -> StoreResult<Option<V>> {
        let mut map = self.inner.write().map_err(poisoned)?;
        Ok(map.remove(id))
    }

    fn remove_where(&self, pred: &dyn Fn(&V) -> bool) -> StoreResult<usize> {
        let mut map = self.inner.write().map_err(poisoned)?;
        let before = map.len();
        map.retain(|_, v| !pred(v));
        Ok(before - map.len())
    }
}
