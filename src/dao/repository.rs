//! Typed access to one entity collection on top of a [`DocumentStore`].

use std::{cmp::Ordering, marker::PhantomData, sync::Arc};

use uuid::Uuid;

use crate::dao::{
    document_store::DocumentStore,
    models::Entity,
    storage::{StorageError, StorageResult},
};

/// Direction used by [`Repository::list_sorted`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// Generic list/filter/create/update access to the collection of `E`.
pub struct Repository<E> {
    store: Arc<dyn DocumentStore>,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for Repository<E> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> Repository<E> {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            _entity: PhantomData,
        }
    }

    pub async fn get(&self, id: Uuid) -> StorageResult<Option<E>> {
        self.store
            .get(E::COLLECTION, id)
            .await?
            .map(decode::<E>)
            .transpose()
    }

    pub async fn list(&self) -> StorageResult<Vec<E>> {
        self.store
            .list(E::COLLECTION)
            .await?
            .into_iter()
            .map(decode::<E>)
            .collect()
    }

    pub async fn filter<P>(&self, predicate: P) -> StorageResult<Vec<E>>
    where
        P: Fn(&E) -> bool,
    {
        let mut entities = self.list().await?;
        entities.retain(|entity| predicate(entity));
        Ok(entities)
    }

    pub async fn find_first<P>(&self, predicate: P) -> StorageResult<Option<E>>
    where
        P: Fn(&E) -> bool,
    {
        Ok(self.list().await?.into_iter().find(|entity| predicate(entity)))
    }

    /// List the collection ordered by `key`, keeping at most `limit` entries.
    pub async fn list_sorted<K, F>(
        &self,
        key: F,
        order: SortOrder,
        limit: usize,
    ) -> StorageResult<Vec<E>>
    where
        K: Ord,
        F: Fn(&E) -> K,
    {
        let mut entities = self.list().await?;
        sort_by_key(&mut entities, key, order);
        entities.truncate(limit);
        Ok(entities)
    }

    pub async fn create(&self, entity: E) -> StorageResult<E> {
        self.update(&entity).await?;
        Ok(entity)
    }

    pub async fn bulk_create(&self, entities: Vec<E>) -> StorageResult<usize> {
        let count = entities.len();
        for entity in &entities {
            self.update(entity).await?;
        }
        Ok(count)
    }

    /// Replace the stored record with `entity`.
    pub async fn update(&self, entity: &E) -> StorageResult<()> {
        let document = serde_json::to_value(entity).map_err(|source| {
            StorageError::InvalidDocument {
                collection: E::COLLECTION,
                source,
            }
        })?;
        self.store.put(E::COLLECTION, entity.id(), document).await
    }

    pub async fn delete(&self, id: Uuid) -> StorageResult<bool> {
        self.store.delete(E::COLLECTION, id).await
    }
}

/// Stable sort of `entities` by `key` in the requested direction.
pub fn sort_by_key<E, K, F>(entities: &mut [E], key: F, order: SortOrder)
where
    K: Ord,
    F: Fn(&E) -> K,
{
    entities.sort_by(|a, b| {
        let ordering: Ordering = key(a).cmp(&key(b));
        match order {
            SortOrder::Ascending => ordering,
            SortOrder::Descending => ordering.reverse(),
        }
    });
}

fn decode<E: Entity>(document: serde_json::Value) -> StorageResult<E> {
    serde_json::from_value(document).map_err(|source| StorageError::InvalidDocument {
        collection: E::COLLECTION,
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::{document_store::memory::MemoryStore, models::FavoriteTeamEntity};
    use time::OffsetDateTime;

    fn favorite(email: &str, team: &str) -> FavoriteTeamEntity {
        FavoriteTeamEntity {
            id: Uuid::new_v4(),
            user_email: email.into(),
            team_name: team.into(),
            league: None,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[tokio::test]
    async fn create_filter_and_sort() {
        let repo = Repository::<FavoriteTeamEntity>::new(Arc::new(MemoryStore::new()));
        repo.create(favorite("a@x.io", "Lyon")).await.unwrap();
        repo.create(favorite("b@x.io", "Arsenal")).await.unwrap();
        repo.create(favorite("a@x.io", "Milan")).await.unwrap();

        let mine = repo.filter(|fav| fav.user_email == "a@x.io").await.unwrap();
        assert_eq!(mine.len(), 2);

        let sorted = repo
            .list_sorted(|fav| fav.team_name.clone(), SortOrder::Descending, 2)
            .await
            .unwrap();
        let names: Vec<_> = sorted.iter().map(|fav| fav.team_name.as_str()).collect();
        assert_eq!(names, vec!["Milan", "Lyon"]);
    }

    #[tokio::test]
    async fn update_replaces_and_delete_removes() {
        let repo = Repository::<FavoriteTeamEntity>::new(Arc::new(MemoryStore::new()));
        let mut fav = repo.create(favorite("a@x.io", "Lens")).await.unwrap();
        fav.league = Some("Ligue 1".into());
        repo.update(&fav).await.unwrap();

        let stored = repo.get(fav.id).await.unwrap().unwrap();
        assert_eq!(stored.league.as_deref(), Some("Ligue 1"));

        assert!(repo.delete(fav.id).await.unwrap());
        assert!(repo.get(fav.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn corrupted_documents_surface_as_invalid() {
        let store = Arc::new(MemoryStore::new());
        store
            .put(
                FavoriteTeamEntity::COLLECTION,
                Uuid::new_v4(),
                serde_json::json!({"unexpected": true}),
            )
            .await
            .unwrap();
        let repo = Repository::<FavoriteTeamEntity>::new(store);
        assert!(matches!(
            repo.list().await,
            Err(StorageError::InvalidDocument { .. })
        ));
    }
}
