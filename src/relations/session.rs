//! Typed wrapper around one store transaction

use crate::core::entity::Entity;
use crate::core::model::Category;
use crate::core::schema::JoinRelation;
use crate::core::store::{EntityStore, Fields, StoreError, StoreResult, StoreTransaction};
use serde_json::Value;

/// A store transaction that speaks in entities instead of raw records
///
/// Dropping a session without [`commit`](Self::commit) rolls it back.
pub(crate) struct Session {
    tx: Box<dyn StoreTransaction>,
}

impl Session {
    pub(crate) async fn begin(store: &dyn EntityStore) -> StoreResult<Self> {
        Ok(Self {
            tx: store.begin().await?,
        })
    }

    pub(crate) async fn get<T: Entity>(&mut self, id: i64) -> StoreResult<Option<T>> {
        self.tx
            .find_by_id(T::KIND, id)
            .await?
            .map(T::from_record)
            .transpose()
    }

    /// Like [`get`](Self::get), failing with `NotFound` when absent
    pub(crate) async fn require<T: Entity>(&mut self, id: i64) -> StoreResult<T> {
        self.get::<T>(id)
            .await?
            .ok_or(StoreError::NotFound { kind: T::KIND, id })
    }

    pub(crate) async fn find_by<T: Entity>(
        &mut self,
        field: &str,
        value: Value,
    ) -> StoreResult<Vec<T>> {
        self.tx
            .find_by(T::KIND, field, &value)
            .await?
            .into_iter()
            .map(T::from_record)
            .collect()
    }

    pub(crate) async fn create<T: Entity>(&mut self, fields: Fields) -> StoreResult<T> {
        T::from_record(self.tx.create(T::KIND, fields).await?)
    }

    pub(crate) async fn update<T: Entity>(&mut self, id: i64, fields: Fields) -> StoreResult<T> {
        T::from_record(self.tx.update(T::KIND, id, fields).await?)
    }

    pub(crate) async fn delete<T: Entity>(&mut self, id: i64) -> StoreResult<T> {
        T::from_record(self.tx.delete(T::KIND, id).await?)
    }

    pub(crate) async fn upsert<T: Entity>(&mut self, key: &str, fields: Fields) -> StoreResult<T> {
        T::from_record(self.tx.upsert_by_unique_key(T::KIND, key, fields).await?)
    }

    pub(crate) async fn connect(&mut self, post_id: i64, category_id: i64) -> StoreResult<bool> {
        self.tx
            .connect(JoinRelation::PostCategories, post_id, category_id)
            .await
    }

    pub(crate) async fn disconnect(&mut self, post_id: i64, category_id: i64) -> StoreResult<bool> {
        self.tx
            .disconnect(JoinRelation::PostCategories, post_id, category_id)
            .await
    }

    pub(crate) async fn category_ids(&mut self, post_id: i64) -> StoreResult<Vec<i64>> {
        self.tx.linked(JoinRelation::PostCategories, post_id).await
    }

    /// Categories linked to a post, ascending by id
    pub(crate) async fn categories_of(&mut self, post_id: i64) -> StoreResult<Vec<Category>> {
        let mut categories = Vec::new();
        for id in self.category_ids(post_id).await? {
            categories.push(self.require::<Category>(id).await?);
        }
        Ok(categories)
    }

    pub(crate) async fn commit(self) -> StoreResult<()> {
        self.tx.commit().await
    }
}
