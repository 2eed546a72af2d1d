//! In-memory implementation of EntityStore for development and testing

use crate::core::schema::{EntityKind, FieldDef, FieldType, JoinRelation};
use crate::core::store::{
    EntityStore, Fields, Record, StoreError, StoreResult, StoreTransaction,
};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Full contents of the store
#[derive(Debug, Clone, Default)]
struct Tables {
    rows: HashMap<EntityKind, BTreeMap<i64, Record>>,
    sequences: HashMap<EntityKind, i64>,
    joins: HashMap<JoinRelation, BTreeSet<(i64, i64)>>,
}

/// In-memory store implementation
///
/// Transactions are serialized: `begin` takes an owned lock on the tables
/// for the lifetime of the transaction. Reads go straight to the locked
/// tables; the first write takes a copy, which replaces the shared tables
/// on commit.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryStore {
    /// Create a new, empty in-memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of committed rows of a kind
    pub async fn count(&self, kind: EntityKind) -> usize {
        let tables = self.tables.lock().await;
        tables.rows.get(&kind).map_or(0, BTreeMap::len)
    }

    /// Number of committed pairs in a join relation
    pub async fn count_links(&self, relation: JoinRelation) -> usize {
        let tables = self.tables.lock().await;
        tables.joins.get(&relation).map_or(0, BTreeSet::len)
    }
}

#[async_trait]
impl EntityStore for InMemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>> {
        let guard = self.tables.clone().lock_owned().await;
        Ok(Box::new(InMemoryTransaction {
            guard,
            working: None,
        }))
    }
}

struct InMemoryTransaction {
    guard: OwnedMutexGuard<Tables>,
    /// Copy of the tables, taken on first write
    working: Option<Tables>,
}

impl InMemoryTransaction {
    fn view(&self) -> &Tables {
        self.working.as_ref().unwrap_or(&*self.guard)
    }

    fn write(&mut self) -> &mut Tables {
        let committed = &*self.guard;
        self.working.get_or_insert_with(|| Tables::clone(committed))
    }
}

impl Tables {
    fn table(&self, kind: EntityKind) -> Option<&BTreeMap<i64, Record>> {
        self.rows.get(&kind)
    }

    fn exists(&self, kind: EntityKind, id: i64) -> bool {
        self.table(kind).is_some_and(|t| t.contains_key(&id))
    }

    fn next_id(&mut self, kind: EntityKind) -> i64 {
        let seq = self.sequences.entry(kind).or_insert(0);
        *seq += 1;
        *seq
    }

    /// Type-check the supplied columns and reject unknown ones
    fn check_columns(&self, kind: EntityKind, fields: &Fields) -> StoreResult<()> {
        for (name, value) in fields {
            let def = kind.field(name).ok_or_else(|| StoreError::UnknownField {
                kind,
                field: name.clone(),
            })?;
            check_type(kind, def, value)?;
        }
        Ok(())
    }

    /// Enforce unique and foreign key constraints of a candidate row
    fn check_constraints(&self, kind: EntityKind, id: i64, row: &Record) -> StoreResult<()> {
        for def in kind.fields() {
            let value = row.get(def.name).unwrap_or(&Value::Null);
            if value.is_null() {
                continue;
            }

            if def.unique {
                let taken = self.table(kind).is_some_and(|t| {
                    t.iter()
                        .any(|(other, r)| *other != id && r.get(def.name) == Some(value))
                });
                if taken {
                    return Err(StoreError::UniqueViolation {
                        kind,
                        field: def.name.to_string(),
                    });
                }
            }

            if let (Some(target), Some(target_id)) = (def.references, value.as_i64()) {
                if !self.exists(target, target_id) {
                    return Err(StoreError::ForeignKeyViolation {
                        kind,
                        field: def.name.to_string(),
                        target,
                        id: target_id,
                    });
                }
            }
        }
        Ok(())
    }

    /// First dependent still pointing at a row, if any
    fn dependent_of(&self, kind: EntityKind, id: i64) -> Option<String> {
        for (other, def) in kind.referenced_by() {
            let referenced = self.table(other).is_some_and(|t| {
                t.values()
                    .any(|r| r.get(def.name).and_then(Value::as_i64) == Some(id))
            });
            if referenced {
                return Some(other.table().to_string());
            }
        }

        self.joins
            .iter()
            .find(|(relation, pairs)| {
                (relation.left() == kind && pairs.iter().any(|(l, _)| *l == id))
                    || (relation.right() == kind && pairs.iter().any(|(_, r)| *r == id))
            })
            .map(|(relation, _)| relation.name().to_string())
    }

    fn insert(&mut self, kind: EntityKind, fields: Fields) -> StoreResult<Record> {
        self.check_columns(kind, &fields)?;

        let mut row = Record::new();
        for def in kind.fields() {
            match fields.get(def.name) {
                Some(value) if !value.is_null() => {
                    row.insert(def.name.to_string(), value.clone());
                }
                _ if def.required => {
                    return Err(StoreError::MissingField {
                        kind,
                        field: def.name.to_string(),
                    });
                }
                _ => {
                    row.insert(def.name.to_string(), Value::Null);
                }
            }
        }

        // Constraints are checked before the sequence advances, so a failed
        // insert leaves no gap.
        self.check_constraints(kind, 0, &row)?;
        let id = self.next_id(kind);
        row.insert("id".to_string(), Value::from(id));
        self.rows.entry(kind).or_default().insert(id, row.clone());

        tracing::trace!(kind = kind.table(), id, "row inserted");
        Ok(row)
    }
}

fn check_type(kind: EntityKind, def: &FieldDef, value: &Value) -> StoreResult<()> {
    let ok = match (def.ty, value) {
        (_, Value::Null) => !def.required,
        (FieldType::String, Value::String(_)) => true,
        (FieldType::Integer, Value::Number(n)) => n.is_i64(),
        _ => false,
    };

    if ok {
        Ok(())
    } else {
        let expected = match def.ty {
            FieldType::String => "String",
            FieldType::Integer => "Int",
        };
        Err(StoreError::InvalidField {
            kind,
            field: def.name.to_string(),
            message: format!("expected {expected}, got {value}"),
        })
    }
}

fn check_endpoints(tables: &Tables, relation: JoinRelation, left: i64, right: i64) -> StoreResult<()> {
    if !tables.exists(relation.left(), left) {
        return Err(StoreError::NotFound {
            kind: relation.left(),
            id: left,
        });
    }
    if !tables.exists(relation.right(), right) {
        return Err(StoreError::NotFound {
            kind: relation.right(),
            id: right,
        });
    }
    Ok(())
}

#[async_trait]
impl StoreTransaction for InMemoryTransaction {
    async fn create(&mut self, kind: EntityKind, fields: Fields) -> StoreResult<Record> {
        self.write().insert(kind, fields)
    }

    async fn find_by_id(&mut self, kind: EntityKind, id: i64) -> StoreResult<Option<Record>> {
        Ok(self.view().table(kind).and_then(|t| t.get(&id)).cloned())
    }

    async fn find_by(
        &mut self,
        kind: EntityKind,
        field: &str,
        value: &Value,
    ) -> StoreResult<Vec<Record>> {
        if field != "id" && kind.field(field).is_none() {
            return Err(StoreError::UnknownField {
                kind,
                field: field.to_string(),
            });
        }

        Ok(self
            .view()
            .table(kind)
            .map(|t| {
                t.values()
                    .filter(|r| r.get(field) == Some(value))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn update(&mut self, kind: EntityKind, id: i64, fields: Fields) -> StoreResult<Record> {
        self.view().check_columns(kind, &fields)?;

        let mut row = self
            .view()
            .table(kind)
            .and_then(|t| t.get(&id))
            .cloned()
            .ok_or(StoreError::NotFound { kind, id })?;

        for (name, value) in fields {
            row.insert(name, value);
        }
        self.view().check_constraints(kind, id, &row)?;

        self.write()
            .rows
            .entry(kind)
            .or_default()
            .insert(id, row.clone());

        tracing::trace!(kind = kind.table(), id, "row updated");
        Ok(row)
    }

    async fn delete(&mut self, kind: EntityKind, id: i64) -> StoreResult<Record> {
        if !self.view().exists(kind, id) {
            return Err(StoreError::NotFound { kind, id });
        }

        if let Some(dependent) = self.view().dependent_of(kind, id) {
            return Err(StoreError::Restricted {
                kind,
                id,
                dependent,
            });
        }

        let row = self
            .write()
            .rows
            .get_mut(&kind)
            .and_then(|t| t.remove(&id))
            .ok_or(StoreError::NotFound { kind, id })?;

        tracing::trace!(kind = kind.table(), id, "row deleted");
        Ok(row)
    }

    async fn upsert_by_unique_key(
        &mut self,
        kind: EntityKind,
        key: &str,
        fields: Fields,
    ) -> StoreResult<Record> {
        if !kind.field(key).is_some_and(|def| def.unique) {
            return Err(StoreError::InvalidKey {
                kind,
                field: key.to_string(),
            });
        }

        let value = match fields.get(key) {
            Some(value) if !value.is_null() => value.clone(),
            _ => {
                return Err(StoreError::MissingField {
                    kind,
                    field: key.to_string(),
                });
            }
        };

        let existing = self
            .view()
            .table(kind)
            .and_then(|t| t.values().find(|r| r.get(key) == Some(&value)))
            .cloned();

        match existing {
            Some(row) => Ok(row),
            None => self.write().insert(kind, fields),
        }
    }

    async fn connect(&mut self, relation: JoinRelation, left: i64, right: i64) -> StoreResult<bool> {
        check_endpoints(self.view(), relation, left, right)?;
        if self
            .view()
            .joins
            .get(&relation)
            .is_some_and(|pairs| pairs.contains(&(left, right)))
        {
            return Ok(false);
        }
        let added = self
            .write()
            .joins
            .entry(relation)
            .or_default()
            .insert((left, right));
        Ok(added)
    }

    async fn disconnect(
        &mut self,
        relation: JoinRelation,
        left: i64,
        right: i64,
    ) -> StoreResult<bool> {
        let linked = self
            .view()
            .joins
            .get(&relation)
            .is_some_and(|pairs| pairs.contains(&(left, right)));
        if !linked {
            return Ok(false);
        }
        Ok(self
            .write()
            .joins
            .get_mut(&relation)
            .is_some_and(|pairs| pairs.remove(&(left, right))))
    }

    async fn linked(&mut self, relation: JoinRelation, left: i64) -> StoreResult<Vec<i64>> {
        Ok(self
            .view()
            .joins
            .get(&relation)
            .map(|pairs| {
                pairs
                    .range((left, i64::MIN)..=(left, i64::MAX))
                    .map(|(_, right)| *right)
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let InMemoryTransaction { mut guard, working } = *self;
        if let Some(working) = working {
            *guard = working;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Fields {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    async fn seed_user(store: &InMemoryStore, email: &str) -> i64 {
        let mut tx = store.begin().await.unwrap();
        let user = tx
            .create(EntityKind::User, fields(json!({"email": email})))
            .await
            .unwrap();
        tx.commit().await.unwrap();
        user["id"].as_i64().unwrap()
    }

    #[tokio::test]
    async fn test_create_assigns_sequential_ids() {
        let store = InMemoryStore::new();
        let mut tx = store.begin().await.unwrap();

        let a = tx
            .create(EntityKind::Category, fields(json!({"name": "a"})))
            .await
            .unwrap();
        let b = tx
            .create(EntityKind::Category, fields(json!({"name": "b"})))
            .await
            .unwrap();

        assert_eq!(a["id"], 1);
        assert_eq!(b["id"], 2);
    }

    #[tokio::test]
    async fn test_create_fills_absent_optional_columns_with_null() {
        let store = InMemoryStore::new();
        let mut tx = store.begin().await.unwrap();

        let user = tx
            .create(EntityKind::User, fields(json!({"email": "a@x.io"})))
            .await
            .unwrap();

        assert!(user["name"].is_null());
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_unique_value() {
        let store = InMemoryStore::new();
        seed_user(&store, "dup@x.io").await;

        let mut tx = store.begin().await.unwrap();
        let err = tx
            .create(EntityKind::User, fields(json!({"email": "dup@x.io"})))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            StoreError::UniqueViolation {
                kind: EntityKind::User,
                field: "email".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_create_rejects_missing_required_and_unknown_columns() {
        let store = InMemoryStore::new();
        let mut tx = store.begin().await.unwrap();

        let err = tx
            .create(EntityKind::Post, fields(json!({"content": "x", "userId": 1})))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::MissingField { ref field, .. } if field == "title"));

        let err = tx
            .create(EntityKind::Category, fields(json!({"name": "x", "color": "red"})))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::UnknownField { ref field, .. } if field == "color"));
    }

    #[tokio::test]
    async fn test_create_rejects_wrong_type() {
        let store = InMemoryStore::new();
        let mut tx = store.begin().await.unwrap();

        let err = tx
            .create(EntityKind::Category, fields(json!({"name": 12})))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidField { .. }));
    }

    #[tokio::test]
    async fn test_create_rejects_dangling_foreign_key() {
        let store = InMemoryStore::new();
        let mut tx = store.begin().await.unwrap();

        let err = tx
            .create(EntityKind::Post, fields(json!({"title": "t", "userId": 42})))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            StoreError::ForeignKeyViolation {
                kind: EntityKind::Post,
                field: "userId".to_string(),
                target: EntityKind::User,
                id: 42,
            }
        );
    }

    #[tokio::test]
    async fn test_failed_create_does_not_consume_an_id() {
        let store = InMemoryStore::new();
        let mut tx = store.begin().await.unwrap();

        tx.create(EntityKind::Category, fields(json!({"name": 1})))
            .await
            .unwrap_err();
        let ok = tx
            .create(EntityKind::Category, fields(json!({"name": "one"})))
            .await
            .unwrap();
        assert_eq!(ok["id"], 1);
    }

    #[tokio::test]
    async fn test_uncommitted_transaction_is_discarded() {
        let store = InMemoryStore::new();
        {
            let mut tx = store.begin().await.unwrap();
            tx.create(EntityKind::User, fields(json!({"email": "gone@x.io"})))
                .await
                .unwrap();
        }

        assert_eq!(store.count(EntityKind::User).await, 0);
        // The email is free again
        seed_user(&store, "gone@x.io").await;
        assert_eq!(store.count(EntityKind::User).await, 1);
    }

    #[tokio::test]
    async fn test_update_is_partial_and_checks_constraints() {
        let store = InMemoryStore::new();
        seed_user(&store, "one@x.io").await;
        let second = seed_user(&store, "two@x.io").await;

        let mut tx = store.begin().await.unwrap();
        let updated = tx
            .update(EntityKind::User, second, fields(json!({"name": "Two"})))
            .await
            .unwrap();
        assert_eq!(updated["email"], "two@x.io");
        assert_eq!(updated["name"], "Two");

        let err = tx
            .update(EntityKind::User, second, fields(json!({"email": "one@x.io"})))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation { .. }));

        let err = tx
            .update(EntityKind::User, 99, fields(json!({"name": "x"})))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            StoreError::NotFound {
                kind: EntityKind::User,
                id: 99
            }
        );
    }

    #[tokio::test]
    async fn test_update_keeps_own_unique_value() {
        let store = InMemoryStore::new();
        let id = seed_user(&store, "same@x.io").await;

        let mut tx = store.begin().await.unwrap();
        let row = tx
            .update(EntityKind::User, id, fields(json!({"email": "same@x.io"})))
            .await
            .unwrap();
        assert_eq!(row["email"], "same@x.io");
    }

    #[tokio::test]
    async fn test_delete_is_restricted_by_references() {
        let store = InMemoryStore::new();
        let user_id = seed_user(&store, "owner@x.io").await;

        let mut tx = store.begin().await.unwrap();
        let profile = tx
            .create(EntityKind::Profile, fields(json!({"bio": "hi", "userId": user_id})))
            .await
            .unwrap();

        let err = tx.delete(EntityKind::User, user_id).await.unwrap_err();
        assert!(matches!(err, StoreError::Restricted { ref dependent, .. } if dependent == "profile"));

        tx.delete(EntityKind::Profile, profile["id"].as_i64().unwrap())
            .await
            .unwrap();
        let deleted = tx.delete(EntityKind::User, user_id).await.unwrap();
        assert_eq!(deleted["email"], "owner@x.io");
    }

    #[tokio::test]
    async fn test_upsert_returns_existing_row_untouched() {
        let store = InMemoryStore::new();
        let mut tx = store.begin().await.unwrap();

        let first = tx
            .upsert_by_unique_key(EntityKind::Category, "name", fields(json!({"name": "tech"})))
            .await
            .unwrap();
        let second = tx
            .upsert_by_unique_key(EntityKind::Category, "name", fields(json!({"name": "tech"})))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(store.count(EntityKind::Category).await, 1);
    }

    #[tokio::test]
    async fn test_upsert_requires_a_unique_key() {
        let store = InMemoryStore::new();
        let mut tx = store.begin().await.unwrap();

        let err = tx
            .upsert_by_unique_key(EntityKind::Post, "title", fields(json!({"title": "x"})))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidKey { .. }));

        let err = tx
            .upsert_by_unique_key(EntityKind::Category, "name", Fields::new())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::MissingField { .. }));
    }

    #[tokio::test]
    async fn test_connect_and_disconnect_are_idempotent() {
        let store = InMemoryStore::new();
        let user_id = seed_user(&store, "w@x.io").await;

        let mut tx = store.begin().await.unwrap();
        let post = tx
            .create(EntityKind::Post, fields(json!({"title": "t", "userId": user_id})))
            .await
            .unwrap();
        let category = tx
            .create(EntityKind::Category, fields(json!({"name": "c"})))
            .await
            .unwrap();
        let (p, c) = (post["id"].as_i64().unwrap(), category["id"].as_i64().unwrap());
        let relation = JoinRelation::PostCategories;

        assert!(tx.connect(relation, p, c).await.unwrap());
        assert!(!tx.connect(relation, p, c).await.unwrap());
        assert_eq!(tx.linked(relation, p).await.unwrap(), vec![c]);

        assert!(tx.disconnect(relation, p, c).await.unwrap());
        assert!(!tx.disconnect(relation, p, c).await.unwrap());
        assert!(tx.linked(relation, p).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_connect_requires_both_endpoints() {
        let store = InMemoryStore::new();
        let mut tx = store.begin().await.unwrap();

        let err = tx
            .connect(JoinRelation::PostCategories, 1, 1)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            StoreError::NotFound {
                kind: EntityKind::Post,
                id: 1
            }
        );
    }

    #[tokio::test]
    async fn test_linked_pair_restricts_delete() {
        let store = InMemoryStore::new();
        let user_id = seed_user(&store, "l@x.io").await;

        let mut tx = store.begin().await.unwrap();
        let post = tx
            .create(EntityKind::Post, fields(json!({"title": "t", "userId": user_id})))
            .await
            .unwrap();
        let category = tx
            .create(EntityKind::Category, fields(json!({"name": "c"})))
            .await
            .unwrap();
        let p = post["id"].as_i64().unwrap();
        tx.connect(JoinRelation::PostCategories, p, category["id"].as_i64().unwrap())
            .await
            .unwrap();

        let err = tx.delete(EntityKind::Post, p).await.unwrap_err();
        assert!(
            matches!(err, StoreError::Restricted { ref dependent, .. } if dependent == "post_categories")
        );
    }

    #[tokio::test]
    async fn test_find_by_orders_by_id() {
        let store = InMemoryStore::new();
        let user_id = seed_user(&store, "f@x.io").await;

        let mut tx = store.begin().await.unwrap();
        for title in ["first", "second", "third"] {
            tx.create(
                EntityKind::Post,
                fields(json!({"title": title, "userId": user_id})),
            )
            .await
            .unwrap();
        }

        let posts = tx
            .find_by(EntityKind::Post, "userId", &json!(user_id))
            .await
            .unwrap();
        let titles: Vec<_> = posts.iter().map(|p| p["title"].as_str().unwrap()).collect();
        assert_eq!(titles, vec!["first", "second", "third"]);

        let err = tx
            .find_by(EntityKind::Post, "nope", &json!(1))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::UnknownField { .. }));
    }

    #[tokio::test]
    async fn test_reads_do_not_copy_the_tables() {
        let store = InMemoryStore::new();
        let user_id = seed_user(&store, "r@x.io").await;

        let guard = store.tables.clone().lock_owned().await;
        let mut tx = InMemoryTransaction {
            guard,
            working: None,
        };

        assert!(tx.find_by_id(EntityKind::User, user_id).await.unwrap().is_some());
        assert!(tx.linked(JoinRelation::PostCategories, 1).await.unwrap().is_empty());
        assert!(!tx
            .disconnect(JoinRelation::PostCategories, 1, 1)
            .await
            .unwrap());
        assert!(tx.working.is_none());

        // the copy sees its own writes before commit
        tx.create(EntityKind::Category, fields(json!({"name": "new"})))
            .await
            .unwrap();
        assert!(tx.working.is_some());
        let found = tx
            .find_by(EntityKind::Category, "name", &json!("new"))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);

        Box::new(tx).commit().await.unwrap();
        assert_eq!(store.count(EntityKind::Category).await, 1);
        assert_eq!(store.count(EntityKind::User).await, 1);
    }

    #[tokio::test]
    async fn test_read_only_commit_keeps_tables() {
        let store = InMemoryStore::new();
        seed_user(&store, "k@x.io").await;

        let mut tx = store.begin().await.unwrap();
        tx.find_by(EntityKind::User, "email", &json!("k@x.io"))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(store.count(EntityKind::User).await, 1);
    }
}
