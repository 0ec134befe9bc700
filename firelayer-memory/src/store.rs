//! In-memory store client.
//!
//! This module provides a store that keeps one JSON tree behind an async-safe read-write
//! lock and implements every store primitive against it with the same write semantics as
//! the remote store. It also journals the primitives it receives and can be told to fail
//! the next call of a given kind, which makes it the reference backend for connector tests.

use async_trait::async_trait;
use chrono::Utc;
use mea::rwlock::RwLock;
use serde_json::{Map, Value};
use std::{fmt, sync::Arc};
use tracing::debug;

use firelayer_core::{
    client::{PatchSet, Snapshot, StoreClient, StoreClientBuilder},
    context::CallContext,
    error::{ConnectorError, ConnectorResult},
    path::{validate_collection_path, validate_key},
};

use crate::{push_id::PushIdGenerator, tree};

/// A store primitive, as recorded in the call journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    CreateChild,
    ReadChild,
    ReadCollection,
    EqualityQuery,
    WriteChild,
    ClearCollection,
    PatchMulti,
}

impl StoreOp {
    /// The primitive's name as used in error contexts.
    pub fn name(self) -> &'static str {
        match self {
            StoreOp::CreateChild => "create_child",
            StoreOp::ReadChild => "read_child",
            StoreOp::ReadCollection => "read_collection",
            StoreOp::EqualityQuery => "equality_query",
            StoreOp::WriteChild => "write_child",
            StoreOp::ClearCollection => "clear_collection",
            StoreOp::PatchMulti => "patch_multi",
        }
    }
}

impl fmt::Display for StoreOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One primitive received by an [`InMemoryStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreCall {
    pub op: StoreOp,
    /// The location addressed: the collection path, or `<collection>/<id>` for single
    /// children.
    pub path: String,
}

#[derive(Debug)]
struct Tree {
    root: Map<String, Value>,
    push_ids: PushIdGenerator,
}

#[derive(Debug, Default)]
struct Journal {
    calls: Vec<StoreCall>,
    faults: Vec<(StoreOp, String)>,
}

/// Thread-safe in-memory store client.
///
/// # Thread Safety
///
/// `InMemoryStore` is cloneable and all clones share the same tree and journal, so a test can
/// hand one clone to a connector and inspect the other.
///
/// # Example
///
/// ```ignore
/// use firelayer_memory::InMemoryStore;
/// use firelayer_core::{client::StoreClient, context::CallContext};
/// use serde_json::json;
///
/// let store = InMemoryStore::new();
/// let ctx = CallContext::background();
///
/// let id = store.create_child(&ctx, "customers", json!({ "name": "Alice" })).await?;
/// assert_eq!(store.read_child(&ctx, "customers", &id).await?, Some(json!({ "name": "Alice" })));
/// ```
#[derive(Clone, Debug)]
pub struct InMemoryStore {
    tree: Arc<RwLock<Tree>>,
    journal: Arc<RwLock<Journal>>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::with_root(Map::new())
    }

    /// Creates a builder for an `InMemoryStore`.
    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder::default()
    }

    fn with_root(root: Map<String, Value>) -> Self {
        Self {
            tree: Arc::new(RwLock::new(Tree {
                root,
                push_ids: PushIdGenerator::new(),
            })),
            journal: Arc::new(RwLock::new(Journal::default())),
        }
    }

    /// Returns a copy of everything stored.
    pub async fn contents(&self) -> Value {
        Value::Object(self.tree.read().await.root.clone())
    }

    /// Returns the primitives received so far, oldest first.
    pub async fn calls(&self) -> Vec<StoreCall> {
        self.journal.read().await.calls.clone()
    }

    /// Forgets the recorded primitives.
    pub async fn clear_calls(&self) {
        self.journal.write().await.calls.clear();
    }

    /// Makes the next call of `op` fail with a store error carrying `message`. The failing
    /// call leaves the tree untouched.
    pub async fn fail_next(&self, op: StoreOp, message: impl Into<String>) {
        self.journal.write().await.faults.push((op, message.into()));
    }

    /// Journals the call and consumes a pending fault for `op`, if any.
    async fn receive(&self, op: StoreOp, path: String) -> ConnectorResult<()> {
        let mut journal = self.journal.write().await;
        journal.calls.push(StoreCall { op, path });

        match journal.faults.iter().position(|(fault, _)| *fault == op) {
            Some(index) => {
                let (_, message) = journal.faults.remove(index);
                debug!(op = %op, reason = %message, "injected store failure");
                Err(ConnectorError::store(op.name(), message))
            }
            None => Ok(()),
        }
    }
}

fn segments(path: &str) -> Vec<&str> {
    path.split('/').collect()
}

fn child_path(collection: &str, id: &str) -> String {
    format!("{collection}/{id}")
}

fn invalid(op: StoreOp, err: ConnectorError) -> ConnectorError {
    ConnectorError::store(op.name(), err.to_string())
}

/// Validates every patch path and rejects paths nested in one another. Returns the segments
/// of each path paired with its value.
fn prepare_patch(patch: PatchSet) -> ConnectorResult<Vec<(Vec<String>, Value)>> {
    let mut entries = patch
        .into_iter()
        .map(|(path, value)| {
            let segments = path.split('/').map(str::to_string).collect::<Vec<_>>();
            segments
                .iter()
                .try_for_each(|segment| validate_key(segment))
                .map_err(|e| invalid(StoreOp::PatchMulti, e))?;

            Ok((segments, value))
        })
        .collect::<ConnectorResult<Vec<_>>>()?;

    entries.sort_by(|(left, _), (right, _)| left.cmp(right));

    if let Some(pair) = entries
        .windows(2)
        .find(|pair| pair[1].0.starts_with(&pair[0].0))
    {
        return Err(ConnectorError::store(
            StoreOp::PatchMulti.name(),
            format!(
                "path {} is an ancestor of {}",
                pair[0].0.join("/"),
                pair[1].0.join("/")
            ),
        ));
    }

    Ok(entries)
}

#[async_trait]
impl StoreClient for InMemoryStore {
    async fn create_child(
        &self,
        _ctx: &CallContext,
        collection: &str,
        data: Value,
    ) -> ConnectorResult<String> {
        let op = StoreOp::CreateChild;
        self.receive(op, collection.to_string()).await?;
        validate_collection_path(collection).map_err(|e| invalid(op, e))?;

        let mut state = self.tree.write().await;
        let millis = u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default();
        let id = state.push_ids.next(millis);

        let mut location = segments(collection);
        location.push(&id);
        tree::set(&mut state.root, &location, Some(data));

        Ok(id)
    }

    async fn read_child(
        &self,
        _ctx: &CallContext,
        collection: &str,
        id: &str,
    ) -> ConnectorResult<Option<Value>> {
        let op = StoreOp::ReadChild;
        self.receive(op, child_path(collection, id)).await?;
        validate_collection_path(collection).map_err(|e| invalid(op, e))?;
        validate_key(id).map_err(|e| invalid(op, e))?;

        let mut location = segments(collection);
        location.push(id);

        Ok(tree::get(&self.tree.read().await.root, &location).cloned())
    }

    async fn read_collection(
        &self,
        _ctx: &CallContext,
        collection: &str,
        limit: Option<usize>,
    ) -> ConnectorResult<Snapshot> {
        let op = StoreOp::ReadCollection;
        self.receive(op, collection.to_string()).await?;
        validate_collection_path(collection).map_err(|e| invalid(op, e))?;

        let state = self.tree.read().await;
        let Some(children) = tree::children(&state.root, &segments(collection)) else {
            return Ok(Snapshot::new());
        };

        let mut snapshot = children
            .iter()
            .map(|(id, value)| (id.clone(), value.clone()))
            .collect::<Snapshot>();

        if let Some(limit) = limit {
            snapshot = snapshot.into_iter().take(limit).collect();
        }

        Ok(snapshot)
    }

    async fn equality_query(
        &self,
        _ctx: &CallContext,
        collection: &str,
        property: &str,
        value: &Value,
    ) -> ConnectorResult<Snapshot> {
        let op = StoreOp::EqualityQuery;
        self.receive(op, collection.to_string()).await?;
        validate_collection_path(collection).map_err(|e| invalid(op, e))?;
        validate_key(property).map_err(|e| invalid(op, e))?;

        let state = self.tree.read().await;
        let Some(children) = tree::children(&state.root, &segments(collection)) else {
            return Ok(Snapshot::new());
        };

        Ok(children
            .iter()
            .filter(|(_, child)| {
                child
                    .get(property)
                    .is_some_and(|candidate| tree::same_value(candidate, value))
            })
            .map(|(id, child)| (id.clone(), child.clone()))
            .collect())
    }

    async fn write_child(
        &self,
        _ctx: &CallContext,
        collection: &str,
        id: &str,
        value: Option<Value>,
    ) -> ConnectorResult<()> {
        let op = StoreOp::WriteChild;
        self.receive(op, child_path(collection, id)).await?;
        validate_collection_path(collection).map_err(|e| invalid(op, e))?;
        validate_key(id).map_err(|e| invalid(op, e))?;

        let mut location = segments(collection);
        location.push(id);
        tree::set(&mut self.tree.write().await.root, &location, value);

        Ok(())
    }

    async fn clear_collection(&self, _ctx: &CallContext, collection: &str) -> ConnectorResult<()> {
        let op = StoreOp::ClearCollection;
        self.receive(op, collection.to_string()).await?;
        validate_collection_path(collection).map_err(|e| invalid(op, e))?;

        tree::set(&mut self.tree.write().await.root, &segments(collection), None);

        Ok(())
    }

    async fn patch_multi(
        &self,
        _ctx: &CallContext,
        collection: &str,
        patch: PatchSet,
    ) -> ConnectorResult<()> {
        let op = StoreOp::PatchMulti;
        self.receive(op, collection.to_string()).await?;
        validate_collection_path(collection).map_err(|e| invalid(op, e))?;

        let entries = prepare_patch(patch)?;

        let mut state = self.tree.write().await;
        for (relative, value) in &entries {
            let location = segments(collection)
                .into_iter()
                .chain(relative.iter().map(String::as_str))
                .collect::<Vec<_>>();
            tree::set(&mut state.root, &location, Some(value.clone()));
        }
        debug!(collection, paths = entries.len(), "applied patch");

        Ok(())
    }
}

/// Builder for [`InMemoryStore`] instances.
///
/// # Example
///
/// ```ignore
/// use firelayer_memory::InMemoryStore;
/// use firelayer_core::client::StoreClientBuilder;
/// use serde_json::json;
///
/// let store = InMemoryStore::builder()
///     .data(json!({ "customers": { "k1": { "name": "Alice" } } }))
///     .build()
///     .await?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStoreBuilder {
    data: Option<Value>,
}

impl InMemoryStoreBuilder {
    /// Seeds the store with `data`, normalized like any other write.
    pub fn data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

#[async_trait]
impl StoreClientBuilder for InMemoryStoreBuilder {
    type Client = InMemoryStore;

    /// Builds the store.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::Initialization`] if the seed data is not an object.
    async fn build(self) -> ConnectorResult<Self::Client> {
        let root = match self.data.and_then(tree::normalize) {
            None => Map::new(),
            Some(Value::Object(root)) => root,
            Some(other) => {
                return Err(ConnectorError::Initialization(format!(
                    "seed data must be an object, got {other}"
                )));
            }
        };

        Ok(InMemoryStore::with_root(root))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx() -> CallContext {
        CallContext::background()
    }

    async fn seeded(data: Value) -> InMemoryStore {
        InMemoryStore::builder().data(data).build().await.unwrap()
    }

    #[tokio::test]
    async fn pushed_children_are_readable_under_their_id() {
        let store = InMemoryStore::new();

        let first = store.create_child(&ctx(), "c", json!({ "name": "A", "age": null })).await.unwrap();
        let second = store.create_child(&ctx(), "c", json!({ "name": "B" })).await.unwrap();

        assert!(first < second);
        assert_eq!(store.read_child(&ctx(), "c", &first).await.unwrap(), Some(json!({ "name": "A" })));
        assert_eq!(store.read_child(&ctx(), "c", "missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn limited_reads_return_first_children_in_key_order() {
        let store = seeded(json!({ "c": { "b": { "n": 2 }, "a": { "n": 1 }, "c": { "n": 3 } } })).await;

        let snapshot = store.read_collection(&ctx(), "c", Some(2)).await.unwrap();
        assert_eq!(snapshot.keys().collect::<Vec<_>>(), ["a", "b"]);

        let snapshot = store.read_collection(&ctx(), "missing", None).await.unwrap();
        assert!(snapshot.is_empty());
    }

    #[tokio::test]
    async fn equality_queries_filter_on_one_property() {
        let store = seeded(json!({ "c": { "a": { "age": 28 }, "b": { "age": 4 }, "d": { "name": "x" } } })).await;

        let snapshot = store.equality_query(&ctx(), "c", "age", &json!(28.0)).await.unwrap();
        assert_eq!(snapshot.keys().collect::<Vec<_>>(), ["a"]);
    }

    #[tokio::test]
    async fn deleting_the_last_child_prunes_the_collection() {
        let store = seeded(json!({ "shop": { "orders": { "a": { "n": 1 } } } })).await;

        store.write_child(&ctx(), "shop/orders", "a", None).await.unwrap();
        assert_eq!(store.contents().await, json!({}));
    }

    #[tokio::test]
    async fn clearing_removes_the_whole_subtree() {
        let store = seeded(json!({ "c": { "a": { "n": 1 }, "b": { "n": 2 } }, "d": { "x": { "n": 1 } } })).await;

        store.clear_collection(&ctx(), "c").await.unwrap();
        assert_eq!(store.contents().await, json!({ "d": { "x": { "n": 1 } } }));
    }

    #[tokio::test]
    async fn patches_apply_every_path() {
        let store = seeded(json!({ "c": { "a": { "name": "A", "age": 1 }, "b": { "name": "B" } } })).await;

        let patch = PatchSet::from([
            ("a/age".to_string(), Value::Null),
            ("a/name".to_string(), json!("Z")),
            ("b".to_string(), Value::Null),
        ]);
        store.patch_multi(&ctx(), "c", patch).await.unwrap();

        assert_eq!(store.contents().await, json!({ "c": { "a": { "name": "Z" } } }));
    }

    #[tokio::test]
    async fn invalid_patches_change_nothing() {
        let data = json!({ "c": { "a": { "name": "A" } } });
        let store = seeded(data.clone()).await;

        let nested = PatchSet::from([
            ("a".to_string(), json!({ "name": "B" })),
            ("a/name".to_string(), json!("C")),
        ]);
        assert!(store.patch_multi(&ctx(), "c", nested).await.is_err());

        let forbidden = PatchSet::from([
            ("a/name".to_string(), json!("B")),
            ("a/bad.key".to_string(), json!(1)),
        ]);
        assert!(store.patch_multi(&ctx(), "c", forbidden).await.is_err());

        assert_eq!(store.contents().await, data);
    }

    #[tokio::test]
    async fn injected_faults_fail_once_and_are_journaled() {
        let store = InMemoryStore::new();
        store.fail_next(StoreOp::ReadChild, "unavailable").await;

        let err = store.read_child(&ctx(), "c", "a").await.unwrap_err();
        assert_eq!(err, ConnectorError::store("read_child", "unavailable"));
        assert!(store.read_child(&ctx(), "c", "a").await.is_ok());

        assert_eq!(
            store.calls().await,
            vec![
                StoreCall { op: StoreOp::ReadChild, path: "c/a".into() },
                StoreCall { op: StoreOp::ReadChild, path: "c/a".into() },
            ]
        );
    }

    #[tokio::test]
    async fn malformed_collection_paths_are_rejected_by_every_read() {
        let store = seeded(json!({ "c": { "a": { "name": "A" } } })).await;

        assert!(store.read_collection(&ctx(), "c//x", None).await.is_err());
        assert!(store.read_collection(&ctx(), "c.x", Some(1)).await.is_err());
        assert!(store.read_child(&ctx(), "c#", "a").await.is_err());
        assert!(store.equality_query(&ctx(), "c$", "name", &json!("A")).await.is_err());
        assert!(store.read_collection(&ctx(), "c", None).await.is_ok());
    }

    #[tokio::test]
    async fn seed_data_must_be_an_object() {
        let result = InMemoryStore::builder().data(json!([1, 2])).build().await;
        assert!(matches!(result, Err(ConnectorError::Initialization(_))));
    }
}
