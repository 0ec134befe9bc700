//! Store client abstraction for the remote hierarchical key-value store.
//!
//! This module defines the narrow set of primitives the connector relies on. A store organizes
//! data as nested, path-addressed JSON documents; each collection lives at a path and holds one
//! child per record, keyed by the record id.
//!
//! # Traits
//!
//! - [`StoreClient`]: The primitives of a store (point read, subtree read, push, equality
//!   query, overwrite/delete, atomic multi-path patch)
//! - [`StoreClientBuilder`]: Factory trait for opening a client
//!
//! # Examples
//!
//! ```ignore
//! use firelayer_core::{client::StoreClient, context::CallContext};
//! use serde_json::json;
//!
//! let ctx = CallContext::background();
//! let id = client.create_child(&ctx, "customers", json!({ "name": "Alice" })).await?;
//! let value = client.read_child(&ctx, "customers", &id).await?;
//! ```

use async_trait::async_trait;
use serde_json::Value;
use std::{collections::BTreeMap, fmt::Debug};

use crate::{context::CallContext, error::ConnectorResult};

/// Children of a collection path, keyed by record id in key order.
pub type Snapshot = BTreeMap<String, Value>;

/// Relative paths (`"<id>"` or `"<id>/<field>"`) and the values to write there in one
/// multi-path patch. A `null` value deletes the location.
pub type PatchSet = BTreeMap<String, Value>;

/// The primitives of a remote hierarchical key-value store.
///
/// Implementations perform exactly one backend request per call and never retry. Failures are
/// reported as [`ConnectorError::Store`](crate::error::ConnectorError::Store) with the name of
/// the primitive as operation. Clients should honor [`CallContext::timeout`] on the request
/// they issue and report an elapsed timeout as
/// [`ConnectorError::DeadlineExceeded`](crate::error::ConnectorError::DeadlineExceeded).
///
/// # Thread Safety
///
/// Clients are shared by reference across concurrent operations and must be `Send + Sync`.
#[async_trait]
pub trait StoreClient: Send + Sync + Debug {
    /// Creates a new child of `collection` under a backend-generated, time-ordered key and
    /// returns that key.
    async fn create_child(
        &self,
        ctx: &CallContext,
        collection: &str,
        data: Value,
    ) -> ConnectorResult<String>;

    /// Reads the value stored at `<collection>/<id>`, or `None` if nothing is stored there.
    async fn read_child(
        &self,
        ctx: &CallContext,
        collection: &str,
        id: &str,
    ) -> ConnectorResult<Option<Value>>;

    /// Reads the children of `collection`.
    ///
    /// With a `limit`, only the first `limit` children in key order are returned.
    async fn read_collection(
        &self,
        ctx: &CallContext,
        collection: &str,
        limit: Option<usize>,
    ) -> ConnectorResult<Snapshot>;

    /// Returns the children of `collection` whose `property` equals `value`, filtered by the
    /// store. Only one property can be constrained per request.
    async fn equality_query(
        &self,
        ctx: &CallContext,
        collection: &str,
        property: &str,
        value: &Value,
    ) -> ConnectorResult<Snapshot>;

    /// Overwrites `<collection>/<id>` with `value`; `None` deletes the child.
    async fn write_child(
        &self,
        ctx: &CallContext,
        collection: &str,
        id: &str,
        value: Option<Value>,
    ) -> ConnectorResult<()>;

    /// Deletes everything stored under `collection`.
    async fn clear_collection(&self, ctx: &CallContext, collection: &str) -> ConnectorResult<()>;

    /// Writes every entry of `patch` relative to `collection` in one atomic request.
    /// Either all locations change or none do.
    async fn patch_multi(
        &self,
        ctx: &CallContext,
        collection: &str,
        patch: PatchSet,
    ) -> ConnectorResult<()>;

    /// Releases connections and other resources held by the client.
    ///
    /// The default implementation is a no-op.
    async fn close(self) -> ConnectorResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

#[async_trait]
impl<C> StoreClient for &C
where
    C: StoreClient,
{
    async fn create_child(
        &self,
        ctx: &CallContext,
        collection: &str,
        data: Value,
    ) -> ConnectorResult<String> {
        (*self)
            .create_child(ctx, collection, data)
            .await
    }

    async fn read_child(
        &self,
        ctx: &CallContext,
        collection: &str,
        id: &str,
    ) -> ConnectorResult<Option<Value>> {
        (*self)
            .read_child(ctx, collection, id)
            .await
    }

    async fn read_collection(
        &self,
        ctx: &CallContext,
        collection: &str,
        limit: Option<usize>,
    ) -> ConnectorResult<Snapshot> {
        (*self)
            .read_collection(ctx, collection, limit)
            .await
    }

    async fn equality_query(
        &self,
        ctx: &CallContext,
        collection: &str,
        property: &str,
        value: &Value,
    ) -> ConnectorResult<Snapshot> {
        (*self)
            .equality_query(ctx, collection, property, value)
            .await
    }

    async fn write_child(
        &self,
        ctx: &CallContext,
        collection: &str,
        id: &str,
        value: Option<Value>,
    ) -> ConnectorResult<()> {
        (*self)
            .write_child(ctx, collection, id, value)
            .await
    }

    async fn clear_collection(&self, ctx: &CallContext, collection: &str) -> ConnectorResult<()> {
        (*self).clear_collection(ctx, collection).await
    }

    async fn patch_multi(
        &self,
        ctx: &CallContext,
        collection: &str,
        patch: PatchSet,
    ) -> ConnectorResult<()> {
        (*self)
            .patch_multi(ctx, collection, patch)
            .await
    }
}

/// Factory for opening a [`StoreClient`].
///
/// Builders carry the endpoint and credential configuration of a backend and perform whatever
/// setup the client needs before it can serve requests.
#[async_trait]
pub trait StoreClientBuilder {
    type Client: StoreClient;

    async fn build(self) -> ConnectorResult<Self::Client>;
}
