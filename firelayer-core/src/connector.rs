//! The connector: query orchestration over an injected [`StoreClient`].
//!
//! A [`Connector`] owns a client, the [`ModelRegistry`] fixed at construction and its
//! [`ConnectorSettings`]. It exposes the read operations (`all`, `find`, `find_by_id`,
//! `count`, `exists`) here and the mutations in [`crate::mutation`].
//!
//! # Resolution
//!
//! Every read resolves candidate records with as little backend work as the predicate allows:
//!
//! 1. an `id` equality is served by a single point read;
//! 2. with [`LimitStrategy::BeforeFilter`] and a `limit`, only the first `limit` children are
//!    fetched;
//! 3. otherwise the first scalar equality condition is delegated to the store's
//!    single-property index;
//! 4. otherwise the whole collection is fetched.
//!
//! The full predicate is then evaluated in memory, followed by ordering, `skip`, `limit` and
//! projection.
//!
//! # Example
//!
//! ```ignore
//! use firelayer_core::{connector::Connector, context::CallContext, query::Filter};
//!
//! let connector = Connector::builder(client).model("customer").build()?;
//! let ctx = CallContext::background();
//! let customers = connector.all(&ctx, "customer", &Filter::new()).await?;
//! ```

use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::{
    client::{PatchSet, Snapshot, StoreClient, StoreClientBuilder},
    context::CallContext,
    error::{ConnectorError, ConnectorResult},
    evaluator::RecordEvaluator,
    path::validate_key,
    project::project_record,
    query::{Filter, Where},
    record::Record,
    registry::ModelRegistry,
    sort::sort_records,
};

/// Where `limit` applies relative to in-memory filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LimitStrategy {
    /// Fetch, filter, sort and skip, then truncate to `limit`.
    #[default]
    AfterFilter,
    /// Fetch only the first `limit` children, then filter.
    ///
    /// Saves transfer on large collections but under-returns whenever non-matching records
    /// sit among the first `limit` children.
    BeforeFilter,
}

/// Behavior knobs of a [`Connector`].
#[derive(Debug, Clone, Default)]
pub struct ConnectorSettings {
    /// Where `limit` is applied.
    pub limit_strategy: LimitStrategy,
    /// Timeout applied to every backend request whose context carries none.
    pub default_timeout: Option<Duration>,
}

/// Document CRUD and queries over a hierarchical store.
#[derive(Debug)]
pub struct Connector<C: StoreClient> {
    client: C,
    registry: ModelRegistry,
    settings: ConnectorSettings,
}

impl<C: StoreClient> Connector<C> {
    /// Creates a connector from its parts.
    pub fn new(client: C, registry: ModelRegistry, settings: ConnectorSettings) -> Self {
        Self { client, registry, settings }
    }

    /// Creates a builder around an already opened client.
    pub fn builder(client: C) -> ConnectorBuilder<C> {
        ConnectorBuilder::new(client)
    }

    /// Opens a client with `builder` and wraps it in a connector.
    ///
    /// # Errors
    ///
    /// Returns whatever error the client builder reports.
    pub async fn connect<B>(
        builder: B,
        registry: ModelRegistry,
        settings: ConnectorSettings,
    ) -> ConnectorResult<Self>
    where
        B: StoreClientBuilder<Client = C>,
    {
        let client = builder.build().await?;
        info!(models = registry.models().count(), "connector opened");

        Ok(Self::new(client, registry, settings))
    }

    /// Closes the underlying client.
    pub async fn disconnect(self) -> ConnectorResult<()> {
        self.client.close().await?;
        info!("connector closed");

        Ok(())
    }

    /// The injected store client.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// The model registry.
    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// The connector settings.
    pub fn settings(&self) -> &ConnectorSettings {
        &self.settings
    }

    /// Returns the records of `model` selected by `filter`.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::InvalidArgument`] for unknown models or invalid ids, and
    /// passes store errors through.
    pub async fn all(
        &self,
        ctx: &CallContext,
        model: &str,
        filter: &Filter,
    ) -> ConnectorResult<Vec<Record>> {
        let collection = self.registry.collection(model)?;
        let ctx = self.scoped(ctx);

        let raw_limit = match self.settings.limit_strategy {
            LimitStrategy::BeforeFilter => filter.limit,
            LimitStrategy::AfterFilter => None,
        };

        let mut records = self
            .resolve(&ctx, "all", collection, filter.predicate.as_ref(), raw_limit)
            .await?;

        if let Some(order) = &filter.order {
            sort_records(&mut records, order);
        }

        let page = records
            .into_iter()
            .skip(filter.skip.unwrap_or(0))
            .take(filter.limit.unwrap_or(usize::MAX));

        Ok(match &filter.fields {
            Some(projection) => page
                .map(|record| project_record(record, projection))
                .collect(),
            None => page.collect(),
        })
    }

    /// Alias of [`Connector::all`].
    pub async fn find(
        &self,
        ctx: &CallContext,
        model: &str,
        filter: &Filter,
    ) -> ConnectorResult<Vec<Record>> {
        self.all(ctx, model, filter).await
    }

    /// Returns the record stored under `id`, if any.
    pub async fn find_by_id(
        &self,
        ctx: &CallContext,
        model: &str,
        id: &str,
    ) -> ConnectorResult<Option<Record>> {
        let collection = self.registry.collection(model)?;
        validate_key(id)?;

        self.fetch_child(&self.scoped(ctx), "find_by_id", collection, id)
            .await
    }

    /// Counts the records of `model` matching `predicate` (all records without one).
    pub async fn count(
        &self,
        ctx: &CallContext,
        model: &str,
        predicate: Option<Where>,
    ) -> ConnectorResult<usize> {
        let collection = self.registry.collection(model)?;

        Ok(self
            .resolve(&self.scoped(ctx), "count", collection, predicate.as_ref(), None)
            .await?
            .len())
    }

    /// Whether a record is stored under `id`.
    pub async fn exists(&self, ctx: &CallContext, model: &str, id: &str) -> ConnectorResult<bool> {
        let collection = self.registry.collection(model)?;
        validate_key(id)?;

        Ok(self
            .fetch_child(&self.scoped(ctx), "exists", collection, id)
            .await?
            .is_some())
    }

    /// Applies the connector's default timeout to a caller context.
    pub(crate) fn scoped(&self, ctx: &CallContext) -> CallContext {
        ctx.clone().or_timeout(self.settings.default_timeout)
    }

    /// Fetches the candidate records for `predicate` and filters them in memory.
    pub(crate) async fn resolve(
        &self,
        ctx: &CallContext,
        operation: &str,
        collection: &str,
        predicate: Option<&Where>,
        raw_limit: Option<usize>,
    ) -> ConnectorResult<Vec<Record>> {
        let Some(predicate) = predicate.filter(|p| !p.is_empty()) else {
            debug!(collection, operation, limit = ?raw_limit, "reading collection");
            return self
                .fetch_collection(ctx, operation, collection, raw_limit)
                .await;
        };

        let candidates = if let Some(id) = predicate.id_eq() {
            validate_key(&id)?;
            debug!(collection, operation, id = %id, "resolving by point read");
            self.fetch_child(ctx, operation, collection, &id)
                .await?
                .into_iter()
                .collect()
        } else if raw_limit.is_some() {
            debug!(collection, operation, limit = ?raw_limit, "reading first children before filtering");
            self.fetch_collection(ctx, operation, collection, raw_limit)
                .await?
        } else if let Some((property, value)) = predicate.indexable() {
            debug!(collection, operation, property, "resolving through equality index");
            self.fetch_equal(ctx, operation, collection, property, value)
                .await?
        } else {
            debug!(collection, operation, "resolving by full scan");
            self.fetch_collection(ctx, operation, collection, None)
                .await?
        };

        Ok(RecordEvaluator::filter_records(candidates, predicate))
    }

    pub(crate) async fn fetch_child(
        &self,
        ctx: &CallContext,
        operation: &str,
        collection: &str,
        id: &str,
    ) -> ConnectorResult<Option<Record>> {
        ctx.run("read_child", self.client.read_child(ctx, collection, id))
            .await
            .map_err(|e| e.during(operation))?
            .map(|value| Record::from_stored(id, value))
            .transpose()
    }

    pub(crate) async fn fetch_collection(
        &self,
        ctx: &CallContext,
        operation: &str,
        collection: &str,
        limit: Option<usize>,
    ) -> ConnectorResult<Vec<Record>> {
        let snapshot = ctx
            .run("read_collection", self.client.read_collection(ctx, collection, limit))
            .await
            .map_err(|e| e.during(operation))?;

        Ok(records_from_snapshot(collection, snapshot))
    }

    async fn fetch_equal(
        &self,
        ctx: &CallContext,
        operation: &str,
        collection: &str,
        property: &str,
        value: &Value,
    ) -> ConnectorResult<Vec<Record>> {
        let snapshot = ctx
            .run(
                "equality_query",
                self.client.equality_query(ctx, collection, property, value),
            )
            .await
            .map_err(|e| e.during(operation))?;

        Ok(records_from_snapshot(collection, snapshot))
    }

    pub(crate) async fn push_child(
        &self,
        ctx: &CallContext,
        operation: &str,
        collection: &str,
        data: Value,
    ) -> ConnectorResult<String> {
        ctx.run("create_child", self.client.create_child(ctx, collection, data))
            .await
            .map_err(|e| e.during(operation))
    }

    pub(crate) async fn put_child(
        &self,
        ctx: &CallContext,
        operation: &str,
        collection: &str,
        id: &str,
        value: Option<Value>,
    ) -> ConnectorResult<()> {
        ctx.run("write_child", self.client.write_child(ctx, collection, id, value))
            .await
            .map_err(|e| e.during(operation))
    }

    pub(crate) async fn clear(
        &self,
        ctx: &CallContext,
        operation: &str,
        collection: &str,
    ) -> ConnectorResult<()> {
        ctx.run("clear_collection", self.client.clear_collection(ctx, collection))
            .await
            .map_err(|e| e.during(operation))
    }

    /// Applies `patch` atomically. A rejected patch becomes
    /// [`ConnectorError::AtomicWriteFailed`].
    pub(crate) async fn patch(
        &self,
        ctx: &CallContext,
        operation: &str,
        collection: &str,
        patch: PatchSet,
    ) -> ConnectorResult<()> {
        ctx.run("patch_multi", self.client.patch_multi(ctx, collection, patch))
            .await
            .map_err(|e| match e {
                store @ ConnectorError::Store { .. } => ConnectorError::AtomicWriteFailed(
                    collection.to_string(),
                    store.during(operation).to_string(),
                ),
                other => other,
            })
    }
}

/// Converts a snapshot into records, skipping children that are not objects.
fn records_from_snapshot(collection: &str, snapshot: Snapshot) -> Vec<Record> {
    snapshot
        .into_iter()
        .filter_map(|(id, value)| match Record::from_stored(&id, value) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(collection, error = %e, "skipping malformed child");
                None
            }
        })
        .collect()
}

/// Builder for [`Connector`].
#[derive(Debug)]
pub struct ConnectorBuilder<C: StoreClient> {
    client: C,
    models: Vec<(String, String)>,
    settings: ConnectorSettings,
}

impl<C: StoreClient> ConnectorBuilder<C> {
    /// Creates a builder around `client` with no models and default settings.
    pub fn new(client: C) -> Self {
        Self {
            client,
            models: Vec::new(),
            settings: ConnectorSettings::default(),
        }
    }

    /// Registers a model stored under a collection of the same name.
    pub fn model(self, name: &str) -> Self {
        self.model_at(name, name)
    }

    /// Registers a model stored under `path`.
    pub fn model_at(mut self, name: &str, path: &str) -> Self {
        self.models.push((name.to_string(), path.to_string()));
        self
    }

    /// Sets where `limit` is applied.
    pub fn limit_strategy(mut self, strategy: LimitStrategy) -> Self {
        self.settings.limit_strategy = strategy;
        self
    }

    /// Sets the timeout applied to requests whose context carries none.
    pub fn default_timeout(mut self, timeout: Duration) -> Self {
        self.settings.default_timeout = Some(timeout);
        self
    }

    /// Validates the registered models and builds the connector.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::InvalidArgument`] for invalid paths or duplicate models.
    pub fn build(self) -> ConnectorResult<Connector<C>> {
        let registry = self
            .models
            .iter()
            .try_fold(ModelRegistry::new(), |registry, (name, path)| {
                registry.register_at(name, path)
            })?;

        Ok(Connector::new(self.client, registry, self.settings))
    }
}
