//! Mutations: create, replace, upsert, delete and bulk update.
//!
//! Single-record mutations check existence with a point read and then write; the two
//! requests are not atomic, so a concurrent writer can slip in between them. Mutations that
//! touch several records are sent as one multi-path patch, which the store applies
//! completely or not at all.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::{
    client::{PatchSet, StoreClient},
    connector::Connector,
    context::CallContext,
    error::{ConnectorError, ConnectorResult},
    evaluator::RecordEvaluator,
    path::{field_path, validate_key},
    query::{Filter, Where},
    record::{Fields, Record, extract_id, stored_body},
};

/// Outcome of a delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteResult {
    /// Number of records removed, or `None` when a whole collection was cleared without
    /// counting its records.
    pub count: Option<usize>,
}

impl DeleteResult {
    fn deleted(count: usize) -> Self {
        Self { count: Some(count) }
    }
}

impl<C: StoreClient> Connector<C> {
    /// Creates a record.
    ///
    /// Data carrying an `id` is upserted under that id: an existing record is overwritten,
    /// otherwise the record is written under the given id. Without an `id` the store
    /// generates one. `null` fields are not stored.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::InvalidArgument`] if the data has no storable field or an
    /// invalid id.
    pub async fn create(
        &self,
        ctx: &CallContext,
        model: &str,
        data: Fields,
    ) -> ConnectorResult<Record> {
        let collection = self.registry().collection(model)?;
        let ctx = self.scoped(ctx);
        let body = storable(&data)?;

        match extract_id(&data)? {
            Some(id) => self.upsert(&ctx, "create", collection, &id, body).await,
            None => {
                let id = self
                    .push_child(&ctx, "create", collection, Value::Object(body.clone()))
                    .await?;
                debug!(collection, id = %id, "created record");

                Ok(Record::new(id, body))
            }
        }
    }

    /// Saves a record; same contract as [`Connector::create`].
    pub async fn save(
        &self,
        ctx: &CallContext,
        model: &str,
        data: Fields,
    ) -> ConnectorResult<Record> {
        self.create(ctx, model, data).await
    }

    /// Overwrites the record identified by `data.id`, or creates it under that id.
    /// Data without an `id` is created under a generated id.
    pub async fn replace_or_create(
        &self,
        ctx: &CallContext,
        model: &str,
        data: Fields,
    ) -> ConnectorResult<Record> {
        let collection = self.registry().collection(model)?;
        let ctx = self.scoped(ctx);
        let body = storable(&data)?;

        match extract_id(&data)? {
            Some(id) => self.upsert(&ctx, "replace_or_create", collection, &id, body).await,
            None => {
                let id = self
                    .push_child(&ctx, "replace_or_create", collection, Value::Object(body.clone()))
                    .await?;

                Ok(Record::new(id, body))
            }
        }
    }

    /// Overwrites the record stored under `id` with `data`.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::NotFound`] if no record is stored under `id`.
    pub async fn replace_by_id(
        &self,
        ctx: &CallContext,
        model: &str,
        id: &str,
        data: Fields,
    ) -> ConnectorResult<Record> {
        let collection = self.registry().collection(model)?;
        let ctx = self.scoped(ctx);
        require_id(id)?;
        let body = storable(&data)?;

        if self
            .fetch_child(&ctx, "replace_by_id", collection, id)
            .await?
            .is_none()
        {
            return Err(ConnectorError::NotFound(id.to_string(), collection.to_string()));
        }

        self.put_child(&ctx, "replace_by_id", collection, id, Some(Value::Object(body.clone())))
            .await?;

        Ok(Record::new(id, body))
    }

    /// Deletes the record stored under `id`.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::InvalidArgument`] for an empty or invalid id and
    /// [`ConnectorError::NotFound`] if no record is stored under it.
    pub async fn destroy_by_id(
        &self,
        ctx: &CallContext,
        model: &str,
        id: &str,
    ) -> ConnectorResult<DeleteResult> {
        let collection = self.registry().collection(model)?;
        require_id(id)?;

        self.delete_one(&self.scoped(ctx), "destroy_by_id", collection, id, None)
            .await
    }

    /// Deletes the records matching `predicate`.
    ///
    /// - no predicate (or an empty one) clears the whole collection;
    /// - a predicate with an `id` equality deletes that record and fails with
    ///   [`ConnectorError::NotFound`] if it is absent;
    /// - any other predicate deletes every match in one atomic patch.
    pub async fn destroy_all(
        &self,
        ctx: &CallContext,
        model: &str,
        predicate: Option<Where>,
    ) -> ConnectorResult<DeleteResult> {
        let collection = self.registry().collection(model)?;
        let ctx = self.scoped(ctx);

        let Some(predicate) = predicate.filter(|p| !p.is_empty()) else {
            self.clear(&ctx, "destroy_all", collection).await?;
            info!(collection, "cleared collection");

            return Ok(DeleteResult { count: None });
        };

        if let Some(id) = predicate.id_eq() {
            require_id(&id)?;
            return self
                .delete_one(&ctx, "destroy_all", collection, &id, Some(&predicate))
                .await;
        }

        let matches = self
            .resolve(&ctx, "destroy_all", collection, Some(&predicate), None)
            .await?;
        if matches.is_empty() {
            return Ok(DeleteResult::deleted(0));
        }

        let patch = matches
            .iter()
            .filter_map(Record::id)
            .map(|id| (id.to_string(), Value::Null))
            .collect::<PatchSet>();
        let count = patch.len();

        self.patch(&ctx, "destroy_all", collection, patch).await?;
        info!(collection, count, "deleted matching records");

        Ok(DeleteResult::deleted(count))
    }

    /// Updates every record matching `predicate` with the fields of `data`.
    ///
    /// All matched records are changed by one atomic multi-path patch. A `null` field
    /// removes that property; an `id` field is ignored. Returns the matched records as
    /// stored after the patch.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::InvalidArgument`] if `data` has no field to write,
    /// [`ConnectorError::NotFound`] if nothing matches and
    /// [`ConnectorError::AtomicWriteFailed`] if the store rejects the patch.
    pub async fn update(
        &self,
        ctx: &CallContext,
        model: &str,
        predicate: Where,
        data: Fields,
    ) -> ConnectorResult<Vec<Record>> {
        let collection = self.registry().collection(model)?;
        self.update_matching(&self.scoped(ctx), "update", collection, &predicate, data)
            .await
    }

    /// Updates the record stored under `id` with the fields of `data`.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::NotFound`] if no record is stored under `id`.
    pub async fn update_attributes(
        &self,
        ctx: &CallContext,
        model: &str,
        id: &str,
        data: Fields,
    ) -> ConnectorResult<Record> {
        let collection = self.registry().collection(model)?;
        require_id(id)?;

        self.update_matching(&self.scoped(ctx), "update_attributes", collection, &Where::id(id), data)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ConnectorError::NotFound(id.to_string(), collection.to_string()))
    }

    /// Updates the record identified by `data.id` if it exists, otherwise creates it
    /// (under `data.id` when given).
    pub async fn update_or_create(
        &self,
        ctx: &CallContext,
        model: &str,
        data: Fields,
    ) -> ConnectorResult<Record> {
        let collection = self.registry().collection(model)?;
        let ctx = self.scoped(ctx);

        let Some(id) = extract_id(&data)? else {
            let body = storable(&data)?;
            let id = self
                .push_child(&ctx, "update_or_create", collection, Value::Object(body.clone()))
                .await?;

            return Ok(Record::new(id, body));
        };

        match self
            .fetch_child(&ctx, "update_or_create", collection, &id)
            .await?
        {
            Some(existing) if stored_body(&data).is_empty() => Ok(existing),
            Some(_) => self
                .update_matching(&ctx, "update_or_create", collection, &Where::id(id.as_str()), data)
                .await?
                .into_iter()
                .next()
                .ok_or_else(|| ConnectorError::NotFound(id.clone(), collection.to_string())),
            None => {
                let body = storable(&data)?;
                self.put_child(&ctx, "update_or_create", collection, &id, Some(Value::Object(body.clone())))
                    .await?;

                Ok(Record::new(id, body))
            }
        }
    }

    /// Returns the first record selected by `filter`, or creates one from `data`.
    pub async fn find_or_create(
        &self,
        ctx: &CallContext,
        model: &str,
        filter: &Filter,
        data: Fields,
    ) -> ConnectorResult<Record> {
        let first = Filter { limit: Some(1), ..filter.clone() };

        match self.all(ctx, model, &first).await?.into_iter().next() {
            Some(found) => Ok(found),
            None => self.create(ctx, model, data).await,
        }
    }

    async fn upsert(
        &self,
        ctx: &CallContext,
        operation: &str,
        collection: &str,
        id: &str,
        body: Fields,
    ) -> ConnectorResult<Record> {
        // Both outcomes overwrite; the read only reports whether a record was replaced.
        let existing = self.fetch_child(ctx, operation, collection, id).await?;

        self.put_child(ctx, operation, collection, id, Some(Value::Object(body.clone())))
            .await?;
        debug!(collection, id, replaced = existing.is_some(), "upserted record");

        Ok(Record::new(id, body))
    }

    async fn delete_one(
        &self,
        ctx: &CallContext,
        operation: &str,
        collection: &str,
        id: &str,
        predicate: Option<&Where>,
    ) -> ConnectorResult<DeleteResult> {
        let Some(record) = self.fetch_child(ctx, operation, collection, id).await? else {
            return Err(ConnectorError::NotFound(id.to_string(), collection.to_string()));
        };

        if predicate.is_some_and(|p| !RecordEvaluator::new(&record).matches(p)) {
            return Ok(DeleteResult::deleted(0));
        }

        self.put_child(ctx, operation, collection, id, None).await?;
        debug!(collection, id, "deleted record");

        Ok(DeleteResult::deleted(1))
    }

    async fn update_matching(
        &self,
        ctx: &CallContext,
        operation: &str,
        collection: &str,
        predicate: &Where,
        data: Fields,
    ) -> ConnectorResult<Vec<Record>> {
        let changes = stored_body(&data);
        if changes.is_empty() {
            return Err(ConnectorError::InvalidArgument(
                "update data has no field to write".into(),
            ));
        }

        let matches = self
            .resolve(ctx, operation, collection, Some(predicate), None)
            .await?;
        if matches.is_empty() {
            return Err(ConnectorError::NotFound(predicate.to_string(), collection.to_string()));
        }

        let ids = matches
            .iter()
            .filter_map(Record::id)
            .map(str::to_string)
            .collect::<Vec<_>>();

        let mut patch = PatchSet::new();
        for id in &ids {
            for (field, value) in &changes {
                patch.insert(field_path(id, field)?, value.clone());
            }
        }

        self.patch(ctx, operation, collection, patch).await?;
        info!(collection, matched = ids.len(), fields = changes.len(), "applied update");

        self.reread(ctx, operation, collection, &ids).await
    }

    /// Reads `ids` back after a write, in the given order. Records that no longer exist
    /// are omitted.
    async fn reread(
        &self,
        ctx: &CallContext,
        operation: &str,
        collection: &str,
        ids: &[String],
    ) -> ConnectorResult<Vec<Record>> {
        if let [id] = ids {
            return Ok(self
                .fetch_child(ctx, operation, collection, id)
                .await?
                .into_iter()
                .collect());
        }

        let mut by_id = self
            .fetch_collection(ctx, operation, collection, None)
            .await?
            .into_iter()
            .filter_map(|record| Some((record.id.clone()?, record)))
            .collect::<std::collections::HashMap<_, _>>();

        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }
}

fn require_id(id: &str) -> ConnectorResult<()> {
    if id.is_empty() {
        return Err(ConnectorError::InvalidArgument("a record id is required".into()));
    }

    validate_key(id)
}

/// The fields of `data` that will be stored: everything but `id` and `null` values.
fn storable(data: &Fields) -> ConnectorResult<Fields> {
    let body = stored_body(data)
        .into_iter()
        .filter(|(_, value)| !value.is_null())
        .collect::<Fields>();

    if body.is_empty() {
        return Err(ConnectorError::InvalidArgument(
            "record data has no field to store".into(),
        ));
    }

    body.keys().try_for_each(|field| validate_key(field))?;

    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Fields {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn storable_bodies_drop_id_and_nulls() {
        let body = storable(&fields(json!({ "id": "k1", "name": "A", "age": null }))).unwrap();
        assert_eq!(Value::Object(body), json!({ "name": "A" }));
    }

    #[test]
    fn empty_bodies_are_rejected() {
        assert!(matches!(
            storable(&fields(json!({ "id": "k1", "age": null }))),
            Err(ConnectorError::InvalidArgument(_))
        ));
        assert!(storable(&fields(json!({ "a.b": 1 }))).is_err());
    }

    #[test]
    fn ids_must_be_present_and_valid() {
        assert!(require_id("k1").is_ok());
        assert!(matches!(require_id(""), Err(ConnectorError::InvalidArgument(_))));
        assert!(require_id("a#b").is_err());
    }
}
