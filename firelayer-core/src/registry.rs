//! Model registry: maps model names to collection paths in the store.
//!
//! The registry is fixed when the connector is built and is the only state the connector
//! keeps besides its client.

use std::collections::HashMap;

use crate::{
    error::{ConnectorError, ConnectorResult},
    path::validate_collection_path,
};

/// Mapping from model name to the store path of its collection.
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    models: HashMap<String, String>,
}

impl ModelRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a model stored under a collection of the same name.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::InvalidArgument`] if the name is not a valid path.
    pub fn register(self, model: &str) -> ConnectorResult<Self> {
        self.register_at(model, model)
    }

    /// Registers a model stored under `path` (`/`-separated keys).
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::InvalidArgument`] if the path is not valid or the model is
    /// already registered.
    pub fn register_at(mut self, model: &str, path: &str) -> ConnectorResult<Self> {
        validate_collection_path(path)?;

        if self.models.contains_key(model) {
            return Err(ConnectorError::InvalidArgument(format!(
                "model {model} is already registered"
            )));
        }

        self.models.insert(model.to_string(), path.to_string());

        Ok(self)
    }

    /// Resolves the collection path of `model`.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::InvalidArgument`] for unregistered models.
    pub fn collection(&self, model: &str) -> ConnectorResult<&str> {
        self.models
            .get(model)
            .map(String::as_str)
            .ok_or_else(|| ConnectorError::InvalidArgument(format!("unknown model {model}")))
    }

    /// Names of every registered model.
    pub fn models(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_registered_models() {
        let registry = ModelRegistry::new()
            .register("customer")
            .unwrap()
            .register_at("order", "shop/orders")
            .unwrap();

        assert_eq!(registry.collection("customer").unwrap(), "customer");
        assert_eq!(registry.collection("order").unwrap(), "shop/orders");
        assert!(matches!(
            registry.collection("invoice"),
            Err(ConnectorError::InvalidArgument(_))
        ));
    }

    #[test]
    fn rejects_duplicates_and_bad_paths() {
        let registry = ModelRegistry::new().register("customer").unwrap();

        assert!(registry.clone().register("customer").is_err());
        assert!(registry.register_at("bad", "a.b").is_err());
    }
}
