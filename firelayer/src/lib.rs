//! Document CRUD and queries over a hierarchical realtime key-value store.
//!
//! This crate is the entry point of firelayer. It re-exports the connector and query types
//! from `firelayer-core` and the store clients from the backend crates.
//!
//! # Features
//!
//! - **Rich filters on a thin store** - Predicates with `lt`, `lte`, `gt`, `gte`, `ne` and `in`,
//!   ordering, paging and projection, evaluated client-side
//! - **Cheap lookups** - `id` predicates become point reads and one equality condition is
//!   delegated to the store's index
//! - **Atomic bulk writes** - Multi-record updates and deletes go out as one multi-path patch
//! - **Cancellation and timeouts** - Every operation takes a [`CallContext`]
//!
//! # Quick Start
//!
//! ```ignore
//! use firelayer::{prelude::*, memory::InMemoryStore};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), ConnectorError> {
//!     let connector = Connector::builder(InMemoryStore::new())
//!         .model("customer")
//!         .build()?;
//!     let ctx = CallContext::background();
//!
//!     let data = json!({ "name": "Bob", "age": 4 });
//!     connector.create(&ctx, "customer", data.as_object().cloned().unwrap_or_default()).await?;
//!
//!     let young = connector
//!         .all(
//!             &ctx,
//!             "customer",
//!             &Filter::builder()
//!                 .predicate(Where::new().lt("age", 30))
//!                 .order("name", Direction::Asc)
//!                 .build(),
//!         )
//!         .await?;
//!     println!("{young:?}");
//!
//!     connector.disconnect().await
//! }
//! ```
//!
//! # Backends
//!
//! - [`memory`] - In-memory store for development and testing
//! - `rest` - Realtime database REST client (requires the `rest` feature)

pub mod prelude;

pub use firelayer_core::{
    client, connector, context, error, mutation, path, project, query, record, registry, sort,
};

pub use firelayer_core::{
    client::{StoreClient, StoreClientBuilder},
    connector::{Connector, ConnectorBuilder, ConnectorSettings, LimitStrategy},
    context::CallContext,
    error::{ConnectorError, ConnectorResult},
    query::Filter,
    record::Record,
};

/// In-memory store client.
pub mod memory {
    pub use firelayer_memory::{InMemoryStore, InMemoryStoreBuilder, StoreCall, StoreOp};
}

/// REST store client.
///
/// This module is only available when the `rest` feature is enabled.
#[cfg(feature = "rest")]
pub mod rest {
    pub use firelayer_rest::{
        ConfigError, Credential, CredentialProvider, RestConfig, RestStore, RestStoreBuilder,
        StaticCredential,
    };
}
