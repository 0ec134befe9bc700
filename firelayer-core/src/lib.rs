//! Core of firelayer: a document CRUD and query layer over hierarchical key-value stores.
//!
//! The store keeps records as JSON objects under `<collection>/<id>` and can answer point
//! reads, subtree reads and single-property equality queries. This crate adds everything else
//! on the client side:
//!
//! - **Store primitives** ([`client`]) - The narrow trait a store backend implements
//! - **Queries** ([`query`]) - Predicates, ordering, paging and projection
//! - **Evaluation** ([`sort`], [`project`]) - In-memory filtering, ordering and field
//!   selection of fetched records
//! - **Connector** ([`connector`], [`mutation`]) - Model-level reads and writes with atomic
//!   multi-record updates
//! - **Call context** ([`context`]) - Cancellation and timeouts per operation
//! - **Error handling** ([`error`]) - The connector error taxonomy
//!
//! # Example
//!
//! ```ignore
//! use firelayer_core::{connector::Connector, context::CallContext, query::{Filter, Where}};
//! use serde_json::json;
//!
//! let connector = Connector::builder(client).model("customer").build()?;
//! let ctx = CallContext::background();
//!
//! let data = json!({ "name": "Bob", "age": 4 }).as_object().cloned().unwrap_or_default();
//! connector.create(&ctx, "customer", data).await?;
//! let young = connector
//!     .all(&ctx, "customer", &Filter::builder().predicate(Where::new().lt("age", 30)).build())
//!     .await?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as firelayer_core;

pub mod client;
pub mod connector;
pub mod context;
pub mod error;
pub(crate) mod evaluator;
pub mod mutation;
pub mod path;
pub mod project;
pub mod query;
pub mod record;
pub mod registry;
pub mod sort;
