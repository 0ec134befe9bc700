//! In-memory store client for firelayer.
//!
//! This crate provides [`InMemoryStore`], a thread-safe implementation of the
//! [`StoreClient`](firelayer_core::client::StoreClient) primitives over a single JSON tree.
//! It applies the same write rules as the remote store (time-ordered push ids, `null` deletes,
//! empty parents disappear, multi-path patches are all-or-nothing) and is meant for
//! development and tests.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent reads and writes using an async-aware RwLock
//! - **Call journal** - Every primitive received is recorded for inspection
//! - **Fault injection** - The next call of a given primitive can be made to fail
//!
//! # Quick Start
//!
//! ```ignore
//! use firelayer::{Connector, CallContext, Filter, memory::InMemoryStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let connector = Connector::builder(InMemoryStore::new())
//!         .model("customer")
//!         .build()?;
//!
//!     let ctx = CallContext::background();
//!     let customers = connector.all(&ctx, "customer", &Filter::new()).await?;
//!     assert!(customers.is_empty());
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as firelayer_memory;

mod push_id;
pub mod store;
mod tree;

pub use store::{InMemoryStore, InMemoryStoreBuilder, StoreCall, StoreOp};
