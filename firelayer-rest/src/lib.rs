//! REST store client for firelayer.
//!
//! [`RestStore`] implements the store primitives over the realtime database REST protocol:
//!
//! | primitive | request |
//! |---|---|
//! | `create_child` | `POST <collection>.json`, answered with `{"name": <push id>}` |
//! | `read_child` | `GET <collection>/<id>.json` |
//! | `read_collection` | `GET <collection>.json`, with `orderBy="$key"&limitToFirst=N` when limited |
//! | `equality_query` | `GET <collection>.json?orderBy="<property>"&equalTo=<json>` |
//! | `write_child` | `PUT` or `DELETE <collection>/<id>.json` |
//! | `clear_collection` | `DELETE <collection>.json` |
//! | `patch_multi` | `PATCH <collection>.json` with one member per relative path |
//!
//! Equality queries need an `.indexOn` rule for the property on the server.
//!
//! # Example
//!
//! ```ignore
//! use firelayer_core::{client::StoreClientBuilder, connector::Connector};
//! use firelayer_rest::{RestConfig, RestStore};
//!
//! let store = RestStore::from_config(RestConfig::from_env()?).build().await?;
//! let connector = Connector::builder(store).model("customer").build()?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as firelayer_rest;

pub mod config;
pub mod credential;
mod query;
pub mod store;

pub use config::{ConfigError, RestConfig};
pub use credential::{Credential, CredentialProvider, StaticCredential};
pub use store::{RestStore, RestStoreBuilder};
