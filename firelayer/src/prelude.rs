//! Convenient re-exports of commonly used types from firelayer.
//!
//! ```ignore
//! use firelayer::prelude::*;
//! ```

pub use firelayer_core::{
    client::{PatchSet, Snapshot, StoreClient, StoreClientBuilder},
    connector::{Connector, ConnectorBuilder, ConnectorSettings, LimitStrategy},
    context::{CallContext, CancelHandle},
    error::{ConnectorError, ConnectorResult},
    mutation::DeleteResult,
    query::{Condition, Direction, Filter, FilterBuilder, Operator, Order, Projection, Where},
    record::{Fields, Record},
    registry::ModelRegistry,
};
