//! Field projection of query results.

use crate::{
    query::Projection,
    record::{ID_PROPERTY, Record},
};

/// Reduces `record` to the properties `projection` keeps.
pub fn project_record(mut record: Record, projection: &Projection) -> Record {
    if projection.is_identity() {
        return record;
    }

    record.fields.retain(|property, _| projection.keeps(property));
    if !projection.keeps(ID_PROPERTY) {
        record.id = None;
    }

    record
}
