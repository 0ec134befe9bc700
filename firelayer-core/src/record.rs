//! Record representation and conversion between stored values and records.
//!
//! The store keeps each record as a JSON object under `<collection>/<id>`. The id is the
//! record's key and is never part of the stored body; it is attached when the record is read
//! and stripped before the record is written.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    error::{ConnectorError, ConnectorResult},
    path::validate_key,
};

/// Property name under which a record exposes its key.
pub const ID_PROPERTY: &str = "id";

/// The property/value pairs of a record, or the data handed to a mutation.
pub type Fields = Map<String, Value>;

/// A single record of a collection.
///
/// Serializes as one flat JSON object (`{"id": ..., "name": ..., ...}`). The id is optional
/// only because a projection may exclude it explicitly; records read from a store always
/// carry one.
///
/// # Example
///
/// ```ignore
/// use firelayer_core::record::Record;
/// use serde_json::json;
///
/// let record = Record::from_stored("-Nabc", json!({ "name": "Alice", "age": 30 }))?;
/// assert_eq!(record.id(), Some("-Nabc"));
/// assert_eq!(record.get("age"), Some(&json!(30)));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(flatten)]
    pub fields: Fields,
}

impl Record {
    /// Creates a record from its key and fields.
    pub fn new(id: impl Into<String>, fields: Fields) -> Self {
        Self { id: Some(id.into()), fields }
    }

    /// Converts the value stored at `<collection>/<id>` into a record.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::InvalidDocument`] if the stored value is not an object.
    pub fn from_stored(id: &str, value: Value) -> ConnectorResult<Self> {
        match value {
            Value::Object(mut fields) => {
                // The key is authoritative over any id copied into the body by other writers.
                fields.remove(ID_PROPERTY);
                Ok(Self::new(id, fields))
            }
            other => Err(ConnectorError::InvalidDocument(format!(
                "value stored under {id} is not an object: {other}"
            ))),
        }
    }

    /// Returns the record's id, if it was not projected away.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Returns the value of a stored field. The key is exposed by [`Record::id`].
    pub fn get(&self, property: &str) -> Option<&Value> {
        self.fields.get(property)
    }

    /// Returns the value of a property as seen by filters and sorting, where `id`
    /// is a regular property holding the key.
    pub(crate) fn property(&self, property: &str) -> Option<Value> {
        if property == ID_PROPERTY {
            return self.id.clone().map(Value::String);
        }

        self.fields.get(property).cloned()
    }

    /// Converts the record into a single JSON object including its id.
    pub fn into_value(self) -> Value {
        let mut object = Map::with_capacity(self.fields.len() + 1);

        if let Some(id) = self.id {
            object.insert(ID_PROPERTY.to_string(), Value::String(id));
        }
        object.extend(self.fields);

        Value::Object(object)
    }
}

/// Reads the caller-supplied id out of mutation data.
///
/// Strings are used as-is and integers are rendered in decimal. `null` or a missing
/// `id` yields `None`.
///
/// # Errors
///
/// Returns [`ConnectorError::InvalidArgument`] if the id has another type or is not a
/// valid store key.
pub fn extract_id(data: &Fields) -> ConnectorResult<Option<String>> {
    let id = match data.get(ID_PROPERTY) {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::String(id)) => id.clone(),
        Some(Value::Number(number)) if number.is_i64() || number.is_u64() => number.to_string(),
        Some(other) => {
            return Err(ConnectorError::InvalidArgument(format!(
                "id must be a string or an integer, got {other}"
            )));
        }
    };

    validate_key(&id)?;

    Ok(Some(id))
}

/// Returns the body to store for the given data: every field except `id`.
pub fn stored_body(data: &Fields) -> Fields {
    data.iter()
        .filter(|(key, _)| key.as_str() != ID_PROPERTY)
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}
