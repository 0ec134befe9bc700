//! Filter construction for connector queries.
//!
//! A [`Filter`] combines a predicate ([`Where`]), an ordering ([`Order`]), pagination
//! (`skip`/`limit`) and a field [`Projection`]. Filters can be built with the fluent
//! [`FilterBuilder`] or deserialized from the JSON shape used by ORM layers:
//!
//! ```ignore
//! use firelayer_core::query::{Filter, Where, Direction};
//! use serde_json::json;
//!
//! let built = Filter::builder()
//!     .predicate(Where::new().lt("age", 30).eq("type", "Animal"))
//!     .order("age", Direction::Desc)
//!     .limit(10)
//!     .build();
//!
//! let parsed = Filter::from_value(json!({
//!     "where": { "age": { "lt": 30 }, "type": "Animal" },
//!     "order": "age DESC",
//!     "limit": 10,
//! }))?;
//! ```
//!
//! # Predicates
//!
//! Each predicate key constrains one top-level property and keys are ANDed. A plain value
//! means equality. An object with exactly one operator key applies that operator:
//!
//! - Relational: `lt`, `lte`, `gt`, `gte`
//! - Inequality: `ne`
//! - Array: `in` (ordered, element-wise equality against an array property)
//!
//! Any other object is compared as a literal value.

use serde::Deserialize;
use serde_json::{Map, Value};
use std::{collections::BTreeSet, fmt, str::FromStr};

use crate::{
    error::{ConnectorError, ConnectorResult},
    path::validate_key,
    record::ID_PROPERTY,
};

/// Sort direction for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Ascending order.
    #[default]
    Asc,
    /// Descending order.
    Desc,
}

/// Sort specification: one property and a direction.
///
/// Parsed from tokens of the form `"property"`, `"property ASC"` or `"property DESC"`
/// (direction is case-insensitive).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct Order {
    /// The property to sort by.
    pub property: String,
    /// The sort direction.
    pub direction: Direction,
}

impl FromStr for Order {
    type Err = ConnectorError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let mut parts = token.split_whitespace();

        let property = parts
            .next()
            .ok_or_else(|| ConnectorError::InvalidArgument("empty order token".into()))?;
        let direction = match parts.next() {
            None => Direction::Asc,
            Some(d) if d.eq_ignore_ascii_case("asc") => Direction::Asc,
            Some(d) if d.eq_ignore_ascii_case("desc") => Direction::Desc,
            Some(d) => {
                return Err(ConnectorError::InvalidArgument(format!(
                    "unknown sort direction {d:?} in {token:?}"
                )));
            }
        };

        if parts.next().is_some() {
            return Err(ConnectorError::InvalidArgument(format!(
                "order token {token:?} must be \"property [ASC|DESC]\""
            )));
        }

        validate_key(property)?;

        Ok(Order { property: property.to_string(), direction })
    }
}

impl TryFrom<String> for Order {
    type Error = ConnectorError;

    fn try_from(token: String) -> Result<Self, Self::Error> {
        token.parse()
    }
}

/// Comparison operators available in predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// Less than.
    Lt,
    /// Less than or equal to.
    Lte,
    /// Greater than.
    Gt,
    /// Greater than or equal to.
    Gte,
    /// Not equal to.
    Ne,
    /// Array property equal, element-wise and in order, to the given array.
    In,
}

impl Operator {
    /// All operators, in the order of their wire names.
    pub const ALL: [Operator; 6] = [
        Operator::Lt,
        Operator::Lte,
        Operator::Gt,
        Operator::Gte,
        Operator::Ne,
        Operator::In,
    ];

    /// The operator's key in JSON predicates.
    pub fn name(self) -> &'static str {
        match self {
            Operator::Lt => "lt",
            Operator::Lte => "lte",
            Operator::Gt => "gt",
            Operator::Gte => "gte",
            Operator::Ne => "ne",
            Operator::In => "in",
        }
    }

    /// Looks up an operator by its JSON key.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.name() == name)
    }
}

/// The constraint a predicate places on one property.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// The property equals the value.
    Eq(Value),
    /// The property satisfies the operator against the value.
    Op(Operator, Value),
}

impl Condition {
    fn to_value(&self) -> Value {
        match self {
            Condition::Eq(value) => value.clone(),
            Condition::Op(op, value) => {
                Value::Object(Map::from_iter([(op.name().to_string(), value.clone())]))
            }
        }
    }
}

/// A predicate: one [`Condition`] per property, combined with logical AND.
///
/// Properties keep the order in which they were added. A deserialized predicate holds them
/// in the key order of `serde_json::Map`, which is alphabetical. Setting a condition on a
/// property that already has one replaces it.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(try_from = "Map<String, Value>")]
pub struct Where {
    conditions: Vec<(String, Condition)>,
}

impl Where {
    /// Creates an empty predicate that matches every record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a predicate selecting the record with the given id.
    pub fn id(id: impl Into<String>) -> Self {
        Self::new().eq(ID_PROPERTY, Value::String(id.into()))
    }

    /// Sets a condition on `property`.
    ///
    /// Integer operands of `id` equality and inequality are compared as the decimal key
    /// they are stored under.
    pub fn with(mut self, property: impl Into<String>, condition: Condition) -> Self {
        let property = property.into();
        let condition = if property == ID_PROPERTY {
            id_condition(condition)
        } else {
            condition
        };

        match self.conditions.iter_mut().find(|(p, _)| *p == property) {
            Some((_, existing)) => *existing = condition,
            None => self.conditions.push((property, condition)),
        }

        self
    }

    /// Requires `property` to equal `value`.
    pub fn eq(self, property: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(property, Condition::Eq(value.into()))
    }

    /// Requires `property` to be less than `value`.
    pub fn lt(self, property: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(property, Condition::Op(Operator::Lt, value.into()))
    }

    /// Requires `property` to be less than or equal to `value`.
    pub fn lte(self, property: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(property, Condition::Op(Operator::Lte, value.into()))
    }

    /// Requires `property` to be greater than `value`.
    pub fn gt(self, property: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(property, Condition::Op(Operator::Gt, value.into()))
    }

    /// Requires `property` to be greater than or equal to `value`.
    pub fn gte(self, property: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(property, Condition::Op(Operator::Gte, value.into()))
    }

    /// Requires `property` to differ from `value`. Records lacking the property still
    /// do not match.
    pub fn ne(self, property: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(property, Condition::Op(Operator::Ne, value.into()))
    }

    /// Requires the array `property` to equal `values` element-wise and in order.
    pub fn is_in(self, property: impl Into<String>, values: Vec<Value>) -> Self {
        self.with(property, Condition::Op(Operator::In, Value::Array(values)))
    }

    /// The conditions in insertion order.
    pub fn conditions(&self) -> &[(String, Condition)] {
        &self.conditions
    }

    /// Whether the predicate has no conditions.
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// The id this predicate selects by equality, if any.
    pub fn id_eq(&self) -> Option<String> {
        self.conditions.iter().find_map(|(property, condition)| {
            match (property.as_str(), condition) {
                (ID_PROPERTY, Condition::Eq(Value::String(id))) => Some(id.clone()),
                _ => None,
            }
        })
    }

    /// The first equality condition the store's single-property index can serve:
    /// a non-`id` property compared to a string, number or boolean.
    pub fn indexable(&self) -> Option<(&str, &Value)> {
        self.conditions.iter().find_map(|(property, condition)| match condition {
            Condition::Eq(value @ (Value::String(_) | Value::Number(_) | Value::Bool(_)))
                if property != ID_PROPERTY =>
            {
                Some((property.as_str(), value))
            }
            _ => None,
        })
    }

    /// Renders the predicate in its JSON form.
    pub fn to_value(&self) -> Value {
        Value::Object(
            self.conditions
                .iter()
                .map(|(property, condition)| (property.clone(), condition.to_value()))
                .collect(),
        )
    }
}

impl fmt::Display for Where {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "matching {}", self.to_value())
    }
}

impl TryFrom<Map<String, Value>> for Where {
    type Error = ConnectorError;

    fn try_from(map: Map<String, Value>) -> Result<Self, Self::Error> {
        let mut predicate = Where::new();

        for (property, value) in map {
            validate_key(&property)?;
            let condition = parse_condition(&property, value)?;
            predicate = predicate.with(property, condition);
        }

        Ok(predicate)
    }
}

impl TryFrom<Value> for Where {
    type Error = ConnectorError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => map.try_into(),
            other => Err(ConnectorError::InvalidArgument(format!(
                "where clause must be an object, got {other}"
            ))),
        }
    }
}

fn id_condition(condition: Condition) -> Condition {
    let as_key = |value: Value| match value {
        Value::Number(n) if n.is_i64() || n.is_u64() => Value::String(n.to_string()),
        other => other,
    };

    match condition {
        Condition::Eq(value) => Condition::Eq(as_key(value)),
        Condition::Op(Operator::Ne, value) => Condition::Op(Operator::Ne, as_key(value)),
        other => other,
    }
}

fn parse_condition(property: &str, value: Value) -> ConnectorResult<Condition> {
    let Value::Object(map) = value else {
        return Ok(Condition::Eq(value));
    };

    let operator = match map.iter().next() {
        Some((key, _)) if map.len() == 1 => Operator::from_name(key),
        _ => None,
    };

    match operator {
        Some(Operator::In) => match map.into_iter().next() {
            Some((_, array @ Value::Array(_))) => Ok(Condition::Op(Operator::In, array)),
            _ => Err(ConnectorError::InvalidArgument(format!(
                "operator \"in\" on {property} requires an array"
            ))),
        },
        Some(op) => Ok(Condition::Op(
            op,
            map.into_iter()
                .next()
                .map(|(_, operand)| operand)
                .unwrap_or(Value::Null),
        )),
        None => Ok(Condition::Eq(Value::Object(map))),
    }
}

/// Field projection: which properties each returned record keeps.
///
/// With at least one included property, only included properties are kept. With only
/// excluded properties, everything except them is kept. The `id` is kept unless it is
/// excluded by name.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "Value")]
pub struct Projection {
    include: BTreeSet<String>,
    exclude: BTreeSet<String>,
}

impl Projection {
    /// Creates a projection that keeps every property.
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps `property`.
    pub fn include(mut self, property: impl Into<String>) -> Self {
        let property = property.into();
        self.exclude.remove(&property);
        self.include.insert(property);
        self
    }

    /// Drops `property`.
    pub fn exclude(mut self, property: impl Into<String>) -> Self {
        let property = property.into();
        self.include.remove(&property);
        self.exclude.insert(property);
        self
    }

    /// Whether the projection keeps every property.
    pub fn is_identity(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }

    /// Whether `property` survives the projection.
    pub fn keeps(&self, property: &str) -> bool {
        if self.exclude.contains(property) {
            return false;
        }

        property == ID_PROPERTY || self.include.is_empty() || self.include.contains(property)
    }
}

impl TryFrom<Value> for Projection {
    type Error = ConnectorError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => map.into_iter().try_fold(Projection::new(), |acc, (property, flag)| {
                match flag {
                    Value::Bool(true) => Ok(acc.include(property)),
                    Value::Bool(false) => Ok(acc.exclude(property)),
                    other => Err(ConnectorError::InvalidArgument(format!(
                        "fields.{property} must be true or false, got {other}"
                    ))),
                }
            }),
            Value::Array(items) => items.into_iter().try_fold(Projection::new(), |acc, item| match item {
                Value::String(property) => Ok(acc.include(property)),
                other => Err(ConnectorError::InvalidArgument(format!(
                    "fields entries must be property names, got {other}"
                ))),
            }),
            other => Err(ConnectorError::InvalidArgument(format!(
                "fields must be an object or an array, got {other}"
            ))),
        }
    }
}

/// A complete query: predicate, ordering, pagination and projection.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct Filter {
    /// Records must satisfy every condition.
    #[serde(rename = "where", default)]
    pub predicate: Option<Where>,
    /// Sort specification applied after filtering.
    #[serde(default)]
    pub order: Option<Order>,
    /// Maximum number of records to return.
    #[serde(default)]
    pub limit: Option<usize>,
    /// Number of records to skip.
    #[serde(default, alias = "offset")]
    pub skip: Option<usize>,
    /// Properties to keep in each record.
    #[serde(default)]
    pub fields: Option<Projection>,
}

impl Filter {
    /// Creates an empty filter selecting every record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder for fluent construction.
    pub fn builder() -> FilterBuilder {
        FilterBuilder::new()
    }

    /// Parses a filter from its JSON form.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::InvalidArgument`] describing the first malformed part.
    pub fn from_value(value: Value) -> ConnectorResult<Self> {
        serde_json::from_value(value)
            .map_err(|e| ConnectorError::InvalidArgument(format!("invalid filter: {e}")))
    }
}

#[derive(Debug, Clone, Default)]
pub struct FilterBuilder {
    filter: Filter,
}

impl FilterBuilder {
    /// Creates a new filter builder.
    pub fn new() -> Self {
        FilterBuilder { filter: Filter::default() }
    }

    /// Sets the predicate.
    pub fn predicate(mut self, predicate: Where) -> Self {
        self.filter.predicate = Some(predicate);
        self
    }

    /// Sets the ordering.
    pub fn order(mut self, property: impl Into<String>, direction: Direction) -> Self {
        self.filter.order = Some(Order { property: property.into(), direction });
        self
    }

    /// Sets the maximum number of records to return.
    pub fn limit(mut self, limit: usize) -> Self {
        self.filter.limit = Some(limit);
        self
    }

    /// Sets the number of records to skip.
    pub fn skip(mut self, skip: usize) -> Self {
        self.filter.skip = Some(skip);
        self
    }

    /// Sets the projection.
    pub fn fields(mut self, fields: Projection) -> Self {
        self.filter.fields = Some(fields);
        self
    }

    /// Builds and returns the final filter.
    pub fn build(self) -> Filter {
        self.filter
    }
}
