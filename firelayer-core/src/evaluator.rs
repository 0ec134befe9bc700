//! Predicate evaluation over in-memory records.
//!
//! The store can constrain at most one property per request, so every predicate is evaluated
//! here against the fetched records. Operators are looked up in a fixed table of comparator
//! functions.

use serde_json::{Map, Value};
use std::cmp::Ordering;

use crate::{
    query::{Condition, Operator, Where},
    record::Record,
};

/// Comparable view of a JSON value.
///
/// Numbers are normalized to `f64` so that `28` and `28.0` compare equal.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    Null,
    Bool(bool),
    Number(f64),
    String(&'a str),
    Array(Vec<Comparable<'a>>),
    Map(&'a Map<String, Value>),
}

impl<'a> From<&'a Value> for Comparable<'a> {
    fn from(value: &'a Value) -> Self {
        match value {
            Value::Null => Comparable::Null,
            Value::Bool(value) => Comparable::Bool(*value),
            Value::Number(value) => value
                .as_f64()
                .map(Comparable::Number)
                .unwrap_or(Comparable::Null),
            Value::String(value) => Comparable::String(value),
            Value::Array(items) => Comparable::Array(
                items
                    .iter()
                    .map(Comparable::from)
                    .collect::<Vec<_>>()
            ),
            Value::Object(map) => Comparable::Map(map),
        }
    }
}

impl<'a> PartialEq for Comparable<'a> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => {
                a.len() == b.len()
                    && a.iter().all(|(key, left)| {
                        b.get(key)
                            .is_some_and(|right| Comparable::from(left) == Comparable::from(right))
                    })
            }
            _ => false,
        }
    }
}

/// The string form used when values are compared as strings: strings verbatim, every other
/// value as its JSON text.
pub(crate) fn string_form(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Relational ordering: numeric when both sides are numbers, otherwise by string form.
fn relational(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        _ => Some(string_form(left).cmp(&string_form(right))),
    }
}

fn equals(field: &Value, operand: &Value) -> bool {
    Comparable::from(field) == Comparable::from(operand)
}

fn lt(field: &Value, operand: &Value) -> bool {
    relational(field, operand) == Some(Ordering::Less)
}

fn lte(field: &Value, operand: &Value) -> bool {
    matches!(relational(field, operand), Some(Ordering::Less | Ordering::Equal))
}

fn gt(field: &Value, operand: &Value) -> bool {
    relational(field, operand) == Some(Ordering::Greater)
}

fn gte(field: &Value, operand: &Value) -> bool {
    matches!(relational(field, operand), Some(Ordering::Greater | Ordering::Equal))
}

fn ne(field: &Value, operand: &Value) -> bool {
    !equals(field, operand)
}

/// Ordered, element-wise equality. Not a membership test.
fn same_sequence(field: &Value, operand: &Value) -> bool {
    match (field, operand) {
        (Value::Array(_), Value::Array(_)) => equals(field, operand),
        _ => false,
    }
}

type Comparator = fn(&Value, &Value) -> bool;

/// Operator to comparator table.
const COMPARATORS: [(Operator, Comparator); 6] = [
    (Operator::Lt, lt),
    (Operator::Lte, lte),
    (Operator::Gt, gt),
    (Operator::Gte, gte),
    (Operator::Ne, ne),
    (Operator::In, same_sequence),
];

fn comparator(op: Operator) -> Comparator {
    COMPARATORS
        .iter()
        .find_map(|(candidate, f)| (*candidate == op).then_some(*f))
        .unwrap_or(|_, _| false)
}

/// Evaluates predicates against records.
pub(crate) struct RecordEvaluator<'a> {
    record: &'a Record,
}

impl<'a> RecordEvaluator<'a> {
    pub fn new(record: &'a Record) -> Self {
        Self { record }
    }

    /// Whether the record satisfies every condition. A record lacking a constrained
    /// property never matches.
    pub fn matches(&self, predicate: &Where) -> bool {
        predicate
            .conditions()
            .iter()
            .all(|(property, condition)| self.satisfies(property, condition))
    }

    fn satisfies(&self, property: &str, condition: &Condition) -> bool {
        let Some(field) = self.record.property(property) else {
            return false;
        };

        match condition {
            Condition::Eq(operand) => equals(&field, operand),
            Condition::Op(op, operand) => comparator(*op)(&field, operand),
        }
    }

    /// Keeps the records that satisfy `predicate`, preserving their order.
    pub fn filter_records(
        records: impl IntoIterator<Item = Record>,
        predicate: &Where,
    ) -> Vec<Record> {
        records
            .into_iter()
            .filter(|record| RecordEvaluator::new(record).matches(predicate))
            .collect::<Vec<_>>()
    }
}
