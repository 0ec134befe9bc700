//! Ordering of query results.
//!
//! Records are compared by the string form of the sort property, also for numbers, so
//! `"4"` sorts after `"28"`. Records without the property compare as the empty string.
//! The sort is stable: ties keep the order in which records were fetched.

use std::cmp::Reverse;

use crate::{
    evaluator::string_form,
    query::{Direction, Order},
    record::Record,
};

/// Sorts `records` in place according to `order`.
pub fn sort_records(records: &mut [Record], order: &Order) {
    match order.direction {
        Direction::Asc => records.sort_by_cached_key(|record| sort_key(record, &order.property)),
        Direction::Desc => {
            records.sort_by_cached_key(|record| Reverse(sort_key(record, &order.property)))
        }
    }
}

fn sort_key(record: &Record, property: &str) -> String {
    record
        .property(property)
        .map(|value| string_form(&value))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn record(id: &str, value: Value) -> Record {
        Record::from_stored(id, value).unwrap()
    }

    fn ids(records: &[Record]) -> Vec<&str> {
        records.iter().filter_map(Record::id).collect()
    }

    fn order(token: &str) -> Order {
        token.parse().unwrap()
    }

    #[test]
    fn numbers_sort_by_string_form() {
        let mut records = vec![
            record("a", json!({ "age": 28 })),
            record("b", json!({ "age": 4 })),
            record("c", json!({ "age": 100 })),
        ];

        sort_records(&mut records, &order("age DESC"));
        assert_eq!(ids(&records), ["b", "a", "c"]);

        sort_records(&mut records, &order("age ASC"));
        assert_eq!(ids(&records), ["c", "a", "b"]);
    }

    #[test]
    fn ties_keep_fetch_order_in_both_directions() {
        let mut records = vec![
            record("a", json!({ "type": "Animal" })),
            record("b", json!({ "type": "Person" })),
            record("c", json!({ "type": "Animal" })),
            record("d", json!({ "type": "Person" })),
        ];

        let mut ascending = records.clone();
        sort_records(&mut ascending, &order("type"));
        assert_eq!(ids(&ascending), ["a", "c", "b", "d"]);

        sort_records(&mut records, &order("type desc"));
        assert_eq!(ids(&records), ["b", "d", "a", "c"]);
    }

    #[test]
    fn missing_properties_sort_as_empty_strings() {
        let mut records = vec![
            record("a", json!({ "name": "Zed" })),
            record("b", json!({ "age": 1 })),
        ];

        sort_records(&mut records, &order("name"));
        assert_eq!(ids(&records), ["b", "a"]);
    }

    #[test]
    fn sorts_by_id() {
        let mut records = vec![record("k2", json!({})), record("k1", json!({}))];

        sort_records(&mut records, &order("id"));
        assert_eq!(ids(&records), ["k1", "k2"]);
    }
}
