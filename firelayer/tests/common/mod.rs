#![allow(dead_code)]

use firelayer::{
    memory::InMemoryStore,
    prelude::*,
};
use serde_json::Value;

pub const CUSTOMER: &str = "customer";

pub fn ctx() -> CallContext {
    CallContext::background()
}

pub fn fields(value: Value) -> Fields {
    value.as_object().cloned().expect("test data must be an object")
}

pub fn connector() -> (Connector<InMemoryStore>, InMemoryStore) {
    connector_with(LimitStrategy::AfterFilter)
}

pub fn connector_with(strategy: LimitStrategy) -> (Connector<InMemoryStore>, InMemoryStore) {
    let store = InMemoryStore::new();
    let connector = Connector::builder(store.clone())
        .model(CUSTOMER)
        .limit_strategy(strategy)
        .build()
        .expect("valid registry");

    (connector, store)
}

pub async fn seeded(data: Value) -> (Connector<InMemoryStore>, InMemoryStore) {
    let store = InMemoryStore::builder()
        .data(data)
        .build()
        .await
        .expect("valid seed data");
    let connector = Connector::builder(store.clone())
        .model(CUSTOMER)
        .build()
        .expect("valid registry");

    (connector, store)
}

pub fn ids(records: &[Record]) -> Vec<&str> {
    records.iter().filter_map(Record::id).collect()
}

pub fn filter(value: Value) -> Filter {
    Filter::from_value(value).expect("valid filter")
}
