mod common;

use firelayer::{memory::StoreOp, prelude::*};
use serde_json::json;

use common::*;

#[tokio::test]
async fn create_drops_null_fields_and_rejects_empty_data() {
    let (connector, store) = connector();

    let record = connector
        .create(&ctx(), CUSTOMER, fields(json!({ "name": "A", "nickname": null })))
        .await
        .unwrap();
    assert_eq!(record.fields, fields(json!({ "name": "A" })));
    assert_eq!(
        store.contents().await[CUSTOMER][record.id().unwrap()],
        json!({ "name": "A" })
    );

    let err = connector
        .create(&ctx(), CUSTOMER, fields(json!({ "nickname": null })))
        .await
        .unwrap_err();
    assert!(matches!(err, ConnectorError::InvalidArgument(_)));
}

#[tokio::test]
async fn create_with_an_id_upserts() {
    let (connector, store) = connector();

    connector
        .create(&ctx(), CUSTOMER, fields(json!({ "id": "k1", "name": "A", "age": 1 })))
        .await
        .unwrap();
    let replaced = connector
        .save(&ctx(), CUSTOMER, fields(json!({ "id": "k1", "name": "B" })))
        .await
        .unwrap();

    assert_eq!(replaced.into_value(), json!({ "id": "k1", "name": "B" }));
    assert_eq!(store.contents().await, json!({ "customer": { "k1": { "name": "B" } } }));
}

#[tokio::test]
async fn invalid_ids_are_rejected_before_any_write() {
    let (connector, store) = connector();

    let err = connector
        .create(&ctx(), CUSTOMER, fields(json!({ "id": "a/b", "name": "A" })))
        .await
        .unwrap_err();

    assert!(matches!(err, ConnectorError::InvalidArgument(_)));
    assert!(store.calls().await.is_empty());
}

#[tokio::test]
async fn replace_by_id_requires_an_existing_record() {
    let (connector, _) = seeded(json!({ "customer": { "k1": { "name": "A", "age": 1 } } })).await;

    let replaced = connector
        .replace_by_id(&ctx(), CUSTOMER, "k1", fields(json!({ "name": "Z" })))
        .await
        .unwrap();
    assert_eq!(replaced.into_value(), json!({ "id": "k1", "name": "Z" }));

    let err = connector
        .replace_by_id(&ctx(), CUSTOMER, "k2", fields(json!({ "name": "Z" })))
        .await
        .unwrap_err();
    assert_eq!(err, ConnectorError::NotFound("k2".into(), CUSTOMER.into()));
}

#[tokio::test]
async fn replace_or_create_writes_under_the_given_id() {
    let (connector, _) = connector();

    let created = connector
        .replace_or_create(&ctx(), CUSTOMER, fields(json!({ "id": 7, "name": "A" })))
        .await
        .unwrap();
    assert_eq!(created.id(), Some("7"));

    let generated = connector
        .replace_or_create(&ctx(), CUSTOMER, fields(json!({ "name": "B" })))
        .await
        .unwrap();
    assert_eq!(generated.id().map(str::len), Some(20));
}

#[tokio::test]
async fn destroy_by_id_reports_missing_records() {
    let (connector, _) = seeded(json!({ "customer": { "k1": { "name": "A" } } })).await;

    let deleted = connector.destroy_by_id(&ctx(), CUSTOMER, "k1").await.unwrap();
    assert_eq!(deleted.count, Some(1));

    let err = connector.destroy_by_id(&ctx(), CUSTOMER, "k1").await.unwrap_err();
    assert_eq!(err, ConnectorError::NotFound("k1".into(), CUSTOMER.into()));

    let err = connector.destroy_by_id(&ctx(), CUSTOMER, "").await.unwrap_err();
    assert!(matches!(err, ConnectorError::InvalidArgument(_)));
}

#[tokio::test]
async fn destroy_all_removes_every_match_in_one_patch() {
    let (connector, store) = seeded(json!({
        "customer": {
            "k1": { "age": 10 },
            "k2": { "age": 40 },
            "k3": { "age": 20 },
        }
    }))
    .await;
    store.clear_calls().await;

    let deleted = connector
        .destroy_all(&ctx(), CUSTOMER, Some(Where::new().lt("age", 30)))
        .await
        .unwrap();

    assert_eq!(deleted.count, Some(2));
    assert_eq!(store.contents().await, json!({ "customer": { "k2": { "age": 40 } } }));
    assert_eq!(
        store.calls().await.iter().map(|call| call.op).collect::<Vec<_>>(),
        [StoreOp::ReadCollection, StoreOp::PatchMulti]
    );

    let deleted = connector
        .destroy_all(&ctx(), CUSTOMER, Some(Where::new().lt("age", 30)))
        .await
        .unwrap();
    assert_eq!(deleted.count, Some(0));
}

#[tokio::test]
async fn destroy_all_by_id_checks_remaining_conditions() {
    let (connector, store) = seeded(json!({ "customer": { "k1": { "age": 10 } } })).await;

    let deleted = connector
        .destroy_all(&ctx(), CUSTOMER, Some(Where::id("k1").gt("age", 50)))
        .await
        .unwrap();
    assert_eq!(deleted.count, Some(0));
    assert_eq!(store.contents().await, json!({ "customer": { "k1": { "age": 10 } } }));

    let err = connector
        .destroy_all(&ctx(), CUSTOMER, Some(Where::id("k9")))
        .await
        .unwrap_err();
    assert!(matches!(err, ConnectorError::NotFound(..)));
}

#[tokio::test]
async fn update_applies_every_field_to_every_match() {
    let (connector, store) = seeded(json!({
        "customer": {
            "k1": { "kind": "a", "name": "A", "age": 1 },
            "k2": { "kind": "b", "name": "B" },
            "k3": { "kind": "a", "name": "C" },
        }
    }))
    .await;

    let updated = connector
        .update(
            &ctx(),
            CUSTOMER,
            Where::new().eq("kind", "a"),
            fields(json!({ "id": "ignored", "vip": true, "age": null })),
        )
        .await
        .unwrap();

    assert_eq!(ids(&updated), ["k1", "k3"]);
    assert_eq!(
        store.contents().await,
        json!({
            "customer": {
                "k1": { "kind": "a", "name": "A", "vip": true },
                "k2": { "kind": "b", "name": "B" },
                "k3": { "kind": "a", "name": "C", "vip": true },
            }
        })
    );
}

#[tokio::test]
async fn update_requires_a_match_and_a_field() {
    let (connector, _) = seeded(json!({ "customer": { "k1": { "age": 1 } } })).await;

    let err = connector
        .update(&ctx(), CUSTOMER, Where::new().eq("age", 2), fields(json!({ "x": 1 })))
        .await
        .unwrap_err();
    assert!(matches!(err, ConnectorError::NotFound(..)));

    let err = connector
        .update(&ctx(), CUSTOMER, Where::new().eq("age", 1), fields(json!({ "id": "k2" })))
        .await
        .unwrap_err();
    assert!(matches!(err, ConnectorError::InvalidArgument(_)));
}

#[tokio::test]
async fn update_attributes_returns_the_stored_record() {
    let (connector, _) = seeded(json!({ "customer": { "k1": { "name": "A", "age": 1 } } })).await;

    let updated = connector
        .update_attributes(&ctx(), CUSTOMER, "k1", fields(json!({ "age": 2 })))
        .await
        .unwrap();
    assert_eq!(updated.into_value(), json!({ "id": "k1", "name": "A", "age": 2 }));

    let err = connector
        .update_attributes(&ctx(), CUSTOMER, "k2", fields(json!({ "age": 2 })))
        .await
        .unwrap_err();
    assert!(matches!(err, ConnectorError::NotFound(..)));
}

#[tokio::test]
async fn update_or_create_merges_into_existing_records() {
    let (connector, store) = seeded(json!({ "customer": { "k1": { "name": "A", "age": 1 } } })).await;

    let merged = connector
        .update_or_create(&ctx(), CUSTOMER, fields(json!({ "id": "k1", "age": 2 })))
        .await
        .unwrap();
    assert_eq!(merged.into_value(), json!({ "id": "k1", "name": "A", "age": 2 }));

    let created = connector
        .update_or_create(&ctx(), CUSTOMER, fields(json!({ "id": "k2", "name": "B" })))
        .await
        .unwrap();
    assert_eq!(created.id(), Some("k2"));

    assert_eq!(
        store.contents().await,
        json!({ "customer": { "k1": { "name": "A", "age": 2 }, "k2": { "name": "B" } } })
    );
}

#[tokio::test]
async fn find_or_create_returns_the_first_match() {
    let (connector, _) = seeded(json!({ "customer": { "k1": { "name": "A" } } })).await;
    let by_name = |name: &str| Filter::builder().predicate(Where::new().eq("name", name)).build();

    let found = connector
        .find_or_create(&ctx(), CUSTOMER, &by_name("A"), fields(json!({ "name": "A" })))
        .await
        .unwrap();
    assert_eq!(found.id(), Some("k1"));

    let created = connector
        .find_or_create(&ctx(), CUSTOMER, &by_name("B"), fields(json!({ "name": "B" })))
        .await
        .unwrap();
    assert_ne!(created.id(), Some("k1"));
    assert_eq!(connector.count(&ctx(), CUSTOMER, None).await.unwrap(), 2);
}

#[tokio::test]
async fn update_or_create_without_an_id_pushes_a_new_record() {
    let (connector, store) = connector();

    let created = connector
        .update_or_create(&ctx(), CUSTOMER, fields(json!({ "name": "A" })))
        .await
        .unwrap();
    let id = created.id().unwrap();
    assert_eq!(id.len(), 20);
    assert_eq!(store.contents().await, json!({ "customer": { id: { "name": "A" } } }));
}

#[tokio::test]
async fn update_or_create_with_only_an_id() {
    let (connector, store) = seeded(json!({ "customer": { "k1": { "name": "A" } } })).await;

    let existing = connector
        .update_or_create(&ctx(), CUSTOMER, fields(json!({ "id": "k1" })))
        .await
        .unwrap();
    assert_eq!(existing.into_value(), json!({ "id": "k1", "name": "A" }));

    let err = connector
        .update_or_create(&ctx(), CUSTOMER, fields(json!({ "id": "k2" })))
        .await
        .unwrap_err();
    assert!(matches!(err, ConnectorError::InvalidArgument(_)));

    assert_eq!(store.contents().await, json!({ "customer": { "k1": { "name": "A" } } }));
}
