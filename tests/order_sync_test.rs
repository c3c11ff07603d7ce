use anyhow::Result;
use httpmock::prelude::*;
use httpmock::Method::PATCH;
use purchase_tagger::domain::model::{AbortReason, LineItem};
use purchase_tagger::{
    subscriber_hash, InMemoryTagMetadata, MailchimpConnector, Order, OrderStatus,
    OrderStatusChange, OrderTagSync, SyncOutcome, TomlSettings,
};
use std::collections::HashMap;
use tempfile::TempDir;

fn settings(global_tag: &str) -> TomlSettings {
    let mut settings = TomlSettings::default();
    settings.insert("api_key", "secret-us6");
    settings.insert("audience_id", "aud1");
    settings.insert("global_tag", global_tag);
    settings
}

fn order(items: Vec<LineItem>) -> Order {
    Order {
        id: 501,
        status: OrderStatus::Processing,
        previous_status: Some(OrderStatus::Pending),
        billing_email: "a@x.com".to_string(),
        billing_first_name: "Ada".to_string(),
        billing_last_name: "Lovelace".to_string(),
        items,
        meta: HashMap::new(),
    }
}

fn item(product_id: u64, variation_id: Option<u64>, name: &str) -> LineItem {
    LineItem {
        product_id,
        variation_id,
        name: name.to_string(),
    }
}

fn member_path() -> String {
    format!("/lists/aud1/members/{}", subscriber_hash("a@x.com"))
}

/// pending -> processing, unknown member, one tagged product.
#[tokio::test]
async fn test_new_customer_is_created_then_tagged() {
    let server = MockServer::start();
    let get_mock = server.mock(|when, then| {
        when.method(GET).path(member_path());
        then.status(404).json_body(serde_json::json!({
            "title": "Resource Not Found",
            "status": 404,
            "detail": "The requested resource could not be found."
        }));
    });
    let put_mock = server.mock(|when, then| {
        when.method(PUT)
            .path(member_path())
            .json_body(serde_json::json!({
                "email_address": "a@x.com",
                "status_if_new": "transactional",
                "merge_fields": {"FNAME": "Ada", "LNAME": "Lovelace"}
            }));
        then.status(200).json_body(serde_json::json!({"status": "transactional"}));
    });
    let tags_mock = server.mock(|when, then| {
        when.method(POST)
            .path(format!("{}/tags", member_path()))
            .json_body(serde_json::json!({
                "tags": [{"name": "Course-Jan", "status": "active"}]
            }));
        then.status(204);
    });

    let connector = MailchimpConnector::new().with_base_url(server.base_url());
    let settings = settings("");
    let order = order(vec![item(10, None, "January Course")]);
    let tags = InMemoryTagMetadata::new().with_product_tag(10, "Course-Jan");

    let outcome = OrderTagSync::new(&connector, &settings, &order, &tags)
        .handle(&OrderStatusChange::new(501, "pending", "processing"))
        .await;

    get_mock.assert();
    put_mock.assert();
    tags_mock.assert();
    assert_eq!(
        outcome,
        SyncOutcome::Tagged {
            tags: vec!["Course-Jan".to_string()],
            member_created: true
        }
    );
}

/// processing -> processing re-save.
#[tokio::test]
async fn test_resave_in_processing_makes_no_requests() {
    let server = MockServer::start();
    let any_mock = server.mock(|when, then| {
        when.path_contains("/lists/");
        then.status(200).json_body(serde_json::json!({}));
    });

    let connector = MailchimpConnector::new().with_base_url(server.base_url());
    let settings = settings("Customer");
    let order = order(vec![item(10, None, "January Course")]);
    let tags = InMemoryTagMetadata::new().with_product_tag(10, "Course-Jan");

    let outcome = OrderTagSync::new(&connector, &settings, &order, &tags)
        .handle(&OrderStatusChange::new(501, "processing", "processing"))
        .await;

    assert!(outcome.is_skip());
    assert_eq!(any_mock.hits(), 0);
}

/// Existing member with matching names, nothing tagged.
#[tokio::test]
async fn test_existing_member_without_tags_only_looks_up() {
    let server = MockServer::start();
    let get_mock = server.mock(|when, then| {
        when.method(GET).path(member_path());
        then.status(200).json_body(serde_json::json!({
            "email_address": "a@x.com",
            "status": "subscribed",
            "merge_fields": {"FNAME": "Ada", "LNAME": "Lovelace"}
        }));
    });
    let write_mocks = [PATCH, PUT, POST].map(|method| {
        server.mock(|when, then| {
            when.method(method).path_contains("/lists/aud1/members/");
            then.status(200);
        })
    });

    let connector = MailchimpConnector::new().with_base_url(server.base_url());
    let settings = settings("");
    let order = order(vec![item(10, None, "Mug"), item(11, Some(12), "Shirt")]);
    let tags = InMemoryTagMetadata::new();

    let outcome = OrderTagSync::new(&connector, &settings, &order, &tags)
        .handle(&OrderStatusChange::from_order(&order))
        .await;

    get_mock.assert();
    assert!(write_mocks.iter().all(|mock| mock.hits() == 0));
    assert_eq!(outcome, SyncOutcome::NothingToTag { member_exists: true });
}

#[tokio::test]
async fn test_failed_upsert_never_tags() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path(member_path());
        then.status(404);
    });
    let put_mock = server.mock(|when, then| {
        when.method(PUT).path(member_path());
        then.status(400).json_body(serde_json::json!({
            "title": "Member In Compliance State",
            "status": 400,
            "detail": "a@x.com is in a compliance state due to unsubscribe, bounce, or compliance review and cannot be subscribed."
        }));
    });
    let tags_mock = server.mock(|when, then| {
        when.method(POST).path(format!("{}/tags", member_path()));
        then.status(204);
    });

    let connector = MailchimpConnector::new().with_base_url(server.base_url());
    let settings = settings("Customer");
    let order = order(vec![]);
    let tags = InMemoryTagMetadata::new();

    let outcome = OrderTagSync::new(&connector, &settings, &order, &tags)
        .handle(&OrderStatusChange::new(501, "on-hold", "processing"))
        .await;

    put_mock.assert();
    assert_eq!(tags_mock.hits(), 0);
    assert!(matches!(
        outcome,
        SyncOutcome::Aborted(AbortReason::UpsertFailed { ref message }) if message.contains("400")
    ));
}

#[tokio::test]
async fn test_changed_name_is_patched_and_tags_deduplicated() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path(member_path());
        then.status(200).json_body(serde_json::json!({
            "status": "unsubscribed",
            "merge_fields": {"FNAME": "ADA", "LNAME": "Lovelace"}
        }));
    });
    let patch_mock = server.mock(|when, then| {
        when.method(PATCH)
            .path(member_path())
            .json_body(serde_json::json!({
                "merge_fields": {"FNAME": "Ada", "LNAME": "Lovelace"}
            }));
        then.status(200).json_body(serde_json::json!({}));
    });
    let put_mock = server.mock(|when, then| {
        when.method(PUT).path(member_path());
        then.status(200);
    });
    let tags_mock = server.mock(|when, then| {
        when.method(POST)
            .path(format!("{}/tags", member_path()))
            .json_body(serde_json::json!({
                "tags": [
                    {"name": "VIP", "status": "active"},
                    {"name": "Size-L", "status": "active"}
                ]
            }));
        then.status(204);
    });

    let connector = MailchimpConnector::new().with_base_url(server.base_url());
    let settings = settings("VIP");
    let order = order(vec![item(10, Some(21), "Shirt"), item(30, None, "Hat")]);
    let tags = InMemoryTagMetadata::new()
        .with_product_tag(10, "VIP")
        .with_variation_tag(21, "Size-L")
        .with_product_tag(30, "VIP");
    let sync = OrderTagSync::new(&connector, &settings, &order, &tags);

    let event = OrderStatusChange::new(501, "pending", "processing");
    let first = sync.handle(&event).await;
    let second = sync.handle(&event).await;

    assert_eq!(first, second);
    assert_eq!(patch_mock.hits(), 2);
    assert_eq!(put_mock.hits(), 0);
    assert_eq!(tags_mock.hits(), 2);
}

#[tokio::test]
async fn test_bad_api_key_aborts_without_requests() {
    let connector = MailchimpConnector::new();
    let mut settings = settings("");
    settings.insert("api_key", "no-datacenter-");
    let order = order(vec![item(10, None, "Course")]);
    let tags = InMemoryTagMetadata::new().with_product_tag(10, "Course-Jan");

    let outcome = OrderTagSync::new(&connector, &settings, &order, &tags)
        .handle(&OrderStatusChange::new(501, "pending", "processing"))
        .await;

    assert!(matches!(
        outcome,
        SyncOutcome::Aborted(AbortReason::ClientUnavailable { .. })
    ));
}

/// Settings, tag metadata and order loaded from files, as the CLI does.
#[tokio::test]
async fn test_sync_from_files() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let server = MockServer::start();

    let settings_path = temp_dir.path().join("settings.toml");
    std::fs::write(
        &settings_path,
        r#"
api_key = "secret-us6"
list_id = "aud1"
global_tag = "Customer"
"#,
    )?;
    let tags_path = temp_dir.path().join("tags.toml");
    std::fs::write(
        &tags_path,
        r#"
[variations]
2001 = "Size-L"
"#,
    )?;
    let order_path = temp_dir.path().join("order.json");
    std::fs::write(
        &order_path,
        serde_json::to_string(&serde_json::json!({
            "id": 501,
            "status": "wc-processing",
            "previous_status": "pending",
            "billing_email": "A@X.com",
            "billing_first_name": "Ada",
            "billing_last_name": "Lovelace",
            "items": [{"product_id": 20, "variation_id": 2001, "name": "Shirt - L"}]
        }))?,
    )?;

    server.mock(|when, then| {
        when.method(GET).path(member_path());
        then.status(404);
    });
    let put_mock = server.mock(|when, then| {
        when.method(PUT).path(member_path());
        then.status(200).json_body(serde_json::json!({"status": "transactional"}));
    });
    let tags_mock = server.mock(|when, then| {
        when.method(POST)
            .path(format!("{}/tags", member_path()))
            .json_body(serde_json::json!({
                "tags": [
                    {"name": "Size-L", "status": "active"},
                    {"name": "Customer", "status": "active"}
                ]
            }));
        then.status(204);
    });

    let settings = TomlSettings::from_file(&settings_path)?;
    let tags = InMemoryTagMetadata::from_file(&tags_path)?;
    let order: Order = serde_json::from_str(&std::fs::read_to_string(&order_path)?)?;
    let connector = MailchimpConnector::new().with_base_url(server.base_url());

    let outcome = OrderTagSync::new(&connector, &settings, &order, &tags)
        .handle(&OrderStatusChange::from_order(&order))
        .await;

    put_mock.assert();
    tags_mock.assert();
    assert_eq!(
        outcome,
        SyncOutcome::Tagged {
            tags: vec!["Size-L".to_string(), "Customer".to_string()],
            member_created: true
        }
    );
    Ok(())
}
