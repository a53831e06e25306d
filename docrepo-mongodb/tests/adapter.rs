//! Integration tests against a live server.
//!
//! Run with `cargo test -p docrepo-mongodb -- --ignored`. The server is taken from
//! `DOCREPO_DSN` or `DBHOST`, defaulting to `mongodb://localhost:27017`.

use bson::{Document, doc, oid::ObjectId};

use docrepo_core::{
    adapter::{AdapterBuilder, StoreAdapter},
    error::RepoError,
    filter::Filter,
    index::IndexSpec,
    options::{ChangeInfo, Options},
    repository::{BaseRepository, Repository},
};
use docrepo_mongodb::{MongoDbAdapter, MongoDbConfig};

async fn adapter() -> MongoDbAdapter {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    // Every test gets its own collection so tests can run in parallel.
    let collection = format!("users_{}", ObjectId::new().to_hex());
    let config = MongoDbConfig::from_env(&collection).unwrap();

    let adapter = config.builder().build().await.unwrap();
    adapter
        .setup(&[
            IndexSpec::new(["email"]).unique(),
            IndexSpec::new(["login_name"]).unique(),
        ])
        .await
        .unwrap();

    adapter
}

async fn seed(adapter: &MongoDbAdapter, n: i32) {
    for i in 1..=n {
        adapter
            .create(doc! {
                "name": format!("user {i}"),
                "email": format!("user{i}@example.com"),
                "login_name": format!("user{i}"),
                "age": 20 + i,
            })
            .await
            .unwrap();
    }
}

async fn teardown(adapter: MongoDbAdapter) {
    adapter
        .client()
        .database(adapter.database())
        .collection::<Document>(adapter.collection())
        .drop()
        .await
        .unwrap();
    adapter.shutdown().await.unwrap();
}

#[tokio::test]
#[ignore]
async fn test_get_all_skip_limit_count() {
    let adapter = adapter().await;
    seed(&adapter, 10).await;

    let page = adapter
        .get_all(Filter::all(), Options::new().skip(5).limit(5).with_count())
        .await
        .unwrap();

    assert_eq!(page.count, Some(10));
    let names: Vec<_> = page.items.iter().map(|d| d.get_str("name").unwrap()).collect();
    assert_eq!(names, vec!["user 6", "user 7", "user 8", "user 9", "user 10"]);

    let plain = adapter
        .get_all(Filter::all(), Options::new().skip(5).limit(5))
        .await
        .unwrap();
    assert_eq!(plain.count, None);
    assert_eq!(plain.items.len(), 5);

    teardown(adapter).await;
}

#[tokio::test]
#[ignore]
async fn test_setup_idempotent_and_conflicting() {
    let adapter = adapter().await;

    adapter
        .setup(&[IndexSpec::new(["email"]).unique()])
        .await
        .unwrap();

    let err = adapter
        .setup(&[IndexSpec::new(["email"]).named("email_1")])
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::Index(_)));

    teardown(adapter).await;
}

#[tokio::test]
#[ignore]
async fn test_constraint_and_not_found() {
    let adapter = adapter().await;
    seed(&adapter, 2).await;

    let err = adapter
        .create(doc! { "email": "user1@example.com", "login_name": "other" })
        .await
        .unwrap_err();
    assert!(err.is_constraint());

    let err = adapter
        .get_one(doc! { "login_name": "nobody" }.into())
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    let err = adapter
        .delete(doc! { "login_name": "nobody" }.into())
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    assert_eq!(adapter.open_connections(), 0);
    teardown(adapter).await;
}

#[tokio::test]
#[ignore]
async fn test_update_all_and_delete_all() {
    let adapter = adapter().await;
    seed(&adapter, 5).await;

    let info = adapter
        .update_all(doc! { "age": { "$lte": 23 } }.into(), doc! { "group": "young" })
        .await
        .unwrap();
    assert_eq!(info, ChangeInfo { matched: 3, updated: 3, removed: 0 });

    let untouched = adapter.get_one(doc! { "login_name": "user1" }.into()).await.unwrap();
    assert_eq!(untouched.get_str("email").unwrap(), "user1@example.com");

    let info = adapter.delete_all(doc! { "group": "young" }.into()).await.unwrap();
    assert_eq!(info, ChangeInfo { matched: 3, updated: 0, removed: 3 });

    let info = adapter.delete_all(doc! { "group": "young" }.into()).await.unwrap();
    assert_eq!(info, ChangeInfo::default());

    teardown(adapter).await;
}

#[tokio::test]
#[ignore]
async fn test_repository_list() {
    let adapter = adapter().await;
    seed(&adapter, 3).await;

    let page = BaseRepository::new(&adapter)
        .list::<Document>(Options::new().with_count())
        .await
        .unwrap();
    assert_eq!(page.count, Some(3));
    assert_eq!(page.items.len(), 3);

    teardown(adapter).await;
}
