//! SQLite backend round-trips against a throwaway database file.

use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use pressroom_common::{normalize_url, PressroomError};
use pressroom_store::{Article, ArticleStore, SqliteStore};

fn article(url: &str, body_file: &str) -> Article {
    let now = Utc::now();
    Article {
        id: Uuid::new_v4(),
        title: "The Long Walk".to_string(),
        title_zh: Some("长路".to_string()),
        date: NaiveDate::from_ymd_opt(2024, 6, 12).unwrap(),
        category: "culture".to_string(),
        author: "Min Zhao".to_string(),
        source: "Nautilus".to_string(),
        original_url: url.to_string(),
        body_file: body_file.to_string(),
        body_file_zh: Some(body_file.replacen("en/", "zh/", 1)),
        starred: true,
        created_at: now,
        updated_at: now,
    }
}

// A fresh file per test; pooled in-memory SQLite would give each pooled
// connection its own empty database.
async fn open() -> (SqliteStore, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("articles.db").display());
    (SqliteStore::open(&url).await.unwrap(), dir)
}

#[tokio::test]
async fn insert_and_find_round_trip() {
    let (store, _dir) = open().await;
    let a = article("https://nautil.us/the-long-walk-1/", "en/x.html");
    store.insert(&a).await.unwrap();

    let by_id = store.find_by_id(a.id).await.unwrap().unwrap();
    assert_eq!(by_id.title, a.title);
    assert_eq!(by_id.title_zh, a.title_zh);
    assert_eq!(by_id.date, a.date);
    assert_eq!(by_id.body_file_zh, a.body_file_zh);
    assert!(by_id.starred);

    let by_url = store.find_by_url(&a.original_url).await.unwrap().unwrap();
    assert_eq!(by_url.id, a.id);
}

#[tokio::test]
async fn duplicate_url_is_a_conflict() {
    let (store, _dir) = open().await;
    store
        .insert(&article("https://nautil.us/a", "en/a.html"))
        .await
        .unwrap();
    let err = store
        .insert(&article("https://nautil.us/a", "en/b.html"))
        .await
        .unwrap_err();
    assert!(matches!(err, PressroomError::Conflict(_)));
}

#[tokio::test]
async fn empty_urls_are_not_unique() {
    let (store, _dir) = open().await;
    store.insert(&article("", "en/a.html")).await.unwrap();
    store.insert(&article("", "en/b.html")).await.unwrap();
    assert_eq!(store.count().await.unwrap(), 2);
}

#[tokio::test]
async fn normalized_url_lookup_ignores_query_and_slash() {
    let (store, _dir) = open().await;
    let a = article("https://nautil.us/story/?utm_source=feed", "en/a.html");
    store.insert(&a).await.unwrap();

    let hits = store
        .find_by_normalized_url(&normalize_url("https://nautil.us/story"))
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, a.id);

    assert!(store.find_by_normalized_url("").await.unwrap().is_empty());
}

#[tokio::test]
async fn body_file_and_title_author_date_lookups() {
    let (store, _dir) = open().await;
    let a = article("https://nautil.us/a", "en/2024-06-12_culture_Min_Zhao_The_Long_Walk.html");
    store.insert(&a).await.unwrap();

    let hit = store
        .find_by_body_file(&a.body_file)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(hit.id, a.id);

    let hits = store
        .find_by_title_author_date("the long  walk", "MIN ZHAO", a.date)
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
}

#[tokio::test]
async fn update_rewrites_fields_and_unknown_id_fails() {
    let (store, _dir) = open().await;
    let mut a = article("https://nautil.us/a", "en/a.html");
    store.insert(&a).await.unwrap();

    a.title = "The Longer Walk".to_string();
    a.original_url = String::new();
    a.updated_at = Utc::now();
    store.update(&a).await.unwrap();

    let got = store.find_by_id(a.id).await.unwrap().unwrap();
    assert_eq!(got.title, "The Longer Walk");
    assert!(got.original_url.is_empty());

    let ghost = article("https://nautil.us/ghost", "en/g.html");
    assert!(store.update(&ghost).await.is_err());
}
