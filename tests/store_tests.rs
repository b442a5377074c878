//! Document store behaviour across adapters

use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

use dairybot::catalog::{Article, Catalog, CatalogError};
use dairybot::leads::{Lead, Leads};
use dairybot::storage::{DocumentStore, StoreError};
use dairybot::subscribers::Subscribers;

fn lead(user_id: u64) -> Lead {
    Lead {
        ts: "2026-02-01T09:30:00+03:00".to_string(),
        user_id,
        username: None,
        name: "Фермер".to_string(),
        contact_text: format!("контакт {user_id}"),
        source: None,
    }
}

#[tokio::test]
async fn test_documents_survive_reopening() {
    let dir = TempDir::new().unwrap();
    {
        let store = DocumentStore::open(dir.path());
        Catalog::new(&store)
            .append("Маститы", Article::new("Заголовок", "Текст"))
            .await
            .unwrap();
        Subscribers::new(&store).add(42).await.unwrap();
    }

    let store = DocumentStore::open(dir.path());
    assert_eq!(
        Catalog::new(&store).list("Маститы").unwrap(),
        vec![Article::new("Заголовок", "Текст")]
    );
    assert_eq!(Subscribers::new(&store).list().unwrap(), vec![42]);
}

#[tokio::test]
async fn test_malformed_catalog_is_never_overwritten() {
    let dir = TempDir::new().unwrap();
    let store = DocumentStore::open(dir.path());
    let path = store.path_for("symptoms");
    fs::write(&path, "[\"not a catalog\"]").unwrap();

    let result = Catalog::new(&store)
        .append("Маститы", Article::new("T", "X"))
        .await;

    assert!(matches!(result, Err(CatalogError::Store(StoreError::Decode { .. }))));
    assert_eq!(fs::read_to_string(&path).unwrap(), "[\"not a catalog\"]");
}

#[tokio::test]
async fn test_clearing_leads_repairs_malformed_document() {
    let dir = TempDir::new().unwrap();
    let store = DocumentStore::open(dir.path());
    fs::write(store.path_for("leads"), "{broken").unwrap();

    let leads = Leads::new(&store);
    assert!(leads.recent(10).is_err());
    assert!(leads.append(lead(1)).await.is_err());

    leads.clear().await.unwrap();
    assert!(leads.recent(10).unwrap().is_empty());
    assert_eq!(leads.append(lead(1)).await.unwrap(), 1);
}

#[tokio::test]
async fn test_concurrent_appends_are_not_lost() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(DocumentStore::open(dir.path()));

    let mut handles = Vec::new();
    for user_id in 0..20u64 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            Leads::new(&store).append(lead(user_id)).await.unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let mut ids: Vec<u64> = Leads::new(&store)
        .recent(50)
        .unwrap()
        .into_iter()
        .map(|l| l.user_id)
        .collect();
    ids.sort_unstable();
    assert_eq!(ids, (0..20).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_legacy_lead_without_source() {
    let dir = TempDir::new().unwrap();
    let store = DocumentStore::open(dir.path());
    fs::write(
        store.path_for("leads"),
        r#"[{"ts": "2025-12-01T10:00:00+03:00", "user_id": 7, "username": null, "name": "Ольга", "contact_text": "Telegram"}]"#,
    )
    .unwrap();

    let leads = Leads::new(&store).recent(10).unwrap();
    assert_eq!(leads.len(), 1);
    assert_eq!(leads[0].source, None);
    assert_eq!(leads[0].contact_text, "Telegram");
}
