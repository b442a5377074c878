//! Digest subscribers: everyone who pressed /start.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::storage::{DocumentStore, StoreError};

pub const SUBSCRIBERS_KEY: &str = "users";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriberDocument {
    #[serde(default)]
    pub subscribers: Vec<u64>,
}

pub struct Subscribers<'a> {
    store: &'a DocumentStore,
}

impl<'a> Subscribers<'a> {
    pub fn new(store: &'a DocumentStore) -> Self {
        Self { store }
    }

    /// Add a user id. Adding an id twice leaves the set unchanged.
    pub async fn add(&self, user_id: u64) -> Result<(), StoreError> {
        self.store
            .update(SUBSCRIBERS_KEY, |doc: &mut SubscriberDocument| -> Result<(), StoreError> {
                let mut ids: BTreeSet<u64> = doc.subscribers.drain(..).collect();
                ids.insert(user_id);
                doc.subscribers = ids.into_iter().collect();
                Ok(())
            })
            .await
    }

    /// Sorted, deduplicated subscriber ids
    pub fn list(&self) -> Result<Vec<u64>, StoreError> {
        let doc: SubscriberDocument = self.store.load(SUBSCRIBERS_KEY)?;
        let ids: BTreeSet<u64> = doc.subscribers.into_iter().collect();
        Ok(ids.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_add_creates_document() {
        let dir = TempDir::new().unwrap();
        let store = DocumentStore::open(dir.path());
        Subscribers::new(&store).add(111).await.unwrap();

        let doc: SubscriberDocument = store.load(SUBSCRIBERS_KEY).unwrap();
        assert_eq!(doc.subscribers, vec![111]);
    }

    #[tokio::test]
    async fn test_add_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = DocumentStore::open(dir.path());
        let subscribers = Subscribers::new(&store);

        subscribers.add(111).await.unwrap();
        let once = subscribers.list().unwrap();
        subscribers.add(111).await.unwrap();
        subscribers.add(111).await.unwrap();

        assert_eq!(subscribers.list().unwrap(), once);
        assert_eq!(once, vec![111]);
    }

    #[tokio::test]
    async fn test_add_keeps_ids_sorted() {
        let dir = TempDir::new().unwrap();
        let store = DocumentStore::open(dir.path());
        let subscribers = Subscribers::new(&store);

        for id in [300, 100, 200] {
            subscribers.add(id).await.unwrap();
        }

        assert_eq!(subscribers.list().unwrap(), vec![100, 200, 300]);
    }
}
