//! Contact requests left by end users.
//!
//! Leads are append-only: a record is never edited, only appended or wiped
//! together with all the others.

use serde::{Deserialize, Serialize};

use crate::storage::{DocumentStore, StoreError};

pub const LEADS_KEY: &str = "leads";

/// Default and bounds of the `/list_leads` limit
pub const DEFAULT_LEADS_LIMIT: usize = 10;
pub const MAX_LEADS_LIMIT: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lead {
    pub ts: String,
    pub user_id: u64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub contact_text: String,
    /// What the lead was left for, e.g. `service:audit_1`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

pub struct Leads<'a> {
    store: &'a DocumentStore,
}

impl<'a> Leads<'a> {
    pub fn new(store: &'a DocumentStore) -> Self {
        Self { store }
    }

    pub async fn append(&self, lead: Lead) -> Result<usize, StoreError> {
        self.store
            .update(LEADS_KEY, |doc: &mut Vec<Lead>| -> Result<usize, StoreError> {
                doc.push(lead);
                Ok(doc.len())
            })
            .await
    }

    /// Up to `limit` most recent leads, newest first
    pub fn recent(&self, limit: usize) -> Result<Vec<Lead>, StoreError> {
        let doc: Vec<Lead> = self.store.load(LEADS_KEY)?;
        Ok(doc.into_iter().rev().take(limit).collect())
    }

    /// Wipe every lead, even when the document is malformed
    pub async fn clear(&self) -> Result<(), StoreError> {
        self.store.replace(LEADS_KEY, &Vec::<Lead>::new()).await
    }
}

/// Parse the optional `/list_leads` argument. Anything unparsable falls back to the default.
pub fn parse_leads_limit(arg: &str) -> usize {
    match arg.trim().parse::<i64>() {
        Ok(n) => n.clamp(1, MAX_LEADS_LIMIT as i64) as usize,
        Err(_) => DEFAULT_LEADS_LIMIT,
    }
}
