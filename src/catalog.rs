//! Symptom/solution article catalog.
//!
//! The catalog document maps a category name to an ordered list of articles.
//! Articles have no stable id: an article is addressed by its zero-based
//! position inside its category. A position is only meaningful within one
//! read-modify-write cycle; any mutation between showing a list and acting
//! on a position can shift what that position refers to.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use crate::storage::{DocumentStore, StoreError};

/// Document key of the article catalog
pub const CATALOG_KEY: &str = "symptoms";

/// A single card in the catalog
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub text: String,
}

impl Article {
    pub fn new(title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            text: text.into(),
        }
    }

    pub fn field(&self, field: ArticleField) -> &str {
        match field {
            ArticleField::Title => &self.title,
            ArticleField::Text => &self.text,
        }
    }

    fn field_mut(&mut self, field: ArticleField) -> &mut String {
        match field {
            ArticleField::Title => &mut self.title,
            ArticleField::Text => &mut self.text,
        }
    }
}

/// Editable article fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArticleField {
    Title,
    Text,
}

impl ArticleField {
    /// Wire name used in callback payloads
    pub fn as_str(&self) -> &'static str {
        match self {
            ArticleField::Title => "title",
            ArticleField::Text => "text",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "title" => Some(ArticleField::Title),
            "text" => Some(ArticleField::Text),
            _ => None,
        }
    }
}

impl fmt::Display for ArticleField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whole catalog document
pub type CatalogDocument = BTreeMap<String, Vec<Article>>;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("category '{0}' does not exist")]
    CategoryNotFound(String),
    #[error("no article #{index} in '{category}' ({len} articles)")]
    IndexOutOfRange {
        category: String,
        index: usize,
        len: usize,
    },
}

/// Catalog adapter over the document store
pub struct Catalog<'a> {
    store: &'a DocumentStore,
}

impl<'a> Catalog<'a> {
    pub fn new(store: &'a DocumentStore) -> Self {
        Self { store }
    }

    /// Load the whole catalog document
    pub fn snapshot(&self) -> Result<CatalogDocument, CatalogError> {
        Ok(self.store.load(CATALOG_KEY)?)
    }

    /// Category names in display order, empty categories included
    pub fn categories(&self) -> Result<Vec<String>, CatalogError> {
        Ok(self.snapshot()?.into_keys().collect())
    }

    /// Articles of a category; an unknown category is empty
    pub fn list(&self, category: &str) -> Result<Vec<Article>, CatalogError> {
        Ok(self.snapshot()?.remove(category).unwrap_or_default())
    }

    /// File an article under `category`, creating the category on first use.
    /// Returns the new number of articles in the category.
    pub async fn append(&self, category: &str, article: Article) -> Result<usize, CatalogError> {
        self.store
            .update(CATALOG_KEY, |doc: &mut CatalogDocument| -> Result<usize, CatalogError> {
                let items = doc.entry(category.to_string()).or_default();
                items.push(article);
                Ok(items.len())
            })
            .await
    }

    /// Replace one field of the article at `index`, returning the previous value.
    pub async fn update_field(
        &self,
        category: &str,
        index: usize,
        field: ArticleField,
        value: &str,
    ) -> Result<String, CatalogError> {
        self.store
            .update(CATALOG_KEY, |doc: &mut CatalogDocument| -> Result<String, CatalogError> {
                let items = doc
                    .get_mut(category)
                    .ok_or_else(|| CatalogError::CategoryNotFound(category.to_string()))?;
                let len = items.len();
                let article = items.get_mut(index).ok_or(CatalogError::IndexOutOfRange {
                    category: category.to_string(),
                    index,
                    len,
                })?;
                Ok(std::mem::replace(article.field_mut(field), value.to_string()))
            })
            .await
    }

    /// Remove the article at `index`. The category key stays, possibly empty.
    pub async fn remove_at(&self, category: &str, index: usize) -> Result<(Article, usize), CatalogError> {
        self.store
            .update(CATALOG_KEY, |doc: &mut CatalogDocument| -> Result<(Article, usize), CatalogError> {
                let items = doc
                    .get_mut(category)
                    .ok_or_else(|| CatalogError::CategoryNotFound(category.to_string()))?;
                if index >= items.len() {
                    return Err(CatalogError::IndexOutOfRange {
                        category: category.to_string(),
                        index,
                        len: items.len(),
                    });
                }
                let removed = items.remove(index);
                Ok((removed, items.len()))
            })
            .await
    }
}
