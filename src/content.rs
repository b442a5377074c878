//! Read-only service and course catalogs.

use serde::{Deserialize, Serialize};

use crate::storage::{DocumentStore, StoreError};

pub const SERVICES_KEY: &str = "services";
pub const COURSES_KEY: &str = "courses";

/// Service group shown under "Аудиты"
pub const AUDIT_GROUP: &str = "audit";
/// Service group shown under "Сопровождение"
pub const SUPPORT_GROUP: &str = "specialized_service";
/// Support service that always goes first
pub const SUPPORT_COMPLEX_ID: &str = "support_complex";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub short: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tasks_solved: Vec<String>,
    #[serde(default)]
    pub includes: Vec<String>,
    #[serde(default)]
    pub results: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServicesDocument {
    #[serde(default)]
    pub services: Vec<Service>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Older documents use `title` instead of `name`
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub short: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub next_dates: String,
    #[serde(default)]
    pub for_who: Vec<String>,
    #[serde(default)]
    pub benefits: Vec<String>,
    #[serde(default)]
    pub program: Vec<String>,
    #[serde(default)]
    pub results: Vec<String>,
}

impl Course {
    pub fn display_name(&self) -> &str {
        match self.name.trim() {
            "" => self.title.trim(),
            name => name,
        }
    }
}

/// The courses document is either `{"courses": [...]}` or a bare list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CoursesDocument {
    Wrapped { courses: Vec<Course> },
    List(Vec<Course>),
}

impl Default for CoursesDocument {
    fn default() -> Self {
        CoursesDocument::List(Vec::new())
    }
}

impl CoursesDocument {
    pub fn into_courses(self) -> Vec<Course> {
        match self {
            CoursesDocument::Wrapped { courses } | CoursesDocument::List(courses) => courses,
        }
    }
}

fn is_listable(id: &str, name: &str) -> bool {
    !id.trim().is_empty() && !name.trim().is_empty()
}

pub struct Content<'a> {
    store: &'a DocumentStore,
}

impl<'a> Content<'a> {
    pub fn new(store: &'a DocumentStore) -> Self {
        Self { store }
    }

    pub fn services(&self) -> Result<Vec<Service>, StoreError> {
        let doc: ServicesDocument = self.store.load(SERVICES_KEY)?;
        Ok(doc.services)
    }

    /// Listable services of one group in display order
    pub fn services_in_group(&self, group: &str) -> Result<Vec<Service>, StoreError> {
        let mut services: Vec<Service> = self
            .services()?
            .into_iter()
            .filter(|s| s.group.trim() == group && is_listable(&s.id, &s.name))
            .collect();

        if group == SUPPORT_GROUP {
            services.sort_by(|a, b| {
                (a.id != SUPPORT_COMPLEX_ID, &a.name).cmp(&(b.id != SUPPORT_COMPLEX_ID, &b.name))
            });
        } else {
            services.sort_by(|a, b| a.name.cmp(&b.name));
        }
        Ok(services)
    }

    pub fn service(&self, id: &str) -> Result<Option<Service>, StoreError> {
        Ok(self.services()?.into_iter().find(|s| s.id.trim() == id))
    }

    /// Listable courses in document order
    pub fn courses(&self) -> Result<Vec<Course>, StoreError> {
        let doc: CoursesDocument = self.store.load(COURSES_KEY)?;
        Ok(doc
            .into_courses()
            .into_iter()
            .filter(|c| is_listable(&c.id, c.display_name()))
            .collect())
    }

    pub fn course(&self, id: &str) -> Result<Option<Course>, StoreError> {
        Ok(self.courses()?.into_iter().find(|c| c.id.trim() == id))
    }
}
