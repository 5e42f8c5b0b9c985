//! In-process store used when no database is configured, and by tests.
//!
//! Mirrors the Postgres store: lowercased unique emails, authors must exist,
//! and listing goes through the same [`ListQuery`]/[`SortOrder`] rules.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::auth::repo::UserStore;
use crate::auth::repo_types::{NewUser, User};
use crate::error::StoreError;
use crate::experiences::listing::{ListQuery, Page};
use crate::experiences::repo::ExperienceStore;
use crate::experiences::repo_types::{AuthorRef, Experience, ExperienceView};
use crate::ids::RecordId;

#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<Vec<User>>,
    experiences: RwLock<Vec<Experience>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn author_of(users: &[User], e: &Experience) -> Result<AuthorRef, StoreError> {
    users
        .iter()
        .find(|u| u.id == e.author_id)
        .map(|u| AuthorRef {
            id: u.id.clone(),
            name: u.name.clone(),
            email: u.email.clone(),
        })
        .ok_or_else(|| StoreError::Corrupt(format!("experience {} has no author", e.id)))
}

fn view(users: &[User], e: &Experience) -> Result<ExperienceView, StoreError> {
    Ok(ExperienceView::new(e.clone(), author_of(users, e)?))
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: &RecordId) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| &u.id == id).cloned())
    }

    async fn create(&self, new: NewUser) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        if users.iter().any(|u| u.email == new.email) {
            return Err(StoreError::DuplicateEmail);
        }
        let user = new.into_user();
        users.push(user.clone());
        Ok(user)
    }

    async fn link_external_id(
        &self,
        id: &RecordId,
        external_id: &str,
    ) -> Result<Option<User>, StoreError> {
        let mut users = self.users.write().await;
        Ok(users.iter_mut().find(|u| &u.id == id).map(|u| {
            if u.external_id.is_none() {
                u.external_id = Some(external_id.to_string());
            }
            u.clone()
        }))
    }
}

#[async_trait]
impl ExperienceStore for MemoryStore {
    async fn insert(&self, experience: &Experience) -> Result<(), StoreError> {
        let users = self.users.read().await;
        author_of(&users, experience)?;
        self.experiences.write().await.push(experience.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &RecordId) -> Result<Option<ExperienceView>, StoreError> {
        let users = self.users.read().await;
        let experiences = self.experiences.read().await;
        experiences
            .iter()
            .find(|e| &e.id == id)
            .map(|e| view(&users, e))
            .transpose()
    }

    async fn list(&self, query: &ListQuery) -> Result<Page<ExperienceView>, StoreError> {
        let users = self.users.read().await;
        let experiences = self.experiences.read().await;

        let mut matching: Vec<&Experience> = experiences
            .iter()
            .filter(|e| query.filter.matches(e))
            .collect();
        let total = matching.len() as u64;
        matching.sort_by(|a, b| query.sort.compare(a, b));

        let items = matching
            .into_iter()
            .skip(usize::try_from(query.offset()).unwrap_or(usize::MAX))
            .take(query.page_size as usize)
            .map(|e| view(&users, e))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Page::new(items, total, query))
    }
}
