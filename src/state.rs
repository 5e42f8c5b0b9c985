use std::sync::Arc;

use crate::auth::google::IdentityVerifier;
use crate::auth::repo::UserStore;
use crate::config::AppConfig;
use crate::experiences::repo::ExperienceStore;

/// Collaborators shared by every request handler. Built once at start-up.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserStore>,
    pub experiences: Arc<dyn ExperienceStore>,
    /// `None` when no external identity client is configured.
    pub verifier: Option<Arc<dyn IdentityVerifier>>,
}

impl AppState {
    /// Wire one store object as both user and experience store.
    pub fn from_store<S>(
        config: Arc<AppConfig>,
        store: Arc<S>,
        verifier: Option<Arc<dyn IdentityVerifier>>,
    ) -> Self
    where
        S: UserStore + ExperienceStore + 'static,
    {
        Self {
            config,
            users: store.clone(),
            experiences: store,
            verifier,
        }
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        Self::from_store(
            Arc::new(AppConfig::for_tests()),
            Arc::new(crate::memory::MemoryStore::new()),
            None,
        )
    }
}
