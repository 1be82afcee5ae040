//! # Ledger Backend
//!
//! Non-UI logic of a personal finance ledger: income and expense entries grouped
//! by calendar year, kept per user in a document store.
//!
//! ## Architecture
//!
//! - **domain**: parsing, migration, the in-memory ledger, summaries, persistence
//!   and identity handling
//! - **storage**: the `DocumentStore` abstraction and its implementations
//! - **io**: capabilities the UI injects (confirmation prompts, chart rendering)
//! - **config** / **logging**: startup settings and log output
//!
//! `LedgerBackend` follows the identity provider's auth state and keeps exactly
//! one `LedgerSession` alive for the signed-in user.

pub mod config;
pub mod domain;
pub mod io;
pub mod logging;
pub mod storage;

use log::{error, info};
use shared::UserHandle;
use std::sync::Arc;
use tokio::sync::watch;

use config::LedgerConfig;
use domain::{LedgerError, LedgerSession, SessionState};
use io::ConfirmPrompt;
use storage::DocumentStore;

pub use shared;

/// Owns the session of whoever is signed in
pub struct LedgerBackend {
    config: LedgerConfig,
    document_store: Arc<dyn DocumentStore>,
    confirm: Arc<dyn ConfirmPrompt>,
    session: Option<LedgerSession>,
}

impl LedgerBackend {
    pub fn new(
        config: LedgerConfig,
        document_store: Arc<dyn DocumentStore>,
        confirm: Arc<dyn ConfirmPrompt>,
    ) -> Self {
        Self {
            config,
            document_store,
            confirm,
            session: None,
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.session
            .as_ref()
            .map_or(SessionState::Unauthenticated, LedgerSession::state)
    }

    pub fn session(&self) -> Result<&LedgerSession, LedgerError> {
        self.session.as_ref().ok_or(LedgerError::NotSignedIn)
    }

    /// Session of the signed-in user, for mutations
    pub fn session_mut(&mut self) -> Result<&mut LedgerSession, LedgerError> {
        self.session.as_mut().ok_or(LedgerError::NotSignedIn)
    }

    /// React to a sign-in, sign-out or user switch. The previous session's pending
    /// save is flushed before it is dropped.
    pub async fn handle_auth_change(&mut self, user: Option<UserHandle>) {
        let same_user = match (&self.session, &user) {
            (Some(session), Some(user)) => session.user().id == user.id,
            _ => false,
        };
        if same_user {
            return;
        }

        if let Some(mut previous) = self.session.take() {
            if let Err(e) = previous.close().await {
                error!("Failed to flush ledger for {}: {}", previous.user().id, e);
            }
        }

        match user {
            Some(user) => {
                info!("Starting ledger session for {}", user.id);
                let mut session = LedgerSession::new(
                    self.config.clone(),
                    user,
                    Arc::clone(&self.document_store),
                    Arc::clone(&self.confirm),
                );
                session.start().await;
                self.session = Some(session);
            }
            None => info!("Signed out, no active ledger session"),
        }
    }

    /// Apply the current auth state, then every change until the provider goes away
    pub async fn follow_auth_state(&mut self, mut auth_state: watch::Receiver<Option<UserHandle>>) {
        let current = auth_state.borrow_and_update().clone();
        self.handle_auth_change(current).await;

        while auth_state.changed().await.is_ok() {
            let user = auth_state.borrow_and_update().clone();
            self.handle_auth_change(user).await;
        }
        info!("Auth state stream closed");
    }

    /// End the active session, flushing its pending save
    pub async fn shutdown(&mut self) -> Result<(), LedgerError> {
        match self.session.take() {
            Some(mut session) => session.close().await,
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Year;
    use crate::io::FixedAnswer;
    use crate::storage::InMemoryDocumentStore;
    use serde_json::json;
    use shared::{AddEntryRequest, EntryKind};

    fn create_test_backend() -> (Arc<InMemoryDocumentStore>, LedgerBackend) {
        let store = Arc::new(InMemoryDocumentStore::new());
        let backend = LedgerBackend::new(LedgerConfig::default(), store.clone(), Arc::new(FixedAnswer::no()));
        (store, backend)
    }

    fn user(id: &str) -> UserHandle {
        UserHandle {
            id: id.to_string(),
            email: None,
        }
    }

    fn request(category: &str) -> AddEntryRequest {
        AddEntryRequest {
            year: "2025".to_string(),
            kind: EntryKind::Expense,
            month: 0,
            category: category.to_string(),
            amount: "10".to_string(),
            note: String::new(),
        }
    }

    #[tokio::test]
    async fn test_no_user_means_not_signed_in() {
        let (_store, mut backend) = create_test_backend();

        assert_eq!(backend.state(), SessionState::Unauthenticated);
        assert!(matches!(backend.session_mut(), Err(LedgerError::NotSignedIn)));
        assert!(backend.shutdown().await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_user_switch_flushes_previous_session() {
        let (store, mut backend) = create_test_backend();

        backend.handle_auth_change(Some(user("ana"))).await;
        assert_eq!(backend.state(), SessionState::Ready);
        backend.session_mut().unwrap().add_entry(request("Lazer")).await.unwrap();
        assert_eq!(store.write_count(), 0);

        backend.handle_auth_change(Some(user("bia"))).await;

        assert_eq!(store.write_count(), 1);
        assert!(store.document("usuarios", "ana").is_some());
        assert_eq!(backend.session().unwrap().user().id, "bia");

        backend.handle_auth_change(None).await;
        assert_eq!(backend.state(), SessionState::Unauthenticated);
        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test]
    async fn test_same_user_keeps_session() {
        let (_store, mut backend) = create_test_backend();

        backend.handle_auth_change(Some(user("ana"))).await;
        backend.session_mut().unwrap().add_entry(request("Lazer")).await.unwrap();
        backend.handle_auth_change(Some(user("ana"))).await;

        let session = backend.session().unwrap();
        let year = Year::from_storage_key("2025").unwrap();
        assert_eq!(session.category_totals(year, EntryKind::Expense).len(), 1);
    }

    #[tokio::test]
    async fn test_follow_auth_state_applies_current_user() {
        let (store, mut backend) = create_test_backend();
        store.insert(
            "usuarios",
            "ana",
            json!({"dadosPorAno": {"2024": {"lancamentos": []}}, "nextId": 1}),
        );
        let (sender, receiver) = watch::channel(Some(user("ana")));
        drop(sender);

        backend.follow_auth_state(receiver).await;

        assert_eq!(backend.state(), SessionState::Ready);
        let session = backend.session().unwrap();
        assert_eq!(session.user().id, "ana");
        assert_eq!(session.list_years(), vec![Year::from_storage_key("2024").unwrap()]);
    }
}
