//! Sign-in, sign-up and password reset against an external identity provider.
//!
//! The provider does the real work; this service checks the form input first and
//! turns provider error codes into messages the user can read.

use async_trait::async_trait;
use log::{info, warn};
use shared::UserHandle;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;

pub const PASSWORD_RESET_SENT: &str = "Enviamos um link de redefinição para o seu email.";

/// Error reported by the identity provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderError {
    pub code: String,
    pub message: String,
}

impl ProviderError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<UserHandle, ProviderError>;
    async fn sign_up(&self, email: &str, password: &str) -> Result<UserHandle, ProviderError>;
    async fn send_password_reset(&self, email: &str) -> Result<(), ProviderError>;
    async fn sign_out(&self) -> Result<(), ProviderError>;
    /// Current user, updated on every sign-in and sign-out
    fn auth_state(&self) -> watch::Receiver<Option<UserHandle>>;
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthFailure {
    #[error("Preencha email e senha.")]
    MissingCredentials,
    #[error("Digite o email cadastrado.")]
    MissingEmail,
    #[error("{0}")]
    Provider(String),
}

impl From<ProviderError> for AuthFailure {
    fn from(error: ProviderError) -> Self {
        AuthFailure::Provider(translate_auth_error(&error.code, &error.message))
    }
}

/// User-facing message for a provider error code. Codes may carry an `auth/` prefix.
pub fn translate_auth_error(code: &str, message: &str) -> String {
    let code = code.trim();
    let short = code.strip_prefix("auth/").unwrap_or(code);

    let translated = match short {
        "user-not-found" => "Usuário não encontrado.",
        "wrong-password" => "Senha incorreta.",
        "invalid-email" => "Email inválido.",
        "email-already-in-use" => "Este email já está em uso.",
        "weak-password" => "Senha muito fraca. Use pelo menos 6 caracteres.",
        _ if !message.trim().is_empty() => return message.to_string(),
        _ => return code.to_string(),
    };
    translated.to_string()
}

#[derive(Clone)]
pub struct AuthService {
    provider: Arc<dyn IdentityProvider>,
}

impl AuthService {
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        Self { provider }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<UserHandle, AuthFailure> {
        let email = require_credentials(email, password)?;
        let user = self.provider.sign_in(email, password).await.map_err(|e| {
            warn!("Sign-in failed: {}", e.code);
            AuthFailure::from(e)
        })?;
        info!("Signed in as {}", user.id);
        Ok(user)
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<UserHandle, AuthFailure> {
        let email = require_credentials(email, password)?;
        let user = self.provider.sign_up(email, password).await.map_err(|e| {
            warn!("Sign-up failed: {}", e.code);
            AuthFailure::from(e)
        })?;
        info!("Account created for {}", user.id);
        Ok(user)
    }

    /// Ask the provider to mail a reset link. Returns the confirmation message.
    pub async fn send_password_reset(&self, email: &str) -> Result<&'static str, AuthFailure> {
        let email = email.trim();
        if email.is_empty() {
            return Err(AuthFailure::MissingEmail);
        }
        self.provider.send_password_reset(email).await?;
        Ok(PASSWORD_RESET_SENT)
    }

    pub async fn sign_out(&self) -> Result<(), AuthFailure> {
        self.provider.sign_out().await?;
        info!("Signed out");
        Ok(())
    }

    pub fn auth_state(&self) -> watch::Receiver<Option<UserHandle>> {
        self.provider.auth_state()
    }
}

fn require_credentials<'a>(email: &'a str, password: &str) -> Result<&'a str, AuthFailure> {
    let email = email.trim();
    if email.is_empty() || password.is_empty() {
        return Err(AuthFailure::MissingCredentials);
    }
    Ok(email)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct FakeProvider {
        calls: Mutex<Vec<String>>,
        failure: Option<ProviderError>,
        state: watch::Sender<Option<UserHandle>>,
    }

    impl FakeProvider {
        fn new(failure: Option<ProviderError>) -> Self {
            let (state, _) = watch::channel(None);
            Self {
                calls: Mutex::new(Vec::new()),
                failure,
                state,
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn respond(&self, call: String) -> Result<UserHandle, ProviderError> {
            self.calls.lock().unwrap().push(call);
            if let Some(failure) = &self.failure {
                return Err(failure.clone());
            }
            let user = UserHandle {
                id: "u1".to_string(),
                email: Some("ana@example.com".to_string()),
            };
            self.state.send_replace(Some(user.clone()));
            Ok(user)
        }
    }

    #[async_trait]
    impl IdentityProvider for FakeProvider {
        async fn sign_in(&self, email: &str, _password: &str) -> Result<UserHandle, ProviderError> {
            self.respond(format!("sign_in:{}", email))
        }

        async fn sign_up(&self, email: &str, _password: &str) -> Result<UserHandle, ProviderError> {
            self.respond(format!("sign_up:{}", email))
        }

        async fn send_password_reset(&self, email: &str) -> Result<(), ProviderError> {
            self.respond(format!("reset:{}", email)).map(|_| ())
        }

        async fn sign_out(&self) -> Result<(), ProviderError> {
            self.calls.lock().unwrap().push("sign_out".to_string());
            self.state.send_replace(None);
            Ok(())
        }

        fn auth_state(&self) -> watch::Receiver<Option<UserHandle>> {
            self.state.subscribe()
        }
    }

    fn create_test_service(failure: Option<ProviderError>) -> (Arc<FakeProvider>, AuthService) {
        let provider = Arc::new(FakeProvider::new(failure));
        let service = AuthService::new(provider.clone());
        (provider, service)
    }

    #[test]
    fn test_translate_known_codes() {
        assert_eq!(translate_auth_error("auth/user-not-found", "x"), "Usuário não encontrado.");
        assert_eq!(translate_auth_error("wrong-password", ""), "Senha incorreta.");
        assert_eq!(translate_auth_error("auth/invalid-email", ""), "Email inválido.");
        assert_eq!(translate_auth_error("auth/email-already-in-use", ""), "Este email já está em uso.");
        assert_eq!(
            translate_auth_error("auth/weak-password", ""),
            "Senha muito fraca. Use pelo menos 6 caracteres."
        );
    }

    #[test]
    fn test_translate_unknown_code_falls_back() {
        assert_eq!(translate_auth_error("auth/network-request-failed", "Network down"), "Network down");
        assert_eq!(translate_auth_error("auth/too-many-requests", "  "), "auth/too-many-requests");
    }

    #[tokio::test]
    async fn test_sign_in_trims_email_and_updates_state() {
        let (provider, service) = create_test_service(None);
        let mut state = service.auth_state();

        let user = service.sign_in("  ana@example.com ", "segredo").await.unwrap();

        assert_eq!(user.id, "u1");
        assert_eq!(provider.calls(), vec!["sign_in:ana@example.com"]);
        assert!(state.has_changed().unwrap());
        assert_eq!(state.borrow_and_update().as_ref().map(|u| u.id.clone()), Some("u1".to_string()));

        service.sign_out().await.unwrap();
        assert!(state.borrow_and_update().is_none());
    }

    #[tokio::test]
    async fn test_missing_credentials_never_reach_provider() {
        let (provider, service) = create_test_service(None);

        assert_eq!(service.sign_in(" ", "segredo").await, Err(AuthFailure::MissingCredentials));
        assert_eq!(service.sign_up("ana@example.com", "").await, Err(AuthFailure::MissingCredentials));
        assert_eq!(service.send_password_reset("   ").await, Err(AuthFailure::MissingEmail));
        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn test_provider_errors_are_translated() {
        let (_provider, service) = create_test_service(Some(ProviderError::new(
            "auth/email-already-in-use",
            "The email address is already in use",
        )));

        let error = service.sign_up("ana@example.com", "segredo").await.unwrap_err();

        assert_eq!(error.to_string(), "Este email já está em uso.");
    }

    #[tokio::test]
    async fn test_password_reset_message() {
        let (provider, service) = create_test_service(None);

        assert_eq!(service.send_password_reset("ana@example.com").await, Ok(PASSWORD_RESET_SENT));
        assert_eq!(provider.calls(), vec!["reset:ana@example.com"]);
    }
}
