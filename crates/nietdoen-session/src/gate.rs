//! Session gate: decides between the sign-in view and the main workflow.
//!
//! State changes are pushed by the credential service over a `watch`
//! channel. Nothing is polled.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{error, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub uid: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Resolving,
    Unauthenticated,
    Authenticated(User),
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[cfg(feature = "firebase")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },

    #[error("sign-in rejected: {0}")]
    Rejected(String),

    #[error("auth state stream closed")]
    StreamClosed,
}

/// Email/password credential service with a push-based state stream.
#[async_trait]
pub trait CredentialService: Send + Sync {
    /// On success the new state arrives over [`subscribe`](Self::subscribe).
    async fn sign_in(&self, email: &str, password: &str) -> Result<(), AuthError>;

    fn subscribe(&self) -> watch::Receiver<AuthState>;
}

/// Sender side of the auth-state stream, owned by a credential service.
#[derive(Debug)]
pub struct AuthStateChannel {
    tx: watch::Sender<AuthState>,
}

impl Default for AuthStateChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthStateChannel {
    /// Starts in [`AuthState::Resolving`].
    pub fn new() -> Self {
        let (tx, _) = watch::channel(AuthState::Resolving);
        Self { tx }
    }

    pub fn publish(&self, state: AuthState) {
        self.tx.send_replace(state);
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.tx.subscribe()
    }
}

/// What the front end should show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateView {
    Loading,
    SignIn,
    Workflow(User),
}

pub struct SessionGate {
    rx: watch::Receiver<AuthState>,
}

impl SessionGate {
    pub fn new(service: &dyn CredentialService) -> Self {
        Self {
            rx: service.subscribe(),
        }
    }

    pub fn view(&self) -> GateView {
        match &*self.rx.borrow() {
            AuthState::Resolving => GateView::Loading,
            AuthState::Unauthenticated => GateView::SignIn,
            AuthState::Authenticated(user) => GateView::Workflow(user.clone()),
        }
    }

    /// Suspend until the state is no longer [`AuthState::Resolving`].
    pub async fn resolved(&mut self) -> Result<GateView, AuthError> {
        self.rx
            .wait_for(|s| *s != AuthState::Resolving)
            .await
            .map_err(|_| AuthError::StreamClosed)?;
        Ok(self.view())
    }

    /// Suspend until a user is signed in.
    pub async fn authenticated(&mut self) -> Result<User, AuthError> {
        let state = self
            .rx
            .wait_for(|s| matches!(s, AuthState::Authenticated(_)))
            .await
            .map_err(|_| AuthError::StreamClosed)?;
        match &*state {
            AuthState::Authenticated(user) => Ok(user.clone()),
            _ => Err(AuthError::StreamClosed),
        }
    }
}

/// The single credential-submission action of the sign-in view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignInForm {
    pub email: String,
    pub password: String,
}

impl SignInForm {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: String::new(),
        }
    }

    /// Submit the credentials. On failure the error is logged and the form is
    /// left as-is for a retry; on success the form is reset.
    pub async fn submit(&mut self, service: &dyn CredentialService) -> Result<(), AuthError> {
        match service.sign_in(&self.email, &self.password).await {
            Ok(()) => {
                info!(email = %self.email, "signed in");
                *self = Self::default();
                Ok(())
            }
            Err(e) => {
                error!(email = %self.email, error = %e, "sign-in failed");
                Err(e)
            }
        }
    }
}
