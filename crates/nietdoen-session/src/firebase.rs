//! Firebase Authentication (email/password) and App Check debug attestation.

use std::sync::Arc;

use async_trait::async_trait;
use nietdoen_core::{AccessContext, FirebaseConfig};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::gate::{AuthError, AuthState, AuthStateChannel, CredentialService, User};

const SIGN_IN_URL: &str = "https://identitytoolkit.googleapis.com/v1/accounts:signInWithPassword";
const APP_CHECK_URL: &str = "https://firebaseappcheck.googleapis.com/v1";

#[derive(Serialize)]
struct SignInRequest<'a> {
    email: &'a str,
    password: &'a str,
    #[serde(rename = "returnSecureToken")]
    return_secure_token: bool,
}

#[derive(Deserialize)]
struct SignInResponse {
    #[serde(rename = "localId")]
    local_id: String,
    email: Option<String>,
    #[serde(rename = "idToken")]
    id_token: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Map an error response to [`AuthError`], keeping Firebase's error code.
fn error_from_body(status: u16, body: String) -> AuthError {
    match serde_json::from_str::<ErrorEnvelope>(&body) {
        Ok(envelope) if (400..500).contains(&status) => AuthError::Rejected(envelope.error.message),
        _ => AuthError::Server { status, body },
    }
}

/// Email/password sign-in against the Identity Toolkit REST API.
///
/// No session is persisted between runs, so the state resolves to
/// unauthenticated as soon as [`resolve`](Self::resolve) is called.
pub struct FirebaseAuth {
    client: reqwest::Client,
    api_key: String,
    channel: AuthStateChannel,
    access: Arc<AccessContext>,
}

impl FirebaseAuth {
    pub fn new(config: &FirebaseConfig, access: Arc<AccessContext>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: config.api_key.clone(),
            channel: AuthStateChannel::new(),
            access,
        }
    }

    /// Finish start-up resolution of the auth state.
    pub fn resolve(&self) {
        self.channel.publish(AuthState::Unauthenticated);
    }
}

#[async_trait]
impl CredentialService for FirebaseAuth {
    async fn sign_in(&self, email: &str, password: &str) -> Result<(), AuthError> {
        let body = SignInRequest {
            email,
            password,
            return_secure_token: true,
        };
        let mut builder = self
            .client
            .post(SIGN_IN_URL)
            .query(&[("key", self.api_key.as_str())])
            .json(&body);
        if let Some(token) = self.access.app_check() {
            builder = builder.header("X-Firebase-AppCheck", token);
        }

        let resp = builder.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(error_from_body(status.as_u16(), body));
        }

        let signed_in: SignInResponse = resp.json().await?;
        self.access.set_id_token(Some(signed_in.id_token));
        info!(uid = %signed_in.local_id, "authenticated");
        self.channel.publish(AuthState::Authenticated(User {
            uid: signed_in.local_id,
            email: signed_in.email,
        }));
        Ok(())
    }

    fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.channel.subscribe()
    }
}

/// How outbound calls are attested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attestation {
    /// No attestation header is sent.
    Disabled,
    /// Exchange a registered debug token for an App Check token.
    Debug(String),
}

#[derive(Deserialize)]
struct AppCheckToken {
    token: String,
}

fn exchange_url(config: &FirebaseConfig) -> String {
    format!(
        "{APP_CHECK_URL}/projects/{}/apps/{}:exchangeDebugToken",
        config.project_id, config.app_id
    )
}

/// Initialize attestation once at startup and install the token in `access`.
pub async fn initialize_attestation(
    attestation: &Attestation,
    config: &FirebaseConfig,
    access: &AccessContext,
) -> Result<(), AuthError> {
    let debug_token = match attestation {
        Attestation::Disabled => {
            warn!("app check disabled; requests are sent without attestation");
            return Ok(());
        }
        Attestation::Debug(token) => token,
    };

    let resp = reqwest::Client::new()
        .post(exchange_url(config))
        .query(&[("key", config.api_key.as_str())])
        .json(&serde_json::json!({ "debugToken": debug_token }))
        .send()
        .await?;
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(error_from_body(status.as_u16(), body));
    }

    let token: AppCheckToken = resp.json().await?;
    access.set_app_check(Some(token.token));
    info!("app check token installed");
    Ok(())
}
