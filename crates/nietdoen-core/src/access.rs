//! Tokens attached to every outbound service call.
//!
//! The attestation token is installed once at startup; the id token is set by
//! the credential service after a successful sign-in. Service clients read
//! both on each request, so gating is transparent to the pipeline.

use std::sync::RwLock;

#[derive(Debug, Default)]
pub struct AccessContext {
    app_check: RwLock<Option<String>>,
    id_token: RwLock<Option<String>>,
}

impl AccessContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_app_check(&self, token: Option<String>) {
        *self.app_check.write().unwrap_or_else(|e| e.into_inner()) = token;
    }

    pub fn app_check(&self) -> Option<String> {
        self.app_check.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn set_id_token(&self, token: Option<String>) {
        *self.id_token.write().unwrap_or_else(|e| e.into_inner()) = token;
    }

    pub fn id_token(&self) -> Option<String> {
        self.id_token.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_start_empty_and_can_be_replaced() {
        let access = AccessContext::new();
        assert_eq!(access.app_check(), None);
        assert_eq!(access.id_token(), None);

        access.set_app_check(Some("attest".into()));
        access.set_id_token(Some("first".into()));
        access.set_id_token(Some("second".into()));
        assert_eq!(access.app_check().as_deref(), Some("attest"));
        assert_eq!(access.id_token().as_deref(), Some("second"));

        access.set_id_token(None);
        assert_eq!(access.id_token(), None);
    }
}
