//! Firebase Storage and Cloud Firestore over their REST APIs.

mod firestore;
mod storage;

pub use firestore::Firestore;
pub use storage::FirebaseStorage;

use nietdoen_core::AccessContext;

use crate::StoreError;

/// Attach the attestation token, if one was installed at startup.
fn with_app_check(builder: reqwest::RequestBuilder, access: &AccessContext) -> reqwest::RequestBuilder {
    match access.app_check() {
        Some(token) => builder.header("X-Firebase-AppCheck", token),
        None => builder,
    }
}

/// Turn a non-2xx response into [`StoreError::Server`].
async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, StoreError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(StoreError::Server {
        status: status.as_u16(),
        body,
    })
}
