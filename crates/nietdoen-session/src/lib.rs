//! Session layer: the auth gate, credential service seam, and geolocation feed.

pub mod gate;
pub mod geo;

#[cfg(feature = "firebase")]
pub mod firebase;

pub use gate::{
    AuthError, AuthState, AuthStateChannel, CredentialService, GateView, SessionGate, SignInForm,
    User,
};
pub use geo::{GeoFeed, GeoSubscription};

#[cfg(feature = "firebase")]
pub use firebase::{Attestation, FirebaseAuth, initialize_attestation};
