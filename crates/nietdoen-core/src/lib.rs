pub mod access;
pub mod config;
pub mod record;
pub mod review;
pub mod schema;

pub use access::AccessContext;
pub use config::FirebaseConfig;
pub use record::{
    DraftRecord, ExtractionResult, FieldValue, GeoPoint, GeoReading, PersistedSign, SnapshotError,
    StorageRefs, normalize_sentinel,
};
pub use review::{Edit, FormControl, FormError, ValidationErrors};
pub use schema::{
    Control, FieldSpec, Language, NOT_APPLICABLE, Requirement, SchemaError, SchemaRegistry,
    ValueKind, sign_schema,
};
