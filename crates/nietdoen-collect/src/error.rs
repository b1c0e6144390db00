use nietdoen_ai::{ExtractionError, ParseError};
use nietdoen_core::{FormError, SnapshotError, ValidationErrors};
use nietdoen_store::StoreError;
use thiserror::Error;

use crate::resize::ResizeError;

/// Failures between image selection and a populated draft, plus form edits.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no image selected")]
    NoImage,

    #[error("no record to review")]
    NoDraft,

    #[error("image resize failed: {0}")]
    Resize(#[from] ResizeError),

    #[error("image upload failed: {0}")]
    Upload(#[from] StoreError),

    #[error("upload did not report a content type")]
    MissingContentType,

    #[error("model invocation failed: {0}")]
    Model(#[from] ExtractionError),

    #[error("could not read model response: {0}")]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Form(#[from] FormError),
}

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("no record to save")]
    NoDraft,

    #[error("record is not valid: {0}")]
    Invalid(ValidationErrors),

    #[error("image upload has not completed")]
    MissingStorage,

    #[error("could not write record: {0}")]
    Persistence(#[from] StoreError),
}

impl From<SnapshotError> for SaveError {
    fn from(e: SnapshotError) -> Self {
        match e {
            SnapshotError::Invalid(errors) => Self::Invalid(errors),
            SnapshotError::MissingStorage => Self::MissingStorage,
        }
    }
}
