//! Ingestion pipeline: one image from selection to a persisted sign record.

mod error;
pub mod pipeline;
pub mod resize;
pub mod writer;

pub use error::{PipelineError, SaveError};
pub use pipeline::{CollectSession, Services, Stage};
pub use resize::{ResizeError, SourceImage};
pub use writer::{RecordWriter, WrittenSign};
