//! Extraction layer: prompt construction, the model seam, and response parsing.

pub mod extract;
pub mod prompt;

#[cfg(feature = "vertex")]
pub mod vertex;

pub use extract::{ExtractionError, ExtractionService, ParseError, parse_response};
pub use prompt::{ExtractionRequest, ImageRef, PromptBuilder};

#[cfg(feature = "vertex")]
pub use vertex::VertexClient;
