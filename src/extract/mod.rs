//! Structured-payload extraction from model output
//!
//! Every stage that expects structured data from the model goes through
//! [`extract`]. Responses are noisy: payloads arrive wrapped in prose or code
//! fences, sometimes cut off mid-structure.

mod fence;
mod json;
mod markers;

pub use fence::{strip_code_fence, strip_fence_edges};
pub use json::{
    extract, extract_as, extract_text, Extraction, ExtractionError, Extractor, Strategy,
    ORIGINAL_EXCERPT_CHARS,
};
pub use markers::StructuralMarkers;
