pub mod config;
pub mod detect;
pub mod error;
pub mod extract;
pub mod models;
pub mod parse;
pub mod pipeline;
pub mod score;

pub use config::{ExtractorConfig, OcrConfig, PipelineConfig, ScoringConfig};
pub use error::PipelineError;
pub use models::{
    DocumentType, ExtractedData, ExtractionMethod, FieldMap, FieldValue, ProcessingOptions,
    ProcessingResult,
};
pub use pipeline::{hash, DocumentPipeline};
