use thiserror::Error;

/// Error taxonomy for the extraction pipeline.
///
/// Only validation errors are fatal: they are returned to the caller as a
/// failure result before any extraction work starts. Everything else is
/// recovered inside the pipeline (degraded extraction outcome, absent field,
/// or pattern fallback) and surfaces as an issue string instead.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("File size {size} bytes exceeds maximum of {max} bytes")]
    FileTooLarge { size: usize, max: usize },

    #[error("Missing file extension on '{filename}'")]
    MissingExtension { filename: String },

    #[error("Unsupported file format '{extension}'. Supported formats: {supported}")]
    UnsupportedFormat { extension: String, supported: String },

    #[error("File content does not match extension '.{extension}': detected '{detected}'")]
    ContentMismatch { extension: String, detected: String },

    #[error("PDF processing error: {details}")]
    PdfProcessing { details: String },

    #[error("Image processing error: {details}")]
    ImageProcessing { details: String },

    #[error("OCR engine failure: {details}")]
    OcrEngine { details: String },

    #[error("OCR timeout after {seconds} seconds")]
    OcrTimeout { seconds: u64 },

    #[error("Structured extractor unavailable: {details}")]
    ExtractorUnavailable { details: String },

    #[error("Structured extractor returned malformed output: {details}")]
    MalformedExtractorOutput { details: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PipelineError {
    /// Validation errors short-circuit the pipeline with `success = false`.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            PipelineError::FileTooLarge { .. }
                | PipelineError::MissingExtension { .. }
                | PipelineError::UnsupportedFormat { .. }
                | PipelineError::ContentMismatch { .. }
        )
    }

    /// Recoverable errors are downgraded to issue strings and the pipeline
    /// continues with whatever it has.
    pub fn is_recoverable(&self) -> bool {
        !self.is_validation()
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            PipelineError::FileTooLarge { .. } => "DOC_TOO_LARGE",
            PipelineError::MissingExtension { .. } => "DOC_NO_EXTENSION",
            PipelineError::UnsupportedFormat { .. } => "DOC_UNSUPPORTED_FORMAT",
            PipelineError::ContentMismatch { .. } => "DOC_CONTENT_MISMATCH",
            PipelineError::PdfProcessing { .. } => "DOC_PDF_ERROR",
            PipelineError::ImageProcessing { .. } => "DOC_IMAGE_ERROR",
            PipelineError::OcrEngine { .. } => "OCR_ENGINE_ERROR",
            PipelineError::OcrTimeout { .. } => "OCR_TIMEOUT",
            PipelineError::ExtractorUnavailable { .. } => "EXTRACTOR_UNAVAILABLE",
            PipelineError::MalformedExtractorOutput { .. } => "EXTRACTOR_MALFORMED",
            PipelineError::Io(_) => "DOC_IO_ERROR",
            PipelineError::Other(_) => "DOC_UNKNOWN_ERROR",
        }
    }
}
