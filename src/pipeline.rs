//! The document pipeline: validate, detect, extract, parse, score.
//!
//! `process` is the single entry point. Validation failures short-circuit
//! into a failure result; everything after validation degrades instead of
//! failing, so a processed document always comes back with a confidence
//! score and a manual-review flag the caller can act on.

use chrono::Utc;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::detect;
use crate::extract::TextExtractor;
use crate::models::{
    ExtractedData, ExtractionMethod, ProcessingInfo, ProcessingOptions, ProcessingResult,
    RawDocument,
};
use crate::parse::ai::{HttpExtractor, StructuredExtractor};
use crate::parse::FieldParser;
use crate::score::ConfidenceScorer;

pub struct DocumentPipeline {
    config: PipelineConfig,
    extractor: TextExtractor,
    parser: FieldParser,
    scorer: ConfidenceScorer,
}

impl DocumentPipeline {
    /// Build a pipeline from configuration. When an external extractor
    /// endpoint is configured, field parsing tries it before the pattern
    /// rules.
    pub fn new(config: PipelineConfig) -> Result<Self, crate::error::PipelineError> {
        let parser = match &config.extractor {
            Some(extractor_config) => {
                FieldParser::with_extractor(Box::new(HttpExtractor::new(extractor_config)?))
            }
            None => FieldParser::new(),
        };
        Ok(Self::assemble(config, parser))
    }

    /// Build a pipeline with a caller-supplied structured extractor. Used
    /// by tests and embedders that bring their own extraction service.
    pub fn with_structured_extractor(
        config: PipelineConfig,
        extractor: Box<dyn StructuredExtractor>,
    ) -> Self {
        let parser = FieldParser::with_extractor(extractor);
        Self::assemble(config, parser)
    }

    fn assemble(config: PipelineConfig, parser: FieldParser) -> Self {
        Self {
            extractor: TextExtractor::new(&config),
            scorer: ConfidenceScorer::new(config.scoring.clone()),
            parser,
            config,
        }
    }

    /// Process one document end to end.
    pub async fn process(
        &self,
        bytes: &[u8],
        filename: &str,
        declared_type: &str,
        options: &ProcessingOptions,
    ) -> ProcessingResult {
        let document = RawDocument::new(bytes.to_vec(), filename, declared_type);

        if let Err(e) = detect::validate_document(&document.bytes, &document.filename, &self.config)
        {
            warn!("Validation rejected '{}': {}", document.filename, e);
            return ProcessingResult::failure(e.to_string());
        }

        let format = match detect::detect_format(&document.bytes, &document.filename) {
            Ok(format) => format,
            Err(e) => {
                warn!("Format detection rejected '{}': {}", document.filename, e);
                return ProcessingResult::failure(e.to_string());
            }
        };

        let language = if options.language.trim().is_empty() {
            self.config.ocr.language.as_str()
        } else {
            options.language.as_str()
        };

        let extraction = self.extractor.extract(&document.bytes, format, language).await;
        let parsed = self
            .parser
            .parse(&extraction.text, document.document_type)
            .await;

        let mut issues = extraction.issues.clone();
        issues.extend(parsed.issues.iter().cloned());

        let confidence = self.scorer.score(
            extraction.text.len(),
            parsed.fields.len(),
            issues.len(),
            extraction.metadata.avg_confidence,
        );
        let field_confidences = self.scorer.per_field(&parsed.fields, &extraction.text);

        let requires_manual_review = options.manual_review_required
            || confidence < options.confidence_threshold
            || extraction.method == ExtractionMethod::Error
            || !parsed.issues.is_empty();

        info!(
            "Processed '{}' as {} ({}): confidence {}, {} fields, {} issues, review {}",
            document.filename,
            document.document_type.as_str(),
            format.as_str(),
            confidence,
            parsed.fields.len(),
            issues.len(),
            requires_manual_review
        );

        ProcessingResult {
            success: true,
            error: None,
            extracted_data: Some(ExtractedData {
                raw_text: extraction.text,
                parsed_fields: parsed.fields,
                metadata: extraction.metadata,
                processing_info: ProcessingInfo {
                    file_type: format.as_str().to_string(),
                    document_type: document.document_type,
                    processing_method: extraction.method,
                },
            }),
            confidence,
            field_confidences: if field_confidences.is_empty() {
                None
            } else {
                Some(field_confidences)
            },
            issues,
            requires_manual_review,
            processed_at: Utc::now(),
        }
    }

    /// Compare the document's digest against an expected value, case
    /// insensitively.
    pub fn verify_integrity(bytes: &[u8], expected_digest: &str) -> bool {
        hash(bytes).eq_ignore_ascii_case(expected_digest.trim())
    }
}

/// SHA-256 digest of the raw bytes as lowercase hex. Pure and deterministic;
/// the same bytes always hash identically regardless of filename or type.
pub fn hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
