//! Field parsing: structured extraction with pattern fallback.
//!
//! When a structured extractor is configured its output is preferred, but
//! it is held to a strict contract: a JSON object whose keys belong to the
//! document type's field vocabulary. Unknown keys are dropped, and any
//! failure (transport, HTTP, malformed body, non-object output) downgrades
//! to the deterministic pattern parser with an issue recorded. The pattern
//! path itself cannot fail.

pub mod ai;
pub mod patterns;

use serde_json::Value;
use tracing::{debug, warn};

use crate::models::{DocumentType, FieldMap, FieldValue};

use self::ai::StructuredExtractor;
use self::patterns::PatternParser;

/// Which parsing path produced the fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStrategy {
    AiExtraction,
    PatternExtraction,
}

#[derive(Debug)]
pub struct ParseOutcome {
    pub fields: FieldMap,
    pub strategy: ParseStrategy,
    pub issues: Vec<String>,
}

pub struct FieldParser {
    patterns: PatternParser,
    extractor: Option<Box<dyn StructuredExtractor>>,
}

impl FieldParser {
    pub fn new() -> Self {
        Self {
            patterns: PatternParser::new(),
            extractor: None,
        }
    }

    pub fn with_extractor(extractor: Box<dyn StructuredExtractor>) -> Self {
        Self {
            patterns: PatternParser::new(),
            extractor: Some(extractor),
        }
    }

    pub async fn parse(&self, text: &str, document_type: DocumentType) -> ParseOutcome {
        if let Some(extractor) = &self.extractor {
            if !text.trim().is_empty() {
                match extractor.extract_fields(text, document_type).await {
                    Ok(value) => match fields_from_value(&value, document_type) {
                        Some(fields) => {
                            debug!(
                                "Structured extractor produced {} fields for {}",
                                fields.len(),
                                document_type.as_str()
                            );
                            return ParseOutcome {
                                fields,
                                strategy: ParseStrategy::AiExtraction,
                                issues: Vec::new(),
                            };
                        }
                        None => {
                            warn!("Structured extractor returned a non-object, using patterns");
                            return self.pattern_outcome(
                                text,
                                document_type,
                                vec![
                                    "Structured extraction returned malformed output; fell back to pattern parsing"
                                        .to_string(),
                                ],
                            );
                        }
                    },
                    Err(e) => {
                        warn!("Structured extraction failed, using patterns: {}", e);
                        return self.pattern_outcome(
                            text,
                            document_type,
                            vec![format!(
                                "Structured extraction failed ({}); fell back to pattern parsing",
                                e
                            )],
                        );
                    }
                }
            }
        }

        self.pattern_outcome(text, document_type, Vec::new())
    }

    fn pattern_outcome(
        &self,
        text: &str,
        document_type: DocumentType,
        issues: Vec<String>,
    ) -> ParseOutcome {
        ParseOutcome {
            fields: self.patterns.parse(text, document_type),
            strategy: ParseStrategy::PatternExtraction,
            issues,
        }
    }
}

impl Default for FieldParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert extractor output into a field map. Returns None when the value
/// is not a JSON object. Keys outside the document type's vocabulary and
/// values that do not map onto a field value are dropped.
fn fields_from_value(value: &Value, document_type: DocumentType) -> Option<FieldMap> {
    let object = value.as_object()?;
    let known = document_type.known_fields();

    let mut fields = FieldMap::new();
    for (key, raw) in object {
        if !known.contains(&key.as_str()) {
            debug!("Dropping unknown extractor field '{}'", key);
            continue;
        }
        if let Some(field_value) = field_value_from_json(raw) {
            if !field_value.is_empty() {
                fields.insert(key.clone(), field_value);
            }
        }
    }
    Some(fields)
}

fn field_value_from_json(value: &Value) -> Option<FieldValue> {
    match value {
        Value::Number(n) => n.as_f64().map(FieldValue::Number),
        Value::String(s) => Some(FieldValue::Text(s.clone())),
        Value::Array(items) => {
            if items.iter().all(|v| v.is_number()) {
                let numbers: Vec<f64> = items.iter().filter_map(|v| v.as_f64()).collect();
                Some(FieldValue::NumberList(numbers))
            } else if items.iter().all(|v| v.is_string()) {
                let texts: Vec<String> = items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect();
                Some(FieldValue::TextList(texts))
            } else {
                None
            }
        }
        _ => None,
    }
}
