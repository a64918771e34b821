use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Declared document type, drawn from the known set. Anything the caller
/// declares outside that set falls back to `Generic`, which gets the
/// catch-all parser instead of a typed rule set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Invoice,
    Contract,
    Identity,
    BankStatement,
    Generic,
}

/// Expected field vocabulary for a document type.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentSchema {
    pub required_fields: &'static [&'static str],
    pub optional_fields: &'static [&'static str],
}

impl DocumentType {
    pub fn from_declared(declared: &str) -> Self {
        match declared.to_lowercase().as_str() {
            "invoice" => DocumentType::Invoice,
            "contract" => DocumentType::Contract,
            "identity" => DocumentType::Identity,
            "bank_statement" => DocumentType::BankStatement,
            _ => DocumentType::Generic,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Invoice => "invoice",
            DocumentType::Contract => "contract",
            DocumentType::Identity => "identity",
            DocumentType::BankStatement => "bank_statement",
            DocumentType::Generic => "generic",
        }
    }

    pub fn schema(&self) -> DocumentSchema {
        match self {
            DocumentType::Invoice => DocumentSchema {
                required_fields: &["invoice_number", "amount", "date"],
                optional_fields: &[
                    "due_date",
                    "customer_name",
                    "tax_amount",
                    "subtotal",
                    "currency",
                    "po_number",
                ],
            },
            DocumentType::Contract => DocumentSchema {
                required_fields: &["parties", "contract_value"],
                optional_fields: &[
                    "effective_date",
                    "start_date",
                    "end_date",
                    "payment_terms",
                    "governing_law",
                ],
            },
            DocumentType::Identity => DocumentSchema {
                required_fields: &["name", "id_number", "date_of_birth"],
                optional_fields: &["nationality", "issue_date", "expiry_date", "address"],
            },
            DocumentType::BankStatement => DocumentSchema {
                required_fields: &["account_number", "balance"],
                optional_fields: &["period_start", "period_end", "bank_name", "account_holder"],
            },
            DocumentType::Generic => DocumentSchema {
                required_fields: &[],
                optional_fields: &["dates_found", "amounts_found", "emails_found", "phones_found"],
            },
        }
    }

    /// Full field vocabulary for this type. Parsed output only ever carries
    /// keys from this list; unknown keys from the structured extractor are
    /// dropped rather than injected.
    pub fn known_fields(&self) -> Vec<&'static str> {
        let schema = self.schema();
        schema
            .required_fields
            .iter()
            .chain(schema.optional_fields.iter())
            .copied()
            .collect()
    }
}

/// A document as handed over by the caller: immutable bytes, declared
/// filename, declared type. Consumed once, never mutated.
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub document_type: DocumentType,
}

impl RawDocument {
    pub fn new(bytes: Vec<u8>, filename: impl Into<String>, declared_type: &str) -> Self {
        Self {
            bytes,
            filename: filename.into(),
            document_type: DocumentType::from_declared(declared_type),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Png,
    Jpeg,
    Tiff,
    Bmp,
}

/// Resolved file format. Derived from content signature and filename,
/// never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectedFormat {
    Pdf,
    Image(ImageKind),
}

impl DetectedFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectedFormat::Pdf => "pdf",
            DetectedFormat::Image(ImageKind::Png) => "png",
            DetectedFormat::Image(ImageKind::Jpeg) => "jpeg",
            DetectedFormat::Image(ImageKind::Tiff) => "tiff",
            DetectedFormat::Image(ImageKind::Bmp) => "bmp",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    DigitalText,
    OcrPdf,
    OcrImage,
    Error,
}

/// Per-document metadata collected during extraction. Fields are populated
/// depending on which extraction path ran.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_count: Option<usize>,
    /// Average OCR confidence over retained tokens, 0-100. Absent when no
    /// tokens were retained or the digital path ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_confidence: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub word_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

/// Result of the text-extraction stage. Never an error: failures degrade to
/// `method = Error` with empty text and at least one issue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionOutcome {
    pub text: String,
    pub method: ExtractionMethod,
    pub metadata: ExtractionMetadata,
    pub issues: Vec<String>,
}

impl ExtractionOutcome {
    pub fn error(issue: impl Into<String>) -> Self {
        Self {
            text: String::new(),
            method: ExtractionMethod::Error,
            metadata: ExtractionMetadata::default(),
            issues: vec![issue.into()],
        }
    }
}

/// An extracted field value. Untagged so the serialized form looks like the
/// natural JSON scalar or list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
    TextList(Vec<String>),
    NumberList(Vec<f64>),
}

impl FieldValue {
    /// Literal form used for the verbatim-presence check in per-field
    /// confidence scoring.
    pub fn literal(&self) -> String {
        match self {
            FieldValue::Number(n) => format_number(*n),
            FieldValue::Text(s) => s.clone(),
            FieldValue::TextList(items) => items.join(", "),
            FieldValue::NumberList(items) => items
                .iter()
                .map(|n| format_number(*n))
                .collect::<Vec<_>>()
                .join(", "),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Number(_) => false,
            FieldValue::Text(s) => s.trim().is_empty(),
            FieldValue::TextList(items) => items.is_empty(),
            FieldValue::NumberList(items) => items.is_empty(),
        }
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Parsed fields keyed by field name. BTreeMap keeps serialization order
/// stable across runs.
pub type FieldMap = BTreeMap<String, FieldValue>;

/// Per-call processing options supplied by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingOptions {
    pub language: String,
    pub extract_tables: bool,
    pub extract_signatures: bool,
    pub confidence_threshold: f64,
    pub manual_review_required: bool,
}

impl Default for ProcessingOptions {
    fn default() -> Self {
        Self {
            language: "eng".to_string(),
            extract_tables: true,
            extract_signatures: false,
            confidence_threshold: 0.7,
            manual_review_required: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingInfo {
    pub file_type: String,
    pub document_type: DocumentType,
    pub processing_method: ExtractionMethod,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedData {
    pub raw_text: String,
    pub parsed_fields: FieldMap,
    pub metadata: ExtractionMetadata,
    pub processing_info: ProcessingInfo,
}

/// The unit returned to the caller. Either a full success record or a
/// failure with a human-readable reason, never a partial mix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted_data: Option<ExtractedData>,
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_confidences: Option<BTreeMap<String, f64>>,
    pub issues: Vec<String>,
    pub requires_manual_review: bool,
    pub processed_at: DateTime<Utc>,
}

impl ProcessingResult {
    /// Failure result for pre-extraction validation errors. Carries no
    /// extraction issues: nothing ran.
    pub fn failure(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(reason.into()),
            extracted_data: None,
            confidence: 0.0,
            field_confidences: None,
            issues: Vec::new(),
            requires_manual_review: true,
            processed_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_type_from_declared() {
        assert_eq!(DocumentType::from_declared("invoice"), DocumentType::Invoice);
        assert_eq!(DocumentType::from_declared("INVOICE"), DocumentType::Invoice);
        assert_eq!(
            DocumentType::from_declared("bank_statement"),
            DocumentType::BankStatement
        );
        assert_eq!(
            DocumentType::from_declared("purchase_order"),
            DocumentType::Generic
        );
    }

    #[test]
    fn test_known_fields_cover_schema() {
        let fields = DocumentType::Invoice.known_fields();
        assert!(fields.contains(&"invoice_number"));
        assert!(fields.contains(&"amount"));
        assert!(fields.contains(&"po_number"));
    }

    #[test]
    fn test_field_value_literal() {
        assert_eq!(FieldValue::Number(1200.5).literal(), "1200.5");
        assert_eq!(FieldValue::Number(42.0).literal(), "42");
        assert_eq!(FieldValue::Text("INV-001".to_string()).literal(), "INV-001");
    }

    #[test]
    fn test_failure_result_shape() {
        let result = ProcessingResult::failure("too big");
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("too big"));
        assert!(result.extracted_data.is_none());
        assert!(result.issues.is_empty());
        assert!(result.requires_manual_review);
    }

    #[test]
    fn test_field_value_serializes_untagged() {
        let json = serde_json::to_string(&FieldValue::Number(1200.5)).unwrap();
        assert_eq!(json, "1200.5");
        let json = serde_json::to_string(&FieldValue::TextList(vec![
            "Acme Corp".to_string(),
            "Widget LLC".to_string(),
        ]))
        .unwrap();
        assert_eq!(json, r#"["Acme Corp","Widget LLC"]"#);
    }
}
