//! Pattern-based field extraction.
//!
//! Each document type gets a fixed, ordered list of field cascades. Within
//! a cascade, patterns run in priority order and the first match wins;
//! more specific labels ("invoice date") sit ahead of generic ones
//! ("date"). The ordering is a deliberate precedence policy, so cascades
//! are lists, never sets.
//!
//! Amount-like fields are the one exception to first-match-wins: every
//! candidate number in the text is collected and the maximum kept, on the
//! heuristic that the grand total is usually the largest number on the
//! page. Downstream consumers depend on this exact behavior.

use regex::Regex;
use tracing::debug;

use crate::models::{DocumentType, FieldMap, FieldValue};

enum CascadeKind {
    /// First matching pattern wins; values shorter than `min_len` are
    /// skipped so a cascade cannot capture stray single words.
    Text { min_len: usize },
    /// First match that parses as a number wins.
    FirstNumber,
    /// All matches across all patterns are collected; the maximum wins.
    MaxNumber,
    /// All capture groups across all patterns, truncated to `max_items`.
    Collect { max_items: usize },
    /// Two capture groups populate this field and `end_field`.
    Range { end_field: &'static str },
}

struct FieldCascade {
    field: &'static str,
    kind: CascadeKind,
    patterns: Vec<Regex>,
}

impl FieldCascade {
    fn new<S: AsRef<str>>(field: &'static str, kind: CascadeKind, patterns: &[S]) -> Self {
        Self {
            field,
            kind,
            patterns: patterns
                .iter()
                .map(|p| Regex::new(p.as_ref()).expect("invalid field pattern"))
                .collect(),
        }
    }
}

pub struct PatternParser {
    invoice: Vec<FieldCascade>,
    contract: Vec<FieldCascade>,
    identity: Vec<FieldCascade>,
    bank_statement: Vec<FieldCascade>,
    generic_date: Regex,
    generic_amount: Regex,
    generic_email: Regex,
    generic_phone: Regex,
}

impl Default for PatternParser {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternParser {
    pub fn new() -> Self {
        let date = r"(\d{1,2}[-/]\d{1,2}[-/]\d{2,4})";
        let number = r"([0-9,]+\.?[0-9]*)";
        let name_chars = r"([A-Za-z0-9\s&.,()\-]+?)";

        let invoice = vec![
            FieldCascade::new(
                "invoice_number",
                CascadeKind::Text { min_len: 1 },
                &[
                    r"(?i)invoice\s*(?:number|#|no\.?)\s*:?\s*([A-Z0-9\-_]+)",
                    r"(?i)inv\s*(?:number|#|no\.?)\s*:?\s*([A-Z0-9\-_]+)",
                    r"(?i)bill\s*(?:number|#|no\.?)\s*:?\s*([A-Z0-9\-_]+)",
                ],
            ),
            FieldCascade::new(
                "amount",
                CascadeKind::MaxNumber,
                &[
                    format!(r"(?i)total\s*:?\s*\$?{number}"),
                    format!(r"(?i)amount\s*due\s*:?\s*\$?{number}"),
                    format!(r"(?i)balance\s*:?\s*\$?{number}"),
                    format!(r"\${number}"),
                ],
            ),
            FieldCascade::new(
                "date",
                CascadeKind::Text { min_len: 1 },
                &[
                    format!(r"(?i)invoice\s*date\s*:?\s*{date}"),
                    format!(r"(?i)date\s*:?\s*{date}"),
                    date.to_string(),
                ],
            ),
            FieldCascade::new(
                "due_date",
                CascadeKind::Text { min_len: 1 },
                &[
                    format!(r"(?i)due\s*date\s*:?\s*{date}"),
                    format!(r"(?i)payment\s*due\s*:?\s*{date}"),
                ],
            ),
            FieldCascade::new(
                "customer_name",
                CascadeKind::Text { min_len: 4 },
                &[
                    format!(r"(?i)bill\s*to\s*:?\s*{name_chars}(?:\n|$)"),
                    format!(r"(?i)customer\s*:?\s*{name_chars}(?:\n|$)"),
                    format!(r"(?i)to\s*:?\s*{name_chars}(?:\n|$)"),
                ],
            ),
        ];

        let contract = vec![
            FieldCascade::new(
                "parties",
                CascadeKind::Collect { max_items: 2 },
                &[
                    r"(?i)between\s+([^,\n]+)\s+and\s+([^,\n]+)".to_string(),
                    format!(r"(?i)party\s*(?:1|one)\s*:?\s*{name_chars}(?:\n|party)"),
                    format!(r"(?i)party\s*(?:2|two)\s*:?\s*{name_chars}(?:\n|$)"),
                ],
            ),
            FieldCascade::new(
                "contract_value",
                CascadeKind::FirstNumber,
                &[
                    format!(r"(?i)amount\s*of\s*\$?{number}"),
                    format!(r"(?i)value\s*:?\s*\$?{number}"),
                    format!(r"(?i)consideration\s*:?\s*\$?{number}"),
                ],
            ),
            FieldCascade::new(
                "effective_date",
                CascadeKind::Text { min_len: 1 },
                &[format!(r"(?i)effective\s*date\s*:?\s*{date}")],
            ),
            FieldCascade::new(
                "start_date",
                CascadeKind::Text { min_len: 1 },
                &[format!(r"(?i)start\s*date\s*:?\s*{date}")],
            ),
            FieldCascade::new(
                "end_date",
                CascadeKind::Text { min_len: 1 },
                &[format!(r"(?i)end\s*date\s*:?\s*{date}")],
            ),
        ];

        let identity = vec![
            FieldCascade::new(
                "name",
                CascadeKind::Text { min_len: 1 },
                &[
                    r"(?i)full\s*name\s*:?\s*([A-Za-z\s]+?)(?:\n|$)",
                    r"(?i)name\s*:?\s*([A-Za-z\s]+?)(?:\n|$)",
                ],
            ),
            FieldCascade::new(
                "id_number",
                CascadeKind::Text { min_len: 1 },
                &[
                    r"(?i)id\s*(?:number|no\.?)\s*:?\s*([A-Z0-9]+)",
                    r"(?i)license\s*(?:number|no\.?)\s*:?\s*([A-Z0-9]+)",
                    r"(?i)passport\s*(?:number|no\.?)\s*:?\s*([A-Z0-9]+)",
                ],
            ),
            FieldCascade::new(
                "date_of_birth",
                CascadeKind::Text { min_len: 1 },
                &[
                    format!(r"(?i)(?:dob|date\s*of\s*birth)\s*:?\s*{date}"),
                    format!(r"(?i)born\s*:?\s*{date}"),
                ],
            ),
        ];

        let bank_statement = vec![
            FieldCascade::new(
                "account_number",
                CascadeKind::Text { min_len: 1 },
                &[
                    r"(?i)account\s*(?:number|no\.?)\s*:?\s*([0-9\-]+)",
                    r"(?i)acct\s*(?:number|no\.?)\s*:?\s*([0-9\-]+)",
                ],
            ),
            FieldCascade::new(
                "balance",
                CascadeKind::FirstNumber,
                &[
                    format!(r"(?i)current\s*balance\s*:?\s*\$?{number}"),
                    format!(r"(?i)ending\s*balance\s*:?\s*\$?{number}"),
                    format!(r"(?i)balance\s*:?\s*\$?{number}"),
                ],
            ),
            FieldCascade::new(
                "period_start",
                CascadeKind::Range {
                    end_field: "period_end",
                },
                &[
                    format!(r"(?i)statement\s*period\s*:?\s*{date}\s*(?:to|-)\s*{date}"),
                    format!(r"(?i)from\s*{date}\s*to\s*{date}"),
                ],
            ),
        ];

        Self {
            invoice,
            contract,
            identity,
            bank_statement,
            generic_date: Regex::new(r"\d{1,2}[-/]\d{1,2}[-/]\d{2,4}").expect("date pattern"),
            generic_amount: Regex::new(r"\$?([0-9,]+\.?[0-9]*)").expect("amount pattern"),
            generic_email: Regex::new(r"\b[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}\b")
                .expect("email pattern"),
            generic_phone: Regex::new(
                r"(?:\+?1[-.\s]?)?\(?([0-9]{3})\)?[-.\s]?([0-9]{3})[-.\s]?([0-9]{4})",
            )
            .expect("phone pattern"),
        }
    }

    pub fn parse(&self, text: &str, document_type: DocumentType) -> FieldMap {
        let cascades = match document_type {
            DocumentType::Invoice => &self.invoice,
            DocumentType::Contract => &self.contract,
            DocumentType::Identity => &self.identity,
            DocumentType::BankStatement => &self.bank_statement,
            DocumentType::Generic => return self.parse_generic(text),
        };

        let mut fields = FieldMap::new();
        for cascade in cascades {
            apply_cascade(cascade, text, &mut fields);
        }
        debug!(
            "Pattern parser extracted {} fields for {}",
            fields.len(),
            document_type.as_str()
        );
        fields
    }

    /// Catch-all extraction for unrecognized document types: dates,
    /// money-like amounts, email addresses, and phone numbers as list
    /// fields.
    fn parse_generic(&self, text: &str) -> FieldMap {
        let mut fields = FieldMap::new();

        let dates: Vec<String> = self
            .generic_date
            .find_iter(text)
            .map(|m| m.as_str().to_string())
            .collect();
        if !dates.is_empty() {
            fields.insert("dates_found".to_string(), FieldValue::TextList(dates));
        }

        let amounts: Vec<f64> = self
            .generic_amount
            .captures_iter(text)
            .filter_map(|caps| parse_number(&caps[1]))
            .collect();
        if !amounts.is_empty() {
            fields.insert("amounts_found".to_string(), FieldValue::NumberList(amounts));
        }

        let emails: Vec<String> = self
            .generic_email
            .find_iter(text)
            .map(|m| m.as_str().to_string())
            .collect();
        if !emails.is_empty() {
            fields.insert("emails_found".to_string(), FieldValue::TextList(emails));
        }

        let phones: Vec<String> = self
            .generic_phone
            .captures_iter(text)
            .map(|caps| format!("({}) {}-{}", &caps[1], &caps[2], &caps[3]))
            .collect();
        if !phones.is_empty() {
            fields.insert("phones_found".to_string(), FieldValue::TextList(phones));
        }

        fields
    }
}

fn apply_cascade(cascade: &FieldCascade, text: &str, fields: &mut FieldMap) {
    match &cascade.kind {
        CascadeKind::Text { min_len } => {
            for pattern in &cascade.patterns {
                if let Some(caps) = pattern.captures(text) {
                    let value = caps[1].trim().to_string();
                    if value.len() >= *min_len {
                        fields.insert(cascade.field.to_string(), FieldValue::Text(value));
                        return;
                    }
                }
            }
        }
        CascadeKind::FirstNumber => {
            for pattern in &cascade.patterns {
                for caps in pattern.captures_iter(text) {
                    if let Some(value) = parse_number(&caps[1]) {
                        fields.insert(cascade.field.to_string(), FieldValue::Number(value));
                        return;
                    }
                }
            }
        }
        CascadeKind::MaxNumber => {
            let mut candidates = Vec::new();
            for pattern in &cascade.patterns {
                for caps in pattern.captures_iter(text) {
                    if let Some(value) = parse_number(&caps[1]) {
                        candidates.push(value);
                    }
                }
            }
            if let Some(max) = candidates.into_iter().reduce(f64::max) {
                fields.insert(cascade.field.to_string(), FieldValue::Number(max));
            }
        }
        CascadeKind::Collect { max_items } => {
            let mut items = Vec::new();
            for pattern in &cascade.patterns {
                for caps in pattern.captures_iter(text) {
                    for group in caps.iter().skip(1).flatten() {
                        let value = group.as_str().trim();
                        if !value.is_empty() {
                            items.push(value.to_string());
                        }
                    }
                }
            }
            items.truncate(*max_items);
            if !items.is_empty() {
                fields.insert(cascade.field.to_string(), FieldValue::TextList(items));
            }
        }
        CascadeKind::Range { end_field } => {
            for pattern in &cascade.patterns {
                if let Some(caps) = pattern.captures(text) {
                    if let (Some(start), Some(end)) = (caps.get(1), caps.get(2)) {
                        fields.insert(
                            cascade.field.to_string(),
                            FieldValue::Text(start.as_str().trim().to_string()),
                        );
                        fields.insert(
                            end_field.to_string(),
                            FieldValue::Text(end.as_str().trim().to_string()),
                        );
                        return;
                    }
                }
            }
        }
    }
}

/// Strip thousands separators and currency symbols before conversion.
/// Returns None when nothing parseable remains; the field stays absent.
fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> PatternParser {
        PatternParser::new()
    }

    #[test]
    fn test_invoice_number_precedence() {
        let text = "Bill No: B-77\nInvoice Number: INV-2024-001\n";
        let fields = parser().parse(text, DocumentType::Invoice);
        // The invoice-number pattern outranks the bill-number pattern
        assert_eq!(
            fields.get("invoice_number"),
            Some(&FieldValue::Text("INV-2024-001".to_string()))
        );
    }

    #[test]
    fn test_amount_prefers_maximum() {
        let text = "Subtotal: $1,000.00\nTotal: $1,200.50\n";
        let fields = parser().parse(text, DocumentType::Invoice);
        assert_eq!(fields.get("amount"), Some(&FieldValue::Number(1200.50)));
    }

    #[test]
    fn test_amount_strips_separators_and_currency() {
        let text = "Total: $12,345.67";
        let fields = parser().parse(text, DocumentType::Invoice);
        assert_eq!(fields.get("amount"), Some(&FieldValue::Number(12345.67)));
    }

    #[test]
    fn test_invoice_date_label_precedence() {
        let text = "Date: 01/05/2024\nInvoice Date: 02/06/2024\n";
        let fields = parser().parse(text, DocumentType::Invoice);
        assert_eq!(
            fields.get("date"),
            Some(&FieldValue::Text("02/06/2024".to_string()))
        );
    }

    #[test]
    fn test_missing_field_left_absent_not_zero() {
        let text = "no structured content here";
        let fields = parser().parse(text, DocumentType::Invoice);
        assert!(fields.get("amount").is_none());
        assert!(fields.get("invoice_number").is_none());
    }

    #[test]
    fn test_customer_name_skips_short_captures() {
        let text = "To: Al\nBill To: Acme Industrial Supply\n";
        let fields = parser().parse(text, DocumentType::Invoice);
        assert_eq!(
            fields.get("customer_name"),
            Some(&FieldValue::Text("Acme Industrial Supply".to_string()))
        );
    }

    #[test]
    fn test_contract_parties_from_between_clause() {
        let text = "This agreement is between Acme Corp and Widget LLC, effective immediately.";
        let fields = parser().parse(text, DocumentType::Contract);
        assert_eq!(
            fields.get("parties"),
            Some(&FieldValue::TextList(vec![
                "Acme Corp".to_string(),
                "Widget LLC".to_string()
            ]))
        );
    }

    #[test]
    fn test_contract_value_first_match_wins() {
        let text = "for the amount of $50,000.00 with residual value: $1.00";
        let fields = parser().parse(text, DocumentType::Contract);
        assert_eq!(
            fields.get("contract_value"),
            Some(&FieldValue::Number(50000.0))
        );
    }

    #[test]
    fn test_contract_dates() {
        let text = "Effective Date: 01/01/2024\nStart Date: 02/01/2024\nEnd Date: 12/31/2024";
        let fields = parser().parse(text, DocumentType::Contract);
        assert_eq!(
            fields.get("effective_date"),
            Some(&FieldValue::Text("01/01/2024".to_string()))
        );
        assert_eq!(
            fields.get("start_date"),
            Some(&FieldValue::Text("02/01/2024".to_string()))
        );
        assert_eq!(
            fields.get("end_date"),
            Some(&FieldValue::Text("12/31/2024".to_string()))
        );
    }

    #[test]
    fn test_identity_fields() {
        let text = "Full Name: Jane Q Public\nID Number: AB123456\nDOB: 03/04/1985\n";
        let fields = parser().parse(text, DocumentType::Identity);
        assert_eq!(
            fields.get("name"),
            Some(&FieldValue::Text("Jane Q Public".to_string()))
        );
        assert_eq!(
            fields.get("id_number"),
            Some(&FieldValue::Text("AB123456".to_string()))
        );
        assert_eq!(
            fields.get("date_of_birth"),
            Some(&FieldValue::Text("03/04/1985".to_string()))
        );
    }

    #[test]
    fn test_bank_statement_period_range() {
        let text = "Account Number: 1234-5678\nEnding Balance: $9,876.54\n\
                    Statement Period: 01/01/2024 to 01/31/2024\n";
        let fields = parser().parse(text, DocumentType::BankStatement);
        assert_eq!(
            fields.get("account_number"),
            Some(&FieldValue::Text("1234-5678".to_string()))
        );
        assert_eq!(fields.get("balance"), Some(&FieldValue::Number(9876.54)));
        assert_eq!(
            fields.get("period_start"),
            Some(&FieldValue::Text("01/01/2024".to_string()))
        );
        assert_eq!(
            fields.get("period_end"),
            Some(&FieldValue::Text("01/31/2024".to_string()))
        );
    }

    #[test]
    fn test_generic_catch_all_fields() {
        let text = "Meeting on 05/06/2024 cost $45.00, contact ops@example.com \
                    or (555) 123-4567.";
        let fields = parser().parse(text, DocumentType::Generic);
        assert_eq!(
            fields.get("dates_found"),
            Some(&FieldValue::TextList(vec!["05/06/2024".to_string()]))
        );
        assert!(matches!(
            fields.get("amounts_found"),
            Some(FieldValue::NumberList(amounts)) if amounts.contains(&45.0)
        ));
        assert_eq!(
            fields.get("emails_found"),
            Some(&FieldValue::TextList(vec!["ops@example.com".to_string()]))
        );
        assert_eq!(
            fields.get("phones_found"),
            Some(&FieldValue::TextList(vec!["(555) 123-4567".to_string()]))
        );
    }

    #[test]
    fn test_generic_empty_text_yields_no_fields() {
        let fields = parser().parse("", DocumentType::Generic);
        assert!(fields.is_empty());
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("1,200.50"), Some(1200.50));
        assert_eq!(parse_number("$42"), Some(42.0));
        assert_eq!(parse_number("n/a"), None);
        assert_eq!(parse_number(""), None);
    }
}
