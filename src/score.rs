//! Confidence scoring.
//!
//! The overall score starts at a base, blends in the OCR average when one
//! exists, earns bonuses for text volume and field yield, pays a flat
//! penalty per issue, and is clamped to the configured floor and ceiling.
//! The result is rounded to three decimals so equal inputs always print
//! identically.

use std::collections::BTreeMap;

use tracing::debug;

use crate::config::ScoringConfig;
use crate::models::FieldMap;

pub struct ConfidenceScorer {
    config: ScoringConfig,
}

impl ConfidenceScorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    /// Overall confidence for one processed document.
    ///
    /// `avg_ocr_confidence` is the 0-100 token average from OCR, absent on
    /// the digital path or when nothing was recognized. Without it the base
    /// stands alone, so an empty OCR result still scores near the base
    /// rather than collapsing to the floor.
    pub fn score(
        &self,
        text_len: usize,
        field_count: usize,
        issue_count: usize,
        avg_ocr_confidence: Option<f32>,
    ) -> f64 {
        let c = &self.config;

        let mut confidence = match avg_ocr_confidence {
            Some(avg) => (c.base + f64::from(avg) / 100.0) / 2.0,
            None => c.base,
        };

        if text_len > c.text_len_first_threshold {
            confidence += c.text_len_bonus;
        }
        if text_len > c.text_len_second_threshold {
            confidence += c.text_len_bonus;
        }

        if field_count > c.field_first_threshold {
            confidence += c.field_bonus;
        }
        if field_count > c.field_second_threshold {
            confidence += c.field_bonus;
        }

        confidence -= c.issue_penalty * issue_count as f64;

        let clamped = confidence.clamp(c.floor, c.ceiling);
        let rounded = round3(clamped);
        debug!(
            "Scored confidence {} (text {} chars, {} fields, {} issues, ocr avg {:?})",
            rounded, text_len, field_count, issue_count, avg_ocr_confidence
        );
        rounded
    }

    /// Per-field confidence: a field whose literal rendering appears
    /// verbatim in the raw text is trusted, anything else present was
    /// derived, and empty values get zero.
    pub fn per_field(&self, fields: &FieldMap, raw_text: &str) -> BTreeMap<String, f64> {
        fields
            .iter()
            .map(|(name, value)| {
                let confidence = if value.is_empty() {
                    0.0
                } else if raw_text.contains(&value.literal()) {
                    self.config.verbatim_field_confidence
                } else {
                    self.config.derived_field_confidence
                };
                (name.clone(), confidence)
            })
            .collect()
    }
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
