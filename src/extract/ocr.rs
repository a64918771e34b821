//! Tesseract engine wrapper.
//!
//! The engine handle is cheap and safe to share: each recognition call
//! builds its own Tesseract instance on the blocking thread pool, bounded
//! by a timeout. Per-token confidences come from the TSV output; tokens at
//! or below the configured floor are discarded from the assembled text,
//! and the average over retained tokens is reported alongside.

use std::io::Cursor;

use image::DynamicImage;
use tokio::time::{timeout, Duration};
#[cfg(feature = "ocr")]
use tracing::debug;

use crate::config::OcrConfig;
use crate::error::PipelineError;

#[cfg(feature = "ocr")]
use tesseract::{PageSegMode, Tesseract};

/// Recognized text for one page or image.
#[derive(Debug, Clone)]
pub struct OcrPage {
    pub text: String,
    /// Average confidence over retained tokens, 0-100. None when nothing
    /// was retained.
    pub avg_confidence: Option<f32>,
    pub word_count: usize,
}

#[derive(Clone)]
pub struct OcrEngine {
    config: OcrConfig,
}

impl OcrEngine {
    pub fn new(config: OcrConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OcrConfig {
        &self.config
    }

    /// Run OCR on an already-enhanced image. CPU-bound work runs on the
    /// blocking pool; the whole call is bounded by the configured timeout.
    pub async fn recognize(
        &self,
        image: &DynamicImage,
        language: &str,
    ) -> Result<OcrPage, PipelineError> {
        let mut png = Cursor::new(Vec::new());
        image
            .write_to(&mut png, image::ImageFormat::Png)
            .map_err(|e| PipelineError::ImageProcessing {
                details: format!("failed to encode image for OCR: {}", e),
            })?;
        let png = png.into_inner();

        let config = self.config.clone();
        let language = language.to_string();
        let timeout_seconds = config.timeout_seconds;

        let ocr_future =
            tokio::task::spawn_blocking(move || recognize_blocking(&png, &language, &config));

        match timeout(Duration::from_secs(timeout_seconds), ocr_future).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(PipelineError::OcrEngine {
                details: format!("OCR task failed: {}", join_err),
            }),
            Err(_) => Err(PipelineError::OcrTimeout {
                seconds: timeout_seconds,
            }),
        }
    }
}

#[cfg(feature = "ocr")]
fn recognize_blocking(
    png: &[u8],
    language: &str,
    config: &OcrConfig,
) -> Result<OcrPage, PipelineError> {
    let tesseract = Tesseract::new(config.datapath.as_deref(), Some(language)).map_err(|e| {
        PipelineError::OcrEngine {
            details: format!("Tesseract initialization failed: {}", e),
        }
    })?;

    let mut tesseract =
        tesseract
            .set_image_from_mem(png)
            .map_err(|e| PipelineError::ImageProcessing {
                details: format!("Tesseract rejected image: {}", e),
            })?;

    tesseract.set_page_seg_mode(page_seg_mode(config.page_segmentation_mode));

    let tsv = tesseract
        .get_tsv_text(0)
        .map_err(|e| PipelineError::OcrEngine {
            details: format!("failed to read recognition output: {}", e),
        })?;

    let page = parse_tsv(&tsv, config.min_token_confidence);
    debug!(
        "OCR recognized {} words, avg confidence {:?}",
        page.word_count, page.avg_confidence
    );
    Ok(page)
}

#[cfg(not(feature = "ocr"))]
fn recognize_blocking(
    _png: &[u8],
    _language: &str,
    _config: &OcrConfig,
) -> Result<OcrPage, PipelineError> {
    Err(PipelineError::OcrEngine {
        details: "built without the 'ocr' feature".to_string(),
    })
}

#[cfg(feature = "ocr")]
fn page_seg_mode(mode: u8) -> PageSegMode {
    match mode {
        0 => PageSegMode::PsmOsdOnly,
        1 => PageSegMode::PsmAutoOsd,
        2 => PageSegMode::PsmAutoOnly,
        3 => PageSegMode::PsmAuto,
        4 => PageSegMode::PsmSingleColumn,
        5 => PageSegMode::PsmSingleBlockVertText,
        6 => PageSegMode::PsmSingleBlock,
        7 => PageSegMode::PsmSingleLine,
        8 => PageSegMode::PsmSingleWord,
        9 => PageSegMode::PsmCircleWord,
        10 => PageSegMode::PsmSingleChar,
        11 => PageSegMode::PsmSparseText,
        12 => PageSegMode::PsmSparseTextOsd,
        13 => PageSegMode::PsmRawLine,
        _ => PageSegMode::PsmAuto,
    }
}

/// Assemble text from Tesseract TSV output, dropping low-confidence tokens.
///
/// TSV rows are tab-separated with twelve columns; word rows are level 5
/// with the confidence in column 11 and the token in column 12.
fn parse_tsv(tsv: &str, min_token_confidence: f32) -> OcrPage {
    let mut tokens: Vec<&str> = Vec::new();
    let mut confidences: Vec<f32> = Vec::new();

    for line in tsv.lines() {
        let columns: Vec<&str> = line.split('\t').collect();
        if columns.len() < 12 {
            continue;
        }
        if columns[0] != "5" {
            continue;
        }
        let conf: f32 = match columns[10].parse() {
            Ok(c) => c,
            Err(_) => continue,
        };
        let token = columns[11].trim();
        if conf > min_token_confidence && !token.is_empty() {
            tokens.push(token);
            confidences.push(conf);
        }
    }

    let avg_confidence = if confidences.is_empty() {
        None
    } else {
        Some(confidences.iter().sum::<f32>() / confidences.len() as f32)
    };

    OcrPage {
        text: tokens.join(" "),
        word_count: tokens.len(),
        avg_confidence,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tsv_row(level: u8, conf: f32, text: &str) -> String {
        format!(
            "{}\t1\t1\t1\t1\t1\t0\t0\t10\t10\t{}\t{}",
            level, conf, text
        )
    }

    #[test]
    fn test_parse_tsv_filters_low_confidence_tokens() {
        let tsv = [
            tsv_row(5, 92.0, "Invoice"),
            tsv_row(5, 15.0, "xq"),
            tsv_row(5, 88.0, "Total"),
        ]
        .join("\n");

        let page = parse_tsv(&tsv, 30.0);
        assert_eq!(page.text, "Invoice Total");
        assert_eq!(page.word_count, 2);
        let avg = page.avg_confidence.unwrap();
        assert!((avg - 90.0).abs() < 0.01);
    }

    #[test]
    fn test_parse_tsv_ignores_non_word_rows() {
        // Level 4 is a line row; its conf column is -1
        let tsv = [tsv_row(4, -1.0, ""), tsv_row(5, 75.0, "hello")].join("\n");
        let page = parse_tsv(&tsv, 30.0);
        assert_eq!(page.text, "hello");
        assert_eq!(page.word_count, 1);
    }

    #[test]
    fn test_parse_tsv_empty_input() {
        let page = parse_tsv("", 30.0);
        assert!(page.text.is_empty());
        assert_eq!(page.word_count, 0);
        assert!(page.avg_confidence.is_none());
    }

    #[test]
    fn test_parse_tsv_all_below_threshold() {
        let tsv = [tsv_row(5, 10.0, "noise"), tsv_row(5, 20.0, "more")].join("\n");
        let page = parse_tsv(&tsv, 30.0);
        assert!(page.text.is_empty());
        assert!(page.avg_confidence.is_none());
    }
}
