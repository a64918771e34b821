//! Text extraction: digital PDF path with OCR fallback, and the raster
//! image OCR path.
//!
//! The extractor never returns an error. Anything unexpected degrades to a
//! `method = Error` outcome with empty text and a descriptive issue, and
//! the pipeline carries on to parsing.

pub mod enhance;
pub mod ocr;
pub mod pdf;

use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::models::{DetectedFormat, ExtractionMetadata, ExtractionMethod, ExtractionOutcome};

use self::ocr::{OcrEngine, OcrPage};

pub struct TextExtractor {
    engine: OcrEngine,
    min_digital_text_len: usize,
}

impl TextExtractor {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            engine: OcrEngine::new(config.ocr.clone()),
            min_digital_text_len: config.min_digital_text_len,
        }
    }

    /// Extract raw text from a document. Branches on the detected format;
    /// PDFs try the cheap digital path first and fall back to per-page OCR.
    pub async fn extract(
        &self,
        bytes: &[u8],
        format: DetectedFormat,
        language: &str,
    ) -> ExtractionOutcome {
        match format {
            DetectedFormat::Pdf => self.extract_pdf(bytes, language).await,
            DetectedFormat::Image(_) => self.extract_image(bytes, language).await,
        }
    }

    async fn extract_pdf(&self, bytes: &[u8], language: &str) -> ExtractionOutcome {
        match pdf::extract_digital_text(bytes) {
            Ok(digital) if digital.text.trim().len() > self.min_digital_text_len => {
                info!(
                    "Accepted digital PDF text ({} chars, {} pages)",
                    digital.text.len(),
                    digital.metadata.page_count.unwrap_or(0)
                );
                ExtractionOutcome {
                    text: digital.text,
                    method: ExtractionMethod::DigitalText,
                    metadata: digital.metadata,
                    issues: Vec::new(),
                }
            }
            Ok(_) => {
                debug!("Digital PDF text empty or too short, falling back to OCR");
                self.ocr_pdf(bytes, language).await
            }
            Err(e) => {
                warn!("Digital PDF extraction failed, falling back to OCR: {}", e);
                self.ocr_pdf(bytes, language).await
            }
        }
    }

    /// OCR a scanned PDF: render each page, recognize pages concurrently,
    /// and concatenate in page order. Per-page failures become issues, not
    /// pipeline failures.
    async fn ocr_pdf(&self, bytes: &[u8], language: &str) -> ExtractionOutcome {
        let config = self.engine.config();
        let pages = match pdf::render_pages(bytes, config.render_dpi, &config.temp_dir).await {
            Ok(pages) => pages,
            Err(e) => {
                return ExtractionOutcome::error(format!("Scanned PDF processing error: {}", e));
            }
        };

        let page_count = pages.len();
        let recognitions = join_all(pages.iter().map(|page| async {
            let enhanced = enhance::enhance_for_ocr(page);
            self.engine.recognize(&enhanced, language).await
        }))
        .await;

        // join_all preserves input order, so assembly order is page order
        // no matter how individual pages interleave.
        let mut sections = Vec::new();
        let mut issues = Vec::new();
        let mut confidences = Vec::new();
        let mut word_count = 0usize;

        for (index, recognition) in recognitions.into_iter().enumerate() {
            let page_number = index + 1;
            match recognition {
                Ok(OcrPage {
                    text,
                    avg_confidence,
                    word_count: words,
                }) if !text.trim().is_empty() => {
                    sections.push(format!("--- Page {} ---\n{}", page_number, text));
                    if let Some(conf) = avg_confidence {
                        confidences.push(conf);
                    }
                    word_count += words;
                }
                Ok(_) => {
                    issues.push(format!("No text detected on page {}", page_number));
                }
                Err(e) => {
                    issues.push(format!("OCR error on page {}: {}", page_number, e));
                }
            }
        }

        let metadata = ExtractionMetadata {
            page_count: Some(page_count),
            avg_confidence: mean(&confidences),
            word_count: Some(word_count),
            ..Default::default()
        };

        info!(
            "OCR PDF extraction: {} pages, {} with text, {} issues",
            page_count,
            sections.len(),
            issues.len()
        );

        ExtractionOutcome {
            text: sections.join("\n\n"),
            method: ExtractionMethod::OcrPdf,
            metadata,
            issues,
        }
    }

    async fn extract_image(&self, bytes: &[u8], language: &str) -> ExtractionOutcome {
        let img = match image::load_from_memory(bytes) {
            Ok(img) => img,
            Err(e) => {
                return ExtractionOutcome::error(format!("Image processing error: {}", e));
            }
        };

        let mut metadata = ExtractionMetadata {
            image_format: image::guess_format(bytes)
                .ok()
                .map(|f| format!("{:?}", f).to_lowercase()),
            width: Some(img.width()),
            height: Some(img.height()),
            ..Default::default()
        };

        let enhanced = enhance::enhance_for_ocr(&img);
        let page = match self.engine.recognize(&enhanced, language).await {
            Ok(page) => page,
            Err(e) => {
                return ExtractionOutcome::error(format!("Image processing error: {}", e));
            }
        };

        metadata.avg_confidence = page.avg_confidence;
        metadata.word_count = Some(page.word_count);

        let config = self.engine.config();
        let mut issues = Vec::new();
        if let Some(conf) = page.avg_confidence {
            if conf < config.low_confidence_threshold {
                issues.push("Low OCR confidence - image quality may be poor".to_string());
            }
        }
        if page.word_count > 0 && page.text.len() < config.min_text_len {
            issues.push(
                "Very little text detected - document may be blank or illegible".to_string(),
            );
        }

        debug!(
            "Image OCR: {} words, avg confidence {:?}, {} issues",
            page.word_count,
            page.avg_confidence,
            issues.len()
        );

        ExtractionOutcome {
            text: page.text,
            method: ExtractionMethod::OcrImage,
            metadata,
            issues,
        }
    }
}

fn mean(values: &[f32]) -> Option<f32> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f32>() / values.len() as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ExtractionMethod;

    #[test]
    fn test_error_outcome_invariant() {
        let outcome = ExtractionOutcome::error("boom");
        assert_eq!(outcome.method, ExtractionMethod::Error);
        assert!(outcome.text.is_empty());
        assert!(!outcome.issues.is_empty());
    }

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[80.0, 90.0]), Some(85.0));
    }

    #[tokio::test]
    async fn test_digital_pdf_never_reaches_ocr() {
        // A PDF with a healthy text layer must take the digital path; no
        // pdftoppm or tesseract involvement.
        let text = "This synthetic invoice body carries well over fifty characters of text.";
        let bytes = build_test_pdf(text);
        let extractor = TextExtractor::new(&crate::config::PipelineConfig::default());
        let outcome = extractor
            .extract(&bytes, DetectedFormat::Pdf, "eng")
            .await;
        assert_eq!(outcome.method, ExtractionMethod::DigitalText);
        assert!(outcome.text.contains("synthetic invoice body"));
        assert!(outcome.text.contains("--- Page 1 ---"));
        assert!(outcome.issues.is_empty());
    }

    fn build_test_pdf(text: &str) -> Vec<u8> {
        use lopdf::content::{Content, Operation};
        use lopdf::{dictionary, Document, Object, Stream};

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("encode content"),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).expect("save pdf");
        bytes
    }
}
