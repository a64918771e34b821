//! PDF handling: digital text extraction and page rendering for the OCR
//! fallback.
//!
//! Digital extraction walks pages with `lopdf`, concatenating page texts
//! with page-boundary markers and pulling title/author out of the info
//! dictionary when present. Rendering shells out to `pdftoppm` at a fixed
//! DPI, one PNG per page.

use std::time::{SystemTime, UNIX_EPOCH};

use image::DynamicImage;
use lopdf::{Document, Object};
use tracing::{debug, warn};

use crate::detect::find_pdf_header;
use crate::error::PipelineError;
use crate::models::ExtractionMetadata;

/// Digital text plus document metadata from a PDF's embedded text layer.
#[derive(Debug, Clone)]
pub struct DigitalPdfText {
    pub text: String,
    pub metadata: ExtractionMetadata,
}

/// Strip anything before the `%PDF-` header. Returns the input unchanged
/// when no header is found; the loader will produce its own error then.
pub fn clean_pdf_data(data: &[u8]) -> &[u8] {
    match find_pdf_header(data) {
        Some(offset) => &data[offset..],
        None => data,
    }
}

/// Extract embedded text from a digital PDF, page by page in page order.
/// Pages without a text layer are skipped; a page-level extraction error is
/// logged and skipped rather than failing the document.
pub fn extract_digital_text(bytes: &[u8]) -> Result<DigitalPdfText, PipelineError> {
    let doc = Document::load_mem(clean_pdf_data(bytes)).map_err(|e| {
        PipelineError::PdfProcessing {
            details: format!("failed to load PDF: {}", e),
        }
    })?;

    let pages = doc.get_pages();
    let mut sections = Vec::new();

    for page_number in pages.keys() {
        match doc.extract_text(&[*page_number]) {
            Ok(page_text) => {
                let trimmed = page_text.trim();
                if !trimmed.is_empty() {
                    sections.push(format!("--- Page {} ---\n{}", page_number, trimmed));
                }
            }
            Err(e) => {
                warn!("Text extraction failed on page {}: {}", page_number, e);
            }
        }
    }

    let mut metadata = info_metadata(&doc);
    metadata.page_count = Some(pages.len());

    debug!(
        "Digital extraction found {} text-bearing pages of {}",
        sections.len(),
        pages.len()
    );

    Ok(DigitalPdfText {
        text: sections.join("\n\n"),
        metadata,
    })
}

/// Title and author from the trailer's info dictionary, when present.
fn info_metadata(doc: &Document) -> ExtractionMetadata {
    let mut metadata = ExtractionMetadata::default();

    let info = doc
        .trailer
        .get(b"Info")
        .ok()
        .and_then(|obj| match obj {
            Object::Reference(id) => doc.get_object(*id).ok(),
            other => Some(other),
        })
        .and_then(|obj| obj.as_dict().ok());

    if let Some(info) = info {
        metadata.title = info
            .get(b"Title")
            .ok()
            .and_then(|v| v.as_str().ok())
            .map(decode_pdf_string)
            .filter(|s| !s.is_empty());
        metadata.author = info
            .get(b"Author")
            .ok()
            .and_then(|v| v.as_str().ok())
            .map(decode_pdf_string)
            .filter(|s| !s.is_empty());
    }

    metadata
}

/// PDF text strings are either UTF-16BE with a BOM or a latin-ish byte
/// encoding; decode both leniently.
fn decode_pdf_string(raw: &[u8]) -> String {
    if raw.len() >= 2 && raw[0] == 0xFE && raw[1] == 0xFF {
        let utf16: Vec<u16> = raw[2..]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16_lossy(&utf16).trim().to_string()
    } else {
        String::from_utf8_lossy(raw).trim().to_string()
    }
}

/// Render every page of a PDF to a PNG at the given DPI via `pdftoppm`.
/// Returned images follow page order.
pub async fn render_pages(
    bytes: &[u8],
    dpi: u32,
    temp_dir: &str,
) -> Result<Vec<DynamicImage>, PipelineError> {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    let work_dir = format!("{}/docsift_pages_{}_{}", temp_dir, std::process::id(), millis);
    tokio::fs::create_dir_all(&work_dir).await?;

    let result = render_pages_in(bytes, dpi, &work_dir).await;

    if let Err(e) = tokio::fs::remove_dir_all(&work_dir).await {
        warn!("Failed to clean up render directory {}: {}", work_dir, e);
    }

    result
}

async fn render_pages_in(
    bytes: &[u8],
    dpi: u32,
    work_dir: &str,
) -> Result<Vec<DynamicImage>, PipelineError> {
    let pdf_path = format!("{}/input.pdf", work_dir);
    let prefix = format!("{}/page", work_dir);
    tokio::fs::write(&pdf_path, clean_pdf_data(bytes)).await?;

    let output = tokio::process::Command::new("pdftoppm")
        .arg("-r")
        .arg(dpi.to_string())
        .arg("-png")
        .arg(&pdf_path)
        .arg(&prefix)
        .output()
        .await
        .map_err(|e| PipelineError::PdfProcessing {
            details: format!("failed to run pdftoppm: {}", e),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(PipelineError::PdfProcessing {
            details: format!("pdftoppm failed: {}", stderr.trim()),
        });
    }

    // pdftoppm names outputs page-1.png, page-2.png (zero-padded for larger
    // documents); sort by the parsed page number, not lexically.
    let mut entries = Vec::new();
    let mut dir = tokio::fs::read_dir(work_dir).await?;
    while let Some(entry) = dir.next_entry().await? {
        let name = entry.file_name().to_string_lossy().to_string();
        if let Some(page_number) = page_number_from_name(&name) {
            entries.push((page_number, entry.path()));
        }
    }
    entries.sort_by_key(|(page_number, _)| *page_number);

    if entries.is_empty() {
        return Err(PipelineError::PdfProcessing {
            details: "pdftoppm produced no page images".to_string(),
        });
    }

    let mut images = Vec::with_capacity(entries.len());
    for (page_number, path) in entries {
        let data = tokio::fs::read(&path).await?;
        let img = image::load_from_memory(&data).map_err(|e| PipelineError::PdfProcessing {
            details: format!("failed to decode rendered page {}: {}", page_number, e),
        })?;
        images.push(img);
    }

    debug!("Rendered {} PDF pages at {} DPI", images.len(), dpi);
    Ok(images)
}

fn page_number_from_name(name: &str) -> Option<u32> {
    let stem = name.strip_suffix(".png")?;
    let digits = stem.rsplit('-').next()?;
    digits.parse().ok()
}
