//! File format detection and pre-extraction validation.
//!
//! Two separate gates run before any extraction work:
//! 1. `validate_document` - max size, allowed extension list, and a
//!    signature-vs-extension sanity check. Failures here short-circuit the
//!    whole pipeline with a validation failure.
//! 2. `detect_format` - resolves the concrete format used for branching.
//!    The content signature (magic bytes) takes precedence over the filename
//!    suffix when both are recognized but disagree; the suffix is the
//!    fallback when no signature matches.

use std::path::Path;

use tracing::{debug, warn};

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::models::{DetectedFormat, ImageKind};

/// Validate size, extension, and content signature before processing.
///
/// The mismatch check only rejects files whose signature resolves to
/// something outside the supported set entirely (an archive renamed to
/// ".pdf", say). A supported signature under the wrong suffix is left for
/// `detect_format` to reclassify, signature winning.
pub fn validate_document(
    bytes: &[u8],
    filename: &str,
    config: &PipelineConfig,
) -> Result<(), PipelineError> {
    if bytes.len() > config.max_file_size {
        return Err(PipelineError::FileTooLarge {
            size: bytes.len(),
            max: config.max_file_size,
        });
    }

    let extension = extension_of(filename).ok_or_else(|| PipelineError::MissingExtension {
        filename: filename.to_string(),
    })?;

    if !config.allowed_extensions.contains(&extension) {
        return Err(PipelineError::UnsupportedFormat {
            extension,
            supported: config.allowed_extensions.join(", "),
        });
    }

    if let Some(kind) = infer::get(bytes) {
        let mime = kind.mime_type();
        let supported = mime == "application/pdf"
            || matches!(mime, "image/png" | "image/jpeg" | "image/tiff" | "image/bmp");
        if !supported {
            warn!(
                "Content signature '{}' for '{}' is outside the supported set",
                mime, filename
            );
            return Err(PipelineError::ContentMismatch {
                extension,
                detected: mime.to_string(),
            });
        }
    }

    Ok(())
}

/// Resolve the concrete format used for extraction branching.
pub fn detect_format(bytes: &[u8], filename: &str) -> Result<DetectedFormat, PipelineError> {
    let extension = extension_of(filename).ok_or_else(|| PipelineError::MissingExtension {
        filename: filename.to_string(),
    })?;

    // Magic bytes first. A ".jpg" carrying a PDF header is a PDF.
    if let Some(kind) = infer::get(bytes) {
        match kind.mime_type() {
            "application/pdf" => {
                debug!("Content signature classified '{}' as PDF", filename);
                return Ok(DetectedFormat::Pdf);
            }
            "image/png" => return Ok(DetectedFormat::Image(ImageKind::Png)),
            "image/jpeg" => return Ok(DetectedFormat::Image(ImageKind::Jpeg)),
            "image/tiff" => return Ok(DetectedFormat::Image(ImageKind::Tiff)),
            "image/bmp" => return Ok(DetectedFormat::Image(ImageKind::Bmp)),
            other => {
                debug!(
                    "Ignoring unusable content signature '{}' for '{}', falling back to extension",
                    other, filename
                );
            }
        }
    }

    // The infer probe misses PDFs with leading junk bytes; search for the
    // header the way a lenient reader would.
    if find_pdf_header(bytes).is_some() {
        return Ok(DetectedFormat::Pdf);
    }

    // Suffix fallback via the shared mime table.
    if let Some(mime) = mime_guess::from_path(filename).first() {
        match mime.essence_str() {
            "application/pdf" => return Ok(DetectedFormat::Pdf),
            "image/png" => return Ok(DetectedFormat::Image(ImageKind::Png)),
            "image/jpeg" => return Ok(DetectedFormat::Image(ImageKind::Jpeg)),
            "image/tiff" => return Ok(DetectedFormat::Image(ImageKind::Tiff)),
            "image/bmp" => return Ok(DetectedFormat::Image(ImageKind::Bmp)),
            _ => {}
        }
    }

    Err(PipelineError::UnsupportedFormat {
        extension,
        supported: "pdf, png, jpg, jpeg, tiff, bmp".to_string(),
    })
}

/// Locate the `%PDF-` header within the first 1 KiB. Some PDFs carry
/// leading null bytes or other junk before the header.
pub fn find_pdf_header(data: &[u8]) -> Option<usize> {
    if data.len() < 5 {
        return None;
    }
    let search_limit = data.len().min(1024);
    (0..=search_limit.saturating_sub(5)).find(|&i| &data[i..i + 5] == b"%PDF-")
}

fn extension_of(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;

    fn config() -> PipelineConfig {
        PipelineConfig::default()
    }

    #[test]
    fn test_oversized_file_rejected() {
        let mut config = config();
        config.max_file_size = 16;
        let err = validate_document(&[0u8; 32], "doc.pdf", &config).unwrap_err();
        assert!(matches!(err, PipelineError::FileTooLarge { size: 32, .. }));
    }

    #[test]
    fn test_disallowed_extension_rejected() {
        let err = validate_document(b"hello", "report.docx", &config()).unwrap_err();
        assert!(matches!(err, PipelineError::UnsupportedFormat { .. }));
    }

    #[test]
    fn test_missing_extension_rejected() {
        let err = validate_document(b"hello", "README", &config()).unwrap_err();
        assert!(matches!(err, PipelineError::MissingExtension { .. }));
    }

    #[test]
    fn test_foreign_signature_rejected() {
        // ZIP magic under a .pdf suffix
        let zip = [0x50, 0x4B, 0x03, 0x04, 0x00, 0x00, 0x00, 0x00];
        let err = validate_document(&zip, "invoice.pdf", &config()).unwrap_err();
        assert!(matches!(err, PipelineError::ContentMismatch { .. }));
    }

    #[test]
    fn test_signature_overrides_extension() {
        // PDF magic under a .jpg suffix classifies as PDF
        let format = detect_format(b"%PDF-1.4\nrest of file", "scan.jpg").unwrap();
        assert_eq!(format, DetectedFormat::Pdf);
    }

    #[test]
    fn test_image_signatures() {
        let png = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
        assert_eq!(
            detect_format(&png, "photo.png").unwrap(),
            DetectedFormat::Image(ImageKind::Png)
        );

        let jpeg = [0xFF, 0xD8, 0xFF, 0xE0, 0, 0, 0, 0];
        assert_eq!(
            detect_format(&jpeg, "photo.jpg").unwrap(),
            DetectedFormat::Image(ImageKind::Jpeg)
        );
    }

    #[test]
    fn test_extension_fallback_without_signature() {
        // No recognizable magic; the declared suffix decides
        assert_eq!(
            detect_format(b"not really anything", "scan.pdf").unwrap(),
            DetectedFormat::Pdf
        );
        assert_eq!(
            detect_format(b"not really anything", "scan.tiff").unwrap(),
            DetectedFormat::Image(ImageKind::Tiff)
        );
    }

    #[test]
    fn test_pdf_header_with_leading_nulls() {
        let mut data = vec![0u8; 64];
        data.extend_from_slice(b"%PDF-1.7\n");
        assert_eq!(find_pdf_header(&data), Some(64));
        assert_eq!(detect_format(&data, "doc.pdf").unwrap(), DetectedFormat::Pdf);
    }

    #[test]
    fn test_unusable_suffix_fails_detection() {
        let err = detect_format(b"plain text", "notes.txt").unwrap_err();
        assert!(matches!(err, PipelineError::UnsupportedFormat { .. }));
    }
}
