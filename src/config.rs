use std::env;

use anyhow::Result;

/// Top-level pipeline configuration. Built once and passed into the
/// pipeline at construction; nothing here is process-global.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Maximum accepted file size in bytes.
    pub max_file_size: usize,
    /// Allowed filename extensions, lowercase, without the dot.
    pub allowed_extensions: Vec<String>,
    /// Minimum length of digitally extracted PDF text before the cheap
    /// path is accepted as final.
    pub min_digital_text_len: usize,
    pub ocr: OcrConfig,
    pub scoring: ScoringConfig,
    /// Optional external structured extractor. When absent the pattern
    /// parser runs directly.
    pub extractor: Option<ExtractorConfig>,
}

/// OCR engine configuration, passed into the text extractor at
/// construction time.
#[derive(Debug, Clone)]
pub struct OcrConfig {
    pub language: String,
    /// DPI used when rendering PDF pages for the OCR fallback.
    pub render_dpi: u32,
    /// Tokens at or below this confidence (0-100) are discarded.
    pub min_token_confidence: f32,
    /// Average confidence below this value produces an advisory issue.
    pub low_confidence_threshold: f32,
    /// Recovered text shorter than this produces an advisory issue.
    pub min_text_len: usize,
    pub timeout_seconds: u64,
    /// Tesseract page segmentation mode (0-13).
    pub page_segmentation_mode: u8,
    /// Override for the tessdata directory; None uses the system default.
    pub datapath: Option<String>,
    /// Directory for intermediate page renders.
    pub temp_dir: String,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            language: "eng".to_string(),
            render_dpi: 300,
            min_token_confidence: 30.0,
            low_confidence_threshold: 70.0,
            min_text_len: 50,
            timeout_seconds: 120,
            page_segmentation_mode: 3,
            datapath: None,
            temp_dir: env::temp_dir().to_string_lossy().to_string(),
        }
    }
}

/// Confidence-formula constants. These are heuristic values carried over
/// from the original scoring rules; they are configuration, not literals,
/// so they can be tuned without code changes.
#[derive(Debug, Clone)]
pub struct ScoringConfig {
    pub base: f64,
    pub text_len_bonus: f64,
    pub text_len_first_threshold: usize,
    pub text_len_second_threshold: usize,
    pub field_bonus: f64,
    pub field_first_threshold: usize,
    pub field_second_threshold: usize,
    pub issue_penalty: f64,
    pub floor: f64,
    pub ceiling: f64,
    pub verbatim_field_confidence: f64,
    pub derived_field_confidence: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            base: 0.5,
            text_len_bonus: 0.1,
            text_len_first_threshold: 100,
            text_len_second_threshold: 500,
            field_bonus: 0.1,
            field_first_threshold: 2,
            field_second_threshold: 5,
            issue_penalty: 0.05,
            floor: 0.1,
            ceiling: 1.0,
            verbatim_field_confidence: 0.9,
            derived_field_confidence: 0.5,
        }
    }
}

/// External AI structured-extractor endpoint. The call is bounded by the
/// timeout; any failure falls back to pattern parsing.
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    pub endpoint: String,
    pub timeout_seconds: u64,
    pub api_key: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_file_size: 10 * 1024 * 1024,
            allowed_extensions: ["pdf", "png", "jpg", "jpeg", "tiff", "bmp"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            min_digital_text_len: 50,
            ocr: OcrConfig::default(),
            scoring: ScoringConfig::default(),
            extractor: None,
        }
    }
}

impl PipelineConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        let extractor = env::var("EXTRACTOR_ENDPOINT").ok().map(|endpoint| ExtractorConfig {
            endpoint,
            timeout_seconds: env_parse("EXTRACTOR_TIMEOUT_SECONDS", 30),
            api_key: env::var("EXTRACTOR_API_KEY").ok(),
        });

        Ok(PipelineConfig {
            max_file_size: env_parse("MAX_FILE_SIZE_MB", 10) * 1024 * 1024,
            allowed_extensions: env::var("ALLOWED_FILE_TYPES")
                .unwrap_or_else(|_| "pdf,png,jpg,jpeg,tiff,bmp".to_string())
                .split(',')
                .map(|s| s.trim().to_lowercase())
                .collect(),
            min_digital_text_len: env_parse("MIN_DIGITAL_TEXT_LEN", defaults.min_digital_text_len),
            ocr: OcrConfig {
                language: env::var("OCR_LANGUAGE").unwrap_or_else(|_| "eng".to_string()),
                render_dpi: env_parse("OCR_RENDER_DPI", 300),
                min_token_confidence: env_parse("OCR_MIN_TOKEN_CONFIDENCE", 30.0),
                low_confidence_threshold: env_parse("OCR_LOW_CONFIDENCE_THRESHOLD", 70.0),
                min_text_len: env_parse("OCR_MIN_TEXT_LEN", 50),
                timeout_seconds: env_parse("OCR_TIMEOUT_SECONDS", 120),
                page_segmentation_mode: env_parse("OCR_PAGE_SEG_MODE", 3),
                datapath: env::var("TESSDATA_PREFIX").ok(),
                temp_dir: env::var("TEMP_DIR")
                    .unwrap_or_else(|_| env::temp_dir().to_string_lossy().to_string()),
            },
            scoring: ScoringConfig {
                base: env_parse("SCORE_BASE", 0.5),
                issue_penalty: env_parse("SCORE_ISSUE_PENALTY", 0.05),
                floor: env_parse("SCORE_FLOOR", 0.1),
                ..defaults.scoring
            },
            extractor,
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
