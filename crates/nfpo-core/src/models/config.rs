//! Configuration structures for the extraction pipeline.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Main configuration for the nfpo pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NfConfig {
    /// OCR toolchain and preprocessing configuration.
    pub ocr: OcrConfig,

    /// Rendering resolution ladder used by the OCR fallback.
    pub dpi: DpiLadder,

    /// Batch orchestration configuration.
    pub batch: BatchConfig,

    /// Workbook output configuration.
    pub output: OutputConfig,
}

/// OCR engine configuration.
///
/// Tool locations are expected to be already resolved; nothing here is
/// probed or validated against the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Tesseract language set (e.g. `por+osd+eng`).
    pub languages: String,

    /// Extra engine flags passed verbatim to tesseract.
    pub engine_flags: String,

    /// Tesseract executable.
    pub tesseract_cmd: PathBuf,

    /// Directory holding `*.traineddata` files, exported to the child
    /// process as `TESSDATA_PREFIX`.
    pub tessdata_dir: Option<PathBuf>,

    /// Directory holding the poppler binaries (`pdftoppm`, `pdfinfo`). Uses `PATH` when unset.
    pub poppler_dir: Option<PathBuf>,

    /// Worker threads used to rasterize pages.
    pub render_threads: usize,

    /// Gray level below which a pixel becomes black.
    pub binarize_threshold: u8,

    /// Contrast enhancement factor applied after binarization.
    pub contrast_factor: f32,
}

impl Default for OcrConfig {
    fn default() -> Self {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self {
            languages: "por+osd+eng".to_string(),
            engine_flags: "--psm 12 --oem 2".to_string(),
            tesseract_cmd: PathBuf::from("tesseract"),
            tessdata_dir: None,
            poppler_dir: None,
            render_threads: cores.min(2),
            binarize_threshold: 180,
            contrast_factor: 1.5,
        }
    }
}

impl OcrConfig {
    /// Full path of the `pdftoppm` executable.
    pub fn pdftoppm_cmd(&self) -> PathBuf {
        match &self.poppler_dir {
            Some(dir) => dir.join("pdftoppm"),
            None => PathBuf::from("pdftoppm"),
        }
    }

    pub fn pdfinfo_cmd(&self) -> PathBuf {
        match &self.poppler_dir {
            Some(dir) => dir.join("pdfinfo"),
            None => PathBuf::from("pdfinfo"),
        }
    }
}

/// Resolution ladder for the OCR fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DpiLadder {
    /// First resolution tried.
    pub initial: u32,
    /// Highest resolution tried.
    pub max: u32,
    /// Increment between tiers.
    pub step: u32,
}

impl Default for DpiLadder {
    fn default() -> Self {
        Self {
            initial: 300,
            max: 600,
            step: 100,
        }
    }
}

impl DpiLadder {
    pub fn new(initial: u32, max: u32, step: u32) -> Self {
        Self { initial, max, step }
    }

    /// Resolutions in the order they are attempted: `initial`, `initial + step`, ... up to `max`.
    pub fn tiers(&self) -> impl Iterator<Item = u32> {
        // A zero step yields only the initial tier.
        let step = if self.step == 0 { u32::MAX } else { self.step };
        (self.initial..=self.max).step_by(step as usize)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let fail = |reason| ConfigError::DpiLadder {
            initial: self.initial,
            max: self.max,
            step: self.step,
            reason,
        };
        if self.initial == 0 {
            return Err(fail("initial resolution must be positive"));
        }
        if self.step == 0 {
            return Err(fail("step must be positive"));
        }
        if self.initial > self.max {
            return Err(fail("initial resolution exceeds the maximum"));
        }
        Ok(())
    }
}

/// Batch orchestration configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Documents processed between pauses.
    pub batch_size: usize,

    /// Pause between batches in milliseconds.
    pub pause_ms: u64,

    /// Term that must appear in a file name for it to be processed (empty = any).
    pub name_filter: String,

    /// Terms that exclude a file when found in its name.
    pub exclude_terms: Vec<String>,

    /// Folder (relative to the input directory) receiving successful documents.
    pub processed_dir: String,

    /// Folder (relative to the input directory) receiving documents that need review.
    pub review_dir: String,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            pause_ms: 500,
            name_filter: String::new(),
            exclude_terms: Vec::new(),
            processed_dir: "Notas Processadas".to_string(),
            review_dir: "Precisa Revisar".to_string(),
        }
    }
}

/// Workbook output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// File name of the aggregated workbook.
    pub xlsx_filename: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            xlsx_filename: "POs.xlsx".to_string(),
        }
    }
}

impl NfConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check values that would make the pipeline loop or misbehave.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.dpi.validate()?;

        if self.batch.batch_size == 0 {
            return Err(ConfigError::Invalid {
                field: "batch.batch_size".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if !(self.ocr.contrast_factor.is_finite() && self.ocr.contrast_factor >= 0.0) {
            return Err(ConfigError::Invalid {
                field: "ocr.contrast_factor".to_string(),
                reason: "must be a non-negative number".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ladder_tiers() {
        let tiers: Vec<u32> = DpiLadder::default().tiers().collect();
        assert_eq!(tiers, vec![300, 400, 500, 600]);
    }

    #[test]
    fn test_ladder_stops_below_max() {
        let tiers: Vec<u32> = DpiLadder::new(300, 550, 100).tiers().collect();
        assert_eq!(tiers, vec![300, 400, 500]);
    }

    #[test]
    fn test_ladder_validation() {
        assert!(DpiLadder::default().validate().is_ok());
        assert!(DpiLadder::new(300, 600, 0).validate().is_err());
        assert!(DpiLadder::new(700, 600, 100).validate().is_err());
        assert_eq!(DpiLadder::new(300, 600, 0).tiers().count(), 1);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: NfConfig = serde_json::from_str(r#"{"dpi": {"max": 400}}"#).unwrap();
        assert_eq!(config.dpi, DpiLadder::new(300, 400, 100));
        assert_eq!(config.output.xlsx_filename, "POs.xlsx");
        assert_eq!(config.ocr.languages, "por+osd+eng");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_file_errors_are_config_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        assert!(matches!(NfConfig::from_file(&path), Err(ConfigError::Io(_))));

        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(NfConfig::from_file(&path), Err(ConfigError::Parse(_))));

        NfConfig::default().save(&path).unwrap();
        assert_eq!(NfConfig::from_file(&path).unwrap().dpi, DpiLadder::default());
    }
}
