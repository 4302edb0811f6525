//! Tesseract command-line backend.

use std::path::PathBuf;
use std::process::Command;

use image::GrayImage;
use tracing::trace;

use super::{OcrBackend, Result};
use crate::error::OcrError;
use crate::models::config::OcrConfig;

/// Runs the `tesseract` executable on one page image at a time.
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    command: PathBuf,
    languages: String,
    flags: Vec<String>,
    tessdata: Option<PathBuf>,
}

impl TesseractEngine {
    pub fn new(command: impl Into<PathBuf>, languages: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            languages: languages.into(),
            flags: Vec::new(),
            tessdata: None,
        }
    }

    pub fn from_config(config: &OcrConfig) -> Self {
        let mut engine = Self::new(&config.tesseract_cmd, &config.languages).with_flags(&config.engine_flags);
        engine.tessdata = config.tessdata_dir.clone();
        engine
    }

    /// Engine flags, split on whitespace (e.g. `--psm 12 --oem 2`).
    pub fn with_flags(mut self, flags: &str) -> Self {
        self.flags = flags.split_whitespace().map(str::to_string).collect();
        self
    }

    pub fn with_tessdata(mut self, dir: impl Into<PathBuf>) -> Self {
        self.tessdata = Some(dir.into());
        self
    }

    fn command(&self, image_path: &std::path::Path) -> Command {
        let mut cmd = Command::new(&self.command);
        cmd.arg(image_path).arg("stdout");
        if !self.languages.is_empty() {
            cmd.arg("-l").arg(&self.languages);
        }
        cmd.args(&self.flags);
        // Scoped to the child; the parent environment is left alone.
        if let Some(dir) = &self.tessdata {
            cmd.env("TESSDATA_PREFIX", dir);
        }
        cmd
    }
}

impl OcrBackend for TesseractEngine {
    fn recognize(&self, image: &GrayImage) -> Result<String> {
        let file = tempfile::Builder::new()
            .prefix("nfpo_page_")
            .suffix(".png")
            .tempfile()?;
        image
            .save_with_format(file.path(), image::ImageFormat::Png)
            .map_err(|e| OcrError::InvalidImage(e.to_string()))?;

        trace!(
            "tesseract {} ({}x{})",
            file.path().display(),
            image.width(),
            image.height()
        );

        let output = self
            .command(file.path())
            .output()
            .map_err(|source| OcrError::Spawn {
                tool: self.command.display().to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(OcrError::ToolFailed {
                tool: "tesseract".to_string(),
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn args(engine: &TesseractEngine) -> Vec<String> {
        engine
            .command(Path::new("page.png"))
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_command_line_from_config() {
        let engine = TesseractEngine::from_config(&OcrConfig::default());
        assert_eq!(
            args(&engine),
            vec!["page.png", "stdout", "-l", "por+osd+eng", "--psm", "12", "--oem", "2"]
        );
    }

    #[test]
    fn test_tessdata_set_on_child_only() {
        let engine = TesseractEngine::new("tesseract", "por").with_tessdata("/opt/tessdata");
        let cmd = engine.command(Path::new("page.png"));
        let tessdata: Vec<_> = cmd
            .get_envs()
            .filter(|(key, _)| *key == "TESSDATA_PREFIX")
            .filter_map(|(_, value)| value)
            .collect();
        assert_eq!(tessdata, vec![std::ffi::OsStr::new("/opt/tessdata")]);
        assert!(std::env::var_os("TESSDATA_PREFIX").map_or(true, |v| v != "/opt/tessdata"));
    }

    #[test]
    fn test_missing_binary_is_spawn_error() {
        let engine = TesseractEngine::new("/nonexistent/tesseract-binary", "eng");
        let err = engine.recognize(&GrayImage::new(4, 4)).unwrap_err();
        assert!(matches!(err, OcrError::Spawn { .. }));
    }
}
