//! Text recognition for pages without a text layer.

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use tokio::process::Command;

use pdf::ImageData;

#[derive(Debug, thiserror::Error)]
pub enum OcrError {
    #[error("no image found on the first page")]
    NoImage,

    #[error("tesseract is not installed or not on PATH")]
    NotInstalled,

    #[error("failed to read page image: {0}")]
    Pdf(#[from] pdf::PdfError),

    #[error("failed to prepare OCR input: {0}")]
    Io(#[from] std::io::Error),

    #[error("tesseract exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    #[error("tesseract did not finish within {0} seconds")]
    Timeout(u64),
}

/// Turns an image into text.
pub trait OcrProvider: Send + Sync {
    fn recognize(&self, image: &ImageData, languages: &[String]) -> Result<String, OcrError>;
}

/// Runs the `tesseract` command-line tool.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    binary: PathBuf,
    timeout: Duration,
}

impl TesseractOcr {
    /// Locate `tesseract` on `PATH`. A run longer than `timeout` is killed.
    pub fn locate(timeout: Duration) -> Result<Self, OcrError> {
        which::which("tesseract")
            .map(|binary| Self { binary, timeout })
            .map_err(|_| OcrError::NotInstalled)
    }
}

impl OcrProvider for TesseractOcr {
    fn recognize(&self, image: &ImageData, languages: &[String]) -> Result<String, OcrError> {
        let mut input = tempfile::Builder::new()
            .prefix("titler-ocr-")
            .suffix(&format!(".{}", image.format.extension()))
            .tempfile()?;
        input.write_all(&image.bytes)?;
        input.flush()?;

        let mut command = Command::new(&self.binary);
        command
            .arg(input.path())
            .arg("stdout")
            .args(["-l", &language_arg(languages)])
            .kill_on_drop(true);

        // Called from blocking worker threads, never from inside the runtime.
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let output = runtime
            .block_on(tokio::time::timeout(self.timeout, command.output()))
            .map_err(|_| OcrError::Timeout(self.timeout.as_secs()))??;

        if !output.status.success() {
            return Err(OcrError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

/// `["eng", "heb"]` becomes `eng+heb`. An empty list means English.
fn language_arg(languages: &[String]) -> String {
    if languages.is_empty() {
        "eng".to_string()
    } else {
        languages.join("+")
    }
}

/// Used in place of [`TesseractOcr`] when the binary could not be found, so
/// scanned pages still report why OCR did not run.
#[derive(Debug, Clone, Copy)]
pub struct MissingTesseract;

impl OcrProvider for MissingTesseract {
    fn recognize(&self, _image: &ImageData, _languages: &[String]) -> Result<String, OcrError> {
        Err(OcrError::NotInstalled)
    }
}

/// The provider to use for this run: tesseract when it is installed.
pub fn system_provider(config: &titler_core::Config) -> std::sync::Arc<dyn OcrProvider> {
    match TesseractOcr::locate(Duration::from_secs(config.ocr_timeout_secs)) {
        Ok(tesseract) => {
            log::debug!("using tesseract at {}", tesseract.binary.display());
            std::sync::Arc::new(tesseract)
        }
        Err(e) => {
            log::warn!("{e}; scanned pages will be skipped");
            std::sync::Arc::new(MissingTesseract)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_arg() {
        let langs = vec!["eng".to_string(), "heb".to_string()];
        assert_eq!(language_arg(&langs), "eng+heb");
        assert_eq!(language_arg(&[]), "eng");
    }

    #[test]
    fn test_missing_tesseract_reports_reason() {
        let image = ImageData {
            name: "Im1".to_string(),
            format: pdf::ImageFormat::Png,
            width: 1,
            height: 1,
            bytes: Vec::new(),
        };
        let err = MissingTesseract.recognize(&image, &[]).unwrap_err();
        assert!(matches!(err, OcrError::NotInstalled));
        assert!(err.to_string().contains("not installed"));
    }

    #[cfg(unix)]
    fn fake_tesseract(dir: &std::path::Path, body: &str) -> TesseractOcr {
        use std::os::unix::fs::PermissionsExt;

        let binary = dir.join("tesseract");
        std::fs::write(&binary, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&binary, std::fs::Permissions::from_mode(0o755)).unwrap();
        TesseractOcr {
            binary,
            timeout: Duration::from_secs(1),
        }
    }

    #[cfg(unix)]
    fn png() -> ImageData {
        ImageData {
            name: "Im1".to_string(),
            format: pdf::ImageFormat::Png,
            width: 1,
            height: 1,
            bytes: vec![0x89, b'P', b'N', b'G'],
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_tesseract_output_is_trimmed() {
        let dir = tempfile::tempdir().unwrap();
        let tesseract = fake_tesseract(dir.path(), "echo '  Annual Report  '");

        let text = tesseract.recognize(&png(), &["eng".to_string()]).unwrap();
        assert_eq!(text, "Annual Report");
    }

    #[cfg(unix)]
    #[test]
    fn test_hung_tesseract_is_killed() {
        let dir = tempfile::tempdir().unwrap();
        let tesseract = fake_tesseract(dir.path(), "sleep 30");

        let started = std::time::Instant::now();
        let err = tesseract.recognize(&png(), &[]).unwrap_err();
        assert!(matches!(err, OcrError::Timeout(1)));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[cfg(unix)]
    #[test]
    fn test_tesseract_failure_keeps_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let tesseract = fake_tesseract(dir.path(), "echo 'bad language' >&2; exit 1");

        let err = tesseract.recognize(&png(), &[]).unwrap_err();
        match err {
            OcrError::Failed { stderr, .. } => assert_eq!(stderr, "bad language"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
