//! Local script backend.
//!
//! Writes the upload to a temporary file and runs
//! `[interpreter] <script> <image-path>`. On stdout the script prints one of:
//! - `{"predictions": [...]}`, raw center-box predictions;
//! - `{"detections": [...], ...}`, a finished report whose corner boxes and
//!   percentage confidences are turned back into raw predictions;
//! - `{"error": "..."}` on failure.
//!
//! Output with neither list is an error.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::io::Write;
use std::path::PathBuf;
use std::process::Command;

use crate::detect::backend::{DetectorBackend, SUBPROCESS_BACKEND};
use crate::detect::result::{ImageInfo, PredictionSet, RawPrediction};
use crate::normalize::BoundingBox;

#[derive(Clone, Debug)]
pub struct SubprocessConfig {
    pub script: PathBuf,
    /// Program used to run the script (e.g. `python3`). When unset the
    /// script is executed directly.
    pub interpreter: Option<String>,
}

pub struct SubprocessBackend {
    config: SubprocessConfig,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ScriptOutput {
    Failed {
        error: String,
    },
    Predictions {
        predictions: Vec<RawPrediction>,
        #[serde(default)]
        image: Option<ImageInfo>,
    },
    Report {
        detections: Vec<ReportDetection>,
    },
}

/// One entry of a finished report; extra fields (`id`, `risk`) are ignored.
#[derive(Deserialize)]
struct ReportDetection {
    animal: String,
    /// Percentage, 0-100.
    confidence: f64,
    bbox: BoundingBox,
}

impl ReportDetection {
    fn into_prediction(self) -> RawPrediction {
        let width = self.bbox.width as f64;
        let height = self.bbox.height as f64;
        RawPrediction::new(
            &self.animal,
            self.confidence / 100.0,
            self.bbox.x as f64 + width / 2.0,
            self.bbox.y as f64 + height / 2.0,
            width,
            height,
        )
    }
}

impl SubprocessBackend {
    pub fn new(config: SubprocessConfig) -> Self {
        Self { config }
    }

    fn command(&self, image_path: &std::path::Path) -> Command {
        match &self.config.interpreter {
            Some(interpreter) => {
                let mut cmd = Command::new(interpreter);
                cmd.arg(&self.config.script).arg(image_path);
                cmd
            }
            None => {
                let mut cmd = Command::new(&self.config.script);
                cmd.arg(image_path);
                cmd
            }
        }
    }
}

impl DetectorBackend for SubprocessBackend {
    fn name(&self) -> &'static str {
        SUBPROCESS_BACKEND
    }

    fn detect(&mut self, image: &[u8]) -> Result<PredictionSet> {
        let mut file = tempfile::Builder::new()
            .prefix("wildguard-upload-")
            .tempfile()
            .context("create temporary image file")?;
        file.write_all(image).context("write temporary image file")?;
        file.flush().context("flush temporary image file")?;

        let output = self
            .command(file.path())
            .output()
            .with_context(|| format!("run detector script {}", self.config.script.display()))?;

        parse_script_output(output.status.success(), &output.stdout, &output.stderr)
    }

    fn warm_up(&mut self) -> Result<()> {
        if !self.config.script.is_file() {
            return Err(anyhow!(
                "detector script {} does not exist",
                self.config.script.display()
            ));
        }
        Ok(())
    }
}

fn parse_script_output(success: bool, stdout: &[u8], stderr: &[u8]) -> Result<PredictionSet> {
    match serde_json::from_slice::<ScriptOutput>(stdout) {
        Ok(ScriptOutput::Failed { error }) => Err(anyhow!("detector script reported: {}", error)),
        _ if !success => Err(anyhow!(
            "detector script failed: {}",
            String::from_utf8_lossy(stderr).trim()
        )),
        Ok(ScriptOutput::Predictions { predictions, image }) => Ok(PredictionSet {
            predictions: Some(predictions),
            image,
        }),
        Ok(ScriptOutput::Report { detections }) => Ok(PredictionSet::from_predictions(
            detections
                .into_iter()
                .map(ReportDetection::into_prediction)
                .collect(),
        )),
        Err(err) => Err(anyhow::Error::new(err).context(
            "parse detector script output: expected a predictions or detections list",
        )),
    }
}
