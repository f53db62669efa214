//! Hosted inference backend.
//!
//! Posts the image to a Roboflow-style detection endpoint:
//! `POST <url>?api_key=<key>` with a form-urlencoded body
//! `api_key=<key>&image=<base64>`. The response is a [`PredictionSet`].

use anyhow::{anyhow, Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::io::Read;
use std::time::Duration;
use url::Url;

use crate::detect::backend::{DetectorBackend, REMOTE_BACKEND};
use crate::detect::result::PredictionSet;

const MAX_RESPONSE_BYTES: u64 = 4 * 1024 * 1024;

/// Configuration for the hosted detector.
#[derive(Clone, Debug)]
pub struct RemoteConfig {
    /// Model endpoint. http(s) only.
    pub url: String,
    pub api_key: String,
    pub timeout: Duration,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            url: "https://detect.roboflow.com/wildlife-detection/2".to_string(),
            api_key: "rf_public_model".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

pub struct RemoteBackend {
    config: RemoteConfig,
    agent: ureq::Agent,
}

impl RemoteBackend {
    pub fn new(config: RemoteConfig) -> Result<Self> {
        let url = Url::parse(&config.url).context("parse remote detector url")?;
        match url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(anyhow!(
                    "unsupported remote detector scheme '{}'; expected http(s)",
                    other
                ))
            }
        }
        let agent = ureq::AgentBuilder::new().timeout(config.timeout).build();
        Ok(Self { config, agent })
    }

    pub fn config(&self) -> &RemoteConfig {
        &self.config
    }
}

impl DetectorBackend for RemoteBackend {
    fn name(&self) -> &'static str {
        REMOTE_BACKEND
    }

    fn detect(&mut self, image: &[u8]) -> Result<PredictionSet> {
        let encoded = STANDARD.encode(image);
        let response = match self
            .agent
            .post(&self.config.url)
            .query("api_key", &self.config.api_key)
            .send_form(&[
                ("api_key", self.config.api_key.as_str()),
                ("image", encoded.as_str()),
            ]) {
            Ok(response) => response,
            Err(ureq::Error::Status(code, _)) => {
                return Err(anyhow!("remote detector returned status {}", code))
            }
            Err(err) => return Err(anyhow!("remote detector request failed: {}", err)),
        };

        let mut body = Vec::new();
        response
            .into_reader()
            .take(MAX_RESPONSE_BYTES)
            .read_to_end(&mut body)
            .context("read remote detector response")?;
        let set = PredictionSet::from_json(&body).context("parse remote detector response")?;
        log::debug!(
            "remote detector returned {} predictions",
            set.predictions().map_or(0, |p| p.len())
        );
        Ok(set)
    }
}
