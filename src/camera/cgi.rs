//! HTTP CGI preset recall (`/cgi-bin/ptzctrl.cgi`)

use async_trait::async_trait;
use tracing::info;

use super::{CameraError, PtzCamera};
use crate::config::CameraConfig;

pub struct CgiCamera {
    name: String,
    address: String,
    http: reqwest::Client,
}

impl CgiCamera {
    pub fn new(config: &CameraConfig, http: reqwest::Client) -> Self {
        Self {
            name: config.name.clone(),
            address: config.address.clone(),
            http,
        }
    }

    pub fn preset_url(&self, preset: &str) -> Result<String, CameraError> {
        if preset.is_empty() || !preset.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(CameraError::InvalidPreset(preset.to_string()));
        }
        Ok(format!(
            "http://{}/cgi-bin/ptzctrl.cgi?ptzcmd&poscall&{}",
            self.address, preset
        ))
    }
}

#[async_trait]
impl PtzCamera for CgiCamera {
    fn name(&self) -> &str {
        &self.name
    }

    async fn goto_preset(&self, preset: &str) -> Result<(), CameraError> {
        let url = self.preset_url(preset)?;
        let response = self.http.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CameraError::Status(status.as_u16()));
        }

        info!("📷 Camera '{}' recalled preset {}", self.name, preset);
        Ok(())
    }
}
