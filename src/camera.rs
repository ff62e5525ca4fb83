//! PTZ camera control for `preset` shortcuts
//!
//! Each configured camera is driven over one transport (ONVIF, HTTP CGI or
//! VISCA over UDP) behind the `PtzCamera` trait. `null` cameras accept and
//! ignore every request.

pub mod cgi;
pub mod onvif;
pub mod visca;

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::config::{CameraConfig, CameraMode};

/// Timeout for HTTP based camera requests
const HTTP_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Error, Debug)]
pub enum CameraError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("camera answered with status {0}")]
    Status(u16),

    #[error("camera fault: {0}")]
    Fault(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid preset '{0}'")]
    InvalidPreset(String),
}

#[async_trait]
pub trait PtzCamera: Send + Sync {
    fn name(&self) -> &str;

    /// Move to a stored preset (`home` for the home position where supported)
    async fn goto_preset(&self, preset: &str) -> std::result::Result<(), CameraError>;
}

/// Camera that does nothing
pub struct NullCamera {
    name: String,
}

impl NullCamera {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl PtzCamera for NullCamera {
    fn name(&self) -> &str {
        &self.name
    }

    async fn goto_preset(&self, preset: &str) -> std::result::Result<(), CameraError> {
        debug!("Null camera '{}': ignoring preset {}", self.name, preset);
        Ok(())
    }
}

/// Cameras by lowercase name
#[derive(Clone, Default)]
pub struct CameraRegistry {
    cameras: HashMap<String, Arc<dyn PtzCamera>>,
}

impl CameraRegistry {
    pub fn from_config(configs: &[CameraConfig]) -> Result<Self> {
        let mut registry = Self::default();
        if configs.is_empty() {
            return Ok(registry);
        }

        let http = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;
        for config in configs {
            let camera: Arc<dyn PtzCamera> = match config.mode {
                CameraMode::Onvif => Arc::new(onvif::OnvifCamera::new(config, http.clone())),
                CameraMode::Cgi => Arc::new(cgi::CgiCamera::new(config, http.clone())),
                CameraMode::Visca => Arc::new(visca::ViscaCamera::new(config)),
                CameraMode::Null => Arc::new(NullCamera::new(&config.name)),
            };
            registry.insert(camera);
        }
        Ok(registry)
    }

    pub fn insert(&mut self, camera: Arc<dyn PtzCamera>) {
        self.cameras.insert(camera.name().to_lowercase(), camera);
    }

    /// Case-insensitive lookup
    pub fn get(&self, name: &str) -> Option<Arc<dyn PtzCamera>> {
        self.cameras.get(&name.to_lowercase()).cloned()
    }

    pub fn len(&self) -> usize {
        self.cameras.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cameras.is_empty()
    }
}

impl fmt::Debug for CameraRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.cameras.keys().collect();
        names.sort();
        f.debug_struct("CameraRegistry").field("cameras", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera(name: &str, mode: CameraMode) -> CameraConfig {
        CameraConfig {
            name: name.to_string(),
            address: "127.0.0.1:1259".to_string(),
            mode,
            user: None,
            password: None,
            profile: None,
        }
    }

    #[test]
    fn test_registry_lookup_is_case_insensitive() {
        let registry = CameraRegistry::from_config(&[
            camera("Pulpit", CameraMode::Visca),
            camera("Wide", CameraMode::Null),
        ])
        .unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("pulpit").unwrap().name(), "Pulpit");
        assert!(registry.get("WIDE").is_some());
        assert!(registry.get("balcony").is_none());
    }

    #[tokio::test]
    async fn test_null_camera_accepts_everything() {
        let camera = NullCamera::new("Spare");
        assert!(camera.goto_preset("anything").await.is_ok());
    }
}
