//! VISCA over UDP preset recall

use async_trait::async_trait;
use tokio::net::UdpSocket;
use tracing::info;

use super::{CameraError, PtzCamera};
use crate::config::CameraConfig;

/// Port used when the address has none
pub const DEFAULT_PORT: u16 = 1259;

/// `CAM_Memory Recall` for preset `p`
pub fn recall_packet(preset: u8) -> [u8; 7] {
    [0x81, 0x01, 0x04, 0x3F, 0x02, preset, 0xFF]
}

pub struct ViscaCamera {
    name: String,
    address: String,
}

impl ViscaCamera {
    pub fn new(config: &CameraConfig) -> Self {
        let address = if config.address.contains(':') {
            config.address.clone()
        } else {
            format!("{}:{}", config.address, DEFAULT_PORT)
        };
        Self {
            name: config.name.clone(),
            address,
        }
    }
}

#[async_trait]
impl PtzCamera for ViscaCamera {
    fn name(&self) -> &str {
        &self.name
    }

    async fn goto_preset(&self, preset: &str) -> Result<(), CameraError> {
        let number = preset
            .trim()
            .parse::<u8>()
            .ok()
            .filter(|p| *p < 0x80)
            .ok_or_else(|| CameraError::InvalidPreset(preset.to_string()))?;

        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        socket.send_to(&recall_packet(number), &self.address).await?;

        info!("📷 Camera '{}' recalled preset {}", self.name, number);
        Ok(())
    }
}
