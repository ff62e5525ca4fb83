//! ONVIF PTZ preset recall over SOAP
//!
//! Requests carry a WS-Security `UsernameToken` with a password digest when
//! credentials are configured. The preset `home` maps to
//! `GotoHomePosition`, anything else to `GotoPreset`.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use sha1::{Digest, Sha1};
use tracing::{debug, info};

use super::{CameraError, PtzCamera};
use crate::config::CameraConfig;

const DEFAULT_PROFILE: &str = "Profile_1";
const PTZ_SERVICE_PATH: &str = "/onvif/ptz_service";

/// `Base64(SHA1(nonce + created + password))`
pub fn password_digest(nonce: &[u8], created: &str, password: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(nonce);
    hasher.update(created.as_bytes());
    hasher.update(password.as_bytes());
    STANDARD.encode(hasher.finalize())
}

fn escape_xml(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

fn security_header(user: &str, password: &str, nonce: &[u8], created: &str) -> String {
    format!(
        concat!(
            "<s:Header><Security s:mustUnderstand=\"1\" ",
            "xmlns=\"http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-secext-1.0.xsd\">",
            "<UsernameToken><Username>{user}</Username>",
            "<Password Type=\"http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-username-token-profile-1.0#PasswordDigest\">{digest}</Password>",
            "<Nonce EncodingType=\"http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-soap-message-security-1.0#Base64Binary\">{nonce}</Nonce>",
            "<Created xmlns=\"http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-utility-1.0.xsd\">{created}</Created>",
            "</UsernameToken></Security></s:Header>"
        ),
        user = escape_xml(user),
        digest = password_digest(nonce, created, password),
        nonce = STANDARD.encode(nonce),
        created = created,
    )
}

/// SOAP body for one preset request
pub fn request_body(profile: &str, preset: &str) -> String {
    let profile = escape_xml(profile);
    if preset.eq_ignore_ascii_case("home") {
        format!(
            "<GotoHomePosition xmlns=\"http://www.onvif.org/ver20/ptz/wsdl\">\
             <ProfileToken>{}</ProfileToken></GotoHomePosition>",
            profile
        )
    } else {
        format!(
            "<GotoPreset xmlns=\"http://www.onvif.org/ver20/ptz/wsdl\">\
             <ProfileToken>{}</ProfileToken><PresetToken>{}</PresetToken></GotoPreset>",
            profile,
            escape_xml(preset)
        )
    }
}

fn envelope(header: &str, body: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <s:Envelope xmlns:s=\"http://www.w3.org/2003/05/soap-envelope\">{}<s:Body>{}</s:Body></s:Envelope>",
        header, body
    )
}

pub struct OnvifCamera {
    name: String,
    endpoint: String,
    profile: String,
    credentials: Option<(String, String)>,
    http: reqwest::Client,
}

impl OnvifCamera {
    pub fn new(config: &CameraConfig, http: reqwest::Client) -> Self {
        let endpoint = if config.address.starts_with("http") {
            config.address.clone()
        } else {
            format!("http://{}{}", config.address, PTZ_SERVICE_PATH)
        };
        let credentials = config
            .user
            .as_ref()
            .map(|user| (user.clone(), config.password.clone().unwrap_or_default()));

        Self {
            name: config.name.clone(),
            endpoint,
            profile: config
                .profile
                .clone()
                .unwrap_or_else(|| DEFAULT_PROFILE.to_string()),
            credentials,
            http,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn build_request(&self, preset: &str) -> String {
        let header = match &self.credentials {
            Some((user, password)) => {
                let nonce = uuid::Uuid::new_v4();
                let created = chrono::Utc::now()
                    .format("%Y-%m-%dT%H:%M:%S%.3fZ")
                    .to_string();
                security_header(user, password, nonce.as_bytes(), &created)
            }
            None => String::new(),
        };
        envelope(&header, &request_body(&self.profile, preset))
    }
}

#[async_trait]
impl PtzCamera for OnvifCamera {
    fn name(&self) -> &str {
        &self.name
    }

    async fn goto_preset(&self, preset: &str) -> Result<(), CameraError> {
        if preset.trim().is_empty() {
            return Err(CameraError::InvalidPreset(preset.to_string()));
        }

        debug!("ONVIF preset {} via {}", preset, self.endpoint());
        let response = self
            .http
            .post(&self.endpoint)
            .header("Content-Type", "application/soap+xml; charset=utf-8")
            .body(self.build_request(preset))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if body.contains("Fault>") {
            return Err(CameraError::Fault(body));
        }
        if !status.is_success() {
            return Err(CameraError::Status(status.as_u16()));
        }

        info!("📷 Camera '{}' recalled preset {}", self.name, preset);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CameraMode;

    fn config(address: &str, user: Option<&str>) -> CameraConfig {
        CameraConfig {
            name: "Stage".to_string(),
            address: address.to_string(),
            mode: CameraMode::Onvif,
            user: user.map(str::to_string),
            password: Some("secret".to_string()),
            profile: None,
        }
    }

    #[test]
    fn test_password_digest_vector() {
        let nonce: Vec<u8> = (0u8..16).collect();
        assert_eq!(STANDARD.encode(&nonce), "AAECAwQFBgcICQoLDA0ODw==");
        assert_eq!(
            password_digest(&nonce, "2024-01-01T00:00:00.000Z", "secret"),
            "//ibx1D1VtrRLBI5fd/nFoXLzBc="
        );
    }

    #[test]
    fn test_endpoint_resolution() {
        let client = reqwest::Client::new();
        let plain = OnvifCamera::new(&config("10.0.0.5", None), client.clone());
        assert_eq!(plain.endpoint(), "http://10.0.0.5/onvif/ptz_service");

        let full = OnvifCamera::new(&config("http://10.0.0.5:8080/ptz", None), client);
        assert_eq!(full.endpoint(), "http://10.0.0.5:8080/ptz");
    }

    #[test]
    fn test_home_and_named_presets() {
        let home = request_body("Profile_1", "HOME");
        assert!(home.contains("<GotoHomePosition"));
        assert!(!home.contains("PresetToken"));

        let named = request_body("Main", "a<b");
        assert!(named.contains("<ProfileToken>Main</ProfileToken>"));
        assert!(named.contains("<PresetToken>a&lt;b</PresetToken>"));
    }

    #[test]
    fn test_request_carries_security_only_with_user() {
        let client = reqwest::Client::new();
        let anonymous = OnvifCamera::new(&config("10.0.0.5", None), client.clone());
        assert!(!anonymous.build_request("1").contains("UsernameToken"));

        let secured = OnvifCamera::new(&config("10.0.0.5", Some("admin")), client);
        let request = secured.build_request("1");
        assert!(request.contains("<Username>admin</Username>"));
        assert!(request.contains("PasswordDigest"));
        assert!(request.contains("<s:Body><GotoPreset"));
    }
}
