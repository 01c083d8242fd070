use std::env;
use std::time::Duration;

pub struct Config {
    pub host: String,
    pub port: u16,
    pub device_base_url: String,
    pub device_login: String,
    pub device_password: String,
    pub device_timeout: Duration,
    pub auto_login: bool,
    pub cors_origins: Vec<String>,
    pub max_payload_bytes: usize,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(5000),
            device_base_url: env::var("CONTROLID_BASE_URL")
                .unwrap_or_else(|_| "http://127.0.0.1".to_string()),
            device_login: env::var("CONTROLID_LOGIN").unwrap_or_else(|_| "admin".to_string()),
            device_password: env::var("CONTROLID_PASSWORD")
                .unwrap_or_else(|_| "admin".to_string()),
            device_timeout: Duration::from_secs(
                env::var("CONTROLID_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(10),
            ),
            auto_login: env::var("CONTROLID_AUTO_LOGIN")
                .ok()
                .map(|v| parse_flag(&v))
                .unwrap_or(true),
            cors_origins: env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:3000,http://localhost:5173".to_string())
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            max_payload_bytes: env::var("MAX_PAYLOAD_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5 * 1_048_576), // 5 MB, room for face photos
        }
    }
}

fn parse_flag(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "0" | "false" | "no" | "off"
    )
}
