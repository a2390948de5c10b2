use std::env;
use std::time::Duration;

use crate::error::{RelayError, Result, MISSING_API_KEY};

pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(300);
pub const DEFAULT_CLIENT_TIMEOUT: Duration = Duration::from_secs(180);
pub const DEFAULT_MAX_RETRIES: u32 = 2;
pub const DEFAULT_MAX_IMAGE_MB: usize = 4;

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: Option<String>,
    pub api_base: String,
    pub timeout: Duration,
    pub max_retries: u32,
}

/// Local upload limits. Deliberately tighter than the upstream 25 MiB ceiling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadLimits {
    pub max_image_bytes: usize,
    pub max_component_images: usize,
    pub max_edit_prompt_chars: usize,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: Option<u16>,
    pub demo_mode: bool,
    pub openai: OpenAiConfig,
    pub limits: UploadLimits,
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        OpenAiConfig {
            api_key: None,
            api_base: DEFAULT_API_BASE.to_string(),
            timeout: DEFAULT_UPSTREAM_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl OpenAiConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let api_key = env::var("OPENAI_API_KEY")
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());
        let api_base = env::var("OPENAI_API_BASE")
            .ok()
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let timeout = env::var("OPENAI_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_UPSTREAM_TIMEOUT);
        let max_retries = env::var("OPENAI_MAX_RETRIES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_MAX_RETRIES);

        OpenAiConfig {
            api_key,
            api_base,
            timeout,
            max_retries,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| RelayError::Config(MISSING_API_KEY.to_string()))
    }

    /// Safe-to-log summary of the credential: length plus a short prefix.
    pub fn key_fingerprint(&self) -> Option<String> {
        self.api_key.as_ref().map(|key| {
            let prefix: String = key.chars().take(3).collect();
            format!("{}... ({} chars)", prefix, key.len())
        })
    }
}

impl Default for UploadLimits {
    fn default() -> Self {
        UploadLimits {
            max_image_bytes: DEFAULT_MAX_IMAGE_MB * 1024 * 1024,
            max_component_images: 9,
            max_edit_prompt_chars: 32_000,
        }
    }
}

impl UploadLimits {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let mut limits = Self::default();
        if let Some(mb) = env::var("MAX_IMAGE_SIZE_MB")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .filter(|mb| *mb > 0)
        {
            limits.max_image_bytes = mb * 1024 * 1024;
        }
        limits
    }

    pub fn with_max_image_bytes(mut self, bytes: usize) -> Self {
        self.max_image_bytes = bytes;
        self
    }

    pub fn max_image_mb(&self) -> String {
        format_size(self.max_image_bytes)
    }
}

const KIB: usize = 1024;
const MIB: usize = 1024 * 1024;

/// Human-readable size; whole units print without decimals.
pub fn format_size(bytes: usize) -> String {
    if bytes >= MIB {
        if bytes % MIB == 0 {
            format!("{}MB", bytes / MIB)
        } else {
            format!("{:.2}MB", bytes as f64 / MIB as f64)
        }
    } else if bytes >= KIB {
        if bytes % KIB == 0 {
            format!("{}KB", bytes / KIB)
        } else {
            format!("{:.1}KB", bytes as f64 / KIB as f64)
        }
    } else {
        format!("{} bytes", bytes)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: "127.0.0.1".to_string(),
            port: None,
            demo_mode: false,
            openai: OpenAiConfig::default(),
            limits: UploadLimits::default(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("PORT").ok().and_then(|port| port.parse().ok());
        let demo_mode = env::var("DEMO_MODE")
            .ok()
            .map_or(false, |val| val == "true" || val == "1");

        Config {
            host,
            port,
            demo_mode,
            openai: OpenAiConfig::from_env(),
            limits: UploadLimits::from_env(),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_demo_mode(mut self, enabled: bool) -> Self {
        self.demo_mode = enabled;
        self
    }

    pub fn with_openai(mut self, config: OpenAiConfig) -> Self {
        self.openai = config;
        self
    }

    pub fn with_limits(mut self, limits: UploadLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn port_or_default(&self) -> u16 {
        self.port.unwrap_or(3000)
    }

    /// Fails with the fixed configuration error when requests cannot be served.
    pub fn check_credentials(&self) -> Result<()> {
        if self.demo_mode {
            return Ok(());
        }
        self.openai.require_api_key().map(|_| ())
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            base_url: "http://127.0.0.1:3000".to_string(),
            timeout: DEFAULT_CLIENT_TIMEOUT,
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        ClientConfig {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            ..Default::default()
        }
    }

    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = env::var("RELAY_URL") {
            config.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(secs) = env::var("RELAY_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            config.timeout = Duration::from_secs(secs);
        }
        config
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_fails_credential_check() {
        let config = Config::new();
        assert!(matches!(config.check_credentials(), Err(RelayError::Config(_))));
    }

    #[test]
    fn demo_mode_skips_credential_check() {
        let config = Config::new().with_demo_mode(true);
        assert!(config.check_credentials().is_ok());
    }

    #[test]
    fn fingerprint_hides_the_key() {
        let config = OpenAiConfig::new().with_api_key("sk-abcdefghijkl");
        let fp = config.key_fingerprint().unwrap();
        assert_eq!(fp, "sk-... (15 chars)");
        assert!(!fp.contains("abcdef"));
    }

    #[test]
    fn default_limits() {
        let limits = UploadLimits::default();
        assert_eq!(limits.max_image_bytes, 4 * 1024 * 1024);
        assert_eq!(limits.max_component_images, 9);
        assert_eq!(limits.max_image_mb(), "4MB");
    }

    #[test]
    fn small_limits_keep_their_unit() {
        let limit = |bytes| UploadLimits::new().with_max_image_bytes(bytes).max_image_mb();
        assert_eq!(limit(8), "8 bytes");
        assert_eq!(limit(1024), "1KB");
        assert_eq!(limit(1536), "1.5KB");
        assert_eq!(limit(512 * 1024), "512KB");
        assert_eq!(limit(3 * 1024 * 1024 / 2), "1.50MB");
    }

    #[test]
    fn api_base_is_normalised() {
        let config = OpenAiConfig::new().with_api_base("http://localhost:9000/v1/");
        assert_eq!(config.api_base, "http://localhost:9000/v1");
        let client = ClientConfig::new("http://localhost:3000/");
        assert_eq!(client.base_url, "http://localhost:3000");
    }
}
