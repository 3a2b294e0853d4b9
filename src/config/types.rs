use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// User agent presented to image hosts; some hosts reject non-browser clients
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Main configuration structure for featured-backfill
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub fetcher: FetcherConfig,
    #[serde(default)]
    pub normalizer: NormalizerConfig,
    #[serde(default)]
    pub scan: ScanConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub trigger: TriggerConfig,
}

/// Image download configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FetcherConfig {
    /// Whole-request timeout (seconds)
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// User-Agent header sent with every image request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,
}

impl FetcherConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

/// Image re-encoding configuration
#[derive(Debug, Clone, Deserialize)]
pub struct NormalizerConfig {
    /// MIME type every featured image is converted to
    #[serde(rename = "target-mime", default = "default_target_mime")]
    pub target_mime: String,

    /// JPEG encoder quality (1-100), only used when the target is JPEG
    #[serde(rename = "jpeg-quality", default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            target_mime: default_target_mime(),
            jpeg_quality: default_jpeg_quality(),
        }
    }
}

/// Scan behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ScanConfig {
    /// Record type to scan (only published records of this type are listed)
    #[serde(rename = "record-type", default = "default_record_type")]
    pub record_type: String,

    /// Pause after every record (milliseconds)
    #[serde(rename = "pacing-ms", default = "default_pacing_ms")]
    pub pacing_ms: u64,
}

impl ScanConfig {
    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            record_type: default_record_type(),
            pacing_ms: default_pacing_ms(),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite content database
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Directory uploaded media assets are copied into
    #[serde(rename = "media-dir")]
    pub media_dir: String,

    /// Directory for scratch files; the OS temp dir when unset
    #[serde(rename = "temp-dir", default)]
    pub temp_dir: Option<String>,
}

impl StorageConfig {
    pub fn temp_dir(&self) -> PathBuf {
        match &self.temp_dir {
            Some(dir) => PathBuf::from(dir),
            None => std::env::temp_dir(),
        }
    }
}

/// Run confirmation configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TriggerConfig {
    /// How long an issued confirmation token stays redeemable (seconds)
    #[serde(rename = "token-ttl-secs", default = "default_token_ttl_secs")]
    pub token_ttl_secs: u64,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            token_ttl_secs: default_token_ttl_secs(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_target_mime() -> String {
    "image/jpeg".to_string()
}

fn default_jpeg_quality() -> u8 {
    90
}

fn default_record_type() -> String {
    "post".to_string()
}

fn default_pacing_ms() -> u64 {
    1000
}

fn default_token_ttl_secs() -> u64 {
    3600
}
