use std::net::SocketAddr;

use common_s3::S3Config;
use envconfig::Envconfig;
use tracing::Level;

#[derive(Envconfig, Clone)]
pub struct Config {
    #[envconfig(default = "127.0.0.1:3000")]
    pub address: SocketAddr,

    #[envconfig(nested = true)]
    pub storage: StorageConfig,

    // Objects are readable without credentials at {public_url_base}/{bucket}/{key}
    #[envconfig(default = "https://f004.backblazeb2.com/file")]
    pub public_url_base: String,

    #[envconfig(default = "10000")]
    pub fetch_timeout_ms: u64,

    pub otel_url: Option<String>,

    #[envconfig(default = "1.0")]
    pub otel_sampling_rate: f64,

    #[envconfig(default = "crawler-capture")]
    pub otel_service_name: String,

    // Used for integration tests
    #[envconfig(default = "true")]
    pub export_prometheus: bool,

    #[envconfig(default = "info")]
    pub log_level: Level,
}

#[derive(Envconfig, Clone)]
pub struct StorageConfig {
    #[envconfig(from = "MWMBL_KEY_ID")]
    pub key_id: String,
    #[envconfig(from = "MWMBL_APPLICATION_KEY")]
    pub application_key: String,
    #[envconfig(from = "S3_ENDPOINT")]
    pub endpoint: String,
    #[envconfig(from = "BUCKET")]
    pub bucket: String,
    #[envconfig(from = "S3_REGION", default = "us-east-1")]
    pub region: String,
}

impl Config {
    /// Prefix that turns an object key into its public download URL.
    pub fn public_url_prefix(&self) -> String {
        format!(
            "{}/{}/",
            self.public_url_base.trim_end_matches('/'),
            self.storage.bucket
        )
    }
}

impl From<&StorageConfig> for S3Config {
    fn from(storage: &StorageConfig) -> Self {
        S3Config {
            bucket: storage.bucket.clone(),
            region: storage.region.clone(),
            endpoint: Some(storage.endpoint.clone()),
            access_key_id: Some(storage.key_id.clone()),
            secret_access_key: Some(storage.application_key.clone()),
        }
    }
}
