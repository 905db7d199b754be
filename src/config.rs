use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub source: SourceConfig,
    #[serde(default)]
    pub ingestion: IngestionConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    pub max_pool_size: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Base URL of the price endpoint; start/end are appended as query parameters.
    pub server_addr: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize)]
pub struct IngestionConfig {
    /// Run the background ingestion scheduler.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Fixed interval between runs when `schedule` is not set.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Optional cron expression (e.g. "0 */15 * * * *"). Uses UTC.
    #[serde(default)]
    pub schedule: Option<String>,
    /// A run still in flight after this long is cancelled.
    #[serde(default = "default_run_timeout_secs")]
    pub run_timeout_secs: u64,
    /// Run once immediately at startup before waiting for the first tick.
    #[serde(default = "default_true")]
    pub run_on_startup: bool,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            interval_secs: default_interval_secs(),
            schedule: None,
            run_timeout_secs: default_run_timeout_secs(),
            run_on_startup: default_true(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_interval_secs() -> u64 {
    900
}

fn default_run_timeout_secs() -> u64 {
    120
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(
            !self.database.path.is_empty(),
            "database.path must be non-empty"
        );
        anyhow::ensure!(
            self.database.max_pool_size > 0,
            "database.max_pool_size must be > 0, got {}",
            self.database.max_pool_size
        );
        anyhow::ensure!(
            self.source.server_addr.starts_with("http://")
                || self.source.server_addr.starts_with("https://"),
            "source.server_addr must be an http(s) URL, got {:?}",
            self.source.server_addr
        );
        anyhow::ensure!(
            self.source.timeout_secs > 0,
            "source.timeout_secs must be > 0, got {}",
            self.source.timeout_secs
        );
        anyhow::ensure!(
            self.ingestion.interval_secs > 0,
            "ingestion.interval_secs must be > 0, got {}",
            self.ingestion.interval_secs
        );
        anyhow::ensure!(
            self.ingestion.run_timeout_secs > 0,
            "ingestion.run_timeout_secs must be > 0, got {}",
            self.ingestion.run_timeout_secs
        );
        if let Some(ref cron_str) = self.ingestion.schedule {
            anyhow::ensure!(
                cron_str.parse::<cron::Schedule>().is_ok(),
                "ingestion.schedule is not a valid cron expression: {:?}",
                cron_str
            );
        }
        Ok(())
    }
}
