pub mod cli;
pub mod toml_config;

use crate::adapters::http::HttpPolicy;
use crate::core::ConfigProvider;
use crate::utils::error::Result;
use crate::utils::validation::{self, Validate};
use std::fmt;
use std::time::Duration;
use toml_config::TomlConfig;

#[cfg(feature = "cli")]
use clap::Parser;

pub const DEFAULT_API_BASE_URL: &str = "https://api.nextdns.io";
pub const DEFAULT_SOURCES_FILE: &str = "blocklists.txt";
pub const DEFAULT_CONCURRENT_DOWNLOADS: usize = 4;
pub const DEFAULT_ADD_BATCH_SIZE: usize = 500;
pub const MAX_ADD_BATCH_SIZE: usize = 5000;
pub const MAX_RETRY_ATTEMPTS: u32 = 10;

#[cfg(feature = "cli")]
#[derive(Clone, Default, Parser)]
#[command(name = "nextdns-blocklist")]
#[command(about = "Sync a NextDNS profile denylist with public blocklists")]
pub struct CliConfig {
    /// NextDNS API key
    #[arg(long, env = "NEXTDNS_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// NextDNS profile ID
    #[arg(long, env = "NEXTDNS_PROFILE_ID")]
    pub profile_id: Option<String>,

    /// NextDNS API base URL
    #[arg(long, env = "NEXTDNS_API_URL")]
    pub api_base_url: Option<String>,

    /// File listing blocklist URLs, one per line
    #[arg(long)]
    pub sources: Option<String>,

    /// Domains never added to the denylist (subdomains included)
    #[arg(long, value_delimiter = ',')]
    pub allowlist: Vec<String>,

    /// Optional TOML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    #[arg(long)]
    pub concurrent_downloads: Option<usize>,

    #[arg(long)]
    pub timeout_seconds: Option<u64>,

    #[arg(long)]
    pub retry_attempts: Option<u32>,

    #[arg(long)]
    pub retry_delay_ms: Option<u64>,

    /// Domains per POST request when adding
    #[arg(long)]
    pub add_batch_size: Option<usize>,

    /// Never remove domains that are no longer in any source
    #[arg(long)]
    pub keep_stale: bool,

    /// Show what would change without calling the write API
    #[arg(long)]
    pub dry_run: bool,

    /// Write a JSON run report to this path
    #[arg(long)]
    pub report: Option<String>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub json_logs: bool,

    #[arg(long, help = "Log CPU and memory usage per phase")]
    pub monitor: bool,
}

#[cfg(feature = "cli")]
impl CliConfig {
    /// 載入 --config 指定的 TOML 檔並合併；命令列參數優先
    pub fn resolve(&self) -> Result<SyncSettings> {
        let file = match &self.config {
            Some(path) => TomlConfig::from_file(path)?,
            None => TomlConfig::default(),
        };
        Ok(self.merge_file(file))
    }

    pub fn merge_file(&self, file: TomlConfig) -> SyncSettings {
        let http = &file.http;
        let policy = HttpPolicy {
            timeout: self
                .timeout_seconds
                .or(http.timeout_seconds)
                .map(Duration::from_secs)
                .unwrap_or(HttpPolicy::default().timeout),
            retry_attempts: self
                .retry_attempts
                .or(http.retry_attempts)
                .unwrap_or(HttpPolicy::default().retry_attempts),
            retry_delay: self
                .retry_delay_ms
                .or(http.retry_delay_ms)
                .map(Duration::from_millis)
                .unwrap_or(HttpPolicy::default().retry_delay),
            max_retry_delay: http
                .max_retry_delay_seconds
                .map(Duration::from_secs)
                .unwrap_or(HttpPolicy::default().max_retry_delay),
        };

        let allowlist = if self.allowlist.is_empty() {
            file.sources.allowlist
        } else {
            self.allowlist.clone()
        };

        SyncSettings {
            api_key: self.api_key.clone().or(file.nextdns.api_key),
            profile_id: self.profile_id.clone().or(file.nextdns.profile_id),
            api_base_url: self
                .api_base_url
                .clone()
                .or(file.nextdns.api_base_url)
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
            sources_file: self
                .sources
                .clone()
                .or(file.sources.file)
                .unwrap_or_else(|| DEFAULT_SOURCES_FILE.to_string()),
            allowlist,
            concurrent_downloads: self
                .concurrent_downloads
                .or(file.sync.concurrent_downloads)
                .unwrap_or(DEFAULT_CONCURRENT_DOWNLOADS),
            add_batch_size: self
                .add_batch_size
                .or(file.sync.add_batch_size)
                .unwrap_or(DEFAULT_ADD_BATCH_SIZE),
            remove_stale: !self.keep_stale && file.sync.remove_stale.unwrap_or(true),
            dry_run: self.dry_run || file.sync.dry_run.unwrap_or(false),
            report_path: self.report.clone().or(file.sync.report_path),
            http: policy,
            verbose: self.verbose || file.logging.verbose.unwrap_or(false),
            json_logs: self.json_logs || file.logging.json.unwrap_or(false),
            monitor: self.monitor || file.logging.monitor.unwrap_or(false),
        }
    }
}

/// Fully resolved settings for one run.
#[derive(Clone)]
pub struct SyncSettings {
    pub api_key: Option<String>,
    pub profile_id: Option<String>,
    pub api_base_url: String,
    pub sources_file: String,
    pub allowlist: Vec<String>,
    pub concurrent_downloads: usize,
    pub add_batch_size: usize,
    pub remove_stale: bool,
    pub dry_run: bool,
    pub report_path: Option<String>,
    pub http: HttpPolicy,
    pub verbose: bool,
    pub json_logs: bool,
    pub monitor: bool,
}

impl SyncSettings {
    pub fn new(api_key: &str, profile_id: &str) -> Self {
        Self {
            api_key: Some(api_key.to_string()),
            profile_id: Some(profile_id.to_string()),
            ..Self::default()
        }
    }
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            profile_id: None,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            sources_file: DEFAULT_SOURCES_FILE.to_string(),
            allowlist: Vec::new(),
            concurrent_downloads: DEFAULT_CONCURRENT_DOWNLOADS,
            add_batch_size: DEFAULT_ADD_BATCH_SIZE,
            remove_stale: true,
            dry_run: false,
            report_path: None,
            http: HttpPolicy::default(),
            verbose: false,
            json_logs: false,
            monitor: false,
        }
    }
}

// API key 不可出現在日誌中
impl fmt::Debug for SyncSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncSettings")
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("profile_id", &self.profile_id)
            .field("api_base_url", &self.api_base_url)
            .field("sources_file", &self.sources_file)
            .field("allowlist", &self.allowlist)
            .field("concurrent_downloads", &self.concurrent_downloads)
            .field("add_batch_size", &self.add_batch_size)
            .field("remove_stale", &self.remove_stale)
            .field("dry_run", &self.dry_run)
            .field("report_path", &self.report_path)
            .field("http", &self.http)
            .finish()
    }
}

impl ConfigProvider for SyncSettings {
    fn api_key(&self) -> &str {
        self.api_key.as_deref().unwrap_or_default()
    }

    fn profile_id(&self) -> &str {
        self.profile_id.as_deref().unwrap_or_default()
    }

    fn api_base_url(&self) -> &str {
        &self.api_base_url
    }

    fn sources_file(&self) -> &str {
        &self.sources_file
    }

    fn allowlist(&self) -> &[String] {
        &self.allowlist
    }

    fn concurrent_downloads(&self) -> usize {
        self.concurrent_downloads
    }

    fn http_policy(&self) -> HttpPolicy {
        self.http.clone()
    }

    fn add_batch_size(&self) -> usize {
        self.add_batch_size
    }

    fn remove_stale(&self) -> bool {
        self.remove_stale
    }

    fn dry_run(&self) -> bool {
        self.dry_run
    }

    fn report_path(&self) -> Option<&str> {
        self.report_path.as_deref()
    }
}

impl Validate for SyncSettings {
    fn validate(&self) -> Result<()> {
        let api_key = validation::validate_required_field("api_key", &self.api_key)?;
        validation::validate_non_empty_string("api_key", api_key)?;

        let profile_id = validation::validate_required_field("profile_id", &self.profile_id)?;
        validation::validate_profile_id("profile_id", profile_id)?;

        validation::validate_url("api_base_url", &self.api_base_url)?;
        validation::validate_path("sources_file", &self.sources_file)?;
        if let Some(report_path) = &self.report_path {
            validation::validate_path("report_path", report_path)?;
        }

        validation::validate_positive_number("concurrent_downloads", self.concurrent_downloads, 1)?;
        validation::validate_range("add_batch_size", self.add_batch_size, 1, MAX_ADD_BATCH_SIZE)?;
        validation::validate_range(
            "retry_attempts",
            self.http.retry_attempts,
            0,
            MAX_RETRY_ATTEMPTS,
        )?;

        Ok(())
    }
}
