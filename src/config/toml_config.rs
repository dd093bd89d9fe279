use crate::utils::error::{Result, SyncError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub nextdns: NextDnsSection,
    pub sources: SourcesSection,
    pub sync: SyncSection,
    pub http: HttpSection,
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NextDnsSection {
    pub api_key: Option<String>,
    pub profile_id: Option<String>,
    pub api_base_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesSection {
    pub file: Option<String>,
    pub allowlist: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSection {
    pub concurrent_downloads: Option<usize>,
    pub add_batch_size: Option<usize>,
    pub remove_stale: Option<bool>,
    pub dry_run: Option<bool>,
    pub report_path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSection {
    pub timeout_seconds: Option<u64>,
    pub retry_attempts: Option<u32>,
    pub retry_delay_ms: Option<u64>,
    pub max_retry_delay_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    pub verbose: Option<bool>,
    pub json: Option<bool>,
    pub monitor: Option<bool>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| SyncError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${NEXTDNS_API_KEY})；未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> String {
        static ENV_VAR: OnceLock<Regex> = OnceLock::new();
        let re = ENV_VAR.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("valid regex"));

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_full_config() {
        let toml_content = r#"
[nextdns]
api_key = "secret"
profile_id = "abc123"

[sources]
file = "lists/blocklists.txt"
allowlist = ["example.com"]

[sync]
concurrent_downloads = 8
add_batch_size = 250
remove_stale = false

[http]
timeout_seconds = 10
retry_attempts = 5
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.nextdns.profile_id.as_deref(), Some("abc123"));
        assert_eq!(config.sources.file.as_deref(), Some("lists/blocklists.txt"));
        assert_eq!(config.sources.allowlist, vec!["example.com".to_string()]);
        assert_eq!(config.sync.concurrent_downloads, Some(8));
        assert_eq!(config.sync.remove_stale, Some(false));
        assert_eq!(config.http.retry_attempts, Some(5));
        assert_eq!(config.http.retry_delay_ms, None);
    }

    #[test]
    fn test_empty_config_is_valid() {
        let config = TomlConfig::from_toml_str("").unwrap();
        assert!(config.nextdns.api_key.is_none());
        assert!(config.sources.allowlist.is_empty());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("TOML_TEST_PROFILE", "envprofile");

        let toml_content = r#"
[nextdns]
profile_id = "${TOML_TEST_PROFILE}"
api_key = "${TOML_TEST_UNSET_VARIABLE}"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.nextdns.profile_id.as_deref(), Some("envprofile"));
        assert_eq!(
            config.nextdns.api_key.as_deref(),
            Some("${TOML_TEST_UNSET_VARIABLE}")
        );

        std::env::remove_var("TOML_TEST_PROFILE");
    }

    #[test]
    fn test_invalid_toml() {
        let result = TomlConfig::from_toml_str("[sync]\nconcurrent_downloads = \"many\"");
        assert!(matches!(result, Err(SyncError::ConfigError { .. })));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[nextdns]\nprofile_id = \"file1\"\n")
            .unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.nextdns.profile_id.as_deref(), Some("file1"));
    }
}
