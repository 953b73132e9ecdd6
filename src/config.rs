use crate::error::ConfigError;
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// 指标探测后端
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeBackend {
    /// Google PageSpeed Insights API
    Pagespeed,
    /// 本地无头浏览器分析
    Browser,
}

impl FromStr for ProbeBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pagespeed" | "api" => Ok(ProbeBackend::Pagespeed),
            "browser" | "lighthouse" => Ok(ProbeBackend::Browser),
            other => Err(ConfigError::invalid("probe_backend", format!("unknown backend '{}'", other))),
        }
    }
}

/// 结果写入后端
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkBackend {
    /// Google Sheets
    Sheets,
    /// 进程内表格（开发和演示用）
    Memory,
}

impl FromStr for SinkBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sheets" => Ok(SinkBackend::Sheets),
            "memory" => Ok(SinkBackend::Memory),
            other => Err(ConfigError::invalid("sink_backend", format!("unknown backend '{}'", other))),
        }
    }
}

/// 程序配置文件
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 每批同时处理的域名数量
    pub batch_size: usize,
    /// 单个域名（mobile + desktop 两次探测）的超时时间
    pub domain_timeout_secs: u64,
    /// 每个任务最多处理的域名数（开发时截断用）
    pub max_domains: Option<usize>,
    /// 最多保留的任务数，超过后淘汰最早结束的任务
    pub max_retained_jobs: Option<usize>,
    // --- 探测配置 ---
    pub probe_backend: ProbeBackend,
    pub pagespeed_api_key: Option<String>,
    pub pagespeed_api_base_url: String,
    pub pagespeed_request_timeout_secs: u64,
    // --- 表格配置 ---
    pub sink_backend: SinkBackend,
    pub sheets_spreadsheet_id: String,
    pub sheets_access_token: String,
    pub sheets_api_base_url: String,
    /// 单个 Sheets 请求的超时时间
    pub sheets_request_timeout_secs: u64,
    /// 内存表格的初始标签页（逗号分隔）
    pub memory_domains: Vec<String>,
    // --- 浏览器配置 ---
    /// 设置后连接已运行的浏览器，否则启动无头浏览器
    pub browser_debug_port: Option<u16>,
    pub chrome_executable: Option<String>,
    // --- 服务配置 ---
    pub server_addr: String,
    /// 轮询模式下查询状态的间隔
    pub poll_interval_secs: u64,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 运行报告文件，留空则不写
    pub output_log_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            batch_size: 3,
            domain_timeout_secs: 30,
            max_domains: None,
            max_retained_jobs: None,
            probe_backend: ProbeBackend::Pagespeed,
            pagespeed_api_key: None,
            pagespeed_api_base_url: "https://www.googleapis.com/pagespeedonline/v5".to_string(),
            pagespeed_request_timeout_secs: 60,
            sink_backend: SinkBackend::Sheets,
            sheets_spreadsheet_id: String::new(),
            sheets_access_token: String::new(),
            sheets_api_base_url: "https://sheets.googleapis.com/v4".to_string(),
            sheets_request_timeout_secs: 30,
            memory_domains: Vec::new(),
            browser_debug_port: None,
            chrome_executable: None,
            server_addr: "127.0.0.1:3000".to_string(),
            poll_interval_secs: 2,
            verbose_logging: false,
            output_log_file: String::new(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// 读取 TOML 配置文件，缺省字段使用默认值
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            ConfigError::ParseFailed { message, .. } => ConfigError::ParseFailed {
                path: path.display().to_string(),
                message,
            },
            other => other,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseFailed {
            path: String::new(),
            message: e.to_string(),
        })
    }

    /// 用环境变量覆盖已有配置，无法解析的值保持原样
    pub fn with_env_overrides(self) -> Self {
        let base = self;
        Self {
            batch_size: env_parse("BATCH_SIZE").unwrap_or(base.batch_size),
            domain_timeout_secs: env_parse("DOMAIN_TIMEOUT_SECS").unwrap_or(base.domain_timeout_secs),
            max_domains: env_parse("MAX_DOMAINS").or(base.max_domains),
            max_retained_jobs: env_parse("MAX_RETAINED_JOBS").or(base.max_retained_jobs),
            probe_backend: env_parse("PROBE_BACKEND").unwrap_or(base.probe_backend),
            pagespeed_api_key: std::env::var("PAGESPEED_API_KEY").ok().or(base.pagespeed_api_key),
            pagespeed_api_base_url: std::env::var("PAGESPEED_API_BASE_URL").unwrap_or(base.pagespeed_api_base_url),
            pagespeed_request_timeout_secs: env_parse("PAGESPEED_REQUEST_TIMEOUT_SECS")
                .unwrap_or(base.pagespeed_request_timeout_secs),
            sink_backend: env_parse("SINK_BACKEND").unwrap_or(base.sink_backend),
            sheets_spreadsheet_id: std::env::var("GOOGLE_SHEETS_SHEET_ID").unwrap_or(base.sheets_spreadsheet_id),
            sheets_access_token: std::env::var("GOOGLE_SHEETS_ACCESS_TOKEN").unwrap_or(base.sheets_access_token),
            sheets_api_base_url: std::env::var("GOOGLE_SHEETS_API_BASE_URL").unwrap_or(base.sheets_api_base_url),
            sheets_request_timeout_secs: env_parse("SHEETS_REQUEST_TIMEOUT_SECS")
                .unwrap_or(base.sheets_request_timeout_secs),
            memory_domains: std::env::var("MEMORY_DOMAINS")
                .ok()
                .map(|v| split_list(&v))
                .unwrap_or(base.memory_domains),
            browser_debug_port: env_parse("BROWSER_DEBUG_PORT").or(base.browser_debug_port),
            chrome_executable: std::env::var("CHROME_EXECUTABLE").ok().or(base.chrome_executable),
            server_addr: std::env::var("SERVER_ADDR").unwrap_or(base.server_addr),
            poll_interval_secs: env_parse("POLL_INTERVAL_SECS").unwrap_or(base.poll_interval_secs),
            verbose_logging: env_parse("VERBOSE_LOGGING").unwrap_or(base.verbose_logging),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(base.output_log_file),
        }
    }

    /// 检查配置是否可用
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::invalid("batch_size", "must be at least 1"));
        }
        if self.domain_timeout_secs == 0 {
            return Err(ConfigError::invalid("domain_timeout_secs", "must be at least 1"));
        }
        if self.sink_backend == SinkBackend::Sheets && self.sheets_spreadsheet_id.is_empty() {
            return Err(ConfigError::invalid(
                "sheets_spreadsheet_id",
                "required when sink_backend = sheets",
            ));
        }
        Ok(())
    }

    pub fn domain_timeout(&self) -> Duration {
        Duration::from_secs(self.domain_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_batch_of_three_and_thirty_seconds() {
        let config = Config::default();
        assert_eq!(config.batch_size, 3);
        assert_eq!(config.domain_timeout(), Duration::from_secs(30));
        assert_eq!(config.max_domains, None);
        assert_eq!(config.probe_backend, ProbeBackend::Pagespeed);
        assert_eq!(config.sheets_request_timeout_secs, 30);
    }

    #[test]
    fn toml_file_fills_missing_keys_with_defaults() {
        let config = Config::from_toml_str(
            r#"
            batch_size = 5
            domain_timeout_secs = 60
            sink_backend = "memory"
            probe_backend = "browser"
            memory_domains = ["a.com", "b.com"]
            "#,
        )
        .unwrap();

        assert_eq!(config.batch_size, 5);
        assert_eq!(config.domain_timeout_secs, 60);
        assert_eq!(config.sink_backend, SinkBackend::Memory);
        assert_eq!(config.probe_backend, ProbeBackend::Browser);
        assert_eq!(config.memory_domains, vec!["a.com", "b.com"]);
        assert_eq!(config.poll_interval_secs, 2);
    }

    #[test]
    fn bad_toml_is_a_parse_error() {
        let err = Config::from_toml_str("batch_size = \"many\"").unwrap_err();
        assert!(matches!(err, ConfigError::ParseFailed { .. }));
    }

    #[test]
    fn validate_rejects_zero_batch_size() {
        let config = Config {
            batch_size: 0,
            sink_backend: SinkBackend::Memory,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_requires_spreadsheet_for_sheets_sink() {
        assert!(Config::default().validate().is_err());
        let config = Config {
            sheets_spreadsheet_id: "sheet-id".into(),
            ..Config::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn backends_parse_from_strings() {
        assert_eq!("API".parse::<ProbeBackend>().unwrap(), ProbeBackend::Pagespeed);
        assert_eq!("lighthouse".parse::<ProbeBackend>().unwrap(), ProbeBackend::Browser);
        assert!("carrier-pigeon".parse::<SinkBackend>().is_err());
    }

    #[test]
    fn list_values_are_trimmed() {
        assert_eq!(split_list(" a.com, ,b.com "), vec!["a.com", "b.com"]);
    }
}
