use crate::models::DeviceProfile;
use thiserror::Error;

/// 应用程序错误类型
///
/// 单个域名的失败（探测、超时、写表）只会变成该域名的 Error 结果，
/// 只有 `Sink(SinkError::SourceUnavailable)` 会让整个任务失败。
#[derive(Debug, Error)]
pub enum AppError {
    /// 指标探测错误
    #[error(transparent)]
    Probe(#[from] ProbeError),
    /// 一对探测（mobile + desktop）超过了截止时间
    #[error("timeout")]
    Timeout,
    /// 表格读写错误
    #[error(transparent)]
    Sink(#[from] SinkError),
    /// 任务查询错误
    #[error(transparent)]
    Job(#[from] JobError),
    /// 浏览器相关错误
    #[error(transparent)]
    Browser(#[from] BrowserError),
    /// 配置错误
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// 域名任务异常退出（panic 或被取消）
    #[error("domain task aborted: {0}")]
    TaskAborted(String),
}

/// 指标探测错误
#[derive(Debug, Error)]
pub enum ProbeError {
    /// 网络请求失败
    #[error("{profile} request for {domain} failed: {message}")]
    RequestFailed {
        domain: String,
        profile: DeviceProfile,
        message: String,
    },
    /// 上游返回非 2xx 状态码
    #[error("{profile} request for {domain} returned HTTP {status}")]
    HttpStatus {
        domain: String,
        profile: DeviceProfile,
        status: u16,
    },
    /// 上游返回了错误对象
    #[error("PageSpeed API error for {domain} ({profile}): {message}")]
    Api {
        domain: String,
        profile: DeviceProfile,
        code: Option<u16>,
        message: String,
    },
    /// 响应缺少字段或字段格式错误
    #[error("malformed {profile} response for {domain}: missing or invalid {field}")]
    MalformedResponse {
        domain: String,
        profile: DeviceProfile,
        field: String,
    },
    /// 本地浏览器分析失败
    #[error("browser audit of {domain} ({profile}) failed: {message}")]
    Audit {
        domain: String,
        profile: DeviceProfile,
        message: String,
    },
    /// 截止时间已到，探测被取消
    #[error("{profile} probe for {domain} was cancelled")]
    Cancelled {
        domain: String,
        profile: DeviceProfile,
    },
}

/// 表格读写错误
#[derive(Debug, Error)]
pub enum SinkError {
    /// 无法读取域名列表（整个任务失败）
    #[error("result source unavailable: {message}")]
    SourceUnavailable { message: String },
    /// 表格中没有该域名的标签页
    #[error("no sheet tab named {domain}")]
    TabNotFound { domain: String },
    /// 写入或着色失败
    #[error("failed to write results for {domain}: {message}")]
    WriteFailed { domain: String, message: String },
}

/// 任务查询错误
#[derive(Debug, Error)]
pub enum JobError {
    /// 任务不存在
    #[error("Job not found")]
    NotFound { job_id: String },
    /// 任务ID已存在
    #[error("job {job_id} already exists")]
    AlreadyExists { job_id: String },
    /// 同一域名重复记录
    #[error("job {job_id} already has a result for {domain}")]
    DuplicateResult { job_id: String, domain: String },
    /// 任务已结束，不再接受结果
    #[error("job {job_id} is finished")]
    Finished { job_id: String },
}

/// 浏览器相关错误
#[derive(Debug, Error)]
pub enum BrowserError {
    /// 连接浏览器失败
    #[error("could not connect to browser on port {port}: {message}")]
    ConnectionFailed { port: u16, message: String },
    /// 启动浏览器失败
    #[error("could not launch headless browser: {message}")]
    LaunchFailed { message: String },
    /// 浏览器配置失败
    #[error("invalid browser configuration: {message}")]
    ConfigurationFailed { message: String },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 数值字段非法
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
    /// 配置文件读取失败
    #[error("could not read config file {path}: {message}")]
    ReadFailed { path: String, message: String },
    /// 配置文件解析失败
    #[error("could not parse config file {path}: {message}")]
    ParseFailed { path: String, message: String },
}

// ========== 便捷构造函数 ==========

impl ProbeError {
    /// 创建网络请求失败错误
    pub fn request_failed(
        domain: impl Into<String>,
        profile: DeviceProfile,
        source: impl std::fmt::Display,
    ) -> Self {
        ProbeError::RequestFailed {
            domain: domain.into(),
            profile,
            message: source.to_string(),
        }
    }

    /// 创建字段缺失错误
    pub fn malformed(domain: impl Into<String>, profile: DeviceProfile, field: &str) -> Self {
        ProbeError::MalformedResponse {
            domain: domain.into(),
            profile,
            field: field.to_string(),
        }
    }

    /// 创建浏览器分析失败错误
    pub fn audit_failed(
        domain: impl Into<String>,
        profile: DeviceProfile,
        source: impl std::fmt::Display,
    ) -> Self {
        ProbeError::Audit {
            domain: domain.into(),
            profile,
            message: source.to_string(),
        }
    }
}

impl SinkError {
    /// 创建数据源不可用错误
    pub fn unavailable(source: impl std::fmt::Display) -> Self {
        SinkError::SourceUnavailable {
            message: source.to_string(),
        }
    }

    /// 创建写入失败错误
    pub fn write_failed(domain: impl Into<String>, source: impl std::fmt::Display) -> Self {
        SinkError::WriteFailed {
            domain: domain.into(),
            message: source.to_string(),
        }
    }
}

impl ConfigError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl AppError {
    /// 是否为客户端错误（不应按系统故障记录）
    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::Job(JobError::NotFound { .. }))
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
