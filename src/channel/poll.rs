//! 拉取模式：启动任务、查询状态、列出域名的响应

use crate::error::AppError;
use crate::orchestrator::JobService;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::error;

/// 与具体 HTTP 框架无关的响应
#[derive(Debug, Clone, PartialEq)]
pub struct HttpReply {
    pub status: u16,
    pub body: Value,
}

impl HttpReply {
    fn ok(body: impl Serialize) -> Self {
        match serde_json::to_value(body) {
            Ok(body) => Self { status: 200, body },
            Err(e) => Self::failure(500, e.to_string()),
        }
    }

    fn failure(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            body: json!({ "success": false, "error": message.into() }),
        }
    }

    fn from_error(err: &AppError) -> Self {
        if err.is_not_found() {
            // 客户端错误，不按系统故障记录
            return Self::failure(404, err.to_string());
        }
        error!("请求处理失败: {}", err);
        Self::failure(500, err.to_string())
    }
}

/// 启动任务，立即返回 jobId
pub async fn start_reply(service: &JobService) -> HttpReply {
    match service.start_job().await {
        Ok(started) => HttpReply::ok(started),
        Err(e) => HttpReply::from_error(&e),
    }
}

/// 查询任务状态
pub fn status_reply(service: &JobService, job_id: &str) -> HttpReply {
    match service.status(job_id) {
        Ok(snapshot) => HttpReply::ok(snapshot),
        Err(e) => HttpReply::from_error(&e),
    }
}

/// 列出域名
pub async fn domains_reply(service: &JobService) -> HttpReply {
    match service.list_domains().await {
        Ok(domains) => HttpReply::ok(json!({ "domains": domains })),
        Err(e) => HttpReply::from_error(&e),
    }
}
