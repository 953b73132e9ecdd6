//! 任务相关的对外数据结构（轮询接口的响应体）

use crate::models::metrics::DomainResult;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 任务ID（创建时刻的毫秒时间戳）
pub type JobId = String;

/// 任务状态快照
///
/// `percent_complete` 和 `duration` 在查询时计算，不存储。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSnapshot {
    pub success: bool,
    /// "completed/total"
    pub progress: String,
    pub percent_complete: u32,
    /// 形如 "12.3s"
    pub duration: String,
    /// 所有结果都已记录且任务进入终态
    pub complete: bool,
    pub results: Vec<DomainResult>,
}

impl JobSnapshot {
    pub fn new(
        completed: usize,
        total: usize,
        elapsed: Duration,
        complete: bool,
        results: Vec<DomainResult>,
    ) -> Self {
        Self {
            success: true,
            progress: format!("{}/{}", completed, total),
            percent_complete: percent_complete(completed, total),
            duration: format_duration(elapsed),
            complete,
            results,
        }
    }
}

/// 启动任务的立即响应
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStarted {
    pub success: bool,
    pub job_id: JobId,
    pub progress: String,
    pub percent_complete: u32,
    pub duration: String,
    pub results: Vec<DomainResult>,
}

impl JobStarted {
    pub fn new(job_id: JobId, total: usize) -> Self {
        Self {
            success: true,
            job_id,
            progress: format!("0/{}", total),
            percent_complete: 0,
            duration: "0s".to_string(),
            results: Vec::new(),
        }
    }
}

/// round(completed / total * 100)；空任务视为已完成
pub fn percent_complete(completed: usize, total: usize) -> u32 {
    if total == 0 {
        return 100;
    }
    ((completed as f64 / total as f64) * 100.0).round() as u32
}

/// 秒数保留一位小数，例如 "3.4s"
pub fn format_duration(elapsed: Duration) -> String {
    format!("{:.1}s", elapsed.as_secs_f64())
}
