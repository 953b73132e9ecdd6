//! 结果写入能力
//!
//! 表格中每个标签页对应一个域名：
//! - `list_domains()` - 按表格顺序列出所有标签页名
//! - `write_result()` - 把一个域名的 6 个数值写入 "{date} Results" 列并着色
//!
//! 同一天重复写入会覆盖已有的日期列，不会新增重复列。
//! 同一标签页的写入由实现自己串行化。

pub mod format;
pub mod layout;
mod memory;
mod sheets;

pub use format::{MetricKind, Rating, Rgb};
pub use memory::{MemoryCell, MemorySink, MemoryTab};
pub use sheets::SheetsSink;

use crate::error::SinkError;
use crate::models::MetricPair;
use async_trait::async_trait;

#[async_trait]
pub trait ResultSink: Send + Sync {
    /// 列出所有域名（失败时整个任务无法开始）
    async fn list_domains(&self) -> Result<Vec<String>, SinkError>;

    /// 写入一个域名的结果
    ///
    /// # 参数
    /// - `date`: "YYYY-MM-DD"
    async fn write_result(
        &self,
        domain: &str,
        metrics: &MetricPair,
        date: &str,
    ) -> Result<(), SinkError>;
}

/// 当天日期（UTC），用作结果列名
pub fn today() -> String {
    chrono::Utc::now().format("%Y-%m-%d").to_string()
}
