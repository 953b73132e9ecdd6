//! 指标探测能力
//!
//! 两个实现：
//! - `PageSpeedProbe` - 调用 PageSpeed Insights API
//! - `BrowserProbe` - 用本地无头浏览器测量

mod browser;
mod pagespeed;

pub use browser::BrowserProbe;
pub use pagespeed::{metrics_from_response, PageSpeedProbe};

use crate::error::ProbeError;
use crate::models::{DeviceProfile, MetricSet};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// 指标探测
///
/// 要么返回完整的 `MetricSet`，要么失败，不存在部分结果。
/// `cancel` 被触发时应尽快返回 `ProbeError::Cancelled`，调用方会丢弃之后的任何结果。
#[async_trait]
pub trait MetricProbe: Send + Sync {
    /// 后端名称（用于日志）
    fn name(&self) -> &str;

    async fn probe(
        &self,
        domain: &str,
        profile: DeviceProfile,
        cancel: &CancellationToken,
    ) -> Result<MetricSet, ProbeError>;
}
