//! 指标数据模型
//!
//! 一个域名在一种设备模式下的三项核心指标，以及一次任务中单个域名的结果。

use serde::{Deserialize, Serialize};
use std::fmt;

/// 设备模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceProfile {
    Mobile,
    Desktop,
}

impl DeviceProfile {
    /// 固定顺序：先 mobile 后 desktop
    pub const ALL: [DeviceProfile; 2] = [DeviceProfile::Mobile, DeviceProfile::Desktop];

    /// PageSpeed API 的 `strategy` 参数值
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceProfile::Mobile => "mobile",
            DeviceProfile::Desktop => "desktop",
        }
    }
}

impl fmt::Display for DeviceProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 三项核心指标
///
/// - `performance`: 0–100 的整数分数
/// - `first_contentful_paint` / `speed_index`: 秒，保留两位小数
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricSet {
    pub performance: u8,
    pub first_contentful_paint: f64,
    pub speed_index: f64,
}

impl MetricSet {
    /// 从上游原始值构建
    ///
    /// # 参数
    /// - `score`: 0.0–1.0 的性能分数
    /// - `fcp_ms` / `speed_index_ms`: 毫秒
    ///
    /// 任一值不是有限非负数（或分数超出 0–1）时返回 `None`，不会产生半成品。
    pub fn from_raw(score: f64, fcp_ms: f64, speed_index_ms: f64) -> Option<Self> {
        if !(0.0..=1.0).contains(&score) {
            return None;
        }
        if !is_valid_millis(fcp_ms) || !is_valid_millis(speed_index_ms) {
            return None;
        }

        Some(Self {
            performance: (score * 100.0).round() as u8,
            first_contentful_paint: millis_to_seconds(fcp_ms),
            speed_index: millis_to_seconds(speed_index_ms),
        })
    }
}

fn is_valid_millis(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

/// 毫秒转秒，保留两位小数
pub fn millis_to_seconds(ms: f64) -> f64 {
    (ms / 10.0).round() / 100.0
}

/// 同一域名 mobile + desktop 两组指标
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricPair {
    pub mobile: MetricSet,
    pub desktop: MetricSet,
}

/// 单个域名的处理结果（创建后不再修改）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainResult {
    pub domain: String,
    #[serde(flatten)]
    pub outcome: DomainOutcome,
}

/// 成功时带两组指标，失败时带错误描述，二者互斥
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum DomainOutcome {
    Success {
        mobile: MetricSet,
        desktop: MetricSet,
    },
    Error {
        error: String,
    },
}

impl DomainResult {
    pub fn success(domain: impl Into<String>, metrics: MetricPair) -> Self {
        Self {
            domain: domain.into(),
            outcome: DomainOutcome::Success {
                mobile: metrics.mobile,
                desktop: metrics.desktop,
            },
        }
    }

    pub fn error(domain: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            outcome: DomainOutcome::Error {
                error: error.into(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, DomainOutcome::Success { .. })
    }
}
