//! 指标着色规则
//!
//! 性能分数越高越好，时间类指标越低越好。

use serde::Serialize;

/// 指标类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Performance,
    FirstContentfulPaint,
    SpeedIndex,
}

/// 评级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    Good,
    Medium,
    Poor,
}

/// 背景色（0–1 的 RGB，与 Sheets API 的 Color 一致）
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rgb {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
}

impl Rating {
    pub fn color(&self) -> Rgb {
        match self {
            Rating::Good => Rgb { red: 0.8, green: 0.9, blue: 0.8 },
            Rating::Medium => Rgb { red: 0.9, green: 0.9, blue: 0.8 },
            Rating::Poor => Rgb { red: 0.9, green: 0.8, blue: 0.8 },
        }
    }
}

impl MetricKind {
    /// (good, medium) 阈值
    fn thresholds(&self) -> (f64, f64) {
        match self {
            MetricKind::Performance => (90.0, 50.0),
            MetricKind::FirstContentfulPaint => (1.8, 3.0),
            MetricKind::SpeedIndex => (3.4, 5.8),
        }
    }

    /// 对一个值评级
    pub fn rate(&self, value: f64) -> Rating {
        let (good, medium) = self.thresholds();
        match self {
            MetricKind::Performance => {
                if value >= good {
                    Rating::Good
                } else if value >= medium {
                    Rating::Medium
                } else {
                    Rating::Poor
                }
            }
            MetricKind::FirstContentfulPaint | MetricKind::SpeedIndex => {
                if value <= good {
                    Rating::Good
                } else if value <= medium {
                    Rating::Medium
                } else {
                    Rating::Poor
                }
            }
        }
    }
}
