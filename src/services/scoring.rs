//! Lighthouse 风格的对数正态评分
//!
//! 本地浏览器分析只测得 FCP 和速度指数，性能分数按 Lighthouse 的评分曲线估算，两项等权。

use crate::models::DeviceProfile;

/// 评分曲线：p10 处得 0.9 分，中位数处得 0.5 分（单位：毫秒）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringCurve {
    pub p10: f64,
    pub median: f64,
}

const MOBILE_FCP: ScoringCurve = ScoringCurve { p10: 1800.0, median: 3000.0 };
const MOBILE_SPEED_INDEX: ScoringCurve = ScoringCurve { p10: 3387.0, median: 5800.0 };
const DESKTOP_FCP: ScoringCurve = ScoringCurve { p10: 934.0, median: 1600.0 };
const DESKTOP_SPEED_INDEX: ScoringCurve = ScoringCurve { p10: 1311.0, median: 2300.0 };

// erfc^-1(0.2)
const INVERSE_ERFC_ONE_FIFTH: f64 = 0.906_193_802_436_823_2;

impl ScoringCurve {
    pub fn first_contentful_paint(profile: DeviceProfile) -> Self {
        match profile {
            DeviceProfile::Mobile => MOBILE_FCP,
            DeviceProfile::Desktop => DESKTOP_FCP,
        }
    }

    pub fn speed_index(profile: DeviceProfile) -> Self {
        match profile {
            DeviceProfile::Mobile => MOBILE_SPEED_INDEX,
            DeviceProfile::Desktop => DESKTOP_SPEED_INDEX,
        }
    }

    /// 计算 0.0–1.0 的分数
    pub fn score(&self, value: f64) -> f64 {
        if value <= 0.0 {
            return 1.0;
        }

        let x_log_ratio = (value / self.median).max(f64::EPSILON).ln();
        let p10_log_ratio = -(self.p10 / self.median).max(f64::EPSILON).ln();
        let standardized = x_log_ratio * INVERSE_ERFC_ONE_FIFTH / p10_log_ratio;
        let complementary = (1.0 - erf(standardized)) / 2.0;

        // 近似误差不能让分数越过区间边界
        if value <= self.p10 {
            complementary.clamp(0.9, 1.0)
        } else if value <= self.median {
            complementary.clamp(0.5, 0.899_999_999_999_999_9)
        } else {
            complementary.clamp(0.0, 0.499_999_999_999_999_94)
        }
    }
}

/// 由 FCP 和速度指数估算性能分数
pub fn performance_score(profile: DeviceProfile, fcp_ms: f64, speed_index_ms: f64) -> f64 {
    let fcp = ScoringCurve::first_contentful_paint(profile).score(fcp_ms);
    let si = ScoringCurve::speed_index(profile).score(speed_index_ms);
    (fcp + si) / 2.0
}

/// Abramowitz-Stegun 7.1.26
fn erf(x: f64) -> f64 {
    let sign = x.signum();
    let x = x.abs();

    let a1 = 0.254_829_592;
    let a2 = -0.284_496_736;
    let a3 = 1.421_413_741;
    let a4 = -1.453_152_027;
    let a5 = 1.061_405_429;
    let p = 0.327_591_1;

    let t = 1.0 / (1.0 + p * x);
    let y = t * (a1 + t * (a2 + t * (a3 + t * (a4 + t * a5))));
    sign * (1.0 - y * (-x * x).exp())
}
