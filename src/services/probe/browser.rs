//! 本地浏览器探测
//!
//! 每次探测打开一个新页面，模拟设备后导航到站点，读取绘制和导航时间，
//! 再用 Lighthouse 的评分曲线估算性能分数。

use super::MetricProbe;
use crate::error::ProbeError;
use crate::infrastructure::JsExecutor;
use crate::models::{DeviceProfile, MetricSet};
use crate::services::scoring;
use async_trait::async_trait;
use chromiumoxide::Browser;
use serde::Deserialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

const TIMING_SCRIPT: &str = r#"
(async () => {
    if (document.readyState !== "complete") {
        await new Promise((resolve) => window.addEventListener("load", resolve, { once: true }));
    }
    await new Promise((resolve) => setTimeout(resolve, 0));
    const paint = performance.getEntriesByName("first-contentful-paint")[0];
    const nav = performance.getEntriesByType("navigation")[0];
    return {
        fcp: paint ? paint.startTime : null,
        loadEventEnd: nav ? nav.loadEventEnd : null
    };
})()
"#;

/// 页面内测得的原始时间（毫秒）
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaintTimings {
    pub fcp: Option<f64>,
    pub load_event_end: Option<f64>,
}

impl PaintTimings {
    /// 转换为指标
    ///
    /// 速度指数用 FCP 和 load 结束时间的均值近似。
    pub fn into_metrics(self, domain: &str, profile: DeviceProfile) -> Result<MetricSet, ProbeError> {
        let fcp = self
            .fcp
            .ok_or_else(|| ProbeError::malformed(domain, profile, "first-contentful-paint"))?;
        let load = self
            .load_event_end
            .filter(|v| *v > 0.0)
            .ok_or_else(|| ProbeError::malformed(domain, profile, "loadEventEnd"))?;

        let speed_index = (fcp + load.max(fcp)) / 2.0;
        let score = scoring::performance_score(profile, fcp, speed_index);

        MetricSet::from_raw(score, fcp, speed_index)
            .ok_or_else(|| ProbeError::malformed(domain, profile, "metric values"))
    }
}

/// 基于本地浏览器的探测
pub struct BrowserProbe {
    browser: Arc<Browser>,
}

impl BrowserProbe {
    pub fn new(browser: Browser) -> Self {
        Self {
            browser: Arc::new(browser),
        }
    }

    async fn audit(
        &self,
        executor: &JsExecutor,
        domain: &str,
        profile: DeviceProfile,
    ) -> Result<MetricSet, ProbeError> {
        executor
            .emulate(profile)
            .await
            .map_err(|e| ProbeError::audit_failed(domain, profile, e))?;
        executor
            .navigate(&format!("https://{}", domain))
            .await
            .map_err(|e| ProbeError::audit_failed(domain, profile, e))?;

        let timings: PaintTimings = executor
            .eval_as(TIMING_SCRIPT)
            .await
            .map_err(|e| ProbeError::audit_failed(domain, profile, e))?;
        debug!("[域名 {}] {} 页面时间: {:?}", domain, profile, timings);

        timings.into_metrics(domain, profile)
    }
}

#[async_trait]
impl MetricProbe for BrowserProbe {
    fn name(&self) -> &str {
        "browser"
    }

    async fn probe(
        &self,
        domain: &str,
        profile: DeviceProfile,
        cancel: &CancellationToken,
    ) -> Result<MetricSet, ProbeError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| ProbeError::audit_failed(domain, profile, e))?;
        let executor = JsExecutor::new(page);

        let outcome = tokio::select! {
            _ = cancel.cancelled() => Err(ProbeError::Cancelled {
                domain: domain.to_string(),
                profile,
            }),
            outcome = self.audit(&executor, domain, profile) => outcome,
        };

        // 无论成功与否都关闭页面
        if let Err(e) = executor.close().await {
            warn!("[域名 {}] 关闭页面失败: {}", domain, e);
        }

        outcome
    }
}
