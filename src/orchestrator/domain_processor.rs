//! 单个域名处理器 - 编排层
//!
//! ## 职责
//!
//! 1. **成对探测**：mobile 和 desktop 同时探测，共用一个截止时间
//! 2. **超时取消**：截止时间到达后触发取消令牌，并在宽限期内等待探测自行退出
//! 3. **写入表格**：探测成功后写入结果列，写入有独立的截止时间
//! 4. **失败隔离**：任何失败都转换为该域名的 Error 结果，不向上传播

use crate::error::{AppError, AppResult, ProbeError, SinkError};
use crate::models::{DeviceProfile, DomainResult, MetricPair};
use crate::services::{MetricProbe, ResultSink};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// 取消后等待探测收尾（例如关闭页面）的最长时间
pub const CANCEL_GRACE: Duration = Duration::from_secs(5);

/// 在截止时间内完成一对探测
///
/// 任一探测失败即取消另一个，并等它退出后再返回。
/// 超时后先触发取消，再给探测 `CANCEL_GRACE` 的时间收尾，收尾期间的结果一律丢弃。
pub async fn probe_pair(
    probe: &dyn MetricProbe,
    domain: &str,
    timeout: Duration,
) -> AppResult<MetricPair> {
    let cancel = CancellationToken::new();
    // 离开本函数时取消仍在进行的探测
    let _cancel_on_exit = cancel.clone().drop_guard();
    let deadline = Instant::now() + timeout;

    let pair = async {
        let (mobile, desktop) = tokio::join!(
            cancel_on_error(probe.probe(domain, DeviceProfile::Mobile, &cancel), &cancel),
            cancel_on_error(probe.probe(domain, DeviceProfile::Desktop, &cancel), &cancel),
        );
        match (mobile, desktop) {
            (Ok(mobile), Ok(desktop)) => Ok(MetricPair { mobile, desktop }),
            (Err(e), Ok(_)) | (Ok(_), Err(e)) => Err(e),
            (Err(mobile), Err(desktop)) => Err(first_failure(mobile, desktop)),
        }
    };
    let mut pair = std::pin::pin!(pair);

    match tokio::time::timeout_at(deadline, &mut pair).await {
        Ok(result) => Ok(result?),
        Err(_) => {
            cancel.cancel();
            match tokio::time::timeout(CANCEL_GRACE, &mut pair).await {
                Ok(_) => debug!("[域名 {}] 超时，探测已退出", domain),
                Err(_) => warn!("[域名 {}] ⚠️ 取消后 {:?} 内探测仍未退出", domain, CANCEL_GRACE),
            }
            Err(AppError::Timeout)
        }
    }
}

/// 探测失败时立即取消同一对中的另一个
async fn cancel_on_error<T>(
    probe: impl Future<Output = Result<T, ProbeError>>,
    cancel: &CancellationToken,
) -> Result<T, ProbeError> {
    let result = probe.await;
    if result.is_err() {
        cancel.cancel();
    }
    result
}

/// 两侧都失败时，报告真正的失败而不是被连带取消的那一侧
fn first_failure(mobile: ProbeError, desktop: ProbeError) -> ProbeError {
    match mobile {
        ProbeError::Cancelled { .. } => desktop,
        _ => mobile,
    }
}

/// 处理单个域名
///
/// # 参数
/// - `probe`: 指标探测
/// - `sink`: 结果写入
/// - `domain`: 域名
/// - `date`: 结果列日期
/// - `timeout`: 一对探测的超时时间，写表也使用同样长度的截止时间
///
/// # 返回
/// 总是返回一个结果，成功或失败
pub async fn process_domain(
    probe: Arc<dyn MetricProbe>,
    sink: Arc<dyn ResultSink>,
    domain: String,
    date: String,
    timeout: Duration,
) -> DomainResult {
    let started = Instant::now();
    info!("[域名 {}] 开始测试 ({})", domain, probe.name());

    let outcome = async {
        let metrics = probe_pair(probe.as_ref(), &domain, timeout).await?;
        tokio::time::timeout(timeout, sink.write_result(&domain, &metrics, &date))
            .await
            .map_err(|_| SinkError::write_failed(&domain, "timeout"))??;
        Ok::<_, AppError>(metrics)
    }
    .await;

    let elapsed = started.elapsed().as_secs_f64();
    match outcome {
        Ok(metrics) => {
            info!(
                "[域名 {}] ✅ 完成，用时 {:.1}s | mobile {} | desktop {}",
                domain, elapsed, metrics.mobile.performance, metrics.desktop.performance
            );
            DomainResult::success(domain, metrics)
        }
        Err(e) => {
            warn!("[域名 {}] ❌ 失败，用时 {:.1}s: {}", domain, elapsed, e);
            DomainResult::error(domain, e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MetricSet;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    fn metrics() -> MetricSet {
        MetricSet {
            performance: 90,
            first_contentful_paint: 1.0,
            speed_index: 2.0,
        }
    }

    /// 一直等到取消，然后花一点时间收尾
    #[derive(Default)]
    struct CleanupProbe {
        cleaned_up: AtomicUsize,
    }

    #[async_trait]
    impl MetricProbe for CleanupProbe {
        fn name(&self) -> &str {
            "cleanup"
        }

        async fn probe(
            &self,
            domain: &str,
            profile: DeviceProfile,
            cancel: &CancellationToken,
        ) -> Result<MetricSet, ProbeError> {
            cancel.cancelled().await;
            // 模拟关闭页面
            tokio::time::sleep(Duration::from_millis(200)).await;
            self.cleaned_up.fetch_add(1, Ordering::SeqCst);
            Err(ProbeError::Cancelled {
                domain: domain.to_string(),
                profile,
            })
        }
    }

    /// 完全不理会取消令牌
    #[derive(Default)]
    struct StubbornProbe {
        finished: AtomicBool,
    }

    #[async_trait]
    impl MetricProbe for StubbornProbe {
        fn name(&self) -> &str {
            "stubborn"
        }

        async fn probe(
            &self,
            _domain: &str,
            _profile: DeviceProfile,
            _cancel: &CancellationToken,
        ) -> Result<MetricSet, ProbeError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            self.finished.store(true, Ordering::SeqCst);
            Ok(metrics())
        }
    }

    /// mobile 立即失败，desktop 等待取消
    struct HalfFailingProbe {
        desktop_cancelled: AtomicBool,
    }

    #[async_trait]
    impl MetricProbe for HalfFailingProbe {
        fn name(&self) -> &str {
            "half-failing"
        }

        async fn probe(
            &self,
            domain: &str,
            profile: DeviceProfile,
            cancel: &CancellationToken,
        ) -> Result<MetricSet, ProbeError> {
            match profile {
                DeviceProfile::Mobile => Err(ProbeError::request_failed(domain, profile, "quota exceeded")),
                DeviceProfile::Desktop => {
                    tokio::select! {
                        _ = cancel.cancelled() => {
                            self.desktop_cancelled.store(true, Ordering::SeqCst);
                            Err(ProbeError::Cancelled { domain: domain.to_string(), profile })
                        }
                        _ = tokio::time::sleep(Duration::from_secs(10)) => Ok(metrics()),
                    }
                }
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn timed_out_probes_finish_their_cleanup() {
        let probe = CleanupProbe::default();
        let started = Instant::now();

        let err = probe_pair(&probe, "a.com", Duration::from_secs(30)).await.unwrap_err();

        assert!(matches!(err, AppError::Timeout));
        assert_eq!(probe.cleaned_up.load(Ordering::SeqCst), 2);
        assert!(started.elapsed() < Duration::from_secs(31));
    }

    #[tokio::test(start_paused = true)]
    async fn probes_ignoring_cancel_are_abandoned_after_grace() {
        let probe = StubbornProbe::default();
        let started = Instant::now();

        let err = probe_pair(&probe, "a.com", Duration::from_secs(30)).await.unwrap_err();

        assert!(matches!(err, AppError::Timeout));
        assert_eq!(started.elapsed(), Duration::from_secs(30) + CANCEL_GRACE);
        assert!(!probe.finished.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_side_cancels_the_other_and_reports_the_real_error() {
        let probe = HalfFailingProbe {
            desktop_cancelled: AtomicBool::new(false),
        };
        let started = Instant::now();

        let err = probe_pair(&probe, "b.com", Duration::from_secs(30)).await.unwrap_err();

        assert_eq!(err.to_string(), "mobile request for b.com failed: quota exceeded");
        assert!(probe.desktop_cancelled.load(Ordering::SeqCst));
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[test]
    fn cancelled_side_never_masks_the_cause() {
        let cancelled = ProbeError::Cancelled {
            domain: "a.com".into(),
            profile: DeviceProfile::Mobile,
        };
        let cause = ProbeError::request_failed("a.com", DeviceProfile::Desktop, "boom");
        assert!(matches!(first_failure(cancelled, cause), ProbeError::RequestFailed { .. }));
    }
}
