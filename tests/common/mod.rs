//! 测试用的探测和表格替身
#![allow(dead_code)]

use async_trait::async_trait;
use pagespeed_monitor::error::{ProbeError, SinkError};
use pagespeed_monitor::jobs::{JobManager, RetentionPolicy};
use pagespeed_monitor::models::{DeviceProfile, MetricPair, MetricSet};
use pagespeed_monitor::orchestrator::{JobService, OrchestratorSettings};
use pagespeed_monitor::services::{MemorySink, MetricProbe, ResultSink};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub fn metrics(performance: u8, fcp: f64, si: f64) -> MetricSet {
    MetricSet {
        performance,
        first_contentful_paint: fcp,
        speed_index: si,
    }
}

pub fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// 一次探测的脚本：等待多久，返回什么
#[derive(Clone)]
pub struct Step {
    pub delay: Duration,
    pub outcome: Result<MetricSet, String>,
}

impl Step {
    pub fn ok_after(secs: u64, metrics: MetricSet) -> Self {
        Self {
            delay: Duration::from_secs(secs),
            outcome: Ok(metrics),
        }
    }

    pub fn fail(message: &str) -> Self {
        Self {
            delay: Duration::ZERO,
            outcome: Err(message.to_string()),
        }
    }
}

/// 按 (域名, 设备模式) 返回预设结果的探测
pub struct ScriptedProbe {
    steps: HashMap<(String, DeviceProfile), Step>,
    default_step: Step,
    pub calls: AtomicUsize,
    cancelled: AtomicUsize,
    in_flight: Arc<AtomicUsize>,
    pub max_in_flight: Arc<AtomicUsize>,
}

impl ScriptedProbe {
    pub fn new(default_step: Step) -> Self {
        Self {
            steps: HashMap::new(),
            default_step,
            calls: AtomicUsize::new(0),
            cancelled: AtomicUsize::new(0),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// 默认立即返回 95 / 1.2 / 2.1
    pub fn instant() -> Self {
        Self::new(Step::ok_after(0, metrics(95, 1.2, 2.1)))
    }

    pub fn with(mut self, domain: &str, profile: DeviceProfile, step: Step) -> Self {
        self.steps.insert((domain.to_string(), profile), step);
        self
    }

    /// 同一域名两种模式使用相同脚本
    pub fn with_both(self, domain: &str, step: Step) -> Self {
        self.with(domain, DeviceProfile::Mobile, step.clone())
            .with(domain, DeviceProfile::Desktop, step)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// 观察到取消令牌并自行退出的次数
    pub fn cancelled(&self) -> usize {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

/// 探测结束（包括被丢弃）时减少计数
struct InFlight(Arc<AtomicUsize>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl MetricProbe for ScriptedProbe {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn probe(
        &self,
        domain: &str,
        profile: DeviceProfile,
        cancel: &CancellationToken,
    ) -> Result<MetricSet, ProbeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(self.in_flight.clone());

        let step = self
            .steps
            .get(&(domain.to_string(), profile))
            .cloned()
            .unwrap_or_else(|| self.default_step.clone());

        tokio::select! {
            _ = cancel.cancelled() => {
                // 收尾需要再被调度一次，调用方提前丢弃时不会计数
                tokio::task::yield_now().await;
                self.cancelled.fetch_add(1, Ordering::SeqCst);
                Err(ProbeError::Cancelled {
                    domain: domain.to_string(),
                    profile,
                })
            }
            _ = tokio::time::sleep(step.delay) => {
                step.outcome.map_err(|m| ProbeError::request_failed(domain, profile, m))
            }
        }
    }
}

/// 内存表格 + 可注入的故障
pub struct FlakySink {
    pub inner: MemorySink,
    failing_writes: HashSet<String>,
    hanging_writes: HashSet<String>,
    unavailable: bool,
}

impl FlakySink {
    pub fn new(domains: &[&str]) -> Self {
        Self {
            inner: MemorySink::new(domains.iter().copied()),
            failing_writes: HashSet::new(),
            hanging_writes: HashSet::new(),
            unavailable: false,
        }
    }

    pub fn failing_write(mut self, domain: &str) -> Self {
        self.failing_writes.insert(domain.to_string());
        self
    }

    /// 写入永远不返回
    pub fn hanging_write(mut self, domain: &str) -> Self {
        self.hanging_writes.insert(domain.to_string());
        self
    }

    pub fn unavailable() -> Self {
        Self {
            inner: MemorySink::default(),
            failing_writes: HashSet::new(),
            hanging_writes: HashSet::new(),
            unavailable: true,
        }
    }
}

#[async_trait]
impl ResultSink for FlakySink {
    async fn list_domains(&self) -> Result<Vec<String>, SinkError> {
        if self.unavailable {
            return Err(SinkError::unavailable("spreadsheet unreachable"));
        }
        self.inner.list_domains().await
    }

    async fn write_result(
        &self,
        domain: &str,
        metrics: &MetricPair,
        date: &str,
    ) -> Result<(), SinkError> {
        if self.hanging_writes.contains(domain) {
            std::future::pending::<()>().await;
        }
        if self.failing_writes.contains(domain) {
            return Err(SinkError::write_failed(domain, "quota exceeded"));
        }
        self.inner.write_result(domain, metrics, date).await
    }
}

pub fn settings(batch_size: usize, timeout_secs: u64) -> OrchestratorSettings {
    OrchestratorSettings {
        batch_size,
        domain_timeout: Duration::from_secs(timeout_secs),
        max_domains: None,
    }
}

pub fn service(
    probe: Arc<ScriptedProbe>,
    sink: Arc<dyn ResultSink>,
    settings: OrchestratorSettings,
) -> JobService {
    let jobs = Arc::new(JobManager::new(RetentionPolicy::default()));
    JobService::new(probe, sink, jobs, settings)
}
