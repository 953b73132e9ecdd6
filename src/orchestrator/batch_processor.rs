//! 批量域名处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块负责一次任务内所有域名的调度。
//!
//! ## 核心功能
//!
//! 1. **分批处理**：按 `batch_size` 切分域名，批内并发，批间严格串行
//! 2. **并发控制**：同一时刻最多 `batch_size` 对探测在进行
//! 3. **结果记录**：按结算顺序追加到任务记录并发布事件（单写者）
//! 4. **失败隔离**：单个域名失败或任务 panic 只影响该域名
//! 5. **全局统计**：任务结束时汇总成功/失败数量
//!
//! ## 设计特点
//!
//! - **向下委托**：单个域名的探测与写入交给 `domain_processor`
//! - **最终收敛**：每个域名都以成功或失败结束，不会停留在进行中

use crate::error::AppError;
use crate::jobs::{EventPublisher, JobEvent, JobManager};
use crate::models::job::format_duration;
use crate::models::DomainResult;
use crate::orchestrator::domain_processor;
use crate::services::sink::today;
use crate::services::{MetricProbe, ResultSink};
use crate::utils::logging::{log_batch_complete, log_batch_start, log_domains_loaded};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{error, info, warn};

/// 编排参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorSettings {
    /// 每批域名数
    pub batch_size: usize,
    /// 单个域名一对探测的超时时间
    pub domain_timeout: Duration,
    /// 每个任务最多处理的域名数
    pub max_domains: Option<usize>,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            batch_size: 3,
            domain_timeout: Duration::from_secs(30),
            max_domains: None,
        }
    }
}

impl From<&crate::config::Config> for OrchestratorSettings {
    fn from(config: &crate::config::Config) -> Self {
        Self {
            batch_size: config.batch_size.max(1),
            domain_timeout: config.domain_timeout(),
            max_domains: config.max_domains,
        }
    }
}

/// 任务汇总
#[derive(Debug, Clone, PartialEq)]
pub struct JobSummary {
    pub job_id: String,
    pub total: usize,
    pub success: usize,
    pub failed: usize,
    pub duration: String,
    pub results: Vec<DomainResult>,
}

/// 批次处理结果
#[derive(Debug, Default)]
struct BatchResult {
    success: usize,
    failed: usize,
}

/// 批量编排器
pub struct BatchOrchestrator {
    probe: Arc<dyn MetricProbe>,
    sink: Arc<dyn ResultSink>,
    jobs: Arc<JobManager>,
    settings: OrchestratorSettings,
}

impl BatchOrchestrator {
    pub fn new(
        probe: Arc<dyn MetricProbe>,
        sink: Arc<dyn ResultSink>,
        jobs: Arc<JobManager>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            probe,
            sink,
            jobs,
            settings,
        }
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    /// 运行一个已创建的任务，直到所有域名结算
    ///
    /// # 参数
    /// - `job_id`: 已在 `JobManager` 中创建的任务
    /// - `domains`: 按处理顺序排列、互不重复的域名
    /// - `events`: 事件发布端
    pub async fn run(
        &self,
        job_id: &str,
        domains: Vec<String>,
        events: &EventPublisher,
    ) -> JobSummary {
        let started = Instant::now();
        let date = today();
        let batch_size = self.settings.batch_size.max(1);
        let total = domains.len();

        log_domains_loaded(total, batch_size);
        events.publish(JobEvent::Domains {
            domains: domains.clone(),
        });

        let total_batches = total.div_ceil(batch_size);
        let mut success = 0;
        let mut failed = 0;

        for (batch_index, batch) in domains.chunks(batch_size).enumerate() {
            let batch_num = batch_index + 1;
            log_batch_start(batch_num, total_batches, batch);

            let batch_result = self.process_batch(job_id, batch, &date, started, events).await;
            success += batch_result.success;
            failed += batch_result.failed;

            log_batch_complete(batch_num, batch_result.success, batch.len());
        }

        let results = match self.jobs.finish(job_id) {
            Ok(results) => results,
            Err(e) => {
                error!("任务 {} 无法结束: {}", job_id, e);
                Vec::new()
            }
        };
        let duration = format_duration(started.elapsed());

        events.publish(JobEvent::Complete {
            results: results.clone(),
            duration: duration.clone(),
        });
        info!("🏁 任务 {} 完成: 成功 {} | 失败 {} | 用时 {}", job_id, success, failed, duration);

        JobSummary {
            job_id: job_id.to_string(),
            total,
            success,
            failed,
            duration,
            results,
        }
    }

    /// 处理单个批次：批内并发，全部结算后返回
    async fn process_batch(
        &self,
        job_id: &str,
        batch: &[String],
        date: &str,
        started: Instant,
        events: &EventPublisher,
    ) -> BatchResult {
        let mut tasks = JoinSet::new();
        let mut domains_by_task = HashMap::new();

        for domain in batch {
            let handle = tasks.spawn(domain_processor::process_domain(
                self.probe.clone(),
                self.sink.clone(),
                domain.clone(),
                date.to_string(),
                self.settings.domain_timeout,
            ));
            domains_by_task.insert(handle.id(), domain.clone());
        }

        let mut result = BatchResult::default();

        // 按结算顺序逐个记录
        while let Some(joined) = tasks.join_next_with_id().await {
            let domain_result = match joined {
                Ok((_, domain_result)) => domain_result,
                Err(e) => {
                    let domain = domains_by_task.get(&e.id()).cloned().unwrap_or_default();
                    error!("[域名 {}] 任务执行失败: {}", domain, e);
                    DomainResult::error(domain, AppError::TaskAborted(e.to_string()).to_string())
                }
            };

            if domain_result.is_success() {
                result.success += 1;
            } else {
                result.failed += 1;
            }
            self.record(job_id, domain_result, started, events);
        }

        result
    }

    /// 追加结果并发布事件
    fn record(
        &self,
        job_id: &str,
        domain_result: DomainResult,
        started: Instant,
        events: &EventPublisher,
    ) {
        match self.jobs.append(job_id, domain_result.clone()) {
            Ok(progress) => {
                info!(
                    "📈 进度 {}/{} ({})",
                    progress.completed, progress.total, domain_result.domain
                );
                events.publish(JobEvent::Result {
                    result: domain_result,
                    duration: format_duration(started.elapsed()),
                });
            }
            Err(e) => {
                warn!("[域名 {}] 结果未记录: {}", domain_result.domain, e);
            }
        }
    }
}
