//! 任务服务 - 对外接口
//!
//! 启动任务、推送任务、查询状态、列出域名。请求处理和 CLI 只依赖这一层。

use crate::error::{AppResult, SinkError};
use crate::jobs::{EventPublisher, EventStream, JobEvent, JobManager};
use crate::models::{JobSnapshot, JobStarted};
use crate::orchestrator::batch_processor::{BatchOrchestrator, JobSummary, OrchestratorSettings};
use crate::services::{MetricProbe, ResultSink};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// 任务服务
#[derive(Clone)]
pub struct JobService {
    jobs: Arc<JobManager>,
    sink: Arc<dyn ResultSink>,
    orchestrator: Arc<BatchOrchestrator>,
}

impl JobService {
    pub fn new(
        probe: Arc<dyn MetricProbe>,
        sink: Arc<dyn ResultSink>,
        jobs: Arc<JobManager>,
        settings: OrchestratorSettings,
    ) -> Self {
        let orchestrator = Arc::new(BatchOrchestrator::new(probe, sink.clone(), jobs.clone(), settings));
        Self {
            jobs,
            sink,
            orchestrator,
        }
    }

    pub fn jobs(&self) -> &Arc<JobManager> {
        &self.jobs
    }

    /// 列出表格中的所有域名
    pub async fn list_domains(&self) -> AppResult<Vec<String>> {
        Ok(self.sink.list_domains().await?)
    }

    /// 启动任务并立即返回（轮询模式）
    ///
    /// 读取域名列表失败时不会创建任务。
    pub async fn start_job(&self) -> AppResult<JobStarted> {
        let (job_id, domains) = self.prepare_job().await?;
        let started = JobStarted::new(job_id.clone(), domains.len());

        let orchestrator = self.orchestrator.clone();
        tokio::spawn(async move {
            orchestrator
                .run(&job_id, domains, &EventPublisher::disabled())
                .await;
        });

        Ok(started)
    }

    /// 启动任务并返回事件流（推送模式）
    ///
    /// 读取域名列表失败时，流中只有一条 `error` 事件。
    pub fn stream_job(&self) -> EventStream {
        let (publisher, stream) = EventPublisher::channel();
        let service = self.clone();
        tokio::spawn(async move {
            if let Err(e) = service.run_job(&publisher).await {
                publisher.publish(JobEvent::Error {
                    error: e.to_string(),
                });
            }
        });
        stream
    }

    /// 在当前任务中运行一个完整任务，返回汇总
    pub async fn run_job(&self, events: &EventPublisher) -> AppResult<JobSummary> {
        let (job_id, domains) = self.prepare_job().await?;
        Ok(self.orchestrator.run(&job_id, domains, events).await)
    }

    /// 查询任务状态
    pub fn status(&self, job_id: &str) -> AppResult<JobSnapshot> {
        self.jobs.get(job_id).map_err(|e| {
            debug!("查询不存在的任务: {}", job_id);
            e.into()
        })
    }

    /// 读取域名、去重、截断，然后创建任务
    async fn prepare_job(&self) -> AppResult<(String, Vec<String>)> {
        info!("📁 正在读取域名列表...");
        let listed = self.sink.list_domains().await.map_err(|e| {
            error!("无法读取域名列表: {}", e);
            match e {
                SinkError::SourceUnavailable { .. } => e,
                other => SinkError::unavailable(other),
            }
        })?;

        let domains = select_domains(listed, self.orchestrator.settings().max_domains);
        let job_id = self.jobs.next_job_id();
        self.jobs.create(job_id.clone(), domains.len())?;
        info!("🆔 任务 {} 已创建，共 {} 个域名", job_id, domains.len());

        Ok((job_id, domains))
    }
}

/// 去掉重复域名（保留首次出现的位置），再按上限截断
pub fn select_domains(listed: Vec<String>, max_domains: Option<usize>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut domains: Vec<String> = Vec::with_capacity(listed.len());
    for domain in listed {
        let domain = domain.trim().to_string();
        if domain.is_empty() {
            continue;
        }
        if seen.insert(domain.clone()) {
            domains.push(domain);
        } else {
            warn!("忽略重复域名: {}", domain);
        }
    }

    if let Some(max) = max_domains {
        if domains.len() > max {
            info!("✂️ 域名数量 {} 超过上限，只处理前 {} 个", domains.len(), max);
            domains.truncate(max);
        }
    }
    domains
}
