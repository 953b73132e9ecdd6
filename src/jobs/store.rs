//! 任务状态存储
//!
//! 进程内唯一的共享可变状态。由应用创建并注入到编排器和请求处理中，
//! 生命周期与进程相同；`RetentionPolicy` 控制保留多少个任务。

use crate::error::JobError;
use crate::models::job::{JobId, JobSnapshot};
use crate::models::DomainResult;
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::time::Instant;
use tracing::debug;

/// 任务状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Running,
    Complete,
}

/// 任务保留策略
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// 最多保留的任务数；`None` 表示不淘汰
    pub max_jobs: Option<usize>,
}

/// 单个任务的进度记录
#[derive(Debug)]
struct JobRecord {
    started: Instant,
    total: usize,
    completed: usize,
    results: Vec<DomainResult>,
    recorded: HashSet<String>,
    state: JobState,
}

/// 追加结果后的进度
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppendProgress {
    pub completed: usize,
    pub total: usize,
}

/// 任务管理器
#[derive(Debug, Default)]
pub struct JobManager {
    jobs: DashMap<JobId, JobRecord>,
    retention: RetentionPolicy,
    last_id: AtomicI64,
}

impl JobManager {
    pub fn new(retention: RetentionPolicy) -> Self {
        Self {
            jobs: DashMap::new(),
            retention,
            last_id: AtomicI64::new(0),
        }
    }

    /// 生成新的任务ID：当前毫秒时间戳，与上一个冲突时顺延
    pub fn next_job_id(&self) -> JobId {
        let now = chrono::Utc::now().timestamp_millis();
        let mut last = self.last_id.load(Ordering::SeqCst);
        loop {
            let candidate = now.max(last + 1);
            match self
                .last_id
                .compare_exchange(last, candidate, Ordering::SeqCst, Ordering::SeqCst)
            {
                Ok(_) => return candidate.to_string(),
                Err(actual) => last = actual,
            }
        }
    }

    /// 创建任务
    pub fn create(&self, job_id: JobId, total: usize) -> Result<(), JobError> {
        self.evict();

        match self.jobs.entry(job_id.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(JobError::AlreadyExists { job_id }),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(JobRecord {
                    started: Instant::now(),
                    total,
                    completed: 0,
                    results: Vec::with_capacity(total),
                    recorded: HashSet::with_capacity(total),
                    state: JobState::Running,
                });
                debug!("创建任务 {}，共 {} 个域名", job_id, total);
                Ok(())
            }
        }
    }

    /// 追加一个域名结果，并把 completed 加一
    ///
    /// 在同一把分片锁内完成，并发调用不会丢失更新。
    /// 同一域名第二次追加、或任务已结束后的追加都会被拒绝。
    pub fn append(&self, job_id: &str, result: DomainResult) -> Result<AppendProgress, JobError> {
        let mut record = self.jobs.get_mut(job_id).ok_or_else(|| JobError::NotFound {
            job_id: job_id.to_string(),
        })?;

        if record.state != JobState::Running {
            return Err(JobError::Finished {
                job_id: job_id.to_string(),
            });
        }
        if !record.recorded.insert(result.domain.clone()) {
            return Err(JobError::DuplicateResult {
                job_id: job_id.to_string(),
                domain: result.domain,
            });
        }

        record.results.push(result);
        record.completed += 1;
        Ok(AppendProgress {
            completed: record.completed,
            total: record.total,
        })
    }

    /// 标记任务结束，之后不再修改
    pub fn finish(&self, job_id: &str) -> Result<Vec<DomainResult>, JobError> {
        let mut record = self.jobs.get_mut(job_id).ok_or_else(|| JobError::NotFound {
            job_id: job_id.to_string(),
        })?;
        record.state = JobState::Complete;
        Ok(record.results.clone())
    }

    /// 查询任务快照
    pub fn get(&self, job_id: &str) -> Result<JobSnapshot, JobError> {
        let record = self.jobs.get(job_id).ok_or_else(|| JobError::NotFound {
            job_id: job_id.to_string(),
        })?;

        Ok(JobSnapshot::new(
            record.completed,
            record.total,
            record.started.elapsed(),
            record.state == JobState::Complete,
            record.results.clone(),
        ))
    }

    /// 任务当前状态
    pub fn state(&self, job_id: &str) -> Option<JobState> {
        self.jobs.get(job_id).map(|r| r.state)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// 按保留策略淘汰最早开始的已结束任务，运行中的任务不淘汰
    fn evict(&self) {
        let Some(max_jobs) = self.retention.max_jobs else {
            return;
        };
        if self.jobs.len() < max_jobs {
            return;
        }

        let mut finished: Vec<(Instant, JobId)> = self
            .jobs
            .iter()
            .filter(|entry| entry.state == JobState::Complete)
            .map(|entry| (entry.started, entry.key().clone()))
            .collect();
        finished.sort();

        let excess = self.jobs.len() + 1 - max_jobs.max(1);
        for (_, job_id) in finished.into_iter().take(excess) {
            self.jobs.remove(&job_id);
            debug!("淘汰任务 {}", job_id);
        }
    }
}
