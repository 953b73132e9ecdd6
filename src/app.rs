use crate::browser;
use crate::clients::{PageSpeedClient, SheetsClient};
use crate::config::{Config, ProbeBackend, SinkBackend};
use crate::jobs::{JobEvent, JobManager, RetentionPolicy};
use crate::models::{DomainOutcome, DomainResult};
use crate::orchestrator::{JobService, OrchestratorSettings};
use crate::server;
use crate::services::{BrowserProbe, MemorySink, MetricProbe, PageSpeedProbe, ResultSink, SheetsSink};
use crate::utils::logging::{append_run_report, log_startup, print_final_stats};
use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use std::sync::Arc;
use tokio::io::{AsyncWriteExt, Stdout};
use tracing::{info, warn};

/// 应用主结构
pub struct App {
    config: Config,
    service: JobService,
}

impl App {
    /// 初始化应用：按配置组装探测、表格和任务存储
    pub async fn initialize(config: Config) -> Result<Self> {
        config.validate()?;

        let probe: Arc<dyn MetricProbe> = match config.probe_backend {
            ProbeBackend::Pagespeed => {
                if config.pagespeed_api_key.is_none() {
                    warn!("⚠️ 未设置 PAGESPEED_API_KEY，将使用匿名配额");
                }
                let client = PageSpeedClient::new(&config).context("无法创建 PageSpeed 客户端")?;
                Arc::new(PageSpeedProbe::new(client))
            }
            ProbeBackend::Browser => {
                let browser = browser::acquire_browser(&config).await?;
                Arc::new(BrowserProbe::new(browser))
            }
        };

        let sink: Arc<dyn ResultSink> = match config.sink_backend {
            SinkBackend::Sheets => {
                let client = SheetsClient::new(&config).context("无法创建 Sheets 客户端")?;
                Arc::new(SheetsSink::new(client))
            }
            SinkBackend::Memory => Arc::new(MemorySink::new(config.memory_domains.clone())),
        };

        let jobs = Arc::new(JobManager::new(RetentionPolicy {
            max_jobs: config.max_retained_jobs,
        }));

        log_startup(probe.name(), config.batch_size, config.domain_timeout_secs);

        let service = JobService::new(probe, sink, jobs, OrchestratorSettings::from(&config));
        Ok(Self { config, service })
    }

    pub fn service(&self) -> &JobService {
        &self.service
    }

    /// 推送模式：每个事件输出一行 JSON，直到任务结束
    pub async fn stream(&self) -> Result<()> {
        let mut stdout = tokio::io::stdout();
        let mut events = self.service.stream_job();

        while let Some(event) = events.next().await {
            write_json_line(&mut stdout, &event).await?;

            match event {
                JobEvent::Complete { results, duration } => {
                    self.finish_run(&results, &duration);
                    return Ok(());
                }
                JobEvent::Error { error } => return Err(anyhow!(error)),
                _ => {}
            }
        }

        Err(anyhow!("事件流意外结束"))
    }

    /// 轮询模式：启动任务，按间隔查询状态直到完成
    pub async fn queue(&self) -> Result<()> {
        let mut stdout = tokio::io::stdout();
        let started = self.service.start_job().await?;
        write_json_line(&mut stdout, &started).await?;

        let job_id = started.job_id;
        loop {
            tokio::time::sleep(self.config.poll_interval()).await;

            let snapshot = self.service.status(&job_id)?;
            info!(
                "⏳ 任务 {} 进度 {} ({}%)",
                job_id, snapshot.progress, snapshot.percent_complete
            );

            if snapshot.complete {
                write_json_line(&mut stdout, &snapshot).await?;
                self.finish_run(&snapshot.results, &snapshot.duration);
                return Ok(());
            }
        }
    }

    /// HTTP 服务模式
    pub async fn serve(&self) -> Result<()> {
        server::serve(self.service.clone(), &self.config.server_addr)
            .await
            .with_context(|| format!("HTTP 服务失败: {}", self.config.server_addr))
    }

    /// 列出域名
    pub async fn domains(&self) -> Result<()> {
        let domains = self.service.list_domains().await?;
        info!("✓ 共 {} 个域名", domains.len());

        let mut stdout = tokio::io::stdout();
        for domain in &domains {
            stdout.write_all(format!("{}\n", domain).as_bytes()).await?;
        }
        stdout.flush().await?;
        Ok(())
    }

    /// 输出统计并写运行报告
    fn finish_run(&self, results: &[DomainResult], duration: &str) {
        let success = results.iter().filter(|r| r.is_success()).count();
        let failed = results.len() - success;
        print_final_stats(success, failed, results.len(), duration);

        let lines = report_lines(results, duration);
        if let Err(e) = append_run_report(&self.config.output_log_file, &lines) {
            warn!("运行报告写入失败: {}", e);
        } else if !self.config.output_log_file.is_empty() {
            info!("日志已保存至: {}", self.config.output_log_file);
        }
    }
}

async fn write_json_line<T: Serialize>(stdout: &mut Stdout, value: &T) -> Result<()> {
    let line = serde_json::to_string(value)?;
    stdout.write_all(line.as_bytes()).await?;
    stdout.write_all(b"\n").await?;
    stdout.flush().await?;
    Ok(())
}

/// 运行报告正文：每个域名一行
pub fn report_lines(results: &[DomainResult], duration: &str) -> Vec<String> {
    let mut lines: Vec<String> = results
        .iter()
        .map(|r| match &r.outcome {
            DomainOutcome::Success { mobile, desktop } => format!(
                "✅ {} | mobile {} / {:.1}s / {:.1}s | desktop {} / {:.1}s / {:.1}s",
                r.domain,
                mobile.performance,
                mobile.first_contentful_paint,
                mobile.speed_index,
                desktop.performance,
                desktop.first_contentful_paint,
                desktop.speed_index,
            ),
            DomainOutcome::Error { error } => format!("❌ {} | {}", r.domain, error),
        })
        .collect();
    lines.push(format!("总用时: {}", duration));
    lines
}
