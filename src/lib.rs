//! # PageSpeed Monitor
//!
//! 批量测试一组域名的页面性能（mobile / desktop），结果写回表格，
//! 并通过推送或轮询两种方式汇报进度。
//!
//! ## 架构设计
//!
//! ### ① 基础设施层（Infrastructure / Clients）
//! - `clients/` - PageSpeed API、Sheets API 的 HTTP 客户端
//! - `infrastructure/` - `JsExecutor`，单个浏览器页面的持有者
//! - `browser/` - 连接或启动浏览器
//!
//! ### ② 业务能力层（Services）
//! - `services/probe` - 取一个 (域名, 设备模式) 的三项指标
//! - `services/sink` - 列出域名、写入一个域名的结果列
//!
//! ### ③ 任务状态层（Jobs）
//! - `jobs/store` - 任务进度记录，供轮询查询
//! - `jobs/events` - 编排器发布的类型化事件
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 分批并发，按结算顺序记录
//! - `orchestrator/domain_processor` - 单个域名：成对探测 + 写入
//! - `orchestrator/job_service` - 启动、推送、查询的入口
//!
//! ### ⑤ 传输层（Channel / Server）
//! - `channel/` - SSE 帧编码、轮询响应体
//! - `server` - 固定路由的 HTTP 入口

pub mod app;
pub mod browser;
pub mod channel;
pub mod clients;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod jobs;
pub mod models;
pub mod orchestrator;
pub mod server;
pub mod services;
pub mod utils;

// 重新导出常用类型
pub use app::App;
pub use config::Config;
pub use error::{AppError, AppResult};
pub use jobs::{EventPublisher, EventStream, JobEvent, JobManager};
pub use models::{DomainResult, JobSnapshot, JobStarted, MetricPair, MetricSet};
pub use orchestrator::{BatchOrchestrator, JobService, OrchestratorSettings};
