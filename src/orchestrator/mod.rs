//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责批量处理和流程调度，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `job_service` - 任务服务
//! - 读取域名列表、去重、按上限截断
//! - 创建任务，启动后台编排
//! - 提供启动、推送、查询三种入口
//!
//! ### `batch_processor` - 批量域名处理器
//! - 按批次切分域名（批内并发，批间串行）
//! - 按结算顺序记录结果、发布事件
//! - 输出批次和全局统计信息
//!
//! ### `domain_processor` - 单个域名处理器
//! - mobile / desktop 成对探测，共用截止时间，超时后等待探测收尾
//! - 写入表格，写入有独立的截止时间
//! - 把所有失败转换为该域名的 Error 结果
//!
//! ## 层次关系
//!
//! ```text
//! job_service (读取域名，创建任务)
//!     ↓
//! batch_processor (处理 Vec<Domain>)
//!     ↓
//! domain_processor (处理单个 Domain)
//!     ↓
//! services (能力层：probe / sink)
//!     ↓
//! clients / infrastructure (HTTP API、浏览器页面)
//! ```

pub mod batch_processor;
pub mod domain_processor;
pub mod job_service;

// 重新导出主要类型
pub use batch_processor::{BatchOrchestrator, JobSummary, OrchestratorSettings};
pub use domain_processor::{probe_pair, process_domain};
pub use job_service::JobService;
