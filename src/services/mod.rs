//! 业务能力层（Services）
//!
//! 描述"我能做什么"，每个能力只处理单个域名：
//! - `probe` - 取一个 (域名, 设备模式) 的三项指标
//! - `sink` - 列出域名、写入一个域名的结果
//! - `scoring` - 本地浏览器分析用的 Lighthouse 评分曲线

pub mod probe;
pub mod scoring;
pub mod sink;

pub use probe::{BrowserProbe, MetricProbe, PageSpeedProbe};
pub use sink::{MemorySink, ResultSink, SheetsSink};
