//! 任务事件
//!
//! 编排器按结算顺序发布事件，传输层（SSE、CLI 输出）负责序列化。
//! 每个流以恰好一个 `Complete` 或 `Error` 结束。

use crate::models::DomainResult;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

/// 任务生命周期事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum JobEvent {
    /// 开始时发送一次，列出本次要处理的域名
    Domains { domains: Vec<String> },
    /// 每个域名结算后发送一次
    Result {
        result: DomainResult,
        duration: String,
    },
    /// 全部结算后发送一次
    Complete {
        results: Vec<DomainResult>,
        duration: String,
    },
    /// 任务级失败（例如无法读取域名列表）
    Error { error: String },
}

impl JobEvent {
    /// 是否为流的最后一条消息
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobEvent::Complete { .. } | JobEvent::Error { .. })
    }
}

/// 事件发布端
///
/// 没有订阅者时发布是空操作，接收端提前断开也不影响任务本身。
#[derive(Debug, Clone, Default)]
pub struct EventPublisher {
    tx: Option<mpsc::UnboundedSender<JobEvent>>,
}

impl EventPublisher {
    /// 创建一对发布端和接收流
    pub fn channel() -> (Self, EventStream) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, EventStream { rx })
    }

    /// 不发布任何事件（纯轮询模式）
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn publish(&self, event: JobEvent) {
        if let Some(tx) = &self.tx {
            if tx.send(event).is_err() {
                debug!("事件接收端已关闭，丢弃事件");
            }
        }
    }
}

/// 事件接收流
#[derive(Debug)]
pub struct EventStream {
    rx: mpsc::UnboundedReceiver<JobEvent>,
}

impl EventStream {
    /// 下一条事件；终止事件之后或发布端全部释放后返回 `None`
    pub async fn next(&mut self) -> Option<JobEvent> {
        let event = self.rx.recv().await?;
        if event.is_terminal() {
            self.rx.close();
        }
        Some(event)
    }

    /// 读取到终止事件为止的全部事件
    pub async fn collect(mut self) -> Vec<JobEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.next().await {
            let terminal = event.is_terminal();
            events.push(event);
            if terminal {
                break;
            }
        }
        events
    }
}
