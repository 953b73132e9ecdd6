//! 任务状态层
//!
//! - `store` - 任务ID → 进度记录，供轮询查询
//! - `events` - 编排器发布的类型化事件，供推送通道消费

pub mod events;
pub mod store;

pub use events::{EventPublisher, EventStream, JobEvent};
pub use store::{JobManager, JobState, RetentionPolicy};
