//! 传输层
//!
//! 把任务状态交给客户端的两种方式：
//! - `sse` - 推送：每个事件一帧 `data: {json}\n\n`
//! - `poll` - 拉取：按需返回状态快照

pub mod poll;
pub mod sse;

pub use poll::HttpReply;
pub use sse::{encode_frame, pipe_events};
