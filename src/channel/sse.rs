//! 服务器推送（text/event-stream）

use crate::jobs::{EventStream, JobEvent};
use std::io;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// 推送响应头
pub const SSE_HEADERS: [(&str, &str); 3] = [
    ("Content-Type", "text/event-stream"),
    ("Cache-Control", "no-cache"),
    ("Connection", "keep-alive"),
];

/// 编码一帧
pub fn encode_frame(event: &JobEvent) -> serde_json::Result<String> {
    Ok(format!("data: {}\n\n", serde_json::to_string(event)?))
}

/// 把事件流逐帧写出，写完终止事件后返回已发送的帧数
pub async fn pipe_events<W>(mut stream: EventStream, writer: &mut W) -> io::Result<usize>
where
    W: AsyncWrite + Unpin,
{
    let mut sent = 0;
    while let Some(event) = stream.next().await {
        let frame = encode_frame(&event).map_err(io::Error::other)?;
        writer.write_all(frame.as_bytes()).await?;
        writer.flush().await?;
        sent += 1;

        if event.is_terminal() {
            break;
        }
    }
    Ok(sent)
}
