//! HTTP 入口
//!
//! 只处理少量固定的 GET 路由，每个连接处理一个请求后关闭：
//!
//! | 路由 | 说明 |
//! |------|------|
//! | `GET /api/pagespeed/queue` | 启动任务，立即返回 jobId |
//! | `GET /api/pagespeed/status/{id}` | 查询任务状态 |
//! | `GET /api/pagespeed-status/{id}` | 同上（旧路径） |
//! | `GET /api/pagespeed/stream` | 启动任务并推送事件 |
//! | `GET /api/pagespeed/domains` | 列出域名 |
//!
//! 请求行和请求头合计不超过 `MAX_HEAD_BYTES`，并且必须在 `HEAD_READ_TIMEOUT` 内读完。

use crate::channel::poll::{self, HttpReply};
use crate::channel::sse::{self, SSE_HEADERS};
use crate::orchestrator::JobService;
use serde_json::json;
use std::io;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

/// 请求行加请求头的最大字节数
pub const MAX_HEAD_BYTES: u64 = 8 * 1024;

/// 读完请求头的最长时间
pub const HEAD_READ_TIMEOUT: Duration = Duration::from_secs(10);

/// 读取请求头的结果
#[derive(Debug, PartialEq, Eq)]
enum Head {
    /// 完整的请求头，只保留请求行
    Request(String),
    /// 对端没发任何数据就关闭了
    Closed,
    TooLarge,
    TimedOut,
}

/// 请求路由
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Queue,
    Status(String),
    Stream,
    Domains,
    NotFound,
    MethodNotAllowed,
}

impl Route {
    /// 解析请求行，例如 `GET /api/pagespeed/stream HTTP/1.1`
    pub fn parse(request_line: &str) -> Route {
        let mut parts = request_line.split_whitespace();
        let (Some(method), Some(target)) = (parts.next(), parts.next()) else {
            return Route::NotFound;
        };

        // 忽略查询参数和结尾斜杠
        let path = target.split('?').next().unwrap_or_default();
        let path = path.trim_end_matches('/');

        let route = match path {
            "/api/pagespeed/queue" => Route::Queue,
            "/api/pagespeed/stream" => Route::Stream,
            "/api/pagespeed/domains" => Route::Domains,
            _ => match path
                .strip_prefix("/api/pagespeed/status/")
                .or_else(|| path.strip_prefix("/api/pagespeed-status/"))
            {
                Some(id) if !id.is_empty() && !id.contains('/') => Route::Status(id.to_string()),
                _ => Route::NotFound,
            },
        };

        if route != Route::NotFound && method != "GET" {
            return Route::MethodNotAllowed;
        }
        route
    }
}

/// 绑定地址并开始服务
pub async fn serve(service: JobService, addr: &str) -> io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    serve_listener(service, listener).await
}

/// 在已绑定的监听器上服务，直到监听器出错
pub async fn serve_listener(service: JobService, listener: TcpListener) -> io::Result<()> {
    info!("🌐 HTTP 服务已启动: http://{}", listener.local_addr()?);

    loop {
        let (socket, peer) = listener.accept().await?;
        let service = service.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(service, socket).await {
                debug!("连接 {} 处理中断: {}", peer, e);
            }
        });
    }
}

async fn handle_connection(service: JobService, socket: TcpStream) -> io::Result<()> {
    let (reader, mut writer) = socket.into_split();

    let request_line = match read_request_head(reader).await? {
        Head::Request(line) => line,
        Head::Closed => return Ok(()),
        Head::TooLarge => {
            warn!("请求头超过 {} 字节，拒绝", MAX_HEAD_BYTES);
            let reply = HttpReply {
                status: 431,
                body: json!({ "success": false, "error": "Request header fields too large" }),
            };
            write_reply(&mut writer, &reply).await?;
            return writer.shutdown().await;
        }
        Head::TimedOut => {
            debug!("{:?} 内未读完请求头", HEAD_READ_TIMEOUT);
            let reply = HttpReply {
                status: 408,
                body: json!({ "success": false, "error": "Request timeout" }),
            };
            write_reply(&mut writer, &reply).await?;
            return writer.shutdown().await;
        }
    };

    let route = Route::parse(&request_line);
    debug!("{} -> {:?}", request_line.trim(), route);

    match route {
        Route::Stream => {
            write_sse_head(&mut writer).await?;
            let sent = sse::pipe_events(service.stream_job(), &mut writer).await?;
            debug!("推送结束，共 {} 帧", sent);
        }
        Route::Queue => write_reply(&mut writer, &poll::start_reply(&service).await).await?,
        Route::Status(job_id) => write_reply(&mut writer, &poll::status_reply(&service, &job_id)).await?,
        Route::Domains => write_reply(&mut writer, &poll::domains_reply(&service).await).await?,
        Route::NotFound => {
            warn!("未知路径: {}", request_line.trim());
            let reply = HttpReply {
                status: 404,
                body: json!({ "success": false, "error": "Not found" }),
            };
            write_reply(&mut writer, &reply).await?;
        }
        Route::MethodNotAllowed => {
            let reply = HttpReply {
                status: 405,
                body: json!({ "success": false, "error": "Method not allowed" }),
            };
            write_reply(&mut writer, &reply).await?;
        }
    }

    writer.shutdown().await
}

/// 在大小和时间限制内读取请求头
async fn read_request_head<R: AsyncRead + Unpin>(reader: R) -> io::Result<Head> {
    match tokio::time::timeout(HEAD_READ_TIMEOUT, read_head(reader)).await {
        Ok(head) => head,
        Err(_) => Ok(Head::TimedOut),
    }
}

async fn read_head<R: AsyncRead + Unpin>(reader: R) -> io::Result<Head> {
    let mut reader = BufReader::new(reader.take(MAX_HEAD_BYTES));

    let mut request_line = String::new();
    if reader.read_line(&mut request_line).await? == 0 {
        return Ok(Head::Closed);
    }
    if !request_line.ends_with('\n') && reader.get_ref().limit() == 0 {
        return Ok(Head::TooLarge);
    }

    // 请求头不参与路由，读完丢弃
    loop {
        let mut line = String::new();
        let n = reader.read_line(&mut line).await?;
        if n == 0 {
            // 读到上限还没遇到空行
            if reader.get_ref().limit() == 0 {
                return Ok(Head::TooLarge);
            }
            break;
        }
        if line.trim().is_empty() {
            break;
        }
        if !line.ends_with('\n') && reader.get_ref().limit() == 0 {
            return Ok(Head::TooLarge);
        }
    }

    Ok(Head::Request(request_line))
}

async fn write_sse_head<W: AsyncWrite + Unpin>(writer: &mut W) -> io::Result<()> {
    let mut head = String::from("HTTP/1.1 200 OK\r\n");
    for (name, value) in SSE_HEADERS {
        head.push_str(&format!("{}: {}\r\n", name, value));
    }
    head.push_str("\r\n");
    writer.write_all(head.as_bytes()).await?;
    writer.flush().await
}

async fn write_reply<W: AsyncWrite + Unpin>(writer: &mut W, reply: &HttpReply) -> io::Result<()> {
    let body = reply.body.to_string();
    let head = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        reply.status,
        reason_phrase(reply.status),
        body.len()
    );
    writer.write_all(head.as_bytes()).await?;
    writer.write_all(body.as_bytes()).await?;
    writer.flush().await
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        404 => "Not Found",
        405 => "Method Not Allowed",
        408 => "Request Timeout",
        431 => "Request Header Fields Too Large",
        _ => "Internal Server Error",
    }
}
