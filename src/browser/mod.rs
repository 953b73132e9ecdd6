//! 浏览器资源管理
//!
//! 两种获取方式：连接已运行的调试端口，或启动无头浏览器

pub mod connection;
pub mod headless;

pub use connection::connect_to_browser;
pub use headless::launch_headless_browser;

use crate::config::Config;
use crate::error::BrowserError;
use chromiumoxide::Browser;

/// 按配置获取浏览器：设置了调试端口就连接，否则启动
pub async fn acquire_browser(config: &Config) -> Result<Browser, BrowserError> {
    match config.browser_debug_port {
        Some(port) => connect_to_browser(port).await,
        None => launch_headless_browser(config.chrome_executable.as_deref()).await,
    }
}
