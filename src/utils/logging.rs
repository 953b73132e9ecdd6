/// 日志工具模块
///
/// 提供日志初始化、格式化和运行报告的辅助函数
use anyhow::Result;
use std::fs::OpenOptions;
use std::io::Write;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// 初始化日志
///
/// `RUST_LOG` 优先；否则默认 info，详细模式为 debug。
/// 日志输出到 stderr，stdout 留给事件流和 JSON 输出。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
pub fn log_startup(probe_backend: &str, batch_size: usize, timeout_secs: u64) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 页面性能批量测试");
    info!("🔬 探测后端: {}", probe_backend);
    info!("📊 每批域名数: {} | 单域名超时: {}s", batch_size, timeout_secs);
    info!("{}", "=".repeat(60));
}

/// 记录域名加载信息
pub fn log_domains_loaded(total: usize, batch_size: usize) {
    info!("✓ 找到 {} 个待测试的域名", total);
    info!("📋 将以每批 {} 个的方式处理", batch_size);
    info!("💡 每批完成后再开始下一批");
}

/// 记录批次开始信息
pub fn log_batch_start(batch_num: usize, total_batches: usize, domains: &[String]) {
    info!("{}", "=".repeat(60));
    info!("📦 开始处理第 {}/{} 批", batch_num, total_batches);
    info!("📄 本批域名: {}", domains.join(", "));
    info!("{}", "=".repeat(60));
}

/// 记录批次完成信息
pub fn log_batch_complete(batch_num: usize, success: usize, total: usize) {
    info!("{}", "─".repeat(60));
    info!("✓ 第 {} 批完成: 成功 {}/{}", batch_num, success, total);
    info!("{}", "─".repeat(60));
}

/// 打印最终统计信息
pub fn print_final_stats(success: usize, failed: usize, total: usize, duration: &str) {
    info!("{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", success, total);
    info!("❌ 失败: {}", failed);
    info!("⏱️ 总用时: {}", duration);
    info!("{}", "=".repeat(60));
}

/// 追加一段运行报告到日志文件
///
/// # 参数
/// - `log_file_path`: 日志文件路径，为空时不写
/// - `lines`: 报告正文
pub fn append_run_report(log_file_path: &str, lines: &[String]) -> Result<()> {
    if log_file_path.is_empty() {
        return Ok(());
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path)?;

    let header = format!(
        "{}\n页面性能测试报告 - {}\n{}\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    file.write_all(header.as_bytes())?;
    for line in lines {
        writeln!(file, "{}", line)?;
    }
    writeln!(file)?;
    Ok(())
}
