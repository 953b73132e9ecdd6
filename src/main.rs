use anyhow::Result;
use clap::{Parser, Subcommand};
use pagespeed_monitor::{utils::logging, App, Config};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "pagespeed-monitor")]
#[command(about = "Batch PageSpeed testing with results written back to a spreadsheet")]
struct Cli {
    #[command(subcommand)]
    cmd: Option<Command>,

    /// Path to config TOML. Environment variables override file values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable debug logging (RUST_LOG takes precedence).
    #[arg(long, short)]
    verbose: bool,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Run one job and print every progress event as a JSON line
    Stream,
    /// Start one job and poll its status until complete
    Queue,
    /// Serve the HTTP endpoints
    Serve,
    /// List the domains in the spreadsheet
    Domains,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 加载配置
    let config = match &cli.config {
        Some(path) => Config::from_toml_file(path)?.with_env_overrides(),
        None => Config::from_env(),
    };

    // 初始化日志
    logging::init(cli.verbose || config.verbose_logging);

    // 初始化并运行应用
    let app = App::initialize(config).await?;
    match cli.cmd.unwrap_or(Command::Stream) {
        Command::Stream => app.stream().await,
        Command::Queue => app.queue().await,
        Command::Serve => app.serve().await,
        Command::Domains => app.domains().await,
    }
}
