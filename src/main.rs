//! Floating Notify CLI
//!
//! 回放 / 实时运行浮动通知管线，查看投递记录

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use floating_notify::cli::{
    format_output, handle_history, handle_replay, handle_watch, HistoryArgs, ReplayArgs, WatchArgs,
};
use floating_notify::PipelineConfig;

#[derive(Parser)]
#[command(name = "floatn")]
#[command(about = "Floating Notify - 浮动通知投递管线")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 按 JSONL 脚本回放管线事件
    Replay(ReplayArgs),
    /// 轮询快照文件并实时运行管线
    Watch(WatchArgs),
    /// 查看最近的投递记录
    History(HistoryArgs),
    /// 打印当前生效的配置
    Config,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 初始化 tracing 日志系统
    // 通过 RUST_LOG 环境变量控制日志级别，默认为 info
    // 例如: RUST_LOG=debug floatn watch -s snapshot.json -p prefs.json
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("floating_notify=info,floatn=info"));

    fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Replay(args) => handle_replay(args)?,
        Commands::Watch(args) => handle_watch(args).await?,
        Commands::History(args) => handle_history(args)?,
        Commands::Config => {
            let config = PipelineConfig::load()?;
            println!("# {}", PipelineConfig::path().display());
            println!("{}", format_output(&config, false));
        }
    }

    Ok(())
}
