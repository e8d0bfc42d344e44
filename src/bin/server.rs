//! FlowLab 服务器入口
//!
//! 启动 HTTP API 服务器

use clap::Parser;
use flowlab::algorithm::DEFAULT_MAX_STEPS;
use flowlab::server::{start_server, ServerConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "flowlab-server")]
#[command(about = "FlowLab HTTP API 服务器", version)]
struct Args {
    /// 监听地址
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// 监听端口
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// 请求未指定时的步数上限，请求中的值不得超过它
    #[arg(long, default_value_t = DEFAULT_MAX_STEPS)]
    max_steps: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    info!(
        version = flowlab::VERSION,
        max_steps = args.max_steps,
        "FlowLab 最大流可视化引擎"
    );

    let config = ServerConfig {
        host: args.host,
        port: args.port,
        max_steps: args.max_steps,
    };

    start_server(config).await?;

    Ok(())
}
