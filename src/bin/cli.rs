//! FlowLab CLI 工具
//!
//! 对图文件运行最大流算法、对比算法、查看最小割和回放任意步骤

use anyhow::{bail, Context};
use clap::{Args as ClapArgs, Parser, Subcommand};
use flowlab::algorithm::{AlgorithmId, RunOptions, DEFAULT_MAX_STEPS};
use flowlab::cli::{commands, OutputFormat, Printer};
use flowlab::graph::Graph;
use flowlab::playback::DEFAULT_SNAPSHOT_INTERVAL;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "flowlab-cli")]
#[command(about = "FlowLab 最大流 / 最小割命令行工具", version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

/// 输入文件参数
#[derive(ClapArgs, Debug)]
struct InputArgs {
    /// 图文件（.json 或 .csv）
    #[arg(short, long)]
    input: PathBuf,

    /// CSV 输入的源点
    #[arg(long)]
    source: Option<String>,

    /// CSV 输入的汇点
    #[arg(long)]
    sink: Option<String>,
}

/// 运行参数
#[derive(ClapArgs, Debug)]
struct RunArgs {
    /// 算法：edmonds-karp | dinic | push-relabel
    #[arg(short, long, default_value = "edmonds-karp")]
    algorithm: AlgorithmId,

    /// 步数上限
    #[arg(long, default_value_t = DEFAULT_MAX_STEPS)]
    max_steps: u64,

    /// 输出格式
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 运行单个算法
    Run {
        #[command(flatten)]
        input: InputArgs,
        #[command(flatten)]
        run: RunArgs,
    },
    /// 在同一张图上对比三种算法
    Compare {
        #[command(flatten)]
        input: InputArgs,
        /// 步数上限
        #[arg(long, default_value_t = DEFAULT_MAX_STEPS)]
        max_steps: u64,
        /// 输出格式
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// 运行后输出最小割
    Mincut {
        #[command(flatten)]
        input: InputArgs,
        #[command(flatten)]
        run: RunArgs,
    },
    /// 运行后回放到指定步骤
    Replay {
        #[command(flatten)]
        input: InputArgs,
        #[command(flatten)]
        run: RunArgs,
        /// 游标（事件下标，-1 为初始状态；缺省为最后一步）
        #[arg(short, long, allow_negative_numbers = true)]
        cursor: Option<i64>,
        /// 快照间隔
        #[arg(long, default_value_t = DEFAULT_SNAPSHOT_INTERVAL)]
        interval: usize,
    },
    /// 校验图文件
    Validate {
        #[command(flatten)]
        input: InputArgs,
        /// 输出格式
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// 规范化后导出为 JSON
    Export {
        #[command(flatten)]
        input: InputArgs,
        /// 输出文件，缺省写到标准输出
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn load(input: &InputArgs) -> anyhow::Result<Graph> {
    let imported =
        commands::load_input(&input.input, input.source.as_deref(), input.sink.as_deref())
            .with_context(|| format!("无法加载 {}", input.input.display()))?;
    eprint!("{}", Printer::new().warnings(&imported.warnings));
    Ok(imported.graph)
}

fn options(max_steps: u64) -> RunOptions {
    RunOptions::new().with_max_steps(max_steps)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let output = match &args.command {
        Command::Run { input, run } => {
            let graph = load(input)?;
            commands::run(&graph, run.algorithm, &options(run.max_steps), run.format)?
        }
        Command::Compare {
            input,
            max_steps,
            format,
        } => {
            let graph = load(input)?;
            commands::compare(&graph, &options(*max_steps), *format)?
        }
        Command::Mincut { input, run } => {
            let graph = load(input)?;
            commands::min_cut(&graph, run.algorithm, &options(run.max_steps), run.format)?
        }
        Command::Replay {
            input,
            run,
            cursor,
            interval,
        } => {
            let graph = load(input)?;
            commands::replay(
                &graph,
                run.algorithm,
                &options(run.max_steps),
                *cursor,
                *interval,
                run.format,
            )?
        }
        Command::Validate { input, format } => {
            let graph = load(input)?;
            let (valid, output) = commands::validate(&graph, *format)?;
            print!("{}", output);
            if !valid {
                bail!("图校验未通过");
            }
            return Ok(());
        }
        Command::Export { input, output } => {
            let graph = load(input)?;
            let json = commands::export(&graph)?;
            match output {
                Some(path) => {
                    std::fs::write(path, json)
                        .with_context(|| format!("无法写入 {}", path.display()))?;
                    return Ok(());
                }
                None => json,
            }
        }
    };

    print!("{}", output);
    Ok(())
}
