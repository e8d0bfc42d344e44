//! 命令实现
//!
//! 每个子命令接收已加载的图，返回要写到标准输出的文本。

use super::printer::{OutputFormat, Printer};
use crate::algorithm::{compare_algorithms, run_max_flow, AlgorithmId, RunOptions};
use crate::error::{Error, Result};
use crate::graph::Graph;
use crate::import::{export_graph_json, import_edges_csv, load_graph, ImportResult};
use crate::metrics::AlgorithmSummary;
use crate::playback::{Playback, PlaybackState};
use serde::Serialize;
use std::path::Path;
use tracing::debug;

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value)
        .map(|json| json + "\n")
        .map_err(|e| Error::SerializationError(e.to_string()))
}

/// 加载输入文件；CSV 可指定源点和汇点
pub fn load_input(path: &Path, source: Option<&str>, sink: Option<&str>) -> Result<ImportResult> {
    let is_csv = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("csv"))
        .unwrap_or(false);

    match (is_csv, source, sink) {
        (true, Some(source), Some(sink)) => import_edges_csv(path, source, sink),
        (true, Some(_), None) | (true, None, Some(_)) => Err(Error::ImportError(
            "--source 与 --sink 需要同时指定".to_string(),
        )),
        _ => load_graph(path),
    }
}

/// 运行单个算法
pub fn run(
    graph: &Graph,
    algorithm: AlgorithmId,
    options: &RunOptions,
    format: OutputFormat,
) -> Result<String> {
    let result = run_max_flow(algorithm, graph, options);
    debug!(algorithm = %algorithm, events = result.events.len(), "run 命令完成");

    let printer = Printer::new();
    match format {
        OutputFormat::Json => to_json(&result),
        OutputFormat::Log => Ok(printer.event_log(&result.events)),
        OutputFormat::Table => Ok(format!(
            "{}{}",
            printer.run_summary(&result),
            printer.edge_flows(&result.graph)
        )),
    }
}

/// 对比三种算法
pub fn compare(graph: &Graph, options: &RunOptions, format: OutputFormat) -> Result<String> {
    let results = compare_algorithms(graph, options);
    let summaries: Vec<AlgorithmSummary> = results.iter().map(AlgorithmSummary::from).collect();

    let printer = Printer::new();
    match format {
        OutputFormat::Json => to_json(&summaries),
        OutputFormat::Log => Ok(results
            .iter()
            .map(|result| {
                format!(
                    "== {} ==\n{}",
                    result.algorithm.label(),
                    printer.event_log(&result.events)
                )
            })
            .collect()),
        OutputFormat::Table => Ok(printer.comparison(&summaries)),
    }
}

/// 运行后输出最小割
pub fn min_cut(
    graph: &Graph,
    algorithm: AlgorithmId,
    options: &RunOptions,
    format: OutputFormat,
) -> Result<String> {
    let result = run_max_flow(algorithm, graph, options);
    let cut = match (&result.min_cut, result.error()) {
        (Some(cut), _) => cut,
        (None, Some(message)) => return Err(Error::InvalidGraph(message.to_string())),
        (None, None) => return Err(Error::InvalidGraph("未得到最小割".to_string())),
    };

    let printer = Printer::new();
    match format {
        OutputFormat::Json => to_json(cut),
        OutputFormat::Log | OutputFormat::Table => Ok(printer.min_cut(cut)),
    }
}

/// 运行后回放到指定游标
pub fn replay(
    graph: &Graph,
    algorithm: AlgorithmId,
    options: &RunOptions,
    cursor: Option<i64>,
    interval: usize,
    format: OutputFormat,
) -> Result<String> {
    let result = run_max_flow(algorithm, graph, options);
    let playback = Playback::new(result.events, &PlaybackState::from_graph(graph), interval);
    let state = match cursor {
        Some(cursor) => playback.state_at(cursor),
        None => playback.final_state(),
    };
    debug!(
        cursor = state.cursor,
        snapshots = playback.cache().snapshot_count(),
        "回放查询完成"
    );

    let printer = Printer::new();
    match format {
        OutputFormat::Json => to_json(&state),
        OutputFormat::Log => {
            let end = (state.cursor + 1).max(0) as usize;
            Ok(printer.event_log(&playback.events()[..end]))
        }
        OutputFormat::Table => Ok(printer.playback_state(&state, playback.len())),
    }
}

/// 校验结果与输出文本
pub fn validate(graph: &Graph, format: OutputFormat) -> Result<(bool, String)> {
    let errors = graph.validation_errors();
    let output = match format {
        OutputFormat::Json => to_json(&serde_json::json!({
            "valid": errors.is_empty(),
            "errors": errors,
        }))?,
        OutputFormat::Log | OutputFormat::Table => Printer::new().validation(&errors),
    };
    Ok((errors.is_empty(), output))
}

/// 导出为编辑器 JSON
pub fn export(graph: &Graph) -> Result<String> {
    export_graph_json(graph).map(|json| json + "\n")
}
