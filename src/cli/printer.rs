//! 结果打印器
//!
//! 提供表格、事件日志和 JSON 三种输出

use crate::algorithm::{MinCut, RunResult};
use crate::event::FlowEvent;
use crate::graph::Graph;
use crate::metrics::AlgorithmSummary;
use crate::playback::PlaybackState;
use colored::Colorize;
use prettytable::{format, row, Cell, Row, Table};

/// 输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// 表格
    #[default]
    Table,
    /// 逐行事件日志
    Log,
    /// JSON
    Json,
}

/// 结果打印器
#[derive(Debug, Clone, Copy, Default)]
pub struct Printer;

impl Printer {
    pub fn new() -> Self {
        Self
    }

    fn table() -> Table {
        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_BOX_CHARS);
        table
    }

    /// 单次运行摘要
    pub fn run_summary(&self, result: &RunResult) -> String {
        let mut table = Self::table();
        table.set_titles(row!["属性", "值"]);
        table.add_row(row!["算法", result.algorithm.label()]);
        table.add_row(row!["最大流", result.max_flow_value.to_string()]);
        table.add_row(row!["事件数", result.events.len().to_string()]);
        if let Some(cut) = &result.min_cut {
            table.add_row(row!["割容量", cut.cut_capacity.to_string()]);
            table.add_row(row!["割边", join(cut.cut_edges.iter())]);
        }

        let status = match result.error() {
            Some(message) => format!("{} {}", "错误:".red().bold(), message),
            None => "完成".green().to_string(),
        };
        format!("{}{}\n", table, status)
    }

    /// 各边最终流量
    pub fn edge_flows(&self, graph: &Graph) -> String {
        let mut table = Self::table();
        table.set_titles(row!["边", "起点", "终点", "流量/容量", ""]);
        for edge in graph.edges() {
            let marker = if edge.is_saturated() && edge.capacity() > 0 {
                "饱和".yellow().to_string()
            } else {
                String::new()
            };
            table.add_row(Row::new(vec![
                Cell::new(edge.id().as_str()),
                Cell::new(edge.from().as_str()),
                Cell::new(edge.to().as_str()),
                Cell::new(&format!("{}/{}", edge.flow(), edge.capacity())),
                Cell::new(&marker),
            ]));
        }
        table.to_string()
    }

    /// 逐行事件日志
    pub fn event_log(&self, events: &[FlowEvent]) -> String {
        let mut output = String::new();
        for (index, event) in events.iter().enumerate() {
            let kind = format!("{:<24}", event.kind());
            let kind = match event {
                FlowEvent::Error { .. } => kind.red().bold(),
                FlowEvent::AugmentingPathFound { .. } | FlowEvent::PushRelabelPush { .. } => {
                    kind.green()
                }
                FlowEvent::MincutComputed { .. } | FlowEvent::RunEnd { .. } => kind.cyan(),
                FlowEvent::Unknown => kind.dimmed(),
                _ => kind.normal(),
            };
            output.push_str(&format!("{:>5}  {} {}\n", index, kind, event));
        }
        output
    }

    /// 算法对比
    pub fn comparison(&self, summaries: &[AlgorithmSummary]) -> String {
        let mut table = Self::table();
        table.set_titles(row![
            "算法", "最大流", "割容量", "事件", "增广", "推送", "重标记", "阶段", "状态"
        ]);
        for summary in summaries {
            let cut = summary
                .cut_capacity
                .map(|c| c.to_string())
                .unwrap_or_else(|| "-".to_string());
            let status = match &summary.error {
                Some(message) => message.red().to_string(),
                None => "ok".green().to_string(),
            };
            let m = &summary.metrics;
            table.add_row(Row::new(vec![
                Cell::new(summary.algorithm.label()),
                Cell::new(&summary.max_flow_value.to_string()),
                Cell::new(&cut),
                Cell::new(&m.total_events.to_string()),
                Cell::new(&m.augmentations.to_string()),
                Cell::new(&m.pushes.to_string()),
                Cell::new(&m.relabels.to_string()),
                Cell::new(&m.phases.to_string()),
                Cell::new(&status),
            ]));
        }

        let agreed = summaries.windows(2).all(|pair| {
            pair[0].max_flow_value == pair[1].max_flow_value
                && pair[0].cut_capacity == pair[1].cut_capacity
        });
        let verdict = if agreed {
            "三种算法结果一致".green()
        } else {
            "算法结果不一致".red().bold()
        };
        format!("{}{}\n", table, verdict)
    }

    /// 最小割
    pub fn min_cut(&self, cut: &MinCut) -> String {
        let mut table = Self::table();
        table.set_titles(row!["属性", "值"]);
        table.add_row(row!["源侧节点", join(cut.reachable.iter())]);
        table.add_row(row!["割边", join(cut.cut_edges.iter())]);
        table.add_row(row!["割容量", cut.cut_capacity.to_string()]);
        table.to_string()
    }

    /// 回放状态
    pub fn playback_state(&self, state: &PlaybackState, total: usize) -> String {
        let mut table = Self::table();
        table.set_titles(row!["属性", "值"]);
        table.add_row(row!["游标", format!("{} / {}", state.cursor, total as i64 - 1)]);
        table.add_row(row!["运行中", state.is_running.to_string()]);
        table.add_row(row!["当前流量", state.current_max_flow.to_string()]);
        table.add_row(row!["高亮节点", join(state.highlighted_nodes.iter())]);
        table.add_row(row!["高亮边", join(state.highlighted_edges.iter())]);
        if let Some(path) = &state.last_augmenting_path {
            let hops: Vec<String> = path
                .iter()
                .map(|s| format!("{}->{}", s.from, s.to))
                .collect();
            table.add_row(row!["最近增广路径", hops.join(" ")]);
        }
        if let Some(cut_edges) = &state.cut_edges {
            table.add_row(row!["割边", join(cut_edges.iter())]);
        }
        if let Some(error) = &state.error {
            table.add_row(row!["错误", error]);
        }

        let mut flows = Self::table();
        flows.set_titles(row!["边", "流量"]);
        for (edge, flow) in &state.edge_flows {
            flows.add_row(row![edge.as_str(), flow.to_string()]);
        }
        format!("{}{}", table, flows)
    }

    /// 校验报告
    pub fn validation(&self, errors: &[String]) -> String {
        if errors.is_empty() {
            return format!("{}\n", "图校验通过".green());
        }
        let mut output = format!("{}\n", format!("图校验失败（{} 项）", errors.len()).red().bold());
        for error in errors {
            output.push_str(&format!("  - {}\n", error));
        }
        output
    }

    /// 导入警告
    pub fn warnings(&self, warnings: &[String]) -> String {
        warnings
            .iter()
            .map(|w| format!("{} {}\n", "警告:".yellow(), w))
            .collect()
    }
}

fn join<T: std::fmt::Display>(items: impl Iterator<Item = T>) -> String {
    let parts: Vec<String> = items.map(|item| item.to_string()).collect();
    if parts.is_empty() {
        "-".to_string()
    } else {
        parts.join(", ")
    }
}
