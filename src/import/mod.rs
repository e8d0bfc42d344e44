//! 图导入导出
//!
//! 支持编辑器 JSON 格式（`nodes` / `edges` 按 ID 键控，可选 `meta`）和
//! `from,to,capacity[,flow]` 形式的 CSV 边表。导入的数据先经过规范化：
//! 无法修复的条目被丢弃，可修复的被截断，每处改动都记录为一条警告。

use crate::error::{Error, Result};
use crate::graph::{Edge, Graph, GraphMeta, Node, GRAPH_FORMAT_VERSION};
use crate::types::{Capacity, NodeRole, Timestamp};
use indexmap::{IndexMap, IndexSet};
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

/// CSV 未指定时的默认源点
pub const DEFAULT_CSV_SOURCE: &str = "s";
/// CSV 未指定时的默认汇点
pub const DEFAULT_CSV_SINK: &str = "t";

/// 导入结果
#[derive(Debug, Clone)]
pub struct ImportResult {
    pub graph: Graph,
    /// 规范化过程中的改动说明
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawNode {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    x: f64,
    #[serde(default)]
    y: f64,
    #[serde(default)]
    role: NodeRole,
}

#[derive(Debug, Clone, Deserialize)]
struct RawEdge {
    #[serde(default)]
    id: Option<String>,
    from: String,
    to: String,
    capacity: f64,
    #[serde(default)]
    flow: f64,
    #[serde(default)]
    label: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMeta {
    #[serde(default)]
    created_at: Option<Timestamp>,
}

/// 保持文档顺序的原始图
#[derive(Debug, Clone, Default, Deserialize)]
struct RawGraph {
    #[serde(default)]
    nodes: IndexMap<String, RawNode>,
    #[serde(default)]
    edges: IndexMap<String, RawEdge>,
    #[serde(default)]
    meta: Option<RawMeta>,
}

/// CSV 边记录
#[derive(Debug, Deserialize)]
struct CsvEdgeRecord {
    from: String,
    to: String,
    capacity: f64,
    #[serde(default)]
    flow: Option<f64>,
}

/// 非负整数时返回原值，否则为 None
fn as_capacity(value: f64) -> Option<Capacity> {
    if value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= Capacity::MAX as f64 {
        Some(value as Capacity)
    } else {
        None
    }
}

struct Normalizer {
    warnings: Vec<String>,
}

impl Normalizer {
    fn warn(&mut self, message: String) {
        warn!("{}", message);
        self.warnings.push(message);
    }

    fn normalize(mut self, raw: RawGraph) -> Result<ImportResult> {
        let meta = match raw.meta {
            Some(RawMeta {
                created_at: Some(created_at),
            }) => GraphMeta {
                version: GRAPH_FORMAT_VERSION.to_string(),
                created_at,
                updated_at: GraphMeta::now().updated_at,
            },
            _ => GraphMeta::now(),
        };
        let mut graph = Graph::with_meta(meta);

        // 节点：重复 ID 保留第一个，多余的源点/汇点降级为普通节点
        let mut seen_source: Option<String> = None;
        let mut seen_sink: Option<String> = None;
        let mut demoted_sources = false;
        let mut demoted_sinks = false;

        for (key, raw_node) in raw.nodes {
            let id = raw_node.id.unwrap_or(key);
            if graph.contains_node(&id) {
                self.warn(format!("节点 ID {} 重复，保留第一次出现", id));
                continue;
            }

            let mut role = raw_node.role;
            match role {
                NodeRole::Source if seen_source.is_some() => {
                    role = NodeRole::Normal;
                    demoted_sources = true;
                }
                NodeRole::Source => seen_source = Some(id.clone()),
                NodeRole::Sink if seen_sink.is_some() => {
                    role = NodeRole::Normal;
                    demoted_sinks = true;
                }
                NodeRole::Sink => seen_sink = Some(id.clone()),
                NodeRole::Normal => {}
            }

            let mut node = Node::new(id.as_str(), role).with_position(raw_node.x, raw_node.y);
            if let Some(label) = raw_node.label {
                node = node.with_label(label);
            }
            graph.add_node(node)?;
        }

        if let (true, Some(kept)) = (demoted_sources, &seen_source) {
            self.warn(format!("存在多个源点，保留 {} 并将其余降级", kept));
        }
        if let (true, Some(kept)) = (demoted_sinks, &seen_sink) {
            self.warn(format!("存在多个汇点，保留 {} 并将其余降级", kept));
        }

        // 边
        let mut pairs: IndexSet<(String, String)> = IndexSet::new();
        for (key, raw_edge) in raw.edges {
            let id = raw_edge.id.unwrap_or(key);
            if graph.edge(&id).is_some() {
                self.warn(format!("边 ID {} 重复，已移除", id));
                continue;
            }

            let capacity = match as_capacity(raw_edge.capacity) {
                Some(capacity) => capacity,
                None => {
                    self.warn(format!("边 {} 的容量无效，已置为 0", id));
                    0
                }
            };
            let mut flow = match as_capacity(raw_edge.flow) {
                Some(flow) => flow,
                None => {
                    self.warn(format!("边 {} 的流量无效，已置为 0", id));
                    0
                }
            };
            if flow > capacity {
                self.warn(format!("边 {} 的流量超过容量，已截断", id));
                flow = capacity;
            }

            if raw_edge.from == raw_edge.to {
                self.warn(format!("自环边 {} 已移除", id));
                continue;
            }

            let pair = (raw_edge.from.clone(), raw_edge.to.clone());
            if !pairs.insert(pair) {
                self.warn(format!(
                    "重复的节点对 {}->{} 已移除",
                    raw_edge.from, raw_edge.to
                ));
                continue;
            }

            if !graph.contains_node(&raw_edge.from) || !graph.contains_node(&raw_edge.to) {
                self.warn(format!("边 {} 的端点不存在，已移除", id));
                continue;
            }

            let mut edge = Edge::new(id.as_str(), raw_edge.from, raw_edge.to, capacity).with_flow(flow);
            if let Some(label) = raw_edge.label {
                edge = edge.with_label(label);
            }
            graph.add_edge(edge)?;
        }

        info!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            warnings = self.warnings.len(),
            "图导入完成"
        );

        Ok(ImportResult {
            graph,
            warnings: self.warnings,
        })
    }
}

fn normalize(raw: RawGraph) -> Result<ImportResult> {
    Normalizer {
        warnings: Vec::new(),
    }
    .normalize(raw)
}

/// 解析编辑器 JSON 并规范化
pub fn import_graph_json(json: &str) -> Result<ImportResult> {
    let raw: RawGraph =
        serde_json::from_str(json).map_err(|e| Error::ImportError(format!("JSON 格式错误: {}", e)))?;
    normalize(raw)
}

/// 导出为格式化 JSON
pub fn export_graph_json(graph: &Graph) -> Result<String> {
    serde_json::to_string_pretty(graph).map_err(|e| Error::SerializationError(e.to_string()))
}

/// 导出到文件
pub fn write_graph_json<P: AsRef<Path>>(graph: &Graph, path: P) -> Result<()> {
    let json = export_graph_json(graph)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// 从 CSV 读取边表
///
/// 节点按首次出现创建，边 ID 按行号生成（`e1`、`e2` ...）；
/// 指定的源点和汇点即使未出现在任何行中也会被创建。
pub fn read_edges_csv<R: Read>(reader: R, source: &str, sink: &str) -> Result<ImportResult> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut raw = RawGraph::default();
    let ensure_node = |raw: &mut RawGraph, id: &str| {
        if raw.nodes.contains_key(id) {
            return;
        }
        let role = if id == source {
            NodeRole::Source
        } else if id == sink {
            NodeRole::Sink
        } else {
            NodeRole::Normal
        };
        raw.nodes.insert(
            id.to_string(),
            RawNode {
                id: None,
                label: None,
                x: 0.0,
                y: 0.0,
                role,
            },
        );
    };

    ensure_node(&mut raw, source);
    ensure_node(&mut raw, sink);

    for (index, record) in csv_reader.deserialize::<CsvEdgeRecord>().enumerate() {
        let record =
            record.map_err(|e| Error::ImportError(format!("CSV 第 {} 行: {}", index + 2, e)))?;
        ensure_node(&mut raw, &record.from);
        ensure_node(&mut raw, &record.to);

        let id = format!("e{}", index + 1);
        raw.edges.insert(
            id,
            RawEdge {
                id: None,
                from: record.from,
                to: record.to,
                capacity: record.capacity,
                flow: record.flow.unwrap_or(0.0),
                label: None,
            },
        );
    }

    normalize(raw)
}

/// 从 CSV 文件导入边表
pub fn import_edges_csv<P: AsRef<Path>>(path: P, source: &str, sink: &str) -> Result<ImportResult> {
    let file = File::open(path)?;
    read_edges_csv(file, source, sink)
}

/// 按扩展名加载图文件（`.json` 或 `.csv`，CSV 使用默认源点/汇点）
pub fn load_graph<P: AsRef<Path>>(path: P) -> Result<ImportResult> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    match extension.as_deref() {
        Some("json") => {
            let json = std::fs::read_to_string(path)?;
            import_graph_json(&json)
        }
        Some("csv") => import_edges_csv(path, DEFAULT_CSV_SOURCE, DEFAULT_CSV_SINK),
        _ => Err(Error::ImportError(format!(
            "无法识别的文件类型: {}",
            path.display()
        ))),
    }
}
