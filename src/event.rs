//! 运行事件
//!
//! 三种最大流算法共享的、封闭的步骤事件集合。事件按产生顺序追加，追加后不可变；
//! 事件前缀加上初始流量即可完全确定该时刻算法对外可见的状态。

use crate::algorithm::AlgorithmId;
use crate::graph::{EdgeId, NodeId};
use crate::types::{Capacity, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 增广路径上的一段
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathSegment {
    pub from: NodeId,
    pub to: NodeId,
    pub is_reverse: bool,
    pub original_edge_id: EdgeId,
}

/// 单条原始边的流量更新
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowUpdate {
    pub edge_id: EdgeId,
    pub new_flow: Capacity,
}

/// 步骤事件
///
/// JSON 形式为 `{"type": "RUN_START", ...}`，字段使用 camelCase。
/// 无法识别的 `type` 反序列化为 [`FlowEvent::Unknown`]，回放时按空操作处理。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum FlowEvent {
    /// 总是第一个事件，标识产生日志的算法
    AlgorithmSelected { algorithm: AlgorithmId },
    RunStart {
        source: NodeId,
        sink: NodeId,
        timestamp: Timestamp,
    },
    ResidualBuilt { residual_edge_count: usize },
    BfsStart { iteration: u64 },
    BfsVisitNode { node: NodeId },
    BfsDiscoverEdge {
        from: NodeId,
        to: NodeId,
        residual_capacity: Capacity,
        is_reverse: bool,
        original_edge_id: EdgeId,
    },
    AugmentingPathFound {
        path: Vec<PathSegment>,
        bottleneck: Capacity,
    },
    AugmentApply {
        delta: Capacity,
        updates: Vec<FlowUpdate>,
    },
    IterationEnd {
        iteration: u64,
        current_max_flow: Capacity,
    },
    NoMorePaths { iteration: u64, max_flow: Capacity },
    DinicLevelGraphBuilt { phase: u64, reachable_nodes: usize },
    DinicBlockingFlowEnd { phase: u64, pushed_flow: Capacity },
    PushRelabelInit { active_nodes: usize },
    PushRelabelPush {
        from: NodeId,
        to: NodeId,
        delta: Capacity,
        is_reverse: bool,
        original_edge_id: EdgeId,
    },
    PushRelabelRelabel { node: NodeId, new_height: i64 },
    MincutComputed {
        reachable: Vec<NodeId>,
        cut_edges: Vec<EdgeId>,
        cut_capacity: Capacity,
    },
    RunEnd {
        max_flow: Capacity,
        timestamp: Timestamp,
    },
    Error { message: String },
    /// 未来版本新增的事件类型
    #[serde(other)]
    Unknown,
}

impl FlowEvent {
    /// 事件类型标签（与 JSON 中的 `type` 一致）
    pub fn kind(&self) -> &'static str {
        match self {
            FlowEvent::AlgorithmSelected { .. } => "ALGORITHM_SELECTED",
            FlowEvent::RunStart { .. } => "RUN_START",
            FlowEvent::ResidualBuilt { .. } => "RESIDUAL_BUILT",
            FlowEvent::BfsStart { .. } => "BFS_START",
            FlowEvent::BfsVisitNode { .. } => "BFS_VISIT_NODE",
            FlowEvent::BfsDiscoverEdge { .. } => "BFS_DISCOVER_EDGE",
            FlowEvent::AugmentingPathFound { .. } => "AUGMENTING_PATH_FOUND",
            FlowEvent::AugmentApply { .. } => "AUGMENT_APPLY",
            FlowEvent::IterationEnd { .. } => "ITERATION_END",
            FlowEvent::NoMorePaths { .. } => "NO_MORE_PATHS",
            FlowEvent::DinicLevelGraphBuilt { .. } => "DINIC_LEVEL_GRAPH_BUILT",
            FlowEvent::DinicBlockingFlowEnd { .. } => "DINIC_BLOCKING_FLOW_END",
            FlowEvent::PushRelabelInit { .. } => "PUSH_RELABEL_INIT",
            FlowEvent::PushRelabelPush { .. } => "PUSH_RELABEL_PUSH",
            FlowEvent::PushRelabelRelabel { .. } => "PUSH_RELABEL_RELABEL",
            FlowEvent::MincutComputed { .. } => "MINCUT_COMPUTED",
            FlowEvent::RunEnd { .. } => "RUN_END",
            FlowEvent::Error { .. } => "ERROR",
            FlowEvent::Unknown => "UNKNOWN",
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, FlowEvent::Error { .. })
    }

    /// 构造错误事件
    pub fn error(err: &crate::Error) -> Self {
        FlowEvent::Error {
            message: err.to_string(),
        }
    }
}

impl fmt::Display for FlowEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlowEvent::AlgorithmSelected { algorithm } => {
                write!(f, "选择算法 {}", algorithm.label())
            }
            FlowEvent::RunStart { source, sink, .. } => {
                write!(f, "开始运行: {} -> {}", source, sink)
            }
            FlowEvent::ResidualBuilt {
                residual_edge_count,
            } => write!(f, "构建残量图，共 {} 条残量边", residual_edge_count),
            FlowEvent::BfsStart { iteration } => write!(f, "第 {} 轮 BFS 开始", iteration),
            FlowEvent::BfsVisitNode { node } => write!(f, "访问节点 {}", node),
            FlowEvent::BfsDiscoverEdge {
                from,
                to,
                residual_capacity,
                is_reverse,
                ..
            } => {
                write!(f, "发现 {} -> {} (残量={}", from, to, residual_capacity)?;
                if *is_reverse {
                    write!(f, ", 反向")?;
                }
                write!(f, ")")
            }
            FlowEvent::AugmentingPathFound { path, bottleneck } => {
                let hops: Vec<String> = path
                    .iter()
                    .map(|segment| segment.from.to_string())
                    .chain(path.last().map(|segment| segment.to.to_string()))
                    .collect();
                write!(f, "找到增广路径 {}，瓶颈 {}", hops.join(" -> "), bottleneck)
            }
            FlowEvent::AugmentApply { delta, updates } => {
                write!(f, "增广 {}，更新 {} 条边", delta, updates.len())
            }
            FlowEvent::IterationEnd {
                iteration,
                current_max_flow,
            } => write!(f, "第 {} 轮结束，当前流量 {}", iteration, current_max_flow),
            FlowEvent::NoMorePaths {
                iteration,
                max_flow,
            } => write!(
                f,
                "第 {} 轮后不存在增广路径，最大流 {}",
                iteration, max_flow
            ),
            FlowEvent::DinicLevelGraphBuilt {
                phase,
                reachable_nodes,
            } => write!(
                f,
                "阶段 {} 构建层次图，可达节点 {} 个",
                phase, reachable_nodes
            ),
            FlowEvent::DinicBlockingFlowEnd { phase, pushed_flow } => {
                write!(f, "阶段 {} 阻塞流完成，推送 {}", phase, pushed_flow)
            }
            FlowEvent::PushRelabelInit { active_nodes } => {
                write!(f, "预流初始化完成，活跃节点 {} 个", active_nodes)
            }
            FlowEvent::PushRelabelPush {
                from,
                to,
                delta,
                is_reverse,
                ..
            } => {
                write!(f, "推送 {} -> {}: {}", from, to, delta)?;
                if *is_reverse {
                    write!(f, " (反向)")?;
                }
                Ok(())
            }
            FlowEvent::PushRelabelRelabel { node, new_height } => {
                write!(f, "重标记 {} 高度为 {}", node, new_height)
            }
            FlowEvent::MincutComputed {
                cut_edges,
                cut_capacity,
                ..
            } => write!(
                f,
                "最小割计算完成，割边 {} 条，割容量 {}",
                cut_edges.len(),
                cut_capacity
            ),
            FlowEvent::RunEnd { max_flow, .. } => write!(f, "运行结束，最大流 {}", max_flow),
            FlowEvent::Error { message } => write!(f, "错误: {}", message),
            FlowEvent::Unknown => write!(f, "未知事件"),
        }
    }
}
