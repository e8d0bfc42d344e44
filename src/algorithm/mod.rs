//! 最大流算法模块
//!
//! 三种算法（Edmonds-Karp、Dinic、Push-Relabel）共用残量图构建与事件模型，
//! 每次运行都输出完整、有序、确定的步骤事件日志。

mod augment;
mod dinic;
mod edmonds_karp;
mod min_cut;
mod push_relabel;
mod residual;

pub use dinic::Dinic;
pub use edmonds_karp::EdmondsKarp;
pub use min_cut::{compute_min_cut, MinCut};
pub use push_relabel::PushRelabel;
pub use residual::{build_residual_graph, ResidualEdge, ResidualGraph};

use crate::error::Error;
use crate::event::FlowEvent;
use crate::graph::Graph;
use crate::types::{Capacity, Clock, SystemClock};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// 默认步数上限
pub const DEFAULT_MAX_STEPS: u64 = 50_000;

/// 算法标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AlgorithmId {
    /// 最短增广路
    EdmondsKarp,
    /// 层次图 + 阻塞流
    Dinic,
    /// 推送-重标记
    PushRelabel,
}

impl Default for AlgorithmId {
    fn default() -> Self {
        AlgorithmId::EdmondsKarp
    }
}

impl AlgorithmId {
    /// 全部算法，按展示顺序
    pub const ALL: [AlgorithmId; 3] = [
        AlgorithmId::EdmondsKarp,
        AlgorithmId::Dinic,
        AlgorithmId::PushRelabel,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AlgorithmId::EdmondsKarp => "edmonds-karp",
            AlgorithmId::Dinic => "dinic",
            AlgorithmId::PushRelabel => "push-relabel",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AlgorithmId::EdmondsKarp => "Edmonds-Karp",
            AlgorithmId::Dinic => "Dinic",
            AlgorithmId::PushRelabel => "Push-Relabel",
        }
    }

    pub fn short_label(&self) -> &'static str {
        match self {
            AlgorithmId::EdmondsKarp => "EK",
            AlgorithmId::Dinic => "Dinic",
            AlgorithmId::PushRelabel => "PR",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            AlgorithmId::EdmondsKarp => "基于 BFS 的最短增广路",
            AlgorithmId::Dinic => "分层图上逐阶段推送阻塞流",
            AlgorithmId::PushRelabel => "在有余量的节点上局部推送与重标记",
        }
    }
}

impl fmt::Display for AlgorithmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AlgorithmId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "edmonds-karp" | "edmonds_karp" | "ek" => Ok(AlgorithmId::EdmondsKarp),
            "dinic" => Ok(AlgorithmId::Dinic),
            "push-relabel" | "push_relabel" | "pr" => Ok(AlgorithmId::PushRelabel),
            other => Err(Error::UnknownAlgorithm(other.to_string())),
        }
    }
}

/// 运行选项
#[derive(Clone)]
pub struct RunOptions {
    /// 迭代/操作次数上限，超出后以 `ERROR` 事件提前结束
    pub max_steps: u64,
    /// `RUN_START` / `RUN_END` 的时间戳来源
    pub clock: Arc<dyn Clock>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
            clock: Arc::new(SystemClock),
        }
    }
}

impl fmt::Debug for RunOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunOptions")
            .field("max_steps", &self.max_steps)
            .finish_non_exhaustive()
    }
}

impl RunOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置步数上限
    pub fn with_max_steps(mut self, max_steps: u64) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// 设置时间戳来源
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }
}

/// 运行结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    pub algorithm: AlgorithmId,
    /// 最大流（出错时为已计算出的部分值）
    pub max_flow_value: Capacity,
    /// 带最终流量的新图
    pub graph: Graph,
    /// 完整事件日志
    pub events: Vec<FlowEvent>,
    /// 前置条件失败或不变式被破坏时为 None
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_cut: Option<MinCut>,
}

impl RunResult {
    /// 第一个错误事件的消息
    pub fn error(&self) -> Option<&str> {
        self.events.iter().find_map(|event| match event {
            FlowEvent::Error { message } => Some(message.as_str()),
            _ => None,
        })
    }

    pub fn is_ok(&self) -> bool {
        self.error().is_none()
    }
}

/// 最大流算法
pub trait MaxFlowAlgorithm: Send + Sync {
    /// 算法标识
    fn id(&self) -> AlgorithmId;

    /// 在输入图的深拷贝上运行；调用方的图不会被修改，任何失败都编码为 `ERROR` 事件
    fn run(&self, graph: &Graph, options: &RunOptions) -> RunResult;
}

/// 获取算法实现
pub fn algorithm(id: AlgorithmId) -> &'static dyn MaxFlowAlgorithm {
    match id {
        AlgorithmId::EdmondsKarp => &EdmondsKarp,
        AlgorithmId::Dinic => &Dinic,
        AlgorithmId::PushRelabel => &PushRelabel,
    }
}

/// 按算法标识运行
pub fn run_max_flow(id: AlgorithmId, graph: &Graph, options: &RunOptions) -> RunResult {
    algorithm(id).run(graph, options)
}

/// 在各自独立的副本上并行运行全部算法，结果按 [`AlgorithmId::ALL`] 顺序返回
pub fn compare_algorithms(graph: &Graph, options: &RunOptions) -> Vec<RunResult> {
    AlgorithmId::ALL
        .par_iter()
        .map(|&id| run_max_flow(id, graph, options))
        .collect()
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use crate::graph::{Edge, Node};
    use crate::types::FixedClock;

    fn options() -> RunOptions {
        RunOptions::new().with_clock(FixedClock(111))
    }

    #[test]
    fn test_algorithm_id_parsing() {
        assert_eq!("dinic".parse::<AlgorithmId>().unwrap(), AlgorithmId::Dinic);
        assert_eq!("PR".parse::<AlgorithmId>().unwrap(), AlgorithmId::PushRelabel);
        assert_eq!(
            "edmonds-karp".parse::<AlgorithmId>().unwrap(),
            AlgorithmId::EdmondsKarp
        );
        assert!(matches!(
            "simplex".parse::<AlgorithmId>(),
            Err(Error::UnknownAlgorithm(_))
        ));
        assert_eq!(AlgorithmId::default(), AlgorithmId::EdmondsKarp);
    }

    #[test]
    fn test_algorithm_id_serde() {
        let json = serde_json::to_string(&AlgorithmId::ALL).unwrap();
        assert_eq!(json, r#"["edmonds-karp","dinic","push-relabel"]"#);
    }

    #[test]
    fn test_dispatch_reports_algorithm() {
        for id in AlgorithmId::ALL {
            let result = run_max_flow(id, &single_edge(), &options());
            assert_eq!(result.algorithm, id);
            assert_eq!(result.events[0], FlowEvent::AlgorithmSelected { algorithm: id });
            assert_eq!(result.max_flow_value, 7);
        }
    }

    #[test]
    fn test_compare_diamond() {
        let results = compare_algorithms(&diamond(), &options());
        let ids: Vec<AlgorithmId> = results.iter().map(|r| r.algorithm).collect();
        assert_eq!(ids, AlgorithmId::ALL.to_vec());

        let values: Vec<Capacity> = results.iter().map(|r| r.max_flow_value).collect();
        assert_eq!(values, vec![10, 10, 10]);
        let cuts: Vec<Option<Capacity>> = results
            .iter()
            .map(|r| r.min_cut.as_ref().map(|c| c.cut_capacity))
            .collect();
        assert_eq!(cuts, vec![Some(10), Some(10), Some(10)]);
    }

    #[test]
    fn test_compare_clrs() {
        for result in compare_algorithms(&clrs(), &options()) {
            assert!(result.is_ok(), "{:?}", result.error());
            assert_eq!(result.max_flow_value, 23, "{}", result.algorithm);
            assert_eq!(result.min_cut.unwrap().cut_capacity, 23);
        }
    }

    #[test]
    fn test_algorithm_specific_events() {
        let dinic = run_max_flow(AlgorithmId::Dinic, &diamond(), &options());
        let pr = run_max_flow(AlgorithmId::PushRelabel, &diamond(), &options());

        assert!(dinic
            .events
            .iter()
            .any(|e| matches!(e, FlowEvent::DinicLevelGraphBuilt { .. })));
        assert!(pr
            .events
            .iter()
            .any(|e| matches!(e, FlowEvent::PushRelabelPush { .. })));
        assert!(pr
            .events
            .iter()
            .any(|e| matches!(e, FlowEvent::PushRelabelRelabel { .. })));
    }

    fn assert_rejected(graph: &Graph, needle: &str) {
        for id in AlgorithmId::ALL {
            let result = run_max_flow(id, graph, &options());
            assert_eq!(result.max_flow_value, 0, "{}", id);
            assert_eq!(result.events.len(), 2, "{}", id);
            assert_eq!(result.events[0], FlowEvent::AlgorithmSelected { algorithm: id });
            let message = result.error().unwrap();
            assert!(message.contains(needle), "{}: {}", id, message);
            assert!(result.min_cut.is_none());
        }
    }

    #[test]
    fn test_capacity_overflow_is_rejected() {
        let mut graph = Graph::default();
        graph.add_node(Node::source("s")).unwrap();
        graph.add_node(Node::normal("a")).unwrap();
        graph.add_node(Node::sink("t")).unwrap();
        graph.add_edge(Edge::new("e1", "s", "t", Capacity::MAX)).unwrap();
        graph.add_edge(Edge::new("e2", "s", "a", Capacity::MAX)).unwrap();
        graph.add_edge(Edge::new("e3", "a", "t", Capacity::MAX)).unwrap();
        assert_rejected(&graph, "容量总和");
    }

    #[test]
    fn test_single_max_capacity_edge() {
        let mut graph = Graph::default();
        graph.add_node(Node::source("s")).unwrap();
        graph.add_node(Node::sink("t")).unwrap();
        graph.add_edge(Edge::new("e1", "s", "t", Capacity::MAX)).unwrap();
        for result in compare_algorithms(&graph, &options()) {
            assert!(result.is_ok(), "{}: {:?}", result.algorithm, result.error());
            assert_eq!(result.max_flow_value, Capacity::MAX);
            assert_eq!(result.min_cut.unwrap().cut_capacity, Capacity::MAX);
        }
    }

    #[test]
    fn test_unbalanced_initial_flow_is_rejected() {
        let mut graph = Graph::default();
        graph.add_node(Node::source("s")).unwrap();
        graph.add_node(Node::normal("a")).unwrap();
        graph.add_node(Node::sink("t")).unwrap();
        graph
            .add_edge(Edge::new("e1", "s", "a", 5).with_flow(3))
            .unwrap();
        graph.add_edge(Edge::new("e2", "s", "t", 2)).unwrap();
        assert_rejected(&graph, "不守恒");
    }

    #[test]
    fn test_balanced_initial_flow_agrees() {
        let mut graph = diamond();
        graph.edge_mut("e1").unwrap().set_flow(2);
        graph.edge_mut("e3").unwrap().set_flow(2);
        graph.edge_mut("e5").unwrap().set_flow(2);
        let results = compare_algorithms(&graph, &options());
        for result in &results {
            assert!(result.is_ok(), "{}: {:?}", result.algorithm, result.error());
            assert_eq!(result.max_flow_value, 10, "{}", result.algorithm);
            assert_eq!(result.min_cut.as_ref().unwrap().cut_capacity, 10);
        }
    }

    #[test]
    fn test_run_result_serialization() {
        let result = run_max_flow(AlgorithmId::EdmondsKarp, &single_edge(), &options());
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["algorithm"], "edmonds-karp");
        assert_eq!(json["maxFlowValue"], 7);
        assert_eq!(json["minCut"]["cutCapacity"], 7);
        assert_eq!(json["events"][1]["type"], "RUN_START");
    }
}
