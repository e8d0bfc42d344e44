//! 最小割
//!
//! 从源点出发沿正残量边求可达集，横跨可达集与其补集的正容量原始边构成割。

use super::residual::ResidualGraph;
use crate::graph::{EdgeId, Graph, NodeId};
use crate::types::Capacity;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// 最小割结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MinCut {
    /// 源侧节点（已排序）
    pub reachable: Vec<NodeId>,
    /// 割边（已排序）
    pub cut_edges: Vec<EdgeId>,
    /// 割容量
    pub cut_capacity: Capacity,
}

impl MinCut {
    /// 节点是否位于源侧
    pub fn is_source_side(&self, node: &str) -> bool {
        self.reachable
            .binary_search_by(|id| id.as_str().cmp(node))
            .is_ok()
    }
}

/// 计算最小割
///
/// 可在任意流量状态下独立调用；只有在最大流状态下割容量才等于流量值。
pub fn compute_min_cut(graph: &Graph, source: &str) -> MinCut {
    let residual = ResidualGraph::build(graph);
    let reachable: BTreeSet<NodeId> = residual.reachable_from(&NodeId::from(source));

    let mut cut_edges = Vec::new();
    let mut cut_capacity = 0;
    for edge in graph.edges() {
        if reachable.contains(edge.from())
            && !reachable.contains(edge.to())
            && edge.capacity() > 0
        {
            cut_edges.push(edge.id().clone());
            cut_capacity += edge.capacity();
        }
    }

    MinCut {
        reachable: reachable.into_iter().collect(),
        cut_edges,
        cut_capacity,
    }
}
