//! 残量图
//!
//! 每次需要查询残量时都从当前流量重新构建，不做增量修补。
//! 所有残量边按 `(from, to, original_edge_id, is_reverse)` 全局排序，
//! 算法的遍历顺序（进而每一个事件）都由这个顺序决定。

use crate::graph::{EdgeId, Graph, NodeId};
use crate::types::Capacity;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// 残量边
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResidualEdge {
    pub from: NodeId,
    pub to: NodeId,
    pub residual_capacity: Capacity,
    pub original_edge_id: EdgeId,
    pub is_reverse: bool,
}

impl ResidualEdge {
    /// 排序键
    pub fn sort_key(&self) -> (&NodeId, &NodeId, &EdgeId, bool) {
        (&self.from, &self.to, &self.original_edge_id, self.is_reverse)
    }

    /// 可读 ID，如 `s->a:e1:f`、`a->s:e1:r`
    pub fn id(&self) -> String {
        format!(
            "{}->{}:{}:{}",
            self.from,
            self.to,
            self.original_edge_id,
            if self.is_reverse { "r" } else { "f" }
        )
    }
}

/// 残量图
#[derive(Debug, Clone, Default)]
pub struct ResidualGraph {
    /// 全部残量边（已排序）
    edges: Vec<ResidualEdge>,
    /// 节点 -> 出边在 `edges` 中的下标；没有出边的节点对应空列表
    outgoing: BTreeMap<NodeId, Vec<usize>>,
}

impl ResidualGraph {
    /// 从图的当前流量构建残量图
    pub fn build(graph: &Graph) -> Self {
        let mut edges = Vec::with_capacity(graph.edge_count() * 2);

        for edge in graph.edges() {
            let forward = edge.forward_residual();
            if forward > 0 {
                edges.push(ResidualEdge {
                    from: edge.from().clone(),
                    to: edge.to().clone(),
                    residual_capacity: forward,
                    original_edge_id: edge.id().clone(),
                    is_reverse: false,
                });
            }
            if edge.flow() > 0 {
                edges.push(ResidualEdge {
                    from: edge.to().clone(),
                    to: edge.from().clone(),
                    residual_capacity: edge.flow(),
                    original_edge_id: edge.id().clone(),
                    is_reverse: true,
                });
            }
        }

        edges.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

        let mut outgoing: BTreeMap<NodeId, Vec<usize>> = graph
            .node_ids()
            .map(|id| (id.clone(), Vec::new()))
            .collect();
        for (index, edge) in edges.iter().enumerate() {
            outgoing.entry(edge.from.clone()).or_default().push(index);
        }

        Self { edges, outgoing }
    }

    /// 全部残量边
    pub fn edges(&self) -> &[ResidualEdge] {
        &self.edges
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// 节点的残量出边（按排序键顺序）
    pub fn outgoing<'a>(&'a self, node: &str) -> impl Iterator<Item = &'a ResidualEdge> + 'a {
        self.outgoing
            .get(node)
            .into_iter()
            .flatten()
            .map(move |&index| &self.edges[index])
    }

    /// 邻接表中的节点（含没有出边的节点）
    pub fn nodes(&self) -> impl Iterator<Item = &NodeId> {
        self.outgoing.keys()
    }

    /// 从源点沿正残量边可达的节点集合
    pub fn reachable_from(&self, source: &NodeId) -> BTreeSet<NodeId> {
        let mut visited = BTreeSet::new();
        let mut queue = VecDeque::new();

        visited.insert(source.clone());
        queue.push_back(source.clone());

        while let Some(current) = queue.pop_front() {
            for edge in self.outgoing(current.as_str()) {
                if edge.residual_capacity <= 0 || visited.contains(&edge.to) {
                    continue;
                }
                visited.insert(edge.to.clone());
                queue.push_back(edge.to.clone());
            }
        }

        visited
    }
}

/// 从图的当前流量构建残量图
pub fn build_residual_graph(graph: &Graph) -> ResidualGraph {
    ResidualGraph::build(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Edge, Node};

    fn make_graph() -> Graph {
        let mut graph = Graph::new();
        graph.add_node(Node::source("s")).unwrap();
        graph.add_node(Node::normal("a")).unwrap();
        graph.add_node(Node::sink("t")).unwrap();
        graph.add_node(Node::normal("z")).unwrap();
        graph.add_edge(Edge::new("e1", "s", "a", 5).with_flow(3)).unwrap();
        graph.add_edge(Edge::new("e2", "a", "t", 4).with_flow(1)).unwrap();
        graph
    }

    #[test]
    fn test_forward_and_reverse_capacities() {
        let residual = ResidualGraph::build(&make_graph());
        let by_id: BTreeMap<String, Capacity> = residual
            .edges()
            .iter()
            .map(|e| (e.id(), e.residual_capacity))
            .collect();

        assert_eq!(by_id["a->s:e1:r"], 3);
        assert_eq!(by_id["s->a:e1:f"], 2);
        assert_eq!(by_id["a->t:e2:f"], 3);
        assert_eq!(by_id["t->a:e2:r"], 1);
        assert_eq!(residual.len(), 4);
    }

    #[test]
    fn test_sorted_order() {
        let residual = ResidualGraph::build(&make_graph());
        let ids: Vec<String> = residual.edges().iter().map(|e| e.id()).collect();
        assert_eq!(ids, vec!["a->s:e1:r", "a->t:e2:f", "s->a:e1:f", "t->a:e2:r"]);
    }

    #[test]
    fn test_saturated_and_empty_edges() {
        let mut graph = make_graph();
        graph.edge_mut("e1").unwrap().set_flow(5);
        graph.edge_mut("e2").unwrap().set_flow(0);
        let residual = ResidualGraph::build(&graph);

        // e1 饱和：只剩反向边；e2 无流量：只剩正向边
        let ids: Vec<String> = residual.edges().iter().map(|e| e.id()).collect();
        assert_eq!(ids, vec!["a->s:e1:r", "a->t:e2:f"]);
    }

    #[test]
    fn test_adjacency_includes_isolated_nodes() {
        let residual = ResidualGraph::build(&make_graph());
        let nodes: Vec<&str> = residual.nodes().map(|n| n.as_str()).collect();
        assert_eq!(nodes, vec!["a", "s", "t", "z"]);
        assert_eq!(residual.outgoing("z").count(), 0);
        assert_eq!(residual.outgoing("a").count(), 2);
        assert_eq!(residual.outgoing("missing").count(), 0);
    }

    #[test]
    fn test_reachable_from() {
        let mut graph = make_graph();
        graph.edge_mut("e2").unwrap().set_flow(4);
        let residual = ResidualGraph::build(&graph);
        let reachable = residual.reachable_from(&NodeId::from("s"));
        let reachable: Vec<&str> = reachable.iter().map(|n| n.as_str()).collect();
        assert_eq!(reachable, vec!["a", "s"]);
    }

    #[test]
    fn test_build_is_deterministic() {
        let a = ResidualGraph::build(&make_graph());
        let b = ResidualGraph::build(&make_graph());
        assert_eq!(a.edges(), b.edges());
    }
}
