//! 图数据结构
//!
//! 引擎只读取经过校验的快照：每次运行都先深拷贝，调用方持有的图不会被修改

use super::edge::{Edge, EdgeId};
use super::node::{Node, NodeId};
use crate::error::{Error, Result};
use crate::types::{Capacity, NodeRole, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

/// 图格式版本
pub const GRAPH_FORMAT_VERSION: &str = "1.0";

/// 图元数据（与算法行为无关）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphMeta {
    pub version: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Default for GraphMeta {
    fn default() -> Self {
        Self {
            version: GRAPH_FORMAT_VERSION.to_string(),
            created_at: 0,
            updated_at: 0,
        }
    }
}

impl GraphMeta {
    /// 以当前时间创建元数据
    pub fn now() -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            version: GRAPH_FORMAT_VERSION.to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// 源点/汇点查询结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSink {
    /// 第一个源点（按 ID 排序）
    pub source: Option<NodeId>,
    /// 第一个汇点（按 ID 排序）
    pub sink: Option<NodeId>,
    pub source_count: usize,
    pub sink_count: usize,
}

/// 流网络
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Graph {
    /// 节点（按 ID 有序）
    #[serde(default)]
    nodes: BTreeMap<NodeId, Node>,
    /// 边（按 ID 有序）
    #[serde(default)]
    edges: BTreeMap<EdgeId, Edge>,
    /// 元数据
    #[serde(default)]
    meta: GraphMeta,
}

impl Graph {
    /// 创建空图
    pub fn new() -> Self {
        Self {
            nodes: BTreeMap::new(),
            edges: BTreeMap::new(),
            meta: GraphMeta::now(),
        }
    }

    /// 使用指定元数据创建空图
    pub fn with_meta(meta: GraphMeta) -> Self {
        Self {
            nodes: BTreeMap::new(),
            edges: BTreeMap::new(),
            meta,
        }
    }

    pub fn meta(&self) -> &GraphMeta {
        &self.meta
    }

    /// 刷新更新时间
    pub fn touch(&mut self) {
        self.meta.updated_at = chrono::Utc::now().timestamp_millis();
    }

    // ==================== 节点操作 ====================

    /// 添加节点
    pub fn add_node(&mut self, node: Node) -> Result<()> {
        if self.nodes.contains_key(node.id()) {
            return Err(Error::DuplicateNode(node.id().to_string()));
        }
        self.nodes.insert(node.id().clone(), node);
        Ok(())
    }

    /// 获取节点
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    /// 按 ID 顺序遍历节点
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// 按 ID 顺序遍历节点 ID
    pub fn node_ids(&self) -> impl Iterator<Item = &NodeId> {
        self.nodes.keys()
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    // ==================== 边操作 ====================

    /// 添加边
    ///
    /// 拒绝重复 ID、自环、未知端点以及同一有序节点对上的平行边。
    pub fn add_edge(&mut self, edge: Edge) -> Result<()> {
        if self.edges.contains_key(edge.id()) {
            return Err(Error::DuplicateEdge(edge.id().to_string()));
        }
        if edge.is_self_loop() {
            return Err(Error::InvalidGraph(format!("边 {} 是自环", edge.id())));
        }
        for endpoint in [edge.from(), edge.to()] {
            if !self.nodes.contains_key(endpoint) {
                return Err(Error::NodeNotFound(endpoint.to_string()));
            }
        }
        if self
            .edges
            .values()
            .any(|e| e.from() == edge.from() && e.to() == edge.to())
        {
            return Err(Error::DuplicateEdge(format!("{}->{}", edge.from(), edge.to())));
        }
        self.edges.insert(edge.id().clone(), edge);
        Ok(())
    }

    /// 获取边
    pub fn edge(&self, id: &str) -> Option<&Edge> {
        self.edges.get(id)
    }

    pub fn edge_mut(&mut self, id: &str) -> Option<&mut Edge> {
        self.edges.get_mut(id)
    }

    /// 删除边
    pub fn remove_edge(&mut self, id: &str) -> Result<Edge> {
        self.edges
            .remove(id)
            .ok_or_else(|| Error::EdgeNotFound(id.to_string()))
    }

    /// 按 ID 顺序遍历边
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// 节点的出边（按边 ID 顺序）
    pub fn outgoing_edges<'a>(&'a self, node: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.values().filter(move |e| e.from().as_str() == node)
    }

    /// 节点的入边（按边 ID 顺序）
    pub fn incoming_edges<'a>(&'a self, node: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.values().filter(move |e| e.to().as_str() == node)
    }

    // ==================== 流量 ====================

    /// 当前各边流量
    pub fn flows(&self) -> BTreeMap<EdgeId, Capacity> {
        self.edges
            .values()
            .map(|e| (e.id().clone(), e.flow()))
            .collect()
    }

    /// 所有流量清零
    pub fn reset_flows(&mut self) {
        for edge in self.edges.values_mut() {
            edge.set_flow(0);
        }
    }

    /// 源点净流出量
    pub fn source_outflow(&self, source: &str) -> Capacity {
        let out: Capacity = self.outgoing_edges(source).map(|e| e.flow()).sum();
        let back: Capacity = self.incoming_edges(source).map(|e| e.flow()).sum();
        out - back
    }

    /// 节点的流入减流出
    pub fn net_inflow(&self, node: &str) -> Capacity {
        let inflow: Capacity = self.incoming_edges(node).map(|e| e.flow()).sum();
        let outflow: Capacity = self.outgoing_edges(node).map(|e| e.flow()).sum();
        inflow - outflow
    }

    /// 复制一份图并用给定流量覆盖（截断到 [0, capacity]）
    pub fn with_flow_overrides(&self, flows: &BTreeMap<EdgeId, Capacity>) -> Graph {
        let mut cloned = self.clone();
        for edge in cloned.edges.values_mut() {
            if let Some(&flow) = flows.get(edge.id()) {
                let clamped = flow.min(edge.capacity()).max(0);
                edge.set_flow(clamped);
            }
        }
        cloned
    }

    // ==================== 校验 ====================

    /// 查找源点与汇点
    pub fn source_sink(&self) -> SourceSink {
        let sources: Vec<&NodeId> = self
            .nodes
            .values()
            .filter(|n| n.role() == NodeRole::Source)
            .map(|n| n.id())
            .collect();
        let sinks: Vec<&NodeId> = self
            .nodes
            .values()
            .filter(|n| n.role() == NodeRole::Sink)
            .map(|n| n.id())
            .collect();

        SourceSink {
            source: sources.first().map(|id| (*id).clone()),
            sink: sinks.first().map(|id| (*id).clone()),
            source_count: sources.len(),
            sink_count: sinks.len(),
        }
    }

    /// 列出所有违反运行前置条件的问题
    pub fn validation_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let roles = self.source_sink();

        if roles.source_count != 1 {
            errors.push(format!("需要恰好一个源点，实际 {} 个", roles.source_count));
        }
        if roles.sink_count != 1 {
            errors.push(format!("需要恰好一个汇点，实际 {} 个", roles.sink_count));
        }

        for (key, node) in &self.nodes {
            if key != node.id() {
                errors.push(format!("节点键 {} 与节点 ID {} 不一致", key, node.id()));
            }
        }

        let mut pairs: HashSet<(&NodeId, &NodeId)> = HashSet::new();
        let mut total_capacity: Option<Capacity> = Some(0);
        let mut flows_in_range = true;
        for (key, edge) in &self.edges {
            let id = edge.id();
            if key != id {
                errors.push(format!("边键 {} 与边 ID {} 不一致", key, id));
            }
            for endpoint in [edge.from(), edge.to()] {
                if !self.nodes.contains_key(endpoint) {
                    flows_in_range = false;
                    errors.push(format!("边 {} 引用了不存在的节点 {}", id, endpoint));
                }
            }
            if edge.is_self_loop() {
                errors.push(format!("边 {} 是自环", id));
            }
            if edge.capacity() < 0 {
                errors.push(format!("边 {} 的容量无效: {}", id, edge.capacity()));
            }
            if edge.flow() < 0 {
                flows_in_range = false;
                errors.push(format!("边 {} 的流量无效: {}", id, edge.flow()));
            }
            if edge.flow() > edge.capacity() {
                flows_in_range = false;
                errors.push(format!("边 {} 的流量超过容量", id));
            }
            if !pairs.insert((edge.from(), edge.to())) {
                errors.push(format!("重复的边 {}->{}", edge.from(), edge.to()));
            }
            total_capacity = total_capacity.and_then(|t| t.checked_add(edge.capacity().max(0)));
        }

        // 总容量有界时，流量值、余量与割容量都不会溢出
        if total_capacity.is_none() {
            errors.push(format!("边容量总和超过上限 {}", Capacity::MAX));
        } else if flows_in_range {
            for node in self.nodes.values().filter(|n| n.role() == NodeRole::Normal) {
                let net = self.net_inflow(node.id().as_str());
                if net != 0 {
                    errors.push(format!("节点 {} 的初始流量不守恒，净流入 {}", node.id(), net));
                }
            }
        }

        errors
    }

    /// 运行前校验，成功时返回 (源点, 汇点)
    pub fn validate_for_run(&self) -> Result<(NodeId, NodeId)> {
        let errors = self.validation_errors();
        if !errors.is_empty() {
            return Err(Error::InvalidGraph(errors.join("; ")));
        }
        let roles = self.source_sink();
        match (roles.source, roles.sink) {
            (Some(source), Some(sink)) => Ok((source, sink)),
            _ => Err(Error::InvalidGraph("缺少源点或汇点".to_string())),
        }
    }

    /// 只看正容量边（忽略流量）时，汇点是否可从源点到达
    pub fn has_path_candidate(&self, source: &str, sink: &str) -> bool {
        let mut adjacency: HashMap<&str, BTreeSet<&str>> = HashMap::new();
        for edge in self.edges.values() {
            if edge.capacity() <= 0 {
                continue;
            }
            adjacency
                .entry(edge.from().as_str())
                .or_default()
                .insert(edge.to().as_str());
        }

        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();
        visited.insert(source);
        queue.push_back(source);

        while let Some(current) = queue.pop_front() {
            if current == sink {
                return true;
            }
            if let Some(neighbors) = adjacency.get(current) {
                for &next in neighbors {
                    if visited.insert(next) {
                        queue.push_back(next);
                    }
                }
            }
        }

        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_diamond() -> Graph {
        let mut graph = Graph::new();
        graph.add_node(Node::source("s")).unwrap();
        graph.add_node(Node::normal("a")).unwrap();
        graph.add_node(Node::normal("b")).unwrap();
        graph.add_node(Node::sink("t")).unwrap();
        graph.add_edge(Edge::new("e1", "s", "a", 6)).unwrap();
        graph.add_edge(Edge::new("e2", "s", "b", 4)).unwrap();
        graph.add_edge(Edge::new("e3", "a", "b", 2)).unwrap();
        graph.add_edge(Edge::new("e4", "a", "t", 4)).unwrap();
        graph.add_edge(Edge::new("e5", "b", "t", 6)).unwrap();
        graph
    }

    #[test]
    fn test_add_edge_rejections() {
        let mut graph = create_diamond();
        assert!(matches!(
            graph.add_edge(Edge::new("e1", "b", "a", 1)),
            Err(Error::DuplicateEdge(_))
        ));
        assert!(matches!(
            graph.add_edge(Edge::new("e9", "a", "t", 1)),
            Err(Error::DuplicateEdge(_))
        ));
        assert!(matches!(
            graph.add_edge(Edge::new("e9", "a", "a", 1)),
            Err(Error::InvalidGraph(_))
        ));
        assert!(matches!(
            graph.add_edge(Edge::new("e9", "a", "x", 1)),
            Err(Error::NodeNotFound(_))
        ));
        // 反向边是另一个有序节点对
        assert!(graph.add_edge(Edge::new("e9", "b", "a", 1)).is_ok());
    }

    #[test]
    fn test_validate_ok() {
        let graph = create_diamond();
        assert!(graph.validation_errors().is_empty());
        let (s, t) = graph.validate_for_run().unwrap();
        assert_eq!(s.as_str(), "s");
        assert_eq!(t.as_str(), "t");
    }

    #[test]
    fn test_validate_reports_all_problems() {
        let mut graph = create_diamond();
        graph.node_mut("t").unwrap().set_role(NodeRole::Normal);
        graph.edge_mut("e1").unwrap().set_flow(9);
        graph.edge_mut("e2").unwrap().set_flow(-1);

        let errors = graph.validation_errors();
        assert_eq!(errors.len(), 3, "{:?}", errors);
        assert!(matches!(graph.validate_for_run(), Err(Error::InvalidGraph(_))));
    }

    #[test]
    fn test_validate_capacity_overflow() {
        let mut graph = Graph::new();
        graph.add_node(Node::source("s")).unwrap();
        graph.add_node(Node::normal("a")).unwrap();
        graph.add_node(Node::sink("t")).unwrap();
        graph.add_edge(Edge::new("e1", "s", "t", Capacity::MAX)).unwrap();
        graph.add_edge(Edge::new("e2", "s", "a", Capacity::MAX)).unwrap();
        graph.add_edge(Edge::new("e3", "a", "t", Capacity::MAX)).unwrap();

        let errors = graph.validation_errors();
        assert_eq!(errors.len(), 1, "{:?}", errors);
        assert!(errors[0].contains("容量总和"));
        assert!(matches!(graph.validate_for_run(), Err(Error::InvalidGraph(_))));

        // 单条最大容量边仍然合法
        graph.remove_edge("e2").unwrap();
        graph.remove_edge("e3").unwrap();
        assert!(graph.validation_errors().is_empty());
    }

    #[test]
    fn test_validate_initial_flow_conservation() {
        let mut graph = create_diamond();
        graph.edge_mut("e1").unwrap().set_flow(3);
        let errors = graph.validation_errors();
        assert_eq!(errors.len(), 1, "{:?}", errors);
        assert!(errors[0].contains("节点 a"));

        graph.edge_mut("e4").unwrap().set_flow(3);
        assert!(graph.validation_errors().is_empty());

        // 源点和汇点不要求守恒
        graph.edge_mut("e1").unwrap().set_flow(0);
        graph.edge_mut("e4").unwrap().set_flow(0);
        graph.edge_mut("e2").unwrap().set_flow(2);
        graph.edge_mut("e5").unwrap().set_flow(2);
        assert!(graph.validation_errors().is_empty());
    }

    #[test]
    fn test_validate_two_sources() {
        let mut graph = create_diamond();
        graph.node_mut("a").unwrap().set_role(NodeRole::Source);
        let roles = graph.source_sink();
        assert_eq!(roles.source_count, 2);
        assert_eq!(roles.source.unwrap().as_str(), "a");
        assert!(graph.validate_for_run().is_err());
    }

    #[test]
    fn test_validate_deserialized_self_loop() {
        let json = r#"{
            "nodes": {"s": {"id": "s", "role": "source"}, "t": {"id": "t", "role": "sink"}},
            "edges": {"e1": {"id": "e1", "from": "s", "to": "s", "capacity": 1}}
        }"#;
        let graph: Graph = serde_json::from_str(json).unwrap();
        let errors = graph.validation_errors();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("自环"));
    }

    #[test]
    fn test_flow_helpers() {
        let mut graph = create_diamond();
        graph.edge_mut("e1").unwrap().set_flow(4);
        graph.edge_mut("e4").unwrap().set_flow(4);
        assert_eq!(graph.source_outflow("s"), 4);
        assert_eq!(graph.net_inflow("a"), 0);
        assert_eq!(graph.net_inflow("t"), 4);

        let mut overrides = BTreeMap::new();
        overrides.insert(EdgeId::from("e2"), 99);
        overrides.insert(EdgeId::from("e3"), -3);
        let overridden = graph.with_flow_overrides(&overrides);
        assert_eq!(overridden.edge("e2").unwrap().flow(), 4);
        assert_eq!(overridden.edge("e3").unwrap().flow(), 0);
        // 原图不变
        assert_eq!(graph.edge("e2").unwrap().flow(), 0);

        graph.reset_flows();
        assert!(graph.flows().values().all(|&f| f == 0));
    }

    #[test]
    fn test_has_path_candidate() {
        let mut graph = create_diamond();
        assert!(graph.has_path_candidate("s", "t"));
        graph.edge_mut("e4").unwrap().set_capacity(0);
        graph.edge_mut("e5").unwrap().set_capacity(0);
        assert!(!graph.has_path_candidate("s", "t"));
    }

    #[test]
    fn test_clone_is_independent() {
        let graph = create_diamond();
        let mut copy = graph.clone();
        copy.edge_mut("e1").unwrap().set_flow(6);
        assert_eq!(graph.edge("e1").unwrap().flow(), 0);
    }
}
