//! 边定义
//!
//! 有向带容量边，携带当前流量

use crate::graph::node::NodeId;
use crate::types::Capacity;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// 边 ID（图内唯一）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeId(String);

impl EdgeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EdgeId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for EdgeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Borrow<str> for EdgeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn directed_marker() -> bool {
    true
}

/// 边
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    /// 边 ID
    id: EdgeId,
    /// 起点
    from: NodeId,
    /// 终点
    to: NodeId,
    /// 容量
    capacity: Capacity,
    /// 当前流量
    #[serde(default)]
    flow: Capacity,
    /// 有向标记（无向边不建模）
    #[serde(default = "directed_marker")]
    directed: bool,
    /// 显示标签
    #[serde(default, skip_serializing_if = "Option::is_none")]
    label: Option<String>,
}

impl Edge {
    /// 创建新边，初始流量为 0
    pub fn new(
        id: impl Into<EdgeId>,
        from: impl Into<NodeId>,
        to: impl Into<NodeId>,
        capacity: Capacity,
    ) -> Self {
        Self {
            id: id.into(),
            from: from.into(),
            to: to.into(),
            capacity,
            flow: 0,
            directed: true,
            label: None,
        }
    }

    /// 设置初始流量
    pub fn with_flow(mut self, flow: Capacity) -> Self {
        self.flow = flow;
        self
    }

    /// 设置标签
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn id(&self) -> &EdgeId {
        &self.id
    }

    pub fn from(&self) -> &NodeId {
        &self.from
    }

    pub fn to(&self) -> &NodeId {
        &self.to
    }

    pub fn capacity(&self) -> Capacity {
        self.capacity
    }

    pub fn flow(&self) -> Capacity {
        self.flow
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn is_directed(&self) -> bool {
        self.directed
    }

    pub fn set_flow(&mut self, flow: Capacity) {
        self.flow = flow;
    }

    pub fn set_capacity(&mut self, capacity: Capacity) {
        self.capacity = capacity;
    }

    /// 正向残量
    pub fn forward_residual(&self) -> Capacity {
        self.capacity - self.flow
    }

    /// 是否饱和
    pub fn is_saturated(&self) -> bool {
        self.capacity > 0 && self.flow == self.capacity
    }

    /// 是否为自环
    pub fn is_self_loop(&self) -> bool {
        self.from == self.to
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_residual() {
        let e = Edge::new("e1", "s", "a", 5).with_flow(3);
        assert_eq!(e.forward_residual(), 2);
        assert!(!e.is_saturated());

        let full = Edge::new("e2", "a", "t", 4).with_flow(4);
        assert_eq!(full.forward_residual(), 0);
        assert!(full.is_saturated());
    }

    #[test]
    fn test_edge_serialization() {
        let e = Edge::new("e1", "s", "t", 7);
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["from"], "s");
        assert_eq!(json["directed"], true);
        assert!(json.get("label").is_none());

        let restored: Edge =
            serde_json::from_str(r#"{"id":"e1","from":"s","to":"t","capacity":7}"#).unwrap();
        assert_eq!(restored, e);
    }

    #[test]
    fn test_self_loop() {
        assert!(Edge::new("e", "a", "a", 1).is_self_loop());
        assert!(!Edge::new("e", "a", "b", 1).is_self_loop());
    }
}
