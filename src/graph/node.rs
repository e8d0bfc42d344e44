//! 节点定义
//!
//! 流网络中的节点：普通节点、源点、汇点

use crate::types::NodeRole;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// 节点 ID（图内唯一）
///
/// 按字节序比较；残量图排序、可达集输出等所有确定性顺序都依赖该比较。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Borrow<str> for NodeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 节点
///
/// `label`、`x`、`y` 只用于展示，算法不读取。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// 节点 ID
    id: NodeId,
    /// 显示标签
    #[serde(default)]
    label: String,
    /// 画布坐标
    #[serde(default)]
    x: f64,
    #[serde(default)]
    y: f64,
    /// 角色
    #[serde(default)]
    role: NodeRole,
}

impl Node {
    /// 创建新节点，标签默认与 ID 相同
    pub fn new(id: impl Into<NodeId>, role: NodeRole) -> Self {
        let id = id.into();
        Self {
            label: id.as_str().to_string(),
            id,
            x: 0.0,
            y: 0.0,
            role,
        }
    }

    /// 创建源点
    pub fn source(id: impl Into<NodeId>) -> Self {
        Self::new(id, NodeRole::Source)
    }

    /// 创建汇点
    pub fn sink(id: impl Into<NodeId>) -> Self {
        Self::new(id, NodeRole::Sink)
    }

    /// 创建普通节点
    pub fn normal(id: impl Into<NodeId>) -> Self {
        Self::new(id, NodeRole::Normal)
    }

    /// 设置标签
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// 设置坐标
    pub fn with_position(mut self, x: f64, y: f64) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    pub fn id(&self) -> &NodeId {
        &self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn position(&self) -> (f64, f64) {
        (self.x, self.y)
    }

    pub fn role(&self) -> NodeRole {
        self.role
    }

    pub fn set_role(&mut self, role: NodeRole) {
        self.role = role;
    }

    pub fn is_source(&self) -> bool {
        self.role == NodeRole::Source
    }

    pub fn is_sink(&self) -> bool {
        self.role == NodeRole::Sink
    }
}
