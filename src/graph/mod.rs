//! 图核心模块
//!
//! 定义节点、边和流网络的核心数据结构

mod edge;
mod graph;
mod node;

pub use edge::{Edge, EdgeId};
pub use graph::{Graph, GraphMeta, SourceSink, GRAPH_FORMAT_VERSION};
pub use node::{Node, NodeId};
