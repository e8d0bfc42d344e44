//! FlowLab - 可视化最大流 / 最小割引擎
//!
//! 支持：
//! - 三种最大流算法（Edmonds-Karp、Dinic、Push-Relabel），共享残量图
//! - 每一步操作的确定性事件日志
//! - 基于快照的事件回放，可随机定位到任意步骤
//! - 图的 JSON / CSV 导入导出、命令行与 HTTP API

pub mod algorithm;
pub mod cli;
pub mod error;
pub mod event;
pub mod graph;
pub mod import;
pub mod metrics;
pub mod playback;
pub mod server;
pub mod types;

// 重导出常用类型
pub use algorithm::{
    compare_algorithms, compute_min_cut, run_max_flow, AlgorithmId, MaxFlowAlgorithm, MinCut,
    RunOptions, RunResult,
};
pub use error::{Error, Result};
pub use event::{FlowEvent, FlowUpdate, PathSegment};
pub use graph::{Edge, EdgeId, Graph, Node, NodeId};
pub use playback::{apply_event, build_cache, state_at, Playback, PlaybackCache, PlaybackState};
pub use types::{Capacity, Clock, FixedClock, NodeRole, SystemClock, Timestamp};

/// 库版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
