//! 事件回放
//!
//! 把事件日志折叠成任意游标位置的可视状态。一次前向扫描每隔 `interval`
//! 个事件保存一份完整快照；查询游标 C 时从 C 之前最近的快照出发，最多折叠 `interval` 个事件。
//!
//! 折叠函数 [`apply_event`] 是纯函数，对任何事件都有定义，未知事件为空操作。

use crate::event::{FlowEvent, PathSegment};
use crate::graph::{EdgeId, Graph, NodeId};
use crate::types::Capacity;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// 默认快照间隔
pub const DEFAULT_SNAPSHOT_INTERVAL: usize = 50;

/// 回放状态
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackState {
    /// 最后一个已应用事件的下标，基线为 -1
    pub cursor: i64,
    pub is_running: bool,
    pub highlighted_nodes: BTreeSet<NodeId>,
    pub highlighted_edges: BTreeSet<EdgeId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_augmenting_path: Option<Vec<PathSegment>>,
    pub current_max_flow: Capacity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reachable_cut: Option<BTreeSet<NodeId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cut_edges: Option<BTreeSet<EdgeId>>,
    pub edge_flows: BTreeMap<EdgeId, Capacity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            cursor: -1,
            is_running: false,
            highlighted_nodes: BTreeSet::new(),
            highlighted_edges: BTreeSet::new(),
            last_augmenting_path: None,
            current_max_flow: 0,
            reachable_cut: None,
            cut_edges: None,
            edge_flows: BTreeMap::new(),
            error: None,
        }
    }
}

impl PlaybackState {
    /// 基线状态
    pub fn initial(flows: BTreeMap<EdgeId, Capacity>) -> Self {
        Self {
            edge_flows: flows,
            ..Default::default()
        }
    }

    /// 以图的当前流量为基线
    pub fn from_graph(graph: &Graph) -> Self {
        Self::initial(graph.flows())
    }

    fn clear_highlights(&mut self) {
        self.highlighted_nodes.clear();
        self.highlighted_edges.clear();
    }
}

/// 把一个事件应用到状态上，返回新状态
pub fn apply_event(state: &PlaybackState, event: &FlowEvent) -> PlaybackState {
    let mut next = state.clone();
    next.cursor += 1;

    match event {
        FlowEvent::RunStart { .. } => {
            next.is_running = true;
            next.error = None;
            next.clear_highlights();
        }
        FlowEvent::BfsStart { .. } | FlowEvent::DinicLevelGraphBuilt { .. } => {
            next.clear_highlights();
        }
        FlowEvent::BfsVisitNode { node } => {
            next.highlighted_nodes.insert(node.clone());
        }
        FlowEvent::BfsDiscoverEdge {
            original_edge_id, ..
        } => {
            next.highlighted_edges.insert(original_edge_id.clone());
        }
        FlowEvent::AugmentingPathFound { path, .. } => {
            next.highlighted_edges = path.iter().map(|s| s.original_edge_id.clone()).collect();
            next.last_augmenting_path = Some(path.clone());
        }
        FlowEvent::AugmentApply { updates, .. } => {
            for update in updates {
                next.edge_flows.insert(update.edge_id.clone(), update.new_flow);
            }
        }
        FlowEvent::IterationEnd {
            current_max_flow, ..
        } => {
            next.current_max_flow = *current_max_flow;
        }
        FlowEvent::NoMorePaths { max_flow, .. } => {
            next.current_max_flow = *max_flow;
        }
        FlowEvent::PushRelabelPush {
            from,
            to,
            original_edge_id,
            ..
        } => {
            next.highlighted_edges = BTreeSet::from([original_edge_id.clone()]);
            next.highlighted_nodes = BTreeSet::from([from.clone(), to.clone()]);
        }
        FlowEvent::PushRelabelRelabel { node, .. } => {
            next.highlighted_nodes = BTreeSet::from([node.clone()]);
        }
        FlowEvent::MincutComputed {
            reachable,
            cut_edges,
            ..
        } => {
            next.reachable_cut = Some(reachable.iter().cloned().collect());
            next.cut_edges = Some(cut_edges.iter().cloned().collect());
        }
        FlowEvent::RunEnd { .. } => {
            next.is_running = false;
        }
        FlowEvent::Error { message } => {
            next.is_running = false;
            next.error = Some(message.clone());
        }
        FlowEvent::AlgorithmSelected { .. }
        | FlowEvent::ResidualBuilt { .. }
        | FlowEvent::DinicBlockingFlowEnd { .. }
        | FlowEvent::PushRelabelInit { .. }
        | FlowEvent::Unknown => {}
    }

    next
}

/// 快照缓存：键为快照所在游标（-1 为基线）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackCache {
    snapshots: BTreeMap<i64, PlaybackState>,
    interval: usize,
}

impl PlaybackCache {
    pub fn interval(&self) -> usize {
        self.interval
    }

    pub fn snapshot_count(&self) -> usize {
        self.snapshots.len()
    }

    /// 基线状态
    pub fn baseline(&self) -> Option<&PlaybackState> {
        self.snapshots.get(&-1)
    }
}

/// 前向扫描一次，每 `interval` 个事件保存一份快照
pub fn build_cache(
    events: &[FlowEvent],
    initial: &PlaybackState,
    interval: usize,
) -> PlaybackCache {
    let interval = interval.max(1);
    let mut snapshots = BTreeMap::new();
    let mut baseline = initial.clone();
    baseline.cursor = -1;
    snapshots.insert(-1, baseline.clone());

    let mut state = baseline;
    for (index, event) in events.iter().enumerate() {
        state = apply_event(&state, event);
        if (index + 1) % interval == 0 {
            snapshots.insert(index as i64, state.clone());
        }
    }

    PlaybackCache {
        snapshots,
        interval,
    }
}

/// 游标 `cursor` 处的状态
///
/// `cursor < 0` 返回基线；超出日志末尾时截断到最后一个事件。
pub fn state_at(events: &[FlowEvent], cache: &PlaybackCache, cursor: i64) -> PlaybackState {
    let last = events.len() as i64 - 1;
    let cursor = cursor.min(last);

    let Some((&start, snapshot)) = cache.snapshots.range(..=cursor).next_back() else {
        return cache.baseline().cloned().unwrap_or_default();
    };

    let mut state = snapshot.clone();
    let from = (start + 1) as usize;
    let to = (cursor + 1) as usize;
    for event in &events[from..to] {
        state = apply_event(&state, event);
    }
    state
}

/// 持有事件日志和快照缓存的回放器
#[derive(Debug, Clone)]
pub struct Playback {
    events: Vec<FlowEvent>,
    cache: PlaybackCache,
}

impl Playback {
    pub fn new(events: Vec<FlowEvent>, initial: &PlaybackState, interval: usize) -> Self {
        let cache = build_cache(&events, initial, interval);
        Self { events, cache }
    }

    /// 以图的当前流量为基线、默认快照间隔
    pub fn from_run(graph: &Graph, events: Vec<FlowEvent>) -> Self {
        Self::new(
            events,
            &PlaybackState::from_graph(graph),
            DEFAULT_SNAPSHOT_INTERVAL,
        )
    }

    pub fn events(&self) -> &[FlowEvent] {
        &self.events
    }

    pub fn cache(&self) -> &PlaybackCache {
        &self.cache
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn state_at(&self, cursor: i64) -> PlaybackState {
        state_at(&self.events, &self.cache, cursor)
    }

    /// 全部事件应用后的状态
    pub fn final_state(&self) -> PlaybackState {
        self.state_at(self.events.len() as i64 - 1)
    }
}
