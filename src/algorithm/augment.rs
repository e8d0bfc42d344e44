//! 运行上下文与增广操作
//!
//! 三种算法共用：输入图深拷贝、前置条件校验、事件记录、沿残量边修改原始边流量、
//! 收尾时的最小割计算。

use super::min_cut::compute_min_cut;
use super::residual::ResidualEdge;
use super::{AlgorithmId, RunOptions, RunResult};
use crate::error::{Error, Result};
use crate::event::{FlowEvent, FlowUpdate, PathSegment};
use crate::graph::{Graph, NodeId};
use crate::types::{Capacity, Clock};
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

/// 单次运行独占的状态
pub(crate) struct RunContext {
    pub algorithm: AlgorithmId,
    /// 输入图的独占副本
    pub graph: Graph,
    pub events: Vec<FlowEvent>,
    pub source: NodeId,
    pub sink: NodeId,
    clock: Arc<dyn Clock>,
}

impl RunContext {
    /// 复制输入图、记录 `ALGORITHM_SELECTED` 并校验前置条件
    ///
    /// 校验失败时返回零流量结果，事件日志为 `ALGORITHM_SELECTED` 加一个 `ERROR`。
    pub fn begin(
        algorithm: AlgorithmId,
        input: &Graph,
        options: &RunOptions,
    ) -> std::result::Result<Self, RunResult> {
        let graph = input.clone();
        let mut events = vec![FlowEvent::AlgorithmSelected { algorithm }];

        match graph.validate_for_run() {
            Ok((source, sink)) => {
                debug!(
                    algorithm = %algorithm,
                    nodes = graph.node_count(),
                    edges = graph.edge_count(),
                    max_steps = options.max_steps,
                    "开始运行最大流算法"
                );
                Ok(Self {
                    algorithm,
                    graph,
                    events,
                    source,
                    sink,
                    clock: options.clock.clone(),
                })
            }
            Err(err) => {
                warn!(algorithm = %algorithm, error = %err, "图未通过运行前校验");
                events.push(FlowEvent::error(&err));
                Err(RunResult {
                    algorithm,
                    max_flow_value: 0,
                    graph,
                    events,
                    min_cut: None,
                })
            }
        }
    }

    /// 追加事件
    pub fn emit(&mut self, event: FlowEvent) {
        trace!(algorithm = %self.algorithm, index = self.events.len(), "{}", event);
        self.events.push(event);
    }

    /// 追加 `RUN_START`
    pub fn run_start(&mut self) {
        let event = FlowEvent::RunStart {
            source: self.source.clone(),
            sink: self.sink.clone(),
            timestamp: self.clock.now_millis(),
        };
        self.emit(event);
    }

    /// 追加 `ERROR`，运行继续收尾
    pub fn emit_error(&mut self, err: &Error) {
        warn!(algorithm = %self.algorithm, error = %err, "运行提前结束");
        self.emit(FlowEvent::error(err));
    }

    /// 不变式被破坏：追加 `ERROR` 后立即返回，不计算最小割
    pub fn abort(mut self, err: Error, max_flow: Capacity) -> RunResult {
        warn!(algorithm = %self.algorithm, error = %err, max_flow, "运行中止");
        self.emit(FlowEvent::error(&err));
        RunResult {
            algorithm: self.algorithm,
            max_flow_value: max_flow,
            graph: self.graph,
            events: self.events,
            min_cut: None,
        }
    }

    /// 计算最小割并追加 `MINCUT_COMPUTED`、`RUN_END`
    pub fn finish(mut self, max_flow: Capacity) -> RunResult {
        let min_cut = compute_min_cut(&self.graph, self.source.as_str());
        self.emit(FlowEvent::MincutComputed {
            reachable: min_cut.reachable.clone(),
            cut_edges: min_cut.cut_edges.clone(),
            cut_capacity: min_cut.cut_capacity,
        });
        let timestamp = self.clock.now_millis();
        self.emit(FlowEvent::RunEnd {
            max_flow,
            timestamp,
        });

        info!(
            algorithm = %self.algorithm,
            max_flow,
            cut_capacity = min_cut.cut_capacity,
            events = self.events.len(),
            "最大流运行完成"
        );

        RunResult {
            algorithm: self.algorithm,
            max_flow_value: max_flow,
            graph: self.graph,
            events: self.events,
            min_cut: Some(min_cut),
        }
    }

    /// 沿一条残量边推送 `delta`：正向边增加原始边流量，反向边减少
    pub fn apply_segment(&mut self, segment: &ResidualEdge, delta: Capacity) -> Result<FlowUpdate> {
        let edge = self
            .graph
            .edge_mut(segment.original_edge_id.as_str())
            .ok_or_else(|| Error::EdgeNotFound(segment.original_edge_id.to_string()))?;

        let new_flow = if segment.is_reverse {
            edge.flow() - delta
        } else {
            edge.flow() + delta
        };

        if new_flow < 0 {
            return Err(Error::InvariantViolation(format!(
                "边 {} 出现负流量",
                edge.id()
            )));
        }
        if new_flow > edge.capacity() {
            return Err(Error::InvariantViolation(format!(
                "边 {} 的流量超过容量",
                edge.id()
            )));
        }

        edge.set_flow(new_flow);
        Ok(FlowUpdate {
            edge_id: edge.id().clone(),
            new_flow,
        })
    }

    /// 沿整条增广路径推送瓶颈值
    pub fn apply_path(
        &mut self,
        path: &[ResidualEdge],
        bottleneck: Capacity,
    ) -> Result<Vec<FlowUpdate>> {
        path.iter()
            .map(|segment| self.apply_segment(segment, bottleneck))
            .collect()
    }
}

/// 路径上的最小残量
pub(crate) fn bottleneck(path: &[ResidualEdge]) -> Capacity {
    path.iter()
        .map(|segment| segment.residual_capacity)
        .min()
        .unwrap_or(0)
}

/// 转换为事件中的路径段
pub(crate) fn path_segments(path: &[ResidualEdge]) -> Vec<PathSegment> {
    path.iter()
        .map(|segment| PathSegment {
            from: segment.from.clone(),
            to: segment.to.clone(),
            is_reverse: segment.is_reverse,
            original_edge_id: segment.original_edge_id.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::{parallel_paths, single_edge};
    use super::*;
    use crate::graph::{EdgeId, Node};
    use crate::types::FixedClock;

    fn residual(from: &str, to: &str, edge: &str, cap: Capacity, reverse: bool) -> ResidualEdge {
        ResidualEdge {
            from: NodeId::from(from),
            to: NodeId::from(to),
            residual_capacity: cap,
            original_edge_id: EdgeId::from(edge),
            is_reverse: reverse,
        }
    }

    fn context(graph: &Graph) -> RunContext {
        match RunContext::begin(
            AlgorithmId::EdmondsKarp,
            graph,
            &RunOptions::new().with_clock(FixedClock(5)),
        ) {
            Ok(ctx) => ctx,
            Err(result) => panic!("unexpected failure: {:?}", result.error()),
        }
    }

    #[test]
    fn test_begin_rejects_invalid_graph() {
        let mut graph = single_edge();
        graph.add_node(Node::sink("t2")).unwrap();

        let result = match RunContext::begin(AlgorithmId::Dinic, &graph, &RunOptions::new()) {
            Ok(_) => panic!("validation should fail"),
            Err(result) => result,
        };
        assert_eq!(result.max_flow_value, 0);
        assert_eq!(result.events.len(), 2);
        assert!(result.events[1].is_error());
        assert!(result.min_cut.is_none());
    }

    #[test]
    fn test_apply_segment_forward_and_reverse() {
        let mut ctx = context(&single_edge());
        let update = ctx
            .apply_segment(&residual("s", "t", "e1", 7, false), 4)
            .unwrap();
        assert_eq!(update.new_flow, 4);

        let update = ctx
            .apply_segment(&residual("t", "s", "e1", 4, true), 3)
            .unwrap();
        assert_eq!(update.new_flow, 1);
        assert_eq!(ctx.graph.edge("e1").unwrap().flow(), 1);
    }

    #[test]
    fn test_apply_segment_invariant_violations() {
        let mut ctx = context(&single_edge());
        assert!(matches!(
            ctx.apply_segment(&residual("t", "s", "e1", 1, true), 1),
            Err(Error::InvariantViolation(_))
        ));
        assert!(matches!(
            ctx.apply_segment(&residual("s", "t", "e1", 8, false), 8),
            Err(Error::InvariantViolation(_))
        ));
        assert!(matches!(
            ctx.apply_segment(&residual("s", "t", "nope", 1, false), 1),
            Err(Error::EdgeNotFound(_))
        ));
        // 失败的推送不修改流量
        assert_eq!(ctx.graph.edge("e1").unwrap().flow(), 0);
    }

    #[test]
    fn test_abort_keeps_partial_value() {
        let mut ctx = context(&parallel_paths());
        ctx.run_start();
        let result = ctx.abort(Error::InvariantViolation("x".to_string()), 5);
        assert_eq!(result.max_flow_value, 5);
        assert!(result.min_cut.is_none());
        assert!(result.events.last().unwrap().is_error());
    }

    #[test]
    fn test_bottleneck_and_segments() {
        let path = vec![
            residual("s", "a", "e1", 5, false),
            residual("a", "t", "e2", 3, false),
        ];
        assert_eq!(bottleneck(&path), 3);
        let segments = path_segments(&path);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[1].original_edge_id.as_str(), "e2");
    }
}
