//! Push-Relabel 最大流算法（FIFO 活跃队列）
//!
//! 源点高度为节点数，其余为 0；初始化时饱和源点的全部出边，
//! 之后反复取出活跃节点，沿可容许边（高度恰好低 1）推送超额流，无可推送时重标记。

use super::augment::RunContext;
use super::residual::ResidualGraph;
use super::{AlgorithmId, MaxFlowAlgorithm, RunOptions, RunResult};
use crate::error::{Error, Result};
use crate::event::{FlowEvent, FlowUpdate};
use crate::graph::{EdgeId, Graph, NodeId};
use crate::types::Capacity;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use tracing::debug;

/// Push-Relabel
#[derive(Debug, Clone, Copy, Default)]
pub struct PushRelabel;

/// FIFO 活跃节点队列，源点和汇点永不入队
struct ActiveQueue {
    queue: VecDeque<NodeId>,
    members: BTreeSet<NodeId>,
    source: NodeId,
    sink: NodeId,
}

impl ActiveQueue {
    fn new(source: NodeId, sink: NodeId) -> Self {
        Self {
            queue: VecDeque::new(),
            members: BTreeSet::new(),
            source,
            sink,
        }
    }

    fn push(&mut self, node: &NodeId) {
        if node == &self.source || node == &self.sink || self.members.contains(node) {
            return;
        }
        self.queue.push_back(node.clone());
        self.members.insert(node.clone());
    }

    fn pop(&mut self) -> Option<NodeId> {
        let node = self.queue.pop_front()?;
        self.members.remove(&node);
        Some(node)
    }

    fn len(&self) -> usize {
        self.queue.len()
    }
}

impl MaxFlowAlgorithm for PushRelabel {
    fn id(&self) -> AlgorithmId {
        AlgorithmId::PushRelabel
    }

    fn run(&self, graph: &Graph, options: &RunOptions) -> RunResult {
        let mut ctx = match RunContext::begin(self.id(), graph, options) {
            Ok(ctx) => ctx,
            Err(result) => return result,
        };
        let source = ctx.source.clone();
        let sink = ctx.sink.clone();
        let max_steps = options.max_steps;

        let mut height: BTreeMap<NodeId, i64> = BTreeMap::new();
        let mut excess: BTreeMap<NodeId, Capacity> = BTreeMap::new();
        for id in ctx.graph.node_ids() {
            height.insert(id.clone(), 0);
            let initial = if id == &source {
                0
            } else {
                ctx.graph.net_inflow(id.as_str())
            };
            excess.insert(id.clone(), initial);
        }
        height.insert(source.clone(), ctx.graph.node_count() as i64);

        let mut current_max_flow = ctx.graph.source_outflow(source.as_str());
        let mut iteration: u64 = 1;
        let mut operations: u64 = 0;
        let mut active = ActiveQueue::new(source.clone(), sink.clone());

        ctx.run_start();

        // 饱和源点出边（按边 ID 顺序），已有流量只补足剩余部分
        let saturations: Vec<(EdgeId, NodeId, Capacity)> = ctx
            .graph
            .outgoing_edges(source.as_str())
            .filter(|edge| edge.capacity() > 0)
            .map(|edge| (edge.id().clone(), edge.to().clone(), edge.forward_residual()))
            .collect();

        for (edge_id, to, delta) in saturations {
            if delta <= 0 {
                continue;
            }
            let Some(edge) = ctx.graph.edge_mut(edge_id.as_str()) else {
                return ctx.abort(Error::EdgeNotFound(edge_id.to_string()), current_max_flow);
            };
            let new_flow = edge.capacity();
            edge.set_flow(new_flow);

            *excess.entry(source.clone()).or_default() -= delta;
            *excess.entry(to.clone()).or_default() += delta;
            current_max_flow = ctx.graph.source_outflow(source.as_str());

            ctx.emit(FlowEvent::PushRelabelPush {
                from: source.clone(),
                to: to.clone(),
                delta,
                is_reverse: false,
                original_edge_id: edge_id.clone(),
            });
            ctx.emit(FlowEvent::AugmentApply {
                delta,
                updates: vec![FlowUpdate {
                    edge_id,
                    new_flow,
                }],
            });
            ctx.emit(FlowEvent::IterationEnd {
                iteration,
                current_max_flow,
            });
            iteration += 1;
            operations += 1;

            if operations > max_steps {
                break;
            }
            if excess.get(&to).copied().unwrap_or(0) > 0 {
                active.push(&to);
            }
        }

        ctx.emit(FlowEvent::PushRelabelInit {
            active_nodes: active.len(),
        });

        while operations <= max_steps {
            let Some(node) = active.pop() else {
                break;
            };
            if excess.get(&node).copied().unwrap_or(0) <= 0 {
                continue;
            }

            while excess.get(&node).copied().unwrap_or(0) > 0 && operations <= max_steps {
                let residual = ResidualGraph::build(&ctx.graph);
                ctx.emit(FlowEvent::ResidualBuilt {
                    residual_edge_count: residual.len(),
                });

                let node_height = height.get(&node).copied().unwrap_or(0);
                let mut pushed = false;

                for candidate in residual.outgoing(node.as_str()) {
                    let node_excess = excess.get(&node).copied().unwrap_or(0);
                    if node_excess <= 0 {
                        break;
                    }
                    let target_height = height.get(&candidate.to).copied().unwrap_or(0);
                    if node_height != target_height + 1 {
                        continue;
                    }

                    let delta = node_excess.min(candidate.residual_capacity);
                    if delta <= 0 {
                        continue;
                    }

                    let update = match ctx.apply_segment(candidate, delta) {
                        Ok(update) => update,
                        Err(err) => return ctx.abort(err, current_max_flow),
                    };

                    *excess.entry(node.clone()).or_default() -= delta;
                    *excess.entry(candidate.to.clone()).or_default() += delta;
                    current_max_flow = ctx.graph.source_outflow(source.as_str());

                    ctx.emit(FlowEvent::PushRelabelPush {
                        from: candidate.from.clone(),
                        to: candidate.to.clone(),
                        delta,
                        is_reverse: candidate.is_reverse,
                        original_edge_id: candidate.original_edge_id.clone(),
                    });
                    ctx.emit(FlowEvent::AugmentApply {
                        delta,
                        updates: vec![update],
                    });
                    ctx.emit(FlowEvent::IterationEnd {
                        iteration,
                        current_max_flow,
                    });
                    iteration += 1;
                    operations += 1;
                    pushed = true;

                    if excess.get(&candidate.to).copied().unwrap_or(0) > 0 {
                        active.push(&candidate.to);
                    }
                    if operations > max_steps {
                        break;
                    }
                }

                if operations > max_steps {
                    break;
                }
                if pushed {
                    continue;
                }

                let new_height = match relabel_height(&residual, &height, &node) {
                    Ok(new_height) => new_height,
                    Err(err) => return ctx.abort(err, current_max_flow),
                };
                debug!(node = %node, new_height, "重标记");
                height.insert(node.clone(), new_height);
                ctx.emit(FlowEvent::PushRelabelRelabel {
                    node: node.clone(),
                    new_height,
                });
                operations += 1;
            }

            if excess.get(&node).copied().unwrap_or(0) > 0 {
                active.push(&node);
            }
        }

        if operations > max_steps {
            ctx.emit_error(&Error::StepLimitExceeded(max_steps));
        } else {
            current_max_flow = ctx.graph.source_outflow(source.as_str());
            ctx.emit(FlowEvent::NoMorePaths {
                iteration,
                max_flow: current_max_flow,
            });
        }

        ctx.finish(current_max_flow)
    }
}

/// 重标记目标：正残量邻居的最小高度加一
///
/// 有超额流量的节点没有任何残量出边时返回 `InvariantViolation`。
fn relabel_height(
    residual: &ResidualGraph,
    height: &BTreeMap<NodeId, i64>,
    node: &NodeId,
) -> Result<i64> {
    residual
        .outgoing(node.as_str())
        .filter(|edge| edge.residual_capacity > 0)
        .map(|edge| height.get(&edge.to).copied().unwrap_or(0))
        .min()
        .map(|lowest| lowest + 1)
        .ok_or_else(|| {
            Error::InvariantViolation(format!("节点 {} 有超额流量但没有任何残量出边", node))
        })
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use super::*;
    use crate::graph::{Edge, Node};
    use crate::types::FixedClock;

    fn run(graph: &Graph) -> RunResult {
        PushRelabel.run(graph, &RunOptions::new().with_clock(FixedClock(9)))
    }

    #[test]
    fn test_single_edge() {
        let result = run(&single_edge());
        assert_eq!(result.max_flow_value, 7);
        let kinds: Vec<&str> = result.events.iter().map(|e| e.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                "ALGORITHM_SELECTED",
                "RUN_START",
                "PUSH_RELABEL_PUSH",
                "AUGMENT_APPLY",
                "ITERATION_END",
                "PUSH_RELABEL_INIT",
                "NO_MORE_PATHS",
                "MINCUT_COMPUTED",
                "RUN_END",
            ]
        );
    }

    #[test]
    fn test_initial_saturation_order() {
        let result = run(&diamond());
        let initial: Vec<(String, i64)> = result
            .events
            .iter()
            .take_while(|e| e.kind() != "PUSH_RELABEL_INIT")
            .filter_map(|e| match e {
                FlowEvent::PushRelabelPush {
                    original_edge_id,
                    delta,
                    ..
                } => Some((original_edge_id.to_string(), *delta)),
                _ => None,
            })
            .collect();
        assert_eq!(
            initial,
            vec![("e1".to_string(), 6), ("e2".to_string(), 4)]
        );
        assert!(result.events.iter().any(|e| matches!(
            e,
            FlowEvent::PushRelabelInit { active_nodes: 2 }
        )));
    }

    #[test]
    fn test_diamond_relabels() {
        let result = run(&diamond());
        assert_eq!(result.max_flow_value, 10);
        assert_eq!(result.min_cut.as_ref().unwrap().cut_capacity, 10);

        let relabels: Vec<(String, i64)> = result
            .events
            .iter()
            .filter_map(|e| match e {
                FlowEvent::PushRelabelRelabel { node, new_height } => {
                    Some((node.to_string(), *new_height))
                }
                _ => None,
            })
            .collect();
        assert_eq!(relabels[0], ("a".to_string(), 1));
    }

    #[test]
    fn test_excess_returns_to_source() {
        // a 收到 5 但只能送出 2，多余部分必须推回源点
        let mut graph = Graph::default();
        graph.add_node(Node::source("s")).unwrap();
        graph.add_node(Node::normal("a")).unwrap();
        graph.add_node(Node::sink("t")).unwrap();
        graph.add_edge(Edge::new("e1", "s", "a", 5)).unwrap();
        graph.add_edge(Edge::new("e2", "a", "t", 2)).unwrap();

        let result = run(&graph);
        assert_eq!(result.max_flow_value, 2);
        assert_eq!(result.graph.edge("e1").unwrap().flow(), 2);
        assert!(result.events.iter().any(|e| matches!(
            e,
            FlowEvent::PushRelabelPush {
                is_reverse: true,
                ..
            }
        )));
    }

    #[test]
    fn test_clrs_and_conservation() {
        let result = run(&clrs());
        assert_eq!(result.max_flow_value, 23);
        for node in result.graph.nodes() {
            if node.is_source() || node.is_sink() {
                continue;
            }
            assert_eq!(result.graph.net_inflow(node.id().as_str()), 0);
        }
    }

    #[test]
    fn test_existing_flow_credits_remaining_capacity() {
        let mut graph = single_edge();
        graph.edge_mut("e1").unwrap().set_flow(3);
        let result = run(&graph);
        assert_eq!(result.max_flow_value, 7);
        assert!(result.events.iter().any(|e| matches!(
            e,
            FlowEvent::PushRelabelPush { delta: 4, .. }
        )));
    }

    #[test]
    fn test_step_limit() {
        let result = PushRelabel.run(
            &diamond(),
            &RunOptions::new().with_max_steps(1).with_clock(FixedClock(0)),
        );
        assert!(result.error().is_some());
        assert!(!result.events.iter().any(|e| e.kind() == "NO_MORE_PATHS"));
        assert_eq!(result.events.last().unwrap().kind(), "RUN_END");
    }

    #[test]
    fn test_relabel_height() {
        let graph = diamond();
        let residual = ResidualGraph::build(&graph);
        let mut height: BTreeMap<NodeId, i64> =
            graph.node_ids().map(|id| (id.clone(), 0)).collect();
        height.insert(NodeId::from("b"), 3);
        height.insert(NodeId::from("t"), 2);
        assert_eq!(relabel_height(&residual, &height, &NodeId::from("a")).unwrap(), 3);
        assert!(matches!(
            relabel_height(&residual, &height, &NodeId::from("t")),
            Err(Error::InvariantViolation(_))
        ));
    }

    #[test]
    fn test_dead_end_aborts_run() {
        let graph = single_edge();
        let options = RunOptions::new().with_clock(FixedClock(9));
        let mut ctx = RunContext::begin(AlgorithmId::PushRelabel, &graph, &options).unwrap();
        ctx.run_start();

        let residual = ResidualGraph::build(&ctx.graph);
        let height: BTreeMap<NodeId, i64> =
            graph.node_ids().map(|id| (id.clone(), 0)).collect();
        let err = relabel_height(&residual, &height, &NodeId::from("t")).unwrap_err();
        let result = ctx.abort(err, 0);

        let kinds: Vec<&str> = result.events.iter().map(|e| e.kind()).collect();
        assert_eq!(kinds, vec!["ALGORITHM_SELECTED", "RUN_START", "ERROR"]);
        assert!(result.error().unwrap().contains("节点 t"));
        assert!(result.min_cut.is_none());
        assert_eq!(result.max_flow_value, 0);
    }

    #[test]
    fn test_active_queue_skips_terminals() {
        let mut queue = ActiveQueue::new(NodeId::from("s"), NodeId::from("t"));
        queue.push(&NodeId::from("s"));
        queue.push(&NodeId::from("t"));
        queue.push(&NodeId::from("a"));
        queue.push(&NodeId::from("a"));
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.pop(), Some(NodeId::from("a")));
        assert_eq!(queue.pop(), None);
    }
}
