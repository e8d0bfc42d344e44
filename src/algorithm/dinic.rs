//! Dinic 最大流算法
//!
//! 按阶段进行：每个阶段先用 BFS 给残量图分层，汇点不可达即结束；
//! 阶段内反复在只允许 `level + 1` 的残量边上找路径并增广，找不到时阻塞流完成，进入下一阶段。

use super::augment::{bottleneck, path_segments, RunContext};
use super::residual::{ResidualEdge, ResidualGraph};
use super::{AlgorithmId, MaxFlowAlgorithm, RunOptions, RunResult};
use crate::error::Error;
use crate::event::FlowEvent;
use crate::graph::{Graph, NodeId};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use tracing::debug;

/// 节点层次（BFS 距离），不可达节点不在表中
type Levels = BTreeMap<NodeId, u64>;

/// Dinic（层次图 + 阻塞流）
#[derive(Debug, Clone, Copy, Default)]
pub struct Dinic;

impl MaxFlowAlgorithm for Dinic {
    fn id(&self) -> AlgorithmId {
        AlgorithmId::Dinic
    }

    fn run(&self, graph: &Graph, options: &RunOptions) -> RunResult {
        let mut ctx = match RunContext::begin(self.id(), graph, options) {
            Ok(ctx) => ctx,
            Err(result) => return result,
        };
        let source = ctx.source.clone();
        let sink = ctx.sink.clone();

        let mut current_max_flow = ctx.graph.source_outflow(source.as_str());
        let mut iteration: u64 = 1;
        let mut phase: u64 = 1;

        ctx.run_start();

        while iteration <= options.max_steps {
            let residual = ResidualGraph::build(&ctx.graph);
            ctx.emit(FlowEvent::ResidualBuilt {
                residual_edge_count: residual.len(),
            });

            let levels = build_levels(&residual, &source);
            ctx.emit(FlowEvent::DinicLevelGraphBuilt {
                phase,
                reachable_nodes: levels.len(),
            });

            if !levels.contains_key(&sink) {
                ctx.emit(FlowEvent::NoMorePaths {
                    iteration,
                    max_flow: current_max_flow,
                });
                break;
            }

            let mut pushed_flow = 0;

            while iteration <= options.max_steps {
                let residual = ResidualGraph::build(&ctx.graph);
                let Some(path) = find_level_path(&residual, &levels, &source, &sink) else {
                    break;
                };

                let bottleneck = bottleneck(&path);
                ctx.emit(FlowEvent::AugmentingPathFound {
                    path: path_segments(&path),
                    bottleneck,
                });

                let updates = match ctx.apply_path(&path, bottleneck) {
                    Ok(updates) => updates,
                    Err(err) => return ctx.abort(err, current_max_flow),
                };
                current_max_flow += bottleneck;
                pushed_flow += bottleneck;

                ctx.emit(FlowEvent::AugmentApply {
                    delta: bottleneck,
                    updates,
                });
                ctx.emit(FlowEvent::IterationEnd {
                    iteration,
                    current_max_flow,
                });
                iteration += 1;
            }

            debug!(phase, pushed_flow, "Dinic 阶段结束");
            ctx.emit(FlowEvent::DinicBlockingFlowEnd { phase, pushed_flow });
            phase += 1;
        }

        if iteration > options.max_steps {
            ctx.emit_error(&Error::StepLimitExceeded(options.max_steps));
        }

        ctx.finish(current_max_flow)
    }
}

/// BFS 分层
fn build_levels(residual: &ResidualGraph, source: &NodeId) -> Levels {
    let mut levels = Levels::new();
    let mut queue = VecDeque::new();

    levels.insert(source.clone(), 0);
    queue.push_back(source.clone());

    while let Some(current) = queue.pop_front() {
        let next_level = levels[&current] + 1;
        for edge in residual.outgoing(current.as_str()) {
            if edge.residual_capacity <= 0 || levels.contains_key(&edge.to) {
                continue;
            }
            levels.insert(edge.to.clone(), next_level);
            queue.push_back(edge.to.clone());
        }
    }

    levels
}

/// 在层次图上找一条路径：每一步只走到层次恰好加一的节点
fn find_level_path(
    residual: &ResidualGraph,
    levels: &Levels,
    source: &NodeId,
    sink: &NodeId,
) -> Option<Vec<ResidualEdge>> {
    let mut visited: BTreeSet<NodeId> = BTreeSet::new();
    let mut queue = VecDeque::new();
    let mut parent: BTreeMap<NodeId, &ResidualEdge> = BTreeMap::new();

    visited.insert(source.clone());
    queue.push_back(source.clone());

    while let Some(current) = queue.pop_front() {
        if &current == sink {
            break;
        }

        let Some(&level) = levels.get(&current) else {
            continue;
        };
        for edge in residual.outgoing(current.as_str()) {
            if visited.contains(&edge.to) || edge.residual_capacity <= 0 {
                continue;
            }
            if levels.get(&edge.to) != Some(&(level + 1)) {
                continue;
            }
            visited.insert(edge.to.clone());
            parent.insert(edge.to.clone(), edge);
            queue.push_back(edge.to.clone());
        }
    }

    if !visited.contains(sink) {
        return None;
    }

    let mut path = Vec::new();
    let mut cursor = sink.clone();
    while &cursor != source {
        let via = parent.get(&cursor)?;
        path.push((*via).clone());
        cursor = via.from.clone();
    }
    path.reverse();
    Some(path)
}
