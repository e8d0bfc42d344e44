//! Edmonds-Karp 最大流算法
//!
//! 每轮在新建的残量图上做 BFS，首次发现汇点即停止并沿父指针重建路径，
//! 按瓶颈值增广。残量出边按全局排序键遍历，因此第一条被发现的最短路径是唯一确定的。

use super::augment::{bottleneck, path_segments, RunContext};
use super::residual::{ResidualEdge, ResidualGraph};
use super::{AlgorithmId, MaxFlowAlgorithm, RunOptions, RunResult};
use crate::error::{Error, Result};
use crate::event::FlowEvent;
use crate::graph::{Graph, NodeId};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// Edmonds-Karp（基于 BFS 的 Ford-Fulkerson）
#[derive(Debug, Clone, Copy, Default)]
pub struct EdmondsKarp;

impl MaxFlowAlgorithm for EdmondsKarp {
    fn id(&self) -> AlgorithmId {
        AlgorithmId::EdmondsKarp
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

        ctx.run_start();

        while iteration <= options.max_steps {
            let residual = ResidualGraph::build(&ctx.graph);
            ctx.emit(FlowEvent::ResidualBuilt {
                residual_edge_count: residual.len(),
            });
            ctx.emit(FlowEvent::BfsStart { iteration });

            let path = match bfs_find_path(&mut ctx, &residual, &source, &sink) {
                Ok(Some(path)) => path,
                Ok(None) => {
                    ctx.emit(FlowEvent::NoMorePaths {
                        iteration,
                        max_flow: current_max_flow,
                    });
                    break;
                }
                Err(err) => return ctx.abort(err, current_max_flow),
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

        if iteration > options.max_steps {
            ctx.emit_error(&Error::StepLimitExceeded(options.max_steps));
        }

        ctx.finish(current_max_flow)
    }
}

/// BFS 找增广路径
///
/// 每次出队记录 `BFS_VISIT_NODE`，每条新发现的残量边记录 `BFS_DISCOVER_EDGE`；
/// 汇点不可达时返回 `Ok(None)`。
fn bfs_find_path(
    ctx: &mut RunContext,
    residual: &ResidualGraph,
    source: &NodeId,
    sink: &NodeId,
) -> Result<Option<Vec<ResidualEdge>>> {
    let mut visited: BTreeSet<NodeId> = BTreeSet::new();
    let mut queue = VecDeque::new();
    let mut parent: BTreeMap<NodeId, &ResidualEdge> = BTreeMap::new();
    let mut found_sink = false;

    visited.insert(source.clone());
    queue.push_back(source.clone());

    while !found_sink {
        let Some(current) = queue.pop_front() else {
            break;
        };
        ctx.emit(FlowEvent::BfsVisitNode {
            node: current.clone(),
        });

        for edge in residual.outgoing(current.as_str()) {
            if visited.contains(&edge.to) {
                continue;
            }
            visited.insert(edge.to.clone());
            parent.insert(edge.to.clone(), edge);
            ctx.emit(FlowEvent::BfsDiscoverEdge {
                from: edge.from.clone(),
                to: edge.to.clone(),
                residual_capacity: edge.residual_capacity,
                is_reverse: edge.is_reverse,
                original_edge_id: edge.original_edge_id.clone(),
            });

            if &edge.to == sink {
                found_sink = true;
                break;
            }
            queue.push_back(edge.to.clone());
        }
    }

    if !found_sink {
        return Ok(None);
    }

    // 沿父指针重建路径 sink -> source
    let mut path = Vec::new();
    let mut cursor = sink.clone();
    while &cursor != source {
        let via = parent
            .get(&cursor)
            .ok_or_else(|| Error::InvariantViolation(format!("BFS 父指针重建失败: {}", cursor)))?;
        path.push((*via).clone());
        cursor = via.from.clone();
    }
    path.reverse();

    Ok(Some(path))
}
