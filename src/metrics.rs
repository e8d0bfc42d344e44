//! 运行统计
//!
//! 从事件日志汇总一次运行的操作计数，用于算法对比输出。

use crate::algorithm::{AlgorithmId, RunResult};
use crate::event::FlowEvent;
use crate::types::Capacity;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 单次运行的统计
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunMetrics {
    /// 事件总数
    pub total_events: usize,
    /// 各类型事件数
    pub by_kind: BTreeMap<String, usize>,
    /// 增广次数（`AUGMENT_APPLY`）
    pub augmentations: usize,
    pub bfs_visits: usize,
    pub pushes: usize,
    pub relabels: usize,
    /// Dinic 阶段数
    pub phases: usize,
    pub residual_builds: usize,
    pub errors: usize,
}

impl RunMetrics {
    pub fn from_events(events: &[FlowEvent]) -> Self {
        let mut metrics = RunMetrics {
            total_events: events.len(),
            ..Default::default()
        };

        for event in events {
            *metrics.by_kind.entry(event.kind().to_string()).or_default() += 1;
            match event {
                FlowEvent::AugmentApply { .. } => metrics.augmentations += 1,
                FlowEvent::BfsVisitNode { .. } => metrics.bfs_visits += 1,
                FlowEvent::PushRelabelPush { .. } => metrics.pushes += 1,
                FlowEvent::PushRelabelRelabel { .. } => metrics.relabels += 1,
                FlowEvent::DinicLevelGraphBuilt { .. } => metrics.phases += 1,
                FlowEvent::ResidualBuilt { .. } => metrics.residual_builds += 1,
                FlowEvent::Error { .. } => metrics.errors += 1,
                _ => {}
            }
        }

        metrics
    }

    /// 某类型事件的数量
    pub fn count(&self, kind: &str) -> usize {
        self.by_kind.get(kind).copied().unwrap_or(0)
    }
}

/// 对比输出中的一行
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlgorithmSummary {
    pub algorithm: AlgorithmId,
    pub max_flow_value: Capacity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cut_capacity: Option<Capacity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub metrics: RunMetrics,
}

impl From<&RunResult> for AlgorithmSummary {
    fn from(result: &RunResult) -> Self {
        Self {
            algorithm: result.algorithm,
            max_flow_value: result.max_flow_value,
            cut_capacity: result.min_cut.as_ref().map(|cut| cut.cut_capacity),
            error: result.error().map(str::to_string),
            metrics: RunMetrics::from_events(&result.events),
        }
    }
}
