//! 通用类型定义

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 容量与流量（整数，带符号以便校验器报告负值输入）
pub type Capacity = i64;

/// 毫秒时间戳
pub type Timestamp = i64;

/// 节点角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeRole {
    /// 普通节点
    Normal,
    /// 源点
    Source,
    /// 汇点
    Sink,
}

impl Default for NodeRole {
    fn default() -> Self {
        NodeRole::Normal
    }
}

impl NodeRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeRole::Normal => "normal",
            NodeRole::Source => "source",
            NodeRole::Sink => "sink",
        }
    }
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for NodeRole {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(NodeRole::Normal),
            "source" => Ok(NodeRole::Source),
            "sink" => Ok(NodeRole::Sink),
            other => Err(crate::Error::ParseError(format!("无效的节点角色: {}", other))),
        }
    }
}

/// 时间戳来源
///
/// `RUN_START` / `RUN_END` 事件携带时间戳；测试中注入固定时钟即可得到逐字节一致的事件日志。
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> Timestamp;
}

/// 系统墙钟（毫秒）
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> Timestamp {
        chrono::Utc::now().timestamp_millis()
    }
}

/// 固定时钟
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub Timestamp);

impl Clock for FixedClock {
    fn now_millis(&self) -> Timestamp {
        self.0
    }
}
