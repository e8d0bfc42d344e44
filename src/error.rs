//! 错误类型定义

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("图校验失败: {0}")]
    InvalidGraph(String),

    #[error("节点不存在: {0}")]
    NodeNotFound(String),

    #[error("边不存在: {0}")]
    EdgeNotFound(String),

    #[error("节点已存在: {0}")]
    DuplicateNode(String),

    #[error("边已存在: {0}")]
    DuplicateEdge(String),

    #[error("流量不变式被破坏: {0}")]
    InvariantViolation(String),

    #[error("超出步数上限: {0}")]
    StepLimitExceeded(u64),

    #[error("未知算法: {0}")]
    UnknownAlgorithm(String),

    #[error("导入错误: {0}")]
    ImportError(String),

    #[error("解析错误: {0}")]
    ParseError(String),

    #[error("序列化错误: {0}")]
    SerializationError(String),

    #[error("服务器错误: {0}")]
    ServerError(String),

    #[error("IO 错误: {0}")]
    IoError(#[from] std::io::Error),
}
