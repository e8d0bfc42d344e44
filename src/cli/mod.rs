//! 命令行支持
//!
//! `commands` 实现各子命令，`printer` 负责表格、事件日志和 JSON 输出。

pub mod commands;
pub mod printer;

pub use printer::{OutputFormat, Printer};
