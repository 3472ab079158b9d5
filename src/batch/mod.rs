//! # 批量处理模块
//!
//! 提供目录收集与批量并行处理能力。
//!
//! ## 功能
//! - 递归收集计算目录（支持忽略列表）
//! - 按目录并行处理，结果保持确定性顺序
//! - 进度反馈
//!
//! ## 依赖关系
//! - 被 `commands/collect.rs` 使用
//! - 使用 `rayon` 进行并行处理
//! - 使用 `indicatif` 显示进度

pub mod collector;
pub mod runner;

pub use collector::DirectoryCollector;
pub use runner::BatchRunner;
