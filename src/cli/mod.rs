//! # CLI 模块
//!
//! 使用 `clap` 定义命令行参数和子命令。
//!
//! ## 命令结构
//! - `collect`: 遍历计算目录树，收集并归一化计算结果
//!
//! ## 依赖关系
//! - 被 `main.rs` 使用
//! - 子模块: collect

pub mod collect;

use clap::{Parser, Subcommand};

/// qcdc - 量子化学计算数据统一收集工具
#[derive(Parser)]
#[command(name = "qcdc")]
#[command(version)]
#[command(about = "A unified quantum chemistry data collection toolkit", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// 可用的子命令
#[derive(Subcommand)]
pub enum Commands {
    /// Collect ORCA/Turbomole/xtb/CENSO results into a normalized record set
    Collect(collect::CollectArgs),
}
