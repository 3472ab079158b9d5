//! # qcdc - 量子化学计算数据统一收集工具
//!
//! 遍历 ORCA / Turbomole / xtb / CENSO 计算目录树，把各程序的
//! 自由文本输出归一化为结构化计算记录，并由统计热力学引擎派生
//! 配分函数、零点能、qRRHO 修正与化学势。
//!
//! ## 子命令
//! - `collect` - 收集计算结果并派生热力学量
//!
//! ## 依赖关系
//! ```text
//! main.rs
//!   ├── cli/        (命令行参数定义)
//!   ├── commands/   (命令执行逻辑)
//!   │     ├── parsers/   (格式识别与解析器)
//!   │     ├── models/    (数据模型)
//!   │     └── thermo/    (统计热力学引擎)
//!   ├── batch/      (目录收集与并行执行)
//!   ├── utils/      (工具函数)
//!   └── error.rs    (错误处理)
//! ```

mod batch;
mod cli;
mod commands;
mod elements;
mod error;
mod models;
mod parsers;
mod thermo;
mod utils;

use clap::Parser;
use cli::Cli;

fn main() {
    // Initialize colored output for Windows compatibility
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let cli = Cli::parse();

    if let Err(e) = commands::run(cli.command) {
        utils::output::print_error(&format!("{}", e));
        std::process::exit(1);
    }
}
