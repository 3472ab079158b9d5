//! # collect 子命令 CLI 定义
//!
//! 遍历计算目录树，收集并归一化计算结果。
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/collect.rs`

use clap::Args;
use std::path::PathBuf;

/// collect 子命令参数
#[derive(Args, Debug)]
pub struct CollectArgs {
    /// Root directory containing calculation folders
    #[arg(default_value = ".")]
    pub root: PathBuf,

    /// Skip ORCA output detection
    #[arg(long, default_value_t = false)]
    pub no_orca: bool,

    /// Skip Turbomole/xtb detection
    #[arg(long, default_value_t = false)]
    pub no_turbomole: bool,

    /// Skip CENSO detection
    #[arg(long, default_value_t = false)]
    pub no_censo: bool,

    /// Write one annotated .xyz file per job into the xyz/ directory
    #[arg(long, default_value_t = false)]
    pub save_xyz: bool,

    /// File with folder name patterns to ignore (set by 'ls -d ./*/ > ignore_folders')
    #[arg(long, default_value = "ignore_folders")]
    pub ignore_file: PathBuf,

    /// Filename for the aggregate JSON record set
    #[arg(long, default_value = "data.json")]
    pub output_json: PathBuf,

    /// Filename for the flat CSV summary
    #[arg(long, default_value = "data.csv")]
    pub output_csv: PathBuf,

    /// Temperature for thermodynamic derivation (K)
    #[arg(long, default_value_t = 298.15)]
    pub temperature: f64,

    /// Number of parallel jobs (1 = sequential, 0 = auto)
    #[arg(short, long, default_value_t = 1)]
    pub jobs: usize,
}
