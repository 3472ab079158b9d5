//! # 批量执行器
//!
//! 把处理函数映射到目录列表上，可选并行。
//!
//! ## 功能
//! - 基于 rayon 的并行迭代，结果保持输入顺序（输出确定性）
//! - 进度条显示
//! - jobs = 1 时即为顺序遍历（默认），jobs = 0 自动取 CPU 核数
//!
//! ## 依赖关系
//! - 被 `commands/collect.rs` 调用
//! - 使用 `utils/progress.rs` 创建进度条
//! - 使用 `rayon` 进行并行计算

use crate::utils::progress;

use rayon::prelude::*;
use std::path::PathBuf;

/// 批量执行器
pub struct BatchRunner {
    /// 并行作业数
    jobs: usize,
}

impl BatchRunner {
    /// 创建新的批量执行器
    pub fn new(jobs: usize) -> Self {
        let jobs = if jobs == 0 { num_cpus::get() } else { jobs };
        Self { jobs }
    }

    /// 处理目录列表，返回与输入同序的结果
    ///
    /// 每个目录的处理彼此独立（无共享可变状态），失败隔离由
    /// 处理函数自行负责
    pub fn run<T, F>(&self, directories: Vec<PathBuf>, message: &str, processor: F) -> Vec<T>
    where
        T: Send,
        F: Fn(&PathBuf) -> T + Sync + Send,
    {
        let pb = progress::create_progress_bar(directories.len() as u64, message);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.jobs)
            .build()
            .expect("failed to build rayon thread pool");

        let results: Vec<T> = pool.install(|| {
            directories
                .par_iter()
                .map(|directory| {
                    let result = processor(directory);
                    pb.inc(1);
                    result
                })
                .collect()
        });

        pb.finish_and_clear();
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_preserves_input_order() {
        let runner = BatchRunner::new(4);
        let dirs: Vec<PathBuf> = (0..32).map(|i| PathBuf::from(format!("dir{}", i))).collect();
        let results = runner.run(dirs.clone(), "test", |d| d.display().to_string());

        let expected: Vec<String> = dirs.iter().map(|d| d.display().to_string()).collect();
        assert_eq!(results, expected);
    }

    #[test]
    fn test_zero_jobs_falls_back_to_cpu_count() {
        let runner = BatchRunner::new(0);
        assert!(runner.jobs >= 1);
    }
}
