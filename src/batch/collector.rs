//! # 目录收集器
//!
//! 递归收集待解析的计算目录，支持忽略列表。
//!
//! ## 功能
//! - 递归目录遍历（含根目录自身）
//! - glob 模式忽略列表（匹配到的目录整棵子树被剪除）
//! - 忽略文件按行读取，兼容 `ls -d ./*/ > ignore_folders` 的输出
//!
//! ## 依赖关系
//! - 被 `commands/collect.rs` 调用
//! - 使用 `walkdir` 遍历目录，`glob` 匹配模式

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// 目录收集器
pub struct DirectoryCollector {
    /// 根目录
    root: PathBuf,
    /// 忽略模式列表
    ignore: Vec<glob::Pattern>,
}

impl DirectoryCollector {
    /// 创建新的目录收集器
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            ignore: Vec::new(),
        }
    }

    /// 从忽略文件加载模式；文件不存在视为无忽略项
    pub fn with_ignore_file(mut self, path: &Path) -> Self {
        if let Ok(content) = std::fs::read_to_string(path) {
            self.ignore = content
                .lines()
                .map(|line| line.trim().trim_start_matches("./").trim_end_matches('/'))
                .filter(|line| !line.is_empty())
                .filter_map(|line| glob::Pattern::new(line).ok())
                .collect();
        }
        self
    }

    /// 目录名是否命中忽略模式
    fn is_ignored(&self, path: &Path) -> bool {
        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name,
            None => return false,
        };
        self.ignore.iter().any(|pattern| pattern.matches(name))
    }

    /// 收集所有目录（含根目录），命中忽略模式的子树整体剪除
    pub fn collect(&self) -> Vec<PathBuf> {
        WalkDir::new(&self.root)
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !self.is_ignored(entry.path()))
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_dir())
            .map(|entry| entry.path().to_path_buf())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ignore_patterns() {
        let mut collector = DirectoryCollector::new(PathBuf::from("."));
        collector.ignore = vec![
            glob::Pattern::new("scratch*").unwrap(),
            glob::Pattern::new("old_runs").unwrap(),
        ];

        assert!(collector.is_ignored(Path::new("./scratch_123")));
        assert!(collector.is_ignored(Path::new("./a/b/old_runs")));
        assert!(!collector.is_ignored(Path::new("./CONF1")));
    }
}
