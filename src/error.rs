//! # 统一错误处理模块
//!
//! 定义 qcdc 的所有错误类型，使用 `thiserror` 派生。
//!
//! ## 依赖关系
//! - 被所有其他模块使用
//! - 无外部模块依赖

use thiserror::Error;

/// qcdc 统一错误类型
#[derive(Error, Debug)]
pub enum QcdcError {
    // ─────────────────────────────────────────────────────────────
    // I/O 错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to read file: {path}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}")]
    FileWriteError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: String },

    // ─────────────────────────────────────────────────────────────
    // 解析错误
    // ─────────────────────────────────────────────────────────────
    /// 声明存在的文本段不符合该格式的语法
    #[error("Failed to parse {format} section: {path}\nReason: {reason}")]
    FormatError {
        format: String,
        path: String,
        reason: String,
    },

    /// 声明的数量与实际数量不一致（原子数、频率数）
    #[error("Structural mismatch in {path}: expected {expected} {what}, found {found}")]
    StructuralMismatch {
        path: String,
        what: String,
        expected: usize,
        found: usize,
    },

    // ─────────────────────────────────────────────────────────────
    // 派生计算错误
    // ─────────────────────────────────────────────────────────────
    /// 后续计算需要的字段没有被任何解析器填充
    #[error("Missing field '{field}' for {path}")]
    MissingField { field: String, path: String },

    /// 点群符号在对称数查找表中没有条目
    #[error("No symmetry number assigned for point group {point_group}, please add it to the lookup table")]
    UnmappedSymmetry { point_group: String },

    /// 被引用的文件或元素不存在
    #[error("Lookup failed for '{what}' in {path}")]
    LookupFailure { what: String, path: String },

    // ─────────────────────────────────────────────────────────────
    // 序列化错误
    // ─────────────────────────────────────────────────────────────
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Result 类型别名
pub type Result<T> = std::result::Result<T, QcdcError>;
