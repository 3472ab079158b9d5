//! # 解析器模块
//!
//! 按目录文件列表识别产生输出的计算程序并分派对应解析器。
//! 识别互不排斥：一个目录可以同时触发多个解析器（程序链式任务，
//! 如半经验预优化后接 DFT），各自产出独立记录。
//!
//! ## 依赖关系
//! - 被 `commands/collect.rs` 使用
//! - 子模块: censo, orca, turbomole, xyz

pub mod censo;
pub mod orca;
pub mod turbomole;
pub mod xyz;

use crate::error::Result;
use crate::models::{CalcKind, CalcRecord};
use std::fs;
use std::path::Path;

/// ORCA 嗅探时排除的文件名（其他程序的 *.out）
const NON_ORCA_OUTPUTS: [&str; 3] = ["xtb.out", "crest.out", "censo.out"];

/// 目录触发的解析器及其来源文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractorId {
    Orca(String),
    Turbomole(String),
    Xtb(String),
    CosmoRsOnly(String),
    Censo(String),
}

impl ExtractorId {
    pub fn kind(&self) -> CalcKind {
        match self {
            ExtractorId::Orca(_) => CalcKind::Orca,
            ExtractorId::Turbomole(_) => CalcKind::Turbomole,
            ExtractorId::Xtb(_) => CalcKind::Xtb,
            ExtractorId::CosmoRsOnly(_) => CalcKind::CosmoRsOnly,
            ExtractorId::Censo(_) => CalcKind::Censo,
        }
    }
}

/// 按固定文件名与内容嗅探识别目录中的计算任务
///
/// Turbomole 家族内部有优先级：control 压过纯 xtb 输出，
/// 两者又压过仅 cosmotherm 的目录
pub fn classify(root: &Path, files: &[String]) -> Vec<ExtractorId> {
    let mut ids = Vec::new();

    // ORCA：候选 *.out 文件逐一内容嗅探，防止误判通用 .out
    for name in files {
        if !name.ends_with("out")
            || name.starts_with("slurm")
            || NON_ORCA_OUTPUTS.contains(&name.as_str())
        {
            continue;
        }
        if let Ok(content) = fs::read_to_string(root.join(name)) {
            if orca::looks_like_orca(&content) {
                ids.push(ExtractorId::Orca(name.clone()));
            }
        }
    }

    let has = |name: &str| files.iter().any(|f| f == name);
    if has("control") {
        ids.push(ExtractorId::Turbomole("control".to_string()));
    } else if has("ohess.out") {
        ids.push(ExtractorId::Xtb("ohess.out".to_string()));
    } else if has("xtb.out") {
        ids.push(ExtractorId::Xtb("xtb.out".to_string()));
    } else if has("cosmotherm.out") {
        ids.push(ExtractorId::CosmoRsOnly("cosmotherm.out".to_string()));
    }

    if has("censo.out") {
        ids.push(ExtractorId::Censo("censo.out".to_string()));
    }

    ids
}

/// 运行单个解析器产出记录
pub fn run_extractor(id: &ExtractorId, root: &Path, files: &[String]) -> Result<CalcRecord> {
    match id {
        ExtractorId::Orca(name) => orca::parse_orca(root, name, files),
        ExtractorId::Turbomole(name) => {
            turbomole::parse_turbomole_family(root, files, CalcKind::Turbomole, name)
        }
        ExtractorId::Xtb(name) => {
            turbomole::parse_turbomole_family(root, files, CalcKind::Xtb, name)
        }
        ExtractorId::CosmoRsOnly(name) => {
            turbomole::parse_turbomole_family(root, files, CalcKind::CosmoRsOnly, name)
        }
        ExtractorId::Censo(name) => censo::parse_censo(root, name),
    }
}
