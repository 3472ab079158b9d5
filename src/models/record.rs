//! # 计算记录数据模型
//!
//! 每个被识别的计算任务对应一条 `CalcRecord`。缺失的部分以 `Option`
//! 表示，序列化时跳过，下游按稀疏表处理。
//!
//! ## 依赖关系
//! - 被 `parsers/`, `thermo/`, `commands/collect.rs` 使用
//! - 使用 `models/geometry.rs`

use crate::models::Geometry;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// 计算程序类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CalcKind {
    #[serde(rename = "orca")]
    Orca,
    #[serde(rename = "turbomole")]
    Turbomole,
    #[serde(rename = "xtb")]
    Xtb,
    #[serde(rename = "censo")]
    Censo,
    #[serde(rename = "cosmors (only)")]
    CosmoRsOnly,
}

impl std::fmt::Display for CalcKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CalcKind::Orca => write!(f, "orca"),
            CalcKind::Turbomole => write!(f, "turbomole"),
            CalcKind::Xtb => write!(f, "xtb"),
            CalcKind::Censo => write!(f, "censo"),
            CalcKind::CosmoRsOnly => write!(f, "cosmors (only)"),
        }
    }
}

/// 偶极矩 (来自 ridft 输出或 ORCA 总偶极矩)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DipoleMoment {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// |dipole|，仅 Turbomole 控制文件提供
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<f64>,
}

/// $dft 块：泛函与格点
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DftSettings {
    pub functional: String,
    pub gridsize: String,
}

/// eiger.out 中的一条轨道信息
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OrbitalInfo {
    /// 轨道能量 (eV 列)
    pub energy: f64,
    /// 轨道序号
    pub index: u32,
}

/// CENSO 结果表：全表 + Boltzmann 选中行
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CensoResult {
    /// 表头各列名
    pub columns: Vec<String>,
    /// 数据行（按列拆分的 token）
    pub rows: Vec<Vec<String>>,
    /// 带 `<------` 标记的代表构象行，标记已剥除
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best: Option<Vec<String>>,
}

/// 热力学引擎派生数据
///
/// 单原子与线性分子在平动配分函数之后提前返回，转动相关字段为 None
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThermoData {
    /// 摩尔质量 (g/mol)，最丰同位素
    pub molar_mass: f64,
    pub point_group: String,
    pub symmetry_number: u32,
    /// 平动配分函数（理想气体摩尔体积）
    pub q_translational: f64,
    /// 平动配分函数 (V = 1 L/mol)
    pub q_translational_liquid: f64,
    pub single_atom: bool,
    pub linear: bool,
    /// 质心系转动惯量 I_xx, I_yy, I_zz (amu·bohr²)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moments_of_inertia: Option<[f64; 3]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q_rotational: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q_vibrational: Option<f64>,
    /// 零点能 (kJ/mol)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zero_point_energy: Option<f64>,
    /// 化学势 (kJ/mol)，已含 qRRHO 修正
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chemical_potential: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chemical_potential_liquid: Option<f64>,
    /// Grimme qRRHO 熵修正项 (kJ/mol，被减项)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qrrho_correction: Option<f64>,
    // 符号反转频率集的并行字段（过渡态自由能）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q_vibrational_sign_inverted: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zero_point_energy_sign_inverted: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chemical_potential_sign_inverted: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chemical_potential_liquid_sign_inverted: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qrrho_correction_sign_inverted: Option<f64>,
}

/// 一条归一化计算记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalcRecord {
    pub kind: CalcKind,

    /// 目录名
    pub folder: String,
    /// 去掉目录名的上级路径
    pub group: String,
    /// 完整目录路径
    pub root: String,
    /// 触发此记录的文件名
    pub source_file: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_name: Option<String>,
    /// 导出的 xyz 文件目标路径
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xyz_file_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Geometry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_atoms: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub charge: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multiplicity: Option<u32>,

    // 输入指令标志（ORCA）
    pub geometry_optimization: bool,
    pub frequency_calculation: bool,
    pub transition_state_optimization: bool,
    pub surface_scan: bool,

    /// 波数 (cm⁻¹)，升序；负值为虚频
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequencies: Option<Vec<f64>>,

    // 标量能量，一律 kJ/mol
    #[serde(skip_serializing_if = "Option::is_none")]
    pub single_point_energy: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gibbs_free_energy: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub g_minus_e_el: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inner_energy: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entropy_correction: Option<f64>,
    /// 输出文件中打印的零点能（区别于引擎计算值）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zero_point_energy_parsed: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pressure: Option<f64>,
    /// 输出文件报告的总质量 (AMU)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_mass: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub dipole: Option<DipoleMoment>,

    /// 势能面扫描表：索引即扫描步，(坐标, 能量 kJ/mol)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub surface: Option<Vec<(f64, f64)>>,

    // Turbomole control 元数据
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cosmo: Option<HashMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_dimensions: Option<HashMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub force_update: Option<HashMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scf_damp: Option<HashMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fermi: Option<HashMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scf_conv: Option<i32>,
    /// RI-J 近似
    pub ri: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dft: Option<DftSettings>,
    /// 全元素统一时的基组名
    #[serde(skip_serializing_if = "Option::is_none")]
    pub basis_set: Option<String>,
    /// 元素基组不统一时的映射
    #[serde(skip_serializing_if = "Option::is_none")]
    pub basis_for_element: Option<HashMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dispersion: Option<String>,
    /// 自旋污染 <S²>
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s_squared: Option<f64>,
    /// $keyword … file=name 映射
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filenames: Option<HashMap<String, String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub homo: Option<OrbitalInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lumo: Option<OrbitalInfo>,
    /// CosmoRS 自由能 (kJ/mol)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cosmo_rs: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub censo: Option<CensoResult>,
    /// 路径中 /CONF<n> 的构象编号，仅回溯引用
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conformer_id: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub thermo: Option<ThermoData>,
}

impl CalcRecord {
    pub fn new(kind: CalcKind, root: &Path, source_file: impl Into<String>) -> Self {
        let root_str = root.display().to_string();
        let folder = root
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("")
            .to_string();
        let group = root
            .parent()
            .map(|p| p.display().to_string())
            .unwrap_or_default();

        CalcRecord {
            kind,
            folder,
            group,
            root: root_str,
            source_file: source_file.into(),
            base_name: None,
            xyz_file_name: None,
            geometry: None,
            num_atoms: None,
            charge: None,
            multiplicity: None,
            geometry_optimization: false,
            frequency_calculation: false,
            transition_state_optimization: false,
            surface_scan: false,
            frequencies: None,
            single_point_energy: None,
            gibbs_free_energy: None,
            g_minus_e_el: None,
            inner_energy: None,
            entropy_correction: None,
            zero_point_energy_parsed: None,
            temperature: None,
            pressure: None,
            total_mass: None,
            dipole: None,
            surface: None,
            cosmo: None,
            run_dimensions: None,
            force_update: None,
            scf_damp: None,
            fermi: None,
            scf_conv: None,
            ri: false,
            dft: None,
            basis_set: None,
            basis_for_element: None,
            dispersion: None,
            s_squared: None,
            filenames: None,
            homo: None,
            lumo: None,
            cosmo_rs: None,
            censo: None,
            conformer_id: None,
            thermo: None,
        }
    }

}

/// 从路径中提取 /CONF<n> 的构象编号
pub fn extract_conf_number(path: &str) -> Option<u32> {
    let idx = path.find("/CONF")?;
    let digits: String = path[idx + 5..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    if digits.is_empty() {
        None
    } else {
        digits.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_new_record_path_decomposition() {
        let root = PathBuf::from("./reactions/step1/CONF3");
        let rec = CalcRecord::new(CalcKind::Turbomole, &root, "control");
        assert_eq!(rec.folder, "CONF3");
        assert_eq!(rec.group, "./reactions/step1");
        assert_eq!(rec.source_file, "control");
        assert!(rec.geometry.is_none());
        assert!(!rec.ri);
    }

    #[test]
    fn test_extract_conf_number() {
        assert_eq!(extract_conf_number("./run/CONF12/opt"), Some(12));
        assert_eq!(extract_conf_number("./run/CONF7"), Some(7));
        assert_eq!(extract_conf_number("./run/conformers"), None);
        assert_eq!(extract_conf_number("./run/CONF"), None);
    }
}
