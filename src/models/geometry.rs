//! # 分子几何数据模型
//!
//! 定义统一的分子几何表示：元素符号列表 + N×3 笛卡尔坐标矩阵。
//! 坐标一律以 Ångström 存储，bohr 来源在解析边界换算。
//!
//! ## 依赖关系
//! - 被 `parsers/` 和 `thermo/` 使用
//! - 无外部模块依赖

use serde::{Deserialize, Serialize};

/// bohr → Ångström 换算因子 (CODATA Bohr 半径 / 1e-10)
pub const BOHR2ANGSTROM: f64 = 0.529177210903;

/// Ångström → bohr 换算因子
pub const ANGSTROM2BOHR: f64 = 1.0 / BOHR2ANGSTROM;

/// 分子几何
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Geometry {
    /// 元素符号（保留来源大小写）
    pub elements: Vec<String>,

    /// 笛卡尔坐标 (Å)
    pub coordinates: Vec<[f64; 3]>,
}

impl Geometry {
    pub fn new(elements: Vec<String>, coordinates: Vec<[f64; 3]>) -> Self {
        Geometry {
            elements,
            coordinates,
        }
    }

    /// 从 bohr 坐标创建，换算为 Å
    pub fn from_bohr(elements: Vec<String>, coordinates: Vec<[f64; 3]>) -> Self {
        let coordinates = coordinates
            .iter()
            .map(|c| {
                [
                    c[0] * BOHR2ANGSTROM,
                    c[1] * BOHR2ANGSTROM,
                    c[2] * BOHR2ANGSTROM,
                ]
            })
            .collect();
        Geometry {
            elements,
            coordinates,
        }
    }

    /// 原子数
    pub fn num_atoms(&self) -> usize {
        self.elements.len()
    }

    /// 以 bohr 为单位的坐标副本（热力学模块需要）
    pub fn coordinates_bohr(&self) -> Vec<[f64; 3]> {
        self.coordinates
            .iter()
            .map(|c| {
                [
                    c[0] * ANGSTROM2BOHR,
                    c[1] * ANGSTROM2BOHR,
                    c[2] * ANGSTROM2BOHR,
                ]
            })
            .collect()
    }
}
