//! # 数据模型模块
//!
//! 定义统一的分子几何和计算记录数据模型。
//!
//! ## 依赖关系
//! - 被 `parsers/`, `thermo/`, `commands/` 使用
//! - 子模块: geometry, record

pub mod geometry;
pub mod record;

pub use geometry::Geometry;
pub use record::{
    extract_conf_number, CalcKind, CalcRecord, CensoResult, DftSettings, DipoleMoment,
    OrbitalInfo, ThermoData,
};
