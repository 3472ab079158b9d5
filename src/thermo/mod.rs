//! # 统计热力学引擎
//!
//! 从归一化的 (元素, 坐标, 频率) 数据计算配分函数、零点能、
//! qRRHO 修正与化学势。纯函数，无 I/O。
//!
//! ## 公式来源
//! Mortimer, Physical Chemistry, chapter 21（理想气体/刚性转子/谐振子）；
//! Grimme, Chem. Eur. J. 18 (2012) 9955（qRRHO 阻尼熵修正）
//!
//! ## 依赖关系
//! - 被 `commands/collect.rs` 调用
//! - 使用 `models/geometry.rs`, `elements.rs`
//! - 子模块: symmetry

pub mod symmetry;

use crate::elements::isotope_mass;
use crate::error::{QcdcError, Result};
use crate::models::{Geometry, ThermoData};
use std::f64::consts::PI;

// ─────────────────────────────────────────────────────────────
// 物理常数 (CODATA 2018)
// ─────────────────────────────────────────────────────────────

/// Planck 常数 (J·s)
pub const H_PLANCK: f64 = 6.62607015e-34;
/// Boltzmann 常数 (J/K)
pub const K_BOLTZMANN: f64 = 1.380649e-23;
/// 光速 (m/s)
pub const C_LIGHT: f64 = 299792458.0;
/// Avogadro 常数 (1/mol)
pub const N_AVOGADRO: f64 = 6.02214076e23;
/// 气体常数 (J/(mol·K))
pub const R_GAS: f64 = 8.31446261815324;
/// 原子质量常数 (kg)
pub const AMU: f64 = 1.66053906660e-27;
/// Bohr 半径 (m)
pub const BOHR_RADIUS: f64 = 5.29177210903e-11;

// ─────────────────────────────────────────────────────────────
// 单位换算（解析边界统一使用）
// ─────────────────────────────────────────────────────────────

/// Hartree → kJ/mol
pub const EH2KJMOL: f64 = 2625.5002;
/// cal → J
pub const CAL2J: f64 = 4.184;
/// 波数 (cm⁻¹) → kJ/mol
pub const WAVENUMBER2KJMOL: f64 = 100.0 * C_LIGHT * H_PLANCK * N_AVOGADRO / 1000.0;

/// Grimme qRRHO 平均转动惯量 B_av (kg·m²)
const B_AV: f64 = 1e-44;

/// 热力学引擎配置
///
/// 显式传入，不用全局状态
#[derive(Debug, Clone, Copy)]
pub struct ThermoConfig {
    /// 温度 (K)
    pub temperature: f64,
    /// 压强 (Pa)
    pub pressure: f64,
    /// 物质的量 (mol)
    pub moles: f64,
    /// qRRHO 低频截断 (cm⁻¹)
    pub qrrho_cutoff: f64,
    /// 非振动模式判定阈值 (cm⁻¹)
    pub mode_epsilon: f64,
    /// 符号反转处理的排除阈值 (cm⁻¹)：|ν| ≤ 阈值剔除，|ν| > 阈值取绝对值
    pub sign_inversion_threshold: f64,
    /// 点群识别的原子匹配容差 (Å)
    pub symmetry_tolerance: f64,
}

impl Default for ThermoConfig {
    fn default() -> Self {
        ThermoConfig {
            temperature: 298.15,
            pressure: 1e5,
            moles: 1.0,
            qrrho_cutoff: 100.0,
            mode_epsilon: 1e-9,
            sign_inversion_threshold: 1e-9,
            symmetry_tolerance: 0.3,
        }
    }
}

impl ThermoConfig {
    /// 理想气体摩尔体积 (m³)
    pub fn molar_gas_volume(&self) -> f64 {
        self.moles * R_GAS * self.temperature / self.pressure
    }
}

// ─────────────────────────────────────────────────────────────
// 基础量
// ─────────────────────────────────────────────────────────────

/// 逐元素最丰同位素质量 (g/mol)
pub fn element_masses(elements: &[String], path: &str) -> Result<Vec<f64>> {
    elements
        .iter()
        .map(|element| {
            isotope_mass(element).ok_or_else(|| QcdcError::LookupFailure {
                what: format!("element '{}'", element),
                path: path.to_string(),
            })
        })
        .collect()
}

/// 质心坐标
pub fn center_of_mass(coordinates: &[[f64; 3]], masses: &[f64]) -> [f64; 3] {
    let total: f64 = masses.iter().sum();
    let mut com = [0.0; 3];
    for (coord, mass) in coordinates.iter().zip(masses.iter()) {
        for k in 0..3 {
            com[k] += coord[k] * mass;
        }
    }
    for value in com.iter_mut() {
        *value /= total;
    }
    com
}

/// 质心系三个转动惯量 I_xx, I_yy, I_zz
///
/// 坐标单位 bohr，质量单位 g/mol ⇒ 结果 amu·bohr²
pub fn moments_of_inertia(coordinates_bohr: &[[f64; 3]], masses: &[f64]) -> [f64; 3] {
    let com = center_of_mass(coordinates_bohr, masses);
    let mut moments = [0.0; 3];
    for (coord, mass) in coordinates_bohr.iter().zip(masses.iter()) {
        let x = coord[0] - com[0];
        let y = coord[1] - com[1];
        let z = coord[2] - com[2];
        moments[0] += mass * (y * y + z * z);
        moments[1] += mass * (x * x + z * z);
        moments[2] += mass * (x * x + y * y);
    }
    moments
}

// ─────────────────────────────────────────────────────────────
// 配分函数
// ─────────────────────────────────────────────────────────────

/// 平动配分函数（理想气体）
///
/// molar_mass: g/mol；volume: m³（液相浓度修正用 1e-3）
pub fn translational_partition_function(
    molar_mass: f64,
    volume: f64,
    temperature: f64,
    n_particles: f64,
) -> f64 {
    let mass_kg = molar_mass / 1000.0 / N_AVOGADRO;
    (2.0 * PI * mass_kg * K_BOLTZMANN * temperature / H_PLANCK / H_PLANCK).powf(1.5) * volume
        / n_particles
        / N_AVOGADRO
}

/// 振动配分函数（谐振子）
///
/// 要求严格正频率；空集按空积恒等式返回 1.0
pub fn vibrational_partition_function(positive_frequencies: &[f64], temperature: f64) -> f64 {
    positive_frequencies
        .iter()
        .map(|freq| {
            let energy = freq * 100.0 * C_LIGHT * H_PLANCK;
            1.0 / (1.0 - (-energy / K_BOLTZMANN / temperature).exp())
        })
        .product()
}

/// 转动配分函数（刚性转子）
///
/// 转动惯量单位 amu·bohr²，要求严格正值
pub fn rotational_partition_function(
    moments_of_inertia: [f64; 3],
    symmetry_number: u32,
    temperature: f64,
) -> f64 {
    let kt = K_BOLTZMANN * temperature;
    let rot = 8.0 * PI * PI * kt / H_PLANCK / H_PLANCK;
    let inertia_si = moments_of_inertia[0]
        * moments_of_inertia[1]
        * moments_of_inertia[2]
        * AMU.powi(3)
        * BOHR_RADIUS.powi(6);
    PI.sqrt() * (rot.powi(3) * inertia_si).sqrt() / symmetry_number as f64
}

/// 零点能 (kJ/mol)
///
/// 取正非零波数集合，能量的一半求和
pub fn zero_point_energy(positive_frequencies: &[f64]) -> f64 {
    0.5 * positive_frequencies.iter().sum::<f64>() * WAVENUMBER2KJMOL
}

/// 化学势 / Gibbs 自由能 (kJ/mol)
pub fn chemical_potential(
    zero_point_energy: f64,
    q_translation: f64,
    q_vibration: f64,
    q_rotation: f64,
    temperature: f64,
) -> f64 {
    zero_point_energy
        - R_GAS * temperature * (q_translation * q_vibration * q_rotation).ln() / 1000.0
}

/// Grimme qRRHO 熵修正 (kJ/mol)
///
/// 输入应为低于截断值的正频率；返回值从化学势中减去。
/// 阻尼函数参考频率固定为 100 cm⁻¹
pub fn quasi_rrho_correction(low_frequencies: &[f64], temperature: f64) -> f64 {
    let kt = K_BOLTZMANN * temperature;
    low_frequencies
        .iter()
        .map(|freq_cm| {
            let freq_s = freq_cm * 100.0 * C_LIGHT;
            let x = freq_s * H_PLANCK / kt;
            // 谐振子熵（R 单位）
            let s_vib = x / (x.exp() - 1.0) - (1.0 - (-x).exp()).ln();
            // 自由转子熵（R 单位）
            let mu = H_PLANCK / (8.0 * PI * PI * freq_s);
            let mu_eff = mu * B_AV / (mu + B_AV);
            let s_rot =
                (1.0 + (8.0 * PI * PI * PI * mu_eff * kt / H_PLANCK / H_PLANCK).ln()) / 2.0;
            let damping = 1.0 / (1.0 + (1e2 / freq_cm).powi(4));
            let s_final = damping * R_GAS * s_vib + (1.0 - damping) * R_GAS * s_rot;
            (s_final - R_GAS * s_vib) * 1e-3
        })
        .sum::<f64>()
        * temperature
}

// ─────────────────────────────────────────────────────────────
// 结构校验与派生
// ─────────────────────────────────────────────────────────────

/// 校验频率数与自由度一致
///
/// 振动模式数（|ν| > mode_epsilon，含虚频）必须等于 3N-6
/// （线性分子 3N-5，单原子 0），否则 StructuralMismatch
pub fn validate_frequency_count(
    geometry: &Geometry,
    frequencies: &[f64],
    config: &ThermoConfig,
    path: &str,
) -> Result<()> {
    let num_atoms = geometry.num_atoms();
    let expected = if num_atoms == 1 {
        0
    } else if symmetry::is_linear(&geometry.coordinates) {
        3 * num_atoms - 5
    } else {
        3 * num_atoms - 6
    };

    let found = frequencies
        .iter()
        .filter(|freq| freq.abs() > config.mode_epsilon)
        .count();

    if found != expected {
        return Err(QcdcError::StructuralMismatch {
            path: path.to_string(),
            what: "vibrational modes".to_string(),
            expected,
            found,
        });
    }
    Ok(())
}

/// 对一组正频率计算振动相关量并组合化学势
struct FrequencySet {
    q_vibrational: f64,
    zero_point_energy: f64,
    chemical_potential: f64,
    chemical_potential_liquid: f64,
    qrrho_correction: f64,
}

fn evaluate_frequency_set(
    positive_frequencies: &[f64],
    q_trans: f64,
    q_trans_liquid: f64,
    q_rot: f64,
    config: &ThermoConfig,
) -> FrequencySet {
    let temperature = config.temperature;
    let q_vib = vibrational_partition_function(positive_frequencies, temperature);
    let zpe = zero_point_energy(positive_frequencies);
    let mut chempot = chemical_potential(zpe, q_trans, q_vib, q_rot, temperature);
    let mut chempot_liquid = chemical_potential(zpe, q_trans_liquid, q_vib, q_rot, temperature);

    let low: Vec<f64> = positive_frequencies
        .iter()
        .copied()
        .filter(|freq| *freq < config.qrrho_cutoff)
        .collect();
    let qrrho = quasi_rrho_correction(&low, temperature);
    chempot -= qrrho;
    chempot_liquid -= qrrho;

    FrequencySet {
        q_vibrational: q_vib,
        zero_point_energy: zpe,
        chemical_potential: chempot,
        chemical_potential_liquid: chempot_liquid,
        qrrho_correction: qrrho,
    }
}

/// 从几何与频率派生全部热力学量
///
/// 单原子与线性分子在平动配分函数后提前返回（此模型对它们
/// 不定义转动贡献）；未映射点群向上传播 UnmappedSymmetry
pub fn derive(
    geometry: &Geometry,
    frequencies: &[f64],
    config: &ThermoConfig,
    path: &str,
) -> Result<ThermoData> {
    let masses = element_masses(&geometry.elements, path)?;
    let mass: f64 = masses.iter().sum();
    let temperature = config.temperature;

    let q_trans = translational_partition_function(
        mass,
        config.molar_gas_volume(),
        temperature,
        config.moles,
    );
    let q_trans_liquid =
        translational_partition_function(mass, 1e-3, temperature, config.moles);

    let (point_group, sigma) = symmetry::symmetry_number(
        &geometry.elements,
        &geometry.coordinates,
        config.symmetry_tolerance,
    )?;

    let mut data = ThermoData {
        molar_mass: mass,
        point_group,
        symmetry_number: sigma,
        q_translational: q_trans,
        q_translational_liquid: q_trans_liquid,
        single_atom: geometry.num_atoms() == 1,
        linear: false,
        moments_of_inertia: None,
        q_rotational: None,
        q_vibrational: None,
        zero_point_energy: None,
        chemical_potential: None,
        chemical_potential_liquid: None,
        qrrho_correction: None,
        q_vibrational_sign_inverted: None,
        zero_point_energy_sign_inverted: None,
        chemical_potential_sign_inverted: None,
        chemical_potential_liquid_sign_inverted: None,
        qrrho_correction_sign_inverted: None,
    };

    if data.single_atom {
        return Ok(data);
    }

    data.linear = symmetry::is_linear(&geometry.coordinates);
    if data.linear {
        return Ok(data);
    }

    let moments = moments_of_inertia(&geometry.coordinates_bohr(), &masses);
    let q_rot = rotational_partition_function(moments, sigma, temperature);
    data.moments_of_inertia = Some(moments);
    data.q_rotational = Some(q_rot);

    let positive: Vec<f64> = frequencies
        .iter()
        .copied()
        .filter(|freq| *freq > config.mode_epsilon)
        .collect();
    let standard = evaluate_frequency_set(&positive, q_trans, q_trans_liquid, q_rot, config);
    data.q_vibrational = Some(standard.q_vibrational);
    data.zero_point_energy = Some(standard.zero_point_energy);
    data.chemical_potential = Some(standard.chemical_potential);
    data.chemical_potential_liquid = Some(standard.chemical_potential_liquid);
    data.qrrho_correction = Some(standard.qrrho_correction);

    // 符号反转频率集：|ν| ≤ 阈值剔除，其余折为正值（过渡态自由能）
    let sign_inverted: Vec<f64> = frequencies
        .iter()
        .filter(|freq| freq.abs() > config.sign_inversion_threshold)
        .map(|freq| freq.abs())
        .collect();
    let inverted =
        evaluate_frequency_set(&sign_inverted, q_trans, q_trans_liquid, q_rot, config);
    data.q_vibrational_sign_inverted = Some(inverted.q_vibrational);
    data.zero_point_energy_sign_inverted = Some(inverted.zero_point_energy);
    data.chemical_potential_sign_inverted = Some(inverted.chemical_potential);
    data.chemical_potential_liquid_sign_inverted = Some(inverted.chemical_potential_liquid);
    data.qrrho_correction_sign_inverted = Some(inverted.qrrho_correction);

    Ok(data)
}
