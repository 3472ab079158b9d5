//! # 分子对称性
//!
//! 点群识别与对称数查找。点群分类器通过在点云上测试旋转轴、
//! 镜面与反演中心实现，替代外部对称性分析服务。
//!
//! ## 数据来源
//! 对称数表：Miller, Chemical Group Theory, 2.2 Point Groups
//!
//! ## 依赖关系
//! - 被 `thermo/mod.rs` 调用
//! - 无外部模块依赖

use crate::error::{QcdcError, Result};
use std::collections::HashMap;
use std::sync::LazyLock;

/// 点群符号 → 转动配分函数对称数 σ
///
/// C*v / D*h 代替 C∞v / D∞h（线性分子）
static SYMMETRY_NUMBERS: LazyLock<HashMap<&'static str, u32>> = LazyLock::new(|| {
    const TABLE: &[(&str, u32)] = &[
        ("C1", 1),
        ("Cs", 1),
        ("Ci", 2),
        ("C2", 2),
        ("C2v", 2),
        ("C2h", 2),
        ("C3", 3),
        ("C3v", 3),
        ("C3h", 3),
        ("C4", 4),
        ("C4v", 4),
        ("C4h", 4),
        ("C6", 6),
        ("C6v", 6),
        ("C6h", 6),
        ("D2", 4),
        ("D2h", 4),
        ("D2d", 4),
        ("D3", 6),
        ("D3h", 6),
        ("D3d", 6),
        ("D4", 8),
        ("D4h", 8),
        ("D4d", 8),
        ("D6", 12),
        ("D6h", 12),
        ("D6d", 12),
        ("Td", 12),
        ("Oh", 24),
        ("I", 60),
        ("S4", 4),
        ("S6", 4),
        ("C*v", 1),
        ("D*h", 2),
    ];
    TABLE.iter().copied().collect()
});

/// 查表取对称数
pub fn symmetry_number_for_label(label: &str) -> Option<u32> {
    SYMMETRY_NUMBERS.get(label).copied()
}

/// 点群与对称数
///
/// 单原子直接返回 ("Single Atom", 1)；未映射的点群是硬失败，
/// 系统从不猜测对称数
pub fn symmetry_number(
    elements: &[String],
    coordinates: &[[f64; 3]],
    tolerance: f64,
) -> Result<(String, u32)> {
    if elements.len() == 1 {
        return Ok(("Single Atom".to_string(), 1));
    }

    let label = classify_point_group(elements, coordinates, tolerance);
    match symmetry_number_for_label(&label) {
        Some(sigma) => Ok((label, sigma)),
        None => Err(QcdcError::UnmappedSymmetry { point_group: label }),
    }
}

/// 分子是否线性
///
/// 少于 3 个原子恒为线性；否则所有相邻键向量叉积须在浮点容差内为零
pub fn is_linear(coordinates: &[[f64; 3]]) -> bool {
    if coordinates.len() < 3 {
        return true;
    }

    let vectors: Vec<[f64; 3]> = coordinates
        .windows(2)
        .map(|pair| sub(&pair[1], &pair[0]))
        .collect();

    for pair in vectors.windows(2) {
        if norm(&cross(&pair[0], &pair[1])) > 1e-6 {
            return false;
        }
    }
    true
}

// ─────────────────────────────────────────────────────────────
// 点群分类器
// ─────────────────────────────────────────────────────────────

/// 几何点群识别
///
/// tolerance: 变换后原子与等价原子的最大允许距离 (Å)
pub fn classify_point_group(elements: &[String], coordinates: &[[f64; 3]], tolerance: f64) -> String {
    let center = centroid(coordinates);
    let centered: Vec<[f64; 3]> = coordinates.iter().map(|c| sub(c, &center)).collect();

    if is_linear(&centered) {
        return if maps_onto(elements, &centered, |r| [-r[0], -r[1], -r[2]], tolerance) {
            "D*h".to_string()
        } else {
            "C*v".to_string()
        };
    }

    let axes = proper_axes(elements, &centered, tolerance);

    if axes.is_empty() {
        let planes = mirror_normals(elements, &centered, None, tolerance);
        if !planes.is_empty() {
            return "Cs".to_string();
        }
        if maps_onto(elements, &centered, |r| [-r[0], -r[1], -r[2]], tolerance) {
            return "Ci".to_string();
        }
        return "C1".to_string();
    }

    let has_inversion = maps_onto(elements, &centered, |r| [-r[0], -r[1], -r[2]], tolerance);
    let high_order: Vec<&([f64; 3], u32)> = axes.iter().filter(|(_, n)| *n >= 3).collect();

    // 多条高次轴 ⇒ 立方/二十面体群
    if high_order.len() >= 2 {
        let max_order = axes.iter().map(|(_, n)| *n).max().unwrap_or(2);
        if max_order >= 5 {
            return "I".to_string();
        }
        if axes.iter().any(|(_, n)| *n == 4) {
            return if has_inversion { "Oh" } else { "O" }.to_string();
        }
        return if has_inversion { "Th" } else { "Td" }.to_string();
    }

    let (principal, order) = *axes
        .iter()
        .max_by_key(|(_, n)| *n)
        .expect("axes is non-empty");
    let n = order as usize;

    let perpendicular_c2 = axes
        .iter()
        .filter(|(axis, _)| dot(axis, &principal).abs() < 0.01)
        .count();

    let has_sigma_h = reflection_maps(elements, &centered, &principal, tolerance);
    let sigma_v = mirror_normals(elements, &centered, Some(&principal), tolerance).len();

    if perpendicular_c2 >= n {
        if has_sigma_h {
            return format!("D{}h", n);
        }
        if sigma_v >= n {
            return format!("D{}d", n);
        }
        return format!("D{}", n);
    }

    if has_sigma_h {
        return format!("C{}h", n);
    }
    if sigma_v >= n {
        return format!("C{}v", n);
    }
    if improper_rotation_maps(elements, &centered, &principal, 2 * order, tolerance) {
        return format!("S{}", 2 * n);
    }
    format!("C{}", n)
}

/// 收集所有 n ≥ 2 的真旋转轴（候选轴：原子向量、同元素对中点、向量叉积）
fn proper_axes(
    elements: &[String],
    centered: &[[f64; 3]],
    tolerance: f64,
) -> Vec<([f64; 3], u32)> {
    let mut candidates: Vec<[f64; 3]> = Vec::new();
    let mut push = |v: [f64; 3], candidates: &mut Vec<[f64; 3]>| {
        let length = norm(&v);
        if length < 1e-3 {
            return;
        }
        let unit = scale(&v, 1.0 / length);
        if !candidates.iter().any(|c| dot(c, &unit).abs() > 0.999) {
            candidates.push(unit);
        }
    };

    for r in centered {
        push(*r, &mut candidates);
    }
    for i in 0..centered.len() {
        for j in (i + 1)..centered.len() {
            if elements[i].eq_ignore_ascii_case(&elements[j]) {
                push(midpoint(&centered[i], &centered[j]), &mut candidates);
            }
            push(cross(&centered[i], &centered[j]), &mut candidates);
        }
    }

    candidates
        .into_iter()
        .filter_map(|axis| {
            let order = rotation_order(elements, centered, &axis, tolerance);
            (order >= 2).then_some((axis, order))
        })
        .collect()
}

/// 轴的最高旋转阶数（只考虑 2..=6，对称数表的覆盖范围）
fn rotation_order(
    elements: &[String],
    centered: &[[f64; 3]],
    axis: &[f64; 3],
    tolerance: f64,
) -> u32 {
    for n in (2..=6u32).rev() {
        let angle = 2.0 * std::f64::consts::PI / n as f64;
        if maps_onto(elements, centered, |r| rotate(r, axis, angle), tolerance) {
            return n;
        }
    }
    1
}

/// 收集镜面法向量；`containing` 给定时只保留包含该轴的镜面（σv/σd）
fn mirror_normals(
    elements: &[String],
    centered: &[[f64; 3]],
    containing: Option<&[f64; 3]>,
    tolerance: f64,
) -> Vec<[f64; 3]> {
    let mut candidates: Vec<[f64; 3]> = Vec::new();
    let mut push = |v: [f64; 3], candidates: &mut Vec<[f64; 3]>| {
        let length = norm(&v);
        if length < 1e-3 {
            return;
        }
        let unit = scale(&v, 1.0 / length);
        if let Some(axis) = containing {
            // 镜面包含轴 ⇔ 法向量垂直于轴
            if dot(axis, &unit).abs() > 0.01 {
                return;
            }
        }
        if !candidates.iter().any(|c| dot(c, &unit).abs() > 0.999) {
            candidates.push(unit);
        }
    };

    for i in 0..centered.len() {
        for j in (i + 1)..centered.len() {
            if elements[i].eq_ignore_ascii_case(&elements[j]) {
                push(sub(&centered[i], &centered[j]), &mut candidates);
            }
            push(cross(&centered[i], &centered[j]), &mut candidates);
        }
    }
    if let Some(axis) = containing {
        for r in centered {
            push(cross(axis, r), &mut candidates);
        }
    }

    candidates
        .into_iter()
        .filter(|normal| reflection_maps(elements, centered, normal, tolerance))
        .collect()
}

fn maps_onto(
    elements: &[String],
    centered: &[[f64; 3]],
    transform: impl Fn(&[f64; 3]) -> [f64; 3],
    tolerance: f64,
) -> bool {
    centered.iter().enumerate().all(|(i, r)| {
        let image = transform(r);
        centered
            .iter()
            .enumerate()
            .any(|(j, r2)| elements[i].eq_ignore_ascii_case(&elements[j]) && distance(&image, r2) < tolerance)
    })
}

fn reflection_maps(
    elements: &[String],
    centered: &[[f64; 3]],
    normal: &[f64; 3],
    tolerance: f64,
) -> bool {
    let unit = scale(normal, 1.0 / norm(normal));
    maps_onto(elements, centered, |r| reflect(r, &unit), tolerance)
}

fn improper_rotation_maps(
    elements: &[String],
    centered: &[[f64; 3]],
    axis: &[f64; 3],
    order: u32,
    tolerance: f64,
) -> bool {
    let angle = 2.0 * std::f64::consts::PI / order as f64;
    maps_onto(
        elements,
        centered,
        |r| reflect(&rotate(r, axis, angle), axis),
        tolerance,
    )
}

// ─────────────────────────────────────────────────────────────
// 三维向量运算
// ─────────────────────────────────────────────────────────────

fn centroid(coordinates: &[[f64; 3]]) -> [f64; 3] {
    let n = coordinates.len() as f64;
    let mut c = [0.0; 3];
    for r in coordinates {
        for k in 0..3 {
            c[k] += r[k];
        }
    }
    [c[0] / n, c[1] / n, c[2] / n]
}

fn sub(a: &[f64; 3], b: &[f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn midpoint(a: &[f64; 3], b: &[f64; 3]) -> [f64; 3] {
    [(a[0] + b[0]) / 2.0, (a[1] + b[1]) / 2.0, (a[2] + b[2]) / 2.0]
}

fn scale(a: &[f64; 3], factor: f64) -> [f64; 3] {
    [a[0] * factor, a[1] * factor, a[2] * factor]
}

fn dot(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn cross(a: &[f64; 3], b: &[f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn norm(a: &[f64; 3]) -> f64 {
    dot(a, a).sqrt()
}

fn distance(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    norm(&sub(a, b))
}

/// Rodrigues 旋转：绕单位轴 axis 旋转 angle
fn rotate(r: &[f64; 3], axis: &[f64; 3], angle: f64) -> [f64; 3] {
    let (sin, cos) = angle.sin_cos();
    let k_cross_r = cross(axis, r);
    let k_dot_r = dot(axis, r);
    [
        r[0] * cos + k_cross_r[0] * sin + axis[0] * k_dot_r * (1.0 - cos),
        r[1] * cos + k_cross_r[1] * sin + axis[1] * k_dot_r * (1.0 - cos),
        r[2] * cos + k_cross_r[2] * sin + axis[2] * k_dot_r * (1.0 - cos),
    ]
}

/// 过原点、单位法向量 normal 的镜面反射
fn reflect(r: &[f64; 3], normal: &[f64; 3]) -> [f64; 3] {
    let d = 2.0 * dot(r, normal);
    [
        r[0] - d * normal[0],
        r[1] - d * normal[1],
        r[2] - d * normal[2],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 0.3;

    fn strings(symbols: &[&str]) -> Vec<String> {
        symbols.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_is_linear_straight_line() {
        let coords = vec![[0.0, 0.0, 0.0], [1.0, 1.0, 0.0], [2.0, 2.0, 0.0], [3.5, 3.5, 0.0]];
        assert!(is_linear(&coords));
    }

    #[test]
    fn test_is_linear_right_angle() {
        let coords = vec![[1.0, 0.0, 0.0], [0.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
        assert!(!is_linear(&coords));
    }

    #[test]
    fn test_is_linear_diatomic() {
        assert!(is_linear(&[[0.0, 0.0, 0.0], [0.0, 0.0, 1.2]]));
    }

    #[test]
    fn test_water_is_c2v() {
        let elements = strings(&["O", "H", "H"]);
        let coords = vec![
            [0.0, 0.0, 0.1173],
            [0.0, 0.7572, -0.4692],
            [0.0, -0.7572, -0.4692],
        ];
        assert_eq!(classify_point_group(&elements, &coords, TOL), "C2v");
        let (label, sigma) = symmetry_number(&elements, &coords, TOL).unwrap();
        assert_eq!(label, "C2v");
        assert_eq!(sigma, 2);
    }

    #[test]
    fn test_co2_is_linear_centrosymmetric() {
        let elements = strings(&["O", "C", "O"]);
        let coords = vec![[0.0, 0.0, 1.16], [0.0, 0.0, 0.0], [0.0, 0.0, -1.16]];
        let (label, sigma) = symmetry_number(&elements, &coords, TOL).unwrap();
        assert_eq!(label, "D*h");
        assert_eq!(sigma, 2);
    }

    #[test]
    fn test_hcn_is_linear_polar() {
        let elements = strings(&["H", "C", "N"]);
        let coords = vec![[0.0, 0.0, 2.22], [0.0, 0.0, 1.156], [0.0, 0.0, 0.0]];
        let (label, sigma) = symmetry_number(&elements, &coords, TOL).unwrap();
        assert_eq!(label, "C*v");
        assert_eq!(sigma, 1);
    }

    #[test]
    fn test_ammonia_is_c3v() {
        let elements = strings(&["N", "H", "H", "H"]);
        let r = 0.9377;
        let coords = vec![
            [0.0, 0.0, 0.38],
            [r, 0.0, 0.0],
            [-r / 2.0, r * 0.8660254, 0.0],
            [-r / 2.0, -r * 0.8660254, 0.0],
        ];
        assert_eq!(classify_point_group(&elements, &coords, TOL), "C3v");
    }

    #[test]
    fn test_methane_is_td() {
        let elements = strings(&["C", "H", "H", "H", "H"]);
        let d = 1.09 / 3.0_f64.sqrt();
        let coords = vec![
            [0.0, 0.0, 0.0],
            [d, d, d],
            [d, -d, -d],
            [-d, d, -d],
            [-d, -d, d],
        ];
        let (label, sigma) = symmetry_number(&elements, &coords, TOL).unwrap();
        assert_eq!(label, "Td");
        assert_eq!(sigma, 12);
    }

    #[test]
    fn test_benzene_is_d6h() {
        let mut elements = Vec::new();
        let mut coords = Vec::new();
        for k in 0..6 {
            let angle = k as f64 * std::f64::consts::PI / 3.0;
            elements.push("C".to_string());
            coords.push([1.397 * angle.cos(), 1.397 * angle.sin(), 0.0]);
            elements.push("H".to_string());
            coords.push([2.481 * angle.cos(), 2.481 * angle.sin(), 0.0]);
        }
        let (label, sigma) = symmetry_number(&elements, &coords, TOL).unwrap();
        assert_eq!(label, "D6h");
        assert_eq!(sigma, 12);
    }

    #[test]
    fn test_twisted_peroxide_is_c2() {
        // 绕 z 轴 C2，无镜面
        let elements = strings(&["O", "O", "H", "H"]);
        let coords = vec![
            [0.7, 0.0, 0.1],
            [-0.7, 0.0, 0.1],
            [1.0, 0.8, 0.6],
            [-1.0, -0.8, 0.6],
        ];
        assert_eq!(classify_point_group(&elements, &coords, TOL), "C2");
    }

    #[test]
    fn test_planar_asymmetric_is_cs() {
        let elements = strings(&["H", "O", "F"]);
        let coords = vec![[0.95, 0.0, 0.0], [0.0, 0.0, 0.0], [-0.3, 1.3, 0.0]];
        assert_eq!(classify_point_group(&elements, &coords, TOL), "Cs");
    }

    #[test]
    fn test_pentagonal_pyramid_is_unmapped() {
        // C5v 不在对称数表中，必须硬失败而不是猜测
        let mut elements = strings(&["P"]);
        let mut coords = vec![[0.0, 0.0, 1.0]];
        for k in 0..5 {
            let angle = k as f64 * 2.0 * std::f64::consts::PI / 5.0;
            elements.push("F".to_string());
            coords.push([1.5 * angle.cos(), 1.5 * angle.sin(), 0.0]);
        }
        let result = symmetry_number(&elements, &coords, TOL);
        assert!(matches!(result, Err(QcdcError::UnmappedSymmetry { .. })));
    }

    #[test]
    fn test_single_atom() {
        let (label, sigma) =
            symmetry_number(&strings(&["Ar"]), &[[0.0, 0.0, 0.0]], TOL).unwrap();
        assert_eq!(label, "Single Atom");
        assert_eq!(sigma, 1);
    }

    #[test]
    fn test_lookup_table() {
        assert_eq!(symmetry_number_for_label("Td"), Some(12));
        assert_eq!(symmetry_number_for_label("D*h"), Some(2));
        assert_eq!(symmetry_number_for_label("C5v"), None);
    }
}
