//! # xyz 点云格式解析器
//!
//! 解析/生成 xyz 格式文件。
//!
//! ## xyz 格式说明
//! ```text
//! 3                      # atom count
//! Comment line           # free text
//! O 0.000000 0.000000 0.117300
//! H 0.000000 0.757200 -0.469200
//! H 0.000000 -0.757200 -0.469200
//! $charge                # optional property trailer
//! 0
//! $end
//! ```
//!
//! ## 依赖关系
//! - 被 `parsers/orca.rs`, `parsers/turbomole.rs`, `commands/collect.rs` 使用
//! - 使用 `models/geometry.rs`

use crate::error::{QcdcError, Result};
use crate::models::Geometry;
use std::fs;
use std::path::Path;

/// 解析 xyz 文件
pub fn parse_xyz_file(path: &Path) -> Result<(usize, String, Geometry)> {
    let content = fs::read_to_string(path).map_err(|e| QcdcError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_xyz_content(&content, &path.display().to_string())
}

/// 从字符串内容解析 xyz 格式
///
/// 声明的原子数与实际数据行数不一致时返回 FormatError；
/// 原子行之后允许携带属性尾注（$key…$end），不参与解析
pub fn parse_xyz_content(content: &str, origin: &str) -> Result<(usize, String, Geometry)> {
    let lines: Vec<&str> = content.lines().collect();

    if lines.len() < 2 {
        return Err(QcdcError::FormatError {
            format: "xyz".to_string(),
            path: origin.to_string(),
            reason: "File too short".to_string(),
        });
    }

    // Line 0: atom count
    let num_atoms: usize = lines[0].trim().parse().map_err(|_| QcdcError::FormatError {
        format: "xyz".to_string(),
        path: origin.to_string(),
        reason: format!("Invalid atom count line: '{}'", lines[0].trim()),
    })?;

    // Line 1: comment
    let comment = lines[1].trim().to_string();

    let mut elements: Vec<String> = Vec::with_capacity(num_atoms);
    let mut coordinates: Vec<[f64; 3]> = Vec::with_capacity(num_atoms);

    for line in lines.iter().skip(2).take(num_atoms) {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() != 4 {
            break;
        }
        let coords: Vec<f64> = parts[1..4].iter().filter_map(|s| s.parse().ok()).collect();
        if coords.len() != 3 {
            break;
        }
        elements.push(parts[0].to_string());
        coordinates.push([coords[0], coords[1], coords[2]]);
    }

    if elements.len() != num_atoms {
        return Err(QcdcError::FormatError {
            format: "xyz".to_string(),
            path: origin.to_string(),
            reason: format!(
                "Declared {} atoms but found {} coordinate lines",
                num_atoms,
                elements.len()
            ),
        });
    }

    Ok((num_atoms, comment, Geometry::new(elements, coordinates)))
}

/// 生成 xyz 格式字符串，坐标保留 6 位小数
///
/// trailer 为可选自由文本（属性块），原样附加在原子行之后
pub fn write_xyz_content(
    elements: &[String],
    coordinates: &[[f64; 3]],
    comment: &str,
    trailer: Option<&str>,
) -> Result<String> {
    if elements.len() != coordinates.len() {
        return Err(QcdcError::StructuralMismatch {
            path: comment.to_string(),
            what: "coordinate rows".to_string(),
            expected: elements.len(),
            found: coordinates.len(),
        });
    }

    let mut result = String::new();
    result.push_str(&format!("{}\n", elements.len()));
    result.push_str(&format!("{}\n", comment));
    for (element, coord) in elements.iter().zip(coordinates.iter()) {
        result.push_str(&format!(
            "{} {:.6} {:.6} {:.6}\n",
            element, coord[0], coord[1], coord[2]
        ));
    }
    if let Some(info) = trailer {
        result.push_str(info);
        if !info.ends_with('\n') {
            result.push('\n');
        }
    }

    Ok(result)
}

/// 写 xyz 文件
pub fn write_xyz_file(
    path: &Path,
    elements: &[String],
    coordinates: &[[f64; 3]],
    comment: &str,
    trailer: Option<&str>,
) -> Result<()> {
    let content = write_xyz_content(elements, coordinates, comment, trailer)?;
    fs::write(path, content).map_err(|e| QcdcError::FileWriteError {
        path: path.display().to_string(),
        source: e,
    })
}

/// 将物理属性格式化为 $key…$end 尾注块
///
/// 全部为 None 时返回 None，保持纯 xyz 文件格式不变
pub fn format_properties(
    charge: Option<i32>,
    s2: Option<f64>,
    dipole: Option<&[f64; 3]>,
    vibration: Option<&[f64]>,
    zpe: Option<f64>,
) -> Option<String> {
    let mut lines: Vec<String> = Vec::new();

    if let Some(charge) = charge {
        lines.push(format!("$charge\n{}", charge));
    }
    if let Some(s2) = s2 {
        lines.push(format!("$s2\n{:.3}", s2));
    }
    if let Some(dipole) = dipole {
        let dipole_str = dipole
            .iter()
            .map(|d| format!("{:.14}", d))
            .collect::<Vec<_>>()
            .join(" ");
        lines.push(format!("$dipole\n{}", dipole_str));
    }
    if let Some(vibration) = vibration {
        let vibration_str = vibration
            .iter()
            .map(|v| format!("{:.2}", v))
            .collect::<Vec<_>>()
            .join(" ");
        lines.push(format!("$vibration\n{}", vibration_str));
    }
    if let Some(zpe) = zpe {
        lines.push(format!("$zpe\n{:.7}", zpe));
    }

    if lines.is_empty() {
        None
    } else {
        lines.push("$end".to_string());
        Some(lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WATER: &str = "3\nwater molecule\nO 0.000000 0.000000 0.117300\nH 0.000000 0.757200 -0.469200\nH 0.000000 -0.757200 -0.469200\n";

    #[test]
    fn test_parse_xyz() {
        let (n, comment, geom) = parse_xyz_content(WATER, "test").unwrap();
        assert_eq!(n, 3);
        assert_eq!(comment, "water molecule");
        assert_eq!(geom.elements, vec!["O", "H", "H"]);
        assert!((geom.coordinates[1][1] - 0.7572).abs() < 1e-9);
    }

    #[test]
    fn test_parse_xyz_count_mismatch() {
        let content = "4\ntoo few atoms\nO 0.0 0.0 0.0\nH 0.0 0.0 1.0\n";
        let result = parse_xyz_content(content, "test");
        assert!(matches!(result, Err(QcdcError::FormatError { .. })));
    }

    #[test]
    fn test_round_trip() {
        let (_, _, geom) = parse_xyz_content(WATER, "test").unwrap();
        let written =
            write_xyz_content(&geom.elements, &geom.coordinates, "water molecule", None).unwrap();
        let (n, comment, geom2) = parse_xyz_content(&written, "round_trip").unwrap();

        assert_eq!(n, 3);
        assert_eq!(comment, "water molecule");
        assert_eq!(geom.elements, geom2.elements);
        for (a, b) in geom.coordinates.iter().zip(geom2.coordinates.iter()) {
            for k in 0..3 {
                assert!((a[k] - b[k]).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_round_trip_with_trailer() {
        let (_, _, geom) = parse_xyz_content(WATER, "test").unwrap();
        let trailer = format_properties(
            Some(0),
            None,
            Some(&[0.1, -0.2, 0.3]),
            Some(&[1595.2, 3657.1, 3755.9]),
            Some(55.4412345),
        )
        .unwrap();
        let written = write_xyz_content(
            &geom.elements,
            &geom.coordinates,
            "water molecule",
            Some(&trailer),
        )
        .unwrap();

        assert!(written.contains("$charge\n0"));
        assert!(written.contains("$vibration\n1595.20 3657.10 3755.90"));
        assert!(written.contains("$zpe\n55.4412345"));
        assert!(written.ends_with("$end\n"));

        // 尾注不得干扰重新解析
        let (n, _, geom2) = parse_xyz_content(&written, "round_trip").unwrap();
        assert_eq!(n, 3);
        assert_eq!(geom2.elements, geom.elements);
    }

    #[test]
    fn test_format_properties_empty() {
        assert!(format_properties(None, None, None, None, None).is_none());
    }
}
