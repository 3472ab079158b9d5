//! # Turbomole / xtb 解析器
//!
//! control 文件按 $ 分段产生 token，按前导关键字分类；energy、
//! coord、vibspectrum、eiger.out、out.tab 各自独立可选，由专用
//! 读取器解析。xtb 任务沿用同一套读取器并链入优化后几何。
//!
//! ## 依赖关系
//! - 被 `parsers/mod.rs` 分派
//! - 使用 `models/`, `parsers/xyz.rs`, `thermo`（单位换算）

use crate::error::{QcdcError, Result};
use crate::models::{CalcKind, CalcRecord, DftSettings, DipoleMoment, Geometry, OrbitalInfo};
use crate::parsers::xyz;
use crate::thermo::{CAL2J, EH2KJMOL};
use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

/// key = value 对
static RE_EQUALITY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\S+)\s*=\s*(\S+)").unwrap());
/// $atoms 块中的 =元素 基组名 对
static RE_BASIS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"=([a-z]{1,2})\s(\S+)").unwrap());
/// $keyword … file=name 贪婪匹配
static RE_FILENAMES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\$(\S*)\s[^$]*?\sfile=(\S*)").unwrap());
/// 偶极矩分量
static RE_DIPOLE_XYZ: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"x\s+([-+]?\d+\.\d+)\s+y\s+([-+]?\d+\.\d+)\s+z\s+([-+]?\d+\.\d+)").unwrap()
});
static RE_DIPOLE_TOTAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\| dipole \| =\s+([\d\.]+)").unwrap());
/// energy 文件数据行：6 字符循环号列 + 三个浮点
static RE_ENERGY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9 ]{6}\s+([-+]?\d*\.\d+)\s+([-+]?\d*\.\d+)\s+([-+]?\d*\.\d+)").unwrap()
});
/// vibspectrum 的 (模式号, 波数) 对
static RE_VIBSPECTRUM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([-+]?\d*\.*\d+)[ a]+([-+]?\d*\.*\d+)").unwrap());
/// coord 文件行：三个浮点 + 元素符号（bohr）
static RE_COORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([-+]?\d*\.\d+)[ ]+([-+]?\d*\.\d+)[ ]+([-+]?\d*\.\d+)[ ]+([a-zA-Z]{1,2})")
        .unwrap()
});

/// 解析 Turbomole 家族目录（turbomole / xtb / 仅 cosmors）
pub fn parse_turbomole_family(
    root: &Path,
    files: &[String],
    kind: CalcKind,
    source_file: &str,
) -> Result<CalcRecord> {
    let mut record = CalcRecord::new(kind, root, source_file);
    let root_tag = record.root.trim_start_matches("./").to_string();

    if kind == CalcKind::Turbomole {
        let control_path = root.join("control");
        let content = fs::read_to_string(&control_path).map_err(|e| QcdcError::FileReadError {
            path: control_path.display().to_string(),
            source: e,
        })?;
        apply_control(&mut record, &content);
    }

    if files.iter().any(|f| f == "energy") {
        let energies = read_energy_file(&root.join("energy"))?;
        record.single_point_energy = Some(energies[0] * EH2KJMOL);
    }

    if files.iter().any(|f| f == "coord") {
        if let Some(geometry) = read_coord_file(&root.join("coord"))? {
            record.geometry = Some(geometry);
            record.xyz_file_name =
                Some(format!("./xyz/{}.xyz", format!("{}/coord", root_tag).replace('/', "_")));
        }
    }

    // xtb 链式任务：优化后几何覆盖初始 coord
    if files.iter().any(|f| f == "xtbopt.xyz") {
        let (num_atoms, _, geometry) = xyz::parse_xyz_file(&root.join("xtbopt.xyz"))?;
        record.num_atoms = Some(num_atoms);
        record.geometry = Some(geometry);
        record.xyz_file_name = Some(format!(
            "./xyz/{}.xyz",
            format!("{}/xtbopt.xyz", root_tag).replace('/', "_")
        ));
    }
    if files.iter().any(|f| f == "xtbopt.coord") && kind == CalcKind::Xtb {
        if let Some(geometry) = read_coord_file(&root.join("xtbopt.coord"))? {
            record.geometry = Some(geometry);
            record.xyz_file_name = Some(format!(
                "./xyz/{}.xyz",
                format!("{}/xtbopt.coord", root_tag).replace('/', "_")
            ));
        }
    }

    if let Some(ref geometry) = record.geometry {
        record.num_atoms = Some(geometry.num_atoms());
    }

    if files.iter().any(|f| f == "vibspectrum") {
        record.frequencies = Some(read_vibspectrum(&root.join("vibspectrum"))?);
        record.frequency_calculation = true;
    }

    if files.iter().any(|f| f == "eiger.out") {
        read_eiger(&mut record, &root.join("eiger.out"))?;
    }

    for tab in ["out.tab", "cosmotherm.tab"] {
        if files.iter().any(|f| f == tab) {
            read_cosmors(&mut record, &root.join(tab))?;
        }
    }

    Ok(record)
}

/// control 文件 tokenizer：按 $ 分段并按前导关键字分类
pub fn apply_control(record: &mut CalcRecord, content: &str) {
    for token in content.split('$') {
        if token.starts_with("cosmo\n") {
            record.cosmo = Some(equality_map(token));
        } else if token.starts_with("rundimensions") {
            record.run_dimensions = Some(equality_map(token));
        } else if token.starts_with("forceupdate") {
            record.force_update = Some(equality_map(token));
        } else if token.starts_with("scfdamp ") {
            record.scf_damp = Some(equality_map(token));
        } else if token.starts_with("fermi") {
            record.fermi = Some(equality_map(token));
        } else if token.starts_with("scfconv ") {
            record.scf_conv = token.split_whitespace().nth(1).and_then(|v| v.parse().ok());
        } else if token.starts_with("rij") {
            record.ri = true;
        } else if token.starts_with("dft") {
            record.dft = parse_dft_token(token);
        } else if token.starts_with("atoms") {
            let basis: HashMap<String, String> = RE_BASIS
                .captures_iter(token)
                .map(|caps| (caps[1].to_string(), caps[2].to_string()))
                .collect();
            let unique: std::collections::HashSet<&String> = basis.values().collect();
            if unique.len() == 1 {
                // 全元素基组一致时折叠为单值
                record.basis_set = basis.values().next().cloned();
                record.basis_for_element = None;
            } else if !basis.is_empty() {
                record.basis_for_element = Some(basis);
            }
        } else if token.starts_with("disp") {
            record.dispersion = Some(token.trim_matches('\n').to_string());
        } else if token.starts_with("dipole from ridft") {
            record.dipole = parse_dipole_token(token);
        } else if token.starts_with("ssquare") {
            record.s_squared = token.split_whitespace().nth(3).and_then(|v| v.parse().ok());
        }
    }

    let filenames: HashMap<String, String> = RE_FILENAMES
        .captures_iter(content)
        .map(|caps| (caps[1].to_string(), caps[2].to_string()))
        .collect();
    if !filenames.is_empty() {
        record.filenames = Some(filenames);
    }
}

fn equality_map(token: &str) -> HashMap<String, String> {
    RE_EQUALITY
        .captures_iter(token)
        .map(|caps| (caps[1].to_string(), caps[2].to_string()))
        .collect()
}

/// $dft 块：functional 与 gridsize 关键字的右侧值
fn parse_dft_token(token: &str) -> Option<DftSettings> {
    let right_of = |keyword: &str| -> Option<String> {
        let pattern = Regex::new(&format!(r"{}[ \t]*([^\n\r]*)", keyword)).ok()?;
        pattern
            .captures(token)
            .map(|caps| caps[1].trim().to_string())
    };
    Some(DftSettings {
        functional: right_of("functional")?,
        gridsize: right_of("gridsize")?,
    })
}

fn parse_dipole_token(token: &str) -> Option<DipoleMoment> {
    let xyz_caps = RE_DIPOLE_XYZ.captures(token)?;
    let total_caps = RE_DIPOLE_TOTAL.captures(token)?;
    Some(DipoleMoment {
        x: xyz_caps[1].parse().ok()?,
        y: xyz_caps[2].parse().ok()?,
        z: xyz_caps[3].parse().ok()?,
        total: total_caps[1].parse().ok(),
    })
}

/// energy 日志：倒数第二行（末行是 $end 页脚）的三个浮点
/// [总能量, 动能, 势能]，单位 Hartree
pub fn read_energy_file(path: &Path) -> Result<[f64; 3]> {
    let content = fs::read_to_string(path).map_err(|e| QcdcError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_energy_content(&content, &path.display().to_string())
}

pub fn parse_energy_content(content: &str, origin: &str) -> Result<[f64; 3]> {
    let lines: Vec<&str> = content.lines().collect();
    if lines.len() < 2 {
        return Err(QcdcError::FormatError {
            format: "energy".to_string(),
            path: origin.to_string(),
            reason: "File too short".to_string(),
        });
    }

    let data_line = lines[lines.len() - 2];
    let caps = RE_ENERGY
        .captures(data_line)
        .ok_or_else(|| QcdcError::FormatError {
            format: "energy".to_string(),
            path: origin.to_string(),
            reason: format!("Unrecognized energy line: '{}'", data_line),
        })?;

    Ok([
        caps[1].parse().unwrap_or(f64::NAN),
        caps[2].parse().unwrap_or(f64::NAN),
        caps[3].parse().unwrap_or(f64::NAN),
    ])
}

/// coord 文件（bohr），无坐标行时返回 None
pub fn read_coord_file(path: &Path) -> Result<Option<Geometry>> {
    let content = fs::read_to_string(path).map_err(|e| QcdcError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(parse_coord_content(&content))
}

pub fn parse_coord_content(content: &str) -> Option<Geometry> {
    let mut elements = Vec::new();
    let mut coordinates = Vec::new();
    for caps in RE_COORD.captures_iter(content) {
        let values: Vec<f64> = (1..4).filter_map(|k| caps[k].parse().ok()).collect();
        if values.len() == 3 {
            elements.push(caps[4].to_string());
            coordinates.push([values[0], values[1], values[2]]);
        }
    }

    if elements.is_empty() {
        return None;
    }
    Some(Geometry::from_bohr(elements, coordinates))
}

/// vibspectrum：(模式号, 波数) 对，按波数升序返回
pub fn read_vibspectrum(path: &Path) -> Result<Vec<f64>> {
    let content = fs::read_to_string(path).map_err(|e| QcdcError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(parse_vibspectrum_content(&content))
}

pub fn parse_vibspectrum_content(content: &str) -> Vec<f64> {
    let mut frequencies: Vec<f64> = RE_VIBSPECTRUM
        .captures_iter(content)
        .filter_map(|caps| caps[2].parse().ok())
        .collect();
    frequencies.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    frequencies
}

/// eiger.out：固定列 28..39 的 HOMO/LUMO 能量与第二列轨道号
fn read_eiger(record: &mut CalcRecord, path: &Path) -> Result<()> {
    let content = fs::read_to_string(path).map_err(|e| QcdcError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    for line in content.lines() {
        if line.contains("HOMO:") {
            record.homo = Some(parse_eiger_line(line, path)?);
        }
        if line.contains("LUMO:") {
            record.lumo = Some(parse_eiger_line(line, path)?);
        }
    }
    Ok(())
}

fn parse_eiger_line(line: &str, path: &Path) -> Result<OrbitalInfo> {
    let malformed = || QcdcError::FormatError {
        format: "eiger".to_string(),
        path: path.display().to_string(),
        reason: format!("Unrecognized orbital line: '{}'", line),
    };

    let energy: f64 = line
        .get(28..39)
        .and_then(|field| field.trim().parse().ok())
        .ok_or_else(malformed)?;
    let index: u32 = line
        .split_whitespace()
        .nth(1)
        .and_then(|field| field.parse::<f64>().ok())
        .map(|value| value as u32)
        .ok_or_else(malformed)?;

    Ok(OrbitalInfo { energy, index })
}

/// CosmoRS 汇总表：名为 out 的行从字节偏移 80 起的自由能，cal → J
fn read_cosmors(record: &mut CalcRecord, path: &Path) -> Result<()> {
    let content = fs::read_to_string(path).map_err(|e| QcdcError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    for line in content.lines() {
        if line.contains("out") {
            let value: f64 = line
                .get(80..)
                .and_then(|field| field.trim().parse().ok())
                .ok_or_else(|| QcdcError::FormatError {
                    format: "cosmors".to_string(),
                    path: path.display().to_string(),
                    reason: format!("No free energy value at column 80: '{}'", line),
                })?;
            record.cosmo_rs = Some(value * CAL2J);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const CONTROL: &str = "$title\n\
$symmetry c1\n\
$coord    file=coord\n\
$atoms\n\
    basis =c def2-TZVP\n\
    basis =h def2-TZVP\n\
$scfconv 7\n\
$scfdamp   start=0.300  step=0.050  min=0.100\n\
$rij\n\
$dft\n\
   functional b3-lyp\n\
   gridsize   m4\n\
$disp3 -bj\n\
$cosmo\n\
  epsilon=78.40\n\
  rsolv= 1.30\n\
$dipole from ridft\n\
  x     0.00000000    y     0.00000000    z    -0.82957827    a.u.\n\
   | dipole | =    2.1086124750  debye\n\
$ssquare from ridft\n\
          0.750 (ideal: 0.750)\n\
$energy    file=energy\n\
$grad    file=gradient\n\
$end\n";

    fn parsed_control() -> CalcRecord {
        let mut record =
            CalcRecord::new(CalcKind::Turbomole, &PathBuf::from("./CONF1"), "control");
        apply_control(&mut record, CONTROL);
        record
    }

    #[test]
    fn test_control_scfconv_is_integer() {
        let record = parsed_control();
        assert_eq!(record.scf_conv, Some(7));
    }

    #[test]
    fn test_control_blocks() {
        let record = parsed_control();
        assert!(record.ri);
        let damp = record.scf_damp.unwrap();
        assert_eq!(damp.get("start").map(String::as_str), Some("0.300"));
        let cosmo = record.cosmo.unwrap();
        assert_eq!(cosmo.get("epsilon").map(String::as_str), Some("78.40"));
        let dft = record.dft.unwrap();
        assert_eq!(dft.functional, "b3-lyp");
        assert_eq!(dft.gridsize, "m4");
        assert_eq!(record.dispersion.as_deref(), Some("disp3 -bj"));
        assert!((record.s_squared.unwrap() - 0.750).abs() < 1e-9);
    }

    #[test]
    fn test_control_uniform_basis_collapses() {
        let record = parsed_control();
        assert_eq!(record.basis_set.as_deref(), Some("def2-TZVP"));
        assert!(record.basis_for_element.is_none());
    }

    #[test]
    fn test_control_mixed_basis_keeps_mapping() {
        let mut record =
            CalcRecord::new(CalcKind::Turbomole, &PathBuf::from("./job"), "control");
        let control = "$atoms\n    basis =c def2-TZVP\n    basis =h def2-SV(P)\n$end\n";
        apply_control(&mut record, control);

        assert!(record.basis_set.is_none());
        let mapping = record.basis_for_element.unwrap();
        assert_eq!(mapping.get("c").map(String::as_str), Some("def2-TZVP"));
        assert_eq!(mapping.get("h").map(String::as_str), Some("def2-SV(P)"));
    }

    #[test]
    fn test_control_filename_roles() {
        let record = parsed_control();
        let filenames = record.filenames.unwrap();
        assert_eq!(filenames.get("coord").map(String::as_str), Some("coord"));
        assert_eq!(filenames.get("energy").map(String::as_str), Some("energy"));
        assert_eq!(filenames.get("grad").map(String::as_str), Some("gradient"));
    }

    #[test]
    fn test_control_dipole() {
        let record = parsed_control();
        let dipole = record.dipole.unwrap();
        assert!((dipole.z + 0.82957827).abs() < 1e-9);
        assert!((dipole.total.unwrap() - 2.1086124750).abs() < 1e-9);
    }

    #[test]
    fn test_energy_reader_takes_second_to_last_line() {
        // 数据行前 6 列是循环号字段，前导空格有意义
        let content = [
            "$energy      SCF               SCFKIN            SCFPOT",
            "     1   -76.10000000000   75.90000000000  -152.00000000000",
            "     2   -76.34289838652   75.94700574154  -152.28990412807",
            "$end",
        ]
        .join("\n");

        let energies = parse_energy_content(&content, "test").unwrap();
        assert!((energies[0] + 76.34289838652).abs() < 1e-12);
        assert!((energies[1] - 75.94700574154).abs() < 1e-12);
        assert!((energies[2] + 152.28990412807).abs() < 1e-12);
    }

    #[test]
    fn test_energy_reader_rejects_garbage() {
        let content = "$energy\nnot a data line\n$end\n";
        assert!(matches!(
            parse_energy_content(content, "test"),
            Err(QcdcError::FormatError { .. })
        ));
    }

    #[test]
    fn test_vibspectrum_sorted() {
        let content = "$vibrational spectrum\n\
#  mode     symmetry     wave number   IR intensity\n\
     1                        0.00         0.00000\n\
     2                        0.00         0.00000\n\
     3                     3657.05        44.10000\n\
     4                     1595.62        33.00000\n\
$end\n";

        let freqs = parse_vibspectrum_content(content);
        assert_eq!(freqs.len(), 4);
        assert!(freqs.windows(2).all(|w| w[0] <= w[1]));
        assert!((freqs[3] - 3657.05).abs() < 1e-9);
    }

    #[test]
    fn test_vibspectrum_imaginary_mode_first() {
        let content = "     1                     -482.33         0.00000\n\
     2                      812.50         1.20000\n";
        let freqs = parse_vibspectrum_content(content);
        assert_eq!(freqs, vec![-482.33, 812.50]);
    }

    #[test]
    fn test_coord_reader_scales_bohr() {
        let content = "$coord\n\
    0.00000000000000      0.00000000000000      0.22143138970869      o\n\
    1.42885661975663      0.00000000000000     -0.88572555883477      h\n\
   -1.42885661975663      0.00000000000000     -0.88572555883477      h\n\
$end\n";

        let geometry = parse_coord_content(content).unwrap();
        assert_eq!(geometry.elements, vec!["o", "h", "h"]);
        // 1.42885661975663 bohr = 0.7561 Å
        assert!((geometry.coordinates[1][0] - 1.42885661975663 * 0.529177210903).abs() < 1e-9);
    }

    #[test]
    fn test_coord_reader_empty() {
        assert!(parse_coord_content("$coord\n$end\n").is_none());
    }
}
