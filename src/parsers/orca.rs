//! # ORCA 输出解析器
//!
//! 解析 ORCA 计算输出文件：回显输入段的指令、逐行正则扫描的
//! 标量字段、势能面扫描表与振动频率表。
//!
//! ## 依赖关系
//! - 被 `parsers/mod.rs` 分派
//! - 使用 `models/`, `parsers/xyz.rs`, `thermo`（单位换算）

use crate::error::{QcdcError, Result};
use crate::models::{CalcKind, CalcRecord, DipoleMoment, Geometry};
use crate::parsers::xyz;
use crate::thermo::EH2KJMOL;
use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

/// 内容嗅探：三个横幅串全部存在才认定为 ORCA 输出
///
/// 防止同目录下其他程序的 *.out 文件误判
pub fn looks_like_orca(content: &str) -> bool {
    const INDICATORS: [&str; 3] = [
        "* O   R   C   A *",
        "CARTESIAN COORDINATES (A.U.)",
        "FINAL SINGLE POINT ENERGY",
    ];
    INDICATORS.iter().all(|marker| content.contains(marker))
}

// ─────────────────────────────────────────────────────────────
// 输出正文的逐行扫描模式（单次前向遍历，后出现者覆盖前值）
// ─────────────────────────────────────────────────────────────

static RE_TEMPERATURE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Temperature\s+\.\.\.\s+([\d\.]+)\s+K").unwrap());
static RE_PRESSURE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Pressure\s+\.\.\.\s+([\d\.]+)\s+atm").unwrap());
static RE_TOTAL_MASS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Total Mass\s+\.\.\.\s+([\d\.]+)\s+AMU").unwrap());
static RE_GIBBS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Final Gibbs free energy\s+\.\.\.\s+([\d\.\-]+)\s+Eh").unwrap());
static RE_INNER_ENERGY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Total correction\s+([\d\.\-]+)\s+Eh\s+([\d\.\-]+)\s+kcal/mol").unwrap()
});
static RE_ENTROPY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Total entropy correction\s+\.\.\.\s+([\d\.\-]+)\s+Eh\s+([\d\.\-]+)\s+kcal/mol")
        .unwrap()
});
static RE_DIPOLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Total Dipole Moment\s+:\s+([\d\.\-]+)\s+([\d\.\-]+)\s+([\d\.\-]+)").unwrap()
});
static RE_NUM_ATOMS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Number of atoms\s+\.\.\.\s+(\d+)").unwrap());
static RE_SINGLE_POINT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^FINAL SINGLE POINT ENERGY\s+([\d\.\-]+)").unwrap());
static RE_G_MINUS_E_EL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^G-E\(el\)\s+\.\.\.\s+([\d\.\-]+)\s+Eh\s+([\d\.\-]+)\s+kcal/mol").unwrap()
});
static RE_ZPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Zero point energy\s+\.\.\.\s+([\d\.\-]+)\s+Eh\s+([\d\.\-]+)\s+kcal/mol").unwrap()
});
static RE_SCAN_ROW: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d+\.\d+)\s+(-?\d+\.\d+)\s*$").unwrap());

/// 输入段的坐标来源
enum CoordinateSource {
    /// *xyz：坐标直接嵌入输入
    Embedded(Geometry),
    /// *xyzfile：引用外部 xyz 文件（小写化的文件名）
    File(String),
}

/// 解析一个 ORCA 输出文件为计算记录
pub fn parse_orca(root: &Path, filename: &str, files: &[String]) -> Result<CalcRecord> {
    let path = root.join(filename);
    let path_str = path.display().to_string();
    let content = fs::read_to_string(&path).map_err(|e| QcdcError::FileReadError {
        path: path_str.clone(),
        source: e,
    })?;
    let lines: Vec<&str> = content.lines().collect();

    let mut record = CalcRecord::new(CalcKind::Orca, root, filename);

    // 1. 输入回显段的指令与坐标
    let input_lines = extract_input_block(&lines, &path_str)?;
    let coordinate_source = parse_input_directives(&mut record, &input_lines, &path_str)?;

    let input_geometry = match coordinate_source {
        CoordinateSource::Embedded(geometry) => geometry,
        CoordinateSource::File(wanted) => {
            // 大小写不敏感匹配目录中的实际文件名
            let actual = files
                .iter()
                .find(|name| name.to_lowercase() == wanted)
                .ok_or_else(|| QcdcError::LookupFailure {
                    what: format!("coordinate file '{}'", wanted),
                    path: record.root.clone(),
                })?;
            let (_, _, geometry) = xyz::parse_xyz_file(&root.join(actual))?;
            geometry
        }
    };

    // 2. 正文扫描
    scan_body(&mut record, &lines);

    // 3. 几何取舍：未做结构优化时输入坐标权威，否则优先收敛几何
    let base_name = filename.strip_suffix(".out").unwrap_or(filename).to_string();
    let xyz_file = format!("{}.xyz", base_name);
    record.base_name = Some(base_name);
    record.xyz_file_name = Some(format!(
        "./xyz/{}",
        format!("{}/{}", record.root.trim_start_matches("./"), xyz_file).replace('/', "_")
    ));

    let optimized_geometry = if files.iter().any(|name| *name == xyz_file) {
        let (_, _, geometry) = xyz::parse_xyz_file(&root.join(&xyz_file))?;
        Some(geometry)
    } else {
        None
    };

    let input_authoritative =
        !record.geometry_optimization && !record.transition_state_optimization;
    record.geometry = if input_authoritative {
        Some(input_geometry)
    } else {
        Some(optimized_geometry.unwrap_or(input_geometry))
    };
    if let Some(ref geometry) = record.geometry {
        record.num_atoms = Some(geometry.num_atoms());
    }

    // 4. 扫描表
    if record.surface_scan {
        record.surface = parse_scan_table(&lines);
    }

    // 5. 频率表
    if record.frequency_calculation {
        let num_atoms = record.num_atoms.ok_or_else(|| QcdcError::MissingField {
            field: "Number of Atoms".to_string(),
            path: path_str.clone(),
        })?;
        record.frequencies = Some(extract_last_frequencies(&lines, 3 * num_atoms, &path_str)?);
    }

    Ok(record)
}

/// 提取 INPUT FILE 与 ****END OF INPUT**** 之间的输入回显，
/// 剥除 5 列回显前缀并转小写
fn extract_input_block(lines: &[&str], path: &str) -> Result<Vec<String>> {
    let mut input_start = None;
    let mut input_end = None;

    for (i, line) in lines.iter().enumerate() {
        if line.contains("INPUT FILE") && input_start.is_none() {
            // 横幅后跟分隔线与 NAME 行，正文从第 3 行开始
            input_start = Some(i + 3);
        }
        if line.contains("****END OF INPUT****") {
            input_end = Some(i + 1);
            break;
        }
    }

    match (input_start, input_end) {
        (Some(start), Some(end)) if start <= end => Ok(lines[start..end]
            .iter()
            .map(|line| line.get(5..).unwrap_or("").to_lowercase())
            .collect()),
        _ => Err(QcdcError::FormatError {
            format: "orca input".to_string(),
            path: path.to_string(),
            reason: "Embedded input block markers not found".to_string(),
        }),
    }
}

/// 逐行解析输入指令：任务标志、电荷/多重度、坐标块
fn parse_input_directives(
    record: &mut CalcRecord,
    input_lines: &[String],
    path: &str,
) -> Result<CoordinateSource> {
    let mut embedded = false;
    let mut internal = false;
    let mut coordinate_file: Option<String> = None;
    let mut span_start: Option<usize> = None;
    let mut span_end: Option<usize> = None;

    for (i, line) in input_lines.iter().enumerate() {
        // # 之后是注释
        let cut = line.split('#').next().unwrap_or("").trim_start();

        if cut.starts_with('!') {
            record.geometry_optimization |= cut.contains("opt");
            record.frequency_calculation |= cut.contains("freq");
            record.transition_state_optimization |= cut.contains("tsopt");
        }
        if cut.starts_with("%geom scan") {
            record.surface_scan = true;
        }

        if cut.starts_with('*') {
            embedded |= cut.starts_with("*xyz ");
            internal |= cut.starts_with("*int ");
            if cut.starts_with("*xyzfile ") && coordinate_file.is_none() {
                let tokens: Vec<&str> = cut[1..].split_whitespace().collect();
                if tokens.len() < 4 {
                    return Err(QcdcError::FormatError {
                        format: "orca input".to_string(),
                        path: path.to_string(),
                        reason: format!("Malformed *xyzfile line: '{}'", cut),
                    });
                }
                coordinate_file = Some(tokens[3].to_string());
            }
            if record.charge.is_none() && record.multiplicity.is_none() {
                let tokens: Vec<&str> = cut[1..].split_whitespace().collect();
                if tokens.len() >= 3 {
                    record.charge = tokens[1].parse().ok();
                    record.multiplicity = tokens[2].parse().ok();
                }
            }
        }

        // 坐标块跨度：首个 * 行之后，到匹配的 end/* 行为止
        if (cut.starts_with("end") || cut.starts_with('*'))
            && span_end.is_none()
            && span_start.is_some()
        {
            span_end = Some(i);
        } else if cut.starts_with('*') && span_start.is_none() {
            span_start = Some(i + 1);
        }
    }

    if embedded {
        let (start, end) = match (span_start, span_end) {
            (Some(start), Some(end)) if start <= end => (start, end),
            _ => {
                return Err(QcdcError::FormatError {
                    format: "orca input".to_string(),
                    path: path.to_string(),
                    reason: "Unterminated coordinate block".to_string(),
                })
            }
        };
        let geometry = parse_embedded_coordinates(&input_lines[start..end], path)?;
        return Ok(CoordinateSource::Embedded(geometry));
    }
    if let Some(name) = coordinate_file {
        return Ok(CoordinateSource::File(name));
    }
    if internal {
        return Err(QcdcError::FormatError {
            format: "orca input".to_string(),
            path: path.to_string(),
            reason: "Internal coordinates are not supported".to_string(),
        });
    }
    Err(QcdcError::FormatError {
        format: "orca input".to_string(),
        path: path.to_string(),
        reason: "No coordinate block found in input".to_string(),
    })
}

/// 解析嵌入坐标块：每行恰好 元素 + 三个浮点
fn parse_embedded_coordinates(lines: &[String], path: &str) -> Result<Geometry> {
    let mut elements = Vec::new();
    let mut coordinates = Vec::new();

    for line in lines {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() != 4 {
            return Err(QcdcError::FormatError {
                format: "orca input".to_string(),
                path: path.to_string(),
                reason: format!("Malformed coordinate line: '{}'", line.trim()),
            });
        }
        let values: Vec<f64> = parts[1..4].iter().filter_map(|s| s.parse().ok()).collect();
        if values.len() != 3 {
            return Err(QcdcError::FormatError {
                format: "orca input".to_string(),
                path: path.to_string(),
                reason: format!("Non-numeric coordinate in line: '{}'", line.trim()),
            });
        }
        elements.push(parts[0].to_string());
        coordinates.push([values[0], values[1], values[2]]);
    }

    Ok(Geometry::new(elements, coordinates))
}

/// 正文扫描：各模式互相独立，重复出现时最后一次匹配有效
/// （输出是追加式日志，重启步骤的新值覆盖旧值）
fn scan_body(record: &mut CalcRecord, lines: &[&str]) {
    for line in lines {
        if let Some(caps) = RE_TEMPERATURE.captures(line) {
            record.temperature = caps[1].parse().ok();
        }
        if let Some(caps) = RE_PRESSURE.captures(line) {
            record.pressure = caps[1].parse().ok();
        }
        if let Some(caps) = RE_TOTAL_MASS.captures(line) {
            record.total_mass = caps[1].parse().ok();
        }
        if let Some(caps) = RE_SINGLE_POINT.captures(line) {
            record.single_point_energy = caps[1].parse::<f64>().ok().map(|e| e * EH2KJMOL);
        }
        if let Some(caps) = RE_GIBBS.captures(line) {
            record.gibbs_free_energy = caps[1].parse::<f64>().ok().map(|e| e * EH2KJMOL);
        }
        if let Some(caps) = RE_G_MINUS_E_EL.captures(line) {
            record.g_minus_e_el = caps[1].parse::<f64>().ok().map(|e| e * EH2KJMOL);
        }
        if let Some(caps) = RE_INNER_ENERGY.captures(line) {
            record.inner_energy = caps[1].parse::<f64>().ok().map(|e| e * EH2KJMOL);
        }
        if let Some(caps) = RE_ENTROPY.captures(line) {
            record.entropy_correction = caps[1].parse::<f64>().ok().map(|e| e * EH2KJMOL);
        }
        if let Some(caps) = RE_DIPOLE.captures(line) {
            let values: Vec<f64> = (1..4).filter_map(|k| caps[k].parse().ok()).collect();
            if values.len() == 3 {
                record.dipole = Some(DipoleMoment {
                    x: values[0],
                    y: values[1],
                    z: values[2],
                    total: None,
                });
            }
        }
        if let Some(caps) = RE_NUM_ATOMS.captures(line) {
            record.num_atoms = caps[1].parse().ok();
        }
        if let Some(caps) = RE_ZPE.captures(line) {
            record.zero_point_energy_parsed = caps[1].parse::<f64>().ok().map(|e| e * EH2KJMOL);
        }
    }
}

/// 提取势能面扫描表：固定横幅之后的 (坐标, 能量) 行
fn parse_scan_table(lines: &[&str]) -> Option<Vec<(f64, f64)>> {
    let banner = lines
        .iter()
        .position(|line| line.contains("The Calculated Surface using the 'Actual Energy'"))?;

    let mut surface = Vec::new();
    for line in &lines[banner + 1..] {
        match RE_SCAN_ROW.captures(line) {
            Some(caps) => {
                let coordinate: f64 = caps[1].parse().ok()?;
                let energy: f64 = caps[2].parse().ok()?;
                surface.push((coordinate, energy * EH2KJMOL));
            }
            None => break,
        }
    }

    (!surface.is_empty()).then_some(surface)
}

/// 收集波数行并保留最后 3N 条，升序返回
///
/// 优化过程会为中间结构重复打印频率表，只有最后一张有效；
/// 行数不是 3N 的整数倍说明输出结构损坏
fn extract_last_frequencies(lines: &[&str], degrees_of_freedom: usize, path: &str) -> Result<Vec<f64>> {
    let mut frequencies: Vec<f64> = Vec::new();
    for line in lines {
        if !line.contains("cm**-1") {
            continue;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 2 {
            continue;
        }
        if let Ok(freq) = parts[1].parse::<f64>() {
            frequencies.push(freq);
        }
    }

    if frequencies.is_empty() || frequencies.len() % degrees_of_freedom != 0 {
        return Err(QcdcError::StructuralMismatch {
            path: path.to_string(),
            what: "frequency table entries".to_string(),
            expected: degrees_of_freedom,
            found: frequencies.len(),
        });
    }

    let mut last: Vec<f64> = frequencies[frequencies.len() - degrees_of_freedom..].to_vec();
    last.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    Ok(last)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn echo_input(body: &[&str]) -> String {
        let mut out = String::new();
        out.push_str("================================================================================\n");
        out.push_str("                                       INPUT FILE\n");
        out.push_str("================================================================================\n");
        out.push_str("NAME = job.inp\n");
        for (i, line) in body.iter().enumerate() {
            out.push_str(&format!("|{:>3}> {}\n", i + 1, line));
        }
        out.push_str(&format!("|{:>3}>                          ****END OF INPUT****\n", body.len() + 1));
        out
    }

    #[test]
    fn test_extract_input_block() {
        let content = echo_input(&["! B3LYP Opt", "*xyz 0 1", "O 0.0 0.0 0.0", "*"]);
        let lines: Vec<&str> = content.lines().collect();
        let block = extract_input_block(&lines, "test").unwrap();
        assert_eq!(block[0].trim_start(), "! b3lyp opt");
        assert_eq!(block[1].trim_start(), "*xyz 0 1");
    }

    #[test]
    fn test_input_block_missing_markers() {
        let lines = vec!["no banner here", "FINAL SINGLE POINT ENERGY -1.0"];
        assert!(matches!(
            extract_input_block(&lines, "test"),
            Err(QcdcError::FormatError { .. })
        ));
    }

    #[test]
    fn test_parse_directives_embedded_coordinates() {
        let mut record =
            CalcRecord::new(CalcKind::Orca, Path::new("./job"), "job.out");
        let input: Vec<String> = vec![
            "! b3lyp def2-svp freq tightscf".to_string(),
            "*xyz 0 1".to_string(),
            "o 0.0 0.0 0.1173".to_string(),
            "h 0.0 0.7572 -0.4692".to_string(),
            "h 0.0 -0.7572 -0.4692".to_string(),
            "*".to_string(),
        ];
        let source = parse_input_directives(&mut record, &input, "test").unwrap();

        assert!(record.frequency_calculation);
        assert!(!record.geometry_optimization);
        assert_eq!(record.charge, Some(0));
        assert_eq!(record.multiplicity, Some(1));
        match source {
            CoordinateSource::Embedded(geometry) => {
                assert_eq!(geometry.num_atoms(), 3);
                assert_eq!(geometry.elements[0], "o");
            }
            _ => panic!("expected embedded coordinates"),
        }
    }

    #[test]
    fn test_parse_directives_xyzfile_reference() {
        let mut record =
            CalcRecord::new(CalcKind::Orca, Path::new("./job"), "job.out");
        let input: Vec<String> = vec![
            "! pbe0 opt".to_string(),
            "*xyzfile 1 2 Start.xyz".to_string(),
        ];
        let source = parse_input_directives(&mut record, &input, "test").unwrap();

        assert!(record.geometry_optimization);
        assert_eq!(record.charge, Some(1));
        assert_eq!(record.multiplicity, Some(2));
        // 输入已小写化
        match source {
            CoordinateSource::File(name) => assert_eq!(name, "start.xyz"),
            _ => panic!("expected coordinate file reference"),
        }
    }

    #[test]
    fn test_parse_directives_internal_coordinates_unsupported() {
        let mut record =
            CalcRecord::new(CalcKind::Orca, Path::new("./job"), "job.out");
        let input: Vec<String> = vec!["*int 0 1".to_string(), "end".to_string()];
        assert!(matches!(
            parse_input_directives(&mut record, &input, "test"),
            Err(QcdcError::FormatError { .. })
        ));
    }

    #[test]
    fn test_parse_directives_malformed_embedded_row() {
        let mut record =
            CalcRecord::new(CalcKind::Orca, Path::new("./job"), "job.out");
        let input: Vec<String> = vec![
            "*xyz 0 1".to_string(),
            "o 0.0 0.0".to_string(),
            "*".to_string(),
        ];
        assert!(matches!(
            parse_input_directives(&mut record, &input, "test"),
            Err(QcdcError::FormatError { .. })
        ));
    }

    #[test]
    fn test_scan_body_last_match_wins() {
        let mut record =
            CalcRecord::new(CalcKind::Orca, Path::new("./job"), "job.out");
        let lines = vec![
            "FINAL SINGLE POINT ENERGY      -76.300000000000",
            "some unrelated line",
            "FINAL SINGLE POINT ENERGY      -76.400000000000",
            "Temperature         ... 298.15 K",
            "Pressure            ... 1.0000 atm",
            "Total Mass          ... 18.02 AMU",
            "Number of atoms     ...  3",
            "Total Dipole Moment    :      0.50000      -0.20000       0.10000",
            "Final Gibbs free energy         ...     -76.38000000 Eh",
            "G-E(el)                           ...     0.00200000 Eh       1.26 kcal/mol",
        ];
        scan_body(&mut record, &lines);

        assert!((record.single_point_energy.unwrap() - (-76.4 * EH2KJMOL)).abs() < 1e-6);
        assert!((record.temperature.unwrap() - 298.15).abs() < 1e-9);
        assert_eq!(record.num_atoms, Some(3));
        assert!((record.gibbs_free_energy.unwrap() - (-76.38 * EH2KJMOL)).abs() < 1e-6);
        assert!((record.g_minus_e_el.unwrap() - (0.002 * EH2KJMOL)).abs() < 1e-9);
        let dipole = record.dipole.unwrap();
        assert!((dipole.y + 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_parse_scan_table() {
        let lines = vec![
            "The Calculated Surface using the 'Actual Energy'",
            "   1.2000000   -76.3000000",
            "   1.3000000   -76.3100000",
            "",
            "other content",
        ];
        let surface = parse_scan_table(&lines).unwrap();
        assert_eq!(surface.len(), 2);
        assert!((surface[0].0 - 1.2).abs() < 1e-9);
        assert!((surface[1].1 - (-76.31 * EH2KJMOL)).abs() < 1e-6);
    }

    #[test]
    fn test_extract_last_frequencies_keeps_final_table() {
        // 两张 3N=9 的表（优化中间步骤 + 收敛结构），只保留后者
        let mut lines: Vec<String> = Vec::new();
        for k in 0..9 {
            lines.push(format!("  {}:    {:.2} cm**-1", k, 100.0 * k as f64));
        }
        for k in 0..9 {
            lines.push(format!("  {}:    {:.2} cm**-1", k, 50.0 + k as f64));
        }
        let refs: Vec<&str> = lines.iter().map(|s| s.as_str()).collect();
        let freqs = extract_last_frequencies(&refs, 9, "test").unwrap();

        assert_eq!(freqs.len(), 9);
        assert!((freqs[0] - 50.0).abs() < 1e-9);
        assert!((freqs[8] - 58.0).abs() < 1e-9);
    }

    #[test]
    fn test_extract_frequencies_sorted_with_imaginary() {
        let lines = vec![
            "  0:    0.00 cm**-1",
            "  1:    -482.33 cm**-1",
            "  2:    1650.12 cm**-1",
        ];
        let freqs = extract_last_frequencies(&lines, 3, "test").unwrap();
        assert_eq!(freqs, vec![-482.33, 0.0, 1650.12]);
    }

    #[test]
    fn test_extract_frequencies_count_mismatch() {
        let lines = vec!["  0:    100.00 cm**-1", "  1:    200.00 cm**-1"];
        assert!(matches!(
            extract_last_frequencies(&lines, 9, "test"),
            Err(QcdcError::StructuralMismatch { .. })
        ));
    }
}
