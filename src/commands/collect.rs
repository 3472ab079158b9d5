//! # collect 命令实现
//!
//! 遍历计算目录树：识别每个目录中的计算任务，运行对应解析器，
//! 对几何+频率齐备的记录做热力学派生，最后汇总为 JSON / CSV。
//!
//! ## 失败语义
//! - 结构不匹配（坐标数、频率数、未映射点群之外的硬错误）：
//!   丢弃该记录并打印含路径的诊断，遍历继续
//! - 未映射点群 / 元素查不到：仅跳过该记录的热力学派生
//! - 缺少前置字段：跳过对应计算，记录保留
//!
//! ## 依赖关系
//! - 使用 `cli/collect.rs` 定义的参数
//! - 使用 `parsers/`, `thermo/`, `batch/`
//! - 使用 `utils/output.rs`

use crate::batch::{BatchRunner, DirectoryCollector};
use crate::cli::collect::CollectArgs;
use crate::error::{QcdcError, Result};
use crate::models::{CalcKind, CalcRecord};
use crate::parsers::{self, xyz, ExtractorId};
use crate::thermo::{self, ThermoConfig};
use crate::utils::output;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tabled::{Table, Tabled};

/// 汇总表行：每种计算类型一行
#[derive(Debug, Tabled)]
struct SummaryRow {
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Records")]
    records: usize,
    #[tabled(rename = "With Geometry")]
    with_geometry: usize,
    #[tabled(rename = "With Thermo")]
    with_thermo: usize,
}

/// 单个目录的处理结果
#[derive(Default)]
struct DirOutcome {
    records: Vec<CalcRecord>,
    messages: Vec<String>,
    dropped: usize,
}

/// 执行 collect 命令
pub fn execute(args: CollectArgs) -> Result<()> {
    output::print_header("Collecting Quantum Chemistry Results");

    if !args.root.exists() {
        return Err(QcdcError::DirectoryNotFound {
            path: args.root.display().to_string(),
        });
    }

    let config = ThermoConfig {
        temperature: args.temperature,
        ..ThermoConfig::default()
    };

    let directories = DirectoryCollector::new(args.root.clone())
        .with_ignore_file(&args.ignore_file)
        .collect();
    output::print_info(&format!("Scanning {} directories...", directories.len()));

    let runner = BatchRunner::new(args.jobs);
    let outcomes = runner.run(directories, "Parsing", |directory| {
        process_directory(directory, &args, &config)
    });

    let mut records: Vec<CalcRecord> = Vec::new();
    let mut dropped = 0;
    for outcome in outcomes {
        for message in &outcome.messages {
            output::print_warning(message);
        }
        dropped += outcome.dropped;
        records.extend(outcome.records);
    }

    if records.is_empty() {
        output::print_warning("No calculations found.");
        return Ok(());
    }

    if args.save_xyz {
        let written = write_xyz_exports(&records)?;
        output::print_success(&format!("Wrote {} xyz files into 'xyz/'", written));
    }

    write_json(&records, &args.output_json)?;
    output::print_success(&format!(
        "Record set saved to '{}'",
        args.output_json.display()
    ));
    write_csv(&records, &args.output_csv)?;
    output::print_success(&format!(
        "Flat summary saved to '{}'",
        args.output_csv.display()
    ));

    print_summary(&records);
    if dropped > 0 {
        output::print_warning(&format!("{} records dropped due to parse errors", dropped));
    }
    output::print_done(&format!("Collected {} records", records.len()));

    Ok(())
}

/// 处理单个目录：识别 → 解析 → 热力学派生
///
/// 错误在此被捕获为诊断信息，不向上冒泡，目录之间互不影响
fn process_directory(root: &PathBuf, args: &CollectArgs, config: &ThermoConfig) -> DirOutcome {
    let mut outcome = DirOutcome::default();

    let files = match list_files(root) {
        Ok(files) => files,
        Err(e) => {
            outcome.messages.push(e.to_string());
            return outcome;
        }
    };

    let ids: Vec<ExtractorId> = parsers::classify(root, &files)
        .into_iter()
        .filter(|id| extractor_enabled(id, args))
        .collect();

    for id in ids {
        match parsers::run_extractor(&id, root, &files) {
            Ok(mut record) => match enrich_with_thermo(&mut record, config, &mut outcome.messages)
            {
                Ok(()) => outcome.records.push(record),
                Err(e) => {
                    outcome.messages.push(format!("{} - record dropped", e));
                    outcome.dropped += 1;
                }
            },
            Err(e) => {
                outcome.messages.push(format!("{} - record dropped", e));
                outcome.dropped += 1;
            }
        }
    }

    outcome
}

fn list_files(root: &Path) -> Result<Vec<String>> {
    let entries = fs::read_dir(root).map_err(|e| QcdcError::FileReadError {
        path: root.display().to_string(),
        source: e,
    })?;
    Ok(entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_file())
        .filter_map(|entry| entry.file_name().to_str().map(|s| s.to_string()))
        .collect())
}

fn extractor_enabled(id: &ExtractorId, args: &CollectArgs) -> bool {
    match id.kind() {
        CalcKind::Orca => !args.no_orca,
        CalcKind::Turbomole | CalcKind::Xtb | CalcKind::CosmoRsOnly => !args.no_turbomole,
        CalcKind::Censo => !args.no_censo,
    }
}

/// 频率数据齐备时做热力学派生
///
/// 返回 Err 表示记录必须被丢弃（结构不匹配）；可跳过的问题
/// （缺几何、未映射点群、未知元素）只追加诊断信息
fn enrich_with_thermo(
    record: &mut CalcRecord,
    config: &ThermoConfig,
    messages: &mut Vec<String>,
) -> Result<()> {
    let frequencies = match record.frequencies.clone() {
        Some(frequencies) => frequencies,
        None => return Ok(()),
    };
    let geometry = match record.geometry.clone() {
        Some(geometry) => geometry,
        None => {
            let missing = QcdcError::MissingField {
                field: "geometry".to_string(),
                path: record.root.clone(),
            };
            messages.push(format!("{} - thermodynamic derivation skipped", missing));
            return Ok(());
        }
    };

    thermo::validate_frequency_count(&geometry, &frequencies, config, &record.root)?;

    match thermo::derive(&geometry, &frequencies, config, &record.root) {
        Ok(data) => record.thermo = Some(data),
        Err(
            e @ (QcdcError::UnmappedSymmetry { .. } | QcdcError::LookupFailure { .. }),
        ) => {
            messages.push(format!("{} - thermodynamic derivation skipped", e));
        }
        Err(e) => return Err(e),
    }

    Ok(())
}

/// 每条带几何的记录导出一个 xyz 文件，尾注携带物理属性
fn write_xyz_exports(records: &[CalcRecord]) -> Result<usize> {
    fs::create_dir_all("xyz").map_err(|e| QcdcError::FileWriteError {
        path: "xyz".to_string(),
        source: e,
    })?;

    let mut written = 0;
    for record in records {
        let geometry = match &record.geometry {
            Some(geometry) => geometry,
            None => continue,
        };
        let target = match &record.xyz_file_name {
            Some(name) => PathBuf::from(name),
            None => PathBuf::from(format!(
                "./xyz/{}.xyz",
                format!(
                    "{}/{}",
                    record.root.trim_start_matches("./"),
                    record.source_file
                )
                .replace('/', "_")
            )),
        };

        let comment = format!("{}/{}", record.root, record.source_file);
        let dipole = record.dipole.as_ref().map(|d| [d.x, d.y, d.z]);
        let zpe = record
            .thermo
            .as_ref()
            .and_then(|t| t.zero_point_energy)
            .or(record.zero_point_energy_parsed);
        let trailer = xyz::format_properties(
            record.charge,
            record.s_squared,
            dipole.as_ref(),
            record.frequencies.as_deref(),
            zpe,
        );

        xyz::write_xyz_file(
            &target,
            &geometry.elements,
            &geometry.coordinates,
            &comment,
            trailer.as_deref(),
        )?;
        written += 1;
    }

    Ok(written)
}

fn write_json(records: &[CalcRecord], path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(records)?;
    fs::write(path, json).map_err(|e| QcdcError::FileWriteError {
        path: path.display().to_string(),
        source: e,
    })
}

fn format_opt<T: std::fmt::Display>(value: &Option<T>) -> String {
    value.as_ref().map(|v| v.to_string()).unwrap_or_default()
}

fn format_opt_f64(value: Option<f64>) -> String {
    value.map(|v| format!("{:.6}", v)).unwrap_or_default()
}

/// 扁平 CSV 摘要：稀疏字段留空，消费方须容忍缺失列值
fn write_csv(records: &[CalcRecord], path: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "folder",
        "group",
        "root",
        "source_file",
        "kind",
        "conformer_id",
        "charge",
        "multiplicity",
        "num_atoms",
        "single_point_energy_kjmol",
        "gibbs_free_energy_kjmol",
        "g_minus_e_el_kjmol",
        "cosmo_rs_kjmol",
        "molar_mass",
        "point_group",
        "symmetry_number",
        "zero_point_energy_kjmol",
        "chemical_potential_kjmol",
        "chemical_potential_liquid_kjmol",
        "chemical_potential_sign_inverted_kjmol",
        "chemical_potential_liquid_sign_inverted_kjmol",
    ])?;

    for record in records {
        let thermo = record.thermo.as_ref();
        wtr.write_record([
            record.folder.clone(),
            record.group.clone(),
            record.root.clone(),
            record.source_file.clone(),
            record.kind.to_string(),
            format_opt(&record.conformer_id),
            format_opt(&record.charge),
            format_opt(&record.multiplicity),
            format_opt(&record.num_atoms),
            format_opt_f64(record.single_point_energy),
            format_opt_f64(record.gibbs_free_energy),
            format_opt_f64(record.g_minus_e_el),
            format_opt_f64(record.cosmo_rs),
            format_opt_f64(thermo.map(|t| t.molar_mass)),
            thermo.map(|t| t.point_group.clone()).unwrap_or_default(),
            format_opt(&thermo.map(|t| t.symmetry_number)),
            format_opt_f64(thermo.and_then(|t| t.zero_point_energy)),
            format_opt_f64(thermo.and_then(|t| t.chemical_potential)),
            format_opt_f64(thermo.and_then(|t| t.chemical_potential_liquid)),
            format_opt_f64(thermo.and_then(|t| t.chemical_potential_sign_inverted)),
            format_opt_f64(thermo.and_then(|t| t.chemical_potential_liquid_sign_inverted)),
        ])?;
    }

    wtr.flush().map_err(|e| QcdcError::FileWriteError {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(())
}

/// 按计算类型汇总的终端表格
fn print_summary(records: &[CalcRecord]) {
    let mut counts: BTreeMap<String, (usize, usize, usize)> = BTreeMap::new();
    for record in records {
        let entry = counts.entry(record.kind.to_string()).or_default();
        entry.0 += 1;
        if record.geometry.is_some() {
            entry.1 += 1;
        }
        if record.thermo.is_some() {
            entry.2 += 1;
        }
    }

    let rows: Vec<SummaryRow> = counts
        .into_iter()
        .map(|(kind, (records, with_geometry, with_thermo))| SummaryRow {
            kind,
            records,
            with_geometry,
            with_thermo,
        })
        .collect();

    println!("{}", Table::new(&rows));
}
