//! # CENSO 构象排序解析器
//!
//! 定位结果表的列头签名，跳过其后两行元数据，读到空行为止。
//! 比列数多一个 token 的行是 Boltzmann 选中构象（尾部标记剥除）。
//! 文件含多个阶段时只保留最后一张表。
//!
//! ## 依赖关系
//! - 被 `parsers/mod.rs` 分派
//! - 使用 `models/`

use crate::error::{QcdcError, Result};
use crate::models::{extract_conf_number, CalcKind, CalcRecord, CensoResult};
use std::fs;
use std::path::Path;

/// 结果表列头签名：首列名
const HEADER_SIGNATURE: &str = "CONF#";

/// 解析 censo.out 为计算记录
pub fn parse_censo(root: &Path, source_file: &str) -> Result<CalcRecord> {
    let path = root.join(source_file);
    let content = fs::read_to_string(&path).map_err(|e| QcdcError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    let mut record = CalcRecord::new(CalcKind::Censo, root, source_file);
    record.censo = parse_censo_content(&content);
    record.conformer_id = extract_conf_number(&record.root);

    Ok(record)
}

/// 扫描全部结果表，返回最后一张
pub fn parse_censo_content(content: &str) -> Option<CensoResult> {
    let lines: Vec<&str> = content.lines().collect();
    let mut result: Option<CensoResult> = None;

    let mut i = 0;
    while i < lines.len() {
        let tokens: Vec<&str> = lines[i].split_whitespace().collect();
        if tokens.first() != Some(&HEADER_SIGNATURE) {
            i += 1;
            continue;
        }

        let columns: Vec<String> = tokens.iter().map(|t| t.to_string()).collect();
        let mut rows: Vec<Vec<String>> = Vec::new();
        let mut best: Option<Vec<String>> = None;

        // 列头后两行是元数据（单位行等），跳过
        let mut j = i + 3;
        while j < lines.len() && !lines[j].trim().is_empty() {
            let row: Vec<String> = lines[j].split_whitespace().map(|t| t.to_string()).collect();
            if row.len() == columns.len() + 1 {
                // 多出的尾 token 是选中标记
                let mut stripped = row;
                stripped.pop();
                best = Some(stripped);
            } else if row.len() == columns.len() {
                rows.push(row);
            }
            j += 1;
        }

        result = Some(CensoResult {
            columns,
            rows,
            best,
        });
        i = j;
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = "\
some preamble text

CONF#         E          Gsolv           Gtot      ΔGtot
         r2scan-3c     COSMORS           [Eh]    [kcal/mol]
                                                   UVsol
CONF1   -289.0984615  -0.0123456  -289.1108071    0.00     <------
CONF2   -289.0971220  -0.0119881  -289.1091101    1.06
CONF3   -289.0965310  -0.0115502  -289.1080812    1.71

Boltzmann averaged free energy printed elsewhere
";

    #[test]
    fn test_best_row_and_table_length() {
        let result = parse_censo_content(TABLE).unwrap();
        assert_eq!(result.columns.len(), 5);
        assert_eq!(result.rows.len(), 2);

        let best = result.best.unwrap();
        assert_eq!(best.len(), 5);
        assert_eq!(best[0], "CONF1");
        assert_eq!(best[4], "0.00");
        assert!(!best.iter().any(|t| t.contains("<------")));
    }

    #[test]
    fn test_last_table_wins() {
        let two_stages = format!(
            "{}\n\nCONF#    Gtot\n   meta\n   meta\nCONF9   -1.0   <------\nCONF8   -0.5\n\n",
            TABLE
        );
        let result = parse_censo_content(&two_stages).unwrap();
        assert_eq!(result.columns.len(), 2);
        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.best.unwrap()[0], "CONF9");
    }

    #[test]
    fn test_no_table() {
        assert!(parse_censo_content("nothing to see here\n").is_none());
    }

    #[test]
    fn test_table_without_marker_row() {
        let content = "CONF#   Gtot\n  meta\n  meta\nCONF1  -1.00\nCONF2  -0.90\n\n";
        let result = parse_censo_content(content).unwrap();
        assert_eq!(result.rows.len(), 2);
        assert!(result.best.is_none());
    }
}
