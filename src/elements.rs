//! # 元素同位素质量查找
//!
//! 提供最丰同位素质量查询（丰度最高的同位素，非平均原子量）。
//!
//! ## 数据来源
//! AME2020 atomic mass evaluation / CODATA isotope masses
//!
//! ## 依赖关系
//! - 被 `thermo/` 调用计算摩尔质量
//! - 纯静态数据，无外部依赖

use std::collections::HashMap;
use std::sync::LazyLock;

/// 最丰同位素质量 (g/mol)，按元素符号索引
///
/// 覆盖 H–Ba、La 以及常见重元素；查不到的元素由调用方报 LookupFailure
static ISOTOPE_MASSES: LazyLock<HashMap<&'static str, f64>> = LazyLock::new(|| {
    const TABLE: &[(&str, f64)] = &[
        ("H", 1.007825032),
        ("He", 4.002603254),
        ("Li", 7.016004548),
        ("Be", 9.012182201),
        ("B", 11.009305406),
        ("C", 12.0),
        ("N", 14.003074005),
        ("O", 15.994914620),
        ("F", 18.998403224),
        ("Ne", 19.992440175),
        ("Na", 22.989769281),
        ("Mg", 23.985041699),
        ("Al", 26.981538627),
        ("Si", 27.976926532),
        ("P", 30.973761629),
        ("S", 31.972070999),
        ("Cl", 34.968852682),
        ("Ar", 39.962383123),
        ("K", 38.963706679),
        ("Ca", 39.962590983),
        ("Sc", 44.955911909),
        ("Ti", 47.947946281),
        ("V", 50.943959507),
        ("Cr", 51.940507472),
        ("Mn", 54.938045141),
        ("Fe", 55.934937475),
        ("Co", 58.933195048),
        ("Ni", 57.935342907),
        ("Cu", 62.929597474),
        ("Zn", 63.929142222),
        ("Ga", 68.925573587),
        ("Ge", 73.921177767),
        ("As", 74.921596478),
        ("Se", 79.916521271),
        ("Br", 78.918337087),
        ("Kr", 83.911506687),
        ("Rb", 84.911789737),
        ("Sr", 87.905612124),
        ("Y", 88.905848295),
        ("Zr", 89.904704416),
        ("Nb", 92.906378058),
        ("Mo", 97.905408169),
        ("Ru", 101.904349312),
        ("Rh", 102.905504292),
        ("Pd", 105.903485715),
        ("Ag", 106.905096820),
        ("Cd", 113.903358540),
        ("In", 114.903878484),
        ("Sn", 119.902194676),
        ("Sb", 120.903815686),
        ("Te", 129.906224399),
        ("I", 126.904472681),
        ("Xe", 131.904153457),
        ("Cs", 132.905451932),
        ("Ba", 137.905247237),
        ("La", 138.906353267),
        ("W", 183.950931188),
        ("Re", 186.955753109),
        ("Os", 191.961480690),
        ("Ir", 192.962926430),
        ("Pt", 194.964791134),
        ("Au", 196.966568662),
        ("Hg", 201.970643011),
        ("Tl", 204.974427541),
        ("Pb", 207.976652071),
        ("Bi", 208.980398734),
    ];

    TABLE.iter().copied().collect()
});

/// 查询元素最丰同位素质量 (g/mol)
///
/// 符号大小写不敏感：Turbomole coord 文件中元素为小写
pub fn isotope_mass(symbol: &str) -> Option<f64> {
    ISOTOPE_MASSES.get(capitalize(symbol).as_str()).copied()
}

/// 规范化元素符号：首字母大写，其余小写
fn capitalize(symbol: &str) -> String {
    let mut chars = symbol.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}
