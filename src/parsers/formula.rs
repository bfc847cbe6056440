//! # 元素组成解析器
//!
//! 将化学式（如 `C2H4`、`SiO2`）或逗号分隔的元素列表（如 `si,o`）
//! 展开为原子种类列表，每个原子占一项。
//!
//! ## 依赖关系
//! - 被 `commands/` 使用
//! - 输出 `xrd/scattering.rs` 的 AtomSpecies（未解析）
//! - 使用 `regex` 匹配元素与计数

use crate::error::{Result, VonkError};
use crate::xrd::scattering::AtomSpecies;

use regex::Regex;
use std::sync::LazyLock;

/// 单个元素项：大写字母 + 可选小写字母 + 可选计数
static ELEMENT_TERM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([A-Z][a-z]?)(\d*)").expect("valid element pattern"));

/// 单个元素项的计数上限
const MAX_COUNT: usize = 1000;

/// 展开化学式，`SiO2` -> [Si, O, O]
pub fn expand_formula(formula: &str) -> Result<Vec<AtomSpecies>> {
    let formula = formula.trim();
    if formula.is_empty() {
        return Err(VonkError::InvalidArgument("empty formula".to_string()));
    }

    let mut species = Vec::new();
    let mut consumed = 0;

    for caps in ELEMENT_TERM.captures_iter(formula) {
        let whole = caps.get(0).map_or(0..0, |m| m.range());
        if whole.start != consumed {
            return Err(invalid_formula(formula, consumed));
        }
        consumed = whole.end;

        let symbol = &caps[1];
        let count = match &caps[2] {
            "" => 1,
            digits => digits
                .parse::<usize>()
                .ok()
                .filter(|&n| (1..=MAX_COUNT).contains(&n))
                .ok_or_else(|| {
                    VonkError::InvalidArgument(format!(
                        "invalid count '{}' for {} in formula '{}'",
                        digits, symbol, formula
                    ))
                })?,
        };
        species.extend(std::iter::repeat(AtomSpecies::from(symbol)).take(count));
    }

    if consumed != formula.len() {
        return Err(invalid_formula(formula, consumed));
    }
    Ok(species)
}

fn invalid_formula(formula: &str, position: usize) -> VonkError {
    VonkError::InvalidArgument(format!(
        "cannot parse formula '{}' at position {}",
        formula, position
    ))
}

/// 解析逗号或空白分隔的元素列表，`si,o` -> [si, o]
pub fn parse_species_list(list: &str) -> Result<Vec<AtomSpecies>> {
    let species: Vec<AtomSpecies> = list
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(AtomSpecies::from)
        .collect();

    if species.is_empty() {
        return Err(VonkError::InvalidArgument(
            "no atomic species given".to_string(),
        ));
    }
    Ok(species)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xrd::scattering::resolve_species;

    fn symbols(species: &[AtomSpecies]) -> Vec<String> {
        resolve_species(species)
            .unwrap()
            .iter()
            .map(|a| a.symbol().to_string())
            .collect()
    }

    #[test]
    fn test_expand_simple_formulas() {
        assert_eq!(symbols(&expand_formula("SiO2").unwrap()), ["Si", "O", "O"]);
        assert_eq!(
            symbols(&expand_formula("C2H4").unwrap()),
            ["C", "C", "H", "H", "H", "H"]
        );
        assert_eq!(symbols(&expand_formula(" NaCl ").unwrap()), ["Na", "Cl"]);
    }

    #[test]
    fn test_expand_rejects_garbage() {
        assert!(expand_formula("").is_err());
        assert!(expand_formula("sio2").is_err());
        assert!(expand_formula("Si-O2").is_err());
        assert!(expand_formula("C0").is_err());
    }

    #[test]
    fn test_unknown_element_fails_on_resolution() {
        let species = expand_formula("Xx2").unwrap();
        assert_eq!(species.len(), 2);
        assert!(resolve_species(&species).is_err());
    }

    #[test]
    fn test_species_list() {
        let species = parse_species_list("si, o").unwrap();
        assert_eq!(species.len(), 2);
        assert_eq!(symbols(&species), ["Si", "O"]);
        assert!(parse_species_list(" , ").is_err());
    }
}
