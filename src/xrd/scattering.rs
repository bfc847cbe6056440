//! # 原子散射因子
//!
//! 提供原子 X 射线散射因子的计算，以及元素符号到原子模型的解析。
//!
//! ## 公式
//! f(s) = Σᵢ aᵢ exp(-bᵢ s²) + c
//! 其中 s = sin(θ)/λ (Å⁻¹)
//!
//! 流水线中的散射矢量为 2 sin(θ)/λ (nm⁻¹)，传给 f 的自变量由 `FormFactorArgument` 决定：
//! - `MomentumTransfer`（默认）：把数值当作动量转移 q (Å⁻¹)，取 s = q/(4π)
//! - `SinThetaOverLambda`：单位换算，取 s = 值/20
//!
//! 只计算 Cromer-Mann 的 f0，不含反常散射项 f′、f″。
//!
//! ## 数据来源
//! International Tables for Crystallography, Vol. C, Table 6.1.1.4
//! http://it.iucr.org/Cb/ch6o1v0001/
//!
//! ## 依赖关系
//! - 被 `xrd/ratio.rs` 调用计算平均散射因子平方
//! - 被 `xrd/vonk.rs` 调用解析原子种类
//! - 被 `parsers/formula.rs` 用于构造未解析的原子种类

use crate::error::{Result, VonkError};

use std::collections::HashMap;
use std::sync::LazyLock;

/// 2 sin(θ)/λ (nm⁻¹) 到 sin(θ)/λ (Å⁻¹) 的换算因子
const NM_VECTOR_TO_S: f64 = 1.0 / 20.0;

/// 散射矢量到 Cromer-Mann 自变量 sin(θ)/λ 的换算约定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormFactorArgument {
    /// 散射矢量数值按动量转移 q (Å⁻¹) 处理：s = q/(4π)
    #[default]
    MomentumTransfer,
    /// 按 2 sin(θ)/λ (nm⁻¹) 换算：s = 值/20
    SinThetaOverLambda,
}

impl FormFactorArgument {
    /// 散射矢量 -> sin(θ)/λ (Å⁻¹)
    pub fn sin_theta_over_lambda(self, vect: f64) -> f64 {
        match self {
            FormFactorArgument::MomentumTransfer => vect / (4.0 * std::f64::consts::PI),
            FormFactorArgument::SinThetaOverLambda => vect * NM_VECTOR_TO_S,
        }
    }
}

/// 元素符号最大长度
const MAX_SYMBOL_LEN: usize = 2;

/// 原子散射因子参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScatteringFactorParams {
    pub a: [f64; 4],
    pub b: [f64; 4],
    pub c: f64,
}

impl ScatteringFactorParams {
    /// 计算散射因子 f(s)，其中 s = sin(θ)/λ
    pub fn calculate(&self, s: f64) -> f64 {
        let s2 = s * s;
        self.a
            .iter()
            .zip(self.b.iter())
            .fold(self.c, |f, (a, b)| f + a * (-b * s2).exp())
    }
}

/// Cromer-Mann 系数表：(元素, a₁..a₄, b₁..b₄, c)
#[rustfmt::skip]
const CROMER_MANN: &[(&str, [f64; 4], [f64; 4], f64)] = &[
    ("H", [0.493002, 0.322912, 0.140191, 0.040810], [10.5109, 26.1257, 3.14236, 57.7997], 0.003038),
    ("He", [0.8734, 0.6309, 0.3112, 0.1780], [9.1037, 3.3568, 22.9276, 0.9821], 0.0064),
    ("Li", [1.1282, 0.7508, 0.6175, 0.4653], [3.9546, 1.0524, 85.3905, 168.261], 0.0377),
    ("Be", [1.5919, 1.1278, 0.5391, 0.7029], [43.6427, 1.8623, 103.483, 0.5420], 0.0385),
    ("B", [2.0545, 1.3326, 1.0979, 0.7068], [23.2185, 1.0210, 60.3498, 0.1403], -0.1932),
    ("C", [2.3100, 1.0200, 1.5886, 0.8650], [20.8439, 10.2075, 0.5687, 51.6512], 0.2156),
    ("N", [12.2126, 3.1322, 2.0125, 1.1663], [0.0057, 9.8933, 28.9975, 0.5826], -11.529),
    ("O", [3.0485, 2.2868, 1.5463, 0.8670], [13.2771, 5.7011, 0.3239, 32.9089], 0.2508),
    ("F", [3.5392, 2.6412, 1.5170, 1.0243], [10.2825, 4.2944, 0.2615, 26.1476], 0.2776),
    ("Na", [4.7626, 3.1736, 1.2674, 1.1128], [3.2850, 8.8422, 0.3136, 129.424], 0.6760),
    ("Mg", [5.4204, 2.1735, 1.2269, 2.3073], [2.8275, 79.2611, 0.3808, 7.1937], 0.8584),
    ("Al", [6.4202, 1.9002, 1.5936, 1.9646], [3.0387, 0.7426, 31.5472, 85.0886], 1.1151),
    ("Si", [6.2915, 3.0353, 1.9891, 1.5410], [2.4386, 32.3337, 0.6785, 81.6937], 1.1407),
    ("P", [6.4345, 4.1791, 1.7800, 1.4908], [1.9067, 27.1570, 0.5260, 68.1645], 1.1149),
    ("S", [6.9053, 5.2034, 1.4379, 1.5863], [1.4679, 22.2151, 0.2536, 56.1720], 0.8669),
    ("Cl", [11.4604, 7.1964, 6.2556, 1.6455], [0.0104, 1.1662, 18.5194, 47.7784], -9.5574),
    ("K", [8.2186, 7.4398, 1.0519, 0.8659], [12.7949, 0.7748, 213.187, 41.6841], 1.4228),
    ("Ca", [8.6266, 7.3873, 1.5899, 1.0211], [10.4421, 0.6599, 85.7484, 178.437], 1.3751),
    ("Ti", [9.7595, 7.3558, 1.6991, 1.9021], [7.8508, 0.5000, 35.6338, 116.105], 1.2807),
    ("V", [10.2971, 7.3511, 2.0703, 2.0571], [6.8657, 0.4385, 26.8938, 102.478], 1.2199),
    ("Cr", [10.6406, 7.3537, 3.3240, 1.4922], [6.1038, 0.3920, 20.2626, 98.7399], 1.1832),
    ("Mn", [11.2819, 7.3573, 3.0193, 2.2441], [5.3409, 0.3432, 17.8674, 83.7543], 1.0896),
    ("Fe", [11.7695, 7.3573, 3.5222, 2.3045], [4.7611, 0.3072, 15.3535, 76.8805], 1.0369),
    ("Co", [12.2841, 7.3409, 4.0034, 2.3488], [4.2791, 0.2784, 13.5359, 71.1692], 1.0118),
    ("Ni", [12.8376, 7.2920, 4.4438, 2.3800], [3.8785, 0.2565, 12.1763, 66.3421], 1.0341),
    ("Cu", [13.3380, 7.1676, 5.6158, 1.6735], [3.5828, 0.2470, 11.3966, 64.8126], 1.1910),
    ("Zn", [14.0743, 7.0318, 5.1652, 2.4100], [3.2655, 0.2333, 10.3163, 58.7097], 1.3041),
    ("Ga", [15.2354, 6.7006, 4.3591, 2.9623], [3.0669, 0.2412, 10.7805, 61.4135], 1.7189),
    ("Ge", [16.0816, 6.3747, 3.7068, 3.6830], [2.8509, 0.2516, 11.4468, 54.7625], 2.1313),
    ("As", [16.6723, 6.0701, 3.4313, 4.2779], [2.6345, 0.2647, 12.9479, 47.7972], 2.531),
    ("Se", [17.0006, 5.8196, 3.9731, 4.3543], [2.4098, 0.2726, 15.2372, 43.8163], 2.8409),
    ("Br", [17.1789, 5.2358, 5.6377, 3.9851], [2.1723, 16.5796, 0.2609, 41.4328], 2.9557),
    ("Rb", [17.5816, 7.6598, 5.8981, 2.7817], [1.7139, 14.7957, 0.1603, 31.2087], 2.0782),
    ("Sr", [17.5663, 9.8184, 5.4220, 2.6694], [1.5564, 14.0988, 0.1664, 132.376], 2.5064),
    ("Y", [17.7760, 10.2946, 5.7263, 3.2656], [1.4029, 12.8006, 0.1255, 104.354], 1.9341),
    ("Zr", [17.8765, 10.9480, 5.4173, 3.6577], [1.2761, 11.9160, 0.1176, 87.6627], 2.0690),
    ("Nb", [17.6142, 12.0144, 4.0418, 3.5334], [1.1886, 11.7660, 0.2047, 69.7957], 3.7553),
    ("Mo", [3.7025, 17.2356, 12.8876, 3.7429], [0.2772, 1.0958, 11.0040, 61.6584], 4.3875),
    ("Ag", [19.2808, 16.6885, 4.8045, 1.0463], [0.6446, 7.4726, 24.6605, 99.8156], 5.1790),
    ("Ba", [20.3361, 19.2970, 10.8880, 2.6959], [3.2160, 0.2756, 20.2073, 167.202], 2.7731),
    ("La", [20.5780, 19.5990, 11.3727, 3.2879], [2.9480, 0.2440, 18.7726, 133.124], 2.1461),
    ("Ce", [21.1671, 19.7695, 11.8513, 3.3303], [2.8129, 0.2268, 17.6083, 127.113], 1.8623),
    ("Au", [16.8819, 18.5913, 25.5582, 5.8600], [0.4611, 8.6216, 1.4826, 36.3956], 12.0658),
    ("Pb", [31.0617, 13.0637, 18.4420, 5.9696], [0.6902, 2.3576, 8.6180, 47.2579], 13.4118),
    ("Bi", [33.3689, 12.9510, 16.5877, 6.4692], [0.7040, 2.9238, 8.7937, 48.0093], 13.5782),
];

/// 原子散射因子数据库
pub static SCATTERING_FACTORS: LazyLock<HashMap<&'static str, ScatteringFactorParams>> =
    LazyLock::new(|| {
        CROMER_MANN
            .iter()
            .map(|&(symbol, a, b, c)| (symbol, ScatteringFactorParams { a, b, c }))
            .collect()
    });

/// 规范化元素符号：首字母大写，其余小写（"si" -> "Si", "CL" -> "Cl"）
pub fn normalize_symbol(code: &str) -> String {
    let mut chars = code.trim().chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// 获取元素的原子散射因子参数（要求规范化后的符号）
pub fn get_scattering_factor(symbol: &str) -> Option<&'static ScatteringFactorParams> {
    SCATTERING_FACTORS.get(symbol)
}

/// 已解析的原子模型（占有率恒为 1）
#[derive(Debug, Clone, PartialEq)]
pub struct AtomicModel {
    symbol: String,
    occupancy: f64,
    params: ScatteringFactorParams,
    argument: FormFactorArgument,
}

impl AtomicModel {
    /// 从元素代码创建原子模型，代码不区分大小写，最多两个字母
    pub fn from_symbol(code: &str) -> Result<Self> {
        let symbol = normalize_symbol(code);
        if symbol.is_empty() || symbol.chars().count() > MAX_SYMBOL_LEN {
            return Err(VonkError::UnresolvedSpecies(code.to_string()));
        }

        let params = get_scattering_factor(&symbol)
            .ok_or_else(|| VonkError::UnresolvedSpecies(code.to_string()))?;

        Ok(AtomicModel {
            symbol,
            occupancy: 1.0,
            params: *params,
            argument: FormFactorArgument::default(),
        })
    }

    /// 指定散射矢量的换算约定
    pub fn with_argument(mut self, argument: FormFactorArgument) -> Self {
        self.argument = argument;
        self
    }

    pub fn argument(&self) -> FormFactorArgument {
        self.argument
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn occupancy(&self) -> f64 {
        self.occupancy
    }

    /// 单个散射矢量处的散射因子
    pub fn scattering_factor(&self, vect: f64) -> f64 {
        self.occupancy * self.params.calculate(self.argument.sin_theta_over_lambda(vect))
    }

    /// 散射矢量序列上的散射因子
    pub fn f(&self, vects: &[f64]) -> Vec<f64> {
        vects.iter().map(|&q| self.scattering_factor(q)).collect()
    }
}

/// 原子种类：未解析的元素代码或已解析的原子模型
#[derive(Debug, Clone, PartialEq)]
pub enum AtomSpecies {
    Unresolved(String),
    Resolved(AtomicModel),
}

impl AtomSpecies {
    /// 解析为原子模型；已解析的条目原样返回
    pub fn resolve(&self) -> Result<AtomicModel> {
        match self {
            AtomSpecies::Unresolved(code) => AtomicModel::from_symbol(code),
            AtomSpecies::Resolved(model) => Ok(model.clone()),
        }
    }
}

impl From<&str> for AtomSpecies {
    fn from(code: &str) -> Self {
        AtomSpecies::Unresolved(code.to_string())
    }
}

impl From<String> for AtomSpecies {
    fn from(code: String) -> Self {
        AtomSpecies::Unresolved(code)
    }
}

impl From<AtomicModel> for AtomSpecies {
    fn from(model: AtomicModel) -> Self {
        AtomSpecies::Resolved(model)
    }
}

/// 将混合列表映射为新的已解析列表，不修改输入
pub fn resolve_species(species: &[AtomSpecies]) -> Result<Vec<AtomicModel>> {
    species.iter().map(AtomSpecies::resolve).collect()
}

/// 平均散射因子平方 <f²>，对所有原子逐点求平均
pub fn mean_squared_scattering_factor(atoms: &[AtomicModel], vects: &[f64]) -> Vec<f64> {
    if atoms.is_empty() {
        return vec![0.0; vects.len()];
    }

    let n_atoms = atoms.len() as f64;
    vects
        .iter()
        .map(|&q| {
            atoms
                .iter()
                .map(|atom| atom.scattering_factor(q).powi(2))
                .sum::<f64>()
                / n_atoms
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scattering_factor_si() {
        let params = get_scattering_factor("Si").unwrap();
        // At s = 0, f(0) ≈ Z (原子序数)
        let f0 = params.calculate(0.0);
        assert!(
            (f0 - 14.0).abs() < 1.0,
            "Si f(0) should be close to 14, got {}",
            f0
        );
    }

    #[test]
    fn test_scattering_factor_decreases_with_vector() {
        let carbon = AtomicModel::from_symbol("C").unwrap();
        let f = carbon.f(&[0.0, 2.0, 6.0, 10.0]);
        assert!((f[0] - 6.0).abs() < 0.1);
        assert!(f.windows(2).all(|w| w[1] < w[0]));
    }

    #[test]
    fn test_form_factor_argument_conventions() {
        let si = AtomicModel::from_symbol("Si").unwrap();
        assert_eq!(si.argument(), FormFactorArgument::MomentumTransfer);

        // 10 nm⁻¹ 当作 q (Å⁻¹)：s = 10/(4π) ≈ 0.7958
        assert!((si.scattering_factor(10.0) - 3.778104).abs() < 1e-5);

        // 单位换算：s = 10/20 = 0.5
        let si = si.with_argument(FormFactorArgument::SinThetaOverLambda);
        assert!((si.scattering_factor(10.0) - 6.240089).abs() < 1e-5);

        // 两种约定在各自的 s = 1 处一致
        let carbon = AtomicModel::from_symbol("C").unwrap();
        let q = carbon.scattering_factor(4.0 * std::f64::consts::PI);
        let s = carbon
            .clone()
            .with_argument(FormFactorArgument::SinThetaOverLambda)
            .scattering_factor(20.0);
        assert!((q - 1.115200).abs() < 1e-5);
        assert!((q - s).abs() < 1e-12);
    }

    #[test]
    fn test_normalize_symbol() {
        assert_eq!(normalize_symbol("si"), "Si");
        assert_eq!(normalize_symbol("CL"), "Cl");
        assert_eq!(normalize_symbol(" o "), "O");
        assert_eq!(normalize_symbol(""), "");
    }

    #[test]
    fn test_lowercase_codes_resolve_like_capitalized_models() {
        let raw = vec![AtomSpecies::from("si"), AtomSpecies::from("o")];
        let prebuilt = vec![
            AtomSpecies::Resolved(AtomicModel::from_symbol("Si").unwrap()),
            AtomSpecies::Resolved(AtomicModel::from_symbol("O").unwrap()),
        ];

        let from_raw = resolve_species(&raw).unwrap();
        let from_prebuilt = resolve_species(&prebuilt).unwrap();

        assert_eq!(from_raw, from_prebuilt);
        assert_eq!(from_raw[0].symbol(), "Si");
        assert_eq!(from_raw[1].symbol(), "O");
        assert_eq!(from_raw[0].occupancy(), 1.0);
        // 输入列表保持不变
        assert_eq!(raw[0], AtomSpecies::Unresolved("si".to_string()));
    }

    #[test]
    fn test_unknown_species_is_rejected() {
        assert!(matches!(
            AtomicModel::from_symbol("Xx"),
            Err(VonkError::UnresolvedSpecies(code)) if code == "Xx"
        ));
        assert!(matches!(
            AtomicModel::from_symbol("Fe1"),
            Err(VonkError::UnresolvedSpecies(_))
        ));
        assert!(resolve_species(&[AtomSpecies::from("C"), AtomSpecies::from("")]).is_err());
    }

    #[test]
    fn test_mean_squared_scattering_factor() {
        let si = AtomicModel::from_symbol("Si").unwrap();
        let o = AtomicModel::from_symbol("O").unwrap();
        let vects = [0.5, 3.0, 8.0];

        let single = mean_squared_scattering_factor(std::slice::from_ref(&si), &vects);
        for (fsq, f) in single.iter().zip(si.f(&vects)) {
            assert!((fsq - f * f).abs() < 1e-12);
        }

        let mixed = mean_squared_scattering_factor(&[si.clone(), o.clone()], &vects);
        for (i, &q) in vects.iter().enumerate() {
            let expected = (si.scattering_factor(q).powi(2) + o.scattering_factor(q).powi(2)) / 2.0;
            assert!((mixed[i] - expected).abs() < 1e-12);
        }
    }
}
