//! # 衍射图样数据模型
//!
//! 一个样品的广角衍射数据：衍射角 2θ、观测强度和结晶参考强度，三者逐点对齐。
//!
//! ## 依赖关系
//! - 被 `parsers/pattern.rs` 构造
//! - 被 `commands/` 和 `xrd/export.rs` 使用

use crate::error::{Result, VonkError};
use serde::{Deserialize, Serialize};

/// 衍射图样
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffractionPattern {
    /// 样品名（默认取文件名主干）
    pub name: String,
    /// 衍射角 2θ (°)，升序
    pub two_theta: Vec<f64>,
    /// 观测强度
    pub observed: Vec<f64>,
    /// 结晶参考强度
    pub crystalline: Vec<f64>,
}

impl DiffractionPattern {
    pub fn new(
        name: impl Into<String>,
        two_theta: Vec<f64>,
        observed: Vec<f64>,
        crystalline: Vec<f64>,
    ) -> Self {
        Self {
            name: name.into(),
            two_theta,
            observed,
            crystalline,
        }
    }

    pub fn len(&self) -> usize {
        self.two_theta.len()
    }

    pub fn is_empty(&self) -> bool {
        self.two_theta.is_empty()
    }

    /// 2θ 范围 (min, max)
    pub fn angle_range(&self) -> Option<(f64, f64)> {
        let first = *self.two_theta.first()?;
        let last = *self.two_theta.last()?;
        Some((first, last))
    }

    /// 检查各序列长度一致、点数足够且 2θ 严格升序
    pub fn validate(&self) -> Result<()> {
        let n = self.two_theta.len();
        if n < 2 {
            return Err(VonkError::InvalidInputShape {
                series: "two_theta".to_string(),
                expected: 2,
                found: n,
            });
        }
        for (series, values) in [
            ("observed", &self.observed),
            ("crystalline", &self.crystalline),
        ] {
            if values.len() != n {
                return Err(VonkError::InvalidInputShape {
                    series: series.to_string(),
                    expected: n,
                    found: values.len(),
                });
            }
        }
        if let Some(i) = self.two_theta.windows(2).position(|w| w[1] <= w[0]) {
            return Err(VonkError::InvalidArgument(format!(
                "{}: 2theta must be strictly increasing (row {} -> {})",
                self.name,
                i + 1,
                i + 2
            )));
        }
        Ok(())
    }
}
