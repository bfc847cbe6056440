//! # 数据模型模块
//!
//! 定义衍射图样的统一数据模型。
//!
//! ## 依赖关系
//! - 被 `parsers/`、`xrd/export.rs` 和 `commands/` 使用
//! - 子模块: pattern

pub mod pattern;

pub use pattern::DiffractionPattern;
