//! # 图样文件收集器
//!
//! 根据输入路径和文件名模式收集待分析的衍射图样文件。
//!
//! ## 功能
//! - 支持单文件和目录输入
//! - 逗号分隔的多个 glob 模式（不区分大小写）
//! - 可选递归搜索，结果按路径排序
//!
//! ## 依赖关系
//! - 被 `commands/batch.rs` 调用
//! - 使用 `walkdir` 遍历目录
//! - 使用 `glob` 匹配文件名

use glob::{MatchOptions, Pattern};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// 默认文件名模式
pub const DEFAULT_PATTERNS: &str = "*.csv,*.xy,*.dat";

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: false,
    require_literal_leading_dot: true,
};

/// 文件收集器
#[derive(Debug)]
pub struct FileCollector {
    input: PathBuf,
    patterns: Vec<Pattern>,
    recursive: bool,
}

impl FileCollector {
    pub fn new(input: PathBuf) -> Self {
        Self {
            input,
            patterns: Vec::new(),
            recursive: false,
        }
    }

    /// 设置匹配模式（逗号分隔）；无法解析的模式返回错误信息
    pub fn with_pattern(mut self, patterns: &str) -> Result<Self, String> {
        self.patterns = patterns
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| Pattern::new(s).map_err(|e| format!("invalid pattern '{}': {}", s, e)))
            .collect::<Result<_, _>>()?;
        Ok(self)
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// 收集所有匹配的文件
    pub fn collect(&self) -> Vec<PathBuf> {
        if self.input.is_file() {
            return vec![self.input.clone()];
        }
        if !self.input.is_dir() {
            return Vec::new();
        }

        let max_depth = if self.recursive { usize::MAX } else { 1 };
        let mut files: Vec<PathBuf> = WalkDir::new(&self.input)
            .max_depth(max_depth)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| self.matches(e.path()))
            .map(|e| e.into_path())
            .collect();
        files.sort();
        files
    }

    /// 文件名是否匹配任一模式（未设置模式时全部匹配）
    fn matches(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        self.patterns.is_empty()
            || self
                .patterns
                .iter()
                .any(|p| p.matches_with(name, MATCH_OPTIONS))
    }
}
