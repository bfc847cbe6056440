//! # 批量执行器
//!
//! 并行执行批量分析任务。
//!
//! ## 功能
//! - 基于 rayon 的并行迭代，保持输入顺序
//! - 进度条显示
//! - 错误收集与汇总报告
//!
//! ## 依赖关系
//! - 被 `commands/batch.rs` 调用
//! - 使用 `utils/progress.rs` 创建进度条
//! - 使用 `rayon` 进行并行计算

use crate::utils::progress;

use rayon::prelude::*;
use std::path::{Path, PathBuf};

/// 单个文件处理结果
#[derive(Debug, Clone)]
pub enum ProcessResult<T> {
    /// 处理成功，附带结果
    Success(PathBuf, T),
    /// 处理失败
    Failed(PathBuf, String),
}

/// 批量处理结果统计
#[derive(Debug)]
pub struct BatchResult<T> {
    /// 成功的结果（按输入顺序）
    pub outputs: Vec<(PathBuf, T)>,
    /// 失败详情
    pub failures: Vec<(PathBuf, String)>,
}

impl<T> Default for BatchResult<T> {
    fn default() -> Self {
        Self {
            outputs: Vec::new(),
            failures: Vec::new(),
        }
    }
}

impl<T> BatchResult<T> {
    /// 合并处理结果
    pub fn merge(&mut self, result: ProcessResult<T>) {
        match result {
            ProcessResult::Success(path, output) => self.outputs.push((path, output)),
            ProcessResult::Failed(path, err) => self.failures.push((path, err)),
        }
    }

    pub fn success(&self) -> usize {
        self.outputs.len()
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn total(&self) -> usize {
        self.success() + self.failed()
    }
}

/// 批量执行器
pub struct BatchRunner {
    /// 并行作业数
    jobs: usize,
    /// 是否显示进度条
    show_progress: bool,
}

impl BatchRunner {
    /// 创建新的批量执行器，`jobs = 0` 时使用全部 CPU
    pub fn new(jobs: usize) -> Self {
        let jobs = if jobs == 0 { num_cpus::get() } else { jobs };
        Self {
            jobs,
            show_progress: true,
        }
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn jobs(&self) -> usize {
        self.jobs
    }

    /// 并行处理文件列表
    pub fn run<T, F>(&self, files: &[PathBuf], processor: F) -> Result<BatchResult<T>, String>
    where
        T: Send,
        F: Fn(&Path) -> Result<T, String> + Sync + Send,
    {
        let pb = progress::batch_progress(files.len());
        if !self.show_progress {
            pb.set_draw_target(indicatif::ProgressDrawTarget::hidden());
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.jobs)
            .build()
            .map_err(|e| format!("failed to build thread pool: {}", e))?;

        let results: Vec<ProcessResult<T>> = pool.install(|| {
            files
                .par_iter()
                .map(|file| {
                    let result = match processor(file) {
                        Ok(output) => ProcessResult::Success(file.clone(), output),
                        Err(err) => ProcessResult::Failed(file.clone(), err),
                    };
                    if let Some(name) = file.file_name() {
                        pb.set_message(name.to_string_lossy().into_owned());
                    }
                    pb.inc(1);
                    result
                })
                .collect()
        });

        pb.finish_and_clear();

        let mut batch_result = BatchResult::default();
        for result in results {
            batch_result.merge(result);
        }
        Ok(batch_result)
    }
}
