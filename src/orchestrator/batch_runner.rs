//! 批量论文处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责批量论文的调度和资源管理。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：创建文本提取、分类、写入三个能力
//! 2. **批量加载**：扫描并加载所有待处理的论文（`Vec<WorkItem>`）
//! 3. **断点续跑**：跳过结果文件中已存在的论文
//! 4. **并发控制**：使用 Semaphore 限制同时处理的论文数量
//! 5. **故障隔离**：单篇论文的失败不影响其他论文，只有写入失败会中止批次
//! 6. **全局统计**：汇总所有论文的处理结果
//!
//! ## 并发模型
//!
//! 每篇论文在获得许可后才会 `tokio::spawn`，因此按提交顺序开始，
//! 同时运行的任务不超过 `max_concurrent_papers`，完成顺序不作保证。
//! 写入失败或收到中断信号时关闭 Semaphore：不再开始新的论文，
//! 已在处理中的论文照常完成。

use anyhow::{Context, Result};
use std::collections::{BTreeMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::paper::WorkItem;
use crate::services::{CsvSink, LlmClassifier, PdfReader};
use crate::utils::logging::{log_items_loaded, log_startup, print_final_stats};
use crate::workflow::{ItemCtx, ItemOutcome, PaperFlow, SkipReason};

/// 批量运行器
pub struct BatchRunner {
    flow: PaperFlow,
    max_concurrent: usize,
    resume: bool,
}

impl BatchRunner {
    pub fn new(flow: PaperFlow, max_concurrent: usize, resume: bool) -> Self {
        Self {
            flow,
            max_concurrent: max_concurrent.max(1),
            resume,
        }
    }

    pub fn from_config(config: &Config, flow: PaperFlow) -> Self {
        Self::new(flow, config.max_concurrent_papers, config.resume)
    }

    /// 处理全部论文，直到完成
    pub async fn run(&self, items: Vec<WorkItem>) -> AppResult<BatchReport> {
        self.run_until(items, std::future::pending::<()>()).await
    }

    /// 处理全部论文，`shutdown` 完成时停止开始新的论文
    ///
    /// # 返回
    /// - `Ok(report)`：所有已开始的论文都已结束
    /// - `Err(AppError::Persistence)`：结果写入失败，批次中止
    pub async fn run_until<F>(&self, items: Vec<WorkItem>, shutdown: F) -> AppResult<BatchReport>
    where
        F: Future<Output = ()>,
    {
        let total = items.len();
        let mut report = BatchReport::new(total);

        let recorded = if self.resume {
            let ids = self.flow.sink().recorded_identifiers().await?;
            if !ids.is_empty() {
                info!("🔁 结果文件中已有 {} 条记录，将跳过这些论文", ids.len());
            }
            ids
        } else {
            HashSet::new()
        };

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut handles = Vec::with_capacity(total);
        let mut submitted = 0;
        tokio::pin!(shutdown);

        for (idx, item) in items.into_iter().enumerate() {
            let ctx = ItemCtx::new(idx + 1, total, item.identifier.as_str());

            if recorded.contains(&item.identifier) {
                info!("{} ⏭️ 已存在记录，跳过", ctx);
                report.record(&item.identifier, ItemOutcome::Skipped(SkipReason::AlreadyRecorded));
                submitted += 1;
                continue;
            }

            let permit = tokio::select! {
                biased;
                _ = &mut shutdown => {
                    warn!("⛔ 收到中断信号，停止开始新的论文，等待进行中的论文完成...");
                    semaphore.close();
                    break;
                }
                permit = semaphore.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    // 写入失败时 Semaphore 已被关闭
                    Err(_) => break,
                },
            };

            let flow = self.flow.clone();
            let semaphore = semaphore.clone();
            let identifier = item.identifier.clone();

            let handle = tokio::spawn(async move {
                let _permit = permit;
                let result = flow.run(&item, &ctx).await;
                if let Err(e) = &result {
                    if e.is_fatal() {
                        semaphore.close();
                    }
                }
                result
            });
            handles.push((identifier, handle));
            submitted += 1;
        }

        report.not_started = total - submitted;

        let joined = futures::future::join_all(
            handles
                .into_iter()
                .map(|(identifier, handle)| async move { (identifier, handle.await) }),
        )
        .await;

        let mut fatal: Option<AppError> = None;
        for (identifier, result) in joined {
            match result {
                Ok(Ok(outcome)) => report.record(&identifier, outcome),
                Ok(Err(e)) => {
                    if fatal.is_none() {
                        fatal = Some(e);
                    } else {
                        error!("[{}] ❌ {}", identifier, e);
                    }
                }
                Err(e) => {
                    error!("[{}] 任务执行失败: {}", identifier, e);
                    report.record(
                        &identifier,
                        ItemOutcome::Skipped(SkipReason::TaskFailed(e.to_string())),
                    );
                }
            }
        }

        match fatal {
            Some(e) => {
                error!(
                    "❌ 批次中止: 已写入 {} 篇，未开始 {} 篇",
                    report.recorded, report.not_started
                );
                Err(e)
            }
            None => Ok(report),
        }
    }
}

/// 批次处理统计
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    /// 输入论文总数
    pub total: usize,
    /// 写入记录数
    pub recorded: usize,
    /// 跳过数（含已存在）
    pub skipped: usize,
    /// 因已存在记录而跳过的数量
    pub already_recorded: usize,
    /// 因中断或中止未开始的数量
    pub not_started: usize,
    /// 各标签的记录数
    pub label_counts: BTreeMap<String, usize>,
    /// 每篇论文的结果，按完成顺序
    pub outcomes: Vec<(String, ItemOutcome)>,
}

impl BatchReport {
    fn new(total: usize) -> Self {
        Self {
            total,
            ..Default::default()
        }
    }

    fn record(&mut self, identifier: &str, outcome: ItemOutcome) {
        match &outcome {
            ItemOutcome::Recorded(label) => {
                self.recorded += 1;
                *self.label_counts.entry(label.to_string()).or_default() += 1;
            }
            ItemOutcome::Skipped(reason) => {
                self.skipped += 1;
                if *reason == SkipReason::AlreadyRecorded {
                    self.already_recorded += 1;
                }
            }
        }
        self.outcomes.push((identifier.to_string(), outcome));
    }

    /// 某个标签的记录数
    pub fn count_for(&self, label: &str) -> usize {
        self.label_counts.get(label).copied().unwrap_or(0)
    }
}

/// 应用主结构
pub struct App {
    config: Config,
    runner: BatchRunner,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        config.validate()?;
        log_startup(&config);

        let flow = PaperFlow::new(
            &config,
            Arc::new(PdfReader::new()),
            Arc::new(LlmClassifier::new(&config)),
            Arc::new(CsvSink::new(&config.output_csv)),
        );
        let runner = BatchRunner::from_config(&config, flow);

        Ok(Self { config, runner })
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<BatchReport> {
        let started = Instant::now();

        info!("\n📁 正在扫描待处理的论文...");
        let items =
            crate::models::load_work_items(&self.config.source_folder, &self.config.file_extension)
                .await?;

        if items.is_empty() {
            warn!("⚠️ 没有找到待处理的 .{} 文件，程序结束", self.config.file_extension);
            return Ok(BatchReport::default());
        }

        log_items_loaded(items.len(), self.config.max_concurrent_papers);

        let shutdown = async {
            if tokio::signal::ctrl_c().await.is_err() {
                std::future::pending::<()>().await;
            }
        };

        let report = self
            .runner
            .run_until(items, shutdown)
            .await
            .with_context(|| format!("批处理中止，结果文件: {}", self.config.output_csv))?;

        print_final_stats(&report, &self.config.output_csv, started.elapsed());

        Ok(report)
    }
}
