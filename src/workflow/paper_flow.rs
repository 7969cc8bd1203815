//! 论文处理流程 - 流程层
//!
//! 核心职责：定义"一篇论文"的完整处理流程
//!
//! 流程顺序：
//! 1. 提取首页文本（失败或为空 → 跳过，不写记录）
//! 2. 派生标题与摘要
//! 3. LLM 分类（失败 / 超时 / 空回答 → `error`，未命中 → `Other`）
//! 4. 立即追加到结果文件（失败 → 致命错误，向上返回）

use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::AppResult;
use crate::models::paper::{ClassificationResult, PaperFields, WorkItem};
use crate::models::taxonomy::{Label, Taxonomy};
use crate::services::{Classifier, DocumentReader, ResultSink};
use crate::utils::logging::truncate_text;
use crate::workflow::item_ctx::ItemCtx;

/// 跳过原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// 提取到的文本为空
    EmptyText,
    /// 文本提取失败
    ExtractionFailed(String),
    /// 结果文件中已有该论文
    AlreadyRecorded,
    /// 处理任务异常退出（panic）
    TaskFailed(String),
}

/// 单篇论文的处理结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    /// 已写入一条记录
    Recorded(Label),
    /// 未写入记录
    Skipped(SkipReason),
}

/// 论文处理流程
///
/// - 不持有任何可变状态，可在多个任务间共享
/// - 只依赖业务能力（services）
#[derive(Clone)]
pub struct PaperFlow {
    reader: Arc<dyn DocumentReader>,
    classifier: Arc<dyn Classifier>,
    sink: Arc<dyn ResultSink>,
    taxonomy: Taxonomy,
    classify_timeout: Duration,
    verbose_logging: bool,
}

impl PaperFlow {
    /// 创建新的论文处理流程
    pub fn new(
        config: &Config,
        reader: Arc<dyn DocumentReader>,
        classifier: Arc<dyn Classifier>,
        sink: Arc<dyn ResultSink>,
    ) -> Self {
        Self {
            reader,
            classifier,
            sink,
            taxonomy: Taxonomy::new(config.categories.clone()),
            classify_timeout: Duration::from_secs(config.classify_timeout_secs),
            verbose_logging: config.verbose_logging,
        }
    }

    pub fn sink(&self) -> &Arc<dyn ResultSink> {
        &self.sink
    }

    /// 处理单篇论文
    ///
    /// 只有写入失败会以 `Err` 返回，其余失败都在本层消化。
    pub async fn run(&self, item: &WorkItem, ctx: &ItemCtx) -> AppResult<ItemOutcome> {
        // ========== 步骤 1: 提取文本 ==========
        let text = match self.reader.extract(item).await {
            Ok(text) => text,
            Err(e) => {
                warn!("{} ⚠️ 文本提取失败，跳过: {}", ctx, e);
                return Ok(ItemOutcome::Skipped(SkipReason::ExtractionFailed(e.to_string())));
            }
        };

        if text.is_empty() {
            warn!("{} ⚠️ 未提取到文本，跳过", ctx);
            return Ok(ItemOutcome::Skipped(SkipReason::EmptyText));
        }

        // ========== 步骤 2: 派生标题与摘要 ==========
        let fields = PaperFields::from_text(&text);
        info!("{} 📄 标题: {}", ctx, truncate_text(&fields.title, 80));
        if self.verbose_logging {
            info!("{} 摘要: {}", ctx, truncate_text(&fields.excerpt, 200));
        }

        // ========== 步骤 3: 分类 ==========
        let label = self.classify(&fields, ctx).await;

        // ========== 步骤 4: 写入 ==========
        let record = ClassificationResult::new(item, fields, label.clone());
        if let Err(e) = self.sink.append(&record).await {
            error!("{} ❌ 写入结果失败: {}", ctx, e);
            return Err(e);
        }

        info!("{} ✓ 已保存，类别: {}", ctx, label);
        Ok(ItemOutcome::Recorded(label))
    }

    /// 调用分类器并收敛为标签
    async fn classify(&self, fields: &PaperFields, ctx: &ItemCtx) -> Label {
        info!("{} 🤖 正在分类...", ctx);

        match tokio::time::timeout(self.classify_timeout, self.classifier.classify(fields)).await {
            Ok(Ok(answer)) => {
                let label = self.taxonomy.match_label(&answer);
                match label {
                    Label::Error => warn!("{} ⚠️ 模型返回为空", ctx),
                    Label::Other => warn!(
                        "{} ⚠️ 模型回答未匹配任何类别: {}",
                        ctx,
                        truncate_text(&answer, 80)
                    ),
                    Label::Category(_) => {}
                }
                label
            }
            Ok(Err(e)) => {
                warn!("{} ⚠️ 分类失败: {}", ctx, e);
                Label::Error
            }
            Err(_) => {
                warn!(
                    "{} ⚠️ 分类超时 ({} 秒, 模型: {})",
                    ctx,
                    self.classify_timeout.as_secs(),
                    self.classifier.model_name()
                );
                Label::Error
            }
        }
    }
}
