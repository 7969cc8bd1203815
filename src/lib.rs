//! # Paper Annotate
//!
//! 使用本地 LLM 将 PDF 论文批量归入固定分类目录，结果追加写入 CSV。
//!
//! ## 架构设计
//!
//! ### ① 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单篇论文
//! - `DocumentReader` / `PdfReader` - 提取首页文本
//! - `Classifier` / `LlmClassifier` - LLM 分类
//! - `ResultSink` / `CsvSink` - 追加写入结果，可断点续跑
//!
//! ### ② 流程层（Workflow）
//! - `workflow/` - 定义"一篇论文"的完整处理流程
//! - `ItemCtx` - 上下文封装（序号 + 文件名）
//! - `PaperFlow` - 流程编排（extract → classify → append）
//!
//! ### ③ 编排层（Orchestration）
//! - `orchestrator/batch_runner` - 并发调度、故障隔离、全局统计
//!
//! ## 模块结构

pub mod config;
pub mod error;
pub mod logger;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{ClassificationResult, Label, PaperFields, Taxonomy, WorkItem};
pub use orchestrator::{App, BatchReport, BatchRunner};
pub use services::{Classifier, CsvSink, DocumentReader, LlmClassifier, PdfReader, ResultSink};
pub use workflow::{ItemCtx, ItemOutcome, PaperFlow, SkipReason};
