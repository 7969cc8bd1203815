//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责批量处理和流程调度，是整个系统的"指挥中心"。
//!
//! ## 层次关系
//!
//! ```text
//! batch_runner (处理 Vec<WorkItem>)
//!     ↓
//! workflow::PaperFlow (处理单篇论文)
//!     ↓
//! services (能力层：extract / classify / append)
//! ```
//!
//! 本层只做调度和统计，不做具体业务判断。

pub mod batch_runner;

// 重新导出主要类型
pub use batch_runner::{App, BatchReport, BatchRunner};
