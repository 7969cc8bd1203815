//! 文本提取服务 - 业务能力层
//!
//! 只负责"读出论文首页文本"能力，不关心分类与写入

use async_trait::async_trait;
use std::panic::AssertUnwindSafe;
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::models::paper::WorkItem;

/// 文本提取能力
#[async_trait]
pub trait DocumentReader: Send + Sync {
    /// 提取论文首页文本
    ///
    /// 任何读取或解析失败都以 `AppError::Extraction` 返回，由流程层决定跳过。
    async fn extract(&self, item: &WorkItem) -> AppResult<String>;
}

/// 基于 `pdf-extract` 的 PDF 首页提取
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfReader;

impl PdfReader {
    pub fn new() -> Self {
        Self
    }

    /// 从 PDF 字节中提取首页文本
    fn first_page_text(path: &str, data: &[u8]) -> AppResult<String> {
        // pdf-extract 遇到畸形字体/结构时可能 panic
        let pages = std::panic::catch_unwind(AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem_by_pages(data)
        }))
        .map_err(|_| AppError::extraction(path, "PDF 解析时发生 panic"))?
        .map_err(|e| AppError::extraction(path, e))?;

        pages
            .into_iter()
            .next()
            .ok_or_else(|| AppError::extraction(path, "PDF 没有页面"))
    }
}

#[async_trait]
impl DocumentReader for PdfReader {
    async fn extract(&self, item: &WorkItem) -> AppResult<String> {
        let path = item.path.display().to_string();
        debug!("正在提取文本: {}", path);

        let data = tokio::fs::read(&item.path)
            .await
            .map_err(|e| AppError::extraction(path.as_str(), e))?;

        let text = tokio::task::spawn_blocking({
            let path = path.clone();
            move || PdfReader::first_page_text(&path, &data)
        })
        .await
        .map_err(|e| AppError::extraction(path.as_str(), e))??;

        debug!("提取完成: {} ({} 字符)", path, text.chars().count());
        Ok(text)
    }
}
