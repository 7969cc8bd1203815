//! 论文处理上下文
//!
//! 封装"我正在处理第几篇论文"这一信息

use std::fmt::Display;

/// 论文处理上下文
#[derive(Debug, Clone)]
pub struct ItemCtx {
    /// 论文序号（从1开始，仅用于日志显示）
    pub index: usize,

    /// 本批论文总数
    pub total: usize,

    /// 论文标识（文件名）
    pub identifier: String,
}

impl ItemCtx {
    pub fn new(index: usize, total: usize, identifier: impl Into<String>) -> Self {
        Self {
            index,
            total,
            identifier: identifier.into(),
        }
    }
}

impl Display for ItemCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[论文 {}/{} {}]", self.index, self.total, self.identifier)
    }
}
