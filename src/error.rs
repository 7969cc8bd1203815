//! 错误类型
//!
//! 按处理阶段划分错误，由流程层决定"跳过 / 降级 / 中止"：
//!
//! | 变体             | 处理方式                         |
//! |------------------|----------------------------------|
//! | `Extraction`     | 跳过该论文，不写记录             |
//! | `Classification` | 写入记录，类别为 `error`         |
//! | `Persistence`    | 致命错误，中止整个批次           |
//! | `Config`         | 启动失败                         |

use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 文本提取失败（文件缺失、损坏、格式不支持）
    #[error("文本提取失败 ({path}): {message}")]
    Extraction { path: String, message: String },

    /// 分类失败（模型调用失败、超时、返回为空）
    #[error("分类失败 (模型: {model}): {message}")]
    Classification { model: String, message: String },

    /// 结果写入失败
    #[error("写入结果文件失败 ({path}): {source}")]
    Persistence {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// 配置错误
    #[error("配置错误: {0}")]
    Config(String),
}

impl AppError {
    /// 创建文本提取错误
    pub fn extraction(path: impl Into<String>, message: impl ToString) -> Self {
        AppError::Extraction {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// 创建分类错误
    pub fn classification(model: impl Into<String>, message: impl ToString) -> Self {
        AppError::Classification {
            model: model.into(),
            message: message.to_string(),
        }
    }

    /// 创建写入错误
    pub fn persistence(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Persistence {
            path: path.into(),
            source: Box::new(source),
        }
    }

    /// 是否为必须中止整个批次的错误
    pub fn is_fatal(&self) -> bool {
        matches!(self, AppError::Persistence { .. } | AppError::Config(_))
    }
}

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_persistence_and_config_are_fatal() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert!(AppError::persistence("out.csv", io).is_fatal());
        assert!(AppError::Config("bad".into()).is_fatal());
        assert!(!AppError::extraction("a.pdf", "corrupt").is_fatal());
        assert!(!AppError::classification("gemma", "timeout").is_fatal());
    }

    #[test]
    fn test_display_contains_context() {
        let err = AppError::extraction("a.pdf", "no pages");
        let msg = err.to_string();
        assert!(msg.contains("a.pdf"));
        assert!(msg.contains("no pages"));
    }
}
