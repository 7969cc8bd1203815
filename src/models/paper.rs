use crate::models::taxonomy::Label;
use serde::Serialize;
use std::path::PathBuf;

/// 标题缺失时的占位
pub const UNKNOWN_TITLE: &str = "Unknown Title";
/// 摘要行数不足时的占位
pub const NO_ABSTRACT: &str = "No Abstract Found";

/// 摘要取标题之后的行数
const EXCERPT_LINES: usize = 5;

/// 待处理的论文
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    /// 文件路径
    pub path: PathBuf,
    /// 写入结果文件的标识（文件名）
    pub identifier: String,
}

impl WorkItem {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let identifier = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        Self { path, identifier }
    }
}

/// 从首页文本中提取的标题与摘要
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaperFields {
    pub title: String,
    pub excerpt: String,
}

impl PaperFields {
    /// 从提取的文本派生标题与摘要
    ///
    /// - 标题：第一行原样保留（可能为空串）；文本为空、没有任何行时使用 `Unknown Title`
    /// - 摘要：第 2~6 行以空格拼接，总行数不足 6 行时使用 `No Abstract Found`
    pub fn from_text(text: &str) -> Self {
        if text.is_empty() {
            return Self {
                title: UNKNOWN_TITLE.to_string(),
                excerpt: NO_ABSTRACT.to_string(),
            };
        }

        let lines: Vec<&str> = text.split('\n').map(|l| l.trim_end_matches('\r')).collect();
        let title = lines[0].to_string();

        let excerpt = if lines.len() > EXCERPT_LINES {
            lines[1..=EXCERPT_LINES].join(" ")
        } else {
            NO_ABSTRACT.to_string()
        };

        Self { title, excerpt }
    }
}

/// 单篇论文的分类结果，对应结果文件中的一行
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassificationResult {
    #[serde(rename = "File Name")]
    pub identifier: String,
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Abstract")]
    pub excerpt: String,
    #[serde(rename = "Category")]
    pub label: Label,
}

impl ClassificationResult {
    pub fn new(item: &WorkItem, fields: PaperFields, label: Label) -> Self {
        Self {
            identifier: item.identifier.clone(),
            title: fields.title,
            excerpt: fields.excerpt,
            label,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_from_long_text() {
        let fields = PaperFields::from_text("Title Line\nL2\nL3\nL4\nL5\nL6\nExtra");
        assert_eq!(fields.title, "Title Line");
        assert_eq!(fields.excerpt, "L2 L3 L4 L5 L6");
    }

    #[test]
    fn test_fields_from_single_line() {
        let fields = PaperFields::from_text("OnlyTitle");
        assert_eq!(fields.title, "OnlyTitle");
        assert_eq!(fields.excerpt, NO_ABSTRACT);
    }

    #[test]
    fn test_exactly_six_lines_has_excerpt() {
        let fields = PaperFields::from_text("T\na\nb\nc\nd\ne");
        assert_eq!(fields.excerpt, "a b c d e");

        let fields = PaperFields::from_text("T\na\nb\nc\nd");
        assert_eq!(fields.excerpt, NO_ABSTRACT);
    }

    #[test]
    fn test_blank_first_line_and_crlf() {
        let fields = PaperFields::from_text("\r\nsecond");
        assert_eq!(fields.title, "");

        let fields = PaperFields::from_text("   \nsecond");
        assert_eq!(fields.title, "   ");

        let fields = PaperFields::from_text("");
        assert_eq!(fields.title, UNKNOWN_TITLE);
        assert_eq!(fields.excerpt, NO_ABSTRACT);

        let fields = PaperFields::from_text("Title\r\n1\r\n2\r\n3\r\n4\r\n5\r\n");
        assert_eq!(fields.title, "Title");
        assert_eq!(fields.excerpt, "1 2 3 4 5");
    }

    #[test]
    fn test_work_item_identifier_is_file_name() {
        let item = WorkItem::new("/data/papers/attention.pdf");
        assert_eq!(item.identifier, "attention.pdf");
    }
}
