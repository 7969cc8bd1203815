//! 分类目录与标签匹配
//!
//! 模型返回的是自由文本，这里负责把它收敛到封闭的标签集合：
//! 目录中的类别、`Other`、`error`。

use serde::{Serialize, Serializer};
use std::fmt::Display;

/// 默认分类目录（按匹配优先级排列）
pub const DEFAULT_CATEGORIES: [&str; 5] = [
    "Machine Learning",
    "Deep Learning",
    "Optimization",
    "Computer Vision",
    "Natural Language Processing (NLP)",
];

/// 模型有回答但不属于任何类别
pub const LABEL_OTHER: &str = "Other";
/// 分类失败
pub const LABEL_ERROR: &str = "error";

/// 论文的分类标签
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Label {
    /// 目录中的某个类别
    Category(String),
    /// 未识别
    Other,
    /// 分类失败
    Error,
}

impl Label {
    pub fn as_str(&self) -> &str {
        match self {
            Label::Category(name) => name,
            Label::Other => LABEL_OTHER,
            Label::Error => LABEL_ERROR,
        }
    }
}

impl Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Label {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// 分类目录
#[derive(Debug, Clone)]
pub struct Taxonomy {
    categories: Vec<String>,
    lowered: Vec<String>,
}

impl Taxonomy {
    pub fn new(categories: Vec<String>) -> Self {
        let lowered = categories.iter().map(|c| c.to_lowercase()).collect();
        Self {
            categories,
            lowered,
        }
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// 将模型回答映射为标签
    ///
    /// 大小写不敏感的子串匹配，按目录顺序取第一个命中的类别；
    /// 空回答视为分类失败，未命中任何类别为 `Other`。
    pub fn match_label(&self, answer: &str) -> Label {
        let answer = answer.trim();
        if answer.is_empty() {
            return Label::Error;
        }

        let lowered = answer.to_lowercase();
        self.lowered
            .iter()
            .position(|cat| lowered.contains(cat.as_str()))
            .map(|idx| Label::Category(self.categories[idx].clone()))
            .unwrap_or(Label::Other)
    }

    /// 标签是否属于合法集合
    pub fn contains(&self, label: &Label) -> bool {
        match label {
            Label::Category(name) => self.categories.iter().any(|c| c == name),
            Label::Other | Label::Error => true,
        }
    }
}

impl Default for Taxonomy {
    fn default() -> Self {
        Self::new(DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_with_surrounding_prose() {
        let taxonomy = Taxonomy::default();
        assert_eq!(
            taxonomy.match_label("This paper is about Deep Learning methods"),
            Label::Category("Deep Learning".into())
        );
    }

    #[test]
    fn test_match_is_case_insensitive() {
        let taxonomy = Taxonomy::default();
        assert_eq!(
            taxonomy.match_label("  computer vision\n"),
            Label::Category("Computer Vision".into())
        );
    }

    #[test]
    fn test_first_category_in_declared_order_wins() {
        let taxonomy = Taxonomy::default();
        // 同时包含两个类别时取目录中靠前的那个
        assert_eq!(
            taxonomy.match_label("Deep Learning, a branch of Machine Learning"),
            Label::Category("Machine Learning".into())
        );
    }

    #[test]
    fn test_empty_and_unknown_answers() {
        let taxonomy = Taxonomy::default();
        assert_eq!(taxonomy.match_label(""), Label::Error);
        assert_eq!(taxonomy.match_label("   "), Label::Error);
        assert_eq!(taxonomy.match_label("Quantum Biology"), Label::Other);
    }

    #[test]
    fn test_sentinel_strings() {
        assert_eq!(Label::Other.as_str(), "Other");
        assert_eq!(Label::Error.to_string(), "error");
    }

    #[test]
    fn test_matched_labels_stay_in_label_set() {
        let taxonomy = Taxonomy::default();
        for answer in ["NLP", "optimization!", "", "Astronomy", "natural language processing (nlp)"] {
            assert!(taxonomy.contains(&taxonomy.match_label(answer)));
        }
    }
}
