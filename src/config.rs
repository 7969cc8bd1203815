use crate::error::{AppError, AppResult};
use crate::models::taxonomy::{DEFAULT_CATEGORIES, LABEL_ERROR, LABEL_OTHER};
use serde::Deserialize;
use std::path::Path;

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    /// PDF 所在目录
    pub source_folder: String,
    /// 输出 CSV 文件
    pub output_csv: String,
    /// 待处理文件扩展名（不含点）
    pub file_extension: String,
    /// 同时处理的论文数量
    pub max_concurrent_papers: usize,
    /// 单篇论文分类超时（秒）
    pub classify_timeout_secs: u64,
    /// 跳过输出文件中已有记录的论文
    pub resume: bool,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 分类目录，按顺序匹配
    pub categories: Vec<String>,
    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_folder: "pdfs".to_string(),
            output_csv: "AnnotatedPapers.csv".to_string(),
            file_extension: "pdf".to_string(),
            max_concurrent_papers: 5,
            classify_timeout_secs: 120,
            resume: true,
            verbose_logging: false,
            categories: DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect(),
            llm_api_key: "ollama".to_string(),
            llm_api_base_url: "http://localhost:11434/v1".to_string(),
            llm_model_name: "gemma".to_string(),
        }
    }
}

/// TOML 配置文件，所有字段可选
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    source_folder: Option<String>,
    output_csv: Option<String>,
    file_extension: Option<String>,
    max_concurrent_papers: Option<usize>,
    classify_timeout_secs: Option<u64>,
    resume: Option<bool>,
    verbose_logging: Option<bool>,
    categories: Option<Vec<String>>,
    llm_api_key: Option<String>,
    llm_api_base_url: Option<String>,
    llm_model_name: Option<String>,
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 若设置了 `CONFIG_FILE`，先读取该 TOML 文件，环境变量优先级更高。
    pub fn from_env() -> AppResult<Self> {
        let base = match std::env::var("CONFIG_FILE") {
            Ok(path) => Self::from_toml_file(Path::new(&path))?,
            Err(_) => Self::default(),
        };
        let config = base.overlay_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// 从 TOML 文件加载配置，缺省字段使用默认值
    pub fn from_toml_file(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("无法读取配置文件 {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
            .map_err(|e| AppError::Config(format!("{} ({})", e, path.display())))
    }

    /// 从 TOML 文本解析配置
    pub fn from_toml_str(content: &str) -> AppResult<Self> {
        let file: FileConfig = toml::from_str(content)
            .map_err(|e| AppError::Config(format!("无法解析配置文件: {}", e)))?;
        let default = Self::default();
        Ok(Self {
            source_folder: file.source_folder.unwrap_or(default.source_folder),
            output_csv: file.output_csv.unwrap_or(default.output_csv),
            file_extension: file.file_extension.unwrap_or(default.file_extension),
            max_concurrent_papers: file
                .max_concurrent_papers
                .unwrap_or(default.max_concurrent_papers),
            classify_timeout_secs: file
                .classify_timeout_secs
                .unwrap_or(default.classify_timeout_secs),
            resume: file.resume.unwrap_or(default.resume),
            verbose_logging: file.verbose_logging.unwrap_or(default.verbose_logging),
            categories: file
                .categories
                .map(|list| list.iter().map(|c| c.trim().to_string()).collect())
                .unwrap_or(default.categories),
            llm_api_key: file.llm_api_key.unwrap_or(default.llm_api_key),
            llm_api_base_url: file.llm_api_base_url.unwrap_or(default.llm_api_base_url),
            llm_model_name: file.llm_model_name.unwrap_or(default.llm_model_name),
        })
    }

    /// 用环境变量覆盖配置
    ///
    /// `lookup` 便于测试时注入变量，不直接修改进程环境。
    pub fn overlay_env<F>(self, lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            source_folder: lookup("SOURCE_FOLDER").unwrap_or(self.source_folder),
            output_csv: lookup("OUTPUT_CSV").unwrap_or(self.output_csv),
            file_extension: lookup("FILE_EXTENSION").unwrap_or(self.file_extension),
            max_concurrent_papers: parse_var(&lookup, "MAX_CONCURRENT_PAPERS")?
                .unwrap_or(self.max_concurrent_papers),
            classify_timeout_secs: parse_var(&lookup, "CLASSIFY_TIMEOUT_SECS")?
                .unwrap_or(self.classify_timeout_secs),
            resume: parse_var(&lookup, "RESUME")?.unwrap_or(self.resume),
            verbose_logging: parse_var(&lookup, "VERBOSE_LOGGING")?
                .unwrap_or(self.verbose_logging),
            categories: lookup("CATEGORIES")
                .map(|v| {
                    v.split(',')
                        .map(|c| c.trim().to_string())
                        .filter(|c| !c.is_empty())
                        .collect()
                })
                .unwrap_or(self.categories),
            llm_api_key: lookup("LLM_API_KEY").unwrap_or(self.llm_api_key),
            llm_api_base_url: lookup("LLM_API_BASE_URL").unwrap_or(self.llm_api_base_url),
            llm_model_name: lookup("LLM_MODEL_NAME").unwrap_or(self.llm_model_name),
        })
    }

    /// 校验配置
    pub fn validate(&self) -> AppResult<()> {
        if self.max_concurrent_papers == 0 {
            return Err(AppError::Config("最大并发数必须大于 0".into()));
        }
        if self.classify_timeout_secs == 0 {
            return Err(AppError::Config("分类超时必须大于 0 秒".into()));
        }
        if self.categories.is_empty() {
            return Err(AppError::Config("分类目录不能为空".into()));
        }
        // 空分类名会匹配任何回答
        if self.categories.iter().any(|c| c.trim().is_empty()) {
            return Err(AppError::Config("分类名不能为空白".into()));
        }
        if let Some(c) = self.categories.iter().find(|c| {
            c.eq_ignore_ascii_case(LABEL_OTHER) || c.eq_ignore_ascii_case(LABEL_ERROR)
        }) {
            return Err(AppError::Config(format!("分类名 '{}' 与保留标签冲突", c)));
        }
        Ok(())
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> AppResult<Option<T>>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(value) => value.trim().parse().map(Some).map_err(|_| {
            AppError::Config(format!(
                "环境变量 {} 解析失败: 值 '{}' 无法转换为 {}",
                key,
                value,
                std::any::type_name::<T>()
            ))
        }),
    }
}
