//! 论文分类服务 - 业务能力层
//!
//! 只负责"向 LLM 询问类别"能力，返回模型的原始回答，
//! 标签匹配由 `Taxonomy` 完成。
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 兼容 OpenAI API 的服务（如本地 Ollama 的 `/v1` 端点）

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::paper::PaperFields;

/// 分类能力
#[async_trait]
pub trait Classifier: Send + Sync {
    /// 使用的模型名称（仅用于日志与错误信息）
    fn model_name(&self) -> &str;

    /// 根据标题和摘要返回模型的自由文本回答
    async fn classify(&self, fields: &PaperFields) -> AppResult<String>;
}

/// LLM 分类器
pub struct LlmClassifier {
    client: Client<OpenAIConfig>,
    model_name: String,
    categories: Vec<String>,
}

impl LlmClassifier {
    /// 创建新的 LLM 分类器
    pub fn new(config: &Config) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        Self {
            client: Client::with_config(openai_config),
            model_name: config.llm_model_name.clone(),
            categories: config.categories.clone(),
        }
    }

    /// 构建分类提示词
    fn build_prompt(&self, fields: &PaperFields) -> String {
        let category_list: Vec<String> =
            self.categories.iter().map(|c| format!("- {}", c)).collect();

        format!(
            "Classify the following research paper into one of these categories:\n\
             {}\n\n\
             Title: {}\n\
             Abstract: {}\n\
             Provide only the category name as output.",
            category_list.join("\n"),
            fields.title,
            fields.excerpt
        )
    }

    async fn send_to_llm(&self, user_message: &str, system_message: Option<&str>) -> AppResult<String> {
        debug!("调用 LLM API，模型: {}", self.model_name);
        debug!("用户消息长度: {} 字符", user_message.len());

        let to_err = |e: &dyn std::fmt::Display| AppError::classification(&self.model_name, e);

        let mut messages = Vec::new();

        if let Some(sys_msg) = system_message {
            let system_msg = ChatCompletionRequestSystemMessageArgs::default()
                .content(sys_msg)
                .build()
                .map_err(|e| to_err(&e))?;
            messages.push(ChatCompletionRequestMessage::System(system_msg));
        }

        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(user_message)
            .build()
            .map_err(|e| to_err(&e))?;
        messages.push(ChatCompletionRequestMessage::User(user_msg));

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(messages)
            .temperature(0.0)
            .max_tokens(64u32)
            .build()
            .map_err(|e| to_err(&e))?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            warn!("LLM API 调用失败: {}", e);
            to_err(&e)
        })?;

        debug!("LLM API 调用成功");

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| to_err(&"LLM 返回内容为空"))?;

        Ok(content.trim().to_string())
    }
}

#[async_trait]
impl Classifier for LlmClassifier {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn classify(&self, fields: &PaperFields) -> AppResult<String> {
        let prompt = self.build_prompt(fields);
        let answer = self
            .send_to_llm(&prompt, Some("You are a research paper librarian. Answer with a single category name."))
            .await?;
        debug!("模型回答: {}", answer);
        Ok(answer)
    }
}
