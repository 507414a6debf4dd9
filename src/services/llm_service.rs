//! LLM 服务 - 业务能力层
//!
//! 只负责"给一篇文献打分"这一次调用，不关心重试和并发
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 支持自定义 API 端点和模型
//! - 所有失败在这里被归入封闭的 [`ErrorClass`]，不把原始错误往上抛

use std::time::Duration;

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use backoff::exponential::ExponentialBackoffBuilder;
use backoff::SystemClock;
use tracing::{debug, warn};

use crate::config::Config;
use crate::infrastructure::{ErrorClass, OracleFailure, ScoringOracle};
use crate::models::ArticlePayload;

/// LLM 服务
///
/// 职责：
/// - 构建评分 prompt
/// - 调用 chat completions 接口，带单次超时
/// - 把失败归类为 `ErrorClass`
/// - 可被多个任务共享（只读）
pub struct LlmService {
    client: Client<OpenAIConfig>,
    model_name: String,
    temperature: f32,
    request_timeout: Duration,
}

impl LlmService {
    /// 创建新的 LLM 服务
    pub fn new(config: &Config, api_key: &str) -> Self {
        // 配置 OpenAI 客户端（兼容 OpenAI API 的服务）
        let openai_config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(&config.api_base_url);

        // 关闭客户端自带的重试：每次失败都必须交给 RetryPolicy，且不能占着令牌退避
        let no_retry = ExponentialBackoffBuilder::<SystemClock>::new()
            .with_max_elapsed_time(Some(Duration::ZERO))
            .build();
        let client = Client::with_config(openai_config).with_backoff(no_retry);

        Self {
            client,
            model_name: config.model_name.clone(),
            temperature: config.temperature,
            request_timeout: Duration::from_secs(config.request_timeout_sec),
        }
    }

    /// 构建请求消息
    fn build_messages(
        &self,
        theme: &str,
        payload: &ArticlePayload,
    ) -> Result<Vec<ChatCompletionRequestMessage>, OpenAIError> {
        let (system_message, user_message) = build_prompt(theme, payload);

        let system = ChatCompletionRequestSystemMessageArgs::default()
            .content(system_message)
            .build()?;
        let user = ChatCompletionRequestUserMessageArgs::default()
            .content(user_message)
            .build()?;

        Ok(vec![
            ChatCompletionRequestMessage::System(system),
            ChatCompletionRequestMessage::User(user),
        ])
    }

    /// 发送一次评分请求，返回模型的原始文本
    pub async fn send_to_llm(
        &self,
        theme: &str,
        payload: &ArticlePayload,
    ) -> Result<String, OracleFailure> {
        debug!(
            "调用 LLM API，模型: {}，标题长度: {} 字符",
            self.model_name,
            payload.title.len()
        );

        // 构造失败属于配置问题，重试没有意义
        let messages = self
            .build_messages(theme, payload)
            .map_err(|e| OracleFailure::new(ErrorClass::Fatal, e.to_string()))?;
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(messages)
            .temperature(self.temperature)
            .build()
            .map_err(|e| OracleFailure::new(ErrorClass::Fatal, e.to_string()))?;

        let response =
            match tokio::time::timeout(self.request_timeout, self.client.chat().create(request))
                .await
            {
                Ok(Ok(response)) => response,
                Ok(Err(e)) => {
                    let class = classify_openai_error(&e);
                    warn!("LLM API 调用失败 [{}]: {}", class, e);
                    return Err(OracleFailure::new(class, e.to_string()));
                }
                Err(_) => {
                    warn!("LLM API 调用超时 ({:?})", self.request_timeout);
                    return Err(OracleFailure::new(
                        ErrorClass::Transient,
                        format!("请求超时 ({:?})", self.request_timeout),
                    ));
                }
            };

        // 没有 choices 视为远端异常，可重试
        let choice = response.choices.first().ok_or_else(|| {
            OracleFailure::new(ErrorClass::Transient, "响应中没有 choices")
        })?;

        Ok(choice
            .message
            .content
            .as_deref()
            .unwrap_or_default()
            .trim()
            .to_string())
    }
}

impl ScoringOracle for LlmService {
    async fn score(&self, theme: &str, payload: &ArticlePayload) -> Result<String, OracleFailure> {
        self.send_to_llm(theme, payload).await
    }
}

/// 构建评分 prompt，返回 (system_message, user_message)
pub fn build_prompt(theme: &str, payload: &ArticlePayload) -> (String, String) {
    let system_message = "You are an expert reviewer scoring abstracts for a systematic review. \
                          Score RELEVANCE to the stated theme on a 1-10 integer scale. \
                          Return ONLY the integer (no text, no explanations)."
        .to_string();

    let title = non_empty_or(&payload.title, "(no title)");
    let abstract_text = non_empty_or(&payload.abstract_text, "(no abstract)");

    let user_message = format!(
        r#"Theme:
{theme}

Scoring rubric (return ONLY a single integer 1-10):
10 = The study squarely addresses the theme and the abstract gives clear evidence of every element it asks for.
8-9 = Strong match: clearly on-target, though some details are limited or mixed.
6-7 = Reasonably relevant: the main topic matches but a key element is weak, indirect, or unclear.
4-5 = Weak/unclear: only part of the theme is present, or the focus is general with minimal overlap.
2-3 = Barely relevant: tangential references only.
1 = Unrelated to the theme.

Title: {title}

Abstract:
{abstract_text}

Return ONLY a single integer 1-10, nothing else."#
    );

    (system_message, user_message)
}

fn non_empty_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        fallback
    } else {
        trimmed
    }
}

/// 把 async-openai 的错误归类
fn classify_openai_error(err: &OpenAIError) -> ErrorClass {
    match err {
        OpenAIError::ApiError(api) => classify_api_error(
            api.code.as_deref(),
            api.r#type.as_deref(),
            &api.message,
        ),
        OpenAIError::Reqwest(e) => match e.status() {
            Some(status) => classify_status(status.as_u16()),
            None => ErrorClass::Transient,
        },
        OpenAIError::InvalidArgument(_) => ErrorClass::Fatal,
        _ => ErrorClass::Transient,
    }
}

/// 只有 HTTP 状态码可用时的归类
pub(crate) fn classify_status(status: u16) -> ErrorClass {
    match status {
        401 | 403 => ErrorClass::Fatal,
        429 => ErrorClass::RateLimited,
        _ => ErrorClass::Transient,
    }
}

/// 根据错误码、错误类型和消息文本归类
///
/// 优先看 code/type；消息只匹配完整短语，不匹配裸状态码。
/// 额度耗尽同样以 429 返回，所以必须先于限流判断。
pub(crate) fn classify_api_error(code: Option<&str>, kind: Option<&str>, message: &str) -> ErrorClass {
    let code = code.unwrap_or_default().to_ascii_lowercase();
    let kind = kind.unwrap_or_default().to_ascii_lowercase();
    let message = message.to_ascii_lowercase();

    if code == "insufficient_quota"
        || kind == "insufficient_quota"
        || code == "billing_hard_limit_reached"
        || message.contains("exceeded your current quota")
        || message.contains("billing details")
    {
        return ErrorClass::QuotaExceeded;
    }

    if code == "invalid_api_key"
        || code == "invalid_authentication"
        || kind == "authentication_error"
        || kind == "permission_error"
        || message.contains("incorrect api key")
        || message.contains("invalid api key")
    {
        return ErrorClass::Fatal;
    }

    if code == "rate_limit_exceeded"
        || kind.contains("rate_limit")
        || message.contains("rate limit")
        || message.contains("too many requests")
    {
        return ErrorClass::RateLimited;
    }

    ErrorClass::Transient
}
