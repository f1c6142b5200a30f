use crate::config::VisionConfig;
use crate::error::AppError;
use crate::models::InvoiceDraft;
use crate::service::normalize;
use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::io::Write;
use tempfile::NamedTempFile;
use tracing::{info, warn};

/// 发送给视觉模型的固定指令
const EXTRACTION_PROMPT: &str = "analyze this invoice and return vendor, items \
(description/quantity/unit_price/total), and total_amount as JSON.";

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f64,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: Vec<ContentPart>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
enum ContentPart {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

/// 图片字节内联为 data URL, 随请求体一起提交
fn inline_data_url(bytes: &[u8], content_type: &str) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
    format!("data:{content_type};base64,{encoded}")
}

/// 视觉模型后端. 测试中用 mock 实现替换, 不走网络
#[async_trait]
pub trait VisionBackend: Send + Sync {
    /// 输入一张发票图片的字节, 返回模型的原始文本输出 (无结构保证)
    async fn describe_invoice(&self, bytes: &[u8], content_type: &str)
        -> Result<String, AppError>;
}

/// OpenAI 兼容 chat-completions 后端, 图片以 data URL 内联
pub struct ChatCompletionsBackend {
    client: Client,
    config: VisionConfig,
}

impl ChatCompletionsBackend {
    pub fn new(config: VisionConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }
}

#[async_trait]
impl VisionBackend for ChatCompletionsBackend {
    async fn describe_invoice(
        &self,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<String, AppError> {
        // 上传字节落临时文件暂存; NamedTempFile 在成功与失败路径上都会清理.
        // 编码直接用内存中的 bytes, 不回读磁盘
        let mut staging = NamedTempFile::new()?;
        staging.write_all(bytes)?;

        let data_url = inline_data_url(bytes, content_type);

        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage {
                role: "user",
                content: vec![
                    ContentPart::Text {
                        text: EXTRACTION_PROMPT.to_string(),
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl { url: data_url },
                    },
                ],
            }],
            max_tokens: self.config.max_tokens,
            temperature: 0.0,
        };

        let url = format!("{}/chat/completions", self.config.base_url);
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            warn!(status, "vision API returned non-OK status");
            return Err(AppError::ExtractionApi { status, body });
        }

        let chat_response: ChatResponse = response.json().await?;
        chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or(AppError::EmptyResponse)
    }
}

/// 抽取管线: 文件字节 -> 模型原始文本 -> 可编辑草稿
/// 单次请求, 不重试, 失败不产生部分结果
pub struct ExtractionPipeline {
    backend: Box<dyn VisionBackend>,
}

impl ExtractionPipeline {
    pub fn new(backend: Box<dyn VisionBackend>) -> Self {
        Self { backend }
    }

    pub async fn extract(
        &self,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<InvoiceDraft, AppError> {
        info!(size = bytes.len(), content_type, "submitting invoice to vision API");
        let raw = self.backend.describe_invoice(bytes, content_type).await?;
        let draft = normalize::parse_model_output(&raw)?;
        info!(
            vendor = %draft.vendor,
            items = draft.items.len(),
            total_amount = draft.total_amount,
            "extraction result"
        );
        Ok(draft)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_url_encodes_the_upload_bytes_directly() {
        let url = inline_data_url(b"hello", "image/png");
        assert_eq!(url, "data:image/png;base64,aGVsbG8=");
    }

    #[test]
    fn data_url_carries_the_declared_content_type() {
        let url = inline_data_url(&[0xff, 0xd8], "image/jpeg");
        assert!(url.starts_with("data:image/jpeg;base64,"));
    }
}
