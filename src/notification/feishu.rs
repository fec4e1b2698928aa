//! 飞书机器人通知模块
//!
//! 通过飞书自定义机器人 webhook 推送配置重载失败的消息

use crate::error::{ConfigError, NotificationError};
use crate::notification::sender::Notification;
use crate::notification::template::{MessageTemplate, TemplateContext};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use sha2::Sha256;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

/// 自定义消息体构建函数
pub type PayloadBuilder = Arc<dyn Fn(&str, &ConfigError) -> Value + Send + Sync>;

/// 飞书接口响应
#[derive(Debug, Deserialize)]
struct FeishuReply {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    msg: String,
}

/// 飞书机器人通知
pub struct FeishuBotHook {
    /// HTTP客户端
    client: Client,
    /// webhook 地址
    webhook_url: String,
    /// 文本消息模板
    template: MessageTemplate,
    /// 自定义消息体，设置后忽略模板
    payload_builder: Option<PayloadBuilder>,
    /// 签名密钥
    secret: Option<String>,
}

impl std::fmt::Debug for FeishuBotHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeishuBotHook")
            .field("webhook_url", &self.webhook_url)
            .field("custom_payload", &self.payload_builder.is_some())
            .field("signed", &self.secret.is_some())
            .finish()
    }
}

impl FeishuBotHook {
    /// 创建新的飞书机器人通知
    ///
    /// # 参数
    /// * `webhook_url` - 机器人 webhook 地址
    ///
    /// # 返回
    /// * `Result<Self, NotificationError>` - 地址不是 http(s) 时返回 `ConfigError`
    pub fn new(webhook_url: impl Into<String>) -> Result<Self, NotificationError> {
        let webhook_url = webhook_url.into();
        if !webhook_url.starts_with("http://") && !webhook_url.starts_with("https://") {
            return Err(NotificationError::ConfigError(format!(
                "无效的飞书webhook地址: {}",
                webhook_url
            )));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| NotificationError::ConfigError(format!("创建HTTP客户端失败: {}", e)))?;

        Ok(Self {
            client,
            webhook_url,
            template: MessageTemplate::default_template()?,
            payload_builder: None,
            secret: None,
        })
    }

    /// 使用自定义文本模板
    pub fn with_template(mut self, template: &str) -> Result<Self, NotificationError> {
        self.template = MessageTemplate::new(template)?;
        Ok(self)
    }

    /// 使用自定义消息体
    pub fn with_payload_builder<F>(mut self, builder: F) -> Self
    where
        F: Fn(&str, &ConfigError) -> Value + Send + Sync + 'static,
    {
        self.payload_builder = Some(Arc::new(builder));
        self
    }

    /// 启用签名校验
    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    pub fn webhook_url(&self) -> &str {
        &self.webhook_url
    }

    /// 构建请求体
    pub fn build_payload(&self, config_name: &str, err: &ConfigError) -> Result<Value, NotificationError> {
        let mut body = match &self.payload_builder {
            Some(builder) => builder(config_name, err),
            None => {
                let text = self.template.render(&TemplateContext::new(config_name, err))?;
                json!({
                    "msg_type": "text",
                    "content": { "text": text }
                })
            }
        };

        if let Some(secret) = &self.secret {
            let timestamp = chrono::Utc::now().timestamp();
            let sign = gen_sign(timestamp, secret)?;
            if let Value::Object(map) = &mut body {
                map.insert("timestamp".to_string(), Value::String(timestamp.to_string()));
                map.insert("sign".to_string(), Value::String(sign));
            }
        }

        Ok(body)
    }

    /// 发送通知并返回结果
    pub async fn try_notify(&self, config_name: &str, err: &ConfigError) -> Result<(), NotificationError> {
        let body = self.build_payload(config_name, err)?;
        debug!("发送消息到飞书webhook: {}", self.webhook_url);

        let response = self
            .client
            .post(&self.webhook_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| NotificationError::SendError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotificationError::SendError(format!("HTTP状态码 {}", status)));
        }

        let reply: FeishuReply = response
            .json()
            .await
            .map_err(|e| NotificationError::SendError(format!("解析响应失败: {}", e)))?;
        if reply.code != 0 {
            return Err(NotificationError::SendError(format!(
                "code={} msg={}",
                reply.code, reply.msg
            )));
        }

        debug!("飞书消息发送成功");
        Ok(())
    }
}

#[async_trait]
impl Notification for FeishuBotHook {
    async fn notify(&self, config_name: &str, err: &ConfigError) {
        if let Err(e) = self.try_notify(config_name, err).await {
            error!("飞书通知发送失败: {}", e);
        }
    }
}

/// 计算签名：以 `timestamp\nsecret` 为密钥对空消息做 HMAC-SHA256，再做 base64
pub fn gen_sign(timestamp: i64, secret: &str) -> Result<String, NotificationError> {
    let key = format!("{}\n{}", timestamp, secret);
    let mac = Hmac::<Sha256>::new_from_slice(key.as_bytes())
        .map_err(|e| NotificationError::ConfigError(format!("签名密钥无效: {}", e)))?;
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn test_error() -> ConfigError {
        ConfigError::Listener {
            name: "test_config".to_string(),
            source: anyhow::anyhow!("test error"),
        }
    }

    #[test]
    fn test_invalid_url() {
        let result = FeishuBotHook::new("not-a-url");
        assert!(matches!(result, Err(NotificationError::ConfigError(_))));
    }

    #[test]
    fn test_default_payload() {
        let hook = FeishuBotHook::new("http://localhost/hook").unwrap();
        let err = test_error();
        let body = hook.build_payload("test_config", &err).unwrap();

        assert_eq!(body["msg_type"], "text");
        assert_eq!(
            body["content"]["text"],
            format!("Config test_config reload failed: {}", err)
        );
        assert!(body.get("sign").is_none());
    }

    #[test]
    fn test_signed_payload() {
        let hook = FeishuBotHook::new("http://localhost/hook")
            .unwrap()
            .with_secret("secret");
        let body = hook.build_payload("test_config", &test_error()).unwrap();

        let timestamp: i64 = body["timestamp"].as_str().unwrap().parse().unwrap();
        assert_eq!(body["sign"], gen_sign(timestamp, "secret").unwrap());
    }

    #[test]
    fn test_gen_sign_is_deterministic() {
        let first = gen_sign(1_700_000_000, "secret").unwrap();
        assert_eq!(first, gen_sign(1_700_000_000, "secret").unwrap());
        assert_ne!(first, gen_sign(1_700_000_001, "secret").unwrap());
        assert_eq!(STANDARD.decode(&first).unwrap().len(), 32);
    }

    #[tokio::test]
    async fn test_notify_posts_default_payload() {
        let mut server = mockito::Server::new_async().await;
        let err = test_error();
        let mock = server
            .mock("POST", "/hook")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(json!({
                "msg_type": "text",
                "content": { "text": format!("Config test_config reload failed: {}", err) }
            })))
            .with_status(200)
            .with_body(r#"{"code":0,"msg":"ok"}"#)
            .create_async()
            .await;

        let hook = FeishuBotHook::new(format!("{}/hook", server.url())).unwrap();
        hook.try_notify("test_config", &err).await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_notify_custom_payload() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/hook")
            .match_body(Matcher::Json(json!({
                "msg_type": "text",
                "content": { "text": "Custom payload" }
            })))
            .with_status(200)
            .with_body(r#"{"code":0,"msg":"ok"}"#)
            .create_async()
            .await;

        let hook = FeishuBotHook::new(format!("{}/hook", server.url()))
            .unwrap()
            .with_payload_builder(|_name: &str, _err: &ConfigError| {
                json!({"msg_type": "text", "content": {"text": "Custom payload"}})
            });
        hook.try_notify("test_config", &test_error()).await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_notify_non_200_response() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/hook")
            .with_status(500)
            .expect(2)
            .create_async()
            .await;

        let hook = FeishuBotHook::new(format!("{}/hook", server.url())).unwrap();
        let result = hook.try_notify("test_config", &test_error()).await;
        assert!(matches!(result, Err(NotificationError::SendError(_))));

        // 通过 trait 调用时只记录日志
        hook.notify("test_config", &test_error()).await;
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_notify_non_zero_code() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/hook")
            .with_status(200)
            .with_body(r#"{"code":19021,"msg":"sign match fail"}"#)
            .create_async()
            .await;

        let hook = FeishuBotHook::new(format!("{}/hook", server.url())).unwrap();
        let err = hook.try_notify("test_config", &test_error()).await.unwrap_err();
        assert!(err.to_string().contains("19021"));
    }
}
